//! In-memory directory used by unit tests

use crate::directory::{ArtistProfile, DirectoryClient, FavoriteEntry};
use crate::graph::{ArtistAttributes, ArtistId};
use crate::{DirectoryError, DirectoryResult};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Default)]
pub(crate) struct FakeDirectory {
    profiles: HashMap<ArtistId, ArtistProfile>,
    following: BTreeMap<ArtistId, Vec<ArtistId>>,
    favorites: HashMap<ArtistId, Vec<FavoriteEntry>>,
    transient_failures: RefCell<HashMap<ArtistId, u32>>,
    broken: HashSet<ArtistId>,
    forbidden: HashSet<ArtistId>,
    garbled: HashSet<ArtistId>,
    calls: RefCell<Vec<String>>,
}

impl FakeDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn artist(&mut self, id: u64, followers: u64) -> &mut Self {
        let id = ArtistId(id);
        self.profiles.insert(
            id,
            ArtistProfile {
                id,
                name: format!("artist-{}", id),
                attributes: ArtistAttributes {
                    track_count: Some(1),
                    follower_count: Some(followers),
                    favorite_count: Some(0),
                    profile_url: Some(format!("https://soundcloud.com/artist-{}", id)),
                    city: None,
                    country: None,
                },
            },
        );
        self.following.entry(id).or_default();
        self
    }

    pub(crate) fn follows(&mut self, from: u64, to: u64) -> &mut Self {
        self.following
            .entry(ArtistId(from))
            .or_default()
            .push(ArtistId(to));
        self
    }

    pub(crate) fn mutual(&mut self, a: u64, b: u64) -> &mut Self {
        self.follows(a, b).follows(b, a)
    }

    pub(crate) fn favorite(&mut self, by: u64, uploader: u64, times: usize) -> &mut Self {
        let entries = self.favorites.entry(ArtistId(by)).or_default();
        for _ in 0..times {
            entries.push(FavoriteEntry {
                user_id: ArtistId(uploader),
                username: format!("artist-{}", uploader),
            });
        }
        self
    }

    /// Makes the next `times` following fetches for `id` fail with a 503
    pub(crate) fn fail_transiently(&mut self, id: u64, times: u32) -> &mut Self {
        self.transient_failures
            .borrow_mut()
            .insert(ArtistId(id), times);
        self
    }

    /// Makes every call about `id` fail with a 503
    pub(crate) fn break_artist(&mut self, id: u64) -> &mut Self {
        self.broken.insert(ArtistId(id));
        self
    }

    /// Makes every call about `id` fail with a 403
    pub(crate) fn forbid(&mut self, id: u64) -> &mut Self {
        self.forbidden.insert(ArtistId(id));
        self
    }

    /// Makes following listings of `id` end on an unreadable cursor
    pub(crate) fn garble_cursor(&mut self, id: u64) -> &mut Self {
        self.garbled.insert(ArtistId(id));
        self
    }

    pub(crate) fn calls(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, id: ArtistId, counts_transient: bool) -> DirectoryResult<()> {
        if self.broken.contains(&id) {
            return Err(unavailable(id));
        }
        if self.forbidden.contains(&id) {
            return Err(DirectoryError::Status {
                url: format!("fake://users/{}", id),
                status: 403,
            });
        }
        if counts_transient {
            let mut failures = self.transient_failures.borrow_mut();
            if let Some(left) = failures.get_mut(&id) {
                if *left > 0 {
                    *left -= 1;
                    return Err(unavailable(id));
                }
            }
        }
        Ok(())
    }
}

fn unavailable(id: ArtistId) -> DirectoryError {
    DirectoryError::Status {
        url: format!("fake://users/{}", id),
        status: 503,
    }
}

impl DirectoryClient for FakeDirectory {
    async fn fetch_profile(&self, id: ArtistId) -> DirectoryResult<ArtistProfile> {
        self.record(format!("profile:{}", id));
        self.check(id, false)?;
        self.profiles
            .get(&id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(format!("users/{}", id)))
    }

    async fn fetch_following(&self, id: ArtistId) -> DirectoryResult<Vec<ArtistProfile>> {
        self.record(format!("following:{}", id));
        self.check(id, false)?;
        if self.garbled.contains(&id) {
            return Err(DirectoryError::CursorParse(format!(
                "non-numeric cursor for {}",
                id
            )));
        }
        Ok(self
            .following
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|f| self.profiles.get(f).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_following_ids(&self, id: ArtistId) -> DirectoryResult<HashSet<ArtistId>> {
        self.record(format!("ids:{}", id));
        self.check(id, true)?;
        Ok(self
            .following
            .get(&id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn fetch_favorites(&self, id: ArtistId) -> DirectoryResult<Vec<FavoriteEntry>> {
        self.record(format!("favorites:{}", id));
        self.check(id, false)?;
        Ok(self.favorites.get(&id).cloned().unwrap_or_default())
    }

    async fn resolve_profile_url(&self, url: &str) -> DirectoryResult<(String, ArtistId)> {
        self.record(format!("resolve:{}", url));
        self.profiles
            .values()
            .find(|p| p.attributes.profile_url.as_deref() == Some(url))
            .map(|p| (p.name.clone(), p.id))
            .ok_or_else(|| DirectoryError::NotFound(url.to_string()))
    }
}
