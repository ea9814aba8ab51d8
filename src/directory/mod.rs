//! Remote artist directory
//!
//! The crawl engine only talks to the platform through the [`DirectoryClient`]
//! trait. Each method is one logical call: paginated endpoints are drained before
//! returning. [`SoundCloudClient`] is the HTTP implementation.

#[cfg(test)]
pub(crate) mod fake;
mod soundcloud;

pub use soundcloud::{build_http_client, extract_cursor, SoundCloudClient};

use crate::graph::{ArtistAttributes, ArtistId};
use crate::DirectoryResult;
use std::collections::HashSet;

/// An artist as reported by the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistProfile {
    pub id: ArtistId,
    pub name: String,
    pub attributes: ArtistAttributes,
}

/// One favorited track, reduced to the artist who uploaded it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteEntry {
    pub user_id: ArtistId,
    pub username: String,
}

/// Capabilities the crawl engine needs from the platform
#[allow(async_fn_in_trait)]
pub trait DirectoryClient {
    /// Fetches the profile of a single artist
    async fn fetch_profile(&self, id: ArtistId) -> DirectoryResult<ArtistProfile>;

    /// Fetches every artist `id` follows, with their attributes
    async fn fetch_following(&self, id: ArtistId) -> DirectoryResult<Vec<ArtistProfile>>;

    /// Fetches only the ids of the artists `id` follows
    async fn fetch_following_ids(&self, id: ArtistId) -> DirectoryResult<HashSet<ArtistId>>;

    /// Fetches the uploaders of every track `id` has favorited
    async fn fetch_favorites(&self, id: ArtistId) -> DirectoryResult<Vec<FavoriteEntry>>;

    /// Resolves a public profile URL into the artist's name and id
    async fn resolve_profile_url(&self, url: &str) -> DirectoryResult<(String, ArtistId)>;
}
