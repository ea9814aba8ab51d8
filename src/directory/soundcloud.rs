//! SoundCloud HTTP directory client
//!
//! This module handles:
//! - Building the HTTP client with timeouts and compression
//! - Cursor-based pagination over `{collection, next_href}` pages
//! - Mapping HTTP failures to transient or permanent directory errors
//! - Decoding user payloads, keeping null attributes as unavailable

use crate::config::DirectoryConfig;
use crate::directory::{ArtistProfile, DirectoryClient, FavoriteEntry};
use crate::graph::{ArtistAttributes, ArtistId};
use crate::{DirectoryError, DirectoryResult};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// One page of a paginated collection
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    collection: Vec<serde_json::Value>,
    #[serde(default)]
    next_href: Option<String>,
}

/// User payload; every attribute may be null
#[derive(Debug, Deserialize)]
struct UserPayload {
    id: Option<u64>,
    username: Option<String>,
    track_count: Option<u64>,
    followers_count: Option<u64>,
    public_favorites_count: Option<u64>,
    permalink_url: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

impl UserPayload {
    fn into_profile(self) -> Option<ArtistProfile> {
        Some(ArtistProfile {
            id: ArtistId(self.id?),
            name: self.username?,
            attributes: ArtistAttributes {
                track_count: self.track_count,
                follower_count: self.followers_count,
                favorite_count: self.public_favorites_count,
                profile_url: self.permalink_url,
                city: self.city,
                country: self.country,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct FavoritePayload {
    user_id: Option<u64>,
    user: Option<FavoriteUser>,
}

#[derive(Debug, Deserialize)]
struct FavoriteUser {
    username: Option<String>,
}

/// Builds an HTTP client for the directory API
///
/// # Arguments
///
/// * `config` - The directory configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &DirectoryConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("echo-mesh/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Extracts the numeric `cursor` parameter from a `next_href` link
///
/// # Returns
///
/// * `Ok(u64)` - The cursor to send with the next page request
/// * `Err(DirectoryError::CursorParse)` - The link has no usable cursor
pub fn extract_cursor(next_href: &str) -> DirectoryResult<u64> {
    let url = Url::parse(next_href)
        .map_err(|e| DirectoryError::CursorParse(format!("{} ({})", next_href, e)))?;

    let cursor = url
        .query_pairs()
        .find(|(key, _)| key == "cursor")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| DirectoryError::CursorParse(format!("no cursor in {}", next_href)))?;

    cursor
        .parse::<u64>()
        .map_err(|_| DirectoryError::CursorParse(format!("non-numeric cursor '{}'", cursor)))
}

/// Strips scheme, trailing slashes and case so permalinks compare equal
fn normalize_permalink(url: &str) -> String {
    let trimmed = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    trimmed.to_lowercase()
}

/// Directory client backed by the SoundCloud HTTP API
pub struct SoundCloudClient {
    client: Client,
    api_url: String,
    client_id: String,
    page_size: u32,
}

impl SoundCloudClient {
    /// Creates a client from the directory configuration
    pub fn new(config: &DirectoryConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            page_size: config.page_size,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    /// Sends one GET request and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> DirectoryResult<T> {
        tracing::trace!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(&[("client_id", self.client_id.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|source| DirectoryError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DirectoryError::RateLimited {
                url: url.to_string(),
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(DirectoryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| DirectoryError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Drains a paginated collection, following cursors until `next_href` is null
    async fn collect_pages(&self, path: &str) -> DirectoryResult<Vec<serde_json::Value>> {
        let url = self.endpoint(path);
        let mut items = Vec::new();
        let mut cursor: Option<u64> = None;

        loop {
            let mut query = vec![
                ("limit", self.page_size.to_string()),
                ("linked_partitioning", "1".to_string()),
            ];
            if let Some(c) = cursor {
                query.push(("cursor", c.to_string()));
            }

            let page: Page = self.get_json(&url, &query).await?;
            items.extend(page.collection);

            match page.next_href {
                None => break,
                Some(href) => {
                    let next = extract_cursor(&href)?;
                    if cursor == Some(next) {
                        return Err(DirectoryError::CursorParse(format!(
                            "cursor {} repeated for {}",
                            next, url
                        )));
                    }
                    cursor = Some(next);
                }
            }
        }

        tracing::debug!("Fetched {} items from {}", items.len(), url);
        Ok(items)
    }

    async fn collect_users(&self, path: &str) -> DirectoryResult<Vec<ArtistProfile>> {
        let items = self.collect_pages(path).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| decode_user(item, path))
            .collect())
    }
}

/// Decodes one user payload, skipping items without an id or username
fn decode_user(item: serde_json::Value, context: &str) -> Option<ArtistProfile> {
    match serde_json::from_value::<UserPayload>(item) {
        Ok(payload) => {
            let profile = payload.into_profile();
            if profile.is_none() {
                tracing::warn!("Skipping user without id or username in {}", context);
            }
            profile
        }
        Err(e) => {
            tracing::warn!("Skipping malformed user in {}: {}", context, e);
            None
        }
    }
}

impl DirectoryClient for SoundCloudClient {
    async fn fetch_profile(&self, id: ArtistId) -> DirectoryResult<ArtistProfile> {
        let url = self.endpoint(&format!("users/{}", id));
        let payload: UserPayload = self.get_json(&url, &[]).await?;
        payload.into_profile().ok_or_else(|| DirectoryError::Decode {
            url,
            message: "profile without id or username".to_string(),
        })
    }

    async fn fetch_following(&self, id: ArtistId) -> DirectoryResult<Vec<ArtistProfile>> {
        self.collect_users(&format!("users/{}/followings", id)).await
    }

    async fn fetch_following_ids(&self, id: ArtistId) -> DirectoryResult<HashSet<ArtistId>> {
        let items = self
            .collect_pages(&format!("users/{}/followings", id))
            .await?;
        Ok(items
            .iter()
            .filter_map(|item| item.get("id").and_then(|v| v.as_u64()))
            .map(ArtistId)
            .collect())
    }

    async fn fetch_favorites(&self, id: ArtistId) -> DirectoryResult<Vec<FavoriteEntry>> {
        let items = self.collect_pages(&format!("users/{}/favorites", id)).await?;
        let mut favorites = Vec::with_capacity(items.len());

        for item in items {
            let payload = match serde_json::from_value::<FavoritePayload>(item) {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!("Skipping malformed favorite of {}: {}", id, e);
                    continue;
                }
            };
            let username = payload.user.and_then(|u| u.username);
            if let (Some(user_id), Some(username)) = (payload.user_id, username) {
                favorites.push(FavoriteEntry {
                    user_id: ArtistId(user_id),
                    username,
                });
            }
        }

        Ok(favorites)
    }

    async fn resolve_profile_url(&self, url: &str) -> DirectoryResult<(String, ArtistId)> {
        let parsed = Url::parse(url.trim())
            .map_err(|_| DirectoryError::NotFound(format!("invalid profile URL {}", url)))?;
        let username = parsed
            .path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .ok_or_else(|| DirectoryError::NotFound(format!("no username in {}", url)))?
            .to_string();

        let search_url = self.endpoint("users");
        let results: Vec<serde_json::Value> = self
            .get_json(&search_url, &[("q", username.clone())])
            .await?;

        let wanted = normalize_permalink(url);
        results
            .into_iter()
            .filter_map(|item| decode_user(item, &search_url))
            .find(|profile| {
                profile
                    .attributes
                    .profile_url
                    .as_deref()
                    .map(|permalink| normalize_permalink(permalink) == wanted)
                    .unwrap_or(false)
            })
            .map(|profile| (profile.name, profile.id))
            .ok_or_else(|| DirectoryError::NotFound(format!("no artist matches {}", url)))
    }
}
