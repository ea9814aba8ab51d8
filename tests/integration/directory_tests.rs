//! Tests for the SoundCloud directory client against a mock API

use echo_mesh::config::DirectoryConfig;
use echo_mesh::directory::{DirectoryClient, SoundCloudClient};
use echo_mesh::graph::ArtistId;
use echo_mesh::DirectoryError;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn directory_config(api_url: &str) -> DirectoryConfig {
    DirectoryConfig {
        api_url: api_url.to_string(),
        client_id: "test-client".to_string(),
        page_size: 2,
        request_timeout: 5,
    }
}

fn user(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "username": name,
        "track_count": 3,
        "followers_count": 10,
        "public_favorites_count": 1,
        "permalink_url": format!("https://soundcloud.com/{}", name),
        "city": null,
        "country": "DE"
    })
}

fn client_for(server: &MockServer) -> SoundCloudClient {
    SoundCloudClient::new(&directory_config(&server.uri())).unwrap()
}

#[tokio::test]
async fn test_following_follows_cursors_until_null() {
    let server = MockServer::start().await;

    // The cursor-specific page must be mounted first: it also matches the generic mock
    Mock::given(method("GET"))
        .and(path("/users/1/followings"))
        .and(query_param("cursor", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [user(3, "gamma")],
            "next_href": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/1/followings"))
        .and(query_param("client_id", "test-client"))
        .and(query_param("linked_partitioning", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [user(2, "beta"), {"id": 9}],
            "next_href": format!("{}/users/1/followings?cursor=200&limit=2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let following = client.fetch_following(ArtistId(1)).await.unwrap();

    let ids: Vec<ArtistId> = following.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![ArtistId(2), ArtistId(3)]);
    assert_eq!(following[0].attributes.city, None);
    assert_eq!(following[0].attributes.country.as_deref(), Some("DE"));
}

#[tokio::test]
async fn test_following_ids_keep_items_without_username() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1/followings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [user(2, "beta"), {"id": 9}],
            "next_href": null
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ids = client.fetch_following_ids(ArtistId(1)).await.unwrap();

    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&ArtistId(9)));
}

#[tokio::test]
async fn test_malformed_cursor_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1/followings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [user(2, "beta")],
            "next_href": format!("{}/users/1/followings?cursor=abc", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.fetch_following(ArtistId(1)).await;

    match result {
        Err(e @ DirectoryError::CursorParse(_)) => assert!(!e.is_transient()),
        other => panic!("expected cursor error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.fetch_profile(ArtistId(1)).await.unwrap_err();

    assert!(matches!(err, DirectoryError::RateLimited { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.fetch_profile(ArtistId(1)).await.unwrap_err();

    assert!(matches!(err, DirectoryError::Status { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.fetch_profile(ArtistId(404)).await.unwrap_err();

    assert!(matches!(err, DirectoryError::NotFound(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_null_attributes_are_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "username": "quiet",
            "track_count": null,
            "followers_count": null,
            "public_favorites_count": 4,
            "permalink_url": "https://soundcloud.com/quiet",
            "city": null,
            "country": null
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let profile = client.fetch_profile(ArtistId(5)).await.unwrap();

    assert_eq!(profile.name, "quiet");
    assert_eq!(profile.attributes.follower_count, None);
    assert_eq!(profile.attributes.track_count, None);
    assert_eq!(profile.attributes.favorite_count, Some(4));
}

#[tokio::test]
async fn test_resolve_matches_permalink_ignoring_scheme() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("q", "someone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            user(11, "someone-else"),
            {
                "id": 12,
                "username": "Someone",
                "permalink_url": "http://soundcloud.com/someone"
            }
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (name, id) = client
        .resolve_profile_url("https://soundcloud.com/someone")
        .await
        .unwrap();

    assert_eq!(name, "Someone");
    assert_eq!(id, ArtistId(12));
}

#[tokio::test]
async fn test_resolve_without_match_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user(11, "other")])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .resolve_profile_url("https://soundcloud.com/someone")
        .await;

    assert!(matches!(result, Err(DirectoryError::NotFound(_))));
}

#[tokio::test]
async fn test_favorites_are_reduced_to_uploaders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [
                {"user_id": 5, "user": {"username": "five"}},
                {"user_id": 6, "user": null},
                {"user_id": 5, "user": {"username": "five"}}
            ],
            "next_href": null
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let favorites = client.fetch_favorites(ArtistId(1)).await.unwrap();

    assert_eq!(favorites.len(), 2);
    assert!(favorites.iter().all(|f| f.user_id == ArtistId(5)));
}
