//! End-to-end crawls against a mock directory API

use echo_mesh::config::{
    Config, CrawlerConfig, DirectoryConfig, FailedExpansionPolicy, OutputConfig, TuningConfig,
};
use echo_mesh::crawler::Orchestrator;
use echo_mesh::directory::SoundCloudClient;
use echo_mesh::graph::ArtistId;
use echo_mesh::storage::{GraphStore, SessionStatus, SqliteGraphStore};
use echo_mesh::{resume_session, start_new_session, EchoError};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(api_url: &str, graph_dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            iteration_delay: 0,
            checkpoint_interval: 1,
            cache_clear_interval: 5,
            recent_seeds_capacity: 5,
            max_fetch_retries: 2,
            retry_backoff: 0,
            failed_expansion: FailedExpansionPolicy::Drop,
        },
        tuning: TuningConfig::default(),
        directory: DirectoryConfig {
            api_url: api_url.to_string(),
            client_id: "test-client".to_string(),
            page_size: 50,
            request_timeout: 5,
        },
        output: OutputConfig {
            graph_dir: graph_dir.display().to_string(),
        },
    }
}

fn user(id: u64, name: &str, followers: u64) -> Value {
    json!({
        "id": id,
        "username": name,
        "track_count": 4,
        "followers_count": followers,
        "public_favorites_count": 0,
        "permalink_url": format!("https://soundcloud.com/{}", name),
        "city": null,
        "country": null
    })
}

fn page(users: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "collection": users,
        "next_href": null
    }))
}

/// Mounts a three-artist world: alpha <-> beta <-> gamma
///
/// With `gamma_online` false, gamma's profile endpoint answers 404.
async fn mount_world(server: &MockServer, gamma_online: bool) {
    let alpha = user(1, "alpha", 100);
    let beta = user(2, "beta", 50);
    let gamma = user(3, "gamma", 20);

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("q", "alpha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([alpha.clone()])))
        .mount(server)
        .await;

    for (id, profile) in [(1, &alpha), (2, &beta)] {
        Mock::given(method("GET"))
            .and(path(format!("/users/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile.clone()))
            .mount(server)
            .await;
    }
    let gamma_profile = if gamma_online {
        ResponseTemplate::new(200).set_body_json(gamma.clone())
    } else {
        ResponseTemplate::new(404)
    };
    Mock::given(method("GET"))
        .and(path("/users/3"))
        .respond_with(gamma_profile)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/1/followings"))
        .respond_with(page(vec![beta.clone()]))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/2/followings"))
        .respond_with(page(vec![alpha.clone(), gamma.clone()]))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/3/followings"))
        .respond_with(page(vec![beta.clone()]))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/users/\d+/favorites$"))
        .respond_with(page(vec![]))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_then_resume_after_failure() {
    let server = MockServer::start().await;
    mount_world(&server, false).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let (graph_path, summary) =
        start_new_session(config.clone(), "https://soundcloud.com/alpha", "hash")
            .await
            .unwrap();

    assert_eq!(graph_path, dir.path().join("alpha.db"));
    assert_eq!(summary.explored, 2);
    assert_eq!(summary.failed, 1);

    let loaded = SqliteGraphStore::new(&graph_path)
        .unwrap()
        .load_graph()
        .unwrap();
    assert_eq!(loaded.graph.node_count(), 3);
    assert_eq!(loaded.graph.explored_count(), 2);
    assert!(loaded.graph.has_edge(ArtistId(1), ArtistId(2)));
    assert!(loaded.graph.has_edge(ArtistId(2), ArtistId(1)));
    assert!(loaded.graph.has_edge(ArtistId(2), ArtistId(3)));
    assert!(!loaded.graph.node(ArtistId(3)).unwrap().explored);

    // Gamma comes back online
    server.reset().await;
    mount_world(&server, true).await;

    let resumed = resume_session(config, &graph_path, "hash").await.unwrap();
    assert_eq!(resumed.explored, 1);
    assert_eq!(resumed.failed, 0);

    let store = SqliteGraphStore::new(&graph_path).unwrap();
    let loaded = store.load_graph().unwrap();
    assert_eq!(loaded.graph.explored_count(), 3);
    assert_eq!(loaded.graph.edge_count(), 4);
    assert!(loaded.graph.has_edge(ArtistId(3), ArtistId(2)));

    let latest = store.get_latest_session().unwrap().unwrap();
    assert_eq!(latest.id, resumed.session_id);
    assert_eq!(latest.status, SessionStatus::Completed);
}

#[tokio::test]
async fn test_orchestrator_over_http_directory() {
    let server = MockServer::start().await;
    mount_world(&server, true).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let client = SoundCloudClient::new(&config.directory).unwrap();
    let store = SqliteGraphStore::new(&dir.path().join("graph.db")).unwrap();

    let mut orchestrator =
        Orchestrator::start_new_session(config, client, store, ArtistId(1), "alpha", "hash")
            .unwrap();
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.explored, 3);
    assert_eq!(summary.nodes, 3);
    assert_eq!(summary.edges, 4);

    let session = orchestrator
        .store()
        .get_session(orchestrator.session_id())
        .unwrap();
    assert_eq!(session.seed, "alpha");
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.finished_at.is_some());
}

#[tokio::test]
async fn test_resume_of_missing_graph_fails() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config("http://127.0.0.1:9", dir.path());

    let result = resume_session(config, &dir.path().join("absent.db"), "hash").await;

    assert!(matches!(result, Err(EchoError::Session(_))));
}
