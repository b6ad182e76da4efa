use async_trait::async_trait;
use modsync_lib::core::NullSink;
use modsync_lib::storage::{Credential, DropboxStore, RemoteStore};
use modsync_lib::{RemoteConnector, RemoteError, SyncContext, SyncEngine, SyncOutcome};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> DropboxStore {
    let credential = Credential::new("test-token").unwrap();
    DropboxStore::with_endpoints(&credential, &server.uri(), &server.uri()).unwrap()
}

fn file(name: &str) -> serde_json::Value {
    json!({
        ".tag": "file",
        "name": name,
        "id": format!("id:{}", name),
        "path_lower": format!("/mods/{}", name.to_lowercase()),
        "size": 42
    })
}

#[tokio::test]
async fn list_folder_follows_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({ "path": "/mods" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file("A.jar"), { ".tag": "folder", "name": "config", "id": "id:cfg" }],
            "cursor": "page-2",
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .and(body_json(json!({ "cursor": "page-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file("b.jar"), { ".tag": "deleted", "name": "gone.jar" }],
            "cursor": "page-3",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entries = store(&server).list_folder("/mods/").await.unwrap();

    let files: Vec<(&str, &str)> = entries
        .iter()
        .filter(|e| e.is_file)
        .map(|e| (e.name.as_str(), e.handle.as_str()))
        .collect();
    assert_eq!(files, vec![("A.jar", "/mods/a.jar"), ("b.jar", "/mods/b.jar")]);
    assert_eq!(entries.iter().filter(|e| !e.is_file).count(), 1);
}

#[tokio::test]
async fn root_folder_is_sent_as_empty_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(body_json(json!({ "path": "" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [],
            "cursor": "c",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(store(&server).list_folder("/").await.unwrap().is_empty());
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error_summary": "expired_access_token/..",
            "error": { ".tag": "expired_access_token" }
        })))
        .mount(&server)
        .await;

    match store(&server).list_folder("/mods").await {
        Err(RemoteError::Auth(summary)) => assert!(summary.contains("expired_access_token")),
        other => panic!("expected auth error, got {:?}", other.map(|e| e.len())),
    }
}

#[tokio::test]
async fn missing_path_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "path/not_found/..",
            "error": { ".tag": "path", "path": { ".tag": "not_found" } }
        })))
        .mount(&server)
        .await;

    let err = store(&server).list_folder("/missing").await.unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(_)), "{:?}", err);
}

#[tokio::test]
async fn server_error_maps_to_backend() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = store(&server).list_folder("/mods").await.unwrap_err();
    assert!(matches!(err, RemoteError::Backend(ref m) if m.contains("503")), "{:?}", err);
}

#[tokio::test]
async fn download_sends_api_arg_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header("Dropbox-API-Arg", r#"{"path":"/mods/a.jar"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04jar".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let data = store(&server).fetch_content("/mods/a.jar").await.unwrap();
    assert_eq!(&data[..], b"PK\x03\x04jar");
}

struct MockDropbox {
    uri: String,
}

#[async_trait]
impl RemoteConnector for MockDropbox {
    async fn connect(&self, credential: &Credential) -> Result<Arc<dyn RemoteStore>, RemoteError> {
        Ok(Arc::new(DropboxStore::with_endpoints(credential, &self.uri, &self.uri)?))
    }
}

#[tokio::test]
async fn engine_syncs_from_dropbox_api() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("old.jar"), "old").unwrap();

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file("new.jar"), file("notes.txt")],
            "cursor": "c",
            "has_more": false
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header("Dropbox-API-Arg", r#"{"path":"/mods/new.jar"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new mod".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let engine = SyncEngine::new(Arc::new(MockDropbox { uri: server.uri() }));
    let ctx = SyncContext::new(dir.path(), "/mods", Credential::new("test-token"));
    let report = engine.run_sync(&ctx, &NullSink).await.unwrap();

    assert!(matches!(report.outcome, SyncOutcome::Success));
    assert_eq!(std::fs::read(dir.path().join("new.jar")).unwrap(), b"new mod");
    assert!(!dir.path().join("old.jar").exists());
    assert!(!dir.path().join("notes.txt").exists());
}
