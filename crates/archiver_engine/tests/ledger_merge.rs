use std::fs;

use archiver_core::{AuthorEntry, CategoryEntry, Ledger, MergeOutcome, SyncEvent};
use archiver_engine::{
    load_ledger, ArchiveLayout, FetchSettings, LedgerMerger, RecordingProgressSink,
    ReqwestAssetFetcher, RestSource, TOTAL_PAGES_HEADER,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/wp-json/wp/v2";

fn page(total: u32, body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header(TOTAL_PAGES_HEADER, total.to_string().as_str())
        .set_body_json(body)
}

async fn mount_page(server: &MockServer, collection: &str, number: u32, total: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("{API}/{collection}")))
        .and(query_param("page", number.to_string()))
        .respond_with(page(total, body))
        .mount(server)
        .await;
}

fn source(server: &MockServer) -> RestSource {
    let client = FetchSettings::default().build_client().unwrap();
    RestSource::new(&format!("{}{API}", server.uri()), client, None).unwrap()
}

#[tokio::test]
async fn two_author_pages_fill_an_empty_ledger() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    let uri = server.uri();
    mount_page(
        &server,
        "users",
        1,
        2,
        json!([{
            "id": 11, "name": "Jane Doe", "slug": "jane", "description": "Writes.",
            "url": "https://jane.example", "avatar_urls": {"24": format!("{uri}/av/jane-24.png"), "96": format!("{uri}/av/jane.png?s=96")}
        }]),
    )
    .await;
    mount_page(
        &server,
        "users",
        2,
        2,
        json!([{
            "id": 12, "name": "John", "slug": "john",
            "avatar_urls": {"96": format!("{uri}/avatar/abc123?s=96&d=mm")}
        }]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/av/jane.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/avatar/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpg".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let layout = ArchiveLayout::new(temp.path());
    let source = source(&server);
    let fetcher = ReqwestAssetFetcher::new(reqwest::Client::new());
    let sink = RecordingProgressSink::new();
    let merger = LedgerMerger::new(&source, &fetcher, &layout, &sink);

    let result = merger.sync_authors().await.unwrap();

    let ids: Vec<(&str, u64, Option<&str>)> = result
        .ledger
        .iter()
        .map(|a| (a.id.as_str(), a.remote_id, a.avatar.as_deref()))
        .collect();
    assert_eq!(
        ids,
        vec![("jane", 11, Some("jane.png")), ("john", 12, Some("john.jpg"))]
    );
    assert!(layout.authors_dir().join("jane.png").is_file());
    assert!(layout.authors_dir().join("john.jpg").is_file());

    let persisted: Ledger<AuthorEntry> = load_ledger(&layout.authors_file()).unwrap();
    assert_eq!(persisted.entries(), result.ledger.entries());
    assert_eq!(sink.take(), result.events);
}

#[tokio::test]
async fn existing_author_only_gets_remote_id_refreshed() {
    let server = MockServer::start().await;
    let uri = server.uri();
    mount_page(
        &server,
        "users",
        1,
        1,
        json!([{
            "id": 99, "name": "Jane Renamed", "slug": "jane",
            "avatar_urls": {"96": format!("{uri}/av/jane.png")}
        }]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/av/jane.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let layout = ArchiveLayout::new(temp.path());
    fs::create_dir_all(layout.authors_dir()).unwrap();
    fs::write(
        layout.authors_file(),
        r#"[{"id":"jane","name":"Jane","bio":"Local bio","website":"","avatar":"jane.png","wordpressId":1,"twitter":"@jane"}]"#,
    )
    .unwrap();

    let source = source(&server);
    let fetcher = ReqwestAssetFetcher::new(reqwest::Client::new());
    let sink = RecordingProgressSink::new();
    let result = LedgerMerger::new(&source, &fetcher, &layout, &sink)
        .sync_authors()
        .await
        .unwrap();

    assert_eq!(result.ledger.len(), 1);
    let jane = result.ledger.get("jane").unwrap();
    assert_eq!(jane.name, "Jane");
    assert_eq!(jane.bio, "Local bio");
    assert_eq!(jane.remote_id, 99);
    assert_eq!(jane.extra.get("twitter"), Some(&json!("@jane")));
    assert_eq!(
        result.events,
        vec![SyncEvent::AuthorMerged {
            id: "jane".into(),
            outcome: MergeOutcome::Refreshed
        }]
    );

    let written: Value =
        serde_json::from_str(&fs::read_to_string(layout.authors_file()).unwrap()).unwrap();
    assert_eq!(written[0]["remoteId"], json!(99));
    assert_eq!(written[0]["twitter"], json!("@jane"));
}

#[tokio::test]
async fn categories_without_posts_are_left_out() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "categories",
        1,
        1,
        json!([
            {"id": 1, "name": "Uncategorized", "slug": "uncategorized", "count": 0},
            {"id": 2, "name": "News &amp; Notes", "slug": "news", "description": "Updates", "count": 3}
        ]),
    )
    .await;

    let temp = TempDir::new().unwrap();
    let layout = ArchiveLayout::new(temp.path());
    let source = source(&server);
    let fetcher = ReqwestAssetFetcher::new(reqwest::Client::new());
    let sink = RecordingProgressSink::new();
    let result = LedgerMerger::new(&source, &fetcher, &layout, &sink)
        .sync_categories()
        .await
        .unwrap();

    let entries: Vec<CategoryEntry> = result.ledger.into_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, "news");
    assert_eq!(entries[0].name, "News & Notes");
    assert_eq!(entries[0].remote_id, 2);
    assert!(result.events.contains(&SyncEvent::CategorySkipped {
        slug: "uncategorized".into()
    }));
    assert!(layout.categories_file().is_file());
}

#[tokio::test]
async fn missing_page_count_aborts_the_merge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/categories")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let layout = ArchiveLayout::new(temp.path());
    let source = source(&server);
    let fetcher = ReqwestAssetFetcher::new(reqwest::Client::new());
    let sink = RecordingProgressSink::new();
    let result = LedgerMerger::new(&source, &fetcher, &layout, &sink)
        .sync_categories()
        .await;

    assert!(result.is_err());
    assert!(!layout.categories_file().exists());
}

#[tokio::test]
async fn author_is_kept_when_avatar_download_fails() {
    let server = MockServer::start().await;
    let uri = server.uri();
    let avatar = format!("{uri}/av/gone.png");
    mount_page(
        &server,
        "users",
        1,
        1,
        json!([{"id": 3, "name": "Ghost", "slug": "ghost", "avatar_urls": {"96": avatar.clone()}}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/av/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let layout = ArchiveLayout::new(temp.path());
    let source = source(&server);
    let fetcher = ReqwestAssetFetcher::new(reqwest::Client::new());
    let sink = RecordingProgressSink::new();
    let result = LedgerMerger::new(&source, &fetcher, &layout, &sink)
        .sync_authors()
        .await
        .unwrap();

    let ghost = result.ledger.get("ghost").unwrap();
    assert_eq!(ghost.remote_id, 3);
    assert_eq!(ghost.avatar, None);
    assert!(!layout.authors_dir().join("ghost.png").exists());
    assert_eq!(
        result.events,
        vec![
            SyncEvent::AssetUnresolved { url: avatar },
            SyncEvent::AuthorMerged {
                id: "ghost".into(),
                outcome: MergeOutcome::Created
            },
        ]
    );

    let written: Value =
        serde_json::from_str(&fs::read_to_string(layout.authors_file()).unwrap()).unwrap();
    assert!(written[0].get("avatar").is_none());
}
