//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a listing page and service pages, and
//! run the full crawl cycle end-to-end against a temporary SQLite database.

use service_harvester::config::{parse_config, Config};
use service_harvester::crawler::{crawl, CancelHandle, Coordinator};
use service_harvester::output::{export_catalogue, load_statistics};
use service_harvester::record::{Form, Service};
use service_harvester::storage::{
    RunCounts, RunRecord, RunStatus, ServiceCatalog, SqliteStorage, Storage, StorageError,
    StorageResult,
};
use service_harvester::{HarvestError, SkipReason};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/dienstleistungen/";

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, db_path: &Path, workers: u32) -> Config {
    parse_config(&format!(
        r#"
[crawler]
seed-url = "{}{}"
workers = {}
request-timeout-secs = 1

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
database-path = "{}"
catalogue-path = "./unused.md"
"#,
        server.uri(),
        LISTING_PATH,
        workers,
        db_path.display()
    ))
    .expect("test config should be valid")
}

/// Serves a listing page linking to the given paths
async fn mount_listing(server: &MockServer, links: &[&str]) {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<li><a href="{}">{}</a></li>"#, link, link))
        .collect();
    let body = format!(
        r#"<html><body>
        <nav><a href="/impressum">Impressum</a></nav>
        <div class="span7"><ul>{}</ul></div>
        </body></html>"#,
        anchors
    );

    mount_page(server, LISTING_PATH, &body).await;
}

async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

fn open(db_path: &Path) -> SqliteStorage {
    SqliteStorage::new(db_path).expect("Failed to open test database")
}

#[tokio::test]
async fn test_three_link_scenario() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    mount_listing(&server, &["/d/a/", "/d/b/", "/d/c/"]).await;
    mount_page(
        &server,
        "/d/a/",
        "<html><body><h1>Anmeldung</h1><h2>Gebühren</h2><p>10 EUR</p></body></html>",
    )
    .await;
    mount_page(
        &server,
        "/d/b/",
        "<html><body><h2>Gebühren</h2><p>5 EUR</p></body></html>",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/d/c/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<h1>Zu spät</h1>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = create_test_config(&server, &db_path, 1);
    let summary = crawl(config, "test-hash".to_string()).await.unwrap();

    assert_eq!(summary.total_links, 3);
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.persist_failures, 0);
    assert_eq!(summary.reason_count(SkipReason::MissingTitle), 1);
    assert_eq!(summary.reason_count(SkipReason::FetchTimeout), 1);
    assert!(!summary.interrupted);

    let storage = open(&db_path);
    let services = storage.list_services(0, 10).unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].title, "Anmeldung");
    assert_eq!(services[0].fees, "10 EUR");
    assert!(services[0].forms.is_empty());
    assert!(services[0].source_url.ends_with("/d/a/"));

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(
        run.counts,
        RunCounts {
            links_total: 3,
            attempted: 3,
            persisted: 1,
            skipped: 2,
            persist_failures: 0,
        }
    );
}

#[tokio::test]
async fn test_failed_link_does_not_stop_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    mount_listing(&server, &["/d/1/", "/d/2/", "/d/3/"]).await;
    mount_page(&server, "/d/1/", "<h1>Eins</h1>").await;
    Mock::given(method("GET"))
        .and(path("/d/2/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/d/3/", "<h1>Drei</h1>").await;

    let config = create_test_config(&server, &db_path, 1);
    let summary = crawl(config, "h".to_string()).await.unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.persisted, 2);
    assert_eq!(summary.reason_count(SkipReason::FetchError), 1);

    let titles: Vec<String> = open(&db_path)
        .list_services(0, 10)
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["Eins", "Drei"]);
}

#[tokio::test]
async fn test_seed_failure_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&server, &db_path, 1);
    let result = crawl(config, "h".to_string()).await;

    match result {
        Err(HarvestError::SeedFetch { url, .. }) => assert!(url.ends_with(LISTING_PATH)),
        other => panic!("Expected SeedFetch error, got {:?}", other),
    }
    assert!(open(&db_path).get_latest_run().unwrap().is_none());
}

#[tokio::test]
async fn test_empty_listing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    mount_listing(&server, &[]).await;

    let config = create_test_config(&server, &db_path, 2);
    let summary = crawl(config, "h".to_string()).await.unwrap();

    assert_eq!(summary.total_links, 0);
    assert_eq!(summary.attempted, 0);
    assert!(!summary.interrupted);
    assert_eq!(
        open(&db_path).get_latest_run().unwrap().unwrap().status,
        RunStatus::Completed
    );
}

#[tokio::test]
async fn test_form_rows_validated_individually() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    // Hrefs are measured as written, so a relative one may use the full bound.
    let at_bound = format!("/formular/{}", "a".repeat(2048 - "/formular/".len()));
    let prefix = "https://forms.example.org/";
    let over_bound = format!("{}{}", prefix, "b".repeat(2049 - prefix.len()));
    assert_eq!(at_bound.len(), 2048);
    assert_eq!(over_bound.len(), 2049);

    let page = format!(
        r#"<html><body>
        <h1>Gewerbeanmeldung</h1>
        <h2>Formulare</h2>
        <ul>
            <li><a href="{}">Langer Antrag</a></li>
            <li><a href="{}">Zu langer Antrag</a></li>
            <li><a href="/formular/leer.pdf"> </a></li>
            <li><a href="/formular/gewerbe.pdf">Gewerbeanmeldung</a></li>
        </ul>
        <h2>Rechtsgrundlagen</h2>
        <ul><li><a href="/gesetz.pdf">Gewerbeordnung</a></li></ul>
        </body></html>"#,
        at_bound, over_bound
    );
    mount_listing(&server, &["/d/gewerbe/"]).await;
    mount_page(&server, "/d/gewerbe/", &page).await;

    let config = create_test_config(&server, &db_path, 1);
    let summary = crawl(config, "h".to_string()).await.unwrap();

    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.forms_persisted, 2);
    assert_eq!(summary.forms_dropped, 2);
    assert_eq!(summary.reason_count(SkipReason::UrlTooLong), 1);
    assert_eq!(summary.reason_count(SkipReason::FormTitleMissing), 1);

    let services = open(&db_path).list_services(0, 10).unwrap();
    let forms = &services[0].forms;
    assert_eq!(forms.len(), 2);
    assert_eq!(forms[0].url, at_bound);
    assert_eq!(forms[1].title, "Gewerbeanmeldung");
    assert_eq!(forms[1].url, "/formular/gewerbe.pdf");
    assert_eq!(services[0].legal_basis, "Gewerbeordnung");
}

#[tokio::test]
async fn test_fees_fallback_only_for_fees() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    mount_listing(&server, &["/d/x/"]).await;
    mount_page(
        &server,
        "/d/x/",
        "<h1>Beglaubigung</h1><h2>Gebühren</h2><h2>Rechtsgrundlagen</h2><p>BeurkG</p>",
    )
    .await;

    let config = create_test_config(&server, &db_path, 1);
    crawl(config, "h".to_string()).await.unwrap();

    // Absent prerequisites become empty while absent fees get the fallback text.
    let service = &open(&db_path).list_services(0, 1).unwrap()[0];
    assert_eq!(service.fees, "Keine Gebühren gefunden");
    assert_eq!(service.prerequisites, "");
    assert_eq!(service.required_documents, "");
    assert_eq!(service.legal_basis, "BeurkG");
}

#[tokio::test]
async fn test_multiple_workers_persist_every_record() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    let paths: Vec<String> = (0..12).map(|i| format!("/d/{}/", i)).collect();
    let links: Vec<&str> = paths.iter().map(String::as_str).collect();
    mount_listing(&server, &links).await;
    for (i, page_path) in paths.iter().enumerate() {
        let body = format!(
            r#"<h1>Dienstleistung {}</h1>
            <h2>Formulare</h2><ul><li><a href="/f/{}.pdf">Antrag {}</a></li></ul>"#,
            i, i, i
        );
        mount_page(&server, page_path, &body).await;
    }

    let config = create_test_config(&server, &db_path, 4);
    let summary = crawl(config, "h".to_string()).await.unwrap();

    assert_eq!(summary.attempted, 12);
    assert_eq!(summary.persisted, 12);
    assert_eq!(summary.forms_persisted, 12);

    let storage = open(&db_path);
    assert_eq!(storage.count_services().unwrap(), 12);
    assert_eq!(storage.count_forms().unwrap(), 12);
    for service in storage.list_services(0, 20).unwrap() {
        assert_eq!(service.forms.len(), 1);
        let n = service.title.trim_start_matches("Dienstleistung ");
        assert_eq!(service.forms[0].title, format!("Antrag {}", n));
    }
}

/// Storage that rejects one service by title
struct RejectingStorage {
    inner: SqliteStorage,
    reject_title: &'static str,
}

impl Storage for RejectingStorage {
    fn create_run(&mut self, config_hash: &str, seed_url: &str) -> StorageResult<i64> {
        self.inner.create_run(config_hash, seed_url)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counts: &RunCounts,
    ) -> StorageResult<()> {
        self.inner.finish_run(run_id, status, counts)
    }

    fn find_latest_run(
        &self,
        config_hash: &str,
        seed_url: &str,
    ) -> StorageResult<Option<RunRecord>> {
        self.inner.find_latest_run(config_hash, seed_url)
    }

    fn reopen_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.inner.reopen_run(run_id)
    }

    fn persisted_source_urls(&self, run_id: i64) -> StorageResult<HashSet<String>> {
        self.inner.persisted_source_urls(run_id)
    }

    fn insert_service(&mut self, service: &Service, run_id: Option<i64>) -> StorageResult<i64> {
        self.inner.insert_service(service, run_id)
    }

    fn insert_form(&mut self, form: &Form, service_id: i64) -> StorageResult<i64> {
        self.inner.insert_form(form, service_id)
    }

    fn persist_service(&mut self, service: &Service, run_id: Option<i64>) -> StorageResult<i64> {
        if service.title == self.reject_title {
            return Err(StorageError::Database("disk full".to_string()));
        }
        self.inner.persist_service(service, run_id)
    }
}

#[tokio::test]
async fn test_persist_failure_is_isolated() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    mount_listing(&server, &["/d/a/", "/d/b/", "/d/c/"]).await;
    mount_page(&server, "/d/a/", "<h1>A</h1>").await;
    mount_page(&server, "/d/b/", "<h1>B</h1>").await;
    mount_page(&server, "/d/c/", "<h1>C</h1>").await;

    let config = create_test_config(&server, &db_path, 1);
    let storage = RejectingStorage {
        inner: open(&db_path),
        reject_title: "B",
    };
    let mut coordinator = Coordinator::new(config, "h".to_string(), storage).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.persisted, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.persist_failures, 1);
    assert_eq!(summary.reason_count(SkipReason::PersistError), 1);

    let storage = open(&db_path);
    let titles: Vec<String> = storage
        .list_services(0, 10)
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["A", "C"]);
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().counts.persist_failures,
        1
    );
}

/// Storage that cancels the crawl once it has stored `cancel_after` services
struct CancellingStorage {
    inner: SqliteStorage,
    cancel: Arc<Mutex<Option<CancelHandle>>>,
    cancel_after: usize,
    stored: usize,
}

impl Storage for CancellingStorage {
    fn create_run(&mut self, config_hash: &str, seed_url: &str) -> StorageResult<i64> {
        self.inner.create_run(config_hash, seed_url)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counts: &RunCounts,
    ) -> StorageResult<()> {
        self.inner.finish_run(run_id, status, counts)
    }

    fn find_latest_run(
        &self,
        config_hash: &str,
        seed_url: &str,
    ) -> StorageResult<Option<RunRecord>> {
        self.inner.find_latest_run(config_hash, seed_url)
    }

    fn reopen_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.inner.reopen_run(run_id)
    }

    fn persisted_source_urls(&self, run_id: i64) -> StorageResult<HashSet<String>> {
        self.inner.persisted_source_urls(run_id)
    }

    fn insert_service(&mut self, service: &Service, run_id: Option<i64>) -> StorageResult<i64> {
        self.inner.insert_service(service, run_id)
    }

    fn insert_form(&mut self, form: &Form, service_id: i64) -> StorageResult<i64> {
        self.inner.insert_form(form, service_id)
    }

    fn persist_service(&mut self, service: &Service, run_id: Option<i64>) -> StorageResult<i64> {
        let id = self.inner.persist_service(service, run_id)?;
        self.stored += 1;
        if self.stored == self.cancel_after {
            if let Some(handle) = self.cancel.lock().unwrap().as_ref() {
                handle.cancel();
            }
        }
        Ok(id)
    }
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_without_duplicates() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    let paths: Vec<String> = (0..8).map(|i| format!("/d/{}/", i)).collect();
    let links: Vec<&str> = paths.iter().map(String::as_str).collect();
    mount_listing(&server, &links).await;
    for (i, page_path) in paths.iter().enumerate() {
        mount_page(&server, page_path, &format!("<h1>Dienstleistung {}</h1>", i)).await;
    }

    // First session: cancelled after two services are stored.
    let cancel = Arc::new(Mutex::new(None));
    let storage = CancellingStorage {
        inner: open(&db_path),
        cancel: Arc::clone(&cancel),
        cancel_after: 2,
        stored: 0,
    };
    let mut coordinator =
        Coordinator::new(create_test_config(&server, &db_path, 1), "h".to_string(), storage)
            .unwrap();
    *cancel.lock().unwrap() = Some(coordinator.cancel_handle());
    let first = coordinator.run().await.unwrap();

    assert!(first.interrupted);
    assert!(first.persisted >= 2);
    assert!(first.persisted < 8);
    let run_id = first.run_id.unwrap();
    assert_eq!(
        open(&db_path).get_run(run_id).unwrap().status,
        RunStatus::Interrupted
    );

    // Second session picks up the same run and only crawls what is missing.
    let second = crawl(create_test_config(&server, &db_path, 1), "h".to_string())
        .await
        .unwrap();

    assert_eq!(second.run_id, Some(run_id));
    assert!(!second.interrupted);
    assert_eq!(second.already_persisted, first.persisted);
    assert_eq!(second.attempted, 8 - first.persisted);
    assert_eq!(second.persisted, 8 - first.persisted);

    let storage = open(&db_path);
    let services = storage.list_services(0, 20).unwrap();
    assert_eq!(services.len(), 8);
    let urls: HashSet<&str> = services.iter().map(|s| s.source_url.as_str()).collect();
    assert_eq!(urls.len(), 8);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.counts.persisted, 8);
}

#[tokio::test]
async fn test_completed_crawl_starts_new_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    mount_listing(&server, &["/d/a/"]).await;
    mount_page(&server, "/d/a/", "<h1>Anmeldung</h1>").await;

    let first = crawl(create_test_config(&server, &db_path, 1), "h".to_string())
        .await
        .unwrap();
    let second = crawl(create_test_config(&server, &db_path, 1), "h".to_string())
        .await
        .unwrap();

    // A finished run is never reopened, so the re-crawl stores new rows.
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.already_persisted, 0);
    assert_eq!(open(&db_path).count_services().unwrap(), 2);
}

#[tokio::test]
async fn test_repeated_listing_links_are_each_attempted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");

    mount_listing(&server, &["/d/a/", "/d/b/", "/d/a/"]).await;
    mount_page(&server, "/d/a/", "<h1>Anmeldung</h1>").await;
    mount_page(&server, "/d/b/", "<h1>Abmeldung</h1>").await;

    let summary = crawl(create_test_config(&server, &db_path, 1), "h".to_string())
        .await
        .unwrap();

    assert_eq!(summary.total_links, 3);
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.persisted, 3);
}

#[tokio::test]
async fn test_reports_over_crawled_data() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("services.db");
    let catalogue_path = dir.path().join("services.md");

    mount_listing(&server, &["/d/1/", "/d/2/"]).await;
    mount_page(
        &server,
        "/d/1/",
        r#"<h1>Anmeldung</h1><h2>Gebühren</h2><p>gebührenfrei</p>
        <h2>Formulare</h2><ul><li><a href="/a.pdf">Anmeldeformular</a></li></ul>"#,
    )
    .await;
    mount_page(&server, "/d/2/", "<h1>Abmeldung</h1>").await;

    let config = create_test_config(&server, &db_path, 2);
    let labels = config.extraction.labels.clone();
    crawl(config, "h".to_string()).await.unwrap();

    let mut storage = open(&db_path);
    let stats = load_statistics(&storage, "Keine Gebühren gefunden").unwrap();
    assert_eq!(stats.services, 2);
    assert_eq!(stats.forms, 1);
    assert_eq!(stats.services_without_forms, 1);
    assert_eq!(stats.services_with_fees_fallback, 1);
    assert!(stats.latest_run.is_some());

    let written = export_catalogue(&storage, &labels, &catalogue_path).unwrap();
    assert_eq!(written, 2);
    let markdown = std::fs::read_to_string(&catalogue_path).unwrap();
    assert!(markdown.contains("## Anmeldung"));
    assert!(markdown.contains("## Abmeldung"));
    assert!(markdown.contains("[Anmeldeformular]("));

    // Deleting a service takes its forms with it.
    let anmeldung = storage
        .list_services(0, 10)
        .unwrap()
        .into_iter()
        .find(|s| s.title == "Anmeldung")
        .and_then(|s| s.id)
        .unwrap();
    assert!(storage.delete_service(anmeldung).unwrap());
    assert_eq!(storage.count_forms().unwrap(), 0);
}
