use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use phasemeta::config::{FileSourceConfig, HttpSourceConfig, SourceConfig};
use phasemeta::sources::{ConfiguredSource, HttpSource};
use phasemeta::{FetchError, LazyFetchCell, MetadataSource, PhaseIndexBuilder};

use crate::utils::{Server, setup};

const PHASES: &str = r#"[
    {"PhaseId": 100, "PhaseType": "Fab", "ProductLetter": "K"},
    {"PhaseId": 200, "PhaseType": "Sort", "ProductLetter": null},
    {"PhaseId": 100, "PhaseType": "Rework", "ProductLetter": "K"}
]"#;

fn http_config(url: String) -> HttpSourceConfig {
    HttpSourceConfig {
        timeout: Duration::from_secs(5),
        ..HttpSourceConfig::new(url)
    }
}

async fn phases_server(hits: Arc<AtomicUsize>) -> Server {
    let router = Router::new()
        .route("/phases", get(|| async { PHASES }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/forbidden", get(|| async { StatusCode::FORBIDDEN }))
        .route("/broken", get(|| async { "this is not json" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                PHASES
            }),
        )
        .route(
            "/auth",
            get(|headers: HeaderMap| async move {
                match headers.get("authorization") {
                    Some(value) if value == "Bearer secret" => (StatusCode::OK, PHASES),
                    _ => (StatusCode::UNAUTHORIZED, ""),
                }
            }),
        )
        .route(
            "/flaky",
            get(move || {
                let hits = Arc::clone(&hits);
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, "")
                    } else {
                        (StatusCode::OK, PHASES)
                    }
                }
            }),
        );

    Server::new(router).await
}

#[tokio::test]
async fn test_http_source() {
    setup();
    let server = phases_server(Default::default()).await;
    let source = HttpSource::from_config(&http_config(server.url("phases"))).unwrap();

    let records = source.fetch_all().await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[1].phase_id, 200);
    assert_eq!(records[1].product_letter, None);
}

#[tokio::test]
async fn test_http_source_errors() {
    setup();
    let server = phases_server(Default::default()).await;

    let fetch = |path: &str| {
        let source = HttpSource::from_config(&http_config(server.url(path))).unwrap();
        async move { source.fetch_all().await }
    };

    assert_eq!(fetch("missing").await.unwrap_err(), FetchError::NotFound);
    assert_eq!(
        fetch("forbidden").await.unwrap_err(),
        FetchError::PermissionDenied("403 Forbidden".into())
    );
    assert!(matches!(
        fetch("broken").await.unwrap_err(),
        FetchError::Malformed(_)
    ));
}

#[tokio::test]
async fn test_http_source_timeout() {
    setup();
    let server = phases_server(Default::default()).await;
    let mut config = http_config(server.url("slow"));
    config.timeout = Duration::from_millis(100);
    let source = HttpSource::from_config(&config).unwrap();

    assert_eq!(
        source.fetch_all().await.unwrap_err(),
        FetchError::Timeout(Duration::from_millis(100))
    );
}

#[tokio::test]
async fn test_http_source_headers() {
    setup();
    let server = phases_server(Default::default()).await;

    let source = HttpSource::from_config(&http_config(server.url("auth"))).unwrap();
    assert!(matches!(
        source.fetch_all().await.unwrap_err(),
        FetchError::PermissionDenied(_)
    ));

    let mut config = http_config(server.url("auth"));
    config
        .headers
        .insert("Authorization".into(), "Bearer secret".into());
    let source = HttpSource::from_config(&config).unwrap();
    assert_eq!(source.fetch_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_invalid_url() {
    assert!(HttpSource::from_config(&http_config("not a url".into())).is_err());
}

#[tokio::test]
async fn test_flaky_server_recovers_within_one_call() {
    setup();
    let hits = Arc::new(AtomicUsize::new(0));
    let server = phases_server(Arc::clone(&hits)).await;
    let config = SourceConfig::Http(http_config(server.url("flaky")));
    let source = ConfiguredSource::from_config(&config).unwrap();
    let builder = PhaseIndexBuilder::new(LazyFetchCell::new(source));

    let err = builder.build_default_index::<u8>().await.unwrap_err();
    assert_eq!(
        err,
        FetchError::DownloadError("503 Service Unavailable".into())
    );
    // the eager re-fetch already went out and succeeded
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let index = builder.build_default_index::<u8>().await.unwrap();
    assert_eq!(index.len(), 2);
    let (phase, _) = index.get_key_value(&100).unwrap();
    assert_eq!(phase.phase_type.as_deref(), Some("Rework"));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_file_source_through_cell() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("phases.json");

    let config = SourceConfig::File(FileSourceConfig { path: path.clone() });
    let source = ConfiguredSource::from_config(&config).unwrap();
    let cell = LazyFetchCell::new(source);

    assert_eq!(cell.get_or_fetch().await.unwrap_err(), FetchError::NotFound);

    std::fs::write(&path, PHASES).unwrap();
    let records = cell.get_or_fetch().await.unwrap();
    assert_eq!(records.len(), 3);

    // once fetched, the file is not read again
    std::fs::remove_file(&path).unwrap();
    let again = cell.get_or_fetch().await.unwrap();
    assert!(Arc::ptr_eq(&records, &again));
}
