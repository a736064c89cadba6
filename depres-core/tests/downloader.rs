mod common;

use std::sync::Arc;

use common::*;
use depres_common::model::Dependency;
use depres_core::{ArtifactDownloader, DownloadOptions, EventSink, StaticBaseline};
use depres_net::http::build_http_client;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader(fixture: &Fixture, server: &MockServer, options: DownloadOptions) -> ArtifactDownloader {
    ArtifactDownloader::new(
        &fixture.config,
        build_http_client(&fixture.config).unwrap(),
        repositories(&[server]),
        options,
        EventSink::disabled(),
    )
    .unwrap()
}

#[tokio::test]
async fn slots_follow_input_order() {
    let server = MockServer::start().await;
    let jar = zip_bytes(&[("A.class", b"a")]);
    serve_bytes(&server, &artifact_path("o", "first", "1", "jar"), jar.clone()).await;
    serve_bytes(&server, &artifact_path("o", "third", "1", "jar"), jar).await;

    let fixture = Fixture::new();
    let outcome = downloader(&fixture, &server, DownloadOptions::default())
        .download(&[
            Dependency::new("o", "first", "1"),
            Dependency::new("o", "second", "1"),
            Dependency::new("o", "third", "1"),
        ])
        .await;

    assert_eq!(outcome.files.len(), 3);
    assert!(outcome.files[0].as_ref().unwrap().ends_with("first-1.jar"));
    assert!(outcome.files[1].is_none());
    assert!(outcome.files[2].as_ref().unwrap().ends_with("third-1.jar"));
    assert_eq!(outcome.missing_count(), 1);
}

#[tokio::test]
async fn pom_packaging_and_baseline_are_skipped() {
    let server = MockServer::start().await;
    forbid(&server, &artifact_path("com.google.code.gson", "gson", "2.8.6", "jar")).await;
    forbid(&server, &artifact_path("o", "bom", "1", "jar")).await;

    let fixture = Fixture::new();
    let options = DownloadOptions {
        jar_only: false,
        baseline: Some(Arc::new(StaticBaseline::app_inventor())),
    };
    let outcome = downloader(&fixture, &server, options)
        .download(&[
            Dependency::new("com.google.code.gson", "gson", "2.8.6"),
            Dependency::new("o", "bom", "1").with_type("pom"),
        ])
        .await;

    assert_eq!(outcome.files, vec![None, None]);
}

#[tokio::test]
async fn cached_artifact_needs_no_network() {
    let server = MockServer::start().await;
    forbid(&server, &artifact_path("o", "cached", "1", "jar")).await;

    let fixture = Fixture::new();
    let cached = fixture.config.cache_dir().join("o/cached/1/cached-1.jar");
    std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
    std::fs::write(&cached, zip_bytes(&[("C.class", b"c")])).unwrap();

    let outcome = downloader(&fixture, &server, DownloadOptions::default())
        .download(&[Dependency::new("o", "cached", "1")])
        .await;

    assert_eq!(outcome.files, vec![Some(cached)]);
}

#[tokio::test]
async fn second_download_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(artifact_path("o", "once", "1", "jar")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes(&[("O.class", b"o")])))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    let dep = Dependency::new("o", "once", "1");
    let first = downloader(&fixture, &server, DownloadOptions::default())
        .download(std::slice::from_ref(&dep))
        .await;
    let second = downloader(&fixture, &server, DownloadOptions::default())
        .download(&[dep])
        .await;

    assert!(first.files[0].is_some());
    assert_eq!(first.files, second.files);
}

#[tokio::test]
async fn jar_only_extracts_classes_from_aar() {
    let server = MockServer::start().await;
    let aar = zip_bytes(&[
        ("AndroidManifest.xml", b"<manifest/>"),
        ("classes.jar", b"inner-jar"),
        ("res/layout/main.xml", b"<LinearLayout/>"),
    ]);
    serve_bytes(&server, &artifact_path("o", "widget", "1", "aar"), aar).await;

    let fixture = Fixture::new();
    let options = DownloadOptions {
        jar_only: true,
        baseline: None,
    };
    let widget = Dependency::new("o", "widget", "1").with_type("aar");
    let outcome = downloader(&fixture, &server, options.clone())
        .download(std::slice::from_ref(&widget))
        .await;

    let jar = outcome.files[0].clone().expect("classes.jar extracted");
    assert!(jar.ends_with("o/widget/1/widget-1.jar"));
    assert_eq!(std::fs::read(&jar).unwrap(), b"inner-jar");

    // A second run is served by the extracted jar.
    let again = downloader(&fixture, &server, options)
        .download(&[widget])
        .await;
    assert_eq!(again.files, vec![Some(jar)]);
}

#[tokio::test]
async fn non_archive_payload_is_discarded() {
    let server = MockServer::start().await;
    serve(
        &server,
        &artifact_path("o", "html", "1", "jar"),
        "<html><body>Please log in</body></html>",
    )
    .await;

    let fixture = Fixture::new();
    let outcome = downloader(&fixture, &server, DownloadOptions::default())
        .download(&[Dependency::new("o", "html", "1")])
        .await;

    assert_eq!(outcome.files, vec![None]);
    assert!(!fixture.config.cache_dir().join("o/html/1/html-1.jar").exists());
}
