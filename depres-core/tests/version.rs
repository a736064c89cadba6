mod common;

use std::sync::Arc;

use common::*;
use depres_common::cache::Cache;
use depres_common::config::RangePolicy;
use depres_common::model::{Coordinate, ProjectProperty};
use depres_core::metadata::MetadataFetcher;
use depres_core::{EventSink, VersionResolver};
use depres_net::http::build_http_client;
use tokio::sync::Semaphore;
use wiremock::MockServer;

fn version_resolver(fixture: &Fixture, server: &MockServer) -> VersionResolver {
    let fetcher = MetadataFetcher::new(
        build_http_client(&fixture.config).unwrap(),
        Cache::new(&fixture.config).unwrap(),
        repositories(&[server]),
        fixture.config.metadata_ttl,
        Arc::new(Semaphore::new(4)),
        EventSink::disabled(),
    );
    VersionResolver::new(Arc::new(fetcher), RangePolicy::Nearest)
}

#[tokio::test]
async fn unknown_placeholder_without_metadata_stays_literal() {
    let server = MockServer::start().await;
    let fixture = Fixture::new();
    let version = version_resolver(&fixture, &server)
        .resolve("${lib.version}", &[], &Coordinate::new("u", "lib"), None)
        .await;
    assert_eq!(version, "${lib.version}");
}

#[tokio::test]
async fn unknown_placeholder_takes_latest_from_metadata() {
    let server = MockServer::start().await;
    serve(&server, "/u/lib/maven-metadata.xml", metadata(&["1.0", "1.2"], "1.2")).await;
    let fixture = Fixture::new();
    let version = version_resolver(&fixture, &server)
        .resolve("${lib.version}", &[], &Coordinate::new("u", "lib"), None)
        .await;
    assert_eq!(version, "1.2");
}

#[tokio::test]
async fn known_placeholder_needs_no_metadata() {
    let server = MockServer::start().await;
    forbid(&server, "/u/lib/maven-metadata.xml").await;
    let fixture = Fixture::new();
    let properties = [ProjectProperty::new("lib.version", "3.1")];
    let version = version_resolver(&fixture, &server)
        .resolve("${lib.version}", &properties, &Coordinate::new("u", "lib"), None)
        .await;
    assert_eq!(version, "3.1");
}

#[tokio::test]
async fn range_without_metadata_falls_back_to_lower_bound() {
    let server = MockServer::start().await;
    let fixture = Fixture::new();
    let resolver = version_resolver(&fixture, &server);
    let coordinate = Coordinate::new("u", "ranged");
    assert_eq!(resolver.resolve("[1.0,2.0)", &[], &coordinate, None).await, "1.0");
    assert_eq!(resolver.resolve("(,2.0]", &[], &coordinate, None).await, "2.0");
}
