// Fixtures shared by the integration tests: a fake Maven repository served by
// wiremock and a throwaway cache directory.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::time::Duration;

use depres_common::config::Config;
use depres_common::model::{Repository, RepositoryList};
use depres_core::{EventSink, GraphResolver};
use depres_net::http::build_http_client;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_cache_root(dir.path().join("cache"));
        Self { dir, config }
    }

    pub fn resolver(&self, servers: &[&MockServer]) -> GraphResolver {
        let client = build_http_client(&self.config).unwrap();
        GraphResolver::new(&self.config, client, repositories(servers), EventSink::disabled())
            .unwrap()
    }
}

pub fn repositories(servers: &[&MockServer]) -> RepositoryList {
    RepositoryList::only(servers.iter().map(|s| Repository::new(s.uri())))
}

pub fn pom_path(g: &str, a: &str, v: &str) -> String {
    format!("/{}/{a}/{v}/{a}-{v}.pom", g.replace('.', "/"))
}

pub fn artifact_path(g: &str, a: &str, v: &str, ext: &str) -> String {
    format!("/{}/{a}/{v}/{a}-{v}.{ext}", g.replace('.', "/"))
}

/// A `<dependency>` element; `version` and `scope` are omitted when `None`.
pub fn dep_xml(g: &str, a: &str, version: Option<&str>, scope: Option<&str>) -> String {
    let mut xml = format!("<dependency><groupId>{g}</groupId><artifactId>{a}</artifactId>");
    if let Some(v) = version {
        xml.push_str(&format!("<version>{v}</version>"));
    }
    if let Some(s) = scope {
        xml.push_str(&format!("<scope>{s}</scope>"));
    }
    xml.push_str("</dependency>");
    xml
}

/// A POM with the given coordinates; `body` is inserted verbatim after them.
pub fn pom(g: &str, a: &str, v: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>{g}</groupId>
  <artifactId>{a}</artifactId>
  <version>{v}</version>
  {body}
</project>"#
    )
}

pub fn dependencies(deps: &[String]) -> String {
    format!("<dependencies>{}</dependencies>", deps.concat())
}

pub fn metadata(versions: &[&str], latest: &str) -> String {
    let listed: String = versions
        .iter()
        .map(|v| format!("<version>{v}</version>"))
        .collect();
    format!(
        "<metadata><versioning><latest>{latest}</latest><versions>{listed}</versions></versioning></metadata>"
    )
}

pub async fn serve(server: &MockServer, url_path: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(url_path.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
        .mount(server)
        .await;
}

pub async fn serve_bytes(server: &MockServer, url_path: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(url_path.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Serves `body` only after `delay`, to force an arrival order.
pub async fn serve_delayed(server: &MockServer, url_path: &str, body: impl Into<String>, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(url_path.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body.into())
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Answers 404 for `url_path` after `delay`.
pub async fn not_found_after(server: &MockServer, url_path: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(url_path.to_string()))
        .respond_with(ResponseTemplate::new(404).set_delay(delay))
        .mount(server)
        .await;
}

/// Fails the test on drop if `url_path` is ever requested.
pub async fn forbid(server: &MockServer, url_path: &str) {
    Mock::given(method("GET"))
        .and(path(url_path.to_string()))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

/// Bytes of a ZIP archive holding `entries`.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}
