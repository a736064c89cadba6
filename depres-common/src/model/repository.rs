use std::fmt;

use serde::{Deserialize, Serialize};

pub const GOOGLE_MAVEN: &str = "https://maven.google.com/";
pub const MAVEN_CENTRAL: &str = "https://repo.maven.apache.org/maven2/";
pub const JCENTER: &str = "https://jcenter.bintray.com/";
pub const CLOJARS: &str = "https://repo.clojars.org/";
pub const ATLASSIAN_EXTERNAL: &str = "https://packages.atlassian.com/mvn/maven-atlassian-external/";

/// A Maven repository base URL. Always ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Repository {
    url: String,
}

impl Repository {
    pub fn new(url: impl Into<String>) -> Self {
        let mut url = url.into().trim().to_string();
        if !url.ends_with('/') {
            url.push('/');
        }
        Self { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Full URL for a repository-relative path such as `g/a/v/a-v.pom`.
    pub fn join(&self, relative_path: &str) -> String {
        format!("{}{}", self.url, relative_path.trim_start_matches('/'))
    }

    pub fn well_known() -> Vec<Repository> {
        [
            GOOGLE_MAVEN,
            MAVEN_CENTRAL,
            JCENTER,
            CLOJARS,
            ATLASSIAN_EXTERNAL,
        ]
        .into_iter()
        .map(Repository::new)
        .collect()
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Ordered repositories tried one after another for every artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryList {
    repositories: Vec<Repository>,
}

impl RepositoryList {
    /// Caller-supplied repositories first, followed by the well-known public ones.
    pub fn new<S: AsRef<str>>(extra: &[S]) -> Self {
        let mut list = Self::default();
        for url in extra {
            list.push(Repository::new(url.as_ref()));
        }
        for repository in Repository::well_known() {
            list.push(repository);
        }
        list
    }

    /// Exactly the given repositories, without the public defaults.
    pub fn only(repositories: impl IntoIterator<Item = Repository>) -> Self {
        let mut list = Self::default();
        for repository in repositories {
            list.push(repository);
        }
        list
    }

    fn push(&mut self, repository: Repository) {
        if !self.repositories.contains(&repository) {
            self.repositories.push(repository);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Repository> {
        self.repositories.iter()
    }

    pub fn as_slice(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// The list reordered so `preferred` is tried first.
    pub fn preferring(&self, preferred: Option<&Repository>) -> Vec<Repository> {
        let mut ordered = Vec::with_capacity(self.repositories.len());
        if let Some(preferred) = preferred {
            ordered.push(preferred.clone());
        }
        ordered.extend(
            self.repositories
                .iter()
                .filter(|r| Some(*r) != preferred)
                .cloned(),
        );
        ordered
    }
}

impl<'a> IntoIterator for &'a RepositoryList {
    type Item = &'a Repository;
    type IntoIter = std::slice::Iter<'a, Repository>;

    fn into_iter(self) -> Self::IntoIter {
        self.repositories.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_trailing_slash() {
        let repo = Repository::new("https://example.org/maven");
        assert_eq!(repo.url(), "https://example.org/maven/");
        assert_eq!(
            repo.join("/a/b/1.0/b-1.0.pom"),
            "https://example.org/maven/a/b/1.0/b-1.0.pom"
        );
        assert_eq!(repo, Repository::new("https://example.org/maven/"));
    }

    #[test]
    fn extra_repositories_come_before_defaults() {
        let list = RepositoryList::new(&["https://jitpack.io"]);
        assert_eq!(list.as_slice()[0].url(), "https://jitpack.io/");
        assert_eq!(list.len(), 1 + Repository::well_known().len());
    }

    #[test]
    fn duplicates_are_dropped() {
        let list = RepositoryList::new(&[MAVEN_CENTRAL, "https://repo.maven.apache.org/maven2"]);
        assert_eq!(list.as_slice()[0].url(), MAVEN_CENTRAL);
        assert_eq!(list.len(), Repository::well_known().len());
    }

    #[test]
    fn preferring_moves_repository_to_front() {
        let a = Repository::new("http://a/");
        let b = Repository::new("http://b/");
        let list = RepositoryList::only([a.clone(), b.clone()]);
        assert_eq!(list.preferring(Some(&b)), vec![b, a]);
    }
}
