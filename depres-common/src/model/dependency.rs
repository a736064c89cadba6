// depres-common/src/model/dependency.rs
use std::fmt;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::repository::Repository;
use crate::error::{DepresError, Result};

pub const DEFAULT_TYPE: &str = "jar";
pub const DEFAULT_SCOPE: &str = "compile";

static GRADLE_GROOVY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*implementation\s+['"]([^'"]+)['"]\s*$"#).expect("valid groovy regex")
});
static GRADLE_KOTLIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*implementation\s*\(\s*['"]([^'"]+)['"]\s*\)\s*$"#)
        .expect("valid kotlin regex")
});
static GRADLE_LONG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*implementation\s+group\s*:\s*['"]([^'"]+)['"]\s*,\s*name\s*:\s*['"]([^'"]+)['"]\s*,\s*version\s*:\s*['"]([^'"]+)['"]\s*$"#,
    )
    .expect("valid long-form regex")
});

/// The version-independent identity of an artifact family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
}

impl Coordinate {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// `org/example/lib`, the directory shared by every version of the artifact.
    pub fn relative_dir(&self) -> String {
        format!("{}/{}", self.group_id.replace('.', "/"), self.artifact_id)
    }

    pub fn metadata_path(&self) -> String {
        format!("{}/maven-metadata.xml", self.relative_dir())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// A Maven dependency as declared in a POM or supplied by the caller.
///
/// Equality and hashing only look at `(group_id, artifact_id, version)`; use
/// [`Dependency::same_coordinate`] when the version must be ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "type", default = "default_type")]
    pub dep_type: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_repository: Option<Repository>,
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

impl Dependency {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            dep_type: default_type(),
            scope: default_scope(),
            optional: false,
            resolved_repository: None,
        }
    }

    pub fn with_type(mut self, dep_type: impl Into<String>) -> Self {
        self.dep_type = dep_type.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Parses the declaration forms accepted on the command line:
    /// `implementation 'g:a:v'`, `implementation("g:a:v")`,
    /// `implementation group: 'g', name: 'a', version: 'v'` and bare `g:a[:v]`.
    pub fn from_gradle_notation(input: &str) -> Result<Self> {
        let notation = if let Some(caps) = GRADLE_LONG.captures(input) {
            format!("{}:{}:{}", &caps[1], &caps[2], &caps[3])
        } else if let Some(caps) = GRADLE_GROOVY
            .captures(input)
            .or_else(|| GRADLE_KOTLIN.captures(input))
        {
            caps[1].to_string()
        } else {
            input.trim().to_string()
        };

        let pieces: Vec<&str> = notation.split(':').map(str::trim).collect();
        match pieces.as_slice() {
            [group, artifact] if !group.is_empty() && !artifact.is_empty() => {
                Ok(Self::new(*group, *artifact, ""))
            }
            [group, artifact, version, ..] if !group.is_empty() && !artifact.is_empty() => {
                Ok(Self::new(*group, *artifact, *version))
            }
            _ => Err(DepresError::ParseError(
                "dependency notation",
                format!("cannot read '{input}' as group:artifact[:version]"),
            )),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.group_id, &self.artifact_id)
    }

    pub fn same_coordinate(&self, other: &Dependency) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }

    pub fn has_version(&self) -> bool {
        !self.version.trim().is_empty()
    }

    pub fn is_pom(&self) -> bool {
        self.dep_type.eq_ignore_ascii_case("pom")
    }

    /// `aar` for Android archives, `jar` for everything else.
    pub fn artifact_extension(&self) -> &'static str {
        if self.dep_type.eq_ignore_ascii_case("aar") {
            "aar"
        } else {
            "jar"
        }
    }

    /// `org/example/lib/1.0`
    pub fn relative_dir(&self) -> String {
        format!("{}/{}", self.coordinate().relative_dir(), self.version)
    }

    /// `org/example/lib/1.0/lib-1.0.pom`
    pub fn pom_path(&self) -> String {
        self.artifact_file_path("pom")
    }

    /// `org/example/lib/1.0/lib-1.0.<ext>`
    pub fn artifact_file_path(&self, ext: &str) -> String {
        format!(
            "{}/{}-{}.{}",
            self.relative_dir(),
            self.artifact_id,
            self.version,
            ext
        )
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.version == other.version
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
        self.artifact_id.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}:{}", self.group_id, self.artifact_id)
        } else {
            write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_type_and_scope() {
        let a = Dependency::new("org.example", "lib", "1.0").with_type("aar");
        let b = Dependency::new("org.example", "lib", "1.0").with_scope("runtime");
        let c = Dependency::new("org.example", "lib", "1.1");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.same_coordinate(&c));
    }

    #[test]
    fn paths_follow_repository_layout() {
        let dep = Dependency::new("com.google.code.gson", "gson", "2.8.9");
        assert_eq!(dep.relative_dir(), "com/google/code/gson/gson/2.8.9");
        assert_eq!(
            dep.pom_path(),
            "com/google/code/gson/gson/2.8.9/gson-2.8.9.pom"
        );
        assert_eq!(
            dep.artifact_file_path(dep.artifact_extension()),
            "com/google/code/gson/gson/2.8.9/gson-2.8.9.jar"
        );
        assert_eq!(
            dep.coordinate().metadata_path(),
            "com/google/code/gson/gson/maven-metadata.xml"
        );
    }

    #[test]
    fn aar_extension_only_for_aar_type() {
        let aar = Dependency::new("androidx.core", "core", "1.2.0").with_type("AAR");
        let bundle = Dependency::new("org.osgi", "core", "1.0").with_type("bundle");
        assert_eq!(aar.artifact_extension(), "aar");
        assert_eq!(bundle.artifact_extension(), "jar");
    }

    #[test]
    fn parses_gradle_declarations() {
        let groovy = Dependency::from_gradle_notation("implementation 'com.test:test:1.0'").unwrap();
        assert_eq!(groovy, Dependency::new("com.test", "test", "1.0"));

        let kotlin =
            Dependency::from_gradle_notation("implementation(\"com.test:test:1.0\")").unwrap();
        assert_eq!(kotlin, Dependency::new("com.test", "test", "1.0"));

        let long = Dependency::from_gradle_notation(
            "implementation group: 'com.test', name: 'test', version: '1.0'",
        )
        .unwrap();
        assert_eq!(long, Dependency::new("com.test", "test", "1.0"));

        let bare = Dependency::from_gradle_notation("com.test:test").unwrap();
        assert!(!bare.has_version());
    }

    #[test]
    fn rejects_incomplete_notation() {
        assert!(Dependency::from_gradle_notation("implementation 'com.test'").is_err());
        assert!(Dependency::from_gradle_notation(":test:1.0").is_err());
    }
}
