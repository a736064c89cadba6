use serde::{Deserialize, Serialize};

/// Version listing for one coordinate, as reported by `maven-metadata.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyVersion {
    pub available_versions: Vec<String>,
    pub latest_version: String,
}

impl DependencyVersion {
    pub fn new(available_versions: Vec<String>, latest_version: impl Into<String>) -> Self {
        Self {
            available_versions,
            latest_version: latest_version.into(),
        }
    }
}

/// A `<properties>` entry of a POM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProperty {
    pub name: String,
    pub value: String,
}

impl ProjectProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

pub fn find_property<'a>(properties: &'a [ProjectProperty], name: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.value.as_str())
}
