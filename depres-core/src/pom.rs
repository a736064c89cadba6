// depres-core/src/pom.rs
// Reads the parts of a POM the resolver cares about: coordinates, packaging,
// parent, properties, dependencyManagement and dependencies.

use std::borrow::Cow;
use std::path::Path;

use depres_common::error::{DepresError, Result};
use depres_common::model::{Dependency, ProjectProperty};
use roxmltree::{Document, Node};

/// A `<dependency>` (or `<parent>`) element exactly as written, before any
/// property substitution or version resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDependency {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub dep_type: Option<String>,
    pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomDocument {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<RawDependency>,
    /// Declared `<properties>` in document order.
    pub properties: Vec<ProjectProperty>,
    pub managed: Vec<RawDependency>,
    pub dependencies: Vec<RawDependency>,
}

impl PomDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let normalized = normalize_xml_entities(xml);
        let document = Document::parse(normalized.as_ref())?;
        let project = document.root_element();
        if project.tag_name().name() != "project" {
            return Err(DepresError::ParseError(
                "POM",
                format!("expected <project>, found <{}>", project.tag_name().name()),
            ));
        }

        Ok(Self {
            group_id: node_text(&project, "groupId"),
            artifact_id: node_text(&project, "artifactId"),
            version: node_text(&project, "version"),
            packaging: node_text(&project, "packaging"),
            parent: child(&project, "parent").map(|node| parse_dependency(&node)),
            properties: parse_properties(&project),
            managed: child(&project, "dependencyManagement")
                .map(|node| parse_dependency_list(&node))
                .unwrap_or_default(),
            dependencies: parse_dependency_list(&project),
        })
    }

    /// Parses a cached POM file. Any read or XML failure is reported as
    /// [`DepresError::MalformedPom`] so callers can degrade to "no dependencies".
    pub fn parse_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DepresError::MalformedPom(path.display().to_string(), e.to_string()))?;
        Self::parse(&text)
            .map_err(|e| DepresError::MalformedPom(path.display().to_string(), e.to_string()))
    }

    /// Declared properties followed by the implicit `project.*` ones, resolved
    /// against the coordinates the POM was fetched as.
    pub fn properties_for(&self, fetched_as: &Dependency) -> Vec<ProjectProperty> {
        let parent = self.parent.as_ref();
        let group_id = self
            .group_id
            .clone()
            .or_else(|| parent.and_then(|p| p.group_id.clone()))
            .unwrap_or_else(|| fetched_as.group_id.clone());
        let artifact_id = self
            .artifact_id
            .clone()
            .unwrap_or_else(|| fetched_as.artifact_id.clone());
        let version = self
            .version
            .clone()
            .or_else(|| parent.and_then(|p| p.version.clone()))
            .unwrap_or_else(|| fetched_as.version.clone());

        let mut properties = self.properties.clone();
        properties.push(ProjectProperty::new("project.groupId", group_id.clone()));
        properties.push(ProjectProperty::new("project.artifactId", artifact_id.clone()));
        properties.push(ProjectProperty::new("project.version", version.clone()));
        properties.push(ProjectProperty::new("pom.groupId", group_id));
        properties.push(ProjectProperty::new("pom.artifactId", artifact_id));
        properties.push(ProjectProperty::new("pom.version", version.clone()));
        properties.push(ProjectProperty::new("version", version));
        if let Some(parent) = parent {
            if let Some(v) = &parent.version {
                properties.push(ProjectProperty::new("project.parent.version", v.clone()));
            }
            if let Some(g) = &parent.group_id {
                properties.push(ProjectProperty::new("project.parent.groupId", g.clone()));
            }
        }
        properties
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
}

fn node_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|c| c.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn parse_properties(project: &Node<'_, '_>) -> Vec<ProjectProperty> {
    let Some(props) = child(project, "properties") else {
        return Vec::new();
    };
    props
        .children()
        .filter(|c| c.is_element())
        .map(|prop| {
            let value = prop.text().map(|t| t.trim().to_string()).unwrap_or_default();
            ProjectProperty::new(prop.tag_name().name(), value)
        })
        .collect()
}

/// Reads `<dependencies><dependency>...` directly under `node`.
fn parse_dependency_list(node: &Node<'_, '_>) -> Vec<RawDependency> {
    let Some(list) = child(node, "dependencies") else {
        return Vec::new();
    };
    list.children()
        .filter(|c| c.is_element() && c.tag_name().name() == "dependency")
        .map(|dep| parse_dependency(&dep))
        .collect()
}

fn parse_dependency(node: &Node<'_, '_>) -> RawDependency {
    RawDependency {
        group_id: node_text(node, "groupId"),
        artifact_id: node_text(node, "artifactId"),
        version: node_text(node, "version"),
        scope: node_text(node, "scope"),
        dep_type: node_text(node, "type"),
        optional: node_text(node, "optional")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
    }
}

/// roxmltree rejects DTD-only entities such as `&nbsp;` or `&copy;`, which
/// show up in license and description blocks. Replace unknown named entities
/// with a space.
fn normalize_xml_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        output.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        match tail.find(';').filter(|end| *end <= 32) {
            Some(end) => {
                let name = &tail[..end];
                if matches!(name, "lt" | "gt" | "amp" | "quot" | "apos") || name.starts_with('#')
                {
                    output.push('&');
                    output.push_str(name);
                    output.push(';');
                } else {
                    output.push(' ');
                }
                rest = &tail[end + 1..];
            }
            None => {
                output.push('&');
                rest = tail;
            }
        }
    }
    output.push_str(rest);
    Cow::Owned(output)
}
