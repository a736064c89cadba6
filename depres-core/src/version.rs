// depres-core/src/version.rs
// Turns a raw <version> expression into a concrete version string.

use std::cmp::Ordering;
use std::sync::Arc;

use depres_common::config::RangePolicy;
use depres_common::model::version::find_property;
use depres_common::model::{Coordinate, DependencyVersion, ProjectProperty, Repository};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::metadata::MetadataFetcher;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder regex"));

/// Properties may point at other properties; stop after this many rounds.
const MAX_SUBSTITUTION_DEPTH: usize = 8;

/// Compares two version strings. When both parse as numbers they compare
/// numerically, otherwise case-insensitively as text.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.trim(), b.trim());
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Qualifier(String),
    Number(u64),
}

fn release_segments(version: &str) -> Vec<Segment> {
    version
        .trim()
        .split(['.', '-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<u64>() {
            Ok(n) => Segment::Number(n),
            Err(_) => Segment::Qualifier(part.to_lowercase()),
        })
        .collect()
}

/// Orders two releases segment by segment, so `2.10.0` is newer than `2.9.0`.
/// Numeric segments outrank qualifiers (`1.0` is newer than `1.0-rc1`) and
/// missing trailing segments count as zero. Used to settle version conflicts.
pub fn compare_release_versions(a: &str, b: &str) -> Ordering {
    let (a, b) = (release_segments(a), release_segments(b));
    let zero = Segment::Number(0);
    for i in 0..a.len().max(b.len()) {
        let ordering = a.get(i).unwrap_or(&zero).cmp(b.get(i).unwrap_or(&zero));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// A parsed `[a,b]`-style expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    /// `[1.0]`: exactly this version.
    Exact(String),
    /// Bounds are compared strictly whatever the bracket style; an empty
    /// bound is open.
    Bounded {
        lower: Option<String>,
        upper: Option<String>,
    },
}

impl VersionRange {
    /// Returns `None` for anything that is not a bracketed range.
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        if !expr.starts_with(['[', '(']) {
            return None;
        }
        // Only the first range of a union such as `[1,2),[3,4)` is honored.
        let close = expr[1..].find([']', ')'])? + 1;
        let inner = expr[1..close].trim();

        let bound = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        match inner.split_once(',') {
            Some((lower, upper)) => Some(VersionRange::Bounded {
                lower: bound(lower),
                upper: bound(upper),
            }),
            None if !inner.is_empty() => Some(VersionRange::Exact(inner.to_string())),
            None => None,
        }
    }

    pub fn contains(&self, version: &str) -> bool {
        match self {
            VersionRange::Exact(v) => compare_versions(v, version) == Ordering::Equal,
            VersionRange::Bounded { lower, upper } => {
                let above = lower
                    .as_deref()
                    .map_or(true, |l| compare_versions(version, l) == Ordering::Greater);
                let below = upper
                    .as_deref()
                    .map_or(true, |u| compare_versions(version, u) == Ordering::Less);
                above && below
            }
        }
    }

    /// What to fall back to when no listed version satisfies the range.
    pub fn fallback(&self) -> Option<&str> {
        match self {
            VersionRange::Exact(v) => Some(v),
            VersionRange::Bounded { lower, upper } => lower.as_deref().or(upper.as_deref()),
        }
    }

    /// Picks a version from `versions` according to `policy`.
    ///
    /// [`RangePolicy::Nearest`] returns the first listed version inside the
    /// range. [`RangePolicy::Latest`] returns the overall latest version as
    /// soon as any listed version is inside the range. Falls back to the
    /// lower bound when nothing matches.
    pub fn select(&self, versions: &DependencyVersion, policy: RangePolicy) -> Option<String> {
        if let VersionRange::Exact(v) = self {
            return Some(v.clone());
        }
        let mut inside = versions
            .available_versions
            .iter()
            .filter(|v| self.contains(v));
        let picked = match policy {
            RangePolicy::Nearest => inside.next().cloned(),
            RangePolicy::Latest => inside.next().map(|_| versions.latest_version.clone()),
        };
        picked.or_else(|| self.fallback().map(str::to_string))
    }
}

/// Replaces every `${name}` from `properties`, following chained references.
/// Returns `None` if a placeholder is left that no property defines.
pub fn substitute_properties(expr: &str, properties: &[ProjectProperty]) -> Option<String> {
    let mut current = expr.to_string();
    for _ in 0..MAX_SUBSTITUTION_DEPTH {
        if !current.contains("${") {
            return Some(current);
        }
        let mut missing = false;
        let next = PLACEHOLDER
            .replace_all(&current, |caps: &regex::Captures<'_>| {
                match find_property(properties, &caps[1]) {
                    Some(value) => value.to_string(),
                    None => {
                        missing = true;
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();
        if missing {
            return None;
        }
        current = next;
    }
    (!current.contains("${")).then_some(current)
}

/// Resolves version expressions, consulting repository metadata for
/// unresolved placeholders and ranges.
#[derive(Clone)]
pub struct VersionResolver {
    fetcher: Arc<MetadataFetcher>,
    policy: RangePolicy,
}

impl VersionResolver {
    pub fn new(fetcher: Arc<MetadataFetcher>, policy: RangePolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Resolves `raw` for `coordinate`. Always yields a string: when metadata
    /// is missing the (substituted) expression itself is returned.
    pub async fn resolve(
        &self,
        raw: &str,
        properties: &[ProjectProperty],
        coordinate: &Coordinate,
        repository: Option<&Repository>,
    ) -> String {
        let mut expr = raw.trim().to_string();

        if expr.contains("${") {
            match substitute_properties(&expr, properties) {
                Some(substituted) => expr = substituted,
                None => {
                    debug!("Unresolved placeholder '{}' for {}", expr, coordinate);
                    return match self.fetcher.versions(coordinate, repository).await {
                        Some(versions) => versions.latest_version,
                        None => {
                            info!("No metadata for {}; keeping '{}'", coordinate, expr);
                            expr
                        }
                    };
                }
            }
        }

        let Some(range) = VersionRange::parse(&expr) else {
            return expr;
        };
        if let VersionRange::Exact(v) = &range {
            return v.clone();
        }
        match self.fetcher.versions(coordinate, repository).await {
            Some(versions) => range.select(&versions, self.policy).unwrap_or(expr),
            None => {
                info!("No metadata for {}; keeping range '{}'", coordinate, expr);
                range.fallback().map(str::to_string).unwrap_or(expr)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(versions: &[&str], latest: &str) -> DependencyVersion {
        DependencyVersion::new(versions.iter().map(|s| s.to_string()).collect(), latest)
    }

    #[test]
    fn numeric_and_lexical_comparison() {
        assert_eq!(compare_versions("10", "9"), Ordering::Greater);
        assert_eq!(compare_versions("2", "10"), Ordering::Less);
        assert_eq!(compare_versions("1.5", "1.25"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.1", "1.0.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0-RC", "1.0-rc"), Ordering::Equal);
    }

    #[test]
    fn release_comparison_is_segment_wise() {
        assert_eq!(compare_release_versions("2.10.0", "2.9.0"), Ordering::Greater);
        assert_eq!(compare_release_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_release_versions("1.0", "1.0-rc1"), Ordering::Greater);
        assert_eq!(compare_release_versions("1.0.1", "1.0-SNAPSHOT"), Ordering::Greater);
        assert_eq!(compare_release_versions("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_release_versions("1.0-RC2", "1.0-rc1"), Ordering::Greater);
    }

    #[test]
    fn parses_range_forms() {
        assert_eq!(
            VersionRange::parse("[1.0,2.0)"),
            Some(VersionRange::Bounded {
                lower: Some("1.0".into()),
                upper: Some("2.0".into())
            })
        );
        assert_eq!(
            VersionRange::parse("[1.5,]"),
            Some(VersionRange::Bounded {
                lower: Some("1.5".into()),
                upper: None
            })
        );
        assert_eq!(
            VersionRange::parse("[1.0]"),
            Some(VersionRange::Exact("1.0".into()))
        );
        assert_eq!(
            VersionRange::parse("[1,2),[3,4)"),
            Some(VersionRange::Bounded {
                lower: Some("1".into()),
                upper: Some("2".into())
            })
        );
        assert_eq!(VersionRange::parse("1.0"), None);
        assert_eq!(VersionRange::parse("[]"), None);
    }

    #[test]
    fn bounds_are_strict() {
        let range = VersionRange::parse("[1.0,2.0]").unwrap();
        assert!(!range.contains("1.0"));
        assert!(range.contains("1.5"));
        assert!(!range.contains("2.0"));
    }

    #[test]
    fn nearest_takes_first_listed_match() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        let versions = listing(&["0.9", "1.1", "1.5", "2.0"], "2.0");
        assert_eq!(
            range.select(&versions, RangePolicy::Nearest).as_deref(),
            Some("1.1")
        );
        assert_eq!(
            range.select(&versions, RangePolicy::Latest).as_deref(),
            Some("2.0")
        );
    }

    #[test]
    fn falls_back_to_lower_bound() {
        let range = VersionRange::parse("[3.0,4.0)").unwrap();
        let versions = listing(&["1.0", "2.0"], "2.0");
        assert_eq!(
            range.select(&versions, RangePolicy::Nearest).as_deref(),
            Some("3.0")
        );
        let open_lower = VersionRange::parse("(,1.0]").unwrap();
        assert_eq!(
            open_lower.select(&listing(&[], "5"), RangePolicy::Nearest).as_deref(),
            Some("1.0")
        );
    }

    #[test]
    fn substitutes_chained_properties() {
        let props = vec![
            ProjectProperty::new("lib.version", "${base.version}"),
            ProjectProperty::new("base.version", "3.1"),
        ];
        assert_eq!(
            substitute_properties("${lib.version}", &props).as_deref(),
            Some("3.1")
        );
        assert_eq!(
            substitute_properties("[${base.version},4)", &props).as_deref(),
            Some("[3.1,4)")
        );
        assert_eq!(substitute_properties("${missing}", &props), None);
    }

    #[test]
    fn self_referencing_property_gives_up() {
        let props = vec![ProjectProperty::new("loop", "${loop}")];
        assert_eq!(substitute_properties("${loop}", &props), None);
    }
}
