// depres-net/src/validation.rs
use std::path::Path;

use depres_common::error::{DepresError, Result};
use url::Url;

/// Container formats detected for jar and aar payloads (an aar may sniff as an apk).
const ZIP_FAMILY: &[&str] = &["zip", "jar", "apk"];

/// Validates a repository or artifact URL: it must parse and use http(s).
pub fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| DepresError::ValidationError(format!("Failed to parse URL '{url_str}': {e}")))?;
    match url.scheme() {
        "https" | "http" => Ok(()),
        other => Err(DepresError::ValidationError(format!(
            "Invalid URL scheme for '{url_str}': must be http or https, but got '{other}'"
        ))),
    }
}

/// Verifies that a downloaded jar/aar really is a ZIP container.
pub fn verify_zip_archive(path: &Path) -> Result<()> {
    let kind = infer::get_from_path(path)?;
    match kind {
        Some(kind) if ZIP_FAMILY.contains(&kind.extension()) => {
            tracing::debug!(
                "Content type verified for {}: {}",
                path.display(),
                kind.mime_type()
            );
            Ok(())
        }
        Some(kind) => Err(DepresError::ValidationError(format!(
            "Content type mismatch for {}: expected a ZIP archive, detected '{}'",
            path.display(),
            kind.mime_type()
        ))),
        None => Err(DepresError::ValidationError(format!(
            "Could not determine content type for {}",
            path.display()
        ))),
    }
}
