// depres-core/src/extract.rs
// Pulls classes.jar out of an Android archive for jar-only consumers.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use depres_common::cache::Cache;
use depres_common::error::{DepresError, Result};
use tracing::debug;
use zip::ZipArchive;

const CLASSES_JAR: &str = "classes.jar";
const RESOURCE_DIR: &str = "res/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AarExtraction {
    pub classes_jar: PathBuf,
    /// The archive carries Android resources, which a bare jar loses.
    pub has_resources: bool,
}

/// Copies `classes.jar` from `aar_path` to `jar_path` (temp file + rename).
pub async fn extract_classes_jar(aar_path: &Path, jar_path: &Path) -> Result<AarExtraction> {
    let aar_path = aar_path.to_path_buf();
    let jar_path = jar_path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&aar_path, &jar_path))
        .await
        .map_err(|e| DepresError::Generic(format!("JoinError in AAR extraction: {e}")))?
}

fn extract_blocking(aar_path: &Path, jar_path: &Path) -> Result<AarExtraction> {
    debug!(
        "Extracting {} from {} to {}",
        CLASSES_JAR,
        aar_path.display(),
        jar_path.display()
    );
    let mut archive = ZipArchive::new(File::open(aar_path)?)?;
    let has_resources = archive
        .file_names()
        .any(|name| name.starts_with(RESOURCE_DIR));

    let mut entry = match archive.by_name(CLASSES_JAR) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(DepresError::NotFound(format!(
                "{} has no {}",
                aar_path.display(),
                CLASSES_JAR
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(parent) = jar_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let temp_path = Cache::temp_path_for(jar_path);
    let copied = File::create(&temp_path).and_then(|mut out| io::copy(&mut entry, &mut out));
    if let Err(e) = copied {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    std::fs::rename(&temp_path, jar_path)?;

    Ok(AarExtraction {
        classes_jar: jar_path.to_path_buf(),
        has_resources,
    })
}
