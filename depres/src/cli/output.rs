// depres/src/cli/output.rs
// Copies the pipeline's files into the user's output directory and writes the
// `dependencies.json` report next to them.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use depres_common::error::Result;
use depres_common::model::{Dependency, Repository};
use depres_common::pipeline::PipelineEvent;
use depres_core::pipeline::PipelineOutput;
use depres_core::{EventSink, PostProcessor};
use serde::Serialize;
use tracing::{debug, warn};

pub const REPORT_FILE_NAME: &str = "dependencies.json";

pub struct OutputCopier {
    dir: PathBuf,
}

impl OutputCopier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PostProcessor for OutputCopier {
    fn name(&self) -> &str {
        "copy-to-output"
    }

    fn process(
        &self,
        _root: &Dependency,
        files: Vec<PathBuf>,
        events: &EventSink,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)?;
        let mut taken = HashSet::new();
        let mut copied = Vec::with_capacity(files.len());
        for file in files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let mut dest = self.dir.join(name);
            if !taken.insert(dest.clone()) {
                // Same file name from another group: <group tail>/<artifact>/<version>/<file>.
                let group = file.ancestors().nth(3).and_then(Path::file_name);
                let renamed = group.map(|group| {
                    let mut prefixed = OsString::from(group);
                    prefixed.push("-");
                    prefixed.push(name);
                    self.dir.join(prefixed)
                });
                match renamed {
                    Some(renamed) if taken.insert(renamed.clone()) => dest = renamed,
                    _ => {
                        warn!("Skipping {}: {} already copied", file.display(), dest.display());
                        events.send(PipelineEvent::warn(format!(
                            "Not copying {}, another file is already named {}",
                            file.display(),
                            name.to_string_lossy()
                        )));
                        continue;
                    }
                }
            }
            if dest != file {
                debug!("Copying {} -> {}", file.display(), dest.display());
                fs::copy(&file, &dest)?;
            }
            copied.push(dest);
        }
        events.send(PipelineEvent::info(format!(
            "Copied {} files to {}",
            copied.len(),
            self.dir.display()
        )));
        Ok(copied)
    }
}

#[derive(Debug, Serialize)]
pub struct ResolutionReport<'a> {
    pub root: &'a Dependency,
    pub pom_url: &'a str,
    pub repository: Option<&'a Repository>,
    pub dependencies: &'a [Dependency],
    pub files: Vec<String>,
    pub missing: usize,
}

impl<'a> ResolutionReport<'a> {
    pub fn new(output: &'a PipelineOutput) -> Self {
        Self {
            root: &output.resolution.root,
            pom_url: &output.resolution.pom_url,
            repository: output.resolution.repository.as_ref(),
            dependencies: &output.resolution.dependencies,
            files: output
                .files
                .iter()
                .filter_map(|f| f.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect(),
            missing: output.download.missing_count(),
        }
    }

    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(REPORT_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}
