//! Finds candidate suite modules in the suite directory.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::config::HarnessConfig;
use crate::error::HarnessError;

/// A file in the suite directory that may hold a suite module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Candidate {
    /// Module name: the file name without the source extension.
    pub module: String,
    /// File name within the suite directory.
    pub file_name: String,
    pub path: PathBuf,
}

/// Finds candidate suite modules in a single directory.
///
/// A file is a candidate when its name ends with the source extension and
/// does not begin with the bootstrap file name. Subdirectories are not
/// entered.
#[derive(Debug, Clone)]
pub struct Discovery {
    dir: PathBuf,
    suffix: String,
    bootstrap_file: String,
}

impl Discovery {
    pub fn new(
        dir: impl Into<PathBuf>,
        extension: &str,
        bootstrap_file: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            suffix: format!(".{extension}"),
            bootstrap_file: bootstrap_file.into(),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            &config.suite_dir,
            &config.source_extension,
            config.bootstrap_file.as_str(),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lazily yields candidates in file-name order.
    ///
    /// The first item is an error if the directory cannot be read.
    pub fn iter(&self) -> impl Iterator<Item = Result<Candidate, HarnessError>> + '_ {
        WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(source) => {
                        return Some(Err(HarnessError::Discovery {
                            dir: self.dir.clone(),
                            source,
                        }))
                    }
                };
                if !entry.file_type().is_file() {
                    return None;
                }
                let Some(file_name) = entry.file_name().to_str() else {
                    debug!(path = %entry.path().display(), "skipping non UTF-8 file name");
                    return None;
                };
                let module = self.module_name(file_name)?;
                trace!(%module, "candidate");
                Some(Ok(Candidate {
                    module: module.to_string(),
                    file_name: file_name.to_string(),
                    path: entry.path().to_path_buf(),
                }))
            })
    }

    /// Collects every candidate, failing on an unreadable directory.
    pub fn candidates(&self) -> Result<Vec<Candidate>, HarnessError> {
        let candidates = self.iter().collect::<Result<Vec<_>, _>>()?;
        debug!(
            dir = %self.dir.display(),
            count = candidates.len(),
            "discovered suite modules"
        );
        Ok(candidates)
    }

    /// Module name for `file_name`, or `None` when the file is not a candidate.
    fn module_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        if file_name.starts_with(&self.bootstrap_file) {
            return None;
        }
        file_name
            .strip_suffix(&self.suffix)
            .filter(|stem| !stem.is_empty())
    }
}
