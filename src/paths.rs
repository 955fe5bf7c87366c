//! Project root discovery and directory roles.
//!
//! The project root is the nearest ancestor of the working directory that
//! contains `site.toml`. Every other directory the build touches is a fixed
//! subdirectory of that root, named by [`DirsConfig`](crate::config::DirsConfig):
//!
//! ```text
//! my-site/
//! ├── site.toml      # root marker + config
//! ├── source/        # content files, matched by {{NAME}} templates
//! ├── templs/        # template tree
//! ├── assets/        # static assets
//! └── public/        # rendered output (deleted by `clean`)
//! ```

use crate::config::{CONFIG_FILENAME, SiteConfig};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How many ancestors [`find_project_root`] inspects before giving up.
pub const MAX_SEARCH_DEPTH: usize = 100;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("IO error while looking for site.toml in {dir}: {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No site.toml found in {0} or any of its parent directories")]
    RootNotFound(PathBuf),
}

/// Search `start` and its ancestors for the project marker file.
///
/// Returns the first directory containing it. A metadata error other than
/// "not found" aborts the search rather than being skipped over.
pub fn find_project_root(start: &Path) -> Result<PathBuf, PathError> {
    let mut dir = Some(start);

    for _ in 0..MAX_SEARCH_DEPTH {
        let Some(current) = dir else { break };
        match current.join(CONFIG_FILENAME).try_exists() {
            Ok(true) => return Ok(current.to_path_buf()),
            Ok(false) => dir = current.parent(),
            Err(source) => {
                return Err(PathError::Io {
                    dir: current.to_path_buf(),
                    source,
                });
            }
        }
    }

    Err(PathError::RootNotFound(start.to_path_buf()))
}

/// Immutable directory layout and site domain for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
    pub root_dir: PathBuf,
    pub source_dir: PathBuf,
    pub template_dir: PathBuf,
    pub output_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub domain: String,
}

impl BuildEnvironment {
    /// Derive the directory roles from a project root.
    pub fn resolve(root: &Path, config: &SiteConfig, domain: impl Into<String>) -> Self {
        Self {
            root_dir: root.to_path_buf(),
            source_dir: root.join(&config.dirs.content),
            template_dir: root.join(&config.dirs.templates),
            output_dir: root.join(&config.dirs.output),
            assets_dir: root.join(&config.dirs.assets),
            domain: domain.into(),
        }
    }

    /// Same layout, with links rooted at the local project directory so the
    /// output can be opened straight from disk.
    pub fn local_preview(&self) -> Self {
        Self {
            domain: self.root_dir.to_string_lossy().to_string(),
            ..self.clone()
        }
    }
}

/// Join the components of a relative path with `/`, whatever the platform.
pub fn rel_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
