//! Shared test utilities for the site-make test suite.
//!
//! Provides a scratch project tree and helpers for inspecting the output
//! directory after a build.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = TestSite::new();
//! site.content("blog/post1.md", "# Hello");
//! site.template("blog/{{NAME}}.tmd", "");
//!
//! // ... build ...
//!
//! assert_eq!(output_files(&site), vec!["blog/post1.html"]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::config::{CONFIG_FILENAME, SiteConfig};
use crate::paths::{BuildEnvironment, rel_string};

// =========================================================================
// Fixture setup
// =========================================================================

/// A project root in a temp directory, with `site.toml` and empty content
/// and template directories.
pub struct TestSite {
    tmp: TempDir,
    pub config: SiteConfig,
}

impl TestSite {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let config = SiteConfig::default();
        fs::write(tmp.path().join(CONFIG_FILENAME), "").unwrap();
        fs::create_dir_all(tmp.path().join(&config.dirs.content)).unwrap();
        fs::create_dir_all(tmp.path().join(&config.dirs.templates)).unwrap();
        Self { tmp, config }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn env(&self) -> BuildEnvironment {
        BuildEnvironment::resolve(self.root(), &self.config, "https://example.org")
    }

    /// Write a content file, creating parent directories.
    pub fn content(&self, rel: &str, body: &str) {
        write_file(&self.env().source_dir.join(rel), body);
    }

    /// Write a template file, creating parent directories.
    pub fn template(&self, rel: &str, body: &str) {
        write_file(&self.env().template_dir.join(rel), body);
    }

    /// Read an output file as a string. Panics if missing.
    pub fn read_output(&self, rel: &str) -> String {
        let path = self.env().output_dir.join(rel);
        fs::read_to_string(&path).unwrap_or_else(|e| {
            panic!(
                "output '{rel}' not readable: {e}. Have: {:?}",
                output_files(self)
            )
        })
    }
}

fn write_file(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

// =========================================================================
// Output inspection
// =========================================================================

/// All files under the output directory, relative and sorted.
pub fn output_files(site: &TestSite) -> Vec<String> {
    output_snapshot(site).into_iter().map(|(rel, _)| rel).collect()
}

/// All files under the output directory with their contents, sorted by path.
pub fn output_snapshot(site: &TestSite) -> Vec<(String, Vec<u8>)> {
    let out = site.env().output_dir;
    if !out.exists() {
        return Vec::new();
    }
    WalkDir::new(&out)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = rel_string(e.path().strip_prefix(&out).unwrap());
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}
