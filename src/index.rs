//! Content indexing.
//!
//! Walks the content root once and records every regular file as a
//! [`ContentItem`]. The index is read-only for the rest of the build;
//! `{{NAME}}` templates select from it by directory.

use crate::paths::rel_string;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Could not walk content directory {dir}: {source}")]
    Walk {
        dir: String,
        #[source]
        source: walkdir::Error,
    },
}

/// One content file, addressed relative to the content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// `/`-separated path relative to the content root, e.g. `blog/post1.md`.
    pub rel_path: String,
}

impl ContentItem {
    pub fn new(rel_path: impl Into<String>) -> Self {
        Self {
            rel_path: rel_path.into(),
        }
    }

    /// Final path component, e.g. `post1.md`.
    pub fn base_name(&self) -> &str {
        match self.rel_path.rfind('/') {
            Some(pos) => &self.rel_path[pos + 1..],
            None => &self.rel_path,
        }
    }

    /// Base name without its final extension, e.g. `post1`.
    pub fn stem(&self) -> &str {
        Path::new(self.base_name())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_else(|| self.base_name())
    }

    /// Directory part, empty for files at the top of the content root.
    pub fn directory(&self) -> &str {
        match self.rel_path.rfind('/') {
            Some(pos) => &self.rel_path[..pos],
            None => "",
        }
    }
}

/// Index every regular file under `content_root`, in file-name order.
///
/// Any traversal error is fatal, including a missing or unreadable root.
/// Symlinks are not followed and, like other special files, not indexed.
pub fn index_content(content_root: &Path) -> Result<Vec<ContentItem>, IndexError> {
    let mut items = Vec::new();
    for entry in WalkDir::new(content_root).sort_by_file_name() {
        let entry = entry.map_err(|source| IndexError::Walk {
            dir: content_root.display().to_string(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(content_root)
            .unwrap_or(entry.path());
        items.push(ContentItem::new(rel_string(rel)));
    }

    debug!(count = items.len(), "indexed content");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn item_derived_fields() {
        let item = ContentItem::new("blog/2024/post1.md");
        assert_eq!(item.base_name(), "post1.md");
        assert_eq!(item.stem(), "post1");
        assert_eq!(item.directory(), "blog/2024");
    }

    #[test]
    fn item_at_top_level() {
        let item = ContentItem::new("about.md");
        assert_eq!(item.directory(), "");
        assert_eq!(item.stem(), "about");
    }

    #[test]
    fn stem_strips_only_final_extension() {
        assert_eq!(ContentItem::new("notes/archive.tar.gz").stem(), "archive.tar");
        assert_eq!(ContentItem::new("README").stem(), "README");
    }

    #[test]
    fn index_lists_files_not_dirs() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("blog/empty")).unwrap();
        fs::write(tmp.path().join("blog/post2.md"), "b").unwrap();
        fs::write(tmp.path().join("blog/post1.md"), "a").unwrap();
        fs::write(tmp.path().join("about.md"), "c").unwrap();

        let items = index_content(tmp.path()).unwrap();
        let paths: Vec<&str> = items.iter().map(|i| i.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["about.md", "blog/post1.md", "blog/post2.md"]);
    }

    #[test]
    fn index_paths_are_relative() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("a/b/c.md"), "").unwrap();

        let items = index_content(tmp.path()).unwrap();
        assert_eq!(items, vec![ContentItem::new("a/b/c.md")]);
        assert!(!items[0].rel_path.starts_with('/'));
    }

    #[test]
    fn missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = index_content(&tmp.path().join("source"));
        assert!(matches!(result, Err(IndexError::Walk { .. })));
    }

    #[test]
    fn empty_root_is_empty_index() {
        let tmp = TempDir::new().unwrap();
        assert!(index_content(tmp.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_indexed() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("post.md"), "").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("post.md"), tmp.path().join("alias.md"))
            .unwrap();

        let items = index_content(tmp.path()).unwrap();
        assert_eq!(items, vec![ContentItem::new("post.md")]);
    }
}
