//! Template fan-out.
//!
//! Each file under the template root is a [`TemplateTask`]. A task expands
//! into one [`RenderJob`] per (language, content item) pair:
//!
//! ```text
//! templs/index.{{LANG}}.tmd        → index.en  index.zh  index.jp
//! templs/blog/{{NAME}}.tmd         → blog/post1  blog/post2      (one per source/blog/*)
//! templs/blog/{{NAME}}.{{LANG}}.tmd → blog/post1.en … blog/post2.jp
//! templs/about.tmd                 → about
//! ```
//!
//! A `{{NAME}}` template matches content files whose directory is *exactly*
//! the template's directory; nested directories are not included. When no
//! content file matches, the template produces no jobs.
//!
//! The final output extension is not part of the output stem: it comes from
//! the template's [`TemplateKind`] at dispatch time.

use crate::index::ContentItem;
use crate::paths::{BuildEnvironment, rel_string};
use crate::pattern::{Bindings, TemplatePattern};
use crate::render::TemplateKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum FanoutError {
    #[error("Could not walk template directory {dir}: {source}")]
    Walk {
        dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("Unsupported template extension {ext:?}: {template}")]
    UnsupportedExtension { ext: String, template: String },
}

/// Where a job reads its source from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    /// A content file, relative to the content root.
    Content(String),
    /// The template file itself.
    Template,
}

/// One template file found while walking the template root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTask {
    /// `/`-separated path relative to the template root.
    pub rel_path: String,
    pub pattern: TemplatePattern,
    pub kind: TemplateKind,
}

impl TemplateTask {
    /// Parse and classify a relative template path.
    pub fn new(rel_path: impl Into<String>) -> Result<Self, FanoutError> {
        let rel_path = rel_path.into();
        let ext = Path::new(&rel_path)
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let kind =
            TemplateKind::from_extension(&ext).ok_or_else(|| FanoutError::UnsupportedExtension {
                ext: format!(".{ext}"),
                template: rel_path.clone(),
            })?;
        Ok(Self {
            pattern: TemplatePattern::parse(&rel_path),
            rel_path,
            kind,
        })
    }
}

/// A fully resolved unit of work, consumed once by [`crate::render::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    /// Language code, empty for templates without `{{LANG}}`.
    pub language: String,
    /// Template path relative to the template root.
    pub template: String,
    pub source: JobSource,
    /// Output path relative to the output root, without extension.
    pub output_stem: String,
    pub kind: TemplateKind,
}

impl RenderJob {
    /// Source path relative to its own root (content or template).
    pub fn source_rel(&self) -> &str {
        match &self.source {
            JobSource::Content(rel) => rel,
            JobSource::Template => &self.template,
        }
    }

    pub fn source_path(&self, env: &BuildEnvironment) -> PathBuf {
        match &self.source {
            JobSource::Content(rel) => env.source_dir.join(rel),
            JobSource::Template => self.template_path(env),
        }
    }

    pub fn template_path(&self, env: &BuildEnvironment) -> PathBuf {
        env.template_dir.join(&self.template)
    }

    /// Output path relative to the output root, with the rendered extension.
    pub fn output_rel(&self) -> Option<String> {
        self.kind
            .output_extension()
            .map(|ext| format!("{}{}", self.output_stem, ext))
    }

    pub fn output_path(&self, env: &BuildEnvironment) -> Option<PathBuf> {
        self.output_rel().map(|rel| env.output_dir.join(rel))
    }
}

/// Remove the final extension of the last path component, if any.
fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |pos| pos + 1);
    match Path::new(&path[name_start..]).extension() {
        Some(ext) => &path[..path.len() - ext.len() - 1],
        None => path,
    }
}

/// Expand a template into its render jobs.
///
/// Jobs are ordered language-major, then by content index order. Script
/// templates produce none.
pub fn expand(task: &TemplateTask, index: &[ContentItem], languages: &[String]) -> Vec<RenderJob> {
    if task.kind == TemplateKind::Script {
        return Vec::new();
    }

    let has_lang = task.pattern.is_language_parameterized();
    let has_name = task.pattern.is_name_parameterized();

    let langs: Vec<&str> = if has_lang {
        languages.iter().map(String::as_str).collect()
    } else {
        vec![""]
    };

    let items: Vec<Option<&ContentItem>> = if has_name {
        let dir = task.pattern.directory();
        index
            .iter()
            .filter(|item| item.directory() == dir)
            .map(Some)
            .collect()
    } else {
        vec![None]
    };
    debug_assert!(!has_name || items.len() <= index.len());

    let mut jobs = Vec::with_capacity(langs.len() * items.len());
    for lang in &langs {
        for item in &items {
            let output = task.pattern.expand(Bindings {
                lang: has_lang.then_some(*lang),
                name: item.map(ContentItem::stem),
            });
            jobs.push(RenderJob {
                language: (*lang).to_string(),
                template: task.rel_path.clone(),
                source: match item {
                    Some(item) => JobSource::Content(item.rel_path.clone()),
                    None => JobSource::Template,
                },
                output_stem: strip_extension(&output).to_string(),
                kind: task.kind,
            });
        }
    }
    jobs
}

/// Walk the template root in file-name order, yielding one task per file.
///
/// Directories are traversed but not yielded. The first walk error or
/// unsupported extension is yielded as an error.
pub fn walk_templates(
    template_root: &Path,
) -> impl Iterator<Item = Result<TemplateTask, FanoutError>> + '_ {
    WalkDir::new(template_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    return Some(Err(FanoutError::Walk {
                        dir: template_root.to_path_buf(),
                        source,
                    }));
                }
            };
            if entry.file_type().is_dir() {
                return None;
            }
            let rel = entry
                .path()
                .strip_prefix(template_root)
                .unwrap_or(entry.path());
            Some(TemplateTask::new(rel_string(rel)))
        })
}
