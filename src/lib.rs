//! # site-make
//!
//! A build orchestrator for multilingual static sites. Content lives in
//! plain files, page layouts live in a template tree, and the *paths* of the
//! templates say what to generate:
//!
//! ```text
//! templs/
//! ├── index.{{LANG}}.tmd        → index.en.html, index.zh.html, index.jp.html
//! ├── blog/{{NAME}}.tmd         → one page per file in source/blog/
//! ├── css/site.scss             → css/site.css
//! ├── 404.html                  → copied as is
//! └── deploy.sh                 → ignored
//! ```
//!
//! Rendering itself is delegated to external programs: a templater that
//! prints a page to stdout and a stylesheet compiler. site-make decides
//! *what* to render, with which inputs, into which file, and runs the jobs
//! in parallel.
//!
//! # Pipeline
//!
//! ```text
//! 1. Resolve   cwd       →  project root (nearest site.toml) + BuildEnvironment
//! 2. Index     source/   →  ordered content list
//! 3. Fan out   templs/   →  RenderJob per (language × matching content file)
//! 4. Render    jobs      →  public/  (worker pool, best-effort stop on failure)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `site.toml` loading: stock defaults, sparse overrides, validation |
//! | [`paths`] | Project root discovery and the fixed directory layout |
//! | [`index`] | One-pass content indexing |
//! | [`pattern`] | Template paths as literal segments and typed placeholders |
//! | [`fanout`] | Template walk and expansion into render jobs |
//! | [`render`] | Extension-based dispatch and the [`render::Renderer`] trait |
//! | [`build`] | Build coordination: worker pool, error flag, output registry |
//! | [`output`] | CLI output formatting for plans and summaries |
//!
//! # Design Decisions
//!
//! ## Paths Are the Configuration
//!
//! There is no routing file. A template named `blog/{{NAME}}.{{LANG}}.tmd`
//! says everything: it applies to the content files in `blog/`, once per
//! language, and writes `blog/<stem>.<lang>.html`. Adding a page type means
//! adding a file.
//!
//! ## Full Rebuilds Only
//!
//! Every build regenerates every output. There is no cache and no dependency
//! graph, so a build's result depends only on the current inputs and two
//! builds of the same tree produce identical output.
//!
//! ## Fail Late, Stop Early
//!
//! A failing job does not cancel the others. Jobs already running finish
//! and write their output; the template walk stops launching new templates;
//! the build reports failure at the end. Diagnostics for every failed job are
//! logged with the template, source, and output involved.

pub mod build;
pub mod config;
pub mod fanout;
pub mod index;
pub mod output;
pub mod paths;
pub mod pattern;
pub mod render;

#[cfg(test)]
pub(crate) mod test_helpers;
