//! Renderer dispatch.
//!
//! Every [`RenderJob`] is turned into an output file according to the
//! extension of its template:
//!
//! | Template | Output | Action |
//! |---|---|---|
//! | `.tmd` | `.html` | run the templater, write its stdout |
//! | `.scss` | `.css` | run the stylesheet compiler, which writes the file |
//! | `.html` | `.html` | copy the source byte for byte |
//! | `.sh` | none | skipped |
//!
//! Any other extension is rejected while planning (see [`crate::fanout`]), so
//! it never reaches a worker.
//!
//! The external programs sit behind the [`Renderer`] trait. The production
//! implementation is [`CommandRenderer`]; tests substitute a recording mock.

use crate::fanout::RenderJob;
use crate::paths::BuildEnvironment;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status} for {input}")]
    CommandFailed {
        program: String,
        input: PathBuf,
        status: ExitStatus,
    },
}

impl RenderError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// How a template is turned into output, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// `.tmd`, rendered by the templater.
    Templated,
    /// `.scss`, compiled by the stylesheet compiler.
    Stylesheet,
    /// `.html`, copied verbatim from its source.
    Passthrough,
    /// `.sh`, helper scripts living next to templates. Never rendered.
    Script,
}

impl TemplateKind {
    /// Classify an extension (without the dot). `None` means unsupported.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "tmd" => Some(Self::Templated),
            "scss" => Some(Self::Stylesheet),
            "html" => Some(Self::Passthrough),
            "sh" => Some(Self::Script),
            _ => None,
        }
    }

    /// Extension appended to a job's output stem, with the dot.
    pub fn output_extension(self) -> Option<&'static str> {
        match self {
            Self::Templated | Self::Passthrough => Some(".html"),
            Self::Stylesheet => Some(".css"),
            Self::Script => None,
        }
    }
}

/// Environment handed to the templater for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderVars {
    pub root_dir: PathBuf,
    pub source_path: PathBuf,
    pub domain: String,
    /// Output path relative to the output root, e.g. `blog/post1.html`.
    pub endpoint: String,
    /// Empty for templates without `{{LANG}}`.
    pub language: String,
}

impl RenderVars {
    pub fn to_env(&self) -> Vec<(&'static str, OsString)> {
        vec![
            ("SITE_ROOT", self.root_dir.clone().into_os_string()),
            ("SITE_SRC_PATH", self.source_path.clone().into_os_string()),
            ("SITE_DOMAIN", self.domain.clone().into()),
            ("SITE_ENDPOINT", self.endpoint.clone().into()),
            ("SITE_LANGUAGE", self.language.clone().into()),
        ]
    }
}

/// Capability interface for the external renderers.
///
/// Implementations are called concurrently from the worker pool.
pub trait Renderer: Sync {
    /// Render a template and return the produced bytes.
    fn render_template(&self, template: &Path, vars: &RenderVars) -> Result<Vec<u8>, RenderError>;

    /// Compile a stylesheet from `input`, writing the result to `output`.
    fn compile_stylesheet(&self, input: &Path, output: &Path) -> Result<(), RenderError>;
}

/// Runs the configured external commands.
///
/// Each command is an argv prefix; paths are appended as trailing arguments.
/// The child's stderr is inherited so renderer diagnostics reach the user.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    templater: Vec<String>,
    stylesheet: Vec<String>,
}

impl CommandRenderer {
    pub fn new(templater: Vec<String>, stylesheet: Vec<String>) -> Self {
        Self {
            templater,
            stylesheet,
        }
    }

    pub fn from_config(config: &crate::config::RenderersConfig) -> Self {
        Self::new(config.templater.clone(), config.stylesheet.clone())
    }

    fn command(argv: &[String]) -> (String, Command) {
        let program = argv.first().cloned().unwrap_or_default();
        let mut cmd = Command::new(&program);
        cmd.args(argv.iter().skip(1))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit());
        (program, cmd)
    }
}

impl Renderer for CommandRenderer {
    fn render_template(&self, template: &Path, vars: &RenderVars) -> Result<Vec<u8>, RenderError> {
        let (program, mut cmd) = Self::command(&self.templater);
        cmd.arg(template).envs(vars.to_env());
        let output = cmd.output().map_err(|source| RenderError::Spawn {
            program: program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(RenderError::CommandFailed {
                program,
                input: template.to_path_buf(),
                status: output.status,
            });
        }
        Ok(output.stdout)
    }

    fn compile_stylesheet(&self, input: &Path, output: &Path) -> Result<(), RenderError> {
        let (program, mut cmd) = Self::command(&self.stylesheet);
        cmd.arg(input).arg(output).stdout(Stdio::null());
        let status = cmd.status().map_err(|source| RenderError::Spawn {
            program: program.clone(),
            source,
        })?;
        if !status.success() {
            return Err(RenderError::CommandFailed {
                program,
                input: input.to_path_buf(),
                status,
            });
        }
        Ok(())
    }
}

/// Produce the output file for one job.
///
/// Returns the written path, or `None` for kinds that produce nothing.
pub fn dispatch(
    env: &BuildEnvironment,
    renderer: &impl Renderer,
    job: &RenderJob,
) -> Result<Option<PathBuf>, RenderError> {
    let Some(out_path) = job.output_path(env) else {
        trace!(template = %job.template, "skipping script template");
        return Ok(None);
    };
    let template_path = job.template_path(env);
    let source_path = job.source_path(env);

    if let Some(parent) = out_path.parent() {
        create_output_dir(parent)?;
    }

    match job.kind {
        TemplateKind::Templated => {
            let vars = RenderVars {
                root_dir: env.root_dir.clone(),
                source_path,
                domain: env.domain.clone(),
                endpoint: job.output_rel().unwrap_or_default(),
                language: job.language.clone(),
            };
            let bytes = renderer.render_template(&template_path, &vars)?;
            write_output(&out_path, &bytes)?;
        }
        TemplateKind::Stylesheet => renderer.compile_stylesheet(&template_path, &out_path)?,
        TemplateKind::Passthrough => copy_file(&source_path, &out_path)?,
        TemplateKind::Script => return Ok(None),
    }

    Ok(Some(out_path))
}

fn create_output_dir(dir: &Path) -> Result<(), RenderError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o770);
    }
    builder.create(dir).map_err(|e| RenderError::io(dir, e))
}

fn open_output(path: &Path) -> Result<File, RenderError> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o644);
    }
    opts.open(path).map_err(|e| RenderError::io(path, e))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    let mut file = open_output(path)?;
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .map_err(|e| RenderError::io(path, e))
}

/// Byte-for-byte copy. The destination is flushed and synced before either
/// handle is closed, then the source is closed before the destination.
fn copy_file(src_path: &Path, dst_path: &Path) -> Result<(), RenderError> {
    let mut src = File::open(src_path).map_err(|e| RenderError::io(src_path, e))?;
    let mut dst = open_output(dst_path)?;

    io::copy(&mut src, &mut dst).map_err(|e| RenderError::io(dst_path, e))?;
    dst.flush().map_err(|e| RenderError::io(dst_path, e))?;
    dst.sync_all().map_err(|e| RenderError::io(dst_path, e))?;

    drop(src);
    drop(dst);
    Ok(())
}
