use clap::{Parser, ValueEnum};
use site_make::build::{self, Builder};
use site_make::config::{self, DOMAIN_ENV_VAR};
use site_make::output;
use site_make::paths::{self, BuildEnvironment};
use site_make::render::CommandRenderer;
use tracing::info;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once, at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "site-make")]
#[command(about = "Build a multilingual static site from a template tree")]
#[command(long_about = "\
Build a multilingual static site from a template tree

Run anywhere inside a project; the project root is the nearest directory
containing site.toml.

Project structure:

  my-site/
  ├── site.toml                    # Marker + config (may be empty)
  ├── source/                      # Content files
  │   └── blog/
  │       ├── post1.md
  │       └── post2.md
  ├── templs/                      # Template tree
  │   ├── index.{{LANG}}.tmd       # → index.en.html, index.zh.html, ...
  │   ├── blog/{{NAME}}.tmd        # → blog/post1.html, blog/post2.html
  │   ├── css/site.scss            # → css/site.css
  │   └── 404.html                 # → copied as is
  └── public/                      # Output

Tasks run in the order given. Without tasks, `host` runs.

SITE_DOMAIN overrides the domain from site.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Tasks to run, in order
    #[arg(value_enum)]
    tasks: Vec<Task>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Task {
    /// Delete the output directory
    Clean,
    /// Build with the configured site domain
    Host,
    /// Build with links rooted at the project directory, for local preview
    Local,
    /// Print the render plan without building
    Check,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()?;
    let root = paths::find_project_root(&cwd)?;
    let site_config = config::load_config(&root)?;
    let domain = site_config.effective_domain(std::env::var(DOMAIN_ENV_VAR).ok());
    let env = BuildEnvironment::resolve(&root, &site_config, domain);
    let renderer = CommandRenderer::from_config(&site_config.renderers);

    let tasks = if cli.tasks.is_empty() {
        vec![Task::Host]
    } else {
        cli.tasks
    };

    for task in tasks {
        info!("== site-make {task:?} ==");
        match task {
            Task::Clean => build::clean_output(&env)?,
            Task::Host => {
                let stats =
                    Builder::from_config(env.clone(), &site_config, renderer.clone()).build()?;
                output::print_summary(&stats);
            }
            Task::Local => {
                let local = env.local_preview();
                let stats = Builder::from_config(local, &site_config, renderer.clone()).build()?;
                output::print_summary(&stats);
            }
            Task::Check => {
                let plan =
                    Builder::from_config(env.clone(), &site_config, renderer.clone()).plan()?;
                output::print_plan(&plan);
                if !plan.collisions.is_empty() {
                    return Err(build::BuildError::JobsFailed {
                        failed: plan.collisions.len(),
                    }
                    .into());
                }
            }
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_tasks_parses_empty() {
        let cli = Cli::parse_from(["site-make"]);
        assert!(cli.tasks.is_empty());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn tasks_keep_order() {
        let cli = Cli::parse_from(["site-make", "clean", "local", "-v"]);
        assert_eq!(cli.tasks, vec![Task::Clean, Task::Local]);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn unknown_task_rejected() {
        assert!(Cli::try_parse_from(["site-make", "server"]).is_err());
    }
}
