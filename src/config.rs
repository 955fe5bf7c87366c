//! Project configuration module.
//!
//! Handles loading, validating, and merging `site.toml`. The same file marks
//! the project root (see [`crate::paths`]), so every project has one, even if
//! it is empty. Stock defaults are the base layer and the user file is merged
//! on top of them.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! languages = ["en", "zh", "jp"]  # Expansion set for {{LANG}} templates
//! domain = ""                     # Site domain when SITE_DOMAIN is unset
//!
//! [dirs]
//! content = "source"              # Content files matched by {{NAME}}
//! templates = "templs"            # Template tree
//! output = "public"               # Rendered site
//! assets = "assets"               # Static assets served next to the site
//!
//! [renderers]
//! templater = ["tetra", "parse"]  # Template path is appended
//! stylesheet = ["sassc"]          # Input and output paths are appended
//!
//! [processing]
//! max_processes = 4               # Max parallel render workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! languages = ["en", "fr"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::pattern::{LANG_TOKEN, NAME_TOKEN};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of the project config. Its presence marks the project root.
pub const CONFIG_FILENAME: &str = "site.toml";

/// Environment variable overriding [`SiteConfig::domain`].
pub const DOMAIN_ENV_VAR: &str = "SITE_DOMAIN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `site.toml`.
///
/// All fields have defaults matching the conventional project layout. Unknown
/// keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Ordered language codes substituted for `{{LANG}}`.
    pub languages: Vec<String>,
    /// Domain used to build absolute links, unless `SITE_DOMAIN` is set.
    pub domain: String,
    /// Names of the conventional subdirectories of the project root.
    pub dirs: DirsConfig,
    /// External renderer commands.
    pub renderers: RenderersConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string(), "zh".to_string(), "jp".to_string()],
            domain: String::new(),
            dirs: DirsConfig::default(),
            renderers: RenderersConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are usable for a build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.is_empty() {
            return Err(ConfigError::Validation(
                "languages must not be empty".into(),
            ));
        }
        for (i, lang) in self.languages.iter().enumerate() {
            if lang.is_empty() {
                return Err(ConfigError::Validation(
                    "languages must not contain an empty code".into(),
                ));
            }
            if lang.contains(['/', '\\']) || lang.contains(LANG_TOKEN) || lang.contains(NAME_TOKEN)
            {
                return Err(ConfigError::Validation(format!(
                    "language {lang:?} must not contain path separators or placeholder tokens"
                )));
            }
            if self.languages[..i].contains(lang) {
                return Err(ConfigError::Validation(format!(
                    "language {lang:?} is listed twice"
                )));
            }
        }
        for (key, name) in [
            ("dirs.content", &self.dirs.content),
            ("dirs.templates", &self.dirs.templates),
            ("dirs.output", &self.dirs.output),
            ("dirs.assets", &self.dirs.assets),
        ] {
            if name.is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.renderers.templater.is_empty() {
            return Err(ConfigError::Validation(
                "renderers.templater must name a command".into(),
            ));
        }
        if self.renderers.stylesheet.is_empty() {
            return Err(ConfigError::Validation(
                "renderers.stylesheet must name a command".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The domain to build with: `SITE_DOMAIN` when set, the config value otherwise.
    pub fn effective_domain(&self, env_value: Option<String>) -> String {
        env_value.unwrap_or_else(|| self.domain.clone())
    }
}

/// Conventional subdirectory names, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirsConfig {
    pub content: String,
    pub templates: String,
    pub output: String,
    pub assets: String,
}

impl Default for DirsConfig {
    fn default() -> Self {
        Self {
            content: "source".to_string(),
            templates: "templs".to_string(),
            output: "public".to_string(),
            assets: "assets".to_string(),
        }
    }
}

/// External renderer commands as argv prefixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderersConfig {
    /// Templating processor. Receives the template path as its last argument
    /// and writes the rendered page to stdout.
    pub templater: Vec<String>,
    /// Stylesheet compiler. Receives the input and output paths as its last
    /// two arguments and writes the output itself.
    pub stylesheet: Vec<String>,
}

impl Default for RenderersConfig {
    fn default() -> Self {
        Self {
            templater: vec!["tetra".to_string(), "parse".to_string()],
            stylesheet: vec!["sassc".to_string()],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a
///   `languages` list in the user file replaces the stock list.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `site.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `site.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `site.toml` in the project root.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(load_raw_config(root)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_three_languages() {
        let config = SiteConfig::default();
        assert_eq!(config.languages, vec!["en", "zh", "jp"]);
        assert_eq!(config.domain, "");
    }

    #[test]
    fn default_config_has_conventional_dirs() {
        let config = SiteConfig::default();
        assert_eq!(config.dirs.content, "source");
        assert_eq!(config.dirs.templates, "templs");
        assert_eq!(config.dirs.output, "public");
        assert_eq!(config.dirs.assets, "assets");
    }

    #[test]
    fn default_config_has_renderer_commands() {
        let config = SiteConfig::default();
        assert_eq!(config.renderers.templater, vec!["tetra", "parse"]);
        assert_eq!(config.renderers.stylesheet, vec!["sassc"]);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[dirs]
output = "dist"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.dirs.output, "dist");
        assert_eq!(config.dirs.content, "source");
        assert_eq!(config.languages.len(), 3);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.languages, vec!["en", "zh", "jp"]);
    }

    #[test]
    fn load_config_empty_file_is_default() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "").unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.dirs.templates, "templs");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
languages = ["en", "fr"]
domain = "https://example.org"

[renderers]
stylesheet = ["sass", "--no-source-map"]
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.languages, vec!["en", "fr"]);
        assert_eq!(config.domain, "https://example.org");
        assert_eq!(config.renderers.stylesheet, vec!["sass", "--no-source-map"]);
        // Unspecified values should be defaults
        assert_eq!(config.renderers.templater, vec!["tetra", "parse"]);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[dirs]
contnet = "posts"
"#,
        )
        .unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[server]\nport = 8080\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_empty_languages() {
        let config = SiteConfig {
            languages: vec![],
            ..SiteConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_duplicate_language() {
        let config = SiteConfig {
            languages: vec!["en".into(), "zh".into(), "en".into()],
            ..SiteConfig::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("listed twice"));
    }

    #[test]
    fn validate_language_with_separator() {
        let config = SiteConfig {
            languages: vec!["en/us".into()],
            ..SiteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_empty_renderer_command() {
        let mut config = SiteConfig::default();
        config.renderers.templater.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_processes() {
        let mut config = SiteConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "languages = []\n").unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Domain and processing tests
    // =========================================================================

    #[test]
    fn env_domain_overrides_config() {
        let config = SiteConfig {
            domain: "https://example.org".into(),
            ..SiteConfig::default()
        };
        assert_eq!(
            config.effective_domain(Some("https://preview.example.org".into())),
            "https://preview.example.org"
        );
        assert_eq!(config.effective_domain(Some(String::new())), "");
        assert_eq!(config.effective_domain(None), "https://example.org");
    }

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[dirs]
content = "source"
output = "public"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str("[dirs]\noutput = \"dist\"\n").unwrap();
        let merged = merge_toml(base, overlay);
        let dirs = merged.get("dirs").unwrap();
        assert_eq!(dirs.get("output").unwrap().as_str(), Some("dist"));
        assert_eq!(dirs.get("content").unwrap().as_str(), Some("source"));
    }

    #[test]
    fn merge_toml_array_replaces() {
        let base: toml::Value = toml::from_str(r#"languages = ["en", "zh", "jp"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"languages = ["de"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        let langs = merged.get("languages").unwrap().as_array().unwrap();
        assert_eq!(langs.len(), 1);
        assert_eq!(langs[0].as_str(), Some("de"));
    }

    #[test]
    fn stock_defaults_value_is_table() {
        let value = stock_defaults_value().unwrap();
        assert!(value.is_table());
        assert!(value.get("dirs").is_some());
        assert!(value.get("renderers").is_some());
    }
}
