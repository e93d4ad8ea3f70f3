//! Configuration for the mirror.
//!
//! Layered the usual way:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCMIRROR_` and use double underscores
//! to separate nested levels:
//! - `DOCMIRROR_REBUILD__PROGRAM=asciidoctor-pdf` sets `rebuild.program`
//! - `DOCMIRROR_REBUILD__DEBOUNCE_MS=250` sets `rebuild.debounce_ms`
//! - `DOCMIRROR_LOGGING__DEFAULT=debug` sets `logging.default`
//!
//! `DOCMIRROR_CONFIG` points at an explicit settings file and is not a setting itself.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the settings file searched for in the current directory and its ancestors.
pub const CONFIG_FILE_NAME: &str = ".docmirror.toml";

/// Environment variable holding an explicit settings file path.
pub const CONFIG_PATH_ENV: &str = "DOCMIRROR_CONFIG";

const ENV_PREFIX: &str = "DOCMIRROR_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Extensions of documents that are compiled instead of copied, in entry-file
    /// priority order.
    #[serde(default = "default_tracked_extensions")]
    pub tracked_extensions: Vec<String>,

    /// File stem of the build entry point (`index` -> `index.adoc`).
    #[serde(default = "default_entry_stem")]
    pub entry_stem: String,

    /// External compiler settings
    #[serde(default)]
    pub rebuild: RebuildConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RebuildConfig {
    /// Compiler executable, resolved through `PATH`.
    #[serde(default = "default_program")]
    pub program: String,

    /// Extra arguments placed before the entry file.
    #[serde(default)]
    pub args: Vec<String>,

    /// Quiet period before a requested rebuild runs. 0 rebuilds once per event.
    #[serde(default)]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for every target.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `docmirror::rebuild = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_tracked_extensions() -> Vec<String> {
    vec![
        ".asciidoc".to_string(),
        ".adoc".to_string(),
        ".asc".to_string(),
    ]
}
fn default_entry_stem() -> String {
    "index".to_string()
}
fn default_program() -> String {
    "asciidoctor".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tracked_extensions: default_tracked_extensions(),
            entry_stem: default_entry_stem(),
            rebuild: RebuildConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            debounce_ms: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// A missing settings file is not an error; defaults and environment still apply.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(Self::find_config_file);

        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Self::env_provider())
            .extract()
            .map_err(Box::new)
    }

    /// Load configuration from a specific file, still honouring the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env_provider())
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Search the current directory and its ancestors for a settings file.
    fn find_config_file() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    fn env_provider() -> Env {
        // Double underscore becomes a dot; single underscores stay inside field names
        Env::prefixed(ENV_PREFIX)
            .ignore(&["CONFIG"])
            .map(|key| key.as_str().to_lowercase().replace("__", ".").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(
            settings.tracked_extensions,
            vec![".asciidoc", ".adoc", ".asc"]
        );
        assert_eq!(settings.entry_stem, "index");
        assert_eq!(settings.rebuild.program, "asciidoctor");
        assert_eq!(settings.rebuild.debounce_ms, 0);
        assert_eq!(settings.logging.default, "info");
    }

    #[test]
    fn test_load_from_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
tracked_extensions = ["MD", ".markdown"]
entry_stem = "README"

[rebuild]
program = "mdbook"
args = ["build"]
debounce_ms = 300
"#,
            )?;

            let settings = Settings::load_from("custom.toml").map_err(|e| *e)?;
            assert_eq!(settings.tracked_extensions, vec!["MD", ".markdown"]);
            assert_eq!(settings.entry_stem, "README");
            assert_eq!(settings.rebuild.program, "mdbook");
            assert_eq!(settings.rebuild.args, vec!["build"]);
            assert_eq!(settings.rebuild.debounce_ms, 300);
            // Untouched sections keep their defaults
            assert_eq!(settings.logging.default, "info");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE_NAME,
                r#"
[rebuild]
program = "asciidoctor"
debounce_ms = 100
"#,
            )?;
            jail.set_env("DOCMIRROR_REBUILD__DEBOUNCE_MS", "750");
            jail.set_env("DOCMIRROR_LOGGING__DEFAULT", "debug");

            let settings = Settings::load().map_err(|e| *e)?;
            assert_eq!(settings.rebuild.debounce_ms, 750);
            assert_eq!(settings.rebuild.program, "asciidoctor");
            assert_eq!(settings.logging.default, "debug");
            Ok(())
        });
    }

    #[test]
    fn test_explicit_config_path() {
        Jail::expect_with(|jail| {
            jail.create_dir("conf")?;
            jail.create_file("conf/mirror.toml", "entry_stem = \"main\"\n")?;
            jail.set_env(CONFIG_PATH_ENV, "conf/mirror.toml");

            let settings = Settings::load().map_err(|e| *e)?;
            assert_eq!(settings.entry_stem, "main");
            Ok(())
        });
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let settings = Settings::load().map_err(|e| *e)?;
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.rebuild.program = "asciidoctor-pdf".to_string();
        settings.rebuild.debounce_ms = 42;

        settings.save(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[rebuild]"));

        let loaded: Settings = toml::from_str(&content).unwrap();
        assert_eq!(loaded.rebuild.program, "asciidoctor-pdf");
        assert_eq!(loaded.rebuild.debounce_ms, 42);
    }
}
