//! Configuration loading.
//!
//! Read from `$XDG_CONFIG_HOME/buildagent/config.toml` (falling back to
//! `~/.config/buildagent/config.toml`). Every field has a default, so a
//! missing file yields a working config.

use std::io;
use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: BackendConfig,
    pub project: ProjectConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub gemini: GeminiConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiConfig {
    /// Shell command that prints the API key, e.g. `pass show gemini`.
    pub api_key_cmd: Option<String>,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_cmd: None,
            model: ba_backend::DEFAULT_MODEL.to_string(),
        }
    }
}

impl GeminiConfig {
    /// Resolve the API key: `api_key_cmd` first, then `GEMINI_API_KEY`.
    pub fn resolve_api_key(&self) -> io::Result<String> {
        if let Some(cmd) = &self.api_key_cmd {
            let output = Command::new("sh").arg("-c").arg(cmd).output()?;
            if !output.status.success() {
                return Err(io::Error::other(format!(
                    "api_key_cmd exited with {}",
                    output.status
                )));
            }
            let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if key.is_empty() {
                return Err(io::Error::other("api_key_cmd printed nothing"));
            }
            return Ok(key);
        }
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(io::Error::other(
                "no API key: set GEMINI_API_KEY or api_key_cmd in config.toml",
            )),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Where `export` writes the generated files. Defaults to ./tiny-linux.
    pub export_dir: Option<PathBuf>,
}

impl ProjectConfig {
    pub fn resolve_export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("./tiny-linux"))
    }
}

fn config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join("buildagent").join("config.toml"))
}

impl Config {
    /// Load the config file if present; defaults otherwise. A file that
    /// exists but fails to parse is an error, not a silent default.
    pub fn load_or_default() -> io::Result<Self> {
        let Some(path) = config_path() else {
            return Ok(Self::default());
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e),
        };
        toml::from_str(&text)
            .map_err(|e| io::Error::other(format!("{}: {e}", path.display())))
    }
}
