pub mod model;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub use model::{AppConfig, CtcpConfig, LoggingConfig, ServerConfig};

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crabbot")
        .join("config.toml")
}

/// Load the config from `path`, or from the per-user default location.
///
/// A missing default file is not an error; an explicitly named one is.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = config_path();
            if !p.exists() {
                return Ok(AppConfig::default());
            }
            p
        }
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("crabbot-no-such-config.toml");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn explicit_file_is_parsed() {
        let path = std::env::temp_dir().join(format!("crabbot-{}.toml", std::process::id()));
        std::fs::write(&path, "[sed]\nmax_length = 80\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.sed.max_length, 80);
        assert_eq!(cfg.server.port, 6667);
    }
}
