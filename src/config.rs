use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tokio::fs;

pub const DEV_SECRET_KEY: &str = "default-secret-key-for-dev";

/// Immutable process configuration, read once at startup and shared by `Arc`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// Where downloaded files land. Created at startup; downloads are served
    /// straight out of this directory and never indexed.
    pub download_directory: String,
    /// Optional upstream proxy, injected into every yt-dlp invocation.
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Session secret for cookie integrity. Only the development default is
    /// shipped; deployments override via SECRET_KEY.
    #[serde(default = "default_secret")]
    pub secret_key: String,
}

fn default_secret() -> String {
    DEV_SECRET_KEY.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            download_directory: "downloads".to_string(),
            proxy_url: None,
            secret_key: default_secret(),
        }
    }
}

impl Config {
    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(&self.download_directory)
    }
}

/// Cross-platform path of the configuration file, creating its directory.
async fn get_config_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("com", "TubeSpire", "TubeSpire")
        .ok_or_else(|| anyhow!("Could not find a valid home directory to store config"))?;
    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir).await?;
    Ok(config_dir.join("config.toml"))
}

/// Loads the configuration file, writing defaults on first run, then applies
/// environment overrides (PROXY_URL, SECRET_KEY).
pub async fn load_config() -> Result<Config> {
    let config_path = get_config_path().await?;

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).await?;
        toml::from_str(&content).map_err(|e| {
            anyhow!("Failed to parse config file at {}: {}", config_path.display(), e)
        })?
    } else {
        tracing::info!("No config file found. Creating a default one at: {}", config_path.display());
        let default_config = Config::default();
        save_config(&default_config).await?;
        default_config
    };

    if let Ok(proxy) = env::var("PROXY_URL") {
        if !proxy.is_empty() {
            config.proxy_url = Some(proxy);
        }
    }
    if let Ok(secret) = env::var("SECRET_KEY") {
        if !secret.is_empty() {
            config.secret_key = secret;
        }
    }

    Ok(config)
}

/// Saves the provided configuration object to the file.
pub async fn save_config(config: &Config) -> Result<()> {
    let config_path = get_config_path().await?;
    let toml_string = toml::to_string_pretty(config)?;
    fs::write(config_path, toml_string).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_contained() {
        let config = Config::default();
        assert_eq!(config.download_directory, "downloads");
        assert!(config.proxy_url.is_none());
        assert_eq!(config.secret_key, DEV_SECRET_KEY);
    }

    #[test]
    fn toml_round_trip_preserves_optional_proxy() {
        let config = Config {
            download_directory: "media".to_string(),
            proxy_url: Some("socks5://127.0.0.1:9050".to_string()),
            secret_key: "s3cret".to_string(),
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.download_directory, "media");
        assert_eq!(back.proxy_url.as_deref(), Some("socks5://127.0.0.1:9050"));
        assert_eq!(back.secret_key, "s3cret");
    }

    #[test]
    fn missing_optional_fields_fall_back() {
        let back: Config = toml::from_str(r#"download_directory = "dl""#).unwrap();
        assert_eq!(back.download_directory, "dl");
        assert!(back.proxy_url.is_none());
        assert_eq!(back.secret_key, DEV_SECRET_KEY);
    }
}
