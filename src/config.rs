use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = ".bump-deps.toml";

pub const ENV_ACCESS_TOKEN: &str = "BITBUCKET_ACCESS_TOKEN";
pub const ENV_USERNAME: &str = "BITBUCKET_USERNAME";
pub const ENV_APP_PASSWORD: &str = "BITBUCKET_APP_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

/// Top-level configuration loaded from .bump-deps.toml.
///
/// All fields are optional, the tool works with zero config and
/// credentials coming from the environment or interactive prompts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bitbucket: BitbucketConfig,

    #[serde(default)]
    pub update: UpdateConfig,
}

#[derive(Clone, Deserialize)]
pub struct BitbucketConfig {
    /// Base URL of the Bitbucket Cloud REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Access token for bearer auth. Overridden by BITBUCKET_ACCESS_TOKEN.
    pub access_token: Option<String>,
    /// Username for app password auth. Overridden by BITBUCKET_USERNAME.
    pub username: Option<String>,
    /// App password. Overridden by BITBUCKET_APP_PASSWORD.
    pub app_password: Option<String>,
}

impl Default for BitbucketConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            access_token: None,
            username: None,
            app_password: None,
        }
    }
}

impl std::fmt::Debug for BitbucketConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbucketConfig")
            .field("api_url", &self.api_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("app_password", &self.app_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Settings for the branch, commit and pull request created by a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Path of the manifest inside the repository
    pub file: String,
    /// Branch offered as the default base in the prompt
    pub base_branch: String,
    /// Prefix of the generated working branch name
    pub branch_prefix: String,
    pub author: String,
    pub commit_message: String,
    pub pr_title: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            file: "package.json".to_string(),
            base_branch: "master".to_string(),
            branch_prefix: "update-deps-".to_string(),
            author: "Redocly <info@redocly.com>".to_string(),
            commit_message: "Update dependencies".to_string(),
            pr_title: "Updated Dependencies".to_string(),
        }
    }
}

/// A missing `.env` is fine; one that exists but cannot be read or parsed is not.
fn allow_missing_dotenv<T>(result: Result<T, dotenvy::Error>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => {
            debug!("no .env file found");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn default_api_url() -> String {
    "https://api.bitbucket.org/2.0".to_string()
}

impl Config {
    /// Load configuration from `path`, or from .bump-deps.toml in the current
    /// directory when no path is given. A missing default file yields the
    /// default config; a missing explicit file is an error.
    ///
    /// A `.env` file in the current directory is loaded into the process
    /// environment first, then the BITBUCKET_* variables override the file.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        allow_missing_dotenv(dotenvy::dotenv())?;

        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Override credentials with non-empty environment values.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            self.bitbucket.access_token = Some(token);
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.bitbucket.username = Some(username);
        }
        if let Some(password) = lookup(ENV_APP_PASSWORD) {
            self.bitbucket.app_password = Some(password);
        }
    }
}
