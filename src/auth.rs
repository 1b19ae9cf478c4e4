use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::BitbucketConfig;
use crate::prompt::{PromptError, Prompter};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No authentication method selected: {0}")]
    NoMethod(#[source] PromptError),

    #[error("Failed to read credentials: {0}")]
    Prompt(#[from] PromptError),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Credentials for the Bitbucket API, resolved once per run.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthCredential {
    Bearer(String),
    Basic { username: String, password: String },
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthCredential::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            AuthCredential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Token,
    AppPassword,
}

impl AuthMethod {
    pub const ALL: [AuthMethod; 2] = [AuthMethod::Token, AuthMethod::AppPassword];
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Token => write!(f, "Token"),
            AuthMethod::AppPassword => write!(f, "App password"),
        }
    }
}

/// Ask the operator for an auth method, then resolve credentials for it.
/// Configured values are used as-is; missing ones are prompted for.
pub fn resolve(config: &BitbucketConfig, prompter: &impl Prompter) -> Result<AuthCredential, AuthError> {
    let labels: Vec<String> = AuthMethod::ALL.iter().map(ToString::to_string).collect();
    let index = prompter
        .select_one("Choose auth method", &labels)
        .map_err(AuthError::NoMethod)?;
    let method = AuthMethod::ALL[index];
    debug!(%method, "auth method selected");

    match method {
        AuthMethod::Token => token_auth(config, prompter),
        AuthMethod::AppPassword => app_password_auth(config, prompter),
    }
}

fn token_auth(config: &BitbucketConfig, prompter: &impl Prompter) -> Result<AuthCredential, AuthError> {
    if let Some(token) = &config.access_token {
        info!("using configured access token");
        return Ok(AuthCredential::Bearer(token.clone()));
    }

    let token = prompter.input_secret("Enter access token")?;
    if token.is_empty() {
        return Err(AuthError::Empty("Access token"));
    }
    Ok(AuthCredential::Bearer(token))
}

fn app_password_auth(
    config: &BitbucketConfig,
    prompter: &impl Prompter,
) -> Result<AuthCredential, AuthError> {
    if let (Some(username), Some(password)) = (&config.username, &config.app_password) {
        info!(%username, "using configured app password");
        return Ok(AuthCredential::Basic {
            username: username.clone(),
            password: password.clone(),
        });
    }

    let username = prompter.input_text("Username", config.username.as_deref())?;
    if username.is_empty() {
        return Err(AuthError::Empty("Username"));
    }
    let password = prompter.input_secret("Password")?;
    if password.is_empty() {
        return Err(AuthError::Empty("Password"));
    }
    Ok(AuthCredential::Basic { username, password })
}
