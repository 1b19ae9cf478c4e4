#[cfg(test)]
pub mod fake;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Password, Select};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt \"{0}\" was dismissed")]
    Dismissed(String),

    #[error("Prompt \"{0}\" has no choices")]
    NoChoices(String),

    #[error("Terminal prompt failed: {0}")]
    Terminal(#[from] dialoguer::Error),
}

/// Interactive operator input. Selections return indices into `choices`.
pub trait Prompter {
    fn select_one(&self, message: &str, choices: &[String]) -> Result<usize, PromptError>;

    fn select_many(&self, message: &str, choices: &[String]) -> Result<Vec<usize>, PromptError>;

    fn input_text(&self, message: &str, default: Option<&str>) -> Result<String, PromptError>;

    /// Masked input.
    fn input_secret(&self, message: &str) -> Result<String, PromptError>;
}

/// Prompts on the controlling terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn select_one(&self, message: &str, choices: &[String]) -> Result<usize, PromptError> {
        if choices.is_empty() {
            return Err(PromptError::NoChoices(message.to_string()));
        }
        Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(choices)
            .default(0)
            .interact_opt()?
            .ok_or_else(|| PromptError::Dismissed(message.to_string()))
    }

    fn select_many(&self, message: &str, choices: &[String]) -> Result<Vec<usize>, PromptError> {
        if choices.is_empty() {
            return Ok(Vec::new());
        }
        MultiSelect::with_theme(&self.theme)
            .with_prompt(message)
            .items(choices)
            .interact_opt()?
            .ok_or_else(|| PromptError::Dismissed(message.to_string()))
    }

    fn input_text(&self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        let mut input = Input::<String>::with_theme(&self.theme).with_prompt(message);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn input_secret(&self, message: &str) -> Result<String, PromptError> {
        Ok(Password::with_theme(&self.theme)
            .with_prompt(message)
            .allow_empty_password(true)
            .interact()?)
    }
}
