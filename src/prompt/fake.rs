//! Scripted prompter for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{PromptError, Prompter};

#[derive(Debug, Clone)]
pub enum Answer {
    Pick(usize),
    PickMany(Vec<usize>),
    Text(String),
    /// Operator pressed Esc.
    Dismiss,
    /// Accept the prompt's default.
    Default,
}

/// Replays answers in order and records every prompt message it was shown.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next(&self, message: &str) -> Answer {
        self.asked.lock().unwrap().push(message.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted answer for prompt {message:?}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn select_one(&self, message: &str, choices: &[String]) -> Result<usize, PromptError> {
        match self.next(message) {
            Answer::Pick(i) => {
                assert!(i < choices.len(), "pick {i} out of range for {message:?}");
                Ok(i)
            }
            Answer::Default => Ok(0),
            Answer::Dismiss => Err(PromptError::Dismissed(message.to_string())),
            other => panic!("unexpected answer {other:?} for select {message:?}"),
        }
    }

    fn select_many(&self, message: &str, choices: &[String]) -> Result<Vec<usize>, PromptError> {
        match self.next(message) {
            Answer::PickMany(picks) => {
                assert!(picks.iter().all(|&i| i < choices.len()));
                Ok(picks)
            }
            Answer::Default => Ok(Vec::new()),
            Answer::Dismiss => Err(PromptError::Dismissed(message.to_string())),
            other => panic!("unexpected answer {other:?} for multi-select {message:?}"),
        }
    }

    fn input_text(&self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        match self.next(message) {
            Answer::Text(text) => Ok(text),
            Answer::Default => Ok(default.unwrap_or_default().to_string()),
            Answer::Dismiss => Err(PromptError::Dismissed(message.to_string())),
            other => panic!("unexpected answer {other:?} for input {message:?}"),
        }
    }

    fn input_secret(&self, message: &str) -> Result<String, PromptError> {
        match self.next(message) {
            Answer::Text(text) => Ok(text),
            Answer::Dismiss => Err(PromptError::Dismissed(message.to_string())),
            other => panic!("unexpected answer {other:?} for secret {message:?}"),
        }
    }
}
