//! Prompt capability used by the interactive builder

use console::style;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect, Select};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PromptError {
    #[error("cancelled by user")]
    #[diagnostic(code(taxonopy::prompt::cancelled))]
    Cancelled,

    #[error("terminal error: {0}")]
    #[diagnostic(code(taxonopy::prompt::io))]
    Io(#[from] std::io::Error),
}

impl From<dialoguer::Error> for PromptError {
    fn from(err: dialoguer::Error) -> Self {
        match err {
            dialoguer::Error::IO(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                PromptError::Cancelled
            }
            dialoguer::Error::IO(e) => PromptError::Io(e),
        }
    }
}

/// Asks the user for text, one choice or several choices
pub trait Prompter {
    fn ask_text(&mut self, message: &str, default: Option<&str>) -> Result<String, PromptError>;

    fn ask_single_choice(
        &mut self,
        message: &str,
        choices: &[String],
        default: Option<&str>,
    ) -> Result<String, PromptError>;

    fn ask_multi_choice(
        &mut self,
        message: &str,
        choices: &[String],
        defaults: &[String],
    ) -> Result<Vec<String>, PromptError>;

    /// Show a non-fatal message (e.g. a rejected value)
    fn warn(&mut self, message: &str) {
        eprintln!("{} {}", style("!").yellow(), message);
    }
}

/// Terminal prompter
pub struct TermPrompter {
    theme: ColorfulTheme,
}

impl TermPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TermPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TermPrompter {
    fn ask_text(&mut self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn ask_single_choice(
        &mut self,
        message: &str,
        choices: &[String],
        default: Option<&str>,
    ) -> Result<String, PromptError> {
        let default_idx = default
            .and_then(|d| choices.iter().position(|c| c == d))
            .unwrap_or(0);

        let selection = Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(choices)
            .default(default_idx)
            .interact_opt()?
            .ok_or(PromptError::Cancelled)?;

        choices
            .get(selection)
            .cloned()
            .ok_or(PromptError::Cancelled)
    }

    fn ask_multi_choice(
        &mut self,
        message: &str,
        choices: &[String],
        defaults: &[String],
    ) -> Result<Vec<String>, PromptError> {
        let checked: Vec<bool> = choices.iter().map(|c| defaults.contains(c)).collect();

        let selection = MultiSelect::with_theme(&self.theme)
            .with_prompt(message)
            .items(choices)
            .defaults(&checked)
            .interact_opt()?
            .ok_or(PromptError::Cancelled)?;

        Ok(selection
            .into_iter()
            .filter_map(|i| choices.get(i).cloned())
            .collect())
    }
}

/// Prompter answering from a fixed script, for tests and batch use
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<ScriptedAnswer>,
    /// Every message asked, in order
    pub asked: Vec<String>,
    /// Every warning shown, in order
    pub warnings: Vec<String>,
}

/// One scripted answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedAnswer {
    Text(String),
    Choice(String),
    Choices(Vec<String>),
    /// Accept whatever default the prompt offers
    Default,
    Cancel,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Whether every scripted answer was used
    pub fn is_exhausted(&self) -> bool {
        self.answers.is_empty()
    }

    fn next(&mut self, message: &str) -> Result<ScriptedAnswer, PromptError> {
        self.asked.push(message.to_string());
        match self.answers.pop_front() {
            None | Some(ScriptedAnswer::Cancel) => Err(PromptError::Cancelled),
            Some(answer) => Ok(answer),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask_text(&mut self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        match self.next(message)? {
            ScriptedAnswer::Text(text) | ScriptedAnswer::Choice(text) => Ok(text),
            ScriptedAnswer::Default => Ok(default.unwrap_or_default().to_string()),
            other => Err(unexpected(message, &other)),
        }
    }

    fn ask_single_choice(
        &mut self,
        message: &str,
        choices: &[String],
        default: Option<&str>,
    ) -> Result<String, PromptError> {
        match self.next(message)? {
            ScriptedAnswer::Choice(choice) | ScriptedAnswer::Text(choice) => Ok(choice),
            ScriptedAnswer::Default => default
                .map(str::to_string)
                .or_else(|| choices.first().cloned())
                .ok_or(PromptError::Cancelled),
            other => Err(unexpected(message, &other)),
        }
    }

    fn ask_multi_choice(
        &mut self,
        message: &str,
        _choices: &[String],
        defaults: &[String],
    ) -> Result<Vec<String>, PromptError> {
        match self.next(message)? {
            ScriptedAnswer::Choices(picked) => Ok(picked),
            ScriptedAnswer::Default => Ok(defaults.to_vec()),
            other => Err(unexpected(message, &other)),
        }
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

fn unexpected(message: &str, answer: &ScriptedAnswer) -> PromptError {
    PromptError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("scripted answer {:?} does not fit prompt '{}'", answer, message),
    ))
}
