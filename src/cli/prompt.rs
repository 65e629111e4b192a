//! Line-oriented input sources and the parsing loops built on top of them.

use std::io::{self, BufRead, Write};

use dialoguer::{theme::ColorfulTheme, Input, Select};

use crate::errors::CliError;
use crate::ledger::AccountId;

use super::output;

/// Source of user answers. `Ok(None)` means the input is exhausted.
pub trait Prompter {
    fn line(&mut self, prompt: &str) -> Result<Option<String>, CliError>;

    /// Picks one of `items`, returning its zero-based index.
    fn choose(&mut self, prompt: &str, items: &[&str]) -> Result<Option<usize>, CliError> {
        output::blank_line();
        for (index, item) in items.iter().enumerate() {
            println!("{}: {}", index + 1, item);
        }
        loop {
            let Some(answer) = self.line(prompt)? else {
                return Ok(None);
            };
            match answer.trim().parse::<usize>() {
                Ok(choice) if (1..=items.len()).contains(&choice) => return Ok(Some(choice - 1)),
                Ok(_) => output::warning(format!(
                    "Please enter an integer between 1-{}.",
                    items.len()
                )),
                Err(_) => output::warning("Please enter an integer."),
            }
        }
    }
}

/// Interactive terminal prompts.
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for DialoguerPrompter {
    fn line(&mut self, prompt: &str) -> Result<Option<String>, CliError> {
        let answer = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text();
        match answer {
            Ok(text) => Ok(Some(text)),
            Err(dialoguer::Error::IO(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn choose(&mut self, prompt: &str, items: &[&str]) -> Result<Option<usize>, CliError> {
        let choice = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_opt()?;
        Ok(choice)
    }
}

/// Reads one answer per line from any buffered reader, echoing nothing but the prompt.
pub struct ScriptPrompter<R> {
    reader: R,
}

impl<R: BufRead> ScriptPrompter<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Prompter for ScriptPrompter<R> {
    fn line(&mut self, prompt: &str) -> Result<Option<String>, CliError> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt} >> ")?;
        stdout.flush()?;

        let mut buffer = String::new();
        if self.reader.read_line(&mut buffer)? == 0 {
            writeln!(stdout)?;
            return Ok(None);
        }
        let answer = buffer.trim_end_matches(['\n', '\r']).to_string();
        writeln!(stdout)?;
        Ok(Some(answer))
    }
}

pub fn ask_text(prompter: &mut impl Prompter, prompt: &str) -> Result<String, CliError> {
    prompter.line(prompt)?.ok_or(CliError::InputClosed)
}

/// Re-prompts until the answer parses as a finite number.
pub fn ask_amount(prompter: &mut impl Prompter, prompt: &str) -> Result<f64, CliError> {
    loop {
        let answer = ask_text(prompter, prompt)?;
        match parse_amount(&answer) {
            Some(amount) => return Ok(amount),
            None => output::warning("Please enter a number."),
        }
    }
}

/// Re-prompts until the answer parses as a non-negative integer.
pub fn ask_account_id(prompter: &mut impl Prompter, prompt: &str) -> Result<AccountId, CliError> {
    loop {
        let answer = ask_text(prompter, prompt)?;
        match answer.trim().parse::<AccountId>() {
            Ok(id) => return Ok(id),
            Err(_) => output::warning("Please enter a non-negative account ID."),
        }
    }
}

pub fn parse_amount(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
