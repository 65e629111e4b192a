use std::io;

use crate::config::ConfigManager;
use crate::errors::CliError;
use crate::ledger::Ledger;
use crate::storage::JsonFileStore;
use crate::utils::build_info;

use super::commands;
use super::menu::MenuChoice;
use super::output::{self, OutputPreferences};
use super::prompt::{DialoguerPrompter, Prompter, ScriptPrompter};

/// Set to any value to read answers line by line from stdin with plain output.
pub const SCRIPT_MODE_ENV: &str = "BANK_CORE_CLI_SCRIPT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// State shared by the menu handlers.
pub struct ShellContext<P> {
    pub ledger: Ledger,
    pub prompter: P,
}

impl<P: Prompter> ShellContext<P> {
    pub fn new(ledger: Ledger, prompter: P) -> Self {
        Self { ledger, prompter }
    }

    fn dispatch(&mut self, choice: MenuChoice) -> Result<LoopControl, CliError> {
        tracing::debug!(?choice, "menu selection");
        match choice {
            MenuChoice::AddAccount => commands::handle_add(self)?,
            MenuChoice::DeleteAccount => commands::handle_delete(self)?,
            MenuChoice::ListAccounts => commands::handle_list(self)?,
            MenuChoice::Deposit => commands::handle_deposit(self)?,
            MenuChoice::Withdraw => commands::handle_withdraw(self)?,
            MenuChoice::Transfer => commands::handle_transfer(self)?,
            MenuChoice::Exit => return Ok(LoopControl::Exit),
        }
        Ok(LoopControl::Continue)
    }
}

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_MODE_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let config = ConfigManager::new().load_or_default();
    let ledger = Ledger::new(Box::new(JsonFileStore::from_config(&config)));

    match mode {
        CliMode::Interactive => run_menu(ShellContext::new(ledger, DialoguerPrompter::new())),
        CliMode::Script => {
            output::set_preferences(OutputPreferences { plain_mode: true });
            let stdin = io::stdin();
            run_menu(ShellContext::new(ledger, ScriptPrompter::new(stdin.lock())))
        }
    }
}

/// Loads the ledger, runs the menu until Exit (or end of input), then saves.
///
/// Errors that end the loop early still get a final save attempt before
/// being returned.
pub fn run_menu<P: Prompter>(mut context: ShellContext<P>) -> Result<(), CliError> {
    output::info(format!(
        "Welcome! This is the bank account manager, {}.",
        build_info::current().summary()
    ));
    commands::handle_load(&mut context);

    let labels = MenuChoice::labels();
    let outcome = loop {
        let choice = match context.prompter.choose("Input", &labels) {
            Ok(Some(index)) => MenuChoice::from_index(index).unwrap_or(MenuChoice::Exit),
            Ok(None) => MenuChoice::Exit,
            Err(err) => break Err(err),
        };
        match context.dispatch(choice) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) | Err(CliError::InputClosed) => break Ok(()),
            Err(err) => break Err(err),
        }
    };

    commands::handle_exit(&mut context);
    outcome
}
