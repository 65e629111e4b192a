//! Menu handlers: collect input, call the ledger, report the outcome.

use crate::errors::CliError;
use crate::ledger::{LoadOutcome, PersistenceEvent};
use crate::utils::format_amount;

use super::output;
use super::prompt::{ask_account_id, ask_amount, ask_text, Prompter};
use super::shell::ShellContext;

pub type CommandResult = Result<(), CliError>;

pub fn handle_add<P: Prompter>(context: &mut ShellContext<P>) -> CommandResult {
    let name = ask_text(&mut context.prompter, "Please enter the name")?;
    let balance = ask_amount(&mut context.prompter, "Please enter the balance")?;
    match context.ledger.add_account(name, balance) {
        Ok(id) => output::success(format!("Account with ID {id} successfully added.")),
        Err(err) => output::error(err),
    }
    report_saves(context);
    Ok(())
}

pub fn handle_delete<P: Prompter>(context: &mut ShellContext<P>) -> CommandResult {
    let id = ask_account_id(&mut context.prompter, "Please enter the account ID")?;
    match context.ledger.delete_account(id) {
        Ok(_) => output::success(format!("Account with ID {id} successfully deleted.")),
        Err(err) => output::error(format!("{err}.")),
    }
    report_saves(context);
    Ok(())
}

pub fn handle_list<P: Prompter>(context: &mut ShellContext<P>) -> CommandResult {
    if context.ledger.is_empty() {
        output::info("No accounts yet.");
        return Ok(());
    }
    output::section("Accounts");
    for (id, account) in context.ledger.list_accounts() {
        println!("ID: {id}, {account}");
    }
    Ok(())
}

pub fn handle_deposit<P: Prompter>(context: &mut ShellContext<P>) -> CommandResult {
    let id = ask_account_id(&mut context.prompter, "Please enter the account ID")?;
    let amount = ask_amount(&mut context.prompter, "Please enter the amount for deposit")?;
    match context.ledger.deposit(id, amount) {
        Ok(_) => output::success(format!(
            "{} deposited to account with ID {id}.",
            format_amount(amount)
        )),
        Err(err) => output::error(err),
    }
    report_saves(context);
    Ok(())
}

pub fn handle_withdraw<P: Prompter>(context: &mut ShellContext<P>) -> CommandResult {
    let id = ask_account_id(&mut context.prompter, "Please enter the account ID")?;
    let amount = ask_amount(&mut context.prompter, "Please enter the amount for withdraw")?;
    match context.ledger.withdraw(id, amount) {
        Ok(_) => output::success(format!(
            "{} withdrawn from account with ID {id}",
            format_amount(amount)
        )),
        Err(err) => output::error(err),
    }
    report_saves(context);
    Ok(())
}

pub fn handle_transfer<P: Prompter>(context: &mut ShellContext<P>) -> CommandResult {
    let sender = ask_account_id(&mut context.prompter, "Please enter the sender ID")?;
    let receiver = ask_account_id(&mut context.prompter, "Please enter the receiver ID")?;
    let amount = ask_amount(&mut context.prompter, "Please enter the amount for transfer")?;
    match context.ledger.transfer(sender, receiver, amount) {
        Ok(_) => output::success("Transfer successful."),
        Err(err) => output::error(err),
    }
    report_saves(context);
    Ok(())
}

/// Startup load. Problems are reported and the shell continues with an empty ledger.
pub fn handle_load<P: Prompter>(context: &mut ShellContext<P>) {
    match context.ledger.load() {
        Ok(LoadOutcome::Loaded { .. }) => output::success("Accounts successfully loaded."),
        Ok(LoadOutcome::NothingStored) => output::info(format!(
            "{} could not be found, starting with no accounts.",
            context.ledger.store_location()
        )),
        Err(err) => output::error(err),
    }
}

/// Final save on exit, performed even when nothing changed.
pub fn handle_exit<P: Prompter>(context: &mut ShellContext<P>) {
    report_saves(context);
    match context.ledger.save() {
        Ok(()) => output::success("Accounts successfully saved."),
        Err(err) => output::error(err),
    }
    output::info("Goodbye!");
}

fn report_saves<P: Prompter>(context: &mut ShellContext<P>) {
    for event in context.ledger.take_persistence_events() {
        match event {
            PersistenceEvent::Saved => output::success("Accounts successfully saved."),
            PersistenceEvent::SaveFailed(err) => output::error(err),
        }
    }
}
