pub mod commands;
pub mod menu;
pub mod output;
pub mod prompt;
mod shell;

pub use menu::MenuChoice;
pub use shell::{run_cli, run_menu, CliMode, LoopControl, ShellContext, SCRIPT_MODE_ENV};
