//! # Command Line Interface
//!
//! The command tree is built in `cli.rs`, the subcommands run in the `commands` module.

use env_logger;
#[cfg(windows)]
use colored;
use log::error;
use arckit::commands;
use arckit::commands::CommandError;

mod cli;

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).unwrap();

    let main_cmd = cli::build_cli();
    let matches = main_cmd.clone().get_matches();

    if let Some(cmd) = matches.subcommand_matches("catalog") {
        return commands::stat::catalog(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("tree") {
        return commands::stat::tree(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("stat") {
        return commands::stat::stat(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("get") {
        return commands::get::get(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("tracks") {
        return commands::optical::tracks(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("convert") {
        return commands::optical::convert(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("completions") {
        return commands::completions::generate(main_cmd,cmd);
    }

    error!("No subcommand was found, try `arckit --help`");
    return Err(Box::new(CommandError::InvalidCommand));
}
