mod account;
mod compare;
mod inspect;
mod notification;

use clap::{Parser, Subcommand};

use crate::cli::{compare::CompareArgs, inspect::InspectArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: compare today's costs across the tariffs and switch to the cheapest one.
    #[clap(name = "compare")]
    Compare(Box<CompareArgs>),

    /// Development tools.
    #[clap(name = "inspect")]
    Inspect(InspectArgs),
}
