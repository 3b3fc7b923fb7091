//! Terminal front end for Tabshelf
//!
//! A line-oriented shell over the app state: sessions, saved items and
//! groups are listed with numbers and manipulated by command.

mod commands;
mod shell;

pub use commands::{parse_command, Command, GroupRef, HELP};
pub use shell::{Flow, Shell};
