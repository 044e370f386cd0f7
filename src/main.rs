use clap::Parser;
mod catalog;
mod cli;
mod commands;
mod config;
mod error;
mod manifest;
mod shell;
mod util;
mod version;


use cli::Args;

fn main() -> Result<(), anyhow::Error> {
	cli::run(Args::parse())
}
