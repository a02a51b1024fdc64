mod app;
mod asset;
mod cli;
mod config;
mod descriptor;
mod stack;
mod template;

use std::process::ExitCode;

use cli::Cli;

fn main() -> ExitCode {
    Cli::init(module_path!())
}
