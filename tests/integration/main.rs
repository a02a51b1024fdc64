use std::{ffi::OsStr, fs, path::Path, process::Output};

use anyhow::Result;
use assert_cmd::Command;

mod cli;

const API_KEY: &str = "MOMENTO_API_KEY";
const ENDPOINT: &str = "MOMENTO_ENDPOINT";

/// Create a project directory with a minimal docker build context.
fn init(directory: &Path) -> Result<()> {
    fs::create_dir(directory.join("docker"))?;
    fs::write(directory.join("docker/Dockerfile"), "FROM scratch\n")?;
    Ok(())
}

/// Run the binary in `directory` with only the given variables set.
fn momento_lambda_stack<I, S>(directory: &Path, vars: &[(&str, &str)], args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::cargo_bin("momento-lambda-stack")?;
    command
        .env_remove(API_KEY)
        .env_remove(ENDPOINT)
        .env_remove("MOMENTO_STACK_DIRECTORY")
        .current_dir(directory)
        .args(args);
    for (key, value) in vars {
        command.env(key, value);
    }
    Ok(command.output()?)
}
