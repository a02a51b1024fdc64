use std::{
    collections::BTreeMap,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use crate::{
    app::App,
    config::Settings,
    stack::{MomentoLambdaStack, StackProps, check_stack_id},
};

/// The default log level.
///
/// 2 corresponds to the level INFO.
const DEFAULT_LOG_LEVEL: usize = 2;

#[derive(Parser)]
#[command(version)]
pub struct Cli {
    /// Silence all output
    #[arg(short, long)]
    quiet: bool,
    /// Verbose mode (-v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// The project directory containing the docker build context
    #[arg(short, long, env = "MOMENTO_STACK_DIRECTORY")]
    directory: Option<PathBuf>,
    #[clap(flatten)]
    stack: StackArgs,
    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Args)]
struct StackArgs {
    /// Identifier of the stack
    #[arg(long, default_value = "MomentoLambdaStack", value_parser = parse_stack_id)]
    stack_id: String,
    /// Description of the stack
    #[arg(long)]
    description: Option<String>,
    /// Tag applied to every resource (KEY=VALUE, repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the template and asset manifest for the provisioning engine
    Synth(SynthArgs),
    /// Check that the required environment variables are set
    Validate,
    /// Print the function description as JSON
    Describe(DescribeArgs),
}

#[derive(Args)]
struct SynthArgs {
    /// Output directory
    ///
    /// Defaults to cdk.out inside the project directory.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct DescribeArgs {
    /// Print the API key instead of masking it
    #[arg(long)]
    show_secrets: bool,
}

fn parse_stack_id(s: &str) -> Result<String> {
    check_stack_id(s)?;
    Ok(s.into())
}

fn parse_tag(s: &str) -> Result<(String, String)> {
    let Some((key, value)) = s.split_once('=') else {
        bail!("Failed to parse tag {s}, expected KEY=VALUE")
    };
    if key.is_empty() {
        bail!("Tag {s} has an empty key")
    }
    Ok((key.into(), value.into()))
}

impl Cli {
    pub fn init(module: &str) -> ExitCode {
        let cli = Self::parse();

        let _ = stderrlog::new()
            .module(module)
            .show_level(false)
            .quiet(cli.quiet)
            .verbosity(DEFAULT_LOG_LEVEL + usize::from(cli.verbose))
            .init();

        let directory = cli
            .directory
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

        // Read once; nothing below looks at the process environment again.
        let settings = Settings::from_env();

        match cli.commands.call(&directory, &cli.stack, &settings) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                // When at least one -v is added, the source of the error is also printed.
                if DEFAULT_LOG_LEVEL + usize::from(cli.verbose) >= 3 {
                    log::error!("{err:#}");
                } else {
                    log::error!("{err}");
                }
                ExitCode::FAILURE
            }
        }
    }
}

impl StackArgs {
    fn props(&self) -> StackProps {
        StackProps {
            description: self.description.clone(),
            tags: self.tags.iter().cloned().collect::<BTreeMap<_, _>>(),
        }
    }
}

impl Commands {
    fn call(self, directory: &Path, stack: &StackArgs, settings: &Settings) -> Result<()> {
        match self {
            Self::Synth(args) => synth(directory, stack, settings, &args),
            Self::Validate => validate(settings),
            Self::Describe(args) => describe(stack, settings, &args),
        }
    }
}

fn synth(
    directory: &Path,
    stack: &StackArgs,
    settings: &Settings,
    args: &SynthArgs,
) -> Result<()> {
    let mut app = App::default();
    MomentoLambdaStack::build(&mut app, &stack.stack_id, Some(stack.props()), settings)?;

    let out_dir = args
        .output
        .clone()
        .unwrap_or_else(|| directory.join("cdk.out"));

    log::info!("Synthesizing {}...", stack.stack_id);
    let written = app
        .synth(directory, &out_dir)
        .with_context(|| format!("Failed to synthesize into {out_dir:?}"))?;

    for path in &written {
        log::info!("Wrote {}", path.display());
    }
    log::info!("Synthesized {} stack(s)", app.stacks().len());

    Ok(())
}

fn validate(settings: &Settings) -> Result<()> {
    settings.require_api_key()?;
    settings.require_endpoint()?;
    log::info!("Configuration is valid");
    Ok(())
}

fn describe(stack: &StackArgs, settings: &Settings, args: &DescribeArgs) -> Result<()> {
    let mut app = App::default();
    let descriptor =
        MomentoLambdaStack::build(&mut app, &stack.stack_id, Some(stack.props()), settings)?;

    let descriptor = if args.show_secrets {
        descriptor
    } else {
        descriptor.masked()
    };

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &descriptor)
        .context("Failed to serialize descriptor")?;
    stdout.write_all(b"\n")?;
    Ok(())
}
