//! create-falcon
//!
//! Command-line entry point that scaffolds a new Falcon application.
//!
//! ## Usage
//!
//! ```bash
//! create-falcon                 # prompts for a name
//! create-falcon my-app
//! create-falcon my-app --template ./my-template -v
//! create-falcon my-app --core ~/src/falcon/falcon-core
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use create_falcon::{create_project, validate_project_name, ScaffoldError, DEFAULT_PROJECT_NAME};
use dialoguer::Input;
use tracing_subscriber::EnvFilter;

const FALCON_ART: &str = r"
      ⠀⠀⠀⠀⣠⣴⣾⣿⣿⣿⣿⣿⣿⣶⣤⣄⠀⠀⠀⠀⠀⠀⠀⠀
  ⠀⠀⠀⠀⣠⣾⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣶⣄⠀⠀⠀⠀⠀
  ⠀⠀⣠⣾⣿⣿⣿⣿⣿⣿⣿⣿⣿⣷⣆⠉⠉⢉⣿⣿⣿⣷⣦⣄⡀⠀
  ⠀⠚⢛⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⡄
  ⠀⢠⣾⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⠿⠿⠿⠿⠿⣿⡇
  ⢀⣿⡿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⡿⠋⠁⠀⠀⠀⠀⠀⠀⠈⠃
  ⠸⠁⢀⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⠏⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀
  ⠀⠀⢸⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⡏⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀
  ⠀⠀⠀⣿⣿⣿⡿⣿⣿⣿⣿⣿⣿⠁⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀
  ⠀⠀⠀⠹⣿⣿⡇⠈⠻⣿⣿⣿⣿⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀
  ⠀⠀⠀⠀⠈⠻⡇⠀⠀⠈⠙⠿⣿⠀⠀⠀⠀⠀";

#[derive(Parser)]
#[command(name = "create-falcon")]
#[command(about = "Scaffold a new Falcon application", long_about = None)]
#[command(version)]
struct Cli {
    /// Name of the project; prompted for when omitted
    #[arg(value_name = "PROJECT_NAME")]
    name: Option<String>,

    /// Template directory to copy
    #[arg(short, long, value_name = "DIR", default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/template"))]
    template: PathBuf,

    /// Local falcon-core crate the new project depends on
    #[arg(long, value_name = "DIR", default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/../falcon-core"))]
    core: PathBuf,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn prompt_name() -> Result<String> {
    let name = Input::<String>::new()
        .with_prompt("What is the name of your new project?")
        .default(DEFAULT_PROJECT_NAME.to_string())
        .validate_with(|input: &String| -> Result<(), String> {
            validate_project_name(input).map_err(|err| err.to_string())
        })
        .interact_text()
        .context("failed to read the project name")?;
    Ok(name)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    println!("{FALCON_ART}{}\n", style("Welcome to Falcon").cyan().bold());

    let name = match cli.name {
        Some(name) => name,
        None => prompt_name()?,
    };

    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let target = cwd.join(&name);

    println!(
        "{}",
        style(format!("Creating a new Falcon app in {}...", target.display())).cyan()
    );

    match create_project(&name, &cli.template, &cli.core, &target) {
        Ok(scaffold) => {
            println!(
                "\n{}",
                style("✓ Success! Your new project is ready.").green().bold()
            );
            println!(
                "  {}",
                style(format!(
                    "{} files, {} directories",
                    scaffold.files, scaffold.directories
                ))
                .dim()
            );
            println!("\n{}", style("Next steps:").bold());
            println!("  cd {}", style(&name).yellow());
            println!("  {}", style("cargo run").yellow());
            Ok(())
        }
        Err(
            err @ (ScaffoldError::InvalidName(_)
            | ScaffoldError::TargetExists(_)
            | ScaffoldError::CoreMissing(_)),
        ) => {
            eprintln!("\n{}", style(format!("✗ {err}")).red().bold());
            process::exit(1);
        }
        Err(err) => {
            eprintln!(
                "\n{}",
                style("✗ An error occurred while creating the project:").red().bold()
            );
            eprintln!("{}", style(&err).red());
            process::exit(1);
        }
    }
}
