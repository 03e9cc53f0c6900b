//! pdftools command-line front end
//!
//! Runs one tool per invocation and writes its output into `--output-dir`.

mod cli;
mod output;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use output::DirectorySink;
use pdftools_core::NoProgress;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    if let Command::Info { input } = &args.command {
        let file = cli::read_input(input)?;
        let info = pdftools_core::validate_pdf(&file.bytes)
            .with_context(|| format!("Cannot inspect {}", input.display()))?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let Some((mut tool, inputs)) = cli::controller_for(&args.command)? else {
        return Ok(());
    };
    tracing::debug!(tool = ?tool.kind(), inputs = inputs.len(), "running");

    let mut sink = DirectorySink::new(&args.output_dir);
    let notification = tool.execute(&mut sink, &mut NoProgress);
    if !notification.is_success() {
        bail!("{}: {}", notification.title, notification.description);
    }

    eprintln!("{}", notification.description);
    for path in sink.written() {
        println!("{}", path.display());
    }
    Ok(())
}
