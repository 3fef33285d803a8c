//! baaskit CLI main entry point

use baaskit_cli::{
    app::App,
    cli::Cli,
    commands,
    error::CliResult,
    utils::{init_tracing, ColoredOutput},
};
use baaskit_dispatch::Priority;
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", ColoredOutput::error("Error:"), e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    init_tracing()?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    info!("baaskit CLI v{}", env!("CARGO_PKG_VERSION"));

    let app = App::load(cli.config.as_deref(), cli.credentials.as_deref())?;
    let result = commands::run(&app, cli.command, Priority::new(cli.priority)).await;
    app.shutdown().await;
    let output = result?;

    eprintln!("{}", ColoredOutput::success(&output.message));
    if let Some(value) = output.value {
        println!("{}", cli.format.format_json(&value)?);
    }
    Ok(())
}
