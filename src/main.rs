//! skyauth CLI binary entry point.

use clap::Parser;
use skyauth::cli::{commands, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match &cli.command {
        Commands::Metadata => commands::render_metadata(config_path),
        Commands::ParseCallback(args) => commands::render_callback(&args.url),
        Commands::Config => commands::render_config(config_path),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
