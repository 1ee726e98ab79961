use clap::Parser;
use shockfade::cli::{Cli, Commands};
use tracing::error;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => shockfade::cli::run(&cli.config, args.dry_run).await,
        Commands::Status => shockfade::cli::status(&cli.config),
        Commands::CheckConfig => shockfade::cli::check_config(&cli.config),
    };

    if let Err(err) = result {
        error!(error = %err, "fatal error");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
