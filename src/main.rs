use clap::Parser;
use coinkeeper::adapter::inbound::cli::command::{Cli, Commands};
use coinkeeper::adapter::inbound::cli::output::{self, OutputConfig};
use coinkeeper::adapter::inbound::cli::{generate, refresh, run, status};
use coinkeeper::infrastructure::config::Config;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet), &cli.color);

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            output::error(&format!("Failed to load config: {e}"));
            std::process::exit(1);
        }
    };
    config.init_logging();

    let result = match &cli.command {
        Commands::Run(args) => run::execute(&config, args).await,
        Commands::Generate(args) => generate::execute(&config, args).await,
        Commands::Refresh => refresh::execute(&config).await,
        Commands::Status => status::execute(&config).await,
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
