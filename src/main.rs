use clap::Parser;
use killzone::app::Config;
use killzone::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => cli::run::execute(args).await,
        Commands::Check(args) => {
            cli::check::execute(&args.config);
            Ok(())
        }
        Commands::Status(args) => match Config::load(&args.config) {
            Ok(config) => cli::status::execute(&config, args.json),
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
