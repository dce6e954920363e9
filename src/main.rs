use autopost::cli::Args;
use clap::Parser;
use dotenv::dotenv;
use std::error::Error;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();
    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match autopost::run(args).await? {
        Some(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(if response.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        None => Ok(ExitCode::SUCCESS),
    }
}
