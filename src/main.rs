use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::CommandFactory;
use imgprov::cli::{self, Commands};
use imgprov::executor::RealCommandExecutor;
use tracing::error;

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    let log_level = match &args.command {
        Commands::Apply(opts) => opts.log_level,
        Commands::Validate(opts) => opts.log_level,
        Commands::Jwks(opts) => opts.log_level,
        Commands::Completions(_) => cli::LogLevel::Error,
    };
    imgprov::init_logging(log_level)?;

    let result = match &args.command {
        Commands::Apply(opts) => {
            let executor = Arc::new(RealCommandExecutor {
                dry_run: opts.dry_run,
            });
            imgprov::run_apply(opts, executor)
        }
        Commands::Validate(opts) => imgprov::run_validate(opts),
        Commands::Jwks(opts) => imgprov::run_jwks(opts),
        Commands::Completions(opts) => {
            let mut cmd = cli::Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(opts.shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}
