use anyhow::Result;
use clap::Parser;
use imgprov::cli::{Cli, Commands, LogLevel};

#[test]
fn test_parse_apply_command() -> Result<()> {
    let args = Cli::parse_from(["imgprov", "apply", "--file", "test.yml"]);

    match args.command {
        Commands::Apply(opts) => {
            assert_eq!(opts.file, "test.yml");
            assert!(!opts.dry_run);
            assert_eq!(opts.log_level, LogLevel::Info);
        }
        _ => panic!("Expected Apply command"),
    }

    Ok(())
}

#[test]
fn test_parse_apply_command_with_flags() -> Result<()> {
    let args = Cli::parse_from([
        "imgprov",
        "apply",
        "--file",
        "test.yml",
        "--dry-run",
        "--log-level",
        "debug",
    ]);

    match args.command {
        Commands::Apply(opts) => {
            assert_eq!(opts.file, "test.yml");
            assert!(opts.dry_run);
            assert_eq!(opts.log_level, LogLevel::Debug);
        }
        _ => panic!("Expected Apply command"),
    }

    Ok(())
}

#[test]
fn test_parse_apply_defaults_to_profile_yaml() -> Result<()> {
    let args = Cli::parse_from(["imgprov", "apply"]);
    match args.command {
        Commands::Apply(opts) => assert_eq!(opts.file, "profile.yaml"),
        _ => panic!("Expected Apply command"),
    }
    Ok(())
}

#[test]
fn test_parse_validate_command() -> Result<()> {
    let args = Cli::parse_from(["imgprov", "validate", "--file", "test.yml"]);

    match args.command {
        Commands::Validate(opts) => {
            assert_eq!(opts.file, "test.yml");
        }
        _ => panic!("Expected Validate command"),
    }

    Ok(())
}

#[test]
fn test_parse_jwks_command() -> Result<()> {
    let args = Cli::parse_from([
        "imgprov",
        "jwks",
        "https://auth.example.com/.well-known/jwks.json",
        "--timeout",
        "5",
        "-o",
        "publicKey.txt",
    ]);

    match args.command {
        Commands::Jwks(opts) => {
            assert_eq!(opts.url, "https://auth.example.com/.well-known/jwks.json");
            assert_eq!(opts.timeout, 5);
            assert_eq!(opts.output.as_deref(), Some(camino::Utf8Path::new("publicKey.txt")));
            assert_eq!(opts.log_level, LogLevel::Warn);
        }
        _ => panic!("Expected Jwks command"),
    }

    Ok(())
}

#[test]
fn test_jwks_requires_url() {
    assert!(Cli::try_parse_from(["imgprov", "jwks"]).is_err());
}
