// tests/cli.rs

use std::path::PathBuf;

use clap::Parser;
use tfapply::cli::{CliArgs, Command, LogLevel};
use tfapply::logging::filter_directive;

#[test]
fn defaults_point_at_working_directory_files() {
    let args = CliArgs::try_parse_from(["tfapply", "create"]).unwrap();

    assert_eq!(args.command, Command::Create);
    assert_eq!(args.config, PathBuf::from("tfapply.toml"));
    assert_eq!(args.state, PathBuf::from("tfapply.state.toml"));
    assert!(args.log_level.is_none());
    assert!(!args.dry_run);
}

#[test]
fn flags_and_subcommand_parse() {
    let args = CliArgs::try_parse_from([
        "tfapply",
        "--config",
        "envs/dev.toml",
        "--state",
        "envs/dev.state.toml",
        "--log-level",
        "debug",
        "--dry-run",
        "destroy",
    ])
    .unwrap();

    assert_eq!(args.command, Command::Destroy);
    assert_eq!(args.config, PathBuf::from("envs/dev.toml"));
    assert_eq!(args.state, PathBuf::from("envs/dev.state.toml"));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(args.dry_run);
}

#[test]
fn subcommand_is_required() {
    assert!(CliArgs::try_parse_from(["tfapply"]).is_err());
    assert!(CliArgs::try_parse_from(["tfapply", "refresh"]).is_err());
}

#[test]
fn log_levels_map_to_filter_directives() {
    assert_eq!(filter_directive(LogLevel::Warn), "warn");
    assert_eq!(filter_directive(LogLevel::Trace), "trace");
}
