//! Checks a rebookd configuration file and prints the effective settings

use rebook_config::{CURRENT_CONFIG_VERSION, ConfigError, Settings, load_config};
use rebook_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn print_settings(settings: &Settings) {
    println!("Configuration OK (version {CURRENT_CONFIG_VERSION})");
    println!("  listen                  {}", settings.server.listen);
    println!("  database                {}", settings.server.database_path().display());
    println!(
        "  verify_slot_membership  {}",
        settings.reschedule.verify_slot_membership
    );
    println!(
        "  reconcile_on_startup    {}",
        settings.reschedule.reconcile_on_startup
    );
}

fn print_failure(err: &ConfigError) {
    eprintln!("Configuration invalid");
    match err {
        ConfigError::ValidationFailed { errors } => {
            for e in errors {
                eprintln!("  - {e}");
            }
        }
        ConfigError::UnsupportedVersion(found) => {
            eprintln!("  config_version is {found}, this build reads {CURRENT_CONFIG_VERSION}");
        }
        other => eprintln!("  {other}"),
    }
}

fn main() -> ExitCode {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    if !path.exists() {
        eprintln!("No configuration file at {}", path.display());
        eprintln!("Usage: validate-config [config-file]");
        return ExitCode::from(2);
    }

    match load_config(&path) {
        Ok(settings) => {
            print_settings(&settings);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_failure(&e);
            ExitCode::from(1)
        }
    }
}
