//! Handler for the `check-config` command: parse and validate the config
//! file, then report what it resolved to without starting anything.

use std::path::Path;

use super::diagnostic::ConfigError;
use super::output;
use crate::app::config::Config;
use crate::error::{Error, Result};

pub fn check_config(config_path: &Path) -> Result<()> {
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(err) => {
            render_parse_error(config_path, &err);
            return Err(err);
        }
    };

    output::success(&format!("config ok: {}", config_path.display()));
    output::field("dry_run", config.dry_run);
    output::field("polymarket environment", &config.polymarket.environment);
    output::field("clob url", &config.polymarket.clob_url);
    output::field("wallet configured", config.polymarket.private_key.is_some());
    output::field("ladder sizes", format!("{:?}", config.ladder.ladder_sizes));
    output::field("max concurrent games", config.ladder.max_concurrent_games);
    output::field("max cycles per game", config.ladder.max_cycles_per_game);
    output::field("snapshot path", &config.persistence.snapshot_path);

    Ok(())
}

/// If the failure came from the TOML parser, re-parse the raw file to get a
/// span and render a source-annotated diagnostic. Anything else (missing
/// file, failed validation) is left to the plain `Display` of `Error`.
fn render_parse_error(config_path: &Path, err: &Error) {
    let Ok(src) = std::fs::read_to_string(config_path) else {
        output::error(&err.to_string());
        return;
    };
    match toml::from_str::<toml::Value>(&src) {
        Err(parse_err) => {
            let diagnostic = ConfigError::from_toml_error(&src, &parse_err);
            eprintln!("{:?}", miette::Report::new(diagnostic));
        }
        Ok(_) => output::error(&err.to_string()),
    }
}
