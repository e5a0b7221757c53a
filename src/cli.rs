//! Argument handling shared by the command-line tools

use crate::config::{Config, RenderOptions};
use crate::error::Result;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub filename: Option<String>,
    pub config: Option<PathBuf>,
    /// `Some` when `--color` or `--no-color` was given
    pub color: Option<bool>,
    pub no_movement: bool,
    pub help: bool,
}

/// Parse everything after the program name
pub fn parse_args(args: &[String]) -> std::result::Result<CliArgs, String> {
    let mut parsed = CliArgs::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args
                    .get(i)
                    .ok_or_else(|| "--config needs a path".to_string())?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--color" => parsed.color = Some(true),
            "--no-color" => parsed.color = Some(false),
            "--no-movement" => parsed.no_movement = true,
            "-h" | "--help" => parsed.help = true,
            arg if !arg.starts_with('-') => {
                if parsed.filename.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                parsed.filename = Some(arg.to_string());
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
        i += 1;
    }

    Ok(parsed)
}

/// Load the config file (if any) and apply command-line overrides.
///
/// `is_tty` decides color when neither the file nor the flags do.
pub fn resolve_config(args: &CliArgs, is_tty: bool) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config {
            render: RenderOptions {
                color: is_tty,
                ..Default::default()
            },
            ..Default::default()
        },
    };

    if let Some(color) = args.color {
        config.render.color = color;
    }
    if args.no_movement {
        config.render.show_movement = false;
    }
    Ok(config)
}

pub fn print_usage(program: &str) {
    eprintln!("Usage: {} [options] <filename>", program);
    eprintln!("\nOptions:");
    eprintln!("  --config <path>  Read listing options from a TOML file");
    eprintln!("  --color          Force colored output");
    eprintln!("  --no-color       Disable colored output");
    eprintln!("  --no-movement    Skip the movement data after the code");
    eprintln!("  -h, --help       Show this help message");
}
