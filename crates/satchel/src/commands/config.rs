//! Config command - configuration inspection.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;
use serde::Serialize;

use satchel_config::{LoggingSection, SatchelConfig, SessionSection};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration, with defaults filled in
    Show,

    /// Show which config files are checked and their precedence
    Which,

    /// Show the user configuration file path
    Path,
}

/// Resolved config for JSON output.
#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    sources: Vec<String>,
    warnings: &'a [String],
    config: SatchelConfig,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

/// The merged config with every section present.
fn resolved(config: &SatchelConfig) -> SatchelConfig {
    SatchelConfig {
        session: Some(config.session.clone().unwrap_or_else(SessionSection::default)),
        logging: Some(config.logging.clone().unwrap_or_else(LoggingSection::default)),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = resolved(&ctx.config);
    let sources: Vec<String> = ctx
        .loaded
        .loaded_from()
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    if ctx.json_output {
        let output = ShowOutput {
            sources,
            warnings: &ctx.loaded.warnings,
            config,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("# Satchel Configuration\n");
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)\n");
    } else {
        for source in &sources {
            println!("# from {}", source);
        }
        println!();
    }
    for warning in &ctx.loaded.warnings {
        println!("# warning: {}", warning);
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let green = Style::new().green();
    let dim = Style::new().dim();

    println!("Config files (lowest precedence first):");
    for source in &ctx.loaded.sources {
        let status = if source.loaded {
            green.apply_to("loaded")
        } else {
            dim.apply_to("not found")
        };
        println!("  {} ({})", source.path.display(), status);
    }
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let path = match &ctx.config_dir {
        Some(dir) => Some(dir.join("config.toml")),
        None => satchel_config::xdg_config_path(),
    };
    match path {
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("could not determine the user config directory"),
    }
    Ok(())
}
