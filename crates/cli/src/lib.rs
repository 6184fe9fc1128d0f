pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use printguard_core::config::{ConfigOverrides, LogFormat};
use rust_decimal::Decimal;

use crate::commands::check_spec::CheckSpecArgs;
use crate::commands::preflight::PreflightArgs;
use crate::commands::price::PriceArgs;
use crate::commands::process::ProcessArgs;
use crate::commands::{CommandResult, RuntimeOptions};

#[derive(Debug, Parser)]
#[command(
    name = "printguard",
    about = "PrintGuard order guardrail CLI",
    long_about = "Run print orders through spec checks, artwork preflight, and quote grounding.",
    after_help = "Examples:\n  printguard process \"500 business cards on 100lb cardstock, white matte\"\n  printguard check-spec --paper-stock 100lb_cardstock --color black --finish matte --full-color\n  printguard config"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Config file (defaults to ./printguard.toml)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level: trace, debug, info, warn, error")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Log format: compact, pretty, json")]
    log_format: Option<LogFormat>,
    #[arg(long, global = true, help = "Minimum effective DPI for artwork")]
    min_dpi: Option<Decimal>,
    #[arg(long, global = true, help = "Reject orders without an artwork file")]
    require_artwork: Option<bool>,
    #[arg(long, global = true, help = "Agent turn limit (1-10)")]
    max_turns: Option<u32>,
    #[arg(long, global = true, help = "Per-tool-call timeout in milliseconds")]
    tool_timeout_ms: Option<u64>,
}

impl GlobalArgs {
    fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            config_path: self.config.clone(),
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                min_dpi: self.min_dpi,
                require_artwork: self.require_artwork,
                max_turns: self.max_turns,
                tool_timeout_ms: self.tool_timeout_ms,
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run a natural-language order through all three guardrail layers")]
    Process {
        #[arg(help = "The customer's order request")]
        query: String,
        #[arg(long, help = "Artwork file path")]
        file: Option<String>,
        #[arg(long, help = "JSON file with explicit order fields")]
        order_json: Option<PathBuf>,
    },
    #[command(about = "Validate a material combination against the material rules")]
    CheckSpec {
        #[arg(long)]
        paper_stock: String,
        #[arg(long)]
        color: String,
        #[arg(long)]
        finish: String,
        #[arg(long)]
        full_color: bool,
        #[arg(long, help = "Override the catalog's dark-paper classification")]
        dark_paper: Option<bool>,
    },
    #[command(about = "Compute an authoritative price without the agent")]
    Price {
        #[arg(long)]
        paper_stock: String,
        #[arg(long)]
        quantity: i64,
        #[arg(long)]
        width: Decimal,
        #[arg(long)]
        height: Decimal,
        #[arg(long)]
        full_color: bool,
        #[arg(long, help = "rush_48h, rush_24h or same_day")]
        rush: Option<String>,
    },
    #[command(about = "Check artwork resolution at a print size")]
    Preflight {
        file: String,
        #[arg(long)]
        width: Decimal,
        #[arg(long)]
        height: Decimal,
    },
    #[command(about = "Report tool capabilities and enforced limits")]
    Status,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.runtime_options();
    logging::init(&options);

    let result = dispatch(&options, cli.command);
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn dispatch(options: &RuntimeOptions, command: Command) -> CommandResult {
    match command {
        Command::Process { query, file, order_json } => {
            commands::process::run(options, ProcessArgs { query, file, order_json })
        }
        Command::CheckSpec { paper_stock, color, finish, full_color, dark_paper } => {
            commands::check_spec::run(
                options,
                CheckSpecArgs { paper_stock, color, finish, full_color, dark_paper },
            )
        }
        Command::Price { paper_stock, quantity, width, height, full_color, rush } => {
            commands::price::run(
                options,
                PriceArgs {
                    paper_stock,
                    quantity,
                    width_inches: width,
                    height_inches: height,
                    full_color,
                    rush_type: rush,
                },
            )
        }
        Command::Preflight { file, width, height } => commands::preflight::run(
            options,
            PreflightArgs { file, width_inches: width, height_inches: height },
        ),
        Command::Status => commands::status::run(options),
        Command::Config => commands::config::run(options),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn global_flags_become_config_overrides() {
        let cli = Cli::try_parse_from([
            "printguard",
            "status",
            "--min-dpi",
            "150",
            "--max-turns",
            "4",
            "--log-format",
            "json",
        ])
        .expect("cli parses");

        let options = cli.global.runtime_options();
        assert_eq!(options.overrides.min_dpi.map(|dpi| dpi.to_string()), Some("150".to_string()));
        assert_eq!(options.overrides.max_turns, Some(4));
        assert!(options.overrides.log_format.is_some());
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn price_requires_dimensions() {
        let parsed = Cli::try_parse_from([
            "printguard",
            "price",
            "--paper-stock",
            "100lb_cardstock",
            "--quantity",
            "500",
        ]);
        assert!(parsed.is_err());
    }
}
