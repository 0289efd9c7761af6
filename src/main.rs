use std::process::ExitCode;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;

use weekly_review::commands::report::{self, OutputFormat, ReportRequest};
use weekly_review::error::ConfigError;
use weekly_review::utils::config::{self, Config};
use weekly_review::utils::dates::Week;

const EXIT_INTERRUPTED: u8 = 130;

/// Weekly digest of Bitrix24 tasks, meetings, logged time and local git work.
#[derive(Parser, Debug)]
#[command(name = "weekly-review", version, about)]
struct Cli {
    /// Week to report on (Monday to Sunday).
    #[arg(long, value_enum, default_value_t = Week::Current, conflicts_with_all = ["from", "to"])]
    week: Week,

    /// First day of a custom range (YYYY-MM-DD).
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Last day of a custom range, inclusive (YYYY-MM-DD).
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// Verbose logging to stderr.
    #[arg(long)]
    debug: bool,

    /// Collect and summarize recent chats.
    #[arg(long)]
    chats: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,
}

fn init_logging(debug: bool) {
    let level = if debug { "weekly_review=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// `.env` is read before the logger so a `RUST_LOG` kept there applies.
fn init_environment(debug: bool) {
    config::load_dotenv();
    init_logging(debug);
}

async fn run(cli: &Cli, config: &Config) -> anyhow::Result<String> {
    let window = report::resolve_window(cli.week, cli.from, cli.to, Local::now().date_naive())
        .context("cannot determine the report window")?;
    let request = ReportRequest {
        window,
        include_chats: cli.chats,
        format: cli.format,
    };
    report::run_report(config, &request)
        .await
        .context("weekly review failed")
}

fn report_config_error(err: &ConfigError) {
    eprintln!("Error: {}", err);
    eprintln!("{}", err.hint());
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_environment(cli.debug);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            report_config_error(&e);
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        result = run(&cli, &config) => match result {
            Ok(output) => {
                println!("{}", output);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}
