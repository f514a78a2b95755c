use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use deal_margin_report::clients::{
    CurrencyApiClient, GoogleSheetsClient, HubSpotClient, ServiceAccountAuth,
};
use deal_margin_report::{
    format_period_cell, read_secret, FileCounterStore, MarginReporter, ReportConfig,
};
use dotenv::dotenv;
use log::info;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "margin-report", version, about = "CRM deal margin reports into Google Sheets")]
struct Cli {
    /// JSON run configuration
    #[arg(short, long, env = "MARGIN_REPORT_CONFIG", default_value = "margin-report.json")]
    config: PathBuf,

    /// Report as of this date (YYYY-MM-DD) instead of today
    #[arg(long)]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quarter and financial-year margins per stage category
    Period,
    /// Append today's all-time pipeline margin as a new row
    Daily,
    /// Print the JSON Schema of the configuration file
    Schema,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn requested_properties(config: &ReportConfig) -> Vec<String> {
    let mut properties = config.crm.properties.requested();
    if let Some(daily) = &config.daily {
        for property in daily.properties.requested() {
            if !properties.contains(&property) {
                properties.push(property);
            }
        }
    }
    properties
}

async fn run_period(config: &ReportConfig, today: NaiveDate) -> Result<()> {
    let (hubspot, currency, spreadsheet) = connect(config).await?;
    let reporter = MarginReporter::new(config, &hubspot, &currency);

    let matrix = reporter.period_report(today, &spreadsheet).await?;
    for result in &matrix.results {
        info!("{}: {}", result.label, format_period_cell(result));
    }
    println!(
        "Period report for {} written to '{}'",
        today, config.sheet.period_worksheet
    );
    Ok(())
}

async fn run_daily(config: &ReportConfig, today: NaiveDate) -> Result<()> {
    let daily = config
        .daily
        .as_ref()
        .context("the daily report needs a 'daily' section in the configuration")?;
    let (hubspot, currency, spreadsheet) = connect(config).await?;
    let reporter = MarginReporter::new(config, &hubspot, &currency);
    let sheet = spreadsheet.worksheet(&config.sheet.daily_worksheet);
    let counter = FileCounterStore::new(&daily.counter_path);

    let outcome = reporter.daily_report(today, &sheet, &counter).await?;
    println!(
        "Daily report for {} written to '{}' row {}",
        today, config.sheet.daily_worksheet, outcome.row
    );
    Ok(())
}

async fn connect(
    config: &ReportConfig,
) -> Result<(HubSpotClient, CurrencyApiClient, GoogleSheetsClient)> {
    let hubspot = HubSpotClient::new(
        read_secret(&config.crm.access_token_env)?,
        requested_properties(config),
    )
    .with_base_url(&config.crm.base_url);
    let currency = CurrencyApiClient::new(read_secret(&config.currency.api_key_env)?)
        .with_base_url(&config.currency.base_url);

    let access_token = ServiceAccountAuth::from_key_file(&config.sheet.credentials_path)
        .await?
        .access_token()
        .await
        .context("authenticating with Google Sheets")?;
    let spreadsheet = GoogleSheetsClient::new(
        access_token,
        config.sheet.spreadsheet_id.clone(),
        config.sheet.period_worksheet.clone(),
    );

    Ok((hubspot, currency, spreadsheet))
}

fn load_config(path: &Path) -> Result<ReportConfig> {
    ReportConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logging();
    let cli = Cli::parse();
    let today = cli.date.unwrap_or_else(|| Local::now().date_naive());

    match cli.command {
        Command::Schema => println!("{}", ReportConfig::schema_as_json()?),
        Command::Period => run_period(&load_config(&cli.config)?, today).await?,
        Command::Daily => run_daily(&load_config(&cli.config)?, today).await?,
    }

    Ok(())
}
