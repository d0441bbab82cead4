use std::env;

use anyhow::Context;
use chrono::{Local, NaiveDate};

use plazo::schedule::{ReceptionResolver, StatusInfo};
use plazo::storage::{Config, EventCache};

#[derive(Clone, Copy)]
pub enum CliMode {
    Check { doc_date: NaiveDate, reference_date: Option<NaiveDate> },
    Help,
}

pub const USAGE: &str = "Usage: plazo --check YYYY-MM-DD [--reference YYYY-MM-DD]";

pub fn parse_cli_mode() -> Result<CliMode, String> {
    let mut doc_date = None;
    let mut reference_date = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--check" => {
                let date_str = args
                    .next()
                    .ok_or_else(|| "--check requires a date".to_string())?;
                doc_date = Some(parse_date(&date_str)?);
            }
            "--reference" => {
                let date_str = args
                    .next()
                    .ok_or_else(|| "--reference requires a date".to_string())?;
                reference_date = Some(parse_date(&date_str)?);
            }
            "--help" => return Ok(CliMode::Help),
            _ => return Err(format!("Unknown argument: {}", arg)),
        }
    }

    match doc_date {
        Some(doc_date) => Ok(CliMode::Check { doc_date, reference_date }),
        None => Ok(CliMode::Help),
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD.", date_str))
}

/// Classifies one document date against the locally stored special dates and
/// prints the verdict.
pub fn run_check_mode(
    doc_date: NaiveDate,
    reference_date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let config = Config::load_or_create().context("failed to load configuration")?;
    let cache = EventCache::open(&config.storage.cache_path)
        .context("failed to open the local cache")?;
    let special_dates = cache
        .load_special_dates()
        .context("failed to load holidays and emergency days")?;

    let reference_date = reference_date.unwrap_or_else(|| Local::now().date_naive());
    let resolver = ReceptionResolver::new(&special_dates);
    let info = resolver.resolve(doc_date, reference_date);

    print!("{}", format_status_report(doc_date, reference_date, &info));
    Ok(())
}

fn format_status_report(
    doc_date: NaiveDate,
    reference_date: NaiveDate,
    info: &StatusInfo,
) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Document date:         {}", doc_date));
    lines.push(format!("Reference date:        {}", reference_date));
    lines.push(format!("Status:                {}", info.status));
    lines.push(format!("Cutoff date:           {}", info.cutoff_date));
    lines.push(format!("Business days elapsed: {}", info.business_days_elapsed));
    if let Some(extension) = &info.emergency_extension {
        lines.push(format!(
            "Extended deadline:     {} (emergency on {})",
            extension.extended_deadline, extension.emergency_date
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}
