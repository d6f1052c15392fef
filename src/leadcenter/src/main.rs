//! Lead Center: ad performance, weekly reporting and lead sheet tooling.
//!
//! Every subcommand reads JSON files and prints JSON to stdout. Logs go to
//! stderr.

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use leadcenter_ads::creative::media_type_label;
use leadcenter_ads::{rank_ads, AdPerformance, MetricKey, ScoreBand};
use leadcenter_core::config::AppConfig;
use leadcenter_core::format::format_value;
use leadcenter_core::schema::ReportingSchema;
use leadcenter_core::types::{PeriodType, RawReportingRecord, WeeklyTarget};
use leadcenter_leads::{
    FilterOptions, Lead, NewLeadForm, PaginationInfo, ScoreTier, StatusCounts,
};
use leadcenter_reporting::{
    CalculationGraph, FormulaTable, InMemoryReportingStore, InMemoryTargetStore, PageMode,
    PeriodEditLock, ReportingSession,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "leadcenter")]
#[command(about = "Ad performance, weekly reporting and lead sheet tooling")]
#[command(version)]
struct Cli {
    /// Config file (TOML). Defaults to ./leadcenter.toml when present.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Client whose reporting records are read and written (overrides config)
    #[arg(long, global = true, env = "LEADCENTER__OWNER_ID")]
    owner_id: Option<String>,

    /// Lock weeks that ended more than this many weeks ago (overrides config)
    #[arg(long, global = true, env = "LEADCENTER__REPORTING__LOCK_AFTER_WEEKS")]
    lock_after_weeks: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive rate and cost metrics for a list of ads
    Metrics {
        #[arg(long)]
        input: PathBuf,
        /// Rank ads best-first by this metric, e.g. conversion-rate or cost-per-lead
        #[arg(long)]
        sort_by: Option<MetricKey>,
    },
    /// Aggregate the reporting records of a window and calculate derived fields
    Aggregate {
        #[arg(long)]
        records: PathBuf,
        #[arg(long, default_value = "weekly")]
        period: PeriodType,
        /// Any date inside the window (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        targets: Option<PathBuf>,
    },
    /// Edit input fields of one week and save it back to the records file
    Save {
        #[arg(long)]
        records: PathBuf,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        targets: Option<PathBuf>,
        /// Field assignment, e.g. --set adSpend=1200
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },
    /// Print the active field schema
    Schema,
    /// Summarize a lead sheet: status counts, filter options and one page of leads
    Leads {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 25)]
        page_size: u64,
    },
    /// Validate a manual lead entry form and print the create-lead payload
    NewLead {
        #[arg(long)]
        form: PathBuf,
        #[arg(long, env = "LEADCENTER__CLIENT_ID")]
        client_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let (mut config, load_error) = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) if cli.config.is_some() => {
            return Err(e).context("failed to load config file");
        }
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Apply CLI overrides
    if let Some(owner_id) = cli.owner_id {
        config.owner_id = owner_id;
    }
    if let Some(weeks) = cli.lock_after_weeks {
        config.reporting.lock_after_weeks = Some(weeks);
    }

    init_tracing(&config);
    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    info!(
        owner_id = %config.owner_id,
        lock_future_weeks = config.reporting.lock_future_weeks,
        lock_after_weeks = ?config.reporting.lock_after_weeks,
        "Configuration loaded"
    );

    let output = match cli.command {
        Command::Metrics { input, sort_by } => metrics(&input, sort_by)?,
        Command::Aggregate {
            records,
            period,
            date,
            targets,
        } => aggregate(&config, &records, period, date, targets.as_deref()).await?,
        Command::Save {
            records,
            date,
            targets,
            set,
        } => save(&config, &records, date, targets.as_deref(), &set).await?,
        Command::Schema => serde_json::to_value(load_schema(&config)?)?,
        Command::Leads {
            input,
            page,
            page_size,
        } => leads(&input, page, page_size)?,
        Command::NewLead { form, client_id } => {
            let form: NewLeadForm = read_json(&form)?;
            serde_json::to_value(form.into_payload(client_id.as_deref())?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log.filter.as_str().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

// ---------------------------------------------------------------------------
// Ads
// ---------------------------------------------------------------------------

fn metrics(input: &Path, sort_by: Option<MetricKey>) -> anyhow::Result<serde_json::Value> {
    let ads: Vec<AdPerformance> = read_json(input)?;
    let rows: Vec<_> = match sort_by {
        Some(key) => rank_ads(&ads, key),
        None => ads.iter().map(|ad| (ad, ad.metrics())).collect(),
    };

    let rows: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|(ad, metrics)| {
            // Bands only make sense for rates.
            let band = sort_by
                .filter(MetricKey::higher_is_better)
                .and_then(|key| metrics.get(key))
                .map(ScoreBand::for_score);
            json!({
                "adName": ad.display_name(),
                "adSetName": ad.ad_set_name,
                "campaignName": ad.campaign_name,
                "mediaType": media_type_label(ad.creative.as_ref()),
                "metrics": metrics.rounded(),
                "scoreBand": band,
            })
        })
        .collect();

    info!(ads = rows.len(), sort_by = ?sort_by, "Derived ad metrics");
    Ok(serde_json::Value::Array(rows))
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

fn load_schema(config: &AppConfig) -> anyhow::Result<ReportingSchema> {
    match &config.reporting.schema_path {
        Some(path) => ReportingSchema::from_json_file(path)
            .with_context(|| format!("failed to load field schema from {path}")),
        None => Ok(ReportingSchema::default()),
    }
}

fn load_graph(config: &AppConfig, schema: &ReportingSchema) -> anyhow::Result<FormulaTable> {
    let table = match &config.reporting.formulas_path {
        Some(path) => FormulaTable::from_json_file(path)
            .with_context(|| format!("failed to load formula table from {path}"))?,
        None => FormulaTable::default(),
    };
    table.check_against(schema)?;
    Ok(table)
}

async fn open_session(
    config: &AppConfig,
    records: &Path,
    targets: Option<&Path>,
    date: NaiveDate,
    period: PeriodType,
) -> anyhow::Result<(ReportingSession, Arc<InMemoryReportingStore>)> {
    let schema = load_schema(config)?;
    let graph: Arc<dyn CalculationGraph> = Arc::new(load_graph(config, &schema)?);

    let records: Vec<RawReportingRecord> = if records.exists() {
        read_json(records)?
    } else {
        warn!(path = %records.display(), "Records file not found, starting empty");
        Vec::new()
    };
    let store = Arc::new(InMemoryReportingStore::from_records(&config.owner_id, records));

    let targets: Vec<WeeklyTarget> = match targets {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let target_store = Arc::new(InMemoryTargetStore::from_targets(&config.owner_id, targets));

    let mut session = ReportingSession::new(
        config.owner_id.clone(),
        store.clone(),
        target_store,
        date,
    )
    .with_schema(Arc::new(schema))
    .with_graph(graph)
    .with_edit_lock(Arc::new(PeriodEditLock::from_config(&config.reporting)))
    .with_mode(PageMode::AddActualData);

    session.select(date, period);
    session.refresh().await?;
    Ok((session, store))
}

fn session_report(session: &ReportingSession) -> serde_json::Value {
    let window = session.window();
    let display = session.display_values();
    let formatted: serde_json::Map<String, serde_json::Value> = session
        .schema()
        .fields()
        .map(|field| {
            let value = display.get(&field.value).copied();
            (
                field.value.clone(),
                json!(format_value(field.format, value)),
            )
        })
        .collect();

    json!({
        "window": {
            "startDate": window.start_date,
            "endDate": window.end_date,
            "periodType": window.period_type,
            "label": window.label(),
        },
        "records": session.records().len(),
        "isExistingData": session.is_existing_data(),
        "targets": session.targets(),
        "fieldValues": session.field_values(),
        "calculatedValues": session.calculated_values(),
        "formatted": formatted,
        "highlighted": session.highlighted_fields(),
        "editLock": session.edit_lock_status(),
    })
}

async fn aggregate(
    config: &AppConfig,
    records: &Path,
    period: PeriodType,
    date: NaiveDate,
    targets: Option<&Path>,
) -> anyhow::Result<serde_json::Value> {
    let (session, _) = open_session(config, records, targets, date, period).await?;
    Ok(session_report(&session))
}

fn parse_assignment(raw: &str) -> anyhow::Result<(&str, Option<f64>)> {
    let Some((field, value)) = raw.split_once('=') else {
        bail!("expected FIELD=VALUE, got '{raw}'");
    };
    let (field, value) = (field.trim(), value.trim());
    if field.is_empty() {
        bail!("missing field name in '{raw}'");
    }
    let parsed = value.parse::<f64>().ok();
    if parsed.is_none() {
        warn!(field, value, "Value is not a number, storing 0");
    }
    Ok((field, parsed))
}

async fn save(
    config: &AppConfig,
    records_path: &Path,
    date: NaiveDate,
    targets: Option<&Path>,
    assignments: &[String],
) -> anyhow::Result<serde_json::Value> {
    let (mut session, store) =
        open_session(config, records_path, targets, date, PeriodType::Weekly).await?;

    for raw in assignments {
        let (field, value) = parse_assignment(raw)?;
        session
            .handle_input_change(field, value)
            .with_context(|| format!("cannot set '{field}'"))?;
    }

    let saved = session.save().await.context("failed to save reporting data")?;

    let snapshot = store.snapshot(&config.owner_id);
    std::fs::write(records_path, serde_json::to_string_pretty(&snapshot)?)
        .with_context(|| format!("failed to write {}", records_path.display()))?;
    info!(
        path = %records_path.display(),
        records = snapshot.len(),
        "Wrote reporting records"
    );

    Ok(json!({
        "saved": saved,
        "report": session_report(&session),
    }))
}

// ---------------------------------------------------------------------------
// Leads
// ---------------------------------------------------------------------------

fn leads(input: &Path, page: u64, page_size: u64) -> anyhow::Result<serde_json::Value> {
    let leads: Vec<Lead> = read_json(input)?;
    let counts = StatusCounts::from_leads(&leads);
    let pagination = PaginationInfo::new(page, page_size, leads.len() as u64);

    let rows: Vec<serde_json::Value> = leads[pagination.range()]
        .iter()
        .map(|lead| {
            let score = lead.quality_score();
            json!({
                "lead": lead,
                "statusLabel": lead.status.label(),
                "qualityScore": score,
                "qualityTier": ScoreTier::for_score(score),
            })
        })
        .collect();

    Ok(json!({
        "statusCounts": counts,
        "estimateSetRate": counts.estimate_set_rate(),
        "filterOptions": FilterOptions::from_leads(&leads),
        "pagination": pagination,
        "leads": rows,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("adSpend=1200").unwrap(), ("adSpend", Some(1200.0)));
        assert_eq!(parse_assignment(" leads = 4 ").unwrap(), ("leads", Some(4.0)));
        assert_eq!(parse_assignment("revenue=abc").unwrap(), ("revenue", None));
        assert!(parse_assignment("adSpend").is_err());
        assert!(parse_assignment("=5").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "leadcenter",
            "aggregate",
            "--records",
            "records.json",
            "--period",
            "monthly",
            "--date",
            "2024-03-06",
        ])
        .unwrap();
        match cli.command {
            Command::Aggregate { period, date, .. } => {
                assert_eq!(period, PeriodType::Monthly);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "leadcenter",
            "metrics",
            "--input",
            "ads.json",
            "--sort-by",
            "cost-per-lead",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Metrics {
                sort_by: Some(MetricKey::CostPerLead),
                ..
            }
        ));

        assert!(Cli::try_parse_from(["leadcenter", "save", "--records", "r.json", "--date", "2024-03-06"]).is_err());
    }
}
