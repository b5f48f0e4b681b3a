use crate::infra::{document_gate, open_store, parse_date};
use agent_map::config::AppConfig;
use agent_map::error::AppError;
use agent_map::licensing::import::{import_forms_from_path, import_licenses_from_path};
use agent_map::licensing::{
    expired_notices, expiring_notices, AgentId, ExpirationNotice, ImportSummary,
    LicenseRepository, LicensedState, LookupService, SqliteStore,
};
use agent_map::telemetry;
use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct StoreArgs {
    /// Override the configured SQLite database path
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct TodayArgs {
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SweepArgs {
    #[command(flatten)]
    pub(crate) when: TodayArgs,
    /// Print what would be deleted without deleting anything
    #[arg(long)]
    pub(crate) dry_run: bool,
}

#[derive(Args, Debug)]
pub(crate) struct AgentArgs {
    /// Agent identifier
    pub(crate) agent_id: String,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

#[derive(Args, Debug)]
pub(crate) struct RemoveFormsArgs {
    /// Company codes whose forms are deleted (e.g. MOO ACE)
    #[arg(required = true)]
    pub(crate) companies: Vec<String>,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV file with a header row
    pub(crate) path: PathBuf,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

fn prepare(store: &StoreArgs) -> Result<(AppConfig, Arc<SqliteStore>), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let store = open_store(&config, store.database.clone())?;
    Ok((config, store))
}

fn today_or_local(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

pub(crate) fn list_expiring(args: TodayArgs) -> Result<(), AppError> {
    let (_, store) = prepare(&args.store)?;
    let today = today_or_local(args.today);
    let notices = expiring_notices(&*store, today)?;
    info!(%today, agents = notices.len(), "expiring license notices computed");
    print!("{}", render_notices(&notices));
    Ok(())
}

pub(crate) fn sweep_expired(args: SweepArgs) -> Result<(), AppError> {
    let (_, store) = prepare(&args.when.store)?;
    let today = today_or_local(args.when.today);
    let (notices, deleted) = sweep(&store, today, args.dry_run)?;
    info!(%today, deleted, dry_run = args.dry_run, "expired license sweep finished");
    print!("{}", render_notices(&notices));
    Ok(())
}

pub(crate) fn show_agent(args: AgentArgs) -> Result<(), AppError> {
    let (config, store) = prepare(&args.store)?;
    let service = LookupService::new(store.clone(), store, document_gate(&config));
    let licenses = service.licensed_states(&AgentId(args.agent_id))?;
    print!("{}", render_licenses(&licenses));
    Ok(())
}

pub(crate) fn remove_agent(args: AgentArgs) -> Result<(), AppError> {
    let (_, store) = prepare(&args.store)?;
    let agent = AgentId(args.agent_id);
    let deleted = remove_agent_licenses(&store, &agent)?;
    println!("Deleted {deleted} license(s) for agent {agent}");
    Ok(())
}

pub(crate) fn remove_forms(args: RemoveFormsArgs) -> Result<(), AppError> {
    let (_, store) = prepare(&args.store)?;
    for company in &args.companies {
        let deleted = store.delete_company_forms(company)?;
        info!(company = %company, deleted, "company forms removed");
        println!("Deleted {deleted} form(s) for {company}");
    }
    Ok(())
}

pub(crate) fn import_forms(args: ImportArgs) -> Result<(), AppError> {
    let (_, store) = prepare(&args.store)?;
    let summary = import_forms_from_path(&store, &args.path)?;
    print!("{}", render_summary("form", &summary));
    Ok(())
}

pub(crate) fn import_licenses(args: ImportArgs) -> Result<(), AppError> {
    let (_, store) = prepare(&args.store)?;
    let summary = import_licenses_from_path(&store, &args.path)?;
    print!("{}", render_summary("license", &summary));
    Ok(())
}

/// Returns the expired notices and how many rows were deleted (zero on a dry run).
pub(crate) fn sweep(
    store: &SqliteStore,
    today: NaiveDate,
    dry_run: bool,
) -> Result<(Vec<ExpirationNotice>, usize), AppError> {
    let notices = expired_notices(store, today)?;
    if dry_run {
        return Ok((notices, 0));
    }

    let ids: Vec<_> = notices
        .iter()
        .flat_map(|notice| notice.licenses.iter().map(|license| license.id))
        .collect();
    let deleted = store.delete_licenses(&ids)?;
    Ok((notices, deleted))
}

pub(crate) fn remove_agent_licenses(
    store: &SqliteStore,
    agent: &AgentId,
) -> Result<usize, AppError> {
    if store.agent(agent)?.is_none() {
        return Err(AppError::NotFound(format!("agent {agent}")));
    }
    let deleted = store.delete_agent_licenses(agent)?;
    info!(agent = %agent, deleted, "agent licenses removed");
    Ok(deleted)
}

pub(crate) fn render_notices(notices: &[ExpirationNotice]) -> String {
    if notices.is_empty() {
        return "No licenses matched.\n".to_string();
    }

    let mut output = String::new();
    for notice in notices {
        output.push_str(&format!(
            "To: {} ({})\nSubject: {}\n{}\n",
            notice.agent.username,
            notice.agent.id,
            notice.subject(),
            notice.body()
        ));
    }
    output
}

fn render_licenses(licenses: &[LicensedState]) -> String {
    if licenses.is_empty() {
        return "No licensed states.\n".to_string();
    }

    let mut output = String::new();
    for license in licenses {
        output.push_str(&format!(
            "{:<3} {:<16} {} {}\n",
            license.state.as_str(),
            license.license_number,
            license.expiration.format("%m/%d/%Y"),
            license.color
        ));
    }
    output
}

fn render_summary(kind: &str, summary: &ImportSummary) -> String {
    format!(
        "Imported {} {kind} row(s), skipped {} already present\n",
        summary.inserted, summary.skipped
    )
}
