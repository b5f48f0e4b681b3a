use crate::maintenance::{
    import_forms, import_licenses, list_expiring, remove_agent, remove_forms, show_agent,
    sweep_expired, AgentArgs, ImportArgs, RemoveFormsArgs, StoreArgs, SweepArgs, TodayArgs,
};
use crate::server;
use agent_map::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Agent Map",
    about = "Serve and maintain the agent license map and carrier form catalog",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect and sweep agent licenses
    Licenses {
        #[command(subcommand)]
        command: LicensesCommand,
    },
    /// Agent administration
    Agents {
        #[command(subcommand)]
        command: AgentsCommand,
    },
    /// Form catalog administration
    Forms {
        #[command(subcommand)]
        command: FormsCommand,
    },
    /// Load extracted rows from CSV files
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },
}

#[derive(Subcommand, Debug)]
enum LicensesCommand {
    /// Print notices for licenses expiring within the next 31 days
    Expiring(TodayArgs),
    /// Delete licenses that expired before today and print the notices
    Sweep(SweepArgs),
}

#[derive(Subcommand, Debug)]
enum AgentsCommand {
    /// Print the licensed states of an agent
    Show(AgentArgs),
    /// Delete every license of a departing agent
    Remove(AgentArgs),
}

#[derive(Subcommand, Debug)]
enum FormsCommand {
    /// Delete every form of the given company codes
    Remove(RemoveFormsArgs),
}

#[derive(Subcommand, Debug)]
enum ImportCommand {
    /// Import form rows (company,full_company,state,form_type,full_form_type,date,file_path)
    Forms(ImportArgs),
    /// Import license rows (agent_id,username,state,license_number,expiration,color)
    Licenses(ImportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured SQLite database path
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

impl ServeArgs {
    pub(crate) fn store(&self) -> StoreArgs {
        StoreArgs {
            database: self.database.clone(),
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Licenses {
            command: LicensesCommand::Expiring(args),
        } => list_expiring(args),
        Command::Licenses {
            command: LicensesCommand::Sweep(args),
        } => sweep_expired(args),
        Command::Agents {
            command: AgentsCommand::Show(args),
        } => show_agent(args),
        Command::Agents {
            command: AgentsCommand::Remove(args),
        } => remove_agent(args),
        Command::Forms {
            command: FormsCommand::Remove(args),
        } => remove_forms(args),
        Command::Import {
            command: ImportCommand::Forms(args),
        } => import_forms(args),
        Command::Import {
            command: ImportCommand::Licenses(args),
        } => import_licenses(args),
    }
}
