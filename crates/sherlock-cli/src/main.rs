//! Sherlock: command-line console for the edge-management backend.
//! Entry point for the `sherlock` binary.

mod output;

use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use sherlock_client::{ApiClient, FileSessionStore, Resource, Session, RESOURCE_NAMES};
use sherlock_common::entities::{
    log_batches, Application, Category, DataSource, DataStream, Edge, LogEntry, Project,
    SoftwareUpdateKind, User,
};
use sherlock_common::{CategoryInfo, SherlockError};
use sherlock_config::Config;
use sherlock_console::{poll_until, Fetcher, ListView, SortOrder, TableState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::output::Printable;

#[derive(Parser)]
#[command(name = "sherlock", version, about = "Manage Sherlock edges, data sources and projects")]
struct Cli {
    /// Override the API base URL from the config file.
    #[arg(long, env = "SHERLOCK_API_URL", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password, or exchange an SSO code.
    Login {
        #[arg(long, required_unless_present = "code")]
        email: Option<String>,
        /// SSO authorization code.
        #[arg(long, conflicts_with = "email")]
        code: Option<String>,
        /// Do not cache credentials for silent re-login.
        #[arg(long)]
        no_remember: bool,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List a resource collection.
    List {
        resource: String,
        /// Column to sort by, e.g. NAME.
        #[arg(long)]
        sort: Option<String>,
        #[arg(long, default_value = "ascend")]
        order: String,
        /// Restrict to one project (edges, datasources, datastreams).
        #[arg(long)]
        project: Option<String>,
    },
    /// Re-list edges on the refresh interval until interrupted.
    Watch {
        #[arg(long)]
        project: Option<String>,
    },
    /// Edges a data stream with the given origin selectors would draw from.
    AffectedEdges {
        #[arg(long)]
        project: String,
        /// Category selector as CATEGORY_ID=VALUE; repeatable.
        #[arg(long = "selector", required = true)]
        selectors: Vec<String>,
        #[arg(long, default_value = "")]
        data_type: String,
    },
    /// Number of edges each project spans.
    ProjectEdges,
    /// Wait for an OTA download or upgrade batch to finish.
    OtaWait {
        batch_id: String,
        /// The batch is an upgrade rather than a download.
        #[arg(long)]
        upgrade: bool,
        #[arg(long)]
        max_polls: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("loading sherlock.toml")?;
    if let Some(url) = cli.api_url.clone() {
        config.api.base_url = url;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = FileSessionStore::open(&config.session.path)
        .await
        .with_context(|| format!("opening session file {}", config.session.path.display()))?;
    let session = Session::new(Arc::new(store));
    let client = ApiClient::with_timeout(
        &config.api.base_url,
        session.clone(),
        std::time::Duration::from_secs(config.api.timeout_secs),
    )?
    .with_error_hook(Arc::new(|e: &SherlockError| eprintln!("error: {e}")));

    match run(cli.command, &client, &session, &config).await {
        Err(e) if is_login_required(&e) => {
            eprintln!("Session expired. Run `sherlock login` ({}).", client.login_url());
            std::process::exit(2);
        }
        other => other,
    }
}

fn is_login_required(err: &anyhow::Error) -> bool {
    err.downcast_ref::<SherlockError>().is_some_and(|e| e.is_login_required())
}

async fn run(command: Command, client: &ApiClient, session: &Session, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Login { email, code, no_remember } => {
            let resp = match (code, email) {
                (Some(code), _) => client.exchange_code(&code).await?,
                (None, Some(email)) => {
                    let password = rpassword::prompt_password(format!("Password for {email}: "))?;
                    client.login(&email, &password, !no_remember && config.session.remember_credentials).await?
                }
                (None, None) => bail!("--email or --code is required"),
            };
            println!("Signed in as {} <{}>", resp.name, resp.email);
        }
        Command::Logout => {
            session.logout().await?;
            println!("Signed out");
        }
        Command::Whoami => match session.display_name().await? {
            Some(name) => {
                let role = session.role().await?.unwrap_or_else(|| "-".to_string());
                println!("{name} ({role})");
            }
            None => println!("Not signed in"),
        },
        Command::List { resource, sort, order, project } => {
            let order: SortOrder = order.parse()?;
            let sort = sort.as_deref().map(|column| (column, order));
            list(client, &resource, project.as_deref(), sort).await?;
        }
        Command::Watch { project } => watch(client, project, config).await?,
        Command::AffectedEdges { project, selectors, data_type } => {
            let origin = selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let result = client.affected_edges_for_project(&project, &origin, &data_type).await?;
            println!("{}", output::render_affected(&result));
        }
        Command::ProjectEdges => {
            let rows: Vec<Vec<String>> = client
                .project_edge_counts()
                .await?
                .into_iter()
                .map(|(p, n)| vec![p.id, p.name, n.to_string()])
                .collect();
            println!("{}", output::render(&["ID", "NAME", "EDGES"], &rows));
        }
        Command::OtaWait { batch_id, upgrade, max_polls } => {
            let kind = if upgrade { SoftwareUpdateKind::Upgrade } else { SoftwareUpdateKind::Download };
            ota_wait(client, kind, &batch_id, max_polls, config).await?;
        }
    }
    Ok(())
}

/// Parse `CATEGORY_ID=VALUE`.
fn parse_selector(raw: &str) -> anyhow::Result<CategoryInfo> {
    match raw.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() && !value.trim().is_empty() => {
            Ok(CategoryInfo::new(id.trim(), value.trim()))
        }
        _ => bail!("selector '{raw}' is not of the form CATEGORY_ID=VALUE"),
    }
}

async fn list(
    client: &ApiClient,
    resource: &str,
    project: Option<&str>,
    sort: Option<(&str, SortOrder)>,
) -> anyhow::Result<()> {
    let out = match (resource, project) {
        ("edges", Some(p)) => table(client.list_for_project::<Edge>(p).await?, sort),
        ("datasources", Some(p)) => table(client.list_for_project::<DataSource>(p).await?, sort),
        ("datastreams", Some(p)) => table(client.list_for_project::<DataStream>(p).await?, sort),
        (_, Some(_)) => bail!("--project is only supported for edges, datasources and datastreams"),
        ("edges", None) => typed::<Edge>(client, sort).await?,
        ("datasources", None) => typed::<DataSource>(client, sort).await?,
        ("datastreams", None) => typed::<DataStream>(client, sort).await?,
        ("projects", None) => typed::<Project>(client, sort).await?,
        ("categories", None) => typed::<Category>(client, sort).await?,
        ("applications", None) => typed::<Application>(client, sort).await?,
        ("users", None) => typed::<User>(client, sort).await?,
        ("logs", None) => {
            let entries: Vec<LogEntry> = client.list().await?;
            output::render_log_batches(&log_batches(&entries))
        }
        (other, None) if RESOURCE_NAMES.contains(&other) => {
            let items = client.list_raw(other).await?;
            serde_json::to_string_pretty(&items)?
        }
        (other, None) => bail!("unknown resource '{other}'; expected one of {}", RESOURCE_NAMES.join(", ")),
    };
    println!("{out}");
    Ok(())
}

async fn typed<R: Resource + Printable>(
    client: &ApiClient,
    sort: Option<(&str, SortOrder)>,
) -> anyhow::Result<String> {
    Ok(table(client.list::<R>().await?, sort))
}

/// Build table state with each header as a sortable column.
fn table<R: Printable>(rows: Vec<R>, sort: Option<(&str, SortOrder)>) -> String {
    let mut state = TableState::new(R::HEADERS.iter().map(|h| (*h, sort_field(h))));
    state.set_rows(rows);
    if let Some((column, order)) = sort {
        if !state.sort(&column.to_uppercase(), order) {
            warn!("Cannot sort by '{}'", column);
        }
    }
    output::render_rows(state.rows())
}

/// Row field behind a printed column header.
fn sort_field(header: &str) -> &'static str {
    match header {
        "ID" => "id",
        "NAME" => "name",
        "SERIAL" => "serialNumber",
        "IP" => "ipAddress",
        "CONNECTED" => "connected",
        "EDGE" => "edgeId",
        "EDGES" => "edges",
        "EDGE SELECTION" => "edgeSelectorType",
        "TYPE" => "type",
        "PROTOCOL" => "protocol",
        "FIELDS" => "fields",
        "DATA TYPE" => "dataType",
        "ORIGIN" => "origin",
        "DESTINATION" => "destination",
        "PURPOSE" => "purpose",
        "VALUES" => "values",
        "DESCRIPTION" => "description",
        "USERS" => "users",
        "EMAIL" => "email",
        "ROLE" => "role",
        _ => "",
    }
}

/// Poll an OTA batch until it leaves the download/upgrade pipeline, then
/// report each edge. A failed batch is an error.
async fn ota_wait(
    client: &ApiClient,
    kind: SoftwareUpdateKind,
    batch_id: &str,
    max_polls: Option<usize>,
    config: &Config,
) -> anyhow::Result<()> {
    let batch = poll_until(config.refresh.poll(), max_polls, move || async move {
        let batch = client.software_update_batch(kind, batch_id).await?;
        info!(state = %batch.state, progress = batch.progress, eta = batch.eta, "OTA status");
        Ok::<_, SherlockError>(batch.is_terminal().then_some(batch))
    })
    .await?;

    let edges = client.software_update_edges(kind, batch_id).await?;
    println!("{}", output::render_software_updates(&edges));
    println!("\nbatch {} ({}): {}", batch.id, batch.release, batch.state);
    if batch.state.is_failed() {
        bail!("OTA batch {batch_id} ended in {}", batch.state);
    }
    Ok(())
}

struct EdgeFetcher {
    client: ApiClient,
    project: Option<String>,
}

#[async_trait]
impl Fetcher for EdgeFetcher {
    type Row = Edge;

    async fn fetch(&self) -> sherlock_common::Result<Vec<Edge>> {
        match &self.project {
            Some(p) => self.client.list_for_project(p).await,
            None => self.client.list().await,
        }
    }
}

async fn watch(client: &ApiClient, project: Option<String>, config: &Config) -> anyhow::Result<()> {
    let fetcher = EdgeFetcher { client: client.clone(), project };
    let table = TableState::new(Edge::HEADERS.iter().map(|h| (*h, sort_field(h))));
    let mut view = ListView::new(fetcher, table).with_interval(config.refresh.interval());
    view.start(None).await?;
    info!("Watching edges every {:?}; Ctrl-C to stop", config.refresh.interval());

    let state = view.state();
    let mut ticker = tokio::time::interval(config.refresh.interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let table = state.lock().await;
                println!("{}\n", output::render_rows(table.rows()));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    view.stop();
    Ok(())
}
