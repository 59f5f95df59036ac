use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, ClientSettings},
    DisabledEventSink, HttpEventSink, LoggingRenderTrigger, MemorySurface,
    WorkspacePage,
};
use serde_json::{Map, Value};
use shared::{domain::ControlId, protocol::TrackEvent};
use storage::WorkspaceStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Inspect and drive locally persisted assessment workspaces")]
struct Cli {
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    key_prefix: Option<String>,
    #[arg(long)]
    collector_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every stored workspace.
    List,
    /// Print the stored record of one control as JSON.
    Show { control_id: String },
    /// Resume a control's workspace, or seed it from the given markup.
    Activate {
        control_id: String,
        #[arg(long)]
        html: String,
    },
    /// Replace the content of an existing workspace, as one user edit.
    Edit {
        control_id: String,
        #[arg(long)]
        html: String,
    },
    /// Discard a control's local edits.
    Reset { control_id: String },
    /// Send one interaction event; details are `key=value` pairs.
    Track {
        event_type: String,
        control_id: String,
        details: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(v) = cli.database_url {
        settings.database_url = v;
    }
    if let Some(v) = cli.key_prefix {
        settings.key_prefix = v;
    }
    if let Some(v) = cli.collector_url {
        settings.collector_url = v;
    }

    match cli.command {
        Command::Track {
            event_type,
            control_id,
            details,
        } => track(&settings, event_type, control_id, &details).await,
        command => {
            let store = settings.open_store().await?;
            run_store_command(command, store).await
        }
    }
}

async fn track(
    settings: &ClientSettings,
    event_type: String,
    control_id: String,
    details: &[String],
) -> Result<()> {
    let event = TrackEvent::new(event_type, ControlId::new(control_id), parse_details(details)?);
    // Waits for the attempt so the process does not exit first; the outcome
    // is still not reported.
    HttpEventSink::new(&settings.collector_url)?
        .send(event)
        .await
        .context("event delivery task panicked")?;
    println!("event sent (best effort)");
    Ok(())
}

async fn run_store_command(command: Command, store: WorkspaceStore) -> Result<()> {
    match command {
        Command::List => {
            for record in store.list().await? {
                println!(
                    "{}\t{}\t{}",
                    record.control_id(),
                    record.status(),
                    record.last_modified().to_rfc3339()
                );
            }
        }
        Command::Show { control_id } => {
            let control_id = ControlId::new(control_id);
            match store.read(&control_id).await {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => bail!("no stored workspace for control {control_id}"),
            }
        }
        Command::Activate { control_id, html } => {
            let surface = MemorySurface::with_html(html);
            let mut page = page_for(surface, store);
            let phase = page.initialize_workspace(ControlId::new(control_id)).await?;
            println!("workspace {phase:?}");
            print_bound_record(&page)?;
        }
        Command::Edit { control_id, html } => {
            let control_id = ControlId::new(control_id);
            if store.read(&control_id).await.is_none() {
                bail!("no stored workspace for control {control_id}; activate it first");
            }
            let surface = MemorySurface::new();
            let mut page = page_for(surface.clone(), store);
            page.initialize_workspace(control_id).await?;
            surface.replace_html(html);
            page.handle_input().await;
            if let Some(error) = page.controller().and_then(|c| c.last_persist_error()) {
                bail!("edit kept in memory only: {error}");
            }
            print_bound_record(&page)?;
        }
        Command::Reset { control_id } => {
            let control_id = ControlId::new(control_id);
            let mut page = page_for(MemorySurface::new(), store);
            page.reset_workspace(&control_id).await;
            println!("workspace for control {control_id} reset");
        }
        Command::Track { .. } => bail!("track does not operate on the workspace store"),
    }

    Ok(())
}

fn page_for(
    surface: MemorySurface,
    store: WorkspaceStore,
) -> WorkspacePage<MemorySurface> {
    WorkspacePage::new(
        surface,
        store,
        Arc::new(LoggingRenderTrigger),
        Arc::new(DisabledEventSink),
    )
}

fn print_bound_record(page: &WorkspacePage<MemorySurface>) -> Result<()> {
    let record = page
        .controller()
        .and_then(|controller| controller.record())
        .ok_or_else(|| anyhow!("workspace is not active"))?;
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// `key=value` pairs; values that parse as JSON keep their type.
fn parse_details(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut details = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("detail '{pair}' is not key=value"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        details.insert(key.to_string(), value);
    }
    Ok(details)
}
