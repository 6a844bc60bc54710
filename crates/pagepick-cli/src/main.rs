//! pagepick CLI entry point.

mod args;
mod host;
mod page;

use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use pagepick_core::config::PickerConfig;
use pagepick_core::dom::{Document, MemoryDocument, NodeId, Point};
use pagepick_core::error::PickError;
use pagepick_core::locator;
use pagepick_core::picker::PickerState;
use pagepick_core::protocol::{self, ChatQuery};
use pagepick_core::snapshot;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::args::{AtArgs, Cli, Commands, PickArgs};
use crate::host::{PickerEvent, PickerHost, PointerEvent, Selection};
use crate::page::load_page;

/// Extra time allowed beyond the commit flash before giving up on a pick.
const SELECTION_GRACE: Duration = Duration::from_secs(5);

fn main() {
    // Logs go to stderr; stdout carries JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Pick(args) => run_pick(args),
        Commands::Snapshot(args) => {
            let doc = load_page(&args.page)?;
            let node = element_at(&doc, &args)?;
            print_json(&snapshot::extract(&doc, node)?)
        }
        Commands::Locate(args) => {
            let doc = load_page(&args.page)?;
            let node = element_at(&doc, &args)?;
            let locator = locator::locate(&doc, node)
                .ok_or_else(|| PickError::node_not_found(node.to_string()))?;
            println!("{}", locator);
            Ok(())
        }
        Commands::Resolve(args) => {
            let doc = load_page(&args.page)?;
            let node = locator::resolve(&doc, &args.locator)?
                .ok_or_else(|| PickError::node_not_found(&args.locator))?;
            print_json(&snapshot::extract(&doc, node)?)
        }
        Commands::Elements(args) => {
            let doc = load_page(&args.page)?;
            print_json(&protocol::describe_elements(&doc))
        }
        Commands::Match(args) => {
            let doc = load_page(&args.page)?;
            print_json(&protocol::match_elements(&doc, &args.descriptor, args.limit))
        }
        Commands::Examples => {
            println!("{}", crate::args::EXAMPLES_TEXT);
            Ok(())
        }
    }
}

fn element_at(doc: &MemoryDocument, args: &AtArgs) -> Result<NodeId, PickError> {
    doc.element_from_point(args.at)
        .ok_or_else(|| PickError::no_element_at(args.at.x, args.at.y))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Picker settings from the environment, with CLI overrides on top.
fn picker_config(args: &PickArgs) -> PickerConfig {
    let config = PickerConfig::from_env();
    if args.no_host_root {
        config.with_host_root(None)
    } else if let Some(id) = &args.host_root {
        config.with_host_root(Some(id))
    } else {
        config
    }
}

fn run_pick(args: PickArgs) -> anyhow::Result<()> {
    let doc = load_page(&args.page)?;
    let config = picker_config(&args);
    let wait = config.commit_flash + SELECTION_GRACE;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;

    let selection = runtime.block_on(async {
        let host = PickerHost::new(doc, config);
        let mut events = host.subscribe();

        host.enable().await?;
        for Point { x, y } in &args.moves {
            host.dispatch(PointerEvent::Move { x: *x, y: *y }).await;
        }
        let Point { x, y } = args.click;
        host.dispatch(PointerEvent::Click { x, y }).await;

        if host.state().await != PickerState::Committing {
            host.disable().await;
            bail!("Click at ({}, {}) did not pick an element (nothing there, or host UI)", x, y);
        }

        tokio::time::timeout(wait, next_selection(&mut events))
            .await
            .context("Timed out waiting for the pick to resolve")?
    })?;

    info!("Picked <{}> ({})", selection.snapshot.tag_name, selection.session_id);

    match args.question {
        Some(question) => {
            let mut query = ChatQuery::new(question, args.role).with_snapshot(selection.snapshot);
            if let Some(trace) = args.trace {
                query = query.with_trace(trace);
            }
            debug!("Runtime prompt:\n{}", query.runtime_prompt());
            print_json(&query)
        }
        None => print_json(&selection),
    }
}

async fn next_selection(
    events: &mut broadcast::Receiver<PickerEvent>,
) -> anyhow::Result<Selection> {
    loop {
        match events.recv().await {
            Ok(PickerEvent::Selected(selection)) => return Ok(selection),
            Ok(PickerEvent::Cancelled) => bail!("Picker was cancelled before a selection"),
            Ok(other) => debug!("Picker event: {:?}", other),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Skipped {} picker events", skipped)
            }
            Err(broadcast::error::RecvError::Closed) => {
                bail!("Picker host closed before a selection")
            }
        }
    }
}
