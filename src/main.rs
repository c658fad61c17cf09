// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Modelink daemon

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modelink::config::Config;
use modelink::console::{self, ConsoleAction};
use modelink::reconciler::{Reconciler, StateChange, ToggleOutcome};
use modelink::storage::{AlarmHistory, Preferences};
use modelink::transport::{self, LinkEvent};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("modelink=info".parse()?),
        )
        .init();

    info!("Starting Modelink v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    let variant = config.transport.variant;
    info!("Configuration loaded, transport: {}", variant.as_str());

    let mut link = transport::open(&config.transport)?;
    let mut link_events = link.take_events();

    let history = if variant.persists_history() {
        AlarmHistory::persistent(Preferences::open(&config.data_dir)?)?
    } else {
        AlarmHistory::in_memory()
    };
    info!("History storage initialized ({} records)", history.len());

    let mut reconciler = Reconciler::new(link, history);
    let mut changes = reconciler.subscribe();

    let status = reconciler.start().await;
    info!("Device link: {}", status);
    println!("{}", console::render_modes(variant, &reconciler.snapshot()));

    let mut action_rx = console::run_console();
    println!("{}", console::HELP);

    loop {
        tokio::select! {
            Some(event) = next_event(&mut link_events) => {
                reconciler.handle_link_event(event);
            }
            Some(action) = action_rx.recv() => {
                match action {
                    ConsoleAction::Toggle { mode, enabled } => {
                        let outcome = reconciler.toggle(mode, enabled).await;
                        if let ToggleOutcome::Rejected(notice) = outcome {
                            warn!("{} mode change rejected: {}", mode, notice);
                        }
                    }
                    ConsoleAction::ShowHistory => {
                        println!("{}", console::render_history(reconciler.history()));
                    }
                    ConsoleAction::ShowStatus => {
                        println!("{}", console::status_text(&reconciler.connection_status()));
                        println!("{}", console::render_modes(variant, &reconciler.snapshot()));
                    }
                    ConsoleAction::ClearHistory => {
                        reconciler.clear_history();
                    }
                    ConsoleAction::Help => {
                        println!("{}", console::HELP);
                    }
                    ConsoleAction::Quit => {
                        info!("Quit requested");
                        break;
                    }
                }
            }
            Ok(change) = changes.recv() => {
                render_change(&change);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    reconciler.shutdown().await;
    info!("Modelink stopped");
    Ok(())
}

/// Next inbound event; pends forever for links without a stream.
async fn next_event(rx: &mut Option<mpsc::Receiver<LinkEvent>>) -> Option<LinkEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn render_change(change: &StateChange) {
    match change {
        StateChange::HistoryAppended(record) => {
            println!("{}", console::render_history(std::slice::from_ref(record)));
        }
        StateChange::HistoryCleared => println!("History cleared"),
        StateChange::Connection(status) => println!("{}", console::status_text(status)),
        StateChange::Notice(notice) => println!("! {}", notice),
        StateChange::Modes(_) => {}
    }
}
