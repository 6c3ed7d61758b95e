//! Host and guest walking through a full session lifecycle on a loopback network

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use lobby_core::{
    BroadcastEventBus, CoordinatorConfig, DestroyOutcome, EventBus, EventSeq, LobbyEvent,
    LobbyFacade, LoggingTransition, LoopbackNetwork, OperationTimeouts, PasswordAdvertisement,
    SearchResult, SessionConfig, SessionCoordinator, SessionProvider,
};
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{debug, warn};

use crate::config::{ConfigLoader, LobbyConfig};

#[derive(Args)]
pub struct DemoArgs {
    /// Public slots of the hosted session, host included
    #[arg(long)]
    pub players: Option<u32>,

    /// Password for the hosted session
    #[arg(long)]
    pub password: Option<String>,

    /// Host and search on the local network only
    #[arg(long)]
    pub lan: bool,

    /// Simulated provider latency in milliseconds
    #[arg(long)]
    pub latency_ms: Option<u64>,
}

type Events = Receiver<(EventSeq, LobbyEvent)>;

pub async fn run(args: DemoArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let host_config = session_config(&config, &args);
    host_config.validate()?;

    let latency = Duration::from_millis(args.latency_ms.unwrap_or(config.loopback.latency_ms));
    let network = LoopbackNetwork::with_latency(latency);
    let limit = event_limit(&config.coordinator.timeouts);

    let host_id = config.player.name.clone();
    let guest_id = format!("{host_id}-guest");
    let host = facade(&network, &host_id, &config.coordinator);
    let guest = facade(&network, &guest_id, &config.coordinator);
    let mut host_events = host.coordinator().subscribe();
    let mut guest_events = guest.coordinator().subscribe();

    host.start_session(&host_config).await?;
    let event = next_outcome(&mut host_events, limit).await?;
    report(&host, &event);
    if event.is_failure() {
        bail!("hosting failed");
    }

    guest
        .find_sessions(host_config.is_lan, host_config.uses_presence)
        .await?;
    let event = next_outcome(&mut guest_events, limit).await?;
    report(&guest, &event);
    let results = guest.search_results().await;
    print_results(&results);

    let Some(found) = results.iter().find(|result| result.owner_id == host_id) else {
        bail!("session of {host_id} not found");
    };

    if found.has_password {
        let candidate = host_config.password().unwrap_or_default();
        let accepted = guest
            .check_password_for_session_of(&found.owner_id, candidate)
            .await;
        match (accepted, config.coordinator.password_advertisement) {
            (true, _) => println!("Password accepted"),
            (false, PasswordAdvertisement::FlagOnly) => {
                println!("Password is not advertised, skipping check")
            }
            (false, PasswordAdvertisement::Cleartext) => {
                bail!("password rejected for session of {}", found.owner_id)
            }
        }
    }

    guest.join_game(&found.owner_id).await?;
    let event = next_outcome(&mut guest_events, limit).await?;
    report(&guest, &event);
    if event.is_failure() {
        bail!("join failed");
    }
    println!(
        "{} members in session of {host_id}",
        network.member_count(&host_id).unwrap_or_default()
    );

    leave(&guest, &mut guest_events, limit).await?;
    leave(&host, &mut host_events, limit).await?;

    println!("Sessions left on network: {}", network.session_count());
    Ok(())
}

fn session_config(config: &LobbyConfig, args: &DemoArgs) -> SessionConfig {
    let mut session = config.host.clone();
    if let Some(players) = args.players {
        session.max_players = players;
    }
    if let Some(password) = &args.password {
        session.password = Some(password.clone());
    }
    if args.lan {
        session.is_lan = true;
    }
    session
}

fn facade(network: &Arc<LoopbackNetwork>, user_id: &str, config: &CoordinatorConfig) -> LobbyFacade {
    let provider: Arc<dyn SessionProvider> = Arc::new(network.provider());
    let event_bus: Arc<dyn EventBus> = Arc::new(BroadcastEventBus::default());
    let coordinator = SessionCoordinator::new(provider, event_bus, config.clone());
    LobbyFacade::new(user_id, coordinator, Arc::new(LoggingTransition))
}

/// Longest any single lifecycle step can take before the coordinator gives up
fn event_limit(timeouts: &OperationTimeouts) -> Duration {
    let secs = timeouts.create_secs
        + timeouts.start_secs
        + timeouts.find_secs
        + timeouts.join_secs
        + timeouts.destroy_secs;
    Duration::from_secs(secs + 1)
}

async fn leave(facade: &LobbyFacade, events: &mut Events, limit: Duration) -> Result<()> {
    if facade.destroy_session().await? == DestroyOutcome::NothingOwned {
        println!("[{}] nothing to leave", facade.player_name());
        return Ok(());
    }
    let event = next_outcome(events, limit).await?;
    report(facade, &event);
    Ok(())
}

async fn next_outcome(events: &mut Events, limit: Duration) -> Result<LobbyEvent> {
    tokio::time::timeout(limit, recv_outcome(events))
        .await
        .context("timed out waiting for lobby event")?
}

/// Next event that is not a bare state change
async fn recv_outcome(events: &mut Events) -> Result<LobbyEvent> {
    loop {
        match events.recv().await {
            Ok((_, LobbyEvent::StateChanged { from, to })) => {
                debug!(%from, %to, "coordinator state changed");
            }
            Ok((_, event)) => return Ok(event),
            Err(RecvError::Lagged(n)) => {
                warn!("Demo lagged by {} events", n);
            }
            Err(RecvError::Closed) => bail!("event bus closed"),
        }
    }
}

fn report(facade: &LobbyFacade, event: &LobbyEvent) {
    println!("[{}] {}", facade.player_name(), describe(event));
    facade.apply_event(event);
}

fn describe(event: &LobbyEvent) -> String {
    match event {
        LobbyEvent::StateChanged { from, to } => format!("state {from} -> {to}"),
        LobbyEvent::HostingStarted {
            session_name,
            level,
        } => format!("hosting {session_name} on {level}"),
        LobbyEvent::HostingFailed { error } => format!("hosting failed: {error}"),
        LobbyEvent::SearchCompleted {
            success,
            result_count,
        } => {
            if *success {
                format!("search found {result_count} sessions")
            } else {
                "search failed".to_string()
            }
        }
        LobbyEvent::JoinResolved {
            session_name,
            connect_string,
        } => format!("joined {session_name} at {connect_string}"),
        LobbyEvent::JoinFailed { error } => format!("join failed: {error}"),
        LobbyEvent::ReturnedToIdle { session_name } => format!("left {session_name}"),
        LobbyEvent::DestroyFailed { error } => format!("leaving failed: {error}"),
    }
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No sessions found.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Owner").fg(Color::Cyan),
            Cell::new("Party").fg(Color::Cyan),
            Cell::new("Map").fg(Color::Cyan),
            Cell::new("Slots").fg(Color::Cyan),
            Cell::new("Password").fg(Color::Cyan),
        ]);

    for result in results {
        table.add_row(vec![
            Cell::new(&result.owner_id),
            Cell::new(&result.display_name),
            Cell::new(&result.map_or_level_id),
            Cell::new(format!(
                "{}/{}",
                result.open_connections, result.max_connections
            )),
            Cell::new(if result.has_password { "yes" } else { "no" }),
        ]);
    }

    println!("{table}");
}
