use std::future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use recoil::{PhysicsWorld, Room, RoomStats, SessionStats};

use crate::bots::Bot;
use crate::config::ServerConfig;
use crate::lobby::Lobby;
use crate::rooms::run_room;

/// Starts the lobby, one task per room and the configured bots, then runs
/// until the configured duration elapses or the process is interrupted.
pub async fn run(config: ServerConfig) -> Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut lobby = Lobby::new(events_tx);

    let movement = config.movement();
    let arena = config.arena.build();
    let mut rooms: Vec<(String, JoinHandle<RoomStats>)> = Vec::new();
    for name in config.room_names() {
        let (room_tx, room_rx) = mpsc::unbounded_channel();
        lobby
            .add_room(&name, config.max_slots, room_tx)
            .with_context(|| format!("creating room {name}"))?;
        let physics = PhysicsWorld::with_arena(&movement, &arena);
        let room = Room::new(config.room_config(&name), physics);
        rooms.push((name, tokio::spawn(run_room(room, room_rx))));
    }

    let (lobby_tx, lobby_rx) = mpsc::unbounded_channel();
    let lobby_task = tokio::spawn(lobby.run(lobby_rx));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let bots: Vec<JoinHandle<(String, SessionStats)>> = (0..config.bots)
        .map(|index| {
            let bot = Bot::connect(index, &config, lobby_tx.clone());
            tokio::spawn(bot.run(shutdown_rx.clone()))
        })
        .collect();

    log::info!(
        "serving {} rooms at {} Hz with {} bots",
        rooms.len(),
        movement.tick_rate,
        bots.len()
    );
    if !config.link.is_perfect() {
        log::info!(
            "bot links: {} ms latency, {} ms jitter, {}% loss",
            config.link.latency_ms,
            config.link.jitter_ms,
            config.link.loss_percent
        );
    }

    let deadline = async {
        match config.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                log::info!("run time elapsed");
                break;
            }
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for ctrl-c")?;
                log::info!("interrupted");
                break;
            }
            Some(event) = events_rx.recv() => event.log(),
        }
    }

    let _ = shutdown_tx.send(true);
    for bot in bots {
        let (name, stats) = bot.await.context("bot task panicked")?;
        log::info!(
            "{name}: {} inputs sent, {} snapshots applied, {} confirmed, {} corrected",
            stats.inputs_sent,
            stats.snapshots_applied,
            stats.confirmed,
            stats.corrected
        );
    }

    drop(lobby_tx);
    lobby_task.await.context("lobby task panicked")?;
    while let Ok(event) = events_rx.try_recv() {
        event.log();
    }

    for (name, room) in rooms {
        let stats = room
            .await
            .with_context(|| format!("room {name} panicked"))?;
        log::info!(
            "{name}: {} ticks, {} inputs, {} starved steps, {} respawns",
            stats.ticks,
            stats.inputs_received,
            stats.starved_steps,
            stats.respawns
        );
    }
    Ok(())
}
