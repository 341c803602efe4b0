mod bots;
mod config;
mod events;
mod lobby;
mod pacing;
mod rooms;
mod server;
mod switchboard;

use anyhow::Result;
use clap::Parser;

use config::{ArenaKind, ServerConfig};
use recoil::LinkConditions;

#[derive(Parser)]
#[command(name = "recoil-server")]
#[command(about = "Authoritative room server with lag-compensated hit-scan")]
struct Args {
    #[arg(short, long, default_value_t = 50)]
    tick_rate: u32,

    #[arg(short, long = "room", default_value = "arena", help = "Room to host (repeatable)")]
    rooms: Vec<String>,

    #[arg(short, long, default_value_t = 10)]
    max_slots: u8,

    #[arg(long, value_enum, default_value_t = ArenaKind::ProvingGround)]
    arena: ArenaKind,

    #[arg(short, long, default_value_t = 0, help = "In-process bot clients")]
    bots: usize,

    #[arg(short, long, help = "Stop after this many seconds")]
    duration_secs: Option<u64>,

    #[arg(long, default_value_t = 0, help = "One-way bot link latency in ms")]
    latency_ms: u32,

    #[arg(long, default_value_t = 0, help = "Bot link jitter in ms")]
    jitter_ms: u32,

    #[arg(long, default_value_t = 0.0, help = "Bot link loss percentage (0-100)")]
    loss_percent: f32,

    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            tick_rate: self.tick_rate,
            rooms: self.rooms,
            max_slots: self.max_slots,
            arena: self.arena,
            bots: self.bots,
            duration_secs: self.duration_secs,
            link: LinkConditions {
                latency_ms: self.latency_ms,
                jitter_ms: self.jitter_ms,
                loss_percent: self.loss_percent.clamp(0.0, 100.0),
            },
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = args.into_config();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::run(config))?;

    log::info!("server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_room_flags_collect() {
        let args = Args::parse_from([
            "recoil-server",
            "--room",
            "a",
            "--room",
            "b",
            "--bots",
            "4",
            "--loss-percent",
            "250",
        ]);
        let config = args.into_config();

        assert_eq!(config.rooms, vec!["a", "b"]);
        assert_eq!(config.bots, 4);
        assert_eq!(config.link.loss_percent, 100.0);
        assert_eq!(config.arena, ArenaKind::ProvingGround);
    }

    #[test]
    fn defaults_host_one_room() {
        let config = Args::parse_from(["recoil-server"]).into_config();

        assert_eq!(config.room_names(), vec!["arena"]);
        assert_eq!(config.tick_rate, 50);
        assert!(config.duration_secs.is_none());
    }
}
