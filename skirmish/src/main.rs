//! skirmish - run a combat scenario headless

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skirmish::combat::RngDice;
use skirmish::{run_driver, Arena, EngineConfig, JsonPlayerStore, Scenario, TracingNarrator};

#[derive(Debug, Parser)]
#[command(name = "skirmish", version, about = "Run MUD combat scenarios")]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON scenario with rooms, combatants and engagements
    #[arg(long)]
    scenario: PathBuf,

    /// Seed for reproducible dice
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many ticks
    #[arg(long, default_value_t = 100)]
    max_rounds: u32,

    /// Directory for saved players (in memory if unset)
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skirmish=info,narration=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = EngineConfig::load(cli.config.as_deref())?;
    let scenario = Scenario::load(&cli.scenario)?;

    let dice = match cli.seed {
        Some(seed) => RngDice::seeded(seed),
        None => RngDice::from_entropy(),
    };
    let interval = config.round_interval();
    let mut arena = Arena::new(config)
        .with_dice(dice)
        .with_narrator(Arc::new(TracingNarrator))
        .with_world(scenario.world());
    if let Some(dir) = &cli.save_dir {
        arena = arena.with_store(Arc::new(JsonPlayerStore::new(dir)?));
    }

    if scenario.populate(&mut arena) == 0 {
        warn!("scenario started no combats");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let summary = runtime.block_on(async {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(true);
            }
        });
        run_driver(&mut arena, interval, shutdown_rx, Some(cli.max_rounds)).await
    });

    info!(?summary, "done");
    for combatant in arena.roster().iter().filter(|c| c.is_player()) {
        info!(
            player = %combatant.id,
            level = combatant.level,
            xp = combatant.progression.xp,
            hp = combatant.hp(),
            "final state"
        );
    }
    Ok(())
}
