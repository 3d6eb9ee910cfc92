use std::io;
use std::path::PathBuf;
use std::process;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use isometric_quest::console::{self, ConsolePresenter};
use isometric_quest::{GameConfig, InteractionCoordinator};

const DEFAULT_CONFIG: &str = "game.toml";
const FALLBACK_FILTER: &str = "isometric_quest=info";

// ============================================================================
// Main
// ============================================================================

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    // Config is read before logging so its filter can apply; report failure after
    let config = GameConfig::load(&config_path);
    let log_filter = config
        .as_ref()
        .map(|c| c.log_filter.as_str())
        .unwrap_or(FALLBACK_FILTER);
    init_logging(log_filter);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&config) {
        error!("{}", e);
        process::exit(1);
    }
}

fn init_logging(directive: &str) {
    let mut filter = EnvFilter::from_default_env();
    let mut rejected = None;
    match directive.parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => rejected = Some(e),
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Some(e) = rejected {
        warn!("Ignoring log filter '{}': {}", directive, e);
    }
}

fn run(config: &GameConfig) -> Result<(), Box<dyn std::error::Error>> {
    let presenter = ConsolePresenter::new(io::stdout());
    let mut game = InteractionCoordinator::from_config(config, presenter)?;
    info!(
        "Loaded {} quests, {} dialogue trees, {} shops, {} NPCs",
        game.quests().len(),
        game.engine().tree_count(),
        game.shops().len(),
        game.npcs().len()
    );

    console::run(&mut game, io::stdin().lock())?;
    info!("Goodbye");
    Ok(())
}
