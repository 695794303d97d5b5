//! Host process for the set-finding card game.
//!
//! Waits for the configured number of peers, runs one game to completion and
//! exits.

mod config;

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use set_game::server;

use config::{Overrides, ServerConfig};

const HELP: &str = "\
Host a game of Set

USAGE:
  sg_host [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Host socket bind address  [default: env SG_BIND or 127.0.0.1:9999]
  --players       N        Peers to wait for         [default: env SG_PLAYERS or 2]
  --claim-window  SECS     Claim protection window   [default: env SG_CLAIM_WINDOW_SECS or 5]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SG_BIND                  Host bind address (e.g., 0.0.0.0:9999)
  SG_PLAYERS               Number of players (1 to 4)
  SG_CLAIM_WINDOW_SECS     Seconds a claim holder has to pick three cards
  RUST_LOG                 Log filter [default: info]
";

fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        bind: pargs.opt_value_from_str("--bind")?,
        players: pargs.opt_value_from_str("--players")?,
        claim_window_secs: pargs.opt_value_from_str("--claim-window")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    info!(
        "hosting at {} for {} player(s), {}s claim window",
        config.bind,
        config.players,
        config.claim_window.as_secs()
    );
    let scores = server::run(config.bind, config.host_config())?;
    for (peer, score) in &scores {
        info!("player {peer}: {score}");
    }

    Ok(())
}
