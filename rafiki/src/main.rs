//! The Austerity hub server (spec §6): loads the keyfile, deckfile and
//! statfile, then serves games until SIGTERM.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use austerity::config::{load_deckfile, load_keyfile, load_statfile};
use austerity::error::ServerError;
use austerity::server::{self, ServerConfig};
use clap::{Arg, Command};
use log::error;

fn main() {
    env_logger::builder().format_target(false).init();

    let matches = match Command::new("rafiki")
        .about("host the Austerity card-game hub over TCP")
        .version("0.1.0")
        .arg(Arg::new("keyfile").value_name("KEYFILE").required(true))
        .arg(Arg::new("deckfile").value_name("DECKFILE").required(true))
        .arg(Arg::new("statfile").value_name("STATFILE").required(true))
        .arg(Arg::new("timeout").value_name("TIMEOUT").required(true))
        .try_get_matches()
    {
        Ok(matches) => matches,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let keyfile = PathBuf::from(matches.get_one::<String>("keyfile").unwrap());
    let deckfile = PathBuf::from(matches.get_one::<String>("deckfile").unwrap());
    let statfile = PathBuf::from(matches.get_one::<String>("statfile").unwrap());
    let timeout_arg = matches.get_one::<String>("timeout").unwrap();

    let key = load_keyfile(&keyfile).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(2);
    });
    let deck = load_deckfile(&deckfile).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(3);
    });
    // Validated here so a bad statfile fails fast at startup; reloaded
    // again inside `server::run` on every SIGINT rebind.
    if let Err(e) = load_statfile(&statfile) {
        error!("{e}");
        process::exit(4);
    }
    let timeout_secs: u64 = match timeout_arg.parse() {
        Ok(t) => t,
        Err(_) => {
            error!("bad timeout: {timeout_arg:?}");
            process::exit(5);
        }
    };

    let config = ServerConfig { key, deck, timeout: Duration::from_secs(timeout_secs) };
    match server::run(config, statfile) {
        Ok(()) => process::exit(0),
        Err(ServerError::FailedListen) => process::exit(6),
        Err(e) => {
            error!("{e}");
            process::exit(10);
        }
    }
}
