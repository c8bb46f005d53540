//! The scoreboard client (spec §6): connects, sends `scores`, prints
//! the CSV dump.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::process;

use clap::{Arg, Command};

fn main() {
    let matches = match Command::new("gopher")
        .about("dump the Austerity cross-game scoreboard")
        .version("0.1.0")
        .arg(Arg::new("port").value_name("PORT").required(true))
        .try_get_matches()
    {
        Ok(matches) => matches,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let port: u16 = match matches.get_one::<String>("port").unwrap().parse() {
        Ok(p) => p,
        Err(_) => {
            eprintln!("bad port");
            process::exit(1);
        }
    };

    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap_or_else(|e| {
        eprintln!("could not connect: {e}");
        process::exit(3);
    });

    if writeln!(stream, "scores").is_err() {
        eprintln!("could not send scores request");
        process::exit(3);
    }

    let mut body = String::new();
    if stream.read_to_string(&mut body).is_err() {
        eprintln!("could not read scoreboard response");
        process::exit(3);
    }

    if !body.starts_with("Player Name,Total Tokens,Total Points") {
        eprintln!("invalid scoreboard response");
        process::exit(4);
    }

    print!("{body}");
}
