//! A minimal stdin-driven reference player client (spec §6): enough to
//! authenticate, join or reconnect to a game, and relay moves typed at
//! the terminal. No play strategy is implemented here — that is an
//! external collaborator (shenzi/banzai/ed) this crate does not build.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;

use clap::{Arg, Command};

fn main() {
    let matches = match Command::new("zazu")
        .about("a minimal Austerity player client")
        .version("0.1.0")
        .arg(Arg::new("keyfile").value_name("KEYFILE").required(true))
        .arg(Arg::new("port").value_name("PORT").required(true))
        .arg(Arg::new("game").value_name("GAME").required(true))
        .arg(Arg::new("pname").value_name("PNAME").required(true))
        .try_get_matches()
    {
        Ok(matches) => matches,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let keyfile = matches.get_one::<String>("keyfile").unwrap();
    let port = matches.get_one::<String>("port").unwrap();
    let game = matches.get_one::<String>("game").unwrap();
    let pname = matches.get_one::<String>("pname").unwrap();

    let key = austerity::config::load_keyfile(std::path::Path::new(keyfile)).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(2);
    });

    let is_reconnect = game == "reconnect";
    if !is_reconnect && (pname.is_empty() || pname.contains(',') || pname.contains('\n')) {
        eprintln!("bad player name: {pname:?}");
        process::exit(3);
    }

    let stream = TcpStream::connect(("127.0.0.1", port.parse::<u16>().unwrap_or_else(|_| {
        eprintln!("bad port: {port:?}");
        process::exit(1);
    })))
    .unwrap_or_else(|e| {
        eprintln!("could not connect: {e}");
        process::exit(5);
    });

    let mut writer = stream.try_clone().unwrap_or_else(|e| {
        eprintln!("could not clone socket: {e}");
        process::exit(5);
    });
    let mut reader = BufReader::new(stream);

    if is_reconnect {
        send_line(&mut writer, &format!("reconnect{key}"));
    } else {
        send_line(&mut writer, &format!("play{key}"));
    }
    match recv_line(&mut reader) {
        Some(line) if line == "yes" => {}
        _ => {
            eprintln!("authentication failed");
            process::exit(6);
        }
    }

    if is_reconnect {
        send_line(&mut writer, &format!("rid{pname}"));
        match recv_line(&mut reader) {
            Some(line) if line == "yes" => {}
            _ => {
                eprintln!("bad reconnect id: {pname:?}");
                process::exit(7);
            }
        }
    } else {
        send_line(&mut writer, game);
        send_line(&mut writer, pname);
    }

    run_session(&mut reader, &mut writer)
}

fn run_session(reader: &mut BufReader<TcpStream>, writer: &mut TcpStream) -> ! {
    loop {
        let Some(line) = recv_line(reader) else {
            eprintln!("connection closed by server");
            process::exit(8);
        };

        if line == "dowhat" {
            println!("dowhat");
            print!("> ");
            let _ = io::stdout().flush();
            let mut input = String::new();
            if io::stdin().read_line(&mut input).unwrap_or(0) == 0 {
                process::exit(0);
            }
            send_line(writer, input.trim_end_matches('\n'));
        } else if line == "eog" {
            println!("{line}");
            process::exit(0);
        } else if line.starts_with("disco") {
            println!("{line}");
            process::exit(9);
        } else if line.starts_with("invalid") {
            println!("{line}");
            process::exit(10);
        } else {
            println!("{line}");
        }
    }
}

fn send_line(stream: &mut TcpStream, msg: &str) {
    let _ = writeln!(stream, "{msg}");
}

fn recv_line(reader: &mut BufReader<TcpStream>) -> Option<String> {
    let mut buf = String::new();
    match reader.read_line(&mut buf) {
        Ok(0) => None,
        Ok(_) => Some(buf.trim_end_matches('\n').to_string()),
        Err(_) => None,
    }
}
