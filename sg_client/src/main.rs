//! A text client for the set-finding card game.
//!
//! Three threads share one control queue: the network receiver pushes host
//! records, the input thread pushes typed lines, and the main thread applies
//! both in arrival order.

use anyhow::{Error, Result};
use log::{debug, info, warn};
use pico_args::Arguments;
use std::{
    io::{self, BufRead},
    net::SocketAddr,
    sync::mpsc::{self, Receiver, Sender},
    thread,
    time::Duration,
};

use set_game::{GameSettings, HostProxy, LocalHost, Record, RemoteHost, TableView};
use sg_client::{
    commands::{ClientCommand, HELP as COMMANDS, parse_command},
    render::{render, render_board},
};

const HELP: &str = "\
Play a game of Set

USAGE:
  sg_client [OPTIONS]

OPTIONS:
  --host      IP:PORT  Host address                [default: env SG_HOST or 127.0.0.1:9999]
  --retry-ms  N        Delay between connect tries [default: 1000]

FLAGS:
  --local              Play offline, without a host
  -h, --help           Print help information
";

struct Args {
    host: SocketAddr,
    retry: Duration,
    local: bool,
}

/// Everything the presentation loop reacts to.
enum Control {
    Host(Record),
    Input(String),
}

impl From<Record> for Control {
    fn from(record: Record) -> Self {
        Self::Host(record)
    }
}

fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        host: match pargs.opt_value_from_str("--host")? {
            Some(host) => host,
            None => std::env::var("SG_HOST")
                .unwrap_or_else(|_| "127.0.0.1:9999".to_string())
                .parse()?,
        },
        retry: Duration::from_millis(pargs.opt_value_from_str("--retry-ms")?.unwrap_or(1000)),
        local: pargs.contains("--local"),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let (tx, rx) = mpsc::channel();
    let mut host: Box<dyn HostProxy> = if args.local {
        Box::new(LocalHost::new(GameSettings::default(), tx.clone())?)
    } else {
        info!("connecting to {}", args.host);
        let host = RemoteHost::connect_with_retry(args.host, args.retry, None)?;
        host.spawn_receiver(tx.clone())?;
        Box::new(host)
    };
    spawn_input(tx);

    println!("{COMMANDS}");
    host.start()?;
    run(host.as_mut(), &rx)
}

/// Forward typed lines. End of input counts as `quit`.
fn spawn_input(tx: Sender<Control>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(Control::Input(line)).is_err() {
                return;
            }
        }
        if tx.send(Control::Input("quit".to_string())).is_err() {
            debug!("presentation loop gone before end of input");
        }
    });
}

fn run(host: &mut dyn HostProxy, rx: &Receiver<Control>) -> Result<()> {
    let mut view = TableView::new();
    let mut quitting = false;

    'session: while let Ok(first) = rx.recv() {
        // Deals arrive card by card; draw once per burst.
        let mut burst = vec![first];
        burst.extend(rx.try_iter());
        let mut redraw = false;

        for control in burst {
            match control {
                Control::Host(record) => {
                    view.apply(&record)?;
                    redraw = true;
                }
                Control::Input(line) if line.trim().is_empty() => {}
                Control::Input(line) => match parse_command(&line) {
                    Ok(ClientCommand::Quit) if quitting => break 'session,
                    Ok(command) => {
                        quitting |= command == ClientCommand::Quit;
                        act(host, &view, command)?;
                    }
                    Err(error) => println!("{error}"),
                },
            }
        }

        if redraw {
            print!("{}", render(&view));
        }
        if view.disconnected {
            break;
        }
    }

    if let Some(outcome) = &view.outcome {
        for (&peer, score) in &outcome.scores {
            println!("{}: {score}", view.name(peer));
        }
    }
    Ok(())
}

/// Turn a typed command into an intent, resolving coordinates against the
/// mirrored layout.
fn act(host: &mut dyn HostProxy, view: &TableView, command: ClientCommand) -> Result<(), Error> {
    match command {
        ClientCommand::Start => host.start(),
        ClientCommand::YellSet => host.yell_set(),
        ClientCommand::CheckSet => host.check_set(),
        ClientCommand::RequestMore => host.request_more(),
        ClientCommand::Quit => host.disconnect(),
        ClientCommand::Select(coord) | ClientCommand::Deselect(coord) => {
            let Some(card) = view.card_at(coord) else {
                warn!("no card at {coord}");
                return Ok(());
            };
            if matches!(command, ClientCommand::Select(_)) {
                host.select_card(card, coord)
            } else {
                host.deselect_card(card, coord)
            }
        }
        ClientCommand::Board => {
            print!("{}", render_board(view));
            Ok(())
        }
        ClientCommand::Help => {
            println!("{COMMANDS}");
            Ok(())
        }
    }
}
