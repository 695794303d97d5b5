//! Host side of a networked session.
//!
//! The host binds, accepts exactly the configured number of peers, greets
//! each with its identity and then runs one loop: records come in through
//! the [`Multiplexer`], get dispatched into the [`Engine`], and the engine's
//! notifications go back out through the [`RemoteSession`].

use anyhow::{Context, Error};
use log::{info, warn};
use std::{
    collections::BTreeMap,
    net::{Shutdown, SocketAddr, TcpListener, TcpStream},
    time::Instant,
};

use super::{
    super::game::{
        Engine, GameEvent, GameSettings, Session,
        entities::{PeerId, Scores},
    },
    codec::{Record, write_record},
    messages::{CommandKind, ServerMessage, card_params},
    multiplexer::{Incoming, Multiplexer},
    rpc::{Dispatcher, Handler},
};

/// Host configuration.
#[derive(Clone, Debug, Default)]
pub struct HostConfig {
    pub game: GameSettings,
}

impl From<GameSettings> for HostConfig {
    fn from(game: GameSettings) -> Self {
        Self { game }
    }
}

/// Peer sockets, keyed by identity. The only thing on the host that writes
/// to peers.
#[derive(Debug)]
pub struct RemoteSession {
    streams: BTreeMap<PeerId, TcpStream>,
}

impl RemoteSession {
    /// Block until `num_players` peers connect. Each gets the next identity
    /// starting from 1 and is told it before anything else.
    pub fn accept(listener: &TcpListener, num_players: usize) -> anyhow::Result<(Self, Multiplexer)> {
        let mut multiplexer = Multiplexer::new()?;
        let mut streams = BTreeMap::new();
        for peer in (1..).take(num_players) {
            let (mut stream, addr) = listener.accept()?;
            info!("player {peer} connected from {addr}");
            write_record(&mut stream, &ServerMessage::ClientId(peer).to_record())
                .with_context(|| format!("failed to greet player {peer}"))?;
            multiplexer.register(peer, stream.try_clone()?)?;
            streams.insert(peer, stream);
        }
        Ok((Self { streams }, multiplexer))
    }

    fn send(&mut self, peer: PeerId, record: &Record) {
        let Some(stream) = self.streams.get_mut(&peer) else {
            return;
        };
        if let Err(error) = write_record(stream, record) {
            // Shutting down both halves surfaces the failure to the
            // multiplexer as a closed stream.
            warn!("couldn't write to player {peer}, dropping them: {error}");
            if let Err(error) = stream.shutdown(Shutdown::Both) {
                warn!("couldn't shut down player {peer}'s stream: {error}");
            }
            self.streams.remove(&peer);
        }
    }
}

impl Session for RemoteSession {
    fn peers(&self) -> Vec<PeerId> {
        self.streams.keys().copied().collect()
    }

    fn unicast(&mut self, peer: PeerId, event: &GameEvent) -> std::io::Result<()> {
        let record = ServerMessage::from(event.clone()).to_record();
        self.send(peer, &record);
        Ok(())
    }
}

fn start<S: Session>(engine: &mut Engine<S>, peer: PeerId, _: &Record) -> anyhow::Result<()> {
    engine.start(peer)?;
    Ok(())
}

fn select_card<S: Session>(engine: &mut Engine<S>, peer: PeerId, record: &Record) -> anyhow::Result<()> {
    let (card, coord) = card_params(record)?;
    engine.select_card(peer, card, coord)?;
    Ok(())
}

fn deselect_card<S: Session>(
    engine: &mut Engine<S>,
    peer: PeerId,
    record: &Record,
) -> anyhow::Result<()> {
    let (card, coord) = card_params(record)?;
    engine.deselect_card(peer, card, coord)?;
    Ok(())
}

fn check_set<S: Session>(engine: &mut Engine<S>, peer: PeerId, _: &Record) -> anyhow::Result<()> {
    engine.check_set(peer)?;
    Ok(())
}

fn yell_set<S: Session>(engine: &mut Engine<S>, peer: PeerId, _: &Record) -> anyhow::Result<()> {
    engine.yell_set(peer, Instant::now())?;
    Ok(())
}

fn request_more<S: Session>(engine: &mut Engine<S>, peer: PeerId, _: &Record) -> anyhow::Result<()> {
    engine.request_more(peer)?;
    Ok(())
}

fn disconnect<S: Session>(engine: &mut Engine<S>, peer: PeerId, _: &Record) -> anyhow::Result<()> {
    engine.disconnect(peer)?;
    Ok(())
}

fn command_handler<S: Session>(kind: CommandKind) -> Handler<Engine<S>, PeerId> {
    match kind {
        CommandKind::Start => start::<S>,
        CommandKind::SelectCard => select_card::<S>,
        CommandKind::DeselectCard => deselect_card::<S>,
        CommandKind::CheckSet => check_set::<S>,
        CommandKind::YellSet => yell_set::<S>,
        CommandKind::RequestMore => request_more::<S>,
        CommandKind::Disconnect => disconnect::<S>,
    }
}

/// Dispatch table binding every gameplay intent to the engine.
#[must_use]
pub fn host_dispatcher<S: Session>() -> Dispatcher<Engine<S>, PeerId> {
    let mut dispatcher = Dispatcher::new();
    for kind in CommandKind::ALL {
        dispatcher.register(kind.name(), command_handler::<S>(kind));
    }
    dispatcher
}

/// Drive an engine from a stream of peer records until the game ends.
///
/// # Errors
///
/// Returns an error if a handler fails or peers can't be notified. Peers
/// are told the game ended before the error is returned.
pub fn serve<S, I>(engine: &mut Engine<S>, incoming: I) -> anyhow::Result<()>
where
    S: Session,
    I: IntoIterator<Item = Incoming>,
{
    let dispatcher = host_dispatcher::<S>();
    for incoming in incoming {
        let result = match incoming {
            Incoming::Record { peer, record } => dispatcher
                .handle(engine, peer, &record)
                .map_err(Error::from),
            Incoming::Closed { peer, error } => {
                if let Some(error) = error {
                    warn!("player {peer}'s stream failed: {error}");
                }
                engine.disconnect(peer).map_err(Error::from)
            }
        };
        if let Err(error) = result {
            engine.abort("the host hit an unrecoverable error");
            return Err(error);
        }
        if engine.is_over() {
            info!("game over, final scores {:?}", engine.scores());
            return Ok(());
        }
    }
    engine.abort("lost every connection");
    Ok(())
}

/// Accept peers on an already bound listener and play one game.
///
/// # Errors
///
/// Returns an error if accepting or greeting peers fails, or if the game
/// loop fails.
pub fn run_on(listener: TcpListener, config: HostConfig) -> anyhow::Result<Scores> {
    info!(
        "waiting for {} players on {}",
        config.game.num_players,
        listener.local_addr()?
    );
    let (session, multiplexer) = RemoteSession::accept(&listener, config.game.num_players)?;
    let mut engine = Engine::new(config.game, session);
    serve(&mut engine, multiplexer)?;
    Ok(engine.scores().clone())
}

/// Bind, accept peers and play one game, returning the final scores.
///
/// # Errors
///
/// Returns an error if binding fails or the game can't be played out.
pub fn run(addr: SocketAddr, config: HostConfig) -> anyhow::Result<Scores> {
    let listener = TcpListener::bind(addr).with_context(|| format!("failed to bind {addr}"))?;
    run_on(listener, config)
}

#[cfg(test)]
mod tests {
    use std::{io, time::Duration};

    use super::*;
    use crate::game::entities::Deck;

    #[derive(Debug, Default)]
    struct Recorder {
        sent: Vec<(PeerId, GameEvent)>,
    }

    impl Session for Recorder {
        fn peers(&self) -> Vec<PeerId> {
            vec![1, 2]
        }

        fn unicast(&mut self, peer: PeerId, event: &GameEvent) -> io::Result<()> {
            self.sent.push((peer, event.clone()));
            Ok(())
        }
    }

    struct Unreachable;

    impl Session for Unreachable {
        fn peers(&self) -> Vec<PeerId> {
            vec![1, 2]
        }

        fn unicast(&mut self, _: PeerId, _: &GameEvent) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    fn engine() -> Engine<Recorder> {
        let settings = GameSettings::new(Duration::from_secs(5), 2);
        Engine::with_deck(settings, Recorder::default(), Deck::default())
    }

    fn record(peer: PeerId, kind: CommandKind) -> Incoming {
        Incoming::Record {
            peer,
            record: Record::new(kind.name()),
        }
    }

    #[test]
    fn test_dispatcher_covers_every_command() {
        let dispatcher = host_dispatcher::<Recorder>();
        for kind in CommandKind::ALL {
            assert!(dispatcher.handles(kind.name()));
        }
    }

    #[test]
    fn test_serve_runs_until_disconnect() {
        let mut engine = engine();
        let incoming = vec![
            record(1, CommandKind::Start),
            record(2, CommandKind::Start),
            record(1, CommandKind::YellSet),
            Incoming::Closed {
                peer: 2,
                error: None,
            },
            record(1, CommandKind::CheckSet),
        ];
        serve(&mut engine, incoming).unwrap();
        assert!(engine.is_over());
        assert_eq!(engine.board().len(), 12);
        assert!(matches!(
            engine.session().sent.last(),
            Some((1, GameEvent::EndGame { .. }))
        ));
        assert_eq!(engine.scores()[&1], 0);
    }

    #[test]
    fn test_serve_skips_bad_records() {
        let mut engine = engine();
        let incoming = vec![
            Incoming::Record {
                peer: 1,
                record: Record::new("deal_me_in"),
            },
            record(1, CommandKind::SelectCard),
            record(1, CommandKind::Start),
        ];
        serve(&mut engine, incoming).unwrap();
        assert_eq!(engine.board().len(), 12);
        assert!(engine.is_over());
    }

    #[test]
    fn test_serve_aborts_on_delivery_failure() {
        let settings = GameSettings::new(Duration::from_secs(5), 2);
        let mut engine = Engine::with_deck(settings, Unreachable, Deck::default());
        let result = serve(&mut engine, vec![record(1, CommandKind::Start)]);
        assert!(result.is_err());
        assert!(engine.is_over());
    }
}
