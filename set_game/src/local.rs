//! Single-process play: the engine runs on the presentation thread and its
//! notifications go straight onto the presentation queue, as the same
//! records a remote host would send.

use anyhow::Error;
use log::info;
use std::{io, sync::mpsc::Sender};

use super::{
    game::{Engine, GameEvent, GameSettings, Session, entities::PeerId},
    net::{
        client::{HostProxy, session_ended},
        codec::Record,
        messages::{ServerMessage, UserCommand},
        rpc::Dispatcher,
        server::host_dispatcher,
    },
};

/// Identity of the only participant in an offline game.
pub const LOCAL_PEER: PeerId = 1;

/// Delivers engine notifications onto an in-process queue.
#[derive(Debug)]
pub struct LocalSession<T> {
    tx: Sender<T>,
}

impl<T: From<Record>> LocalSession<T> {
    pub fn new(tx: Sender<T>) -> Self {
        Self { tx }
    }

    fn push(&self, record: Record) -> io::Result<()> {
        self.tx
            .send(T::from(record))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "presentation queue closed"))
    }
}

impl<T: From<Record>> Session for LocalSession<T> {
    fn peers(&self) -> Vec<PeerId> {
        vec![LOCAL_PEER]
    }

    fn unicast(&mut self, peer: PeerId, event: &GameEvent) -> io::Result<()> {
        if peer != LOCAL_PEER {
            return Ok(());
        }
        self.push(ServerMessage::from(event.clone()).to_record())
    }
}

/// An in-process host. Intents are dispatched into the engine right away,
/// through the same table a remote host uses.
pub struct LocalHost<T> {
    engine: Engine<LocalSession<T>>,
    dispatcher: Dispatcher<Engine<LocalSession<T>>, PeerId>,
    ended: bool,
}

impl<T: From<Record>> LocalHost<T> {
    /// A one-player game whose notifications are pushed onto `tx`. The
    /// handshake is queued immediately, as a remote host would send it.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue is already closed.
    pub fn new(settings: GameSettings, tx: Sender<T>) -> Result<Self, Error> {
        let settings = GameSettings {
            num_players: 1,
            ..settings
        };
        let session = LocalSession::new(tx);
        session.push(ServerMessage::ClientId(LOCAL_PEER).to_record())?;
        info!("starting an offline game");
        Ok(Self {
            engine: Engine::new(settings, session),
            dispatcher: host_dispatcher(),
            ended: false,
        })
    }

    #[must_use]
    pub fn engine(&self) -> &Engine<LocalSession<T>> {
        &self.engine
    }
}

impl<T: From<Record>> HostProxy for LocalHost<T> {
    fn send(&mut self, command: UserCommand) -> Result<(), Error> {
        if self.ended {
            return Ok(());
        }
        let result = self
            .dispatcher
            .handle(&mut self.engine, LOCAL_PEER, &command.to_record());
        if let Err(error) = result {
            self.engine.abort("the game hit an unrecoverable error");
            return Err(error.into());
        }
        if self.engine.is_over() {
            self.ended = true;
            self.engine.session().push(session_ended())?;
        }
        Ok(())
    }
}
