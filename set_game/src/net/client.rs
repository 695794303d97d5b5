//! Participant side of a networked session.
//!
//! Intents go out as one-way records with no reply; the host's
//! notifications come back independently and are pushed onto a queue by a
//! receiver thread so the network path never waits on presentation.

use anyhow::{Error, bail};
use log::{debug, info, warn};
use std::{
    net::{SocketAddr, TcpStream},
    sync::mpsc::Sender,
    thread::{self, JoinHandle},
    time::Duration,
};

use super::{
    super::game::entities::{Card, Coord, PeerId},
    codec::{Record, write_record},
    messages::{EventKind, UserCommand},
    multiplexer::{Incoming, Multiplexer},
};

/// Default pause between connection attempts.
pub const CONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Identity the receiver uses for the host's stream.
const HOST: PeerId = 0;

/// Whatever carries a participant's intents to the game engine.
pub trait HostProxy {
    /// Send one intent. Returns as soon as it's handed off.
    fn send(&mut self, command: UserCommand) -> Result<(), Error>;

    fn start(&mut self) -> Result<(), Error> {
        self.send(UserCommand::Start)
    }

    fn select_card(&mut self, card: Card, coord: Coord) -> Result<(), Error> {
        self.send(UserCommand::SelectCard { card, coord })
    }

    fn deselect_card(&mut self, card: Card, coord: Coord) -> Result<(), Error> {
        self.send(UserCommand::DeselectCard { card, coord })
    }

    fn check_set(&mut self) -> Result<(), Error> {
        self.send(UserCommand::CheckSet)
    }

    fn yell_set(&mut self) -> Result<(), Error> {
        self.send(UserCommand::YellSet)
    }

    fn request_more(&mut self) -> Result<(), Error> {
        self.send(UserCommand::RequestMore)
    }

    fn disconnect(&mut self) -> Result<(), Error> {
        self.send(UserCommand::Disconnect)
    }
}

/// The synthetic record queued when the host's stream ends.
#[must_use]
pub fn session_ended() -> Record {
    Record::new(EventKind::SessionEnded.name())
}

/// A connection to a remote host.
#[derive(Debug)]
pub struct RemoteHost {
    addr: SocketAddr,
    stream: TcpStream,
}

impl RemoteHost {
    /// Connect once.
    pub fn connect(addr: SocketAddr) -> Result<Self, Error> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        info!("connected to {addr}");
        Ok(Self { addr, stream })
    }

    /// Connect, retrying with a fixed backoff until the host is reachable.
    /// `attempts` of `None` retries forever.
    ///
    /// # Errors
    ///
    /// Returns an error if every attempt fails.
    pub fn connect_with_retry(
        addr: SocketAddr,
        backoff: Duration,
        attempts: Option<usize>,
    ) -> Result<Self, Error> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match Self::connect(addr) {
                Ok(host) => return Ok(host),
                Err(error) => {
                    if attempts.is_some_and(|attempts| attempt >= attempts) {
                        bail!("couldn't connect to {addr} after {attempt} attempts: {error}");
                    }
                    debug!("host at {addr} isn't reachable yet ({error}), retrying");
                    thread::sleep(backoff);
                }
            }
        }
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the receiver thread. Every host record is pushed onto `tx` in
    /// arrival order; when the stream ends a [`session_ended`] record
    /// follows and the thread exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream can't be shared with the thread.
    pub fn spawn_receiver<T>(&self, tx: Sender<T>) -> Result<JoinHandle<()>, Error>
    where
        T: From<Record> + Send + 'static,
    {
        let mut multiplexer = Multiplexer::new()?;
        multiplexer.register(HOST, self.stream.try_clone()?)?;
        let handle = thread::spawn(move || {
            for incoming in multiplexer {
                match incoming {
                    Incoming::Record { record, .. } => {
                        if tx.send(T::from(record)).is_err() {
                            debug!("presentation queue closed, receiver exiting");
                            return;
                        }
                    }
                    Incoming::Closed { error, .. } => {
                        if let Some(error) = error {
                            warn!("connection to the host failed: {error}");
                        }
                        break;
                    }
                }
            }
            if tx.send(T::from(session_ended())).is_err() {
                debug!("presentation queue closed before the session ended");
            }
        });
        Ok(handle)
    }
}

impl HostProxy for RemoteHost {
    fn send(&mut self, command: UserCommand) -> Result<(), Error> {
        debug!("sending {}", command.kind().name());
        write_record(&mut self.stream, &command.to_record())?;
        Ok(())
    }
}
