//! Readiness-driven record stream over a fixed set of peer sockets.

use log::{debug, error, info};
use mio::{Events, Interest, Poll, Token, net::TcpStream};
use std::{
    collections::{HashMap, VecDeque},
    io::{self, Read},
    time::Duration,
};

use super::{
    super::game::entities::PeerId,
    codec::{Decoder, Record},
};

/// Event capacity per poll.
const EVENTS_CAPACITY: usize = 64;

/// Bytes read per call while draining a readable socket.
const READ_CHUNK_SIZE: usize = 4096;

/// Something that happened on one of the peer sockets.
#[derive(Debug)]
pub enum Incoming {
    /// A complete, well-formed record from a peer.
    Record { peer: PeerId, record: Record },
    /// A peer's stream ended, cleanly (`error` is `None`) or not.
    Closed {
        peer: PeerId,
        error: Option<io::Error>,
    },
}

struct Connection {
    peer: PeerId,
    stream: TcpStream,
    decoder: Decoder,
}

/// Waits on every registered peer at once and yields their records in
/// arrival order per peer.
///
/// Membership is fixed after registration. A peer whose stream ends is
/// reported once through [`Incoming::Closed`] and then forgotten; iteration
/// ends when no peers remain.
pub struct Multiplexer {
    poll: Poll,
    events: Events,
    connections: HashMap<Token, Connection>,
    ready: VecDeque<Incoming>,
}

impl Multiplexer {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(EVENTS_CAPACITY),
            connections: HashMap::new(),
            ready: VecDeque::new(),
        })
    }

    /// Start watching a peer's socket. Switches the socket to non-blocking
    /// mode, which any clones of it share.
    pub fn register(&mut self, peer: PeerId, stream: std::net::TcpStream) -> io::Result<()> {
        stream.set_nonblocking(true)?;
        let mut stream = TcpStream::from_std(stream);
        let token = Token(peer as usize);
        self.poll
            .registry()
            .register(&mut stream, token, Interest::READABLE)?;
        self.connections.insert(
            token,
            Connection {
                peer,
                stream,
                decoder: Decoder::new(),
            },
        );
        debug!("watching peer {peer}");
        Ok(())
    }

    /// Peers still being watched.
    #[must_use]
    pub fn peers(&self) -> usize {
        self.connections.len()
    }

    /// Wait for at least one socket to become readable or fail, then queue
    /// whatever it produced. A `None` timeout waits indefinitely.
    pub fn poll_once(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        if let Err(error) = self.poll.poll(&mut self.events, timeout) {
            if error.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(error);
        }

        let tokens: Vec<Token> = self.events.iter().map(|event| event.token()).collect();
        for token in tokens {
            let Some(connection) = self.connections.get_mut(&token) else {
                continue;
            };
            let closed = drain(connection);
            while let Some(record) = connection.decoder.next_record() {
                self.ready.push_back(Incoming::Record {
                    peer: connection.peer,
                    record,
                });
            }
            if let Some(error) = closed {
                let peer = connection.peer;
                if let Some(mut connection) = self.connections.remove(&token) {
                    if let Err(error) = self.poll.registry().deregister(&mut connection.stream) {
                        debug!("couldn't stop watching peer {peer}: {error}");
                    }
                }
                info!("peer {peer} closed its stream");
                self.ready.push_back(Incoming::Closed { peer, error });
            }
        }
        Ok(())
    }
}

/// Read everything available. Returns `Some` when the stream ended, with
/// the error that ended it if there was one.
fn drain(connection: &mut Connection) -> Option<Option<io::Error>> {
    let mut chunk = [0; READ_CHUNK_SIZE];
    loop {
        match connection.stream.read(&mut chunk) {
            Ok(0) => return Some(None),
            Ok(n) => connection.decoder.feed(&chunk[..n]),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => return None,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Some(Some(error)),
        }
    }
}

impl Iterator for Multiplexer {
    type Item = Incoming;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(incoming) = self.ready.pop_front() {
                return Some(incoming);
            }
            if self.connections.is_empty() {
                return None;
            }
            if let Err(error) = self.poll_once(None) {
                error!("polling peer sockets failed: {error}");
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        net::{TcpListener, TcpStream},
    };

    use super::*;
    use crate::net::codec::{encode, write_record};

    fn pair() -> (TcpStream, TcpStream) {
        let server = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (stream, _) = server.accept().unwrap();
        (client, stream)
    }

    fn expect_record(incoming: Option<Incoming>) -> (PeerId, Record) {
        match incoming {
            Some(Incoming::Record { peer, record }) => (peer, record),
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn test_records_from_several_peers() {
        let (mut one, host_one) = pair();
        let (mut two, host_two) = pair();
        let mut mux = Multiplexer::new().unwrap();
        mux.register(1, host_one).unwrap();
        mux.register(2, host_two).unwrap();
        assert_eq!(mux.peers(), 2);

        write_record(&mut two, &Record::new("yell_set")).unwrap();
        assert_eq!(expect_record(mux.next()), (2, Record::new("yell_set")));

        write_record(&mut one, &Record::new("start")).unwrap();
        assert_eq!(expect_record(mux.next()), (1, Record::new("start")));
    }

    #[test]
    fn test_record_split_across_writes() {
        let (mut client, host) = pair();
        let mut mux = Multiplexer::new().unwrap();
        mux.register(1, host).unwrap();

        let buf = encode(&Record::new("check_set")).unwrap();
        client.write_all(&buf[..5]).unwrap();
        mux.poll_once(Some(Duration::from_millis(100))).unwrap();
        client.write_all(&buf[5..]).unwrap();
        assert_eq!(expect_record(mux.next()), (1, Record::new("check_set")));
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let (mut client, host) = pair();
        let mut mux = Multiplexer::new().unwrap();
        mux.register(1, host).unwrap();

        client.write_all(b"garbage~").unwrap();
        write_record(&mut client, &Record::new("resume")).unwrap();
        assert_eq!(expect_record(mux.next()), (1, Record::new("resume")));
    }

    #[test]
    fn test_close_is_reported_after_pending_records() {
        let (mut client, host) = pair();
        let mut mux = Multiplexer::new().unwrap();
        mux.register(3, host).unwrap();

        write_record(&mut client, &Record::new("disconnect")).unwrap();
        drop(client);

        assert_eq!(expect_record(mux.next()), (3, Record::new("disconnect")));
        assert!(matches!(
            mux.next(),
            Some(Incoming::Closed { peer: 3, error: None })
        ));
        assert_eq!(mux.peers(), 0);
        assert!(mux.next().is_none());
    }
}
