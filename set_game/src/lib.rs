//! # Set Game
//!
//! A real-time multiplayer pattern-matching card game with an
//! authoritative host.
//!
//! Three cards form a match when each of their four attributes (colour,
//! shape, shading, number) is either the same on all three cards or
//! different on all three. Players race to claim a match; the host
//! arbitrates claims, keeps score, and tells every participant about each
//! change as it happens.
//!
//! ## Architecture
//!
//! - **Engine** ([`game::Engine`]): owns the deck, the board, the scores and
//!   claim arbitration. It's the only thing that mutates game state and
//!   reports every mutation through a [`game::Session`].
//! - **Wire protocol** ([`net::codec`]): delimiter-framed JSON records over
//!   TCP, `{"type": ..., "args": [...], "kwargs": {...}}~`.
//! - **Multiplexer** ([`net::multiplexer`]): waits on every peer socket at
//!   once with `mio` and yields decoded records.
//! - **Dispatch** ([`net::rpc`]): routes records by operation name to
//!   handlers, on the host and on clients alike.
//! - **Client proxy** ([`net::client`]): sends intents and queues the
//!   host's notifications for a separate presentation loop.
//! - **Mirror** ([`view::TableView`]): what a participant knows, built only
//!   from host notifications.
//! - **Offline play** ([`local`]): the same engine and records without a
//!   network.
//!
//! ## Example
//!
//! ```
//! use set_game::functional::is_match;
//! use set_game::entities::{Card, Color, Number, Shading, Shape};
//!
//! let a = Card(Color::Red, Shape::Oval, Shading::Filled, Number::One);
//! let b = Card(Color::Red, Shape::Oval, Shading::Filled, Number::Two);
//! assert!(is_match(&a, &b, &a.third(&b)));
//! ```

/// Core game logic, entities, and the claim-arbitration state machine.
pub mod game;
pub use game::{
    Claim, Engine, EngineError, GameEvent, GameSettings, Session, UserError,
    constants::{self, DEFAULT_CLAIM_WINDOW, DEFAULT_NUM_PLAYERS, MAX_PLAYERS},
    entities, functional,
};

/// Networking components for host-peer communication.
pub mod net;
pub use net::{
    client::{HostProxy, RemoteHost},
    codec::{self, Record},
    messages, server,
};

/// Single-process play.
pub mod local;
pub use local::{LOCAL_PEER, LocalHost, LocalSession};

/// Client-side mirror of game state.
pub mod view;
pub use view::TableView;
