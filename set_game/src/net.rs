//! Networking layer for host-peer communication.
//!
//! Records are delimiter-framed JSON over plain TCP. Both ends use `mio`
//! to wait on their sockets and the same dispatch table type to route
//! decoded records to handlers.

/// Participant side: the host proxy and its receiver thread.
pub mod client;

/// Delimiter framing and record encoding.
pub mod codec;

/// Error types for framing, parameter binding and dispatch.
pub mod errors;

/// Operation names and record layouts.
pub mod messages;

/// Readiness-driven record stream over peer sockets.
pub mod multiplexer;

/// Operation-name dispatch.
pub mod rpc;

/// Host side: session, game loop and entry points.
pub mod server;
