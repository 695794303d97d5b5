//! Card game engine: card model, board geometry, the match predicate and
//! the claim-arbitration state machine.

pub mod constants;
pub mod entities;
pub mod functional;
pub mod state_machine;

pub use state_machine::{
    Claim, Engine, EngineError, GameEvent, GameSettings, Session, UserError,
};
