//! Board geometry and game limits.

use std::time::Duration;

/// Columns in the normal region of the board.
pub const BOARD_COLS: u8 = 3;

/// Rows in the normal region of the board.
pub const BOARD_ROWS: u8 = 4;

/// Cards the normal region holds. The board is refilled up to this many
/// cards after every successful claim.
pub const MAX_NORMAL: usize = (BOARD_COLS * BOARD_ROWS) as usize;

/// Overflow lanes to the right of the normal region.
pub const OVERFLOW_LANES: u8 = 2;

/// Slots in each overflow lane.
pub const OVERFLOW_DEPTH: u8 = 3;

/// Absolute ceiling on cards in play.
pub const MAX_CARDS: usize = MAX_NORMAL + (OVERFLOW_LANES * OVERFLOW_DEPTH) as usize;

/// Cards dealt at once when every peer asks for more.
pub const DEAL_SIZE: usize = 3;

/// Cards in a complete deck (3^4 attribute combinations).
pub const DECK_SIZE: usize = 81;

/// How long a claim holder is protected from competing claims.
pub const DEFAULT_CLAIM_WINDOW: Duration = Duration::from_secs(5);

/// Default number of peers a host waits for.
pub const DEFAULT_NUM_PLAYERS: usize = 2;

/// Largest roster a host accepts.
pub const MAX_PLAYERS: usize = 4;
