//! Lives Economy
//!
//! Player records and the regenerating lives pool.
//!
//! ## Module Structure
//!
//! - `record`: Player identity and the persisted record
//! - `lives`: Time-based regeneration

pub mod lives;
pub mod record;

pub use lives::{refresh_lives, regenerate, Regeneration};
pub use record::{PlayerId, PlayerRecord};

/// Maximum lives a player can hold.
pub const MAX_LIVES: u32 = 5;

/// Hours needed to regenerate one life.
pub const REGEN_HOURS: u64 = 1;
