//! # Play Pass Server
//!
//! Regenerating play lives, signed play sessions and attested score
//! submission for a casual web game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PLAY PASS SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Stateless primitives                    │
//! │  └── hash.rs       - Score attestation digest                │
//! │                                                              │
//! │  economy/          - Lives economy                           │
//! │  ├── record.rs     - Player identity and record              │
//! │  └── lives.rs      - Hourly regeneration                     │
//! │                                                              │
//! │  store/            - Persistence collaborator                │
//! │  ├── mod.rs        - PlayerStore trait (atomic ops)          │
//! │  └── memory.rs     - In-process reference store              │
//! │                                                              │
//! │  network/          - Sessions, attestation, HTTP             │
//! │  ├── auth.rs       - Session credential (JWT) mint/verify    │
//! │  ├── session.rs    - Life consumption + issuance             │
//! │  ├── attestation.rs- Score verification gates                │
//! │  ├── leaderboard.rs- Rank and top-N reads                    │
//! │  ├── service.rs    - Request-level operations                │
//! │  ├── protocol.rs   - Wire types                              │
//! │  ├── error.rs      - API error taxonomy                      │
//! │  └── server.rs     - axum routes and server                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Flow
//!
//! 1. `GET /user-status` regenerates and reports lives
//! 2. `POST /play-session` atomically spends a life and returns a credential
//! 3. `POST /submit-score` checks the credential, the score digest and the
//!    plausibility bound, then keeps the maximum score
//!
//! No request mutates in-process state; every race is settled by the
//! store's atomic operations.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod economy;
pub mod network;
pub mod store;

// Re-export commonly used types
pub use crate::core::hash::attestation_signature;
pub use economy::{PlayerId, PlayerRecord, MAX_LIVES, REGEN_HOURS};
pub use network::{ApiError, AuthConfig, PlayPassServer, PlayPassService, ScorePolicy, ServerConfig};
pub use store::{MemoryStore, PlayerStore, StoreError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
