//! Network Layer
//!
//! Session credentials, score attestation and the HTTP surface.
//! All persistent state lives behind [`crate::store::PlayerStore`].

pub mod attestation;
pub mod auth;
pub mod error;
pub mod leaderboard;
pub mod protocol;
pub mod server;
pub mod service;
pub mod session;

pub use attestation::{AcceptedScore, AttestationError, ScorePolicy, ScoreVerifier};
pub use auth::{AuthConfig, AuthError, IssuedSession, SessionClaims, SessionSigner};
pub use error::ApiError;
pub use protocol::{
    PlaySessionRequest, PlaySessionResponse, SubmitScoreRequest, SubmitScoreResponse,
    UserStatusResponse,
};
pub use server::{router, PlayPassServer, ServerConfig, ServerError};
pub use service::PlayPassService;
pub use session::{SessionError, SessionGrant, SessionIssuer};
