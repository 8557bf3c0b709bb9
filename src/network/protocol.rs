//! Protocol Messages
//!
//! JSON bodies and query strings of the HTTP surface. Field names follow
//! what deployed clients already send and read (`play_lives`, `canPlay`,
//! `highScore`), hence the mixed casing.

use serde::{Deserialize, Serialize};

use crate::economy::record::PlayerId;

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Query string carrying a player identity (`?fid=`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FidQuery {
    /// Raw identity.
    pub fid: Option<String>,
}

impl FidQuery {
    /// Parsed identity, if present and non-blank.
    pub fn player_id(&self) -> Option<PlayerId> {
        self.fid.as_deref().and_then(PlayerId::parse)
    }
}

/// `POST /play-session` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaySessionRequest {
    /// Player identity (string or integer).
    #[serde(default)]
    pub fid: Option<PlayerId>,
    /// Display name to record.
    #[serde(default)]
    pub username: Option<String>,
}

/// `POST /submit-score` body. The credential travels in the `Authorization` header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitScoreRequest {
    /// Final score of the run.
    #[serde(default)]
    pub score: Option<u64>,
    /// Hex SHA-256 over `"<score>:<token>"`.
    #[serde(default)]
    pub signature: Option<String>,
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// `GET /user-status` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatusResponse {
    /// Lives currently available.
    pub play_lives: u32,
}

/// `POST /play-session` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySessionResponse {
    /// Whether a life was spent and a run may start.
    pub can_play: bool,
    /// Lives left after this session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lives_remaining: Option<u32>,
    /// Credential to present on score submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Human readable reason when `can_play` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PlaySessionResponse {
    /// A granted session.
    pub fn granted(lives_remaining: u32, session_token: String) -> Self {
        Self {
            can_play: true,
            lives_remaining: Some(lives_remaining),
            session_token: Some(session_token),
            message: None,
        }
    }

    /// A refused session.
    pub fn out_of_lives() -> Self {
        Self {
            can_play: false,
            lives_remaining: Some(0),
            session_token: None,
            message: Some("Not enough lives!".to_string()),
        }
    }
}

/// `POST /submit-score` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitScoreResponse {
    /// Always true; failures use an error body.
    pub success: bool,
}

/// Error body shared by every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Short message.
    pub error: String,
    /// Underlying cause, when useful to the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" while serving.
    pub status: String,
    /// Crate version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_play_session_response_field_names() {
        let granted = serde_json::to_value(PlaySessionResponse::granted(4, "tok".into())).unwrap();
        assert_eq!(granted, json!({"canPlay": true, "livesRemaining": 4, "sessionToken": "tok"}));

        let refused = serde_json::to_value(PlaySessionResponse::out_of_lives()).unwrap();
        assert_eq!(refused["canPlay"], json!(false));
        assert_eq!(refused["message"], json!("Not enough lives!"));
        assert!(refused.get("sessionToken").is_none());
    }

    #[test]
    fn test_play_session_request_accepts_numeric_fid() {
        let req: PlaySessionRequest =
            serde_json::from_value(json!({"fid": 4242, "username": "alice"})).unwrap();
        assert_eq!(req.fid.unwrap().as_str(), "4242");
        assert_eq!(req.username.as_deref(), Some("alice"));

        let empty: PlaySessionRequest = serde_json::from_value(json!({})).unwrap();
        assert!(empty.fid.is_none());
    }

    #[test]
    fn test_submit_score_request_rejects_negative_score() {
        let result =
            serde_json::from_value::<SubmitScoreRequest>(json!({"score": -5, "signature": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_fid_query_blank_is_none() {
        let query = FidQuery { fid: Some("  ".into()) };
        assert!(query.player_id().is_none());
    }
}
