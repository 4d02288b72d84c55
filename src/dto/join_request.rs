use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{GameStatus, JoinRequestStatus},
    dto::game::JoinRequestView,
    state::join_requests::Approval,
};

/// Outcome of filing, rejecting or cancelling a join request.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequestResponse {
    /// Always `true`.
    pub success: bool,
    /// Outcome summary.
    pub message: Option<String>,
    /// Game the request belongs to.
    pub game_id: Uuid,
    /// Requesting player.
    pub user_id: Uuid,
    /// Absent once the request was withdrawn.
    pub status: Option<JoinRequestStatus>,
}

impl JoinRequestResponse {
    /// Successful outcome for `user_id` on `game_id`.
    pub fn new(
        message: &str,
        game_id: Uuid,
        user_id: Uuid,
        status: Option<JoinRequestStatus>,
    ) -> Self {
        Self {
            success: true,
            message: Some(message.to_owned()),
            game_id,
            user_id,
            status,
        }
    }
}

/// Outcome of an approval: the new head count and game status.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    /// Always `true`.
    pub success: bool,
    /// Outcome summary.
    pub message: String,
    /// Approved game.
    pub game_id: Uuid,
    /// Approved player.
    pub user_id: Uuid,
    /// Roster size after approval, host included.
    pub approved_count: usize,
    /// Game status after approval; `Full` once capacity is reached.
    pub status: GameStatus,
}

impl ApprovalResponse {
    /// Response for an approval of `user_id`.
    pub fn new(game_id: Uuid, user_id: Uuid, approval: Approval) -> Self {
        Self {
            success: true,
            message: "join request approved".into(),
            game_id,
            user_id,
            approved_count: approval.approved_count,
            status: approval.status,
        }
    }
}

/// Join requests of one game, in arrival order.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequestListResponse {
    /// Always `true`.
    pub success: bool,
    /// Listed game.
    pub game_id: Uuid,
    /// Requests in arrival order.
    pub join_requests: Vec<JoinRequestView>,
}
