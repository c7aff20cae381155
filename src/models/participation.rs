use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::EventResponse;

/// 参与流程步骤
/// welcome/terms/tiles/success 用于流程响应，其余用于状态查询派生
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStep {
    NotStarted,
    Welcome,
    Terms,
    Tiles,
    ReadyToComplete,
    Success,
    Completed,
}

impl std::fmt::Display for ParticipationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParticipationStep::NotStarted => "not_started",
            ParticipationStep::Welcome => "welcome",
            ParticipationStep::Terms => "terms",
            ParticipationStep::Tiles => "tiles",
            ParticipationStep::ReadyToComplete => "ready_to_complete",
            ParticipationStep::Success => "success",
            ParticipationStep::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// 状态查询使用的参与快照
#[derive(Debug, Clone, Copy)]
pub struct ParticipationSnapshot {
    pub has_participated: bool,
    pub has_completed: bool,
    pub terms_accepted: bool,
    pub tiles_interacted: i64,
}

/// 派生展示用的当前步骤。
/// 规则表按优先级排列，取第一条命中的规则；全部不命中时为 not_started。
pub fn derive_current_step(s: &ParticipationSnapshot, required_tiles: i64) -> ParticipationStep {
    type Rule = (
        fn(&ParticipationSnapshot, i64) -> bool,
        ParticipationStep,
    );
    const RULES: &[Rule] = &[
        (|s, _| s.has_completed, ParticipationStep::Completed),
        (
            |s, required| s.tiles_interacted >= required,
            ParticipationStep::ReadyToComplete,
        ),
        (
            |s, _| s.tiles_interacted > 0 || s.terms_accepted,
            ParticipationStep::Tiles,
        ),
        (|s, _| s.has_participated, ParticipationStep::Terms),
    ];

    RULES
        .iter()
        .find(|(matches, _)| matches(s, required_tiles))
        .map(|(_, step)| *step)
        .unwrap_or(ParticipationStep::NotStarted)
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InteractTilesRequest {
    /// 本次互动的瓦片数量（默认 1）
    pub tile_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartParticipationResponse {
    pub event: EventResponse,
    pub step: ParticipationStep,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptTermsResponse {
    pub step: ParticipationStep,
    pub message: String,
    pub terms: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InteractTilesResponse {
    pub step: ParticipationStep,
    pub message: String,
    pub tiles_interacted: i64,
    /// 完成所需的瓦片互动次数
    pub total_tiles: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteParticipationResponse {
    pub success: bool,
    pub message: String,
    pub event: EventResponse,
    pub qr_code: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserParticipationStatus {
    pub has_participated: bool,
    pub has_completed: bool,
    pub terms_accepted: bool,
    pub tiles_interacted: i64,
    pub current_step: ParticipationStep,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationStatusResponse {
    pub event: EventResponse,
    pub user_status: UserParticipationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(
        has_participated: bool,
        has_completed: bool,
        terms_accepted: bool,
        tiles_interacted: i64,
    ) -> ParticipationSnapshot {
        ParticipationSnapshot {
            has_participated,
            has_completed,
            terms_accepted,
            tiles_interacted,
        }
    }

    #[test]
    fn untouched_user_is_not_started() {
        let step = derive_current_step(&snapshot(false, false, false, 0), 3);
        assert_eq!(step, ParticipationStep::NotStarted);
    }

    #[test]
    fn completed_wins_over_everything() {
        let step = derive_current_step(&snapshot(true, true, true, 10), 3);
        assert_eq!(step, ParticipationStep::Completed);
        // 即使其余状态为空，已完成仍然优先
        let step = derive_current_step(&snapshot(false, true, false, 0), 3);
        assert_eq!(step, ParticipationStep::Completed);
    }

    #[test]
    fn threshold_reached_is_ready_to_complete_regardless_of_terms() {
        let step = derive_current_step(&snapshot(true, false, false, 3), 3);
        assert_eq!(step, ParticipationStep::ReadyToComplete);
        let step = derive_current_step(&snapshot(true, false, true, 5), 3);
        assert_eq!(step, ParticipationStep::ReadyToComplete);
    }

    #[test]
    fn partial_tiles_or_accepted_terms_is_tiles() {
        let step = derive_current_step(&snapshot(true, false, false, 1), 3);
        assert_eq!(step, ParticipationStep::Tiles);
        let step = derive_current_step(&snapshot(false, false, true, 0), 3);
        assert_eq!(step, ParticipationStep::Tiles);
    }

    #[test]
    fn participated_without_terms_is_terms() {
        let step = derive_current_step(&snapshot(true, false, false, 0), 3);
        assert_eq!(step, ParticipationStep::Terms);
    }

    #[test]
    fn step_serializes_as_snake_case() {
        let json = serde_json::to_string(&ParticipationStep::ReadyToComplete).unwrap();
        assert_eq!(json, "\"ready_to_complete\"");
        assert_eq!(ParticipationStep::NotStarted.to_string(), "not_started");
    }
}
