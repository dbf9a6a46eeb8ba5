use serde::{Deserialize, Serialize};

use crate::constants::{
    COUNTDOWN_MS, DESCRIPTION_MS, NUM_ROUNDS, RESULT_MS, SURROGATE_DESCRIBE_DWELL_MS,
    SURROGATE_VOTE_DELAY_MS, VOTING_MS,
};

pub type ParticipantId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Countdown,
    Describing,
    Voting,
    Result,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    NonImpostors,
    Impostor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    ImpostorCaught,
    ImpostorSurvived,
    RoundsExhausted,
    ImpostorLeft,
    RosterCollapse,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTotals {
    #[serde(rename = "nonImpostor")]
    pub non_impostor: u32,
    pub impostor: u32,
}

impl ScoreTotals {
    pub fn total(&self) -> u32 {
        self.non_impostor + self.impostor
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub avatar: Option<String>,
    pub ready_to_start: bool,
    pub describing: bool,
    pub is_impostor: bool,
    pub secret_word: String,
    pub score: ScoreTotals,
    pub latest_round_score: u32,
    pub voted: bool,
    pub is_surrogate: bool,
    /// Canned line a surrogate "says" on its describing turn.
    pub description: Option<String>,
}

impl Participant {
    pub fn human(id: &str, name: &str, score: ScoreTotals) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            avatar: None,
            ready_to_start: false,
            describing: false,
            is_impostor: false,
            secret_word: String::new(),
            score,
            latest_round_score: 0,
            voted: false,
            is_surrogate: false,
            description: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundContext {
    pub round: u32,
    pub seed: u32,
    pub current_word: String,
    pub impostor_word: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTurn {
    pub stage: Stage,
    pub timer_started_at_ms: u64,
    pub description_order: Vec<ParticipantId>,
    pub current_describer_id: Option<ParticipantId>,
    pub previous_describer_id: Option<ParticipantId>,
    pub next_describer_id: Option<ParticipantId>,
    pub completed_describers: Vec<ParticipantId>,
    pub voting_complete: bool,
    pub impostor_caught: bool,
    pub remaining_participants: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub voter_id: ParticipantId,
    pub suspect_id: ParticipantId,
    pub round: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub participant_id: ParticipantId,
    pub emoji: String,
    pub timestamp_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub countdown_ms: u64,
    pub description_ms: u64,
    pub voting_ms: u64,
    pub result_ms: u64,
    pub surrogate_describe_dwell_ms: u64,
    pub surrogate_vote_delay_ms: u64,
    pub num_rounds: u32,
    pub surrogates_enabled: bool,
    pub auto_advance_results: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            countdown_ms: COUNTDOWN_MS,
            description_ms: DESCRIPTION_MS,
            voting_ms: VOTING_MS,
            result_ms: RESULT_MS,
            surrogate_describe_dwell_ms: SURROGATE_DESCRIBE_DWELL_MS,
            surrogate_vote_delay_ms: SURROGATE_VOTE_DELAY_MS,
            num_rounds: NUM_ROUNDS,
            surrogates_enabled: false,
            auto_advance_results: false,
        }
    }
}

impl GameConfig {
    pub fn stage_duration_ms(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Countdown => self.countdown_ms,
            Stage::Describing => self.description_ms,
            Stage::Voting => self.voting_ms,
            Stage::Result => self.result_ms,
        }
    }
}

/// Inbound named actions. Each is validated against the current stage and
/// caller before anything is applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    SetReadyToStart,
    SubmitVote {
        #[serde(rename = "suspectId")]
        suspect_id: ParticipantId,
        round: u32,
    },
    FinishDescribing,
    NextRound,
    SendReaction {
        emoji: String,
    },
    ToggleSurrogates,
    ToggleAutoAdvance,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalScore {
    pub participant_id: ParticipantId,
    pub name: String,
    pub non_impostor: u32,
    pub impostor: u32,
    pub total: u32,
    pub is_surrogate: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub reason: GameOverReason,
    pub winning_team: Option<Team>,
    pub rounds_played: u32,
    pub duration_ms: u64,
    pub final_scores: Vec<FinalScore>,
}

/// Read-only projection of the authoritative state handed to observers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub now_ms: u64,
    pub time_left_ms: Option<u64>,
    pub game_started: bool,
    pub game_over: bool,
    pub round: u32,
    pub num_rounds: u32,
    pub surrogates_enabled: bool,
    pub auto_advance_results: bool,
    pub participants: Vec<Participant>,
    pub round_context: Option<RoundContext>,
    pub current_turn: Option<CurrentTurn>,
    pub votes: Vec<Vote>,
    pub reactions: Vec<Reaction>,
    pub winning_team: Option<Team>,
    pub game_over_reason: Option<GameOverReason>,
    pub final_scores: Vec<FinalScore>,
}

impl Snapshot {
    /// Hides everything that would give the impostor away before the round's
    /// result is shown: other participants' words and roles, and the pair itself.
    pub fn redacted_for(mut self, viewer_id: &str) -> Self {
        let revealed = self.game_over
            || self
                .current_turn
                .as_ref()
                .is_some_and(|turn| turn.stage == Stage::Result);
        if revealed {
            return self;
        }
        for participant in &mut self.participants {
            if participant.id != viewer_id {
                participant.secret_word.clear();
                participant.is_impostor = false;
                participant.description = None;
            }
        }
        if let Some(context) = self.round_context.as_mut() {
            context.current_word.clear();
            context.impostor_word.clear();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_deserializes_from_tagged_json() {
        let action: Action =
            serde_json::from_str(r#"{"type":"submit_vote","suspectId":"p2","round":1}"#)
                .expect("valid action");
        assert_eq!(
            action,
            Action::SubmitVote {
                suspect_id: "p2".to_string(),
                round: 1
            }
        );
    }

    #[test]
    fn score_totals_serialize_with_persisted_field_names() {
        let totals = ScoreTotals {
            non_impostor: 4,
            impostor: 5,
        };
        let value = serde_json::to_value(totals).expect("serializes");
        assert_eq!(value["nonImpostor"], 4);
        assert_eq!(value["impostor"], 5);
        assert_eq!(totals.total(), 9);
    }

    #[test]
    fn game_config_fills_missing_fields_from_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"surrogatesEnabled":true}"#).expect("valid config");
        assert!(config.surrogates_enabled);
        assert_eq!(config.voting_ms, VOTING_MS);
        assert_eq!(config.stage_duration_ms(Stage::Countdown), COUNTDOWN_MS);
    }
}
