use super::*;
use crate::constants::MIN_PARTICIPANTS;
use crate::engine::rotation::{PruneOutcome, RotationStep};

impl GameEngine {
    /// Removes a departed participant and repairs whatever the round was doing.
    /// Returns false when the id was not on the roster.
    pub fn participant_left(&mut self, participant_id: &str) -> bool {
        let Some(index) = self
            .state
            .participants
            .iter()
            .position(|p| p.id == participant_id)
        else {
            return false;
        };
        let departed = self.state.participants.remove(index);
        self.state.reactions.forget(participant_id);
        tracing::info!(
            participant = participant_id,
            remaining = self.state.participants.len(),
            "participant left"
        );

        if !self.state.game_started {
            self.start_game_check();
            return true;
        }
        if self.state.game_over {
            return true;
        }

        let state = &mut self.state;
        let round = state.round;
        state
            .votes
            .retain(|vote| !(vote.round == round && vote.voter_id == participant_id));
        let remaining = state.participants.len();
        let Some(turn) = state.current_turn.as_mut() else {
            return true;
        };
        turn.remaining_participants = remaining;
        let stage = turn.stage;
        let pruned = rotation::prune(turn, &mut state.participants, participant_id);

        if remaining < MIN_PARTICIPANTS {
            self.roster_collapsed(&departed, stage);
            return true;
        }
        if departed.is_impostor && stage != Stage::Result {
            let deltas = scoring::catch_bonus(&self.state.participants);
            scoring::apply_deltas(&mut self.state.participants, &deltas);
            self.finish_game(GameOverReason::ImpostorLeft, Team::NonImpostors);
            return true;
        }

        match (stage, pruned) {
            (Stage::Describing, PruneOutcome::CurrentReplaced(RotationStep::Next(_))) => {
                self.describer_changed();
            }
            (Stage::Describing, PruneOutcome::CurrentReplaced(RotationStep::Done)) => {
                self.enter_voting();
            }
            (Stage::Voting, _) => {
                if voting::all_voted(&self.state.participants) {
                    self.enter_result();
                }
            }
            _ => {}
        }
        true
    }

    /// Fewer than the minimum remain. Mid-resolution stages go back to the
    /// lobby after the awards are persisted; earlier stages end the game.
    fn roster_collapsed(&mut self, departed: &Participant, stage: Stage) {
        let (deltas, reason, team) = if departed.is_impostor {
            (
                scoring::catch_bonus(&self.state.participants),
                GameOverReason::ImpostorLeft,
                Team::NonImpostors,
            )
        } else if self.state.participants.len() == 2 {
            (
                scoring::survive_bonus(&self.state.participants),
                GameOverReason::RosterCollapse,
                Team::Impostor,
            )
        } else {
            (
                Default::default(),
                GameOverReason::RosterCollapse,
                Team::Impostor,
            )
        };
        scoring::apply_deltas(&mut self.state.participants, &deltas);

        match stage {
            Stage::Voting | Stage::Result => {
                tracing::info!(?stage, "roster collapsed mid-resolution");
                self.persist_scores();
                self.reset_to_lobby();
            }
            Stage::Countdown | Stage::Describing => {
                self.finish_game(reason, team);
            }
        }
    }
}
