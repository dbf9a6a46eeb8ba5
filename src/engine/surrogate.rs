use super::*;
use crate::constants::{
    HUMAN_IMPOSTOR_PREFERENCE, MIN_PARTICIPANTS, SURROGATE_ID_PREFIX,
    SURROGATE_IMPOSTOR_VOTE_PROBABILITY,
};
use crate::words::{surrogate_avatar, surrogate_name};

/// Seats to fill so a lone or paired human can still reach a full game.
pub fn surrogates_needed(human_count: usize, enabled: bool) -> usize {
    if !enabled || human_count == 0 {
        return 0;
    }
    MIN_PARTICIPANTS.saturating_sub(human_count)
}

/// Prefers a human impostor when both kinds of seat are present.
pub fn pick_impostor_index(participants: &[Participant], rng: &mut Rng) -> Option<usize> {
    let (humans, surrogates): (Vec<usize>, Vec<usize>) =
        (0..participants.len()).partition(|index| !participants[*index].is_surrogate);
    let pool = if humans.is_empty() {
        surrogates
    } else if surrogates.is_empty() || rng.bool(HUMAN_IMPOSTOR_PREFERENCE) {
        humans
    } else {
        surrogates
    };
    rng.pick(&pool).copied()
}

/// A non-impostor surrogate names the impostor most of the time and otherwise
/// picks a random other non-impostor. An impostor surrogate deflects onto anyone.
pub fn surrogate_vote(
    voter_id: &str,
    participants: &[Participant],
    rng: &mut Rng,
) -> Option<ParticipantId> {
    let impostor = participants.iter().find(|p| p.is_impostor)?;
    let others: Vec<&Participant> = participants.iter().filter(|p| p.id != voter_id).collect();
    if impostor.id == voter_id {
        return rng.pick(&others).map(|p| p.id.clone());
    }
    if rng.bool(SURROGATE_IMPOSTOR_VOTE_PROBABILITY) {
        return Some(impostor.id.clone());
    }
    let innocents: Vec<&Participant> = others.into_iter().filter(|p| !p.is_impostor).collect();
    match rng.pick(&innocents) {
        Some(p) => Some(p.id.clone()),
        None => Some(impostor.id.clone()),
    }
}

impl GameEngine {
    pub(super) fn fill_with_surrogates(&mut self, count: usize) {
        let mut rng = Rng::new(self.state.session_seed);
        let mut seated = 0;
        while seated < count {
            let index = self.state.next_surrogate_index;
            self.state.next_surrogate_index += 1;
            let id = format!("{SURROGATE_ID_PREFIX}{index}");
            if self.state.participant(&id).is_some() {
                continue;
            }
            seated += 1;
            let name = surrogate_name(index, &mut rng);
            let mut participant = Participant::human(&id, &name, Default::default());
            participant.avatar = Some(surrogate_avatar(&mut rng));
            participant.is_surrogate = true;
            participant.ready_to_start = true;
            tracing::debug!(participant = %id, name = %name, "surrogate seated");
            self.state.participants.push(participant);
        }
    }

    pub(super) fn remove_surrogates(&mut self) {
        self.state.participants.retain(|p| !p.is_surrogate);
    }

    /// A surrogate describer "speaks" its canned line and finishes once the
    /// dwell has passed.
    pub(super) fn drive_surrogate_describer(&mut self) {
        let Some(turn) = self.state.current_turn.as_ref() else {
            return;
        };
        if turn.stage != Stage::Describing {
            return;
        }
        let Some(current) = turn.current_describer_id.clone() else {
            return;
        };
        let elapsed = self.state.now_ms.saturating_sub(turn.timer_started_at_ms);
        let is_surrogate = self.state.participant(&current).is_some_and(|p| p.is_surrogate);
        if !is_surrogate || elapsed < self.state.config.surrogate_describe_dwell_ms {
            return;
        }
        if let Err(error) = self.apply_action(&current, Action::FinishDescribing) {
            tracing::debug!(participant = %current, %error, "surrogate could not finish describing");
        }
    }

    /// Every surrogate that has not voted casts its vote once the delay passes,
    /// through the same path as human votes.
    pub(super) fn drive_surrogate_votes(&mut self) {
        let Some(turn) = self.state.current_turn.as_ref() else {
            return;
        };
        if turn.stage != Stage::Voting {
            return;
        }
        let elapsed = self.state.now_ms.saturating_sub(turn.timer_started_at_ms);
        if elapsed < self.state.config.surrogate_vote_delay_ms {
            return;
        }
        let pending: Vec<ParticipantId> = self
            .state
            .participants
            .iter()
            .filter(|p| p.is_surrogate && !p.voted)
            .map(|p| p.id.clone())
            .collect();
        for voter in pending {
            if self.state.stage() != Some(Stage::Voting) {
                break;
            }
            let state = &mut self.state;
            let Some(suspect) = surrogate_vote(&voter, &state.participants, &mut state.rng) else {
                continue;
            };
            tracing::debug!(participant = %voter, suspect = %suspect, "surrogate vote");
            let round = self.state.round;
            if let Err(error) = self.apply_action(
                &voter,
                Action::SubmitVote {
                    suspect_id: suspect,
                    round,
                },
            ) {
                tracing::debug!(participant = %voter, %error, "surrogate vote rejected");
            }
        }
    }
}
