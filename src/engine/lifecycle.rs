use super::*;
use crate::constants::{MAX_PARTICIPANTS, MIN_PARTICIPANTS};
use crate::engine::rotation::RotationStep;
use crate::rng::round_seed;
use crate::words::{pick_word_pair, shuffled_order, surrogate_description};

impl GameEngine {
    pub(super) fn set_ready_to_start(&mut self, caller: &str) -> Result<(), ActionError> {
        if self.state.game_started {
            return Err(ActionError::GameAlreadyStarted);
        }
        if let Some(participant) = self.state.participants.iter_mut().find(|p| p.id == caller) {
            participant.ready_to_start = true;
        }
        self.start_game_check();
        Ok(())
    }

    /// Starts once every human is ready and the roster, including surrogates
    /// about to be seated, reaches the minimum.
    pub(super) fn start_game_check(&mut self) {
        if self.state.game_started || self.state.game_over {
            return;
        }
        let humans = self.state.human_count();
        if humans == 0 {
            return;
        }
        let all_ready = self
            .state
            .participants
            .iter()
            .filter(|p| !p.is_surrogate)
            .all(|p| p.ready_to_start);
        if !all_ready {
            return;
        }
        let needed = surrogates_needed(humans, self.state.config.surrogates_enabled);
        let total = self.state.participants.len() + needed;
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&total) {
            return;
        }

        self.fill_with_surrogates(needed);
        self.state.game_started = true;
        self.state.round = 0;
        tracing::info!(
            participants = self.state.participants.len(),
            surrogates = needed,
            "game started"
        );
        self.start_new_round();
    }

    pub(super) fn start_new_round(&mut self) {
        let state = &mut self.state;
        let seed = round_seed(state.session_seed, state.round);
        state.rng = Rng::new(seed);

        for participant in &mut state.participants {
            participant.describing = false;
            participant.is_impostor = false;
            participant.voted = false;
            participant.latest_round_score = 0;
            participant.description = None;
        }

        let pair = pick_word_pair(&mut state.rng);
        let impostor_index = pick_impostor_index(&state.participants, &mut state.rng);
        for (index, participant) in state.participants.iter_mut().enumerate() {
            participant.is_impostor = Some(index) == impostor_index;
            participant.secret_word = if participant.is_impostor {
                pair.impostor.clone()
            } else {
                pair.main.clone()
            };
        }
        for participant in state.participants.iter_mut().filter(|p| p.is_surrogate) {
            participant.description =
                Some(surrogate_description(&participant.secret_word, &mut state.rng));
        }

        let ids: Vec<ParticipantId> = state.participants.iter().map(|p| p.id.clone()).collect();
        let order = shuffled_order(&ids, &mut state.rng);
        state.round_context = Some(RoundContext {
            round: state.round,
            seed,
            current_word: pair.main,
            impostor_word: pair.impostor,
        });
        state.current_turn = Some(CurrentTurn {
            stage: Stage::Countdown,
            timer_started_at_ms: state.now_ms,
            next_describer_id: order.first().cloned(),
            description_order: order,
            current_describer_id: None,
            previous_describer_id: None,
            completed_describers: Vec::new(),
            voting_complete: false,
            impostor_caught: false,
            remaining_participants: state.participants.len(),
        });
        state.votes.clear();
        state.reactions.clear();
        tracing::info!(round = state.round, seed, "round started");
    }

    /// Tick-driven transitions. Every branch re-reads the stage so a
    /// transition made earlier in the same tick is respected.
    pub(super) fn update(&mut self) {
        if !self.state.game_started || self.state.game_over {
            return;
        }
        let Some(stage) = self.state.stage() else {
            return;
        };
        match stage {
            Stage::Countdown => {
                if self.stage_elapsed(Stage::Countdown) {
                    self.enter_describing();
                }
            }
            Stage::Describing => {
                self.drive_surrogate_describer();
                if self.stage_elapsed(Stage::Describing) {
                    if let Some(id) = self.current_describer() {
                        tracing::debug!(participant = %id, "describer timed out");
                    }
                    self.advance_describer();
                }
            }
            Stage::Voting => {
                self.drive_surrogate_votes();
                if self.stage_elapsed(Stage::Voting) {
                    self.enter_result();
                }
            }
            Stage::Result => {
                if self.state.config.auto_advance_results && self.stage_elapsed(Stage::Result) {
                    if let Err(error) = self.next_round() {
                        tracing::debug!(%error, "auto advance skipped");
                    }
                }
            }
        }
    }

    fn stage_elapsed(&self, stage: Stage) -> bool {
        let state = &self.state;
        if state.game_over {
            return false;
        }
        match state.current_turn.as_ref() {
            Some(turn) if turn.stage == stage => {
                state.now_ms.saturating_sub(turn.timer_started_at_ms)
                    >= state.config.stage_duration_ms(stage)
            }
            _ => false,
        }
    }

    fn current_describer(&self) -> Option<ParticipantId> {
        self.state
            .current_turn
            .as_ref()
            .and_then(|turn| turn.current_describer_id.clone())
    }

    fn enter_describing(&mut self) {
        let state = &mut self.state;
        let Some(turn) = state.current_turn.as_mut() else {
            return;
        };
        turn.stage = Stage::Describing;
        turn.timer_started_at_ms = state.now_ms;
        state.reactions.clear();
        let step = rotation::begin(turn, &mut state.participants);
        tracing::info!(round = state.round, "describing started");
        if step == RotationStep::Done {
            self.enter_voting();
        }
    }

    pub(super) fn finish_describing(&mut self, caller: &str) -> Result<(), ActionError> {
        self.require_stage(Stage::Describing)?;
        if self.current_describer().as_deref() != Some(caller) {
            return Err(ActionError::NotYourTurn);
        }
        self.advance_describer();
        Ok(())
    }

    pub(super) fn advance_describer(&mut self) {
        let state = &mut self.state;
        let Some(turn) = state.current_turn.as_mut() else {
            return;
        };
        match rotation::advance(turn, &mut state.participants) {
            RotationStep::Next(_) => self.describer_changed(),
            RotationStep::Done => self.enter_voting(),
        }
    }

    pub(super) fn describer_changed(&mut self) {
        let now_ms = self.state.now_ms;
        if let Some(turn) = self.state.current_turn.as_mut() {
            turn.timer_started_at_ms = now_ms;
            tracing::debug!(
                describer = turn.current_describer_id.as_deref().unwrap_or_default(),
                completed = turn.completed_describers.len(),
                "next describer"
            );
        }
        self.state.reactions.clear();
    }

    pub(super) fn enter_voting(&mut self) {
        let state = &mut self.state;
        let Some(turn) = state.current_turn.as_mut() else {
            return;
        };
        turn.stage = Stage::Voting;
        turn.timer_started_at_ms = state.now_ms;
        turn.current_describer_id = None;
        turn.next_describer_id = None;
        rotation::set_describing(&mut state.participants, None);
        state.reactions.clear();
        tracing::info!(round = state.round, "voting started");
    }

    pub(super) fn submit_vote(
        &mut self,
        caller: &str,
        suspect_id: &str,
        round: u32,
    ) -> Result<(), ActionError> {
        self.require_stage(Stage::Voting)?;
        if round != self.state.round {
            return Err(ActionError::RoundMismatch {
                expected: self.state.round,
                got: round,
            });
        }
        if self.state.participant(caller).is_some_and(|p| p.voted) {
            return Err(ActionError::AlreadyVoted);
        }
        if suspect_id == caller || self.state.participant(suspect_id).is_none() {
            return Err(ActionError::InvalidSuspect(suspect_id.to_string()));
        }

        if let Some(participant) = self.state.participants.iter_mut().find(|p| p.id == caller) {
            participant.voted = true;
        }
        self.state.votes.push(Vote {
            voter_id: caller.to_string(),
            suspect_id: suspect_id.to_string(),
            round,
        });
        if voting::all_voted(&self.state.participants) {
            self.enter_result();
        }
        Ok(())
    }

    /// Resolves the round once. A second call for the same round is a no-op.
    pub(super) fn enter_result(&mut self) {
        let state = &mut self.state;
        let Some(turn) = state.current_turn.as_mut() else {
            return;
        };
        if turn.voting_complete {
            return;
        }
        let resolution = voting::resolve_votes(&state.participants, &state.votes, state.round);
        let deltas = scoring::score_deltas(&state.participants, &resolution);
        scoring::apply_deltas(&mut state.participants, &deltas);

        turn.voting_complete = true;
        turn.impostor_caught = resolution.impostor_caught;
        turn.stage = Stage::Result;
        turn.timer_started_at_ms = state.now_ms;
        turn.current_describer_id = None;
        turn.next_describer_id = None;
        rotation::set_describing(&mut state.participants, None);
        state.reactions.clear();
        tracing::info!(
            round = state.round,
            total_votes = resolution.total_votes,
            accused = resolution.accused.as_deref().unwrap_or_default(),
            caught = resolution.impostor_caught,
            "round resolved"
        );

        let caught = resolution.impostor_caught;
        let remaining = state.participants.len();
        self.persist_scores();
        if caught {
            self.finish_game(GameOverReason::ImpostorCaught, Team::NonImpostors);
        } else if remaining <= 2 {
            self.finish_game(GameOverReason::ImpostorSurvived, Team::Impostor);
        }
    }

    pub(super) fn next_round(&mut self) -> Result<(), ActionError> {
        self.require_stage(Stage::Result)?;
        if self.state.round + 1 >= self.state.config.num_rounds {
            self.finish_game(GameOverReason::RoundsExhausted, Team::Impostor);
            return Ok(());
        }
        self.state.round += 1;
        self.start_new_round();
        Ok(())
    }

    fn require_stage(&self, expected: Stage) -> Result<(), ActionError> {
        if self.state.game_over {
            return Err(ActionError::GameOver);
        }
        if !self.state.game_started {
            return Err(ActionError::GameNotStarted);
        }
        let actual = self.state.stage();
        if actual != Some(expected) {
            return Err(ActionError::WrongStage { expected, actual });
        }
        Ok(())
    }

    pub(super) fn finish_game(&mut self, reason: GameOverReason, winning_team: Team) {
        if self.state.game_over {
            return;
        }
        let state = &mut self.state;
        state.game_over = true;
        state.game_over_reason = Some(reason);
        state.winning_team = Some(winning_team);
        rotation::set_describing(&mut state.participants, None);
        if let Some(turn) = state.current_turn.as_mut() {
            turn.current_describer_id = None;
            turn.next_describer_id = None;
        }
        state.final_scores = scoring::final_scores(&state.participants);
        tracing::info!(
            ?reason,
            ?winning_team,
            rounds = state.round + 1,
            "game over"
        );
        self.persist_scores();
    }

    /// Back to the pre-game lobby: surrogates leave, readiness and round state
    /// are dropped, and scores are re-read from the store.
    pub fn reset_to_lobby(&mut self) {
        self.remove_surrogates();
        for index in 0..self.state.participants.len() {
            let score = self
                .store
                .load(&self.state.participants[index].id)
                .unwrap_or_default();
            let participant = &mut self.state.participants[index];
            participant.ready_to_start = false;
            participant.describing = false;
            participant.is_impostor = false;
            participant.secret_word.clear();
            participant.voted = false;
            participant.latest_round_score = 0;
            participant.description = None;
            participant.score = score;
        }
        let state = &mut self.state;
        state.game_started = false;
        state.game_over = false;
        state.round = 0;
        state.round_context = None;
        state.current_turn = None;
        state.votes.clear();
        state.reactions.reset();
        state.winning_team = None;
        state.game_over_reason = None;
        state.final_scores.clear();
        tracing::info!(participants = state.participants.len(), "back to lobby");
    }
}
