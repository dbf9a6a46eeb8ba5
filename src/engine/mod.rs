use crate::constants::{MAX_PARTICIPANTS, SURROGATE_ID_PREFIX};
use crate::error::ActionError;
use crate::reactions::ReactionFeed;
use crate::rng::Rng;
use crate::score_store::ScoreStore;
use crate::types::{
    Action, CurrentTurn, FinalScore, GameConfig, GameOverReason, GameSummary, Participant,
    ParticipantId, RoundContext, Snapshot, Stage, Team, Vote,
};

mod disconnect;
mod lifecycle;
pub mod rotation;
pub mod scoring;
mod surrogate;
pub mod voting;

pub use self::surrogate::{pick_impostor_index, surrogate_vote, surrogates_needed};

/// The single authoritative state object. Every transition function receives
/// it (or one of its parts) explicitly.
#[derive(Clone, Debug)]
pub struct GameState {
    pub config: GameConfig,
    pub session_seed: u32,
    pub rng: Rng,
    pub now_ms: u64,
    pub participants: Vec<Participant>,
    pub game_started: bool,
    pub game_over: bool,
    pub round: u32,
    pub round_context: Option<RoundContext>,
    pub current_turn: Option<CurrentTurn>,
    pub votes: Vec<Vote>,
    pub reactions: ReactionFeed,
    pub winning_team: Option<Team>,
    pub game_over_reason: Option<GameOverReason>,
    pub final_scores: Vec<FinalScore>,
    pub next_surrogate_index: usize,
}

impl GameState {
    pub fn new(seed: u32, config: GameConfig) -> Self {
        Self {
            config,
            session_seed: seed,
            rng: Rng::new(seed),
            now_ms: 0,
            participants: Vec::new(),
            game_started: false,
            game_over: false,
            round: 0,
            round_context: None,
            current_turn: None,
            votes: Vec::new(),
            reactions: ReactionFeed::default(),
            winning_team: None,
            game_over_reason: None,
            final_scores: Vec::new(),
            next_surrogate_index: 1,
        }
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn stage(&self) -> Option<Stage> {
        self.current_turn.as_ref().map(|turn| turn.stage)
    }

    pub fn impostor(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_impostor)
    }

    pub fn human_count(&self) -> usize {
        self.participants.iter().filter(|p| !p.is_surrogate).count()
    }
}

pub struct GameEngine {
    state: GameState,
    store: Box<dyn ScoreStore>,
}

impl GameEngine {
    pub fn new(seed: u32, config: GameConfig, store: Box<dyn ScoreStore>) -> Self {
        Self {
            state: GameState::new(seed, config),
            store,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn store(&self) -> &dyn ScoreStore {
        self.store.as_ref()
    }

    pub fn now_ms(&self) -> u64 {
        self.state.now_ms
    }

    pub fn is_ended(&self) -> bool {
        self.state.game_over
    }

    /// Advances the game clock and runs every time-driven transition.
    pub fn step(&mut self, dt_ms: u64) {
        self.state.now_ms = self.state.now_ms.saturating_add(dt_ms);
        self.update();
    }

    pub fn participant_joined(&mut self, id: &str, name: &str) -> Result<(), ActionError> {
        if self.state.game_started {
            return Err(ActionError::GameAlreadyStarted);
        }
        if id.starts_with(SURROGATE_ID_PREFIX) {
            return Err(ActionError::ReservedParticipantId(id.to_string()));
        }
        if self.state.participant(id).is_some() {
            return Err(ActionError::DuplicateParticipant(id.to_string()));
        }
        if self.state.participants.len() >= MAX_PARTICIPANTS {
            return Err(ActionError::RosterFull);
        }
        let score = self.store.load(id).unwrap_or_default();
        tracing::info!(
            participant = id,
            non_impostor = score.non_impostor,
            impostor = score.impostor,
            "participant joined"
        );
        self.state
            .participants
            .push(Participant::human(id, name, score));
        Ok(())
    }

    /// Entry point for actions arriving from outside the core. Surrogate seats
    /// are driven internally and cannot be impersonated.
    pub fn apply(&mut self, caller: &str, action: Action) -> Result<(), ActionError> {
        if self.state.participant(caller).is_some_and(|p| p.is_surrogate) {
            return Err(ActionError::SurrogateSeat(caller.to_string()));
        }
        self.apply_action(caller, action)
    }

    fn apply_action(&mut self, caller: &str, action: Action) -> Result<(), ActionError> {
        if self.state.participant(caller).is_none() {
            return Err(ActionError::UnknownParticipant(caller.to_string()));
        }
        let result = match action {
            Action::SetReadyToStart => self.set_ready_to_start(caller),
            Action::SubmitVote { suspect_id, round } => self.submit_vote(caller, &suspect_id, round),
            Action::FinishDescribing => self.finish_describing(caller),
            Action::NextRound => self.next_round(),
            Action::SendReaction { emoji } => self.send_reaction(caller, &emoji),
            Action::ToggleSurrogates => self.toggle(|config| {
                config.surrogates_enabled = !config.surrogates_enabled;
            }),
            Action::ToggleAutoAdvance => self.toggle(|config| {
                config.auto_advance_results = !config.auto_advance_results;
            }),
        };
        if let Err(error) = &result {
            tracing::debug!(participant = caller, %error, "action rejected");
        }
        result
    }

    fn toggle(&mut self, flip: impl FnOnce(&mut GameConfig)) -> Result<(), ActionError> {
        if self.state.game_started {
            return Err(ActionError::GameAlreadyStarted);
        }
        flip(&mut self.state.config);
        Ok(())
    }

    fn send_reaction(&mut self, caller: &str, emoji: &str) -> Result<(), ActionError> {
        if let Some(turn) = self.state.current_turn.as_ref() {
            if turn.stage == Stage::Describing && turn.current_describer_id.as_deref() == Some(caller)
            {
                return Err(ActionError::SelfReaction);
            }
        }
        let now_ms = self.state.now_ms;
        self.state.reactions.push(caller, emoji, now_ms)
    }

    pub fn build_snapshot(&self) -> Snapshot {
        let state = &self.state;
        let time_left_ms = state.current_turn.as_ref().map(|turn| {
            let elapsed = state.now_ms.saturating_sub(turn.timer_started_at_ms);
            state
                .config
                .stage_duration_ms(turn.stage)
                .saturating_sub(elapsed)
        });
        Snapshot {
            now_ms: state.now_ms,
            time_left_ms,
            game_started: state.game_started,
            game_over: state.game_over,
            round: state.round,
            num_rounds: state.config.num_rounds,
            surrogates_enabled: state.config.surrogates_enabled,
            auto_advance_results: state.config.auto_advance_results,
            participants: state.participants.clone(),
            round_context: state.round_context.clone(),
            current_turn: state.current_turn.clone(),
            votes: state.votes.clone(),
            reactions: state.reactions.snapshot(),
            winning_team: state.winning_team,
            game_over_reason: state.game_over_reason,
            final_scores: state.final_scores.clone(),
        }
    }

    pub fn build_summary(&self) -> Option<GameSummary> {
        let reason = self.state.game_over_reason?;
        Some(GameSummary {
            reason,
            winning_team: self.state.winning_team,
            rounds_played: self.state.round + 1,
            duration_ms: self.state.now_ms,
            final_scores: self.state.final_scores.clone(),
        })
    }

    fn persist_scores(&mut self) {
        let entries: Vec<_> = self
            .state
            .participants
            .iter()
            .filter(|p| !p.is_surrogate)
            .map(|p| (p.id.clone(), p.score))
            .collect();
        if let Err(error) = self.store.record(&entries) {
            tracing::warn!(%error, "failed to persist scores");
        }
    }
}
