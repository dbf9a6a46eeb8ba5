pub const TICK_RATE: u32 = 10;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const MIN_PARTICIPANTS: usize = 3;
pub const MAX_PARTICIPANTS: usize = 6;
pub const NUM_ROUNDS: u32 = 3;

pub const COUNTDOWN_MS: u64 = 3_000;
pub const DESCRIPTION_MS: u64 = 15_000;
pub const VOTING_MS: u64 = 15_000;
pub const RESULT_MS: u64 = 15_000;

pub const CATCH_POINTS: u32 = 1;
pub const CORRECT_GUESS_POINTS: u32 = 3;
pub const SURVIVE_POINTS: u32 = 5;

pub const SURROGATE_DESCRIBE_DWELL_MS: u64 = 4_000;
pub const SURROGATE_VOTE_DELAY_MS: u64 = 3_000;
pub const SURROGATE_IMPOSTOR_VOTE_PROBABILITY: f32 = 0.6;
pub const HUMAN_IMPOSTOR_PREFERENCE: f32 = 0.7;
pub const SURROGATE_ID_PREFIX: &str = "bot-";

pub const MAX_REACTIONS: usize = 20;
pub const REACTION_COOLDOWN_MS: u64 = 2_000;
pub const MAX_EMOJI_CHARS: usize = 16;

/// Votes needed for an accusation to count as a catch.
pub fn majority_threshold(total_votes: usize) -> usize {
    total_votes.div_ceil(2)
}
