use std::collections::{HashMap, VecDeque};

use crate::constants::{MAX_EMOJI_CHARS, MAX_REACTIONS, REACTION_COOLDOWN_MS};
use crate::error::ActionError;
use crate::types::Reaction;

#[derive(Clone, Copy, Debug)]
pub struct ReactionFeedOptions {
    pub capacity: usize,
    pub cooldown_ms: u64,
}

impl Default for ReactionFeedOptions {
    fn default() -> Self {
        Self {
            capacity: MAX_REACTIONS,
            cooldown_ms: REACTION_COOLDOWN_MS,
        }
    }
}

/// Cosmetic emoji channel: keeps the most recent reactions and throttles each
/// participant. Nothing in round resolution reads from it.
#[derive(Clone, Debug)]
pub struct ReactionFeed {
    options: ReactionFeedOptions,
    reactions: VecDeque<Reaction>,
    last_sent_by: HashMap<String, u64>,
}

impl Default for ReactionFeed {
    fn default() -> Self {
        Self::new(ReactionFeedOptions::default())
    }
}

impl ReactionFeed {
    pub fn new(options: ReactionFeedOptions) -> Self {
        Self {
            options,
            reactions: VecDeque::new(),
            last_sent_by: HashMap::new(),
        }
    }

    /// Checks the emoji and cooldown without recording anything.
    pub fn check(&self, participant_id: &str, emoji: &str, now_ms: u64) -> Result<(), ActionError> {
        let trimmed = emoji.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_EMOJI_CHARS {
            return Err(ActionError::InvalidEmoji);
        }
        if let Some(last) = self.last_sent_by.get(participant_id) {
            let elapsed = now_ms.saturating_sub(*last);
            if elapsed < self.options.cooldown_ms {
                return Err(ActionError::Throttled {
                    retry_in_ms: self.options.cooldown_ms - elapsed,
                });
            }
        }
        Ok(())
    }

    pub fn push(&mut self, participant_id: &str, emoji: &str, now_ms: u64) -> Result<(), ActionError> {
        self.check(participant_id, emoji, now_ms)?;
        self.last_sent_by.insert(participant_id.to_string(), now_ms);
        while self.reactions.len() >= self.options.capacity {
            self.reactions.pop_front();
        }
        self.reactions.push_back(Reaction {
            participant_id: participant_id.to_string(),
            emoji: emoji.trim().to_string(),
            timestamp_ms: now_ms,
        });
        Ok(())
    }

    /// Drops visible reactions; cooldowns survive so clearing cannot be used
    /// to dodge the throttle.
    pub fn clear(&mut self) {
        self.reactions.clear();
    }

    pub fn forget(&mut self, participant_id: &str) {
        self.last_sent_by.remove(participant_id);
        self.reactions
            .retain(|reaction| reaction.participant_id != participant_id);
    }

    pub fn reset(&mut self) {
        self.reactions.clear();
        self.last_sent_by.clear();
    }

    pub fn snapshot(&self) -> Vec<Reaction> {
        self.reactions.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
}
