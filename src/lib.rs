//! Authoritative core for a hidden-role word game: one impostor holds a
//! different secret word and the others try to vote them out.

pub mod constants;
pub mod engine;
pub mod error;
pub mod reactions;
pub mod rng;
pub mod score_store;
pub mod server_protocol;
pub mod server_utils;
pub mod types;
pub mod words;

pub use engine::{GameEngine, GameState};
pub use error::{ActionError, StoreError};
pub use score_store::{JsonScoreStore, MemoryScoreStore, ScoreStore};
