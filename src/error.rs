use crate::types::{ParticipantId, Stage};

/// Why an action or roster event was refused. A rejection never mutates state;
/// the caller resubmits against the latest snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    #[error("surrogate seat {0} cannot submit actions")]
    SurrogateSeat(ParticipantId),

    #[error("game has not started")]
    GameNotStarted,

    #[error("game already started")]
    GameAlreadyStarted,

    #[error("game is over")]
    GameOver,

    #[error("action requires stage {expected:?}, current stage is {actual:?}")]
    WrongStage {
        expected: Stage,
        actual: Option<Stage>,
    },

    #[error("vote is for round {got}, current round is {expected}")]
    RoundMismatch { expected: u32, got: u32 },

    #[error("participant already voted this round")]
    AlreadyVoted,

    #[error("invalid suspect {0}")]
    InvalidSuspect(ParticipantId),

    #[error("it is not this participant's turn to describe")]
    NotYourTurn,

    #[error("the current describer cannot react")]
    SelfReaction,

    #[error("reaction throttled, retry in {retry_in_ms} ms")]
    Throttled { retry_in_ms: u64 },

    #[error("reaction emoji is empty or too long")]
    InvalidEmoji,

    #[error("participant {0} is already in the room")]
    DuplicateParticipant(ParticipantId),

    #[error("room is full")]
    RosterFull,

    #[error("participant id {0} is reserved for surrogates")]
    ReservedParticipantId(ParticipantId),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode score file: {0}")]
    Encode(#[from] serde_json::Error),
}
