//! Error types for the debate system.

use thiserror::Error;
use uuid::Uuid;

use crate::debate_format::{DebatePhase, SpeechType};
use crate::participant::{Side, Speaker};

#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Unknown speech type: {0}")]
    UnknownSpeechType(String),

    #[error("Unknown role: {0} (expected pro or con)")]
    UnknownRole(String),

    #[error("Unknown speaker: {0} (expected human or ai)")]
    UnknownSpeaker(String),

    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("Unknown debate mode: {0}")]
    UnknownMode(String),

    #[error("It is the {expected} seat's turn, not the {actual} seat's")]
    OutOfTurn { expected: Speaker, actual: Speaker },

    #[error("The {speaker} seat argues {expected}, but the turn was tagged {actual}")]
    RoleMismatch {
        speaker: Speaker,
        expected: Side,
        actual: Side,
    },

    #[error("A {speech_type} cannot be delivered during {phase}")]
    OutOfOrder {
        speech_type: SpeechType,
        phase: DebatePhase,
    },

    #[error("The debate is no longer accepting turns (phase {0})")]
    NotAcceptingTurns(DebatePhase),

    #[error("Unknown session: {0}")]
    UnknownSession(Uuid),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
