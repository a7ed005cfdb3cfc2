//! PF Debate Core Library
//!
//! Runs Public Forum debate rounds between a human and a language model
//! (or two models): phase and turn tracking, context selection, speech and
//! judgment generation with a fallback model, and session coordination.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod debate_format;
pub mod error;
pub mod judgment;
pub mod llm;
pub mod orchestrator;
pub mod participant;
pub mod registry;
pub mod session;
pub mod sse;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use coordinator::{DebateCallback, DebateEvent, SessionCoordinator, TurnOutcome, TurnSubmission};
pub use debate_format::{DebatePhase, SpeechType};
pub use error::DebateError;
pub use judgment::{Judgment, JudgmentFailure, JudgmentFailureKind, Verdict};
pub use llm::{ChatMessage, LanguageModel, MessageRole, ModelError, OpenAiCompatibleClient};
pub use orchestrator::{SPEECH_FAILURE_SENTINEL, SpeechOrchestrator};
pub use participant::{DebateMode, Difficulty, Side, Speaker};
pub use registry::SessionRegistry;
pub use session::{DebateSession, SessionId, SessionSnapshot};
pub use transcript::{Transcript, TranscriptEntry};
