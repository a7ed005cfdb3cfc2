//! Session coordination.
//!
//! The coordinator is the glue between a transport (the CLI, a web
//! socket, ...) and a [`DebateSession`]: it applies submitted turns,
//! lets the model speak whenever it holds the floor, requests judging and
//! reports every change through an optional event callback.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::debate_format::{DebatePhase, SpeechType};
use crate::error::DebateError;
use crate::judgment::Judgment;
use crate::orchestrator::SpeechOrchestrator;
use crate::participant::{DebateMode, Difficulty, Side, Speaker};
use crate::session::{DebateSession, SessionId, SessionSnapshot};
use crate::transcript::TranscriptEntry;

/// Callback for debate events.
pub type DebateCallback = Box<dyn Fn(DebateEvent) + Send + Sync>;

/// Events emitted while a session runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DebateEvent {
    /// Phase, turn or speaker changed.
    PhaseUpdated {
        session_id: SessionId,
        phase: DebatePhase,
        turn: u32,
        speaker: Speaker,
    },
    /// A model-delivered speech was recorded.
    AiSpeech {
        session_id: SessionId,
        entry: TranscriptEntry,
    },
    /// The judge answered (or failed to).
    Judgment {
        session_id: SessionId,
        judgment: Judgment,
    },
}

/// A turn as submitted by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSubmission {
    pub speaker: Speaker,
    pub role: Side,
    pub speech_type: SpeechType,
    pub content: String,
}

impl TurnSubmission {
    pub fn new(speaker: Speaker, role: Side, speech_type: SpeechType, content: impl Into<String>) -> Self {
        Self {
            speaker,
            role,
            speech_type,
            content: content.into(),
        }
    }

    /// Build a submission from raw wire strings.
    pub fn parse(
        speaker: &str,
        role: &str,
        speech_type: &str,
        content: impl Into<String>,
    ) -> Result<Self, DebateError> {
        Ok(Self::new(speaker.parse()?, role.parse()?, speech_type.parse()?, content))
    }

    fn into_entry(self) -> TranscriptEntry {
        TranscriptEntry::new(self.speaker, self.role, self.speech_type, self.content)
    }
}

/// What a coordinator call did to the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub snapshot: SessionSnapshot,
    /// Speeches the model delivered during this call, in order.
    pub ai_speeches: Vec<TranscriptEntry>,
    pub judgment: Option<Judgment>,
}

/// Drives sessions: turn application, AI turns and judging.
pub struct SessionCoordinator {
    orchestrator: SpeechOrchestrator,
    crossfire_turns: usize,
    callback: Option<DebateCallback>,
}

impl SessionCoordinator {
    pub fn new(orchestrator: SpeechOrchestrator, crossfire_turns: usize) -> Self {
        Self {
            orchestrator,
            crossfire_turns,
            callback: None,
        }
    }

    /// Set a callback for debate events.
    pub fn with_callback(mut self, callback: DebateCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Open a new round. The human seat always speaks first.
    pub fn start(
        &self,
        resolution: impl Into<String>,
        human_role: Side,
        difficulty: Difficulty,
        mode: DebateMode,
    ) -> DebateSession {
        let session = DebateSession::new(resolution, human_role, difficulty, mode);
        info!(
            session = %session.id(),
            resolution = session.resolution(),
            %human_role,
            %difficulty,
            %mode,
            "debate started"
        );
        self.emit_phase(&session);
        session
    }

    /// Apply a submitted turn, then let the model take any turns it owes.
    ///
    /// A rejected turn leaves the session untouched.
    pub async fn submit_turn(
        &self,
        session: &mut DebateSession,
        submission: TurnSubmission,
    ) -> Result<TurnOutcome, DebateError> {
        let phase = session.phase();
        if let Err(e) = session.apply_turn(submission.into_entry(), self.crossfire_turns) {
            warn!(session = %session.id(), %phase, error = %e, "turn rejected");
            return Err(e);
        }
        self.emit_phase(session);

        let ai_speeches = self.run_ai_turns(session).await?;
        Ok(TurnOutcome {
            snapshot: session.snapshot(),
            ai_speeches,
            judgment: None,
        })
    }

    /// Close the current phase.
    ///
    /// From the last speaking phase this enters `JUDGING` and asks for a
    /// verdict; in `JUDGING` it asks again. Any other phase advances one
    /// step and pending AI turns run. `COMPLETED` is left as is.
    pub async fn end_phase(&self, session: &mut DebateSession) -> Result<TurnOutcome, DebateError> {
        let mut ai_speeches = Vec::new();
        let mut judgment = None;

        match session.phase() {
            DebatePhase::Completed => {}
            DebatePhase::Judging => judgment = Some(self.judge(session).await),
            _ if session.is_last_speaking_phase() => {
                session.advance_phase();
                self.emit_phase(session);
                judgment = Some(self.judge(session).await);
            }
            _ => {
                session.advance_phase();
                self.emit_phase(session);
                ai_speeches = self.run_ai_turns(session).await?;
            }
        }

        Ok(TurnOutcome {
            snapshot: session.snapshot(),
            ai_speeches,
            judgment,
        })
    }

    /// Run whatever AI turns are pending. Starts an AI-vs-AI round.
    pub async fn resume(&self, session: &mut DebateSession) -> Result<TurnOutcome, DebateError> {
        let ai_speeches = self.run_ai_turns(session).await?;
        Ok(TurnOutcome {
            snapshot: session.snapshot(),
            ai_speeches,
            judgment: None,
        })
    }

    async fn judge(&self, session: &mut DebateSession) -> Judgment {
        let judgment = self.orchestrator.generate_judgment(session).await;
        session.set_judgment(judgment.clone());
        self.emit(DebateEvent::Judgment {
            session_id: session.id(),
            judgment: judgment.clone(),
        });

        if judgment.is_verdict() {
            session.advance_phase();
            self.emit_phase(session);
        } else {
            warn!(session = %session.id(), "no verdict, session stays in judging");
        }
        judgment
    }

    async fn run_ai_turns(&self, session: &mut DebateSession) -> Result<Vec<TranscriptEntry>, DebateError> {
        let mut speeches = Vec::new();

        while self.machine_holds_floor(session) {
            if self.close_exhausted_crossfire(session) {
                continue;
            }

            let speech_type = session.expected_speech_type();
            let speaker = session.current_speaker();
            let content = self.orchestrator.generate_speech(session, speech_type).await;
            let entry = TranscriptEntry::new(speaker, session.side_of(speaker), speech_type, content);

            session.apply_turn(entry.clone(), self.crossfire_turns)?;
            self.emit(DebateEvent::AiSpeech {
                session_id: session.id(),
                entry: entry.clone(),
            });
            self.emit_phase(session);
            speeches.push(entry);
        }

        Ok(speeches)
    }

    /// Whether the next speech is the model's to give.
    fn machine_holds_floor(&self, session: &DebateSession) -> bool {
        session.phase().is_speaking()
            && !session.ready_for_judging()
            && (session.mode() == DebateMode::AiVsAi || session.is_ai_turn())
    }

    /// In AI-vs-AI rounds nobody types `/end`, so a crossfire sub-phase
    /// closes itself after `crossfire_turns` exchanges.
    fn close_exhausted_crossfire(&self, session: &mut DebateSession) -> bool {
        let exhausted = session.mode() == DebateMode::AiVsAi
            && session.phase().is_crossfire()
            && session.turns_in_phase() as usize >= self.crossfire_turns;
        if exhausted {
            session.advance_phase();
            self.emit_phase(session);
        }
        exhausted
    }

    fn emit_phase(&self, session: &DebateSession) {
        self.emit(DebateEvent::PhaseUpdated {
            session_id: session.id(),
            phase: session.phase(),
            turn: session.turn_number(),
            speaker: session.current_speaker(),
        });
    }

    /// Emit an event if a callback is registered.
    fn emit(&self, event: DebateEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}
