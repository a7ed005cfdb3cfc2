//! Debate session state.
//!
//! A `DebateSession` owns one round: who argues what, the current phase,
//! turn and speaker, and the transcript. All state changes go through
//! `apply_turn` and `advance_phase`, so the phase order and the terminal
//! state hold no matter what the models return.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::debate_format::{
    self, DebatePhase, SpeechType, phase_order, speaker_for_phase,
};
use crate::error::DebateError;
use crate::judgment::Judgment;
use crate::participant::{DebateMode, Difficulty, Side, Speaker};
use crate::transcript::{Transcript, TranscriptEntry};

pub type SessionId = Uuid;

/// State of a single debate round.
#[derive(Debug, Clone)]
pub struct DebateSession {
    id: SessionId,
    resolution: String,
    human_role: Side,
    ai_role: Side,
    difficulty: Difficulty,
    mode: DebateMode,
    order: [DebatePhase; 12],
    phase: DebatePhase,
    /// 1-based number of the next turn within the current phase.
    turn_number: u32,
    current_speaker: Speaker,
    transcript: Transcript,
    judgment: Option<Judgment>,
}

/// Serializable view of a session handed to the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub resolution: String,
    pub phase: DebatePhase,
    pub turn: u32,
    pub speaker: Speaker,
    pub human_role: Side,
    pub ai_role: Side,
    pub difficulty: Difficulty,
    pub mode: DebateMode,
    pub transcript: Vec<TranscriptEntry>,
    pub judgment: Option<Judgment>,
}

impl DebateSession {
    pub fn new(
        resolution: impl Into<String>,
        human_role: Side,
        difficulty: Difficulty,
        mode: DebateMode,
    ) -> Self {
        let order = phase_order(human_role);
        let phase = order[0];
        Self {
            id: Uuid::new_v4(),
            resolution: resolution.into(),
            human_role,
            ai_role: human_role.opposite(),
            difficulty,
            mode,
            order,
            phase,
            turn_number: 1,
            current_speaker: speaker_for_phase(phase, human_role, Speaker::Ai),
            transcript: Transcript::new(),
            judgment: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn resolution(&self) -> &str {
        &self.resolution
    }

    pub fn human_role(&self) -> Side {
        self.human_role
    }

    pub fn ai_role(&self) -> Side {
        self.ai_role
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn mode(&self) -> DebateMode {
        self.mode
    }

    pub fn phase(&self) -> DebatePhase {
        self.phase
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn current_speaker(&self) -> Speaker {
        self.current_speaker
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn judgment(&self) -> Option<&Judgment> {
        self.judgment.as_ref()
    }

    pub fn phase_order(&self) -> &[DebatePhase] {
        &self.order
    }

    /// Side argued by the given seat.
    pub fn side_of(&self, speaker: Speaker) -> Side {
        match speaker {
            Speaker::Human => self.human_role,
            Speaker::Ai => self.ai_role,
        }
    }

    /// Side of whoever holds the floor.
    pub fn current_side(&self) -> Side {
        self.side_of(self.current_speaker)
    }

    pub fn is_ai_turn(&self) -> bool {
        self.current_speaker == Speaker::Ai
    }

    pub fn expected_speech_type(&self) -> SpeechType {
        debate_format::expected_speech_type(self.phase)
    }

    /// Turns already taken in the current phase.
    pub fn turns_in_phase(&self) -> u32 {
        self.turn_number - 1
    }

    pub fn next_phase(&self) -> Option<DebatePhase> {
        self.order.get(self.phase_index(self.phase) + 1).copied()
    }

    /// Whether the current phase is the last one with speeches.
    pub fn is_last_speaking_phase(&self) -> bool {
        self.next_phase() == Some(DebatePhase::Judging)
    }

    /// The final speech is in and the round waits for `end_phase`.
    pub fn ready_for_judging(&self) -> bool {
        self.is_last_speaking_phase() && self.turns_in_phase() > 0
    }

    /// Move to the next phase in this session's order.
    ///
    /// Resets the turn counter and recomputes the speaker. Does nothing
    /// once the round is completed.
    pub fn advance_phase(&mut self) {
        let Some(next) = self.next_phase() else {
            return;
        };
        let from = self.phase;
        self.phase = next;
        self.turn_number = 1;
        self.current_speaker = speaker_for_phase(next, self.human_role, self.current_speaker);
        debug!(
            session = %self.id,
            %from,
            to = %next,
            speaker = %self.current_speaker,
            "phase advanced"
        );
    }

    /// Record a delivered speech and move the round along.
    ///
    /// The turn is validated first and nothing changes if it is rejected.
    /// Crossfire turns hand the floor to the other seat and may move
    /// `CROSSFIRE_1` to `CROSSFIRE_2` once `crossfire_threshold` crossfire
    /// entries exist. Other speeches must belong to the current phase, or,
    /// during crossfire, to the phase right after it; they advance past
    /// that phase, except in the last speaking phase, which is only left
    /// through `end_phase`.
    pub fn apply_turn(
        &mut self,
        entry: TranscriptEntry,
        crossfire_threshold: usize,
    ) -> Result<(), DebateError> {
        let target = self.validate_turn(&entry, crossfire_threshold)?;
        let speaker = entry.speaker;
        let is_crossfire = entry.is_crossfire();

        self.transcript.append(entry);

        if target != self.phase {
            debug!(session = %self.id, from = %self.phase, to = %target, "turn moved phase");
            self.phase = target;
            self.turn_number = 1;
        }

        if is_crossfire {
            self.turn_number += 1;
            self.current_speaker = speaker.opposite();
        } else if self.is_last_speaking_phase() {
            self.turn_number += 1;
        } else {
            self.advance_phase();
        }
        Ok(())
    }

    /// Phase the turn will be recorded in, or why it is rejected.
    fn validate_turn(
        &self,
        entry: &TranscriptEntry,
        crossfire_threshold: usize,
    ) -> Result<DebatePhase, DebateError> {
        if !self.phase.is_speaking() || self.ready_for_judging() {
            return Err(DebateError::NotAcceptingTurns(self.phase));
        }
        if entry.speaker != self.current_speaker {
            return Err(DebateError::OutOfTurn {
                expected: self.current_speaker,
                actual: entry.speaker,
            });
        }
        let seat_side = self.side_of(entry.speaker);
        if entry.role != seat_side {
            return Err(DebateError::RoleMismatch {
                speaker: entry.speaker,
                expected: seat_side,
                actual: entry.role,
            });
        }

        let out_of_order = || DebateError::OutOfOrder {
            speech_type: entry.speech_type,
            phase: self.phase,
        };

        let target = match entry.speech_type {
            SpeechType::Crossfire if self.phase.is_crossfire() => {
                if self.phase == DebatePhase::Crossfire1
                    && self.transcript.crossfire_count() >= crossfire_threshold
                {
                    DebatePhase::Crossfire2
                } else {
                    self.phase
                }
            }
            SpeechType::Crossfire => return Err(out_of_order()),
            speech_type => DebatePhase::for_speech(speech_type, entry.role).ok_or_else(out_of_order)?,
        };

        // Only crossfire may be left by delivering the speech that follows it.
        let leaves_crossfire = self.phase.is_crossfire() && self.next_phase() == Some(target);
        if target != self.phase && target != DebatePhase::Crossfire2 && !leaves_crossfire {
            return Err(out_of_order());
        }
        Ok(target)
    }

    pub(crate) fn set_judgment(&mut self, judgment: Judgment) {
        self.judgment = Some(judgment);
    }

    fn phase_index(&self, phase: DebatePhase) -> usize {
        self.order.iter().position(|p| *p == phase).unwrap_or(0)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            resolution: self.resolution.clone(),
            phase: self.phase,
            turn: self.turn_number,
            speaker: self.current_speaker,
            human_role: self.human_role,
            ai_role: self.ai_role,
            difficulty: self.difficulty,
            mode: self.mode,
            transcript: self.transcript.entries().to_vec(),
            judgment: self.judgment.clone(),
        }
    }
}
