//! Public Forum debate format definitions.
//!
//! The twelve phases of a round, the speech each phase expects, which side
//! it belongs to, and the order the phases run in for a given human side.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DebateError;
use crate::participant::{Side, Speaker};

/// A stage of a debate round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebatePhase {
    ProConstructive,
    ConConstructive,
    #[serde(rename = "CROSSFIRE_1")]
    Crossfire1,
    ProRebuttal,
    ConRebuttal,
    #[serde(rename = "CROSSFIRE_2")]
    Crossfire2,
    ProSummary,
    ConSummary,
    FinalFocusPro,
    FinalFocusCon,
    Judging,
    Completed,
}

/// The kind of speech delivered in a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SpeechType {
    Constructive,
    Rebuttal,
    Summary,
    #[serde(rename = "Final Focus")]
    FinalFocus,
    Crossfire,
    /// Fallback for phases without a speech of their own.
    Speech,
}

/// Static description of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSlot {
    /// Speech expected while the phase is active.
    pub speech_type: SpeechType,
    /// Side whose phase this is; `None` for crossfire, judging and completed.
    pub side: Option<Side>,
}

impl DebatePhase {
    /// All phases in canonical (pro-first) order.
    pub const ALL: [DebatePhase; 12] = [
        DebatePhase::ProConstructive,
        DebatePhase::ConConstructive,
        DebatePhase::Crossfire1,
        DebatePhase::ProRebuttal,
        DebatePhase::ConRebuttal,
        DebatePhase::Crossfire2,
        DebatePhase::ProSummary,
        DebatePhase::ConSummary,
        DebatePhase::FinalFocusPro,
        DebatePhase::FinalFocusCon,
        DebatePhase::Judging,
        DebatePhase::Completed,
    ];

    pub const fn slot(self) -> PhaseSlot {
        use DebatePhase::*;
        let (speech_type, side) = match self {
            ProConstructive => (SpeechType::Constructive, Some(Side::Pro)),
            ConConstructive => (SpeechType::Constructive, Some(Side::Con)),
            Crossfire1 | Crossfire2 => (SpeechType::Crossfire, None),
            ProRebuttal => (SpeechType::Rebuttal, Some(Side::Pro)),
            ConRebuttal => (SpeechType::Rebuttal, Some(Side::Con)),
            ProSummary => (SpeechType::Summary, Some(Side::Pro)),
            ConSummary => (SpeechType::Summary, Some(Side::Con)),
            FinalFocusPro => (SpeechType::FinalFocus, Some(Side::Pro)),
            FinalFocusCon => (SpeechType::FinalFocus, Some(Side::Con)),
            Judging | Completed => (SpeechType::Speech, None),
        };
        PhaseSlot { speech_type, side }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DebatePhase::ProConstructive => "PRO_CONSTRUCTIVE",
            DebatePhase::ConConstructive => "CON_CONSTRUCTIVE",
            DebatePhase::Crossfire1 => "CROSSFIRE_1",
            DebatePhase::ProRebuttal => "PRO_REBUTTAL",
            DebatePhase::ConRebuttal => "CON_REBUTTAL",
            DebatePhase::Crossfire2 => "CROSSFIRE_2",
            DebatePhase::ProSummary => "PRO_SUMMARY",
            DebatePhase::ConSummary => "CON_SUMMARY",
            DebatePhase::FinalFocusPro => "FINAL_FOCUS_PRO",
            DebatePhase::FinalFocusCon => "FINAL_FOCUS_CON",
            DebatePhase::Judging => "JUDGING",
            DebatePhase::Completed => "COMPLETED",
        }
    }

    pub fn is_crossfire(self) -> bool {
        self.slot().speech_type == SpeechType::Crossfire
    }

    /// Whether participants deliver speeches in this phase.
    pub fn is_speaking(self) -> bool {
        !matches!(self, DebatePhase::Judging | DebatePhase::Completed)
    }

    /// The phase in which `side` delivers a speech of `speech_type`.
    ///
    /// Crossfire has two phases and no side, so it has no answer here.
    pub fn for_speech(speech_type: SpeechType, side: Side) -> Option<DebatePhase> {
        use DebatePhase::*;
        let phase = match (speech_type, side) {
            (SpeechType::Constructive, Side::Pro) => ProConstructive,
            (SpeechType::Constructive, Side::Con) => ConConstructive,
            (SpeechType::Rebuttal, Side::Pro) => ProRebuttal,
            (SpeechType::Rebuttal, Side::Con) => ConRebuttal,
            (SpeechType::Summary, Side::Pro) => ProSummary,
            (SpeechType::Summary, Side::Con) => ConSummary,
            (SpeechType::FinalFocus, Side::Pro) => FinalFocusPro,
            (SpeechType::FinalFocus, Side::Con) => FinalFocusCon,
            (SpeechType::Crossfire | SpeechType::Speech, _) => return None,
        };
        Some(phase)
    }
}

impl fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SpeechType {
    pub fn display_name(&self) -> &str {
        match self {
            SpeechType::Constructive => "Constructive",
            SpeechType::Rebuttal => "Rebuttal",
            SpeechType::Summary => "Summary",
            SpeechType::FinalFocus => "Final Focus",
            SpeechType::Crossfire => "Crossfire",
            SpeechType::Speech => "Speech",
        }
    }
}

impl fmt::Display for SpeechType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SpeechType {
    type Err = DebateError;

    /// Parses a speech delivered by a participant. The `Speech` placeholder
    /// is not something anyone delivers, so it is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "constructive" => Ok(SpeechType::Constructive),
            "rebuttal" => Ok(SpeechType::Rebuttal),
            "summary" => Ok(SpeechType::Summary),
            "final focus" | "final_focus" => Ok(SpeechType::FinalFocus),
            "crossfire" => Ok(SpeechType::Crossfire),
            _ => Err(DebateError::UnknownSpeechType(s.to_string())),
        }
    }
}

/// Phase order for a round in which the human argues `human_role`.
///
/// With the human on pro this is the canonical order. With the human on
/// con every pro/con pair is swapped, so the human always opens the pair.
pub fn phase_order(human_role: Side) -> [DebatePhase; 12] {
    let mut order = DebatePhase::ALL;
    if human_role == Side::Con {
        for pair in [(0, 1), (3, 4), (6, 7), (8, 9)] {
            order.swap(pair.0, pair.1);
        }
    }
    order
}

/// Who speaks once `phase` becomes active.
///
/// Sided phases go to whoever holds that side. Crossfire alternates: the
/// seat that did not speak last opens it. The AI judges.
pub fn speaker_for_phase(phase: DebatePhase, human_role: Side, current_speaker: Speaker) -> Speaker {
    match phase.slot().side {
        Some(side) if side == human_role => Speaker::Human,
        Some(_) => Speaker::Ai,
        None if phase.is_crossfire() => current_speaker.opposite(),
        None if phase == DebatePhase::Judging => Speaker::Ai,
        None => current_speaker,
    }
}

/// Speech type expected while `phase` is active.
pub fn expected_speech_type(phase: DebatePhase) -> SpeechType {
    phase.slot().speech_type
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pro_order_is_canonical() {
        assert_eq!(phase_order(Side::Pro), DebatePhase::ALL);
    }

    #[test]
    fn test_con_order_swaps_sided_pairs() {
        let order = phase_order(Side::Con);
        assert_eq!(order[0], DebatePhase::ConConstructive);
        assert_eq!(order[1], DebatePhase::ProConstructive);
        assert_eq!(order[2], DebatePhase::Crossfire1);
        assert_eq!(order[3], DebatePhase::ConRebuttal);
        assert_eq!(order[4], DebatePhase::ProRebuttal);
        assert_eq!(order[5], DebatePhase::Crossfire2);
        assert_eq!(order[8], DebatePhase::FinalFocusCon);
        assert_eq!(order[9], DebatePhase::FinalFocusPro);
        assert_eq!(order[10], DebatePhase::Judging);
        assert_eq!(order[11], DebatePhase::Completed);
    }

    #[test]
    fn test_human_holds_the_same_slots_on_either_side() {
        for human_role in [Side::Pro, Side::Con] {
            let speakers: Vec<Speaker> = phase_order(human_role)
                .iter()
                .filter(|p| p.slot().side.is_some())
                .map(|p| speaker_for_phase(*p, human_role, Speaker::Ai))
                .collect();
            assert_eq!(
                speakers,
                [Speaker::Human, Speaker::Ai].repeat(4),
                "human on {human_role}"
            );
        }
    }

    #[test]
    fn test_crossfire_speaker_alternates_from_previous() {
        assert_eq!(
            speaker_for_phase(DebatePhase::Crossfire1, Side::Pro, Speaker::Ai),
            Speaker::Human
        );
        assert_eq!(
            speaker_for_phase(DebatePhase::Crossfire2, Side::Pro, Speaker::Human),
            Speaker::Ai
        );
    }

    #[test]
    fn test_judging_belongs_to_ai() {
        assert_eq!(
            speaker_for_phase(DebatePhase::Judging, Side::Con, Speaker::Human),
            Speaker::Ai
        );
    }

    #[test]
    fn test_expected_speech_types() {
        assert_eq!(expected_speech_type(DebatePhase::Crossfire2), SpeechType::Crossfire);
        assert_eq!(expected_speech_type(DebatePhase::ConRebuttal), SpeechType::Rebuttal);
        assert_eq!(expected_speech_type(DebatePhase::ProSummary), SpeechType::Summary);
        assert_eq!(expected_speech_type(DebatePhase::FinalFocusCon), SpeechType::FinalFocus);
        assert_eq!(expected_speech_type(DebatePhase::ProConstructive), SpeechType::Constructive);
        assert_eq!(expected_speech_type(DebatePhase::Judging), SpeechType::Speech);
    }

    #[test]
    fn test_for_speech_round_trips_sided_phases() {
        for phase in DebatePhase::ALL {
            if let Some(side) = phase.slot().side {
                assert_eq!(DebatePhase::for_speech(phase.slot().speech_type, side), Some(phase));
            }
        }
        assert_eq!(DebatePhase::for_speech(SpeechType::Crossfire, Side::Pro), None);
    }

    #[test]
    fn test_speech_type_parsing() {
        assert_eq!("final focus".parse::<SpeechType>().unwrap(), SpeechType::FinalFocus);
        assert_eq!("Final_Focus".parse::<SpeechType>().unwrap(), SpeechType::FinalFocus);
        assert_eq!("CROSSFIRE".parse::<SpeechType>().unwrap(), SpeechType::Crossfire);
        assert!("speech".parse::<SpeechType>().is_err());
        assert!("closing".parse::<SpeechType>().is_err());
    }

    #[test]
    fn test_phase_serializes_by_name() {
        for phase in DebatePhase::ALL {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{}\"", phase.name()));
        }
        let json = serde_json::to_string(&SpeechType::FinalFocus).unwrap();
        assert_eq!(json, "\"Final Focus\"");
    }
}
