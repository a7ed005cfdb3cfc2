//! Append-only record of the speeches delivered in a round.

use serde::{Deserialize, Serialize};

use crate::debate_format::SpeechType;
use crate::participant::{Side, Speaker};

/// A single delivered speech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Seat that delivered the speech.
    pub speaker: Speaker,
    /// Side the speech argued.
    pub role: Side,
    pub speech_type: SpeechType,
    pub content: String,
}

impl TranscriptEntry {
    pub fn new(
        speaker: Speaker,
        role: Side,
        speech_type: SpeechType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            speaker,
            role,
            speech_type,
            content: content.into(),
        }
    }

    pub fn is_crossfire(&self) -> bool {
        self.speech_type == SpeechType::Crossfire
    }

    /// Render as `<role> (<speech_type>): <content>`.
    pub fn render(&self) -> String {
        format!("{} ({}): {}", self.role, self.speech_type, self.content)
    }
}

/// Chronological, append-only log of entries.
///
/// Entries cannot be edited or removed once pushed; insertion order is
/// the order the context builder relies on.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn crossfire_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_crossfire()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.append(TranscriptEntry::new(
            Speaker::Human,
            Side::Pro,
            SpeechType::Constructive,
            "first",
        ));
        transcript.append(TranscriptEntry::new(
            Speaker::Ai,
            Side::Con,
            SpeechType::Constructive,
            "second",
        ));

        let contents: Vec<&str> = transcript
            .entries()
            .iter()
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(contents, ["first", "second"]);
        assert_eq!(transcript.last().unwrap().speaker, Speaker::Ai);
    }

    #[test]
    fn test_crossfire_count() {
        let mut transcript = Transcript::new();
        transcript.append(TranscriptEntry::new(
            Speaker::Human,
            Side::Pro,
            SpeechType::Constructive,
            "case",
        ));
        for speaker in [Speaker::Human, Speaker::Ai, Speaker::Human] {
            let role = if speaker == Speaker::Human { Side::Pro } else { Side::Con };
            transcript.append(TranscriptEntry::new(speaker, role, SpeechType::Crossfire, "q"));
        }
        assert_eq!(transcript.crossfire_count(), 3);
        assert_eq!(transcript.len(), 4);
    }

    #[test]
    fn test_render_uses_role_and_speech_type() {
        let entry = TranscriptEntry::new(
            Speaker::Ai,
            Side::Con,
            SpeechType::FinalFocus,
            "Vote con.",
        );
        assert_eq!(entry.render(), "Con (Final Focus): Vote con.");
    }
}
