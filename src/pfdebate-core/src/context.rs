//! Context window selection.
//!
//! Picks the slice of the transcript a model sees before delivering its
//! next speech. Each speech category gets its own window:
//!
//! - crossfire: the latest run of crossfire exchanges (or an excerpt of the
//!   opponent's last case when crossfire has just opened), then the
//!   opponent's latest crossfire line repeated last;
//! - rebuttal: the last few speeches, with constructives shortened;
//! - everything else: the last few speeches verbatim.
//!
//! Entries argued by the speaking side are tagged `assistant`, everything
//! else `user`, so the model can tell itself from its opponent.

use serde::{Deserialize, Serialize};

use crate::debate_format::SpeechType;
use crate::llm::{ChatMessage, MessageRole};
use crate::participant::Side;
use crate::transcript::TranscriptEntry;

/// Appended to text cut by [`truncate_at_word`].
pub const ELLIPSIS: &str = "...";

/// Window sizes and truncation limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextPolicy {
    /// Crossfire entries collected at most.
    pub crossfire_window: usize,
    /// Characters kept from the opponent's case when crossfire opens.
    pub crossfire_excerpt_chars: usize,
    /// Repeat the opponent's latest crossfire line as the final message,
    /// even when it is already part of the window.
    pub repeat_latest_opponent_crossfire: bool,
    pub rebuttal_window: usize,
    /// Characters kept from each constructive inside a rebuttal window.
    pub rebuttal_constructive_chars: usize,
    pub default_window: usize,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self {
            crossfire_window: 4,
            crossfire_excerpt_chars: 100,
            repeat_latest_opponent_crossfire: true,
            rebuttal_window: 5,
            rebuttal_constructive_chars: 200,
            default_window: 6,
        }
    }
}

/// Build the context messages for `speaker_side` about to deliver `speech_type`.
pub fn build_context(
    transcript: &[TranscriptEntry],
    speech_type: SpeechType,
    speaker_side: Side,
    policy: &ContextPolicy,
) -> Vec<ChatMessage> {
    match speech_type {
        SpeechType::Crossfire => crossfire_context(transcript, speaker_side, policy),
        SpeechType::Rebuttal => rebuttal_context(transcript, speaker_side, policy),
        _ => tail(transcript, policy.default_window)
            .iter()
            .map(|entry| tagged(entry, speaker_side, entry.content.clone()))
            .collect(),
    }
}

/// Entries are told apart by side, so in AI-vs-AI rounds the opening
/// excerpt is whichever case the speaking side has to answer.
fn crossfire_context(
    transcript: &[TranscriptEntry],
    speaker_side: Side,
    policy: &ContextPolicy,
) -> Vec<ChatMessage> {
    let mut collected: Vec<&TranscriptEntry> = Vec::new();
    let mut excerpt: Option<String> = None;

    for entry in transcript.iter().rev() {
        if collected.len() >= policy.crossfire_window {
            break;
        }
        if entry.is_crossfire() {
            collected.push(entry);
            continue;
        }
        let opens_crossfire = collected.is_empty()
            && entry.role != speaker_side
            && matches!(
                entry.speech_type,
                SpeechType::Constructive | SpeechType::Rebuttal
            );
        if opens_crossfire {
            excerpt = Some(truncate_at_word(
                &entry.content,
                policy.crossfire_excerpt_chars,
            ));
        }
        break;
    }
    collected.reverse();

    let mut messages: Vec<ChatMessage> = Vec::with_capacity(collected.len() + 1);
    if let Some(excerpt) = excerpt {
        messages.push(ChatMessage::new(MessageRole::User, excerpt));
    }
    messages.extend(
        collected
            .iter()
            .map(|entry| tagged(entry, speaker_side, entry.content.clone())),
    );

    // Deliberately not deduplicated: the opponent's latest line goes last
    // even if it is already in the window.
    if policy.repeat_latest_opponent_crossfire {
        if let Some(latest) = collected.iter().rev().find(|e| e.role != speaker_side) {
            messages.push(ChatMessage::new(MessageRole::User, latest.content.clone()));
        }
    }
    messages
}

fn rebuttal_context(
    transcript: &[TranscriptEntry],
    speaker_side: Side,
    policy: &ContextPolicy,
) -> Vec<ChatMessage> {
    tail(transcript, policy.rebuttal_window)
        .iter()
        .map(|entry| {
            let content = if entry.speech_type == SpeechType::Constructive {
                truncate_at_word(&entry.content, policy.rebuttal_constructive_chars)
            } else {
                entry.content.clone()
            };
            tagged(entry, speaker_side, content)
        })
        .collect()
}

fn tail(transcript: &[TranscriptEntry], window: usize) -> &[TranscriptEntry] {
    &transcript[transcript.len().saturating_sub(window)..]
}

fn tagged(entry: &TranscriptEntry, speaker_side: Side, content: String) -> ChatMessage {
    let role = if entry.role == speaker_side {
        MessageRole::Assistant
    } else {
        MessageRole::User
    };
    ChatMessage::new(role, content)
}

/// Shorten `text` to at most `limit` characters, cutting at the last
/// whitespace inside the limit and appending [`ELLIPSIS`]. Text within the limit is
/// returned unchanged. A single word longer than the limit is cut hard.
pub fn truncate_at_word(text: &str, limit: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(limit) else {
        return text.to_string();
    };
    let prefix = &text[..cut];
    let kept = match prefix.rfind(char::is_whitespace) {
        Some(space) => prefix[..space].trim_end(),
        None => prefix,
    };
    format!("{}{}", kept, ELLIPSIS)
}
