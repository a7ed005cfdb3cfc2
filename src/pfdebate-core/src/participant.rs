//! Participant definitions.
//!
//! Sides of the resolution, the two seats at the table, AI difficulty
//! tiers and the debate mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DebateError;

/// Side of the resolution a participant argues.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Arguing in favor of the resolution.
    Pro,
    /// Arguing against the resolution.
    Con,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Pro => Side::Con,
            Side::Con => Side::Pro,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Side::Pro => "Pro",
            Side::Con => "Con",
        }
    }

    /// Team name used when addressing the model.
    pub fn team_name(&self) -> &str {
        match self {
            Side::Pro => "PROPOSITION",
            Side::Con => "OPPOSITION",
        }
    }

    /// Verb describing what this side does to the resolution.
    pub fn stance(&self) -> &str {
        match self {
            Side::Pro => "support",
            Side::Con => "oppose",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Side {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pro" => Ok(Side::Pro),
            "con" => Ok(Side::Con),
            _ => Err(DebateError::UnknownRole(s.to_string())),
        }
    }
}

/// One of the two seats at the table.
///
/// In AI-vs-AI mode the human seat is played by a model as well; the seat
/// still decides which side speaks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Human,
    Ai,
}

impl Speaker {
    pub fn opposite(self) -> Self {
        match self {
            Speaker::Human => Speaker::Ai,
            Speaker::Ai => Speaker::Human,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Human => f.write_str("human"),
            Speaker::Ai => f.write_str("ai"),
        }
    }
}

impl FromStr for Speaker {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "human" | "user" => Ok(Speaker::Human),
            "ai" => Ok(Speaker::Ai),
            _ => Err(DebateError::UnknownSpeaker(s.to_string())),
        }
    }
}

/// How hard the AI debater argues.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Expert,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => f.write_str("beginner"),
            Difficulty::Intermediate => f.write_str("intermediate"),
            Difficulty::Expert => f.write_str("expert"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "expert" => Ok(Difficulty::Expert),
            _ => Err(DebateError::UnknownDifficulty(s.to_string())),
        }
    }
}

/// Who occupies the two seats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DebateMode {
    #[serde(rename = "human-vs-ai", alias = "user-vs-ai")]
    HumanVsAi,
    #[serde(rename = "ai-vs-ai")]
    AiVsAi,
}

impl fmt::Display for DebateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebateMode::HumanVsAi => f.write_str("human-vs-ai"),
            DebateMode::AiVsAi => f.write_str("ai-vs-ai"),
        }
    }
}

impl FromStr for DebateMode {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "human-vs-ai" | "user-vs-ai" => Ok(DebateMode::HumanVsAi),
            "ai-vs-ai" => Ok(DebateMode::AiVsAi),
            _ => Err(DebateError::UnknownMode(s.to_string())),
        }
    }
}
