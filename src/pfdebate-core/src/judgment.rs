//! Verdict types and parsing of the judge's reply.

use serde::{Deserialize, Serialize};

use crate::participant::Side;

/// Structured outcome of a judged round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub winner: Side,
    pub pro_score: u8,
    pub con_score: u8,
    pub reason_for_decision: String,
    pub pro_feedback: String,
    pub con_feedback: String,
}

/// Why judging produced no verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgmentFailureKind {
    /// Neither model answered.
    ModelUnavailable,
    /// A model answered, but not with a usable verdict.
    MalformedVerdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentFailure {
    pub kind: JudgmentFailureKind,
    pub message: String,
}

/// Result of asking the judge for a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Judgment {
    Verdict(Verdict),
    Failed(JudgmentFailure),
}

impl Judgment {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            Judgment::Verdict(verdict) => Some(verdict),
            Judgment::Failed(_) => None,
        }
    }

    pub fn is_verdict(&self) -> bool {
        self.verdict().is_some()
    }
}

#[derive(Deserialize)]
struct RawVerdict {
    winner: String,
    scores: RawSides<f64>,
    reason_for_decision: String,
    feedback: RawSides<String>,
}

#[derive(Deserialize)]
struct RawSides<T> {
    pro: T,
    con: T,
}

/// Parse the judge's reply into a verdict.
///
/// The reply may wrap the JSON object in a code fence or prose.
pub fn parse_verdict(reply: &str) -> Result<Verdict, String> {
    let json = extract_json_object(reply).ok_or("reply contains no JSON object")?;
    let raw: RawVerdict =
        serde_json::from_str(json).map_err(|e| format!("verdict JSON is invalid: {}", e))?;

    let winner = raw
        .winner
        .parse::<Side>()
        .map_err(|_| format!("winner must be pro or con, got '{}'", raw.winner))?;

    Ok(Verdict {
        winner,
        pro_score: score(raw.scores.pro, "pro")?,
        con_score: score(raw.scores.con, "con")?,
        reason_for_decision: raw.reason_for_decision,
        pro_feedback: raw.feedback.pro,
        con_feedback: raw.feedback.con,
    })
}

fn score(value: f64, side: &str) -> Result<u8, String> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(format!("{} score {} is outside 0-100", side, value));
    }
    Ok(value.round() as u8)
}

/// Slice from the first `{` to the last `}`.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
