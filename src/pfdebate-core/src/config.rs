//! Configuration module for loading TOML config files.
//!
//! Every section has defaults, so a config file only needs the keys it
//! changes.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::context::ContextPolicy;
use crate::debate_format::SpeechType;
use crate::error::DebateError;
use crate::participant::{Difficulty, Side};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub models: ModelsConfig,
    pub context: ContextPolicy,
    pub session: SessionConfig,
    pub prompts: PromptsConfig,
}

/// Model endpoints and sampling parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    pub primary: String,
    /// Tried once when the primary model fails.
    pub fallback: String,
    /// Ceiling for a single model call, in seconds.
    pub attempt_timeout_secs: u64,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            primary: "deepseek/deepseek-chat:free".to_string(),
            fallback: "meta-llama/llama-3.3-70b-instruct:free".to_string(),
            attempt_timeout_secs: 60,
            temperature: 0.7,
            top_p: 0.9,
            repetition_penalty: 1.2,
        }
    }
}

/// Turn-taking settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Crossfire entries after which further crossfire belongs to
    /// `CROSSFIRE_2`; also the length of a crossfire between two models.
    pub crossfire_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { crossfire_turns: 4 }
    }
}

/// Per difficulty instructions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DifficultyPrompts {
    pub beginner: String,
    pub intermediate: String,
    pub expert: String,
}

impl Default for DifficultyPrompts {
    fn default() -> Self {
        Self {
            beginner: "Speak in very simple language. Use only 1-2 core arguments. Avoid complex terminology.".to_string(),
            intermediate: "Present clear contentions with warrants and impacts. Focus on logical structure.".to_string(),
            expert: "Use advanced weighing, link chains, and preempt opponent logic. Frame for judges strategically. You are a professional-level debater. Use high-level rhetoric, structure, and strategy to dominate the round.".to_string(),
        }
    }
}

/// Rules and structure hint per speech type.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechPrompts {
    pub constructive: String,
    pub rebuttal: String,
    pub summary: String,
    pub final_focus: String,
    pub crossfire: String,
}

impl Default for SpeechPrompts {
    fn default() -> Self {
        Self {
            constructive: "Structure: [Introduction -> Contentions -> Warrant -> Impact -> Conclusion]".to_string(),
            rebuttal: DEFAULT_REBUTTAL_RULES.to_string(),
            summary: "Structure: [Summarize main arguments -> Highlight key impacts -> Emphasize why you win]".to_string(),
            final_focus: "Structure: [Voting issues -> Extend winning arguments -> Call to decision]".to_string(),
            crossfire: DEFAULT_CROSSFIRE_RULES.to_string(),
        }
    }
}

/// Prompt templates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Placeholders: `{side}`, `{stance}`, `{resolution}`, `{speech_type}`, `{opening}`.
    pub speaker_template: String,
    pub speech_opening: String,
    pub crossfire_opening: String,
    pub speeches: SpeechPrompts,
    pub difficulty: DifficultyPrompts,
    /// Placeholder: `{resolution}`.
    pub judge_template: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            speaker_template: DEFAULT_SPEAKER_TEMPLATE.to_string(),
            speech_opening: "Begin with a brief formal greeting such as 'Honorable judges, esteemed opponents...' then deliver your argument.".to_string(),
            crossfire_opening: "Start immediately - do NOT include greetings or meta-commentary. Respond in 1-3 concise sentences.".to_string(),
            speeches: SpeechPrompts::default(),
            difficulty: DifficultyPrompts::default(),
            judge_template: DEFAULT_JUDGE_TEMPLATE.to_string(),
        }
    }
}

impl PromptsConfig {
    /// System prompt for `side` delivering `speech_type`.
    pub fn speaker_prompt(
        &self,
        resolution: &str,
        side: Side,
        speech_type: SpeechType,
        difficulty: Difficulty,
    ) -> String {
        let opening = if speech_type == SpeechType::Crossfire {
            &self.crossfire_opening
        } else {
            &self.speech_opening
        };

        let base = self
            .speaker_template
            .replace("{side}", side.team_name())
            .replace("{stance}", &side.stance().to_uppercase())
            .replace("{resolution}", resolution)
            .replace("{speech_type}", speech_type.display_name())
            .replace("{opening}", opening);

        format!(
            "{}\n\n{}\n{}",
            base.trim(),
            self.speech_rules(speech_type),
            self.difficulty_instructions(difficulty)
        )
    }

    pub fn judge_prompt(&self, resolution: &str) -> String {
        self.judge_template.replace("{resolution}", resolution)
    }

    /// Constructive rules double as the default for unrecognized speeches.
    fn speech_rules(&self, speech_type: SpeechType) -> &str {
        match speech_type {
            SpeechType::Crossfire => &self.speeches.crossfire,
            SpeechType::Rebuttal => &self.speeches.rebuttal,
            SpeechType::Summary => &self.speeches.summary,
            SpeechType::FinalFocus => &self.speeches.final_focus,
            SpeechType::Constructive | SpeechType::Speech => &self.speeches.constructive,
        }
    }

    fn difficulty_instructions(&self, difficulty: Difficulty) -> &str {
        match difficulty {
            Difficulty::Beginner => &self.difficulty.beginner,
            Difficulty::Intermediate => &self.difficulty.intermediate,
            Difficulty::Expert => &self.difficulty.expert,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Load configuration from string content.
    pub fn from_toml(content: &str) -> Result<Self, DebateError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DebateError> {
        if self.models.primary.trim().is_empty() || self.models.fallback.trim().is_empty() {
            return Err(DebateError::ConfigError(
                "models.primary and models.fallback must both be set".to_string(),
            ));
        }
        if self.models.attempt_timeout_secs == 0 {
            return Err(DebateError::ConfigError(
                "models.attempt_timeout_secs must be positive".to_string(),
            ));
        }
        if self.session.crossfire_turns == 0 {
            return Err(DebateError::ConfigError(
                "session.crossfire_turns must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config::default()
}

const DEFAULT_SPEAKER_TEMPLATE: &str = r#"
You are a competitive debater in a Public Forum Debate. Follow the format of the round.

Your assigned role: {side}
Your position: You must strictly **{stance}** the resolution:
"{resolution}"

You are now delivering your **{speech_type}** speech.

Rules:
- NEVER support the other side, not even partially.
- Do NOT label your speech as 'Pro Rebuttal' or 'Con Constructive'.
- Do NOT say 'as instructed' or include instructions in your response.

{opening}
"#;

const DEFAULT_CROSSFIRE_RULES: &str = r#"- ONLY respond to the opponent's last question or ask one.
- Do not include content from your constructive.
- Do not introduce new arguments.
- Do not include labels or explanations.
Structure: [Short question or concise direct answer (1-3 sentences)]"#;

const DEFAULT_REBUTTAL_RULES: &str = r#"- Refute opponent's previous speech directly.
- Do not repeat your Constructive.
- Do not add brand new arguments.
- Rebuild your side's case and expose flaws in their logic.
Structure: [Summarize opponent -> Refute key points -> Rebuild own case -> Conclusion]"#;

const DEFAULT_JUDGE_TEMPLATE: &str = r#"You are an experienced Public Forum Debate judge.

RESOLUTION: "{resolution}"

Evaluate the round using only what was said in the transcript. Weigh clash,
evidence, extensions and impacts. Do not reward arguments that were dropped.

Reply with ONLY a JSON object, no prose and no markdown, in exactly this shape:
{
  "winner": "pro" or "con",
  "scores": { "pro": <0-100>, "con": <0-100> },
  "reason_for_decision": "<why the winner won>",
  "feedback": { "pro": "<advice for pro>", "con": "<advice for con>" }
}"#;
