//! Speech generation.
//!
//! Builds the prompt for each AI speech, streams it from the primary
//! model and falls back to the secondary model once if the primary fails.
//! Also asks the judge for the end-of-round verdict.
//!
//! Nothing here mutates the session: callers record the returned speech
//! and drive the phase transitions.

use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use futures::StreamExt;
use regex::Regex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::{Config, PromptsConfig};
use crate::context::{ContextPolicy, build_context};
use crate::debate_format::SpeechType;
use crate::judgment::{Judgment, JudgmentFailure, JudgmentFailureKind, Verdict, parse_verdict};
use crate::llm::{ChatMessage, LanguageModel, ModelError};
use crate::session::DebateSession;
use crate::sse::StreamEvent;

/// Returned by [`SpeechOrchestrator::generate_speech`] when both models fail.
pub const SPEECH_FAILURE_SENTINEL: &str = "LLM error: Unable to generate speech.";

/// Generates AI speeches and judgments with a primary/fallback model pair.
pub struct SpeechOrchestrator {
    model: Arc<dyn LanguageModel>,
    primary: String,
    fallback: String,
    attempt_timeout: Duration,
    context_policy: ContextPolicy,
    prompts: PromptsConfig,
}

impl SpeechOrchestrator {
    pub fn new(model: Arc<dyn LanguageModel>, config: &Config) -> Self {
        Self {
            model,
            primary: config.models.primary.clone(),
            fallback: config.models.fallback.clone(),
            attempt_timeout: Duration::from_secs(config.models.attempt_timeout_secs),
            context_policy: config.context.clone(),
            prompts: config.prompts.clone(),
        }
    }

    /// Override the per-attempt time limit.
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// System prompt plus context window for the side holding the floor.
    pub fn speech_messages(&self, session: &DebateSession, speech_type: SpeechType) -> Vec<ChatMessage> {
        let side = session.current_side();
        let system_prompt = self.prompts.speaker_prompt(
            session.resolution(),
            side,
            speech_type,
            session.difficulty(),
        );

        let mut messages = vec![ChatMessage::system(system_prompt)];
        messages.extend(build_context(
            session.transcript().entries(),
            speech_type,
            side,
            &self.context_policy,
        ));
        messages
    }

    /// Generate the next speech for whoever holds the floor.
    ///
    /// Never fails: if both models fail, returns [`SPEECH_FAILURE_SENTINEL`].
    pub async fn generate_speech(&self, session: &DebateSession, speech_type: SpeechType) -> String {
        let messages = self.speech_messages(session, speech_type);
        debug!(
            session = %session.id(),
            %speech_type,
            messages = messages.len(),
            "generating speech"
        );

        match self
            .with_fallback("speech", |model| self.stream_speech(model, &messages))
            .await
        {
            Ok(speech) => speech,
            Err(e) => {
                error!(session = %session.id(), %speech_type, error = %e, "speech generation failed on both models");
                SPEECH_FAILURE_SENTINEL.to_string()
            }
        }
    }

    /// Ask the judge for a verdict over the whole transcript.
    pub async fn generate_judgment(&self, session: &DebateSession) -> Judgment {
        let messages = self.judgment_messages(session);

        match self
            .with_fallback("judgment", |model| self.request_verdict(model, &messages))
            .await
        {
            Ok(verdict) => {
                info!(
                    session = %session.id(),
                    winner = %verdict.winner,
                    pro = verdict.pro_score,
                    con = verdict.con_score,
                    "round judged"
                );
                Judgment::Verdict(verdict)
            }
            Err(e) => {
                let kind = match e {
                    ModelError::Malformed(_) => JudgmentFailureKind::MalformedVerdict,
                    _ => JudgmentFailureKind::ModelUnavailable,
                };
                error!(session = %session.id(), error = %e, "judging failed on both models");
                Judgment::Failed(JudgmentFailure {
                    kind,
                    message: e.to_string(),
                })
            }
        }
    }

    fn judgment_messages(&self, session: &DebateSession) -> Vec<ChatMessage> {
        let transcript = session
            .transcript()
            .entries()
            .iter()
            .map(|entry| entry.render())
            .collect::<Vec<_>>()
            .join("\n");

        vec![
            ChatMessage::system(self.prompts.judge_prompt(session.resolution())),
            ChatMessage::user(format!("Full debate transcript:\n\n{}", transcript)),
        ]
    }

    /// Run `call` against the primary model, then once against the
    /// fallback if the primary attempt fails or times out.
    async fn with_fallback<T, F, Fut>(&self, task: &str, call: F) -> Result<T, ModelError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        debug!(task, model = %self.primary, attempt = 1, "calling model");
        let primary_error = match self.attempt(call(self.primary.clone())).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        warn!(
            task,
            primary = %self.primary,
            fallback = %self.fallback,
            error = %primary_error,
            "primary model failed, retrying on fallback"
        );

        debug!(task, model = %self.fallback, attempt = 2, "calling model");
        self.attempt(call(self.fallback.clone())).await
    }

    async fn attempt<T>(&self, call: impl Future<Output = Result<T, ModelError>>) -> Result<T, ModelError> {
        timeout(self.attempt_timeout, call)
            .await
            .map_err(|_| ModelError::Timeout(self.attempt_timeout))?
    }

    async fn stream_speech(&self, model: String, messages: &[ChatMessage]) -> Result<String, ModelError> {
        let mut stream = self.model.stream_complete(&model, messages).await?;
        let mut text = String::new();
        let mut skipped = 0usize;

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::Delta(delta) => text.push_str(&delta),
                StreamEvent::Malformed { line, reason } => {
                    skipped += 1;
                    warn!(%model, %reason, %line, "skipping malformed stream fragment");
                }
                StreamEvent::Done => break,
            }
        }

        let speech = sanitize_response(&text);
        if speech.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        debug!(%model, chars = speech.len(), skipped, "speech streamed");
        Ok(speech)
    }

    async fn request_verdict(&self, model: String, messages: &[ChatMessage]) -> Result<Verdict, ModelError> {
        let reply = self.model.complete(&model, messages).await?;
        parse_verdict(&reply).map_err(ModelError::Malformed)
    }
}

/// Tags some models wrap their private reasoning in.
const REASONING_TAGS: [&str; 11] = [
    "thinking",
    "think",
    "reflection",
    "reflect",
    "internal",
    "reasoning",
    "thought",
    "scratch",
    "scratchpad",
    "plan",
    "analysis",
];

/// One `<tag ...>...</tag>` block pattern per reasoning tag.
static REASONING_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    REASONING_TAGS
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).ok())
        .collect()
});

/// Lone opening or closing reasoning tags, e.g. from a truncated block.
static ORPHAN_REASONING_TAGS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)</?(?:{})\b[^>]*>", REASONING_TAGS.join("|"))).ok()
});

/// Strip reasoning blocks some models emit around their answer.
///
/// Removes patterns like <thinking>...</thinking>, <reflection>...</reflection>, etc.
/// Any other angle brackets are argument text and stay.
fn sanitize_response(response: &str) -> String {
    let mut result = response.to_string();

    for re in REASONING_BLOCKS.iter() {
        result = re.replace_all(&result, "").into_owned();
    }
    if let Some(orphan_re) = ORPHAN_REASONING_TAGS.as_ref() {
        result = orphan_re.replace_all(&result, "").into_owned();
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;
    use crate::participant::{DebateMode, Difficulty, Side, Speaker};
    use crate::testing::{Script, ScriptedModel};
    use crate::transcript::TranscriptEntry;

    const VERDICT: &str = r#"{"winner":"pro","scores":{"pro":88,"con":80},"reason_for_decision":"Pro weighed better.","feedback":{"pro":"Good.","con":"Extend more."}}"#;

    fn config() -> Config {
        let mut config = Config::default();
        config.models.primary = "primary".into();
        config.models.fallback = "fallback".into();
        config
    }

    fn orchestrator(model: &Arc<ScriptedModel>) -> SpeechOrchestrator {
        let model: Arc<dyn LanguageModel> = model.clone();
        SpeechOrchestrator::new(model, &config())
    }

    /// Human on pro has given a constructive; the AI (con) holds the floor.
    fn session_awaiting_ai() -> DebateSession {
        let mut session =
            DebateSession::new("X", Side::Pro, Difficulty::Intermediate, DebateMode::HumanVsAi);
        session
            .apply_turn(
                TranscriptEntry::new(Speaker::Human, Side::Pro, SpeechType::Constructive, "Pro case."),
                4,
            )
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_primary_speech_is_accumulated() {
        let model = Arc::new(ScriptedModel::new().with(
            "primary",
            Script::Stream(vec![
                StreamEvent::Delta("Honorable judges, ".into()),
                StreamEvent::Delta("we negate.".into()),
                StreamEvent::Done,
                StreamEvent::Delta("after done".into()),
            ]),
        ));

        let speech = orchestrator(&model)
            .generate_speech(&session_awaiting_ai(), SpeechType::Constructive)
            .await;
        assert_eq!(speech, "Honorable judges, we negate.");
        assert_eq!(model.called_models(), ["primary"]);
    }

    #[tokio::test]
    async fn test_malformed_fragments_are_skipped() {
        let model = Arc::new(ScriptedModel::new().with(
            "primary",
            Script::Stream(vec![
                StreamEvent::Delta("First. ".into()),
                StreamEvent::Malformed {
                    line: "{bad".into(),
                    reason: "EOF".into(),
                },
                StreamEvent::Delta("Second.".into()),
                StreamEvent::Done,
            ]),
        ));

        let speech = orchestrator(&model)
            .generate_speech(&session_awaiting_ai(), SpeechType::Constructive)
            .await;
        assert_eq!(speech, "First. Second.");
    }

    #[tokio::test]
    async fn test_fallback_text_is_returned_when_primary_status_fails() {
        let model = Arc::new(
            ScriptedModel::new()
                .with("primary", Script::Status(429))
                .with("fallback", Script::speech("Fallback speech.")),
        );

        let speech = orchestrator(&model)
            .generate_speech(&session_awaiting_ai(), SpeechType::Constructive)
            .await;
        assert_eq!(speech, "Fallback speech.");
        assert_eq!(model.called_models(), ["primary", "fallback"]);
    }

    #[tokio::test]
    async fn test_broken_primary_stream_falls_back() {
        let model = Arc::new(
            ScriptedModel::new()
                .with("primary", Script::Broken)
                .with("fallback", Script::speech("Recovered.")),
        );

        let speech = orchestrator(&model)
            .generate_speech(&session_awaiting_ai(), SpeechType::Constructive)
            .await;
        assert_eq!(speech, "Recovered.");
    }

    #[tokio::test]
    async fn test_empty_primary_reply_falls_back() {
        let model = Arc::new(
            ScriptedModel::new()
                .with("primary", Script::Stream(vec![StreamEvent::Done]))
                .with("fallback", Script::speech("Non-empty.")),
        );

        let speech = orchestrator(&model)
            .generate_speech(&session_awaiting_ai(), SpeechType::Constructive)
            .await;
        assert_eq!(speech, "Non-empty.");
    }

    #[tokio::test]
    async fn test_sentinel_when_both_models_fail() {
        let model = Arc::new(
            ScriptedModel::new()
                .with("primary", Script::Status(500))
                .with("fallback", Script::Broken),
        );

        let speech = orchestrator(&model)
            .generate_speech(&session_awaiting_ai(), SpeechType::Constructive)
            .await;
        assert_eq!(speech, SPEECH_FAILURE_SENTINEL);
        assert_eq!(model.called_models().len(), 2);
    }

    #[tokio::test]
    async fn test_hung_primary_times_out_and_falls_back() {
        let model = Arc::new(
            ScriptedModel::new()
                .with("primary", Script::Hang)
                .with("fallback", Script::speech("In time.")),
        );
        let orchestrator = orchestrator(&model).with_attempt_timeout(Duration::from_millis(50));

        let speech = orchestrator
            .generate_speech(&session_awaiting_ai(), SpeechType::Constructive)
            .await;
        assert_eq!(speech, "In time.");
    }

    #[tokio::test]
    async fn test_speech_messages_start_with_system_prompt() {
        let model = Arc::new(ScriptedModel::new().with("primary", Script::speech("ok")));
        let orchestrator = orchestrator(&model);
        let session = session_awaiting_ai();

        orchestrator.generate_speech(&session, SpeechType::Constructive).await;
        let messages = model.last_messages();
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("OPPOSITION"));
        assert_eq!(messages[1], ChatMessage::user("Pro case."));
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn test_judgment_from_primary() {
        let model = Arc::new(ScriptedModel::new().with("primary", Script::Reply(VERDICT.into())));
        let session = session_awaiting_ai();

        let judgment = orchestrator(&model).generate_judgment(&session).await;
        let verdict = judgment.verdict().expect("verdict");
        assert_eq!(verdict.winner, Side::Pro);
        assert_eq!(verdict.pro_score, 88);

        let messages = model.last_messages();
        assert!(messages[1].content.contains("Pro (Constructive): Pro case."));
    }

    #[tokio::test]
    async fn test_malformed_primary_verdict_uses_fallback() {
        let model = Arc::new(
            ScriptedModel::new()
                .with("primary", Script::Reply("Pro wins, obviously.".into()))
                .with("fallback", Script::Reply(format!("```json\n{}\n```", VERDICT))),
        );

        let judgment = orchestrator(&model).generate_judgment(&session_awaiting_ai()).await;
        assert!(judgment.is_verdict());
    }

    #[tokio::test]
    async fn test_judgment_failure_is_structured() {
        let model = Arc::new(
            ScriptedModel::new()
                .with("primary", Script::Status(503))
                .with("fallback", Script::Status(502)),
        );

        let judgment = orchestrator(&model).generate_judgment(&session_awaiting_ai()).await;
        match judgment {
            Judgment::Failed(failure) => {
                assert_eq!(failure.kind, JudgmentFailureKind::ModelUnavailable);
                assert!(failure.message.contains("502"));
            }
            Judgment::Verdict(_) => panic!("expected a failure"),
        }
    }

    #[tokio::test]
    async fn test_malformed_verdict_from_both_models() {
        let model = Arc::new(
            ScriptedModel::new()
                .with("primary", Script::Reply("no json".into()))
                .with("fallback", Script::Reply("{\"winner\": \"pro\"}".into())),
        );

        let judgment = orchestrator(&model).generate_judgment(&session_awaiting_ai()).await;
        assert!(matches!(
            judgment,
            Judgment::Failed(JudgmentFailure {
                kind: JudgmentFailureKind::MalformedVerdict,
                ..
            })
        ));
    }

    #[test]
    fn test_sanitize_response_thinking_tags() {
        let input = "<thinking>Let me think about this...</thinking>The answer is 42.";
        assert_eq!(sanitize_response(input), "The answer is 42.");
    }

    #[test]
    fn test_sanitize_response_multiline_tags() {
        let input = "<think>\nMultiple\nlines\n</think>\nHonorable judges, we affirm.";
        assert_eq!(sanitize_response(input), "Honorable judges, we affirm.");
    }

    #[test]
    fn test_sanitize_response_keeps_plain_text() {
        let input = "  Cost > benefit, and 3 < 5.\n\nSecond paragraph.  ";
        assert_eq!(sanitize_response(input), "Cost > benefit, and 3 < 5.\n\nSecond paragraph.");
    }

    #[test]
    fn test_sanitize_response_keeps_comparisons_in_prose() {
        let input = "When costs<benefits and risk>0, we affirm. A <b>bold</b> claim.";
        assert_eq!(sanitize_response(input), input);
    }

    #[test]
    fn test_sanitize_response_orphan_tag() {
        let input = "<reasoning>never closed\nStill here";
        assert_eq!(sanitize_response(input), "never closed\nStill here");
    }
}
