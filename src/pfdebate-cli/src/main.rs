//! PF Debate CLI - Public Forum debate practice
//!
//! Debate a resolution against a language model in the Public Forum
//! format, or watch two models debate it, then read the judge's ballot.

use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use colored::Colorize;
use pfdebate_core::config::{self, Config};
use pfdebate_core::debate_format::expected_speech_type;
use pfdebate_core::{
    DebateEvent, DebateMode, DebatePhase, Difficulty, Judgment, LanguageModel,
    OpenAiCompatibleClient, SessionCoordinator, SessionRegistry, Side, Speaker, SpeechOrchestrator,
    TurnSubmission,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pfdebate",
    version,
    about = "Public Forum debate practice against an AI opponent",
    long_about = "Debate a resolution in the Public Forum format against a model served by an OpenAI-compatible API, or let two models debate it."
)]
struct Cli {
    /// The resolution to debate
    #[arg(value_name = "RESOLUTION")]
    resolution: String,

    /// Side you argue (pro or con)
    #[arg(short, long, default_value = "pro", value_name = "SIDE")]
    side: Side,

    /// Opponent difficulty (beginner, intermediate, expert)
    #[arg(short, long, default_value = "intermediate", value_name = "LEVEL")]
    difficulty: Difficulty,

    /// human-vs-ai, or ai-vs-ai to watch two models debate
    #[arg(short, long, default_value = "human-vs-ai", value_name = "MODE")]
    mode: DebateMode,

    /// TOML config file (models, context windows, prompts)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => config::default_config(),
    };
    if let Ok(api_base) = env::var("OPENAI_API_BASE") {
        config.models.api_base = api_base;
    }

    let api_key = env::var("OPENROUTER_API_KEY")
        .or_else(|_| env::var("OPENAI_API_KEY"))
        .unwrap_or_else(|_| {
            warn!("OPENROUTER_API_KEY not set, API calls may fail");
            String::new()
        });

    let model: Arc<dyn LanguageModel> = Arc::new(OpenAiCompatibleClient::new(&config.models, api_key)?);
    let orchestrator = SpeechOrchestrator::new(model, &config);
    let coordinator = SessionCoordinator::new(orchestrator, config.session.crossfire_turns)
        .with_callback(create_console_callback(cli.mode));
    let registry = SessionRegistry::new(coordinator);

    print_header(&cli, &config);

    let started = registry
        .start(cli.resolution.clone(), cli.side, cli.difficulty, cli.mode)
        .await;
    let id = started.session_id;
    info!(session = %id, "session started");

    if cli.mode == DebateMode::AiVsAi {
        registry.resume(id).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let snapshot = registry.snapshot(id).await?;

        match snapshot.phase {
            DebatePhase::Completed => break,
            DebatePhase::Judging => {
                println!(
                    "{}",
                    "Press Enter to ask the judge again, or type /quit.".yellow()
                );
                match lines.next_line().await? {
                    Some(line) if line.trim() != "/quit" => {
                        registry.end_phase(id).await?;
                        continue;
                    }
                    _ => break,
                }
            }
            _ => {}
        }

        // The model never leaves the floor except while the round waits
        // for the ballot.
        if cli.mode == DebateMode::AiVsAi || snapshot.speaker == Speaker::Ai {
            println!("{}", "  Requesting the judge's decision...".dimmed());
            registry.end_phase(id).await?;
            continue;
        }

        let speech_type = expected_speech_type(snapshot.phase);
        print!(
            "{} ",
            format!("[{} {}] >", cli.side.display_name(), speech_type)
                .bright_green()
                .bold()
        );
        flush_stdout();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/end" => {
                registry.end_phase(id).await?;
            }
            content => {
                let submission = TurnSubmission::new(Speaker::Human, cli.side, speech_type, content);
                if let Err(e) = registry.submit_turn(id, submission).await {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                }
            }
        }
    }

    let finished = registry.close(id).await?;
    print_ballot(finished.judgment.as_ref());

    Ok(())
}

fn print_header(cli: &Cli, config: &Config) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - Public Forum", "PF Debate".bold())
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{} {}", "Resolution:".bold(), cli.resolution.bright_white());
    println!();
    match cli.mode {
        DebateMode::HumanVsAi => {
            println!(
                "  You argue {} against a {} opponent.",
                cli.side.display_name().bright_cyan(),
                cli.difficulty.to_string().yellow()
            );
            println!(
                "  {}",
                "Type your speech on one line. /end closes crossfire, /quit leaves.".dimmed()
            );
        }
        DebateMode::AiVsAi => {
            println!(
                "  Two {} models debate; the human seat argues {}.",
                cli.difficulty.to_string().yellow(),
                cli.side.display_name().bright_cyan()
            );
        }
    }
    println!(
        "  Models: {} (fallback {})",
        config.models.primary.dimmed(),
        config.models.fallback.dimmed()
    );
    println!();
    println!("{}", "─".repeat(70).dimmed());
}

/// Create a callback that prints debate events to the console.
fn create_console_callback(mode: DebateMode) -> Box<dyn Fn(DebateEvent) + Send + Sync> {
    let last_phase = Mutex::new(None);

    Box::new(move |event| match event {
        DebateEvent::PhaseUpdated { phase, .. } => {
            let Ok(mut last) = last_phase.lock() else {
                return;
            };
            if *last == Some(phase) {
                return;
            }
            *last = Some(phase);
            println!();
            println!("{}", "═".repeat(70).bright_magenta());
            println!("{}", format!("  {}", phase.name()).bright_magenta().bold());
            println!("{}", "═".repeat(70).bright_magenta());
            println!();
        }
        DebateEvent::AiSpeech { entry, .. } => {
            let seat = match (mode, entry.speaker) {
                (DebateMode::HumanVsAi, _) => "AI",
                (DebateMode::AiVsAi, Speaker::Human) => "AI 1",
                (DebateMode::AiVsAi, Speaker::Ai) => "AI 2",
            };
            println!(
                "{} {} {}",
                "▶".bright_cyan(),
                seat.bright_cyan().bold(),
                format!("({}, {})", entry.role.display_name(), entry.speech_type).yellow()
            );
            // Word wrap and indent the content
            let wrapped = textwrap(&entry.content, 66);
            for line in wrapped.lines() {
                println!("  {}", line);
            }
            println!();
        }
        DebateEvent::Judgment { judgment, .. } => {
            if let Judgment::Failed(failure) = judgment {
                eprintln!("{} {}", "Judging failed:".red().bold(), failure.message);
            }
        }
    })
}

fn print_ballot(judgment: Option<&Judgment>) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());

    let Some(verdict) = judgment.and_then(Judgment::verdict) else {
        println!("{}", "  Debate ended without a decision.".yellow().bold());
        println!("{}", "═".repeat(70).bright_blue());
        println!();
        return;
    };

    println!(
        "{}",
        format!("  Decision: {} wins", verdict.winner.display_name())
            .bright_green()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!(
        "  {} {}   {} {}",
        "Pro:".bold(),
        verdict.pro_score,
        "Con:".bold(),
        verdict.con_score
    );
    println!();
    for (label, text) in [
        ("Reason for decision", &verdict.reason_for_decision),
        ("Feedback for Pro", &verdict.pro_feedback),
        ("Feedback for Con", &verdict.con_feedback),
    ] {
        println!("{}", label.bold());
        for line in textwrap(text, 66).lines() {
            println!("  {}", line);
        }
        println!();
    }
}

fn flush_stdout() {
    use std::io::Write;
    let _ = std::io::stdout().flush();
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for paragraph in text.split("\n\n") {
        if !result.is_empty() {
            result.push_str("\n\n");
            current_line_len = 0;
        }
        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if current_line_len + word_len + 1 > width && current_line_len > 0 {
                result.push('\n');
                current_line_len = 0;
            }
            if current_line_len > 0 {
                result.push(' ');
                current_line_len += 1;
            }
            result.push_str(word);
            current_line_len += word_len;
        }
    }

    result
}
