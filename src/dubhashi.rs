use std::sync::Arc;

use anyhow::{Context, Result};
use dubhashi::history::HistoryStore;
use dubhashi::session::{ConversationSession, SessionOptions};
use dubhashi::{
    APP_NAME_PRETTY, Config, ConfigManager, DEFAULT_LOG_LEVEL, LANGUAGES, Participant, Player,
    Recorder, SarvamClient, SarvamConfig, SessionEvent, TranslateClient, TranslateConfig,
    TurnPhase, VERSION, find_language,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("DUBHASHI_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .init();

    // Load config; save back so the file exists for editing
    let config_manager = ConfigManager::new()?;
    let config = config_manager.load()?;
    config_manager.save(&config)?;

    let (session, mut events) = build_session(&config)?;
    let history = HistoryStore::new()?;

    println!(
        "{} v{} - two-way speech translation (config: {})",
        APP_NAME_PRETTY,
        VERSION,
        config_manager.config_path().display()
    );
    print_help();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(line.trim(), &session, &history).await? {
                    break;
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event);
            }
        }
    }

    // Forced termination: abort anything in flight and release the devices.
    session.cancel_turn().await;
    info!("goodbye");
    Ok(())
}

fn build_session(
    config: &Config,
) -> Result<(ConversationSession, mpsc::UnboundedReceiver<SessionEvent>)> {
    let mut sarvam_config = SarvamConfig::new(config.key_sarvam().unwrap_or_default());
    if let Some(endpoint) = config.speech_endpoint() {
        sarvam_config = sarvam_config.with_endpoint(endpoint);
    }
    if let Some(model) = config.speech_model() {
        sarvam_config = sarvam_config.with_model(model);
    }

    let mut translate_config = TranslateConfig::new();
    if let Some(endpoint) = config.translate_endpoint() {
        translate_config = translate_config.with_endpoint(endpoint);
    }
    if let Some(voice_model) = config.voice_model() {
        translate_config = translate_config.with_voice_model(voice_model);
    }

    let player = Player::new().context("Failed to open audio output")?;
    let history = if config.save_history {
        Some(HistoryStore::new()?)
    } else {
        None
    };

    Ok(ConversationSession::new(
        Arc::new(Recorder::new()),
        Arc::new(SarvamClient::new(sarvam_config)),
        Arc::new(TranslateClient::new(translate_config)),
        Arc::new(player),
        history,
        SessionOptions {
            discard_duration: config.discard_duration(),
            save_history: config.save_history,
        },
    ))
}

/// Returns false when the user asked to quit.
async fn handle_command(
    line: &str,
    session: &ConversationSession,
    history: &HistoryStore,
) -> Result<bool> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        None => {}
        Some("a") => report(session.toggle_mic(Participant::A).await),
        Some("b") => report(session.toggle_mic(Participant::B).await),
        Some("lang") => {
            let participant = match parts.next() {
                Some("a") => Participant::A,
                Some("b") => Participant::B,
                _ => {
                    println!("usage: lang <a|b> <language>");
                    return Ok(true);
                }
            };
            let query = parts.collect::<Vec<_>>().join(" ");
            match find_language(&query) {
                Some(language) => {
                    println!("{} speaks {}", participant.label(), language.name);
                    session.set_language(participant, language).await;
                }
                None => {
                    println!("unknown language: {}", query);
                    println!(
                        "available: {}",
                        LANGUAGES
                            .iter()
                            .map(|(name, _)| *name)
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            }
        }
        Some("swap") => {
            session.swap_languages().await;
            println!("languages swapped");
        }
        Some("stop") => session.cancel_turn().await,
        Some("replay") => report(session.replay().await),
        Some("history") => {
            let entries = history.list()?;
            if entries.is_empty() {
                println!("no history yet");
            }
            for entry in entries {
                println!(
                    "[{}] {} -> {}: {} => {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.source_language,
                    entry.target_language,
                    entry.original_text,
                    entry.translated_text
                );
            }
        }
        Some("q" | "quit" | "exit") => return Ok(false),
        Some("help") => print_help(),
        Some(other) => println!("unknown command: {} (try help)", other),
    }
    Ok(true)
}

fn report<T>(result: std::result::Result<T, impl std::fmt::Display>) {
    if let Err(e) = result {
        println!("! {}", e);
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::PhaseChanged(phase) => match phase {
            TurnPhase::Idle => println!("· idle"),
            TurnPhase::Recording(p) => println!("· recording {} (tap again to stop)", p.label()),
            TurnPhase::Processing(p) => println!("· processing {}...", p.label()),
            TurnPhase::Playing(p) => println!("· speaking for {}", p.other().label()),
        },
        SessionEvent::TranscriptReady { speaker, text } => {
            println!("{}> {}", speaker.label(), text);
        }
        SessionEvent::TranslationReady { speaker, text } => {
            println!("{}< {}", speaker.other().label(), text);
        }
        SessionEvent::PlaybackFinished => println!("· playback finished"),
        SessionEvent::TurnFailed { message } => println!("! {}", message),
    }
}

fn print_help() {
    println!("commands:");
    println!("  a | b            tap participant A's or B's microphone");
    println!("  lang <a|b> <l>   select a participant's language");
    println!("  swap             exchange the two languages");
    println!("  stop             cancel the current turn");
    println!("  replay           replay the last translation");
    println!("  history          list saved translations");
    println!("  q                quit");
}
