//! Test binary for the translate-and-speak endpoint.
//!
//! Usage: translate-test <text> <target_language> [output.mp3]

use std::env;
use std::fs;
use std::time::Instant;

use dubhashi_api::{SpeechTranslator, TranslateClient, TranslateConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <text> <target_language> [output.mp3]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} \"Hello, how are you?\" hindi out.mp3", args[0]);
        std::process::exit(1);
    }

    let text = &args[1];
    let target_language = &args[2];
    let output = args.get(3).map(|s| s.as_str());

    let client = TranslateClient::new(TranslateConfig::new());

    println!("Sending translate-and-speak request...");
    let start = Instant::now();

    let reply = client
        .translate_and_speak(text, "hi-IN", target_language)
        .await?;
    let elapsed = start.elapsed();

    println!();
    println!("Translation completed in {:.2}s", elapsed.as_secs_f64());
    println!("---");
    println!("{}", reply.translated_text);
    println!("---");

    if let Some(path) = output {
        let audio = reply.audio_bytes()?;
        fs::write(path, &audio)?;
        println!("Wrote {} bytes of audio to {}", audio.len(), path);
    }

    Ok(())
}
