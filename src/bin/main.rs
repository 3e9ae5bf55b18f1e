use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use voice_ledger::{
    config::AppConfig, transcription::content_type_for_extension, LedgerError, VoiceLedger,
};

const HELP: &str = "\
Type a statement to record it, e.g. \"I earned $1500 today from freelance work\".
Prefix a question with '?' or 'query:', e.g. \"? Show me all profit details for March\".
Use 'file:<path>' to transcribe an audio file. 'exit' to quit.";

enum Command<'a> {
    Quit,
    Statement(&'a str),
    Question(&'a str),
    AudioFile(&'a str),
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if matches!(line.to_lowercase().as_str(), "exit" | "quit" | "q") {
        return Some(Command::Quit);
    }
    if let Some(question) = line.strip_prefix('?') {
        return Some(Command::Question(question.trim()));
    }
    if let Some(question) = line.strip_prefix("query:") {
        return Some(Command::Question(question.trim()));
    }
    if let Some(path) = line.strip_prefix("file:") {
        return Some(Command::AudioFile(path.trim()));
    }
    Some(Command::Statement(line))
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Could not format output: {}", e),
    }
}

fn report_error(e: LedgerError) {
    match e {
        LedgerError::Extraction(failure) => println!("{}", failure),
        other => {
            error!(error = %other, "Command failed");
            eprintln!("Error: {}", other);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    let ledger = VoiceLedger::from_config(&config)?;

    info!("Voice ledger CLI starting");
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            continue;
        };

        match command {
            Command::Quit => break,
            Command::Statement(text) => match ledger.process_transcription(text).await {
                Ok(processed) => print_json(&processed),
                Err(e) => report_error(e),
            },
            Command::Question(question) => match ledger.answer_query(question).await {
                Ok(answer) => {
                    println!("{}\n", answer.text);
                    print_json(&answer.report);
                }
                Err(e) => report_error(e),
            },
            Command::AudioFile(path) => {
                let path = Path::new(path);
                match tokio::fs::read(path).await {
                    Ok(audio) => {
                        let content_type = content_type_for_extension(path);
                        match ledger.process_audio(audio, content_type).await {
                            Ok(processed) => print_json(&processed),
                            Err(e) => report_error(e),
                        }
                    }
                    Err(e) => eprintln!("Could not read {}: {}", path.display(), e),
                }
            }
        }
    }

    info!("Voice ledger CLI stopped");
    Ok(())
}
