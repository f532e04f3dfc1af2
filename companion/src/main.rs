use std::sync::Arc;

use companion::{ChatController, ChatState, CompanionConfig, SubmitOutcome, TranscriptRenderer};
use speech_core::{CommandPlayer, SpeakClient, Speaker, SpeechInputProvider, VoiceOutput};
use stream_core::HttpChatBackend;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

const HELP: &str = "Type a message and press Enter.
  /voice   toggle spoken replies
  /listen  start or stop voice input (the transcript is added to the next message)
  /send    send what voice input has collected
  /quit    leave";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    // Logs go to stderr so they never interleave with the transcript
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CompanionConfig::from_env();
    let controller = Arc::new(build_controller(&config)?);

    let result = tokio::select! {
        result = run(controller.clone()) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            Ok(())
        }
    };
    controller.shutdown();
    result
}

fn build_controller(config: &CompanionConfig) -> anyhow::Result<ChatController> {
    let backend = HttpChatBackend::with_connect_timeout(config.ask_url(), config.request_timeout())?
        .idle_timeout(config.stream_idle_timeout());
    info!(url = backend.url(), "Using chat endpoint");

    let speaker: Option<Arc<dyn Speaker>> = match config.audio_player.as_deref().and_then(CommandPlayer::from_command_line) {
        Some(player) => {
            let client = SpeakClient::with_timeout(config.speak_url(), config.request_timeout())?;
            Some(Arc::new(VoiceOutput::new(client, Arc::new(player))))
        }
        None => {
            warn!("No audio player configured, replies will not be spoken");
            None
        }
    };

    let speech_input =
        SpeechInputProvider::from_command_line(config.stt_command.as_deref(), &config.stt_language);

    let initial = ChatState::new(config.greeting.as_deref(), config.voice_output && speaker.is_some());
    let mut controller = ChatController::new(Arc::new(backend), initial)
        .with_speech_input(speech_input)
        .with_request_timeout(config.request_timeout());
    if let Some(speaker) = speaker {
        controller = controller.with_speaker(speaker);
    }
    Ok(controller)
}

async fn run(controller: Arc<ChatController>) -> anyhow::Result<()> {
    let mut updates = controller.subscribe();
    let render_task = tokio::spawn(async move {
        let mut renderer = TranscriptRenderer::new(std::io::stdout());
        loop {
            let snapshot = updates.borrow_and_update().clone();
            if let Err(e) = renderer.render(&snapshot) {
                error!(error = %e, "Failed to render transcript");
                break;
            }
            if updates.changed().await.is_err() {
                break;
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/voice" => {
                let on = controller.toggle_voice_output();
                println!("[voice output {}]", if on { "on" } else { "off" });
            }
            "/listen" => {
                if !controller.speech_input_available() {
                    println!("[voice input is not available]");
                } else if !controller.toggle_listening() {
                    println!("[stopped listening]");
                }
            }
            "/send" => report(controller.submit().await),
            _ => {
                controller.append_input(line);
                report(controller.submit().await);
            }
        }
    }

    render_task.abort();
    Ok(())
}

fn report(outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Busy => println!("[still answering, please wait]"),
        SubmitOutcome::Failed { error } => warn!(%error, "Reply failed"),
        SubmitOutcome::Ignored | SubmitOutcome::Completed { .. } | SubmitOutcome::Cancelled => {}
    }
}
