//! Command-line front end for the TalkPlay audio core.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (current-thread — the audio handles are not
//!    `Send`).
//! 4. Build the recording pipeline, playback controller, and speaker.
//! 5. Run the interactive prompt until `quit`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use talkplay_audio::{
    audio::CpalCaptureDevice,
    config::{AppConfig, AppPaths},
    notify::{NotificationChannel, SharedNotifications},
    pipeline::RecordingPipeline,
    playback::{PlaybackController, RodioPlayer},
    speech::{EspeakEngine, Speaker},
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("config load failed ({e}), using defaults");
        AppConfig::default()
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: AppConfig) -> Result<()> {
    let notify: SharedNotifications = Arc::new(Mutex::new(NotificationChannel::with_ttl(
        Duration::from_secs(config.notify.transient_ttl_secs),
    )));

    let device = Box::new(CpalCaptureDevice::new());
    let mut pipeline = RecordingPipeline::new(device, &config, notify.clone());

    let mut playback = PlaybackController::new(
        Box::new(RodioPlayer::new()),
        pipeline.artifacts(),
        &config.playback,
        notify.clone(),
    );

    let mut speaker = Speaker::new(Box::new(EspeakEngine::new()), &config.speech, notify.clone());
    speaker.refresh_voices().await;

    println!("talkplay audio core");
    println!("commands: record | stop | play | save | say <text> | dismiss | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command {
            "record" => {
                pipeline.start_recording().await;
                println!("state: {}", pipeline.state().label());
            }
            "stop" => {
                playback.stop();
                speaker.stop();
                match pipeline.stop_recording().await {
                    Some(handle) => println!("recorded: {}", handle.uri()),
                    None => println!("nothing to stop"),
                }
            }
            "play" => {
                if playback.play().await {
                    println!("playing");
                }
            }
            "save" => match pipeline.artifacts().current() {
                Some(artifact) => {
                    let stamp = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or(0);
                    let dir = AppPaths::new().recordings_dir;
                    std::fs::create_dir_all(&dir)?;
                    let path = dir.join(format!("recording-{stamp}.wav"));
                    std::fs::write(&path, &artifact.bytes)?;
                    println!("saved: {}", path.display());
                }
                None => println!("nothing to save"),
            },
            "say" => {
                if rest.is_empty() {
                    println!("usage: say <text>");
                } else {
                    speaker.speak(rest);
                }
            }
            "dismiss" => {
                notify.lock().unwrap().dismiss();
            }
            "quit" | "exit" => break,
            "" => {}
            other => println!("unknown command: {other}"),
        }

        print_notification(&notify);
    }

    playback.stop();
    speaker.stop();
    Ok(())
}

/// Surface whatever the core posted during the last command.
fn print_notification(notify: &SharedNotifications) {
    let mut channel = notify.lock().unwrap();
    if let Some(n) = channel.current() {
        let marker = if n.persistent { "!" } else { "·" };
        println!("[{marker} {:?}] {}", n.severity, n.message);
    }
}
