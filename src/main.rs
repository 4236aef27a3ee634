use domain::pipeline::PipelineOrchestrator;
use domain::CaptionEntry;
use log::{error, info};
use record_store::memory::InMemoryStore;
use record_store::{MeetingStore, NewMeeting};
use service::{config::Config, logging::Logger};
use std::path::PathBuf;
use std::sync::Arc;

/// Worker entry point: processes one recorded meeting end to end against the
/// in-memory record store and prints the terminal meeting record as JSON.
#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    let audio_path: PathBuf = match &config.audio {
        Some(path) => path.clone(),
        None => {
            error!("No audio file provided. Use --audio <path>.");
            std::process::exit(1);
        }
    };

    let captions = load_captions(&config);

    let store = Arc::new(InMemoryStore::new());
    let orchestrator =
        match PipelineOrchestrator::from_config(&config, store.clone(), store.clone()) {
            Ok(orchestrator) => orchestrator,
            Err(e) => {
                error!("Failed to initialize pipeline: {e}");
                std::process::exit(1);
            }
        };

    let audio_file_size = std::fs::metadata(&audio_path).map(|m| m.len() as i64).ok();
    let client_transcript = (!captions.is_empty()).then(|| {
        captions
            .iter()
            .map(|c| format!("{}: {}", c.speaker, c.text))
            .collect::<Vec<_>>()
            .join("\n")
    });

    let meeting = match store
        .create(NewMeeting {
            name: config.meeting_name.clone(),
            client_transcript,
            audio_file_size,
        })
        .await
    {
        Ok(meeting) => meeting,
        Err(e) => {
            error!("Failed to create meeting record: {e}");
            std::process::exit(1);
        }
    };

    info!(
        "Processing meeting {} from {:?} ({} caption entries)",
        meeting.id,
        audio_path,
        captions.len()
    );

    orchestrator.process(meeting.id, &audio_path, &captions).await;

    match store.find_by_id(meeting.id).await {
        Ok(finished) => match serde_json::to_string_pretty(&finished) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => error!("Failed to render meeting record: {e}"),
        },
        Err(e) => error!("Failed to load finished meeting record: {e}"),
    }
}

fn load_captions(config: &Config) -> Vec<CaptionEntry> {
    let path = match &config.captions {
        Some(path) => path,
        None => return Vec::new(),
    };

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to read captions file {path:?}: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::from_str(&raw) {
        Ok(captions) => captions,
        Err(e) => {
            error!("Failed to parse captions file {path:?}: {e}");
            std::process::exit(1);
        }
    }
}
