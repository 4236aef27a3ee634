use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default ElevenLabs speech-to-text API base URL used when
/// `ELEVENLABS_BASE_URL` is not set.
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";

/// Default OpenAI API base URL used when `OPENAI_BASE_URL` is not set.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Placeholder values that ship in `.env.example` files. A key equal to its
/// placeholder is treated as unconfigured, not as an invalid credential.
const ELEVENLABS_KEY_PLACEHOLDER: &str = "your-elevenlabs-api-key-here";
const OPENAI_KEY_PLACEHOLDER: &str = "your-openai-api-key-here";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The API key to use when calling the ElevenLabs speech-to-text API.
    #[arg(long, env)]
    elevenlabs_api_key: Option<String>,

    /// The base URL of the ElevenLabs API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_ELEVENLABS_BASE_URL)]
    elevenlabs_base_url: String,

    /// The ElevenLabs speech-to-text model to request.
    #[arg(long, env, default_value = "scribe_v2")]
    pub elevenlabs_model_id: String,

    /// Request timeout in seconds for a single transcription call. Generous
    /// because large audio uploads can take minutes to process.
    #[arg(long, env, default_value_t = 300)]
    pub transcription_timeout_secs: u64,

    /// The API key to use when calling the OpenAI chat completions API.
    #[arg(long, env)]
    openai_api_key: Option<String>,

    /// The base URL of the OpenAI API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_OPENAI_BASE_URL)]
    openai_base_url: String,

    /// Model used for per-chunk (map stage) summarization calls.
    #[arg(long, env, default_value = "gpt-3.5-turbo-16k")]
    pub map_model: String,

    /// Model used for the consolidation (reduce stage) and extraction calls.
    #[arg(long, env, default_value = "gpt-4o-mini")]
    pub reduce_model: String,

    /// Maximum tokens per transcript chunk fed to the map stage. Raise this
    /// for models with larger context windows.
    #[arg(long, env, default_value_t = 3000)]
    pub max_chunk_tokens: usize,

    /// Audio files larger than this many bytes are split into chunks before
    /// transcription.
    #[arg(long, env, default_value_t = 20 * 1024 * 1024)]
    pub segmentation_threshold_bytes: u64,

    /// Target duration in seconds of each audio chunk produced by the
    /// segmenter. Actual boundaries are keyframe-aligned and approximate.
    #[arg(long, env, default_value_t = 600)]
    pub audio_chunk_duration_secs: u64,

    /// Prefer machine diarization labels over caption-derived speaker names
    /// when both are available for a time window. The default is
    /// caption-priority.
    #[arg(long, env, default_value_t = false)]
    pub prefer_machine_speakers: bool,

    /// Path to the recorded meeting audio file to process.
    #[arg(long, env)]
    pub audio: Option<PathBuf>,

    /// Path to a JSON file of scraped caption entries
    /// ([{"speaker", "text", "timestamp"}]).
    #[arg(long, env)]
    pub captions: Option<PathBuf>,

    /// Display name for the meeting record.
    #[arg(long, env, default_value = "Untitled Meeting")]
    pub meeting_name: String,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Returns the ElevenLabs API key, if configured. A key equal to the
    /// `.env.example` placeholder counts as unconfigured.
    pub fn elevenlabs_api_key(&self) -> Option<String> {
        self.elevenlabs_api_key
            .clone()
            .filter(|key| !key.is_empty() && key != ELEVENLABS_KEY_PLACEHOLDER)
    }

    /// Returns the ElevenLabs API base URL.
    pub fn elevenlabs_base_url(&self) -> &str {
        &self.elevenlabs_base_url
    }

    /// Returns the OpenAI API key, if configured. A key equal to the
    /// `.env.example` placeholder counts as unconfigured.
    pub fn openai_api_key(&self) -> Option<String> {
        self.openai_api_key
            .clone()
            .filter(|key| !key.is_empty() && key != OPENAI_KEY_PLACEHOLDER)
    }

    /// Returns the OpenAI API base URL.
    pub fn openai_base_url(&self) -> &str {
        &self.openai_base_url
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        // This could check an environment variable, or a config field
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(args: &[&str]) -> Config {
        let mut argv = vec!["meeting_pipeline_rs"];
        argv.extend_from_slice(args);
        Config::parse_from(argv)
    }

    #[test]
    fn test_placeholder_api_key_counts_as_unconfigured() {
        let config = config_from(&["--elevenlabs-api-key", ELEVENLABS_KEY_PLACEHOLDER]);
        assert_eq!(config.elevenlabs_api_key(), None);

        let config = config_from(&["--openai-api-key", OPENAI_KEY_PLACEHOLDER]);
        assert_eq!(config.openai_api_key(), None);
    }

    #[test]
    fn test_empty_api_key_counts_as_unconfigured() {
        let config = config_from(&["--elevenlabs-api-key", ""]);
        assert_eq!(config.elevenlabs_api_key(), None);
    }

    #[test]
    fn test_real_api_key_is_returned() {
        let config = config_from(&["--elevenlabs-api-key", "xi_test_123"]);
        assert_eq!(config.elevenlabs_api_key(), Some("xi_test_123".to_string()));
    }

    #[test]
    fn test_default_thresholds() {
        let config = config_from(&[]);
        assert_eq!(config.segmentation_threshold_bytes, 20 * 1024 * 1024);
        assert_eq!(config.audio_chunk_duration_secs, 600);
        assert_eq!(config.max_chunk_tokens, 3000);
        assert!(!config.prefer_machine_speakers);
    }
}
