pub mod formats;

pub use formats::{FormatTable, parse_format_list};

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which built-in format set a gateway instance serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Profile {
    /// Video containers in, containers or extracted audio out
    Video,
    /// Audio formats in and out
    Audio,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Video => write!(f, "video"),
            Profile::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "video" => Ok(Profile::Video),
            "audio" => Ok(Profile::Audio),
            other => Err(format!("unknown converter profile '{}'", other)),
        }
    }
}

/// Gateway configuration, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub profile: Profile,

    /// Bind host (default: "0.0.0.0")
    pub host: String,

    /// Bind port (default: 5001 for video, 5002 for audio)
    pub port: u16,

    /// Directory holding uploads and artifacts (default: "uploads")
    pub staging_dir: PathBuf,

    /// Conversion tool binary (default: "ffmpeg")
    pub ffmpeg_path: PathBuf,

    /// Wall-clock limit for one tool run (default: 90s video, 60s audio)
    pub conversion_timeout: Duration,

    /// Upper bound on simultaneously running tool processes (default: 4)
    pub max_concurrent_conversions: usize,

    /// Maximum upload size in bytes (default: 1 GB)
    pub max_file_size: usize,

    /// Orphaned staging files older than this are swept (default: 24)
    pub staging_cleanup_age_hours: u64,

    pub formats: FormatTable,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::video()
    }
}

impl GatewayConfig {
    pub fn video() -> Self {
        Self {
            profile: Profile::Video,
            host: "0.0.0.0".to_string(),
            port: 5001,
            staging_dir: PathBuf::from("uploads"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            conversion_timeout: Duration::from_secs(90),
            max_concurrent_conversions: 4,
            max_file_size: 1024 * 1024 * 1024, // 1 GB
            staging_cleanup_age_hours: 24,
            formats: FormatTable::video(),
        }
    }

    pub fn audio() -> Self {
        Self {
            profile: Profile::Audio,
            port: 5002,
            conversion_timeout: Duration::from_secs(60),
            formats: FormatTable::audio(),
            ..Self::video()
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Video => Self::video(),
            Profile::Audio => Self::audio(),
        }
    }

    /// Load configuration from environment variables.
    /// `CONVERTER_PROFILE` selects the defaults every other variable falls back to.
    pub fn from_env() -> Self {
        let profile = env::var("CONVERTER_PROFILE")
            .ok()
            .and_then(|v| match v.parse() {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!("{}, falling back to video", e);
                    None
                }
            })
            .unwrap_or(Profile::Video);

        Self::from_env_with_profile(profile)
    }

    pub fn from_env_with_profile(profile: Profile) -> Self {
        let default = Self::for_profile(profile);

        let mut formats = default.formats.clone();
        if let Ok(v) = env::var("SUPPORTED_INPUT_FORMATS") {
            formats = formats.with_inputs(parse_format_list(&v));
        }
        if let Ok(v) = env::var("SUPPORTED_OUTPUT_FORMATS") {
            formats = formats.with_outputs(parse_format_list(&v));
        }
        if let Ok(v) = env::var("AUDIO_ONLY_FORMATS") {
            formats = formats.with_audio_only(parse_format_list(&v));
        }

        Self {
            profile,

            host: env::var("HOST").unwrap_or(default.host),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            ffmpeg_path: env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.ffmpeg_path),

            conversion_timeout: env::var("CONVERSION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.conversion_timeout),

            max_concurrent_conversions: env::var("MAX_CONCURRENT_CONVERSIONS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default.max_concurrent_conversions),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            staging_cleanup_age_hours: env::var("STAGING_CLEANUP_AGE_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.staging_cleanup_age_hours),

            formats,
        }
    }
}
