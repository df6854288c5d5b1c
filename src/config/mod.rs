use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the ingest service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum upload size in bytes (default: 10 GB)
    pub max_upload_size: usize,

    /// Content types accepted by the upload endpoint (default: "video/mp4")
    pub allowed_content_types: Vec<String>,

    /// Bucket that receives published videos
    pub s3_bucket: String,

    /// S3 region (default: "us-east-1")
    pub s3_region: String,

    /// Custom S3 endpoint, e.g. a MinIO URL. Enables path-style addressing.
    pub s3_endpoint: Option<String>,

    /// Validity window of signed playback URLs in seconds (default: 60)
    pub presign_ttl_secs: u64,

    /// Media inspection binary (default: "ffprobe")
    pub ffprobe_path: String,

    /// Remux binary (default: "ffmpeg")
    pub ffmpeg_path: String,

    /// Deadline for one inspection run in seconds (default: 30)
    pub probe_timeout_secs: u64,

    /// Deadline for one remux run in seconds (default: 600)
    pub remux_timeout_secs: u64,

    /// Directory for request-scoped temporary files. System temp dir when unset.
    pub staging_dir: Option<PathBuf>,

    /// JWT Secret Key (Required)
    pub jwt_secret: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 10 * 1024 * 1024 * 1024, // 10 GB
            allowed_content_types: vec!["video/mp4".to_string()],
            s3_bucket: "videos".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
            presign_ttl_secs: 60,
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            probe_timeout_secs: 30,
            remux_timeout_secs: 600,
            staging_dir: None,
            jwt_secret: "secret".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            allowed_content_types: env::var("ALLOWED_CONTENT_TYPES")
                .ok()
                .map(|v| parse_list(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or(default.allowed_content_types),

            s3_bucket: env::var("S3_BUCKET").unwrap_or(default.s3_bucket),

            s3_region: env::var("S3_REGION").unwrap_or(default.s3_region),

            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),

            presign_ttl_secs: env::var("PRESIGN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.presign_ttl_secs),

            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or(default.ffprobe_path),

            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or(default.ffmpeg_path),

            probe_timeout_secs: env::var("PROBE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.probe_timeout_secs),

            remux_timeout_secs: env::var("REMUX_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.remux_timeout_secs),

            staging_dir: env::var("STAGING_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()), // Fallback for dev convenience, strictly enforced in production method

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| parse_list(&v))
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development (local MinIO, short tool deadlines)
    pub fn development() -> Self {
        Self {
            s3_endpoint: Some("http://127.0.0.1:9000".to_string()),
            probe_timeout_secs: 10,
            remux_timeout_secs: 120,
            ..Self::default()
        }
    }

    /// Create config for production (secret required)
    pub fn production() -> Self {
        let from_env = Self::from_env();
        Self {
            jwt_secret: env::var("JWT_SECRET").expect("CRITICAL: JWT_SECRET must be set"),
            ..from_env
        }
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn remux_timeout(&self) -> Duration {
        Duration::from_secs(self.remux_timeout_secs)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(env::temp_dir)
    }
}
