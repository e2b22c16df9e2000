//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── input                        # path or URL, prompted for when absent
//! ├── config / cwebp               # config file and encoder locations
//! ├── provider: ProviderConfig     # bucket, endpoints, fallback host
//! └── http: ReqwestConfig          # timeouts, user agent
//! ```
//!
//! Per-user settings (`user_token`, `enable_webp`, ...) come from
//! `config.json`, see [`AppConfig`].
//!
//! # Example
//!
//! ```bash
//! imgup ./cat.png
//! imgup --config ~/.imgup.json https://example.com/cat.jpg
//! IMGUP_CWEBP=/opt/libwebp/bin/cwebp imgup "C:\Users\me\cat.png"
//! ```

mod file;

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use imgup_core::ProviderConfig;
use imgup_core::transcode::DEFAULT_ENCODER;
use imgup_reqwest::ReqwestConfig;

pub use self::file::{AppConfig, CONFIG_FILE_NAME};
use crate::TRACING_TARGET_CONFIG;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "imgup")]
#[command(about = "Upload one image to Qiniu object storage")]
#[command(version)]
pub struct Cli {
    /// Local path, file:// URI or http(s) URL of the image
    pub input: Option<String>,

    /// Configuration file [default: config.json next to the executable]
    #[arg(long, env = "IMGUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// WebP encoder executable, used when enable_webp is set
    #[arg(long, env = "IMGUP_CWEBP", default_value = DEFAULT_ENCODER)]
    pub cwebp: PathBuf,

    /// Storage provider endpoints and defaults.
    #[clap(flatten)]
    pub provider: ProviderConfig,

    /// HTTP client timeouts.
    #[clap(flatten)]
    pub http: ReqwestConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Returns the configuration file to read.
    pub fn config_path(&self, program_dir: &Path) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| program_dir.join(CONFIG_FILE_NAME))
    }

    /// Logs configuration at debug level (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            directory_endpoint = %self.provider.directory_endpoint,
            fallback_host = %self.provider.fallback_host,
            upload_scheme = %self.provider.upload_scheme,
            connect_timeout_secs = self.http.connect_timeout,
            read_timeout_secs = self.http.read_timeout,
            upload_timeout_secs = self.http.upload_timeout,
            cwebp = %self.cwebp.display(),
            "Provider configuration"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Directory holding the executable, or the working directory when it
/// cannot be determined.
///
/// `config.json` is looked up here, and drive-less Windows paths borrow
/// their drive letter from it.
pub fn program_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use imgup_core::provider::DEFAULT_FALLBACK_HOST;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["imgup"]).unwrap();
        assert!(cli.input.is_none());
        assert_eq!(cli.cwebp, PathBuf::from("cwebp"));
        assert_eq!(cli.provider.fallback_host, DEFAULT_FALLBACK_HOST);
        assert_eq!(cli.http.upload_timeout, 120);
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::try_parse_from(["imgup", "cat.png"]).unwrap();
        assert_eq!(cli.input.as_deref(), Some("cat.png"));
        assert_eq!(
            cli.config_path(Path::new("/opt/imgup")),
            Path::new("/opt/imgup").join(CONFIG_FILE_NAME)
        );

        let cli = Cli::try_parse_from(["imgup", "--config", "/etc/imgup.json", "cat.png"]).unwrap();
        assert_eq!(cli.config_path(Path::new("/opt/imgup")), PathBuf::from("/etc/imgup.json"));
    }

    #[test]
    fn test_program_dir_exists() {
        assert!(program_dir().is_dir());
    }
}
