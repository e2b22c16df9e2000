//! The JSON configuration file.

use std::fmt;
use std::path::Path;

use imgup_core::{Error, ProviderConfig, Result, UploadSettings, WebpQuality};
use serde_json::Value;

use crate::TRACING_TARGET_CONFIG;

/// File name looked up in the program directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// User configuration read from `config.json`.
///
/// Recognised keys are `user_token` (required), `enable_webp`,
/// `webp_quality`, `bucket` and `qiniu_token_url`. Unknown keys are ignored,
/// and a recognised key with the wrong type is treated as absent.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub user_token: String,
    pub enable_webp: bool,
    pub webp_quality: WebpQuality,
    pub bucket: String,
    pub token_url: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("user_token", &"<redacted>")
            .field("enable_webp", &self.enable_webp)
            .field("webp_quality", &self.webp_quality)
            .field("bucket", &self.bucket)
            .field("token_url", &self.token_url)
            .finish()
    }
}

impl AppConfig {
    /// Reads and projects the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`Configuration`] error if the file is missing, cannot be
    /// read, is not a JSON object, or lacks a non-blank `user_token`.
    ///
    /// [`Configuration`]: imgup_core::ErrorKind::Configuration
    pub fn load(path: &Path, provider: &ProviderConfig) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::configuration()
                    .with_message(format!(
                        "config file not found: {} (create it with at least {{\"user_token\": \"...\"}})",
                        path.display()
                    ))
                    .with_source(e));
            }
            Err(e) => {
                return Err(Error::configuration()
                    .with_message(format!("cannot read config file {}: {e}", path.display()))
                    .with_source(e));
            }
        };

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            Error::configuration()
                .with_message(format!("malformed config file {}: {e}", path.display()))
                .with_source(e)
        })?;

        let config = Self::from_value(&value, provider).map_err(|e| {
            let message = e.message.clone().unwrap_or_default();
            e.with_message(format!("{message} ({})", path.display()))
        })?;

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            path = %path.display(),
            config = ?config,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Projects a parsed JSON document onto the recognised keys.
    pub fn from_value(value: &Value, provider: &ProviderConfig) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(Error::configuration().with_message("config root must be a JSON object"));
        };

        let user_token = object
            .get("user_token")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                Error::configuration().with_message("user_token is missing from the config file")
            })?;

        let enable_webp = object
            .get("enable_webp")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let webp_quality = object
            .get("webp_quality")
            .and_then(Value::as_i64)
            .map_or(WebpQuality::DEFAULT, WebpQuality::new);

        Ok(Self {
            user_token: user_token.to_owned(),
            enable_webp,
            webp_quality,
            bucket: non_blank(object.get("bucket"))
                .unwrap_or_else(|| provider.default_bucket.clone()),
            token_url: non_blank(object.get("qiniu_token_url"))
                .unwrap_or_else(|| provider.default_token_endpoint.clone()),
        })
    }

    /// Per-run pipeline settings.
    pub fn settings(&self) -> UploadSettings {
        UploadSettings {
            user_token: self.user_token.clone(),
            token_endpoint: self.token_url.clone(),
            bucket: self.bucket.clone(),
            quality: self.webp_quality,
        }
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use imgup_core::ErrorKind;
    use imgup_core::provider::{DEFAULT_BUCKET, DEFAULT_TOKEN_ENDPOINT};
    use serde_json::json;

    use super::*;

    fn project(value: Value) -> Result<AppConfig> {
        AppConfig::from_value(&value, &ProviderConfig::default())
    }

    #[test]
    fn test_minimal_config_takes_defaults() {
        let config = project(json!({"user_token": "abc"})).unwrap();
        assert_eq!(config.user_token, "abc");
        assert!(!config.enable_webp);
        assert_eq!(config.webp_quality, WebpQuality::DEFAULT);
        assert_eq!(config.bucket, DEFAULT_BUCKET);
        assert_eq!(config.token_url, DEFAULT_TOKEN_ENDPOINT);
    }

    #[test]
    fn test_full_config() {
        let config = project(json!({
            "user_token": "abc",
            "enable_webp": true,
            "webp_quality": 80,
            "bucket": "photos",
            "qiniu_token_url": "https://auth.example.com/token",
            "unknown": [1, 2, 3]
        }))
        .unwrap();

        assert!(config.enable_webp);
        assert_eq!(config.webp_quality.get(), 80);
        assert_eq!(config.bucket, "photos");
        assert_eq!(config.token_url, "https://auth.example.com/token");
    }

    #[test]
    fn test_wrong_types_fall_back_to_defaults() {
        let config = project(json!({
            "user_token": "abc",
            "enable_webp": "yes",
            "webp_quality": "high",
            "bucket": 7,
            "qiniu_token_url": "   "
        }))
        .unwrap();

        assert!(!config.enable_webp);
        assert_eq!(config.webp_quality, WebpQuality::DEFAULT);
        assert_eq!(config.bucket, DEFAULT_BUCKET);
        assert_eq!(config.token_url, DEFAULT_TOKEN_ENDPOINT);
    }

    #[test]
    fn test_out_of_range_quality_becomes_default() {
        for quality in [0, 101, -5] {
            let config = project(json!({"user_token": "abc", "webp_quality": quality})).unwrap();
            assert_eq!(config.webp_quality.get(), 95);
        }
    }

    #[test]
    fn test_missing_user_token_is_fatal() {
        for value in [json!({}), json!({"user_token": "  "}), json!({"user_token": 1})] {
            let err = project(value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        let err = project(json!(["user_token", "abc"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_provider_defaults_apply() {
        let provider = ProviderConfig {
            default_bucket: "team-bucket".to_owned(),
            ..ProviderConfig::default()
        };
        let config = AppConfig::from_value(&json!({"user_token": "abc"}), &provider).unwrap();
        assert_eq!(config.bucket, "team-bucket");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"user_token": "abc", "enable_webp": true}}"#).unwrap();

        let config = AppConfig::load(file.path(), &ProviderConfig::default()).unwrap();
        assert_eq!(config.user_token, "abc");
        assert!(config.enable_webp);

        let settings = config.settings();
        assert_eq!(settings.bucket, DEFAULT_BUCKET);
        assert_eq!(settings.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
    }

    #[test]
    fn test_missing_and_malformed_files_are_distinct() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join(CONFIG_FILE_NAME);
        let err = AppConfig::load(&missing, &ProviderConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.message.unwrap().contains("not found"));

        let malformed = dir.path().join("broken.json");
        std::fs::write(&malformed, "{ user_token: abc").unwrap();
        let err = AppConfig::load(&malformed, &ProviderConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.message.unwrap().contains("malformed"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = project(json!({"user_token": "very-secret"})).unwrap();
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
