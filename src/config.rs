use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::jimeng::ImageModel;
use crate::logger::LogLevel;

#[derive(Debug, Clone)]
pub struct CosConfig {
    pub secret_id: Option<String>,
    pub secret_key: Option<String>,
    pub region: String,
    pub bucket: String,
    pub domain: Option<String>,
    pub scheme: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub upload_workers: usize,
    pub fetch_timeout_secs: u64,
    pub max_connections: usize,
    pub max_idle_connections: usize,
    pub key_prefix: String,
}

#[derive(Debug, Clone)]
pub struct JimengConfig {
    pub api_base: String,
    pub session_id: Option<String>,
    pub default_model: ImageModel,
    pub default_width: u32,
    pub default_height: u32,
    pub default_sample_strength: f64,
    pub request_timeout_ms: u64,
}

/// `LOG_LEVEL`, `LOG_FORMAT` (`json` or text) and `LOG_FILE`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub json: bool,
    pub file: Option<String>,
}

impl Default for CosConfig {
    fn default() -> Self {
        CosConfig {
            secret_id: None,
            secret_key: None,
            region: "ap-guangzhou".to_string(),
            bucket: "jimeng-images".to_string(),
            domain: None,
            scheme: "https".to_string(),
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

impl CosConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(CosConfig {
            secret_id: non_empty(lookup("TENCENT_CLOUD_SECRET_ID")),
            secret_key: non_empty(lookup("TENCENT_CLOUD_SECRET_KEY")),
            region: non_empty(lookup("TENCENT_COS_REGION")).unwrap_or(defaults.region),
            bucket: non_empty(lookup("TENCENT_COS_BUCKET")).unwrap_or(defaults.bucket),
            domain: non_empty(lookup("TENCENT_COS_DOMAIN")),
            scheme: non_empty(lookup("TENCENT_COS_SCHEME")).unwrap_or(defaults.scheme),
            timeout_secs: parse_or(&lookup, "TENCENT_COS_TIMEOUT", defaults.timeout_secs)?,
            max_retries: parse_or(&lookup, "TENCENT_COS_MAX_RETRY", defaults.max_retries)?,
        })
    }

    pub fn with_credentials(
        mut self,
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.secret_id = Some(secret_id.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Checks the fields a live COS connection needs.
    pub fn validate(&self) -> Result<()> {
        if self.secret_id.is_none() || self.secret_key.is_none() {
            return Err(BridgeError::Configuration(
                "TENCENT_CLOUD_SECRET_ID and TENCENT_CLOUD_SECRET_KEY are required".into(),
            ));
        }
        if self.bucket.is_empty() || self.region.is_empty() {
            return Err(BridgeError::Configuration(
                "COS bucket and region must not be empty".into(),
            ));
        }
        if self.scheme != "https" && self.scheme != "http" {
            return Err(BridgeError::Configuration(format!(
                "Unsupported COS scheme: {}",
                self.scheme
            )));
        }
        Ok(())
    }

    /// Regional service endpoint; the SDK prepends the bucket (virtual-hosted style).
    pub fn endpoint(&self) -> String {
        format!("{}://cos.{}.myqcloud.com", self.scheme, self.region)
    }

    /// Public URL of an object: the custom domain when configured, else the
    /// default bucket host.
    pub fn object_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match &self.domain {
            Some(domain) => format!(
                "{}://{}/{}",
                self.scheme,
                domain.trim_end_matches('/'),
                key
            ),
            None => format!(
                "{}://{}.cos.{}.myqcloud.com/{}",
                self.scheme, self.bucket, self.region, key
            ),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            upload_workers: 4,
            fetch_timeout_secs: 30,
            max_connections: 100,
            max_idle_connections: 20,
            key_prefix: "jimeng/batch".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = PipelineConfig {
            upload_workers: parse_or(&lookup, "COS_UPLOAD_WORKERS", defaults.upload_workers)?,
            fetch_timeout_secs: parse_or(
                &lookup,
                "COS_FETCH_TIMEOUT",
                defaults.fetch_timeout_secs,
            )?,
            max_connections: parse_or(&lookup, "COS_MAX_CONNECTIONS", defaults.max_connections)?,
            max_idle_connections: parse_or(
                &lookup,
                "COS_MAX_IDLE_CONNECTIONS",
                defaults.max_idle_connections,
            )?,
            key_prefix: non_empty(lookup("COS_KEY_PREFIX")).unwrap_or(defaults.key_prefix),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_upload_workers(mut self, workers: usize) -> Self {
        self.upload_workers = workers;
        self
    }

    pub fn with_fetch_timeout(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.upload_workers == 0 {
            return Err(BridgeError::Configuration(
                "COS_UPLOAD_WORKERS must be at least 1".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(BridgeError::Configuration(
                "COS_MAX_CONNECTIONS must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for JimengConfig {
    fn default() -> Self {
        JimengConfig {
            api_base: "http://localhost:8001".to_string(),
            session_id: None,
            default_model: ImageModel::Jimeng30,
            default_width: 1024,
            default_height: 1024,
            default_sample_strength: 0.5,
            request_timeout_ms: 120_000,
        }
    }
}

impl JimengConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let default_model = match non_empty(lookup("DEFAULT_MODEL")) {
            Some(name) => ImageModel::from_str(&name).map_err(|_| {
                BridgeError::Configuration(format!(
                    "DEFAULT_MODEL '{}' is not one of: {}",
                    name,
                    ImageModel::names().join(", ")
                ))
            })?,
            None => defaults.default_model,
        };

        Ok(JimengConfig {
            api_base: non_empty(lookup("JIMENG_API_BASE")).unwrap_or(defaults.api_base),
            session_id: non_empty(lookup("JIMENG_SESSION_ID")),
            default_model,
            default_width: parse_or(&lookup, "DEFAULT_WIDTH", defaults.default_width)?,
            default_height: parse_or(&lookup, "DEFAULT_HEIGHT", defaults.default_height)?,
            default_sample_strength: parse_or(
                &lookup,
                "DEFAULT_SAMPLE_STRENGTH",
                defaults.default_sample_strength,
            )?,
            request_timeout_ms: parse_or(&lookup, "REQUEST_TIMEOUT", defaults.request_timeout_ms)?,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_default_model(mut self, model: ImageModel) -> Self {
        self.default_model = model;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_id.is_none() {
            return Err(BridgeError::Configuration(
                "JIMENG_SESSION_ID is not set; add it to the environment or .env file".into(),
            ));
        }
        if self.default_width == 0 || self.default_height == 0 {
            return Err(BridgeError::Configuration(
                "DEFAULT_WIDTH and DEFAULT_HEIGHT must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.default_sample_strength) {
            return Err(BridgeError::Configuration(
                "DEFAULT_SAMPLE_STRENGTH must be within 0-1".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(BridgeError::Configuration(
                "REQUEST_TIMEOUT must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn generations_url(&self) -> String {
        format!(
            "{}/v1/images/generations",
            self.api_base.trim_end_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            json: false,
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(LoggingConfig {
            level: match non_empty(lookup("LOG_LEVEL")) {
                Some(level) => level.parse()?,
                None => defaults.level,
            },
            json: non_empty(lookup("LOG_FORMAT")).map_or(false, |val| val.eq_ignore_ascii_case("json")),
            file: non_empty(lookup("LOG_FILE")),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(key)) {
        Some(raw) => raw.parse().map_err(|_| {
            BridgeError::Configuration(format!("{} has an invalid value: {}", key, raw))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let empty = lookup_from(&[]);
        let cos = CosConfig::from_lookup(&empty).unwrap();
        let pipeline = PipelineConfig::from_lookup(&empty).unwrap();
        let jimeng = JimengConfig::from_lookup(&empty).unwrap();
        let logging = LoggingConfig::from_lookup(&empty).unwrap();

        assert_eq!(cos.region, "ap-guangzhou");
        assert_eq!(cos.bucket, "jimeng-images");
        assert_eq!(pipeline.upload_workers, 4);
        assert_eq!(jimeng.api_base, "http://localhost:8001");
        assert_eq!(jimeng.default_model, ImageModel::Jimeng30);
        assert_eq!(jimeng.request_timeout(), Duration::from_secs(120));
        assert_eq!(logging, LoggingConfig::default());
        assert!(cos.validate().is_err());
        assert!(jimeng.validate().is_err());
    }

    #[test]
    fn test_reads_overrides() {
        let lookup = lookup_from(&[
            ("TENCENT_CLOUD_SECRET_ID", "id"),
            ("TENCENT_CLOUD_SECRET_KEY", "key"),
            ("TENCENT_COS_DOMAIN", "img.example.com"),
            ("COS_UPLOAD_WORKERS", "8"),
            ("JIMENG_SESSION_ID", "session"),
            ("DEFAULT_MODEL", "jimeng-xl-pro"),
            ("DEFAULT_SAMPLE_STRENGTH", "0.7"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "JSON"),
            ("LOG_FILE", "/tmp/bridge.log"),
        ]);
        let cos = CosConfig::from_lookup(&lookup).unwrap();
        let pipeline = PipelineConfig::from_lookup(&lookup).unwrap();
        let jimeng = JimengConfig::from_lookup(&lookup).unwrap();
        let logging = LoggingConfig::from_lookup(&lookup).unwrap();

        assert!(cos.validate().is_ok());
        assert!(jimeng.validate().is_ok());
        assert_eq!(pipeline.upload_workers, 8);
        assert_eq!(jimeng.default_model, ImageModel::JimengXlPro);
        assert_eq!(jimeng.default_sample_strength, 0.7);
        assert_eq!(logging.level, LogLevel::Debug);
        assert!(logging.json);
        assert_eq!(logging.file.as_deref(), Some("/tmp/bridge.log"));
    }

    #[test]
    fn test_rejects_malformed_numbers_and_unknown_model() {
        let err = JimengConfig::from_lookup(lookup_from(&[("DEFAULT_WIDTH", "wide")])).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));

        let err = JimengConfig::from_lookup(lookup_from(&[("DEFAULT_MODEL", "dall-e")])).unwrap_err();
        assert!(err.to_string().contains("jimeng-3.0"));

        let err = LoggingConfig::from_lookup(lookup_from(&[("LOG_LEVEL", "loud")])).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn test_sections_parse_independently() {
        // A broken storage setting must not stop the generation side from loading.
        let lookup = lookup_from(&[("COS_UPLOAD_WORKERS", "0"), ("JIMENG_SESSION_ID", "s")]);
        assert!(matches!(
            PipelineConfig::from_lookup(&lookup).unwrap_err(),
            BridgeError::Configuration(_)
        ));
        assert!(JimengConfig::from_lookup(&lookup).unwrap().validate().is_ok());
        assert!(LoggingConfig::from_lookup(&lookup).is_ok());
    }

    #[test]
    fn test_object_url_prefers_custom_domain() {
        let config = CosConfig::new()
            .with_bucket("pics-125")
            .with_region("ap-beijing");
        assert_eq!(
            config.object_url("jimeng/a.png"),
            "https://pics-125.cos.ap-beijing.myqcloud.com/jimeng/a.png"
        );

        let config = config.with_domain("cdn.example.com/");
        assert_eq!(
            config.object_url("/jimeng/a.png"),
            "https://cdn.example.com/jimeng/a.png"
        );
    }

    #[test]
    fn test_generations_url_trims_slash() {
        let config = JimengConfig::new().with_api_base("http://api.local/");
        assert_eq!(
            config.generations_url(),
            "http://api.local/v1/images/generations"
        );
    }
}
