use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, Metadata, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::{CosConfig, JimengConfig, LoggingConfig, PipelineConfig};
use crate::error::{BridgeError, Result};

static BRIDGE_LOGGER: Lazy<BridgeLogger> = Lazy::new(BridgeLogger::new);

pub fn init_with_config(config: LoggerConfig) -> Result<()> {
    BRIDGE_LOGGER.update_config(config.clone())?;

    log::set_logger(&*BRIDGE_LOGGER)
        .map_err(|e| BridgeError::Configuration(format!("Failed to set logger: {:?}", e)))?;

    log::set_max_level(config.min_level.to_log_level_filter());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LogLevel::Trace => "🔍",
            LogLevel::Debug => "🐛",
            LogLevel::Info => "💡",
            LogLevel::Warn => "⚠️",
            LogLevel::Error => "❌",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn to_log_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }

    pub fn to_log_level_filter(&self) -> log::LevelFilter {
        self.to_log_level().to_level_filter()
    }

    pub fn from_log_level(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(BridgeError::Configuration(format!(
                "Unknown log level: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub module: String,
    pub file: String,
    pub line: u32,
    pub thread_id: String,
    pub uptime_ms: Option<u64>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: String, module: String, file: String, line: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message,
            module,
            file,
            line,
            thread_id: format!("{:?}", std::thread::current().id()),
            uptime_ms: None,
        }
    }

    pub fn with_uptime(mut self, uptime: Duration) -> Self {
        self.uptime_ms = Some(uptime.as_millis() as u64);
        self
    }
}

/// Logger settings. Console output always goes to stderr: stdout belongs to
/// the tool protocol.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_thread_id: bool,
    pub show_file_location: bool,
    pub show_module: bool,
    pub include_timestamp: bool,
    pub include_uptime: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_to_file: bool,
    pub log_file_path: String,
    pub custom_prefix: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_emojis: true,
            show_thread_id: false,
            show_file_location: false,
            show_module: true,
            include_timestamp: true,
            include_uptime: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_to_file: false,
            log_file_path: "jimeng-bridge.log".to_string(),
            custom_prefix: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_file_output(mut self, path: &str) -> Self {
        self.log_to_file = true;
        self.log_file_path = path.to_string();
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        if enabled {
            self.show_colors = false;
            self.show_emojis = false;
        }
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.custom_prefix = Some(prefix.into());
        self
    }

    /// Console and file settings from `LOG_LEVEL`, `LOG_FORMAT` and `LOG_FILE`.
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        let mut config = Self::new()
            .with_level(settings.level)
            .with_json_output(settings.json);
        if settings.json {
            config.include_uptime = true;
        }
        if let Some(path) = &settings.file {
            config = config.with_file_output(path);
        }
        config
    }
}

pub struct BridgeLogger {
    config: Arc<Mutex<LoggerConfig>>,
    log_file: Arc<Mutex<Option<File>>>,
    start_time: Instant,
}

impl BridgeLogger {
    pub fn new() -> Self {
        Self {
            config: Arc::new(Mutex::new(LoggerConfig::default())),
            log_file: Arc::new(Mutex::new(None)),
            start_time: Instant::now(),
        }
    }

    pub fn update_config(&self, new_config: LoggerConfig) -> Result<()> {
        if new_config.log_to_file {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&new_config.log_file_path)
                .map_err(|e| {
                    BridgeError::Configuration(format!(
                        "Cannot open log file {}: {}",
                        new_config.log_file_path, e
                    ))
                })?;
            if let Ok(mut log_file) = self.log_file.lock() {
                *log_file = Some(file);
            }
        }

        if let Ok(mut config) = self.config.lock() {
            *config = new_config;
        }
        Ok(())
    }

    pub fn format_line(&self, entry: &LogEntry, config: &LoggerConfig) -> String {
        let mut output = String::new();

        if let Some(prefix) = &config.custom_prefix {
            if config.show_colors {
                output.push_str(&format!("[{}] ", prefix.bright_white().bold()));
            } else {
                output.push_str(&format!("[{}] ", prefix));
            }
        }

        if config.include_timestamp {
            let timestamp = entry.timestamp.format(&config.timestamp_format).to_string();
            if config.show_colors {
                output.push_str(&format!("{} ", timestamp.bright_black()));
            } else {
                output.push_str(&format!("{} ", timestamp));
            }
        }

        let level_str = if config.show_emojis {
            format!("{} {}", entry.level.emoji(), entry.level.as_str())
        } else {
            entry.level.as_str().to_string()
        };

        if config.show_colors {
            output.push_str(&format!(
                "[{}] ",
                level_str.color(entry.level.color()).bold()
            ));
        } else {
            output.push_str(&format!("[{}] ", level_str));
        }

        if config.show_module && !entry.module.is_empty() {
            if config.show_colors {
                output.push_str(&format!("{}: ", entry.module.bright_blue()));
            } else {
                output.push_str(&format!("{}: ", entry.module));
            }
        }

        output.push_str(&entry.message);

        if let Some(uptime) = entry.uptime_ms {
            output.push_str(&format!(" [+{}ms]", uptime));
        }

        if config.show_thread_id {
            output.push_str(&format!(" [thread:{}]", entry.thread_id));
        }

        if config.show_file_location {
            let location = format!("{}:{}", entry.file, entry.line);
            if config.show_colors {
                output.push_str(&format!(" ({})", location.bright_black()));
            } else {
                output.push_str(&format!(" ({})", location));
            }
        }

        output
    }

    fn render(&self, entry: &LogEntry, config: &LoggerConfig) -> String {
        if config.output_json {
            serde_json::to_string(entry).unwrap_or_default()
        } else {
            self.format_line(entry, config)
        }
    }

    fn write_to_file(&self, entry: &LogEntry, config: &LoggerConfig) {
        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(ref mut file) = *guard {
                // Files never get ANSI colors.
                let plain = LoggerConfig {
                    show_colors: false,
                    ..config.clone()
                };
                let line = self.render(entry, &plain) + "\n";
                let _ = file.write_all(line.as_bytes());
            }
        }
    }

    fn create_log_entry(&self, record: &Record, config: &LoggerConfig) -> LogEntry {
        let entry = LogEntry::new(
            LogLevel::from_log_level(record.level()),
            record.args().to_string(),
            record.module_path().unwrap_or("unknown").to_string(),
            record.file().unwrap_or("unknown").to_string(),
            record.line().unwrap_or(0),
        );
        if config.include_uptime {
            entry.with_uptime(self.start_time.elapsed())
        } else {
            entry
        }
    }
}

impl Default for BridgeLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl log::Log for BridgeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) => metadata.level() <= config.min_level.to_log_level(),
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(config) = self.config.lock() {
            let entry = self.create_log_entry(record, &config);
            eprintln!("{}", self.render(&entry, &config));

            if config.log_to_file {
                self.write_to_file(&entry, &config);
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(ref mut file) = *guard {
                let _ = file.flush();
            }
        }
    }
}

/// Measures an operation and logs its duration when stopped or dropped.
pub struct Timer {
    start: Instant,
    name: String,
    stopped: bool,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("⏱️  Starting timer: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
            stopped: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn stop(&mut self) -> Duration {
        let duration = self.elapsed();
        if !self.stopped {
            self.stopped = true;
            log::info!(
                "⏱️  Timer '{}' completed in {}ms",
                self.name,
                duration.as_millis()
            );
        }
        duration
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_startup_info(app_name: &str, version: &str, transport: &str) {
    log::info!("🚀 Starting {} v{}", app_name, version);
    log::info!("🔌 Transport: {}", transport);
    log::info!("📝 Logger initialized successfully");
}

/// Logs the generation settings. The session id is reported as set/unset only.
pub fn log_jimeng_config(config: &JimengConfig) {
    log::info!("⚙️  Configuration loaded:");
    log::info!("   Jimeng API: {}", config.api_base);
    log::info!("   Session ID: {}", set_or_unset(config.session_id.is_some()));
    log::info!("   Default model: {}", config.default_model);
    log::info!(
        "   Defaults: {}x{}, sample_strength {}",
        config.default_width,
        config.default_height,
        config.default_sample_strength
    );
}

pub fn log_cos_config(cos: &CosConfig, pipeline: &PipelineConfig) {
    log::info!("⚙️  COS bucket: {} ({})", cos.bucket, cos.region);
    log::info!(
        "   COS domain: {}",
        cos.domain.as_deref().unwrap_or("default bucket host")
    );
    log::info!(
        "   COS credentials: {}",
        set_or_unset(cos.secret_id.is_some() && cos.secret_key.is_some())
    );
    log::info!(
        "   Upload workers: {}, key prefix: {}",
        pipeline.upload_workers,
        pipeline.key_prefix
    );
}

fn set_or_unset(present: bool) -> &'static str {
    if present {
        "✅"
    } else {
        "❌"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sample_entry() -> LogEntry {
        LogEntry::new(
            LogLevel::Warn,
            "bucket unreachable".to_string(),
            "jimeng_bridge::storage".to_string(),
            "src/storage/mod.rs".to_string(),
            42,
        )
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(LogLevel::Info.as_str(), "INFO");
        assert_eq!(LogLevel::Error.emoji(), "❌");
        assert_eq!(LogLevel::Debug.color(), Color::Blue);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_settings_map_onto_logger_config() {
        let text = LoggerConfig::from_settings(&LoggingConfig::default());
        assert_eq!(text.min_level, LogLevel::Info);
        assert!(text.show_colors);
        assert!(!text.output_json);
        assert!(!text.log_to_file);

        let json = LoggerConfig::from_settings(&LoggingConfig {
            level: LogLevel::Debug,
            json: true,
            file: Some("/var/log/bridge.log".to_string()),
        });
        assert_eq!(json.min_level, LogLevel::Debug);
        assert!(json.output_json);
        assert!(!json.show_colors);
        assert!(json.include_uptime);
        assert!(json.log_to_file);
        assert_eq!(json.log_file_path, "/var/log/bridge.log");
    }

    #[test]
    fn test_plain_format_contains_fields() {
        let logger = BridgeLogger::new();
        let config = LoggerConfig {
            show_colors: false,
            ..LoggerConfig::new()
        }
        .with_prefix("cos-tool");
        let line = logger.format_line(&sample_entry(), &config);
        assert!(line.starts_with("[cos-tool] "));
        assert!(line.contains("WARN"));
        assert!(line.contains("jimeng_bridge::storage: bucket unreachable"));
    }

    #[test]
    fn test_json_format_is_one_object_per_line() {
        let logger = BridgeLogger::new();
        let config = LoggerConfig::new().with_json_output(true);
        let line = logger.render(&sample_entry(), &config);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["level"], "Warn");
        assert_eq!(parsed["line"], 42);
    }

    #[test]
    fn test_file_sink_receives_plain_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.log");
        let logger = BridgeLogger::new();
        let settings = LoggingConfig {
            file: Some(path.to_str().unwrap().to_string()),
            ..LoggingConfig::default()
        };
        let config = LoggerConfig::from_settings(&settings);
        logger.update_config(config.clone()).unwrap();

        logger.write_to_file(&sample_entry(), &config);
        log::Log::flush(&logger);

        let mut contents = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert!(contents.contains("bucket unreachable"));
        assert!(!contents.contains('\u{1b}'));
    }

    #[test]
    fn test_logger_initialization() {
        let config = LoggerConfig::new().with_level(LogLevel::Debug);
        assert!(init_with_config(config).is_ok());
    }
}
