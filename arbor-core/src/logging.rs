use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, EnvFilter};

use crate::error::{ContainerError, ContainerResult};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ContainerError::configuration(format!("Invalid log level: {}", s))),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 紧凑格式（默认）
    #[default]
    Compact,
    /// 完整格式（带时间、级别、目标）
    Full,
    /// JSON 格式
    Json,
    /// 美化格式（适合开发）
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(ContainerError::configuration(format!("Invalid log format: {}", s))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Full => write!(f, "full"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

/// 日志配置
///
/// 可以直接构建，也可以作为容器配置文件中的 `[logging]` 表读取：
///
/// ```toml
/// [logging]
/// level = "debug"
/// format = "json"
/// filter = "arbor_core=trace"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// 日志级别（默认：Info）
    pub level: LogLevel,

    /// 日志格式（默认：Compact）
    pub format: LogFormat,

    /// 是否显示目标（模块路径）（默认：false）
    pub show_target: bool,

    /// 是否显示线程 ID（默认：false）
    pub show_thread_ids: bool,

    /// 是否显示线程名（默认：false）
    pub show_thread_names: bool,

    /// 自定义过滤器（可选）
    /// 例如："arbor_core=debug,arbor_aop=warn"
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
            show_thread_names: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// 从环境变量读取配置（RUST_LOG / LOG_LEVEL / LOG_FORMAT）
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            config.filter = Some(rust_log);
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            match level.parse() {
                Ok(level) => config.level = level,
                Err(e) => eprintln!("Ignoring LOG_LEVEL: {}", e),
            }
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            match format.parse() {
                Ok(format) => config.format = format,
                Err(e) => eprintln!("Ignoring LOG_FORMAT: {}", e),
            }
        }

        config
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.to_string());
        match &self.filter {
            Some(filter) => EnvFilter::try_new(filter).unwrap_or_else(|_| fallback()),
            // 优先使用 RUST_LOG 环境变量，否则使用配置的级别
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }

    /// 初始化全局日志订阅者，重复初始化返回 `LoggingInitFailed`
    pub fn init(self) -> ContainerResult<()> {
        let env_filter = self.env_filter();
        let builder = subscriber_fmt()
            .with_env_filter(env_filter)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_thread_names(self.show_thread_names);

        let result = match self.format {
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Full => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
        };

        result.map_err(|e| ContainerError::LoggingInitFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("loud".parse::<LogLevel>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::new()
            .level(LogLevel::Debug)
            .format(LogFormat::Json)
            .show_target(true)
            .filter("arbor_core=trace");

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.show_target);
        assert_eq!(config.filter.as_deref(), Some("arbor_core=trace"));
    }

    #[test]
    fn test_logging_config_deserialize() {
        let config: LoggingConfig =
            toml::from_str("level = \"warn\"\nformat = \"pretty\"\nshow-thread-ids = true").unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.show_thread_ids);
        assert!(config.filter.is_none());
    }
}
