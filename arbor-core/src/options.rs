//! 容器配置
//!
//! ```toml
//! preinstantiate-singletons = true
//! property-files = ["config/app.properties"]
//!
//! [properties]
//! "db.host" = "localhost"
//!
//! [declarative]
//! files = ["beans.yaml"]
//! directories = ["config"]
//!
//! [logging]
//! level = "debug"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ContainerError, ContainerResult};
use crate::logging::LoggingConfig;

/// 容器选项
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContainerOptions {
    /// 构建完成后立即创建所有单例
    pub preinstantiate_singletons: bool,

    /// 构建时解析所有 provider 声明的定义（失败即中止构建）
    pub eager_definitions: bool,

    /// 直接注册的属性
    pub properties: BTreeMap<String, String>,

    /// 由 PropertiesDriver 加载的属性文件
    pub property_files: Vec<String>,

    pub declarative: DeclarativeOptions,

    pub logging: Option<LoggingConfig>,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            preinstantiate_singletons: false,
            eager_definitions: true,
            properties: BTreeMap::new(),
            property_files: Vec::new(),
            declarative: DeclarativeOptions::default(),
            logging: None,
        }
    }
}

/// 声明式 Bean 文件的位置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DeclarativeOptions {
    /// 文件名（相对于搜索目录）或路径
    pub files: Vec<String>,

    /// 搜索目录，按顺序查找
    pub directories: Vec<PathBuf>,
}

impl DeclarativeOptions {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> ContainerResult<Self> {
        toml::from_str(content).map_err(|e| {
            ContainerError::configuration(format!("Invalid container options: {}", e))
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| ContainerError::io(path.display().to_string(), e))?;
        tracing::debug!("Loading container options from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn preinstantiate_singletons(mut self, enabled: bool) -> Self {
        self.preinstantiate_singletons = enabled;
        self
    }

    pub fn eager_definitions(mut self, enabled: bool) -> Self {
        self.eager_definitions = enabled;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_property_file(mut self, location: impl Into<String>) -> Self {
        self.property_files.push(location.into());
        self
    }

    pub fn with_declarative_file(mut self, file: impl Into<String>) -> Self {
        self.declarative.files.push(file.into());
        self
    }

    pub fn with_declarative_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.declarative.directories.push(directory.into());
        self
    }
}
