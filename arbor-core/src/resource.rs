//! 资源抽象
//!
//! 属性文件等外部资源通过 `ResourceLoader` 按位置字符串加载，
//! 目前只支持文件系统：`file:///etc/app.properties` 或普通路径。

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use url::Url;

use crate::error::{ContainerError, ContainerResult};

const FILE_SCHEME: &str = "file://";

/// 资源
pub trait Resource: Send + Sync + std::fmt::Debug {
    /// 资源是否实际存在
    fn exists(&self) -> bool;

    /// 是否已经打开过流
    fn is_open(&self) -> bool;

    /// 打开资源
    fn get_stream(&self) -> ContainerResult<Box<dyn Read + Send>>;

    /// 相对于本资源所在位置创建新资源
    fn create_relative(&self, relative_path: &str) -> Box<dyn Resource>;

    fn get_filename(&self) -> String;

    /// 完整 URL
    fn get_url(&self) -> String;

    /// 读取全部内容
    fn read_to_string(&self) -> ContainerResult<String> {
        let mut content = String::new();
        self.get_stream()?
            .read_to_string(&mut content)
            .map_err(|e| ContainerError::io(self.get_url(), e))?;
        Ok(content)
    }
}

/// 文件系统资源
#[derive(Debug)]
pub struct FilesystemResource {
    path: PathBuf,
    opened: AtomicBool,
}

impl FilesystemResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            opened: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Resource for FilesystemResource {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn is_open(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    fn get_stream(&self) -> ContainerResult<Box<dyn Read + Send>> {
        let file = File::open(&self.path).map_err(|e| ContainerError::io(self.get_url(), e))?;
        self.opened.store(true, Ordering::Release);
        Ok(Box::new(file))
    }

    fn create_relative(&self, relative_path: &str) -> Box<dyn Resource> {
        let base = if self.path.is_dir() {
            self.path.as_path()
        } else {
            self.path.parent().unwrap_or_else(|| Path::new(""))
        };
        Box::new(FilesystemResource::new(base.join(relative_path)))
    }

    fn get_filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    fn get_url(&self) -> String {
        std::path::absolute(&self.path)
            .ok()
            .and_then(|path| Url::from_file_path(path).ok())
            .map(String::from)
            .unwrap_or_else(|| format!("{}{}", FILE_SCHEME, self.path.display()))
    }
}

/// 资源加载器
pub trait ResourceLoader: Send + Sync {
    fn get_resource(&self, location: &str) -> ContainerResult<Box<dyn Resource>>;
}

/// 默认资源加载器：`file://` 前缀或普通路径，相对路径基于可选的基准目录
#[derive(Debug, Clone, Default)]
pub struct DefaultResourceLoader {
    base_dir: Option<PathBuf>,
}

impl DefaultResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }
}

impl ResourceLoader for DefaultResourceLoader {
    fn get_resource(&self, location: &str) -> ContainerResult<Box<dyn Resource>> {
        let location = location.trim();
        let path = match location.split_once("://") {
            Some(("file", path)) if path.starts_with('/') => Url::parse(location)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .unwrap_or_else(|| PathBuf::from(path)),
            Some(("file", path)) => PathBuf::from(path),
            Some((scheme, _)) => {
                return Err(ContainerError::configuration(format!(
                    "Unsupported resource scheme '{}' in '{}'",
                    scheme, location
                )))
            }
            None => PathBuf::from(location),
        };
        let path = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        };
        tracing::trace!("Resolved resource '{}' to {}", location, path.display());
        Ok(Box::new(FilesystemResource::new(path)))
    }
}
