//! 容器统一错误类型
//!
//! 错误分为三大类：
//! - 配置错误（Configuration）：声明式文件格式错误、非法的作用域/切面类型、无法解析的 import
//! - 装配错误（Wiring）：按类型注入找不到或找到多个候选、缺少 @Required 属性
//! - 查找错误（Lookup）：访问不存在的注解或注解选项，属于 provider/driver 的编程错误
//!
//! 所有错误都是结构性的，不做任何重试。

use thiserror::Error;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 配置错误，在容器构建阶段抛出
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 装配错误，在解析 Bean 定义时抛出
    #[error("Wiring error on '{bean}' ({target}): {reason}")]
    Wiring {
        bean: String,
        target: String,
        reason: String,
    },

    /// 未知注解或未知注解选项
    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Bean not found: {0}")]
    BeanNotFound(String),

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    #[error("Failed to create bean '{bean}': {reason}")]
    BeanCreationFailed { bean: String, reason: String },

    #[error("Bean '{bean}' is not of type {expected}")]
    TypeMismatch { bean: String, expected: String },

    /// 方法调用失败（未知方法、参数不匹配、业务代码返回错误）
    #[error("Invocation of {class}::{method} failed: {reason}")]
    Invocation {
        class: String,
        method: String,
        reason: String,
    },

    #[error("Container has been disposed")]
    ContainerDisposed,

    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    #[error("I/O error on '{location}': {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ContainerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ContainerError::Configuration(message.into())
    }

    pub fn wiring(
        bean: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ContainerError::Wiring {
            bean: bean.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn creation(bean: impl Into<String>, reason: impl Into<String>) -> Self {
        ContainerError::BeanCreationFailed {
            bean: bean.into(),
            reason: reason.into(),
        }
    }

    pub fn invocation(
        class: impl Into<String>,
        method: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ContainerError::Invocation {
            class: class.into(),
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// 未知方法，Bean 默认的 invoke 实现使用
    pub fn no_such_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::invocation(class, method, "no such method")
    }

    pub fn io(location: impl Into<String>, source: std::io::Error) -> Self {
        ContainerError::Io {
            location: location.into(),
            source,
        }
    }

    /// 是否为装配错误
    pub fn is_wiring(&self) -> bool {
        matches!(self, ContainerError::Wiring { .. })
    }

    /// 是否为配置错误
    pub fn is_configuration(&self) -> bool {
        matches!(self, ContainerError::Configuration(_))
    }

    /// 是否为调用了 `method` 这个不存在的方法
    pub fn is_no_such_method(&self, method: &str) -> bool {
        matches!(
            self,
            ContainerError::Invocation { method: m, reason, .. }
                if m == method && reason == "no such method"
        )
    }
}

/// 容器操作结果
pub type ContainerResult<T> = Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_dependency_message() {
        let err = ContainerError::CircularDependency(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);
        assert_eq!(err.to_string(), "Circular dependency detected: a -> b -> a");
    }

    #[test]
    fn test_wiring_helpers() {
        let err = ContainerError::wiring("userService", "repository", "Too many candidates");
        assert!(err.is_wiring());
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("Too many candidates"));
    }

    #[test]
    fn test_from_anyhow() {
        let err: ContainerError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
