//! 切面元数据与切面管理器
//!
//! 这里只描述"要织入什么"，具体的代理与拦截链在 arbor-aop 中实现。

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;

use crate::error::{ContainerError, ContainerResult};
use crate::value::Value;

/// 切面类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectType {
    /// 方法拦截：围绕目标方法调用执行
    Method,
    /// 异常拦截：目标方法返回错误时执行
    Exception,
}

impl FromStr for AspectType {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "method" => Ok(AspectType::Method),
            "exception" => Ok(AspectType::Exception),
            other => Err(ContainerError::configuration(format!(
                "Invalid aspect type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for AspectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectType::Method => write!(f, "method"),
            AspectType::Exception => write!(f, "exception"),
        }
    }
}

/// 切点定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointcutDefinition {
    pub name: String,
    /// 匹配目标方法名的正则表达式
    pub expression: String,
    /// 拦截器 Bean 上的入口方法名
    pub method: String,
}

impl PointcutDefinition {
    pub fn new(
        name: impl Into<String>,
        expression: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            method: method.into(),
        }
    }
}

/// 切面定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectDefinition {
    pub name: String,
    /// 引用的切点名称
    pub pointcuts: Vec<String>,
    pub kind: AspectType,
    /// 拦截器实现所在的 Bean
    pub bean_name: String,
    /// 匹配目标类名的正则表达式，空串表示匹配所有类
    pub class_expression: String,
}

impl AspectDefinition {
    pub fn new(
        name: impl Into<String>,
        pointcuts: Vec<String>,
        kind: AspectType,
        bean_name: impl Into<String>,
        class_expression: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pointcuts,
            kind,
            bean_name: bean_name.into(),
            class_expression: class_expression.into(),
        }
    }
}

/// 切面管理器
///
/// 保存所有具名切点，以及对所有 Bean 生效的全局切面（按 class_expression 过滤）。
#[derive(Debug, Default)]
pub struct AspectManager {
    pointcuts: RwLock<HashMap<String, PointcutDefinition>>,
    aspects: RwLock<Vec<AspectDefinition>>,
}

impl AspectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册切点，同名切点会被替换
    pub fn set_pointcut(&self, pointcut: PointcutDefinition) {
        tracing::trace!("Registering pointcut '{}' ({})", pointcut.name, pointcut.expression);
        self.pointcuts.write().insert(pointcut.name.clone(), pointcut);
    }

    pub fn get_pointcut(&self, name: &str) -> Option<PointcutDefinition> {
        self.pointcuts.read().get(name).cloned()
    }

    /// 获取切点，不存在时返回配置错误
    pub fn require_pointcut(&self, name: &str) -> ContainerResult<PointcutDefinition> {
        self.get_pointcut(name)
            .ok_or_else(|| ContainerError::configuration(format!("Unknown pointcut: {}", name)))
    }

    /// 注册全局切面，同名切面会被替换
    pub fn set_aspect(&self, aspect: AspectDefinition) {
        let mut aspects = self.aspects.write();
        match aspects.iter_mut().find(|a| a.name == aspect.name) {
            Some(existing) => *existing = aspect,
            None => {
                tracing::debug!(
                    "Registering global {} aspect '{}' -> bean '{}'",
                    aspect.kind,
                    aspect.name,
                    aspect.bean_name
                );
                aspects.push(aspect);
            }
        }
    }

    pub fn get_aspects(&self) -> Vec<AspectDefinition> {
        self.aspects.read().clone()
    }

    pub fn pointcut_count(&self) -> usize {
        self.pointcuts.read().len()
    }

    pub fn aspect_count(&self) -> usize {
        self.aspects.read().len()
    }
}

/// 一次被拦截的方法调用
///
/// 方法拦截器通过 `proceed` 把调用交给下一个拦截器（最后一个交给目标对象）；
/// 异常拦截器可以通过 `error` 读取目标方法返回的错误。
pub trait Invocation {
    /// 目标 Bean 的类名
    fn class_name(&self) -> &str;

    fn method_name(&self) -> &str;

    fn arguments(&self) -> &[Value];

    /// 替换传给后续拦截器与目标方法的参数
    fn set_arguments(&mut self, arguments: Vec<Value>);

    /// 异常拦截时目标方法返回的错误
    fn error(&self) -> Option<&ContainerError> {
        None
    }

    /// 继续执行调用链
    fn proceed(&mut self) -> ContainerResult<Value>;
}
