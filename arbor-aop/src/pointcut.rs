//! 切点表达式
//!
//! 切点的 `expression` 是匹配方法名的正则表达式，按原样编译（不自动加 `^...$`）。
//! 同一个表达式在进程内只编译一次。

use std::collections::HashMap;
use std::fmt;

use arbor_core::{ContainerError, ContainerResult, PointcutDefinition};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;

static PATTERN_CACHE: Lazy<RwLock<HashMap<String, Regex>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// 编译正则表达式，结果按表达式文本缓存
pub fn compile(expression: &str) -> ContainerResult<Regex> {
    if let Some(regex) = PATTERN_CACHE.read().get(expression) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(expression).map_err(|e| {
        ContainerError::configuration(format!("Invalid pointcut expression '{}': {}", expression, e))
    })?;
    PATTERN_CACHE
        .write()
        .insert(expression.to_string(), regex.clone());
    Ok(regex)
}

/// 编译后的切点
#[derive(Clone)]
pub struct CompiledPointcut {
    name: String,
    expression: Regex,
    /// 拦截器 Bean 上的入口方法
    entry: String,
}

impl CompiledPointcut {
    pub fn compile(definition: &PointcutDefinition) -> ContainerResult<Self> {
        Ok(Self {
            name: definition.name.clone(),
            expression: compile(&definition.expression)?,
            entry: definition.method.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn expression(&self) -> &str {
        self.expression.as_str()
    }

    /// 方法名是否匹配
    pub fn matches(&self, method: &str) -> bool {
        self.expression.is_match(method)
    }
}

impl fmt::Debug for CompiledPointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPointcut")
            .field("name", &self.name)
            .field("expression", &self.expression.as_str())
            .field("entry", &self.entry)
            .finish()
    }
}
