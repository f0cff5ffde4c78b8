//! 运行时值
//!
//! `Literal` 是定义阶段的字面量，`Value` 是装配阶段交给 Bean 的运行时值，
//! 可以携带其它 Bean 的引用。

use std::fmt;
use std::sync::Arc;

use crate::bean::Bean;
use crate::error::{ContainerError, ContainerResult};

/// 定义中的字面量
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

/// 运行时值
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    /// 保持插入顺序的映射
    Map(Vec<(String, Value)>),
    Bean(Arc<dyn Bean>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// 映射取值
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn as_bean(&self) -> Option<&Arc<dyn Bean>> {
        match self {
            Value::Bean(bean) => Some(bean),
            _ => None,
        }
    }

    /// 将 Bean 值转换为具体类型，被切面代理包装的 Bean 会转换其原始对象
    pub fn downcast<T: Bean>(&self) -> Option<Arc<T>> {
        self.as_bean().and_then(|bean| <dyn Bean>::downcast_arc::<T>(bean.clone()))
    }

    /// 同 `downcast`，失败时返回类型错误
    pub fn expect_bean<T: Bean>(&self, what: &str) -> ContainerResult<Arc<T>> {
        self.downcast::<T>().ok_or_else(|| ContainerError::TypeMismatch {
            bean: what.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
    }

    /// 字符串化，数组与映射按结构输出
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Value::Bean(bean) => write!(f, "Bean({})", bean.class_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Value::Map(entries) => {
                let rendered: Vec<String> =
                    entries.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Value::Bean(bean) => write!(f, "<{}>", bean.class_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Bean(a), Value::Bean(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(i) => Value::Int(i),
            Literal::Float(f) => Value::Float(f),
            Literal::String(s) => Value::String(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Arc<dyn Bean>> for Value {
    fn from(value: Arc<dyn Bean>) -> Self {
        Value::Bean(value)
    }
}

/// 构造函数 / 工厂方法参数，保持声明顺序，可选命名
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    items: Vec<(Option<String>, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push((None, value.into()));
    }

    pub fn push_named(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.items.push((Some(name.into()), value.into()));
    }

    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.push(value);
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_named(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 按位置取值
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index).map(|(_, v)| v)
    }

    /// 按名称取值
    pub fn named(&self, name: &str) -> Option<&Value> {
        self.items
            .iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, v)| v)
    }

    /// 同名参数的全部取值，按声明顺序
    pub fn named_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.items
            .iter()
            .filter(move |(n, _)| n.as_deref() == Some(name))
            .map(|(_, v)| v)
    }

    /// 先按名称查找，找不到再按位置查找
    pub fn resolve(&self, name: &str, index: usize) -> Option<&Value> {
        self.named(name).or_else(|| self.get(index))
    }

    /// 同 `resolve`，缺失时返回错误
    pub fn require(&self, name: &str, index: usize) -> ContainerResult<&Value> {
        self.resolve(name, index).ok_or_else(|| {
            ContainerError::Other(anyhow::anyhow!(
                "Missing argument '{}' (position {})",
                name,
                index
            ))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &Value)> {
        self.items.iter().map(|(n, v)| (n.as_deref(), v))
    }

    pub fn into_values(self) -> Vec<Value> {
        self.items.into_iter().map(|(_, v)| v).collect()
    }
}
