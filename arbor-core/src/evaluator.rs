use crate::error::{ContainerError, ContainerResult};
use crate::value::Value;

/// 表达式求值器
///
/// 定义中的 `Code` 值在装配时交给求值器计算；占位符已经替换完毕。
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str) -> ContainerResult<Value>;
}

/// 默认求值器：把表达式当作 YAML 字面量解析
///
/// `42`、`true`、`[1, 2]`、`{a: 1}` 分别得到整数、布尔、数组与映射。
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralEvaluator;

impl ExpressionEvaluator for LiteralEvaluator {
    fn evaluate(&self, expression: &str) -> ContainerResult<Value> {
        let parsed: serde_yaml::Value = serde_yaml::from_str(expression).map_err(|e| {
            ContainerError::configuration(format!("Cannot evaluate '{}': {}", expression, e))
        })?;
        Ok(yaml_to_value(parsed))
    }
}

pub(crate) fn yaml_to_value(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_value).collect())
        }
        serde_yaml::Value::Mapping(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_value(v)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_value(tagged.value),
    }
}

pub(crate) fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
