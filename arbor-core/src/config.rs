use std::collections::HashMap;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::error::{ContainerError, ContainerResult};
use crate::value::Value;

/// 配置值类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// 转换为字符串
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 转换为整数
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// 转换为浮点数
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Int(i) => Some(*i as f64),
            ConfigValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// 用于占位符替换的文本形式
    pub fn to_text(&self) -> String {
        match self {
            ConfigValue::String(s) => s.clone(),
            ConfigValue::Int(i) => i.to_string(),
            ConfigValue::Float(f) => f.to_string(),
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::Array(items) => items
                .iter()
                .map(ConfigValue::to_text)
                .collect::<Vec<_>>()
                .join(","),
            ConfigValue::Object(_) => String::new(),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<ConfigValue> for Value {
    fn from(value: ConfigValue) -> Self {
        match value {
            ConfigValue::String(s) => Value::String(s),
            ConfigValue::Int(i) => Value::Int(i),
            ConfigValue::Float(f) => Value::Float(f),
            ConfigValue::Bool(b) => Value::Bool(b),
            ConfigValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            ConfigValue::Object(map) => {
                let mut entries: Vec<(String, Value)> =
                    map.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                Value::Map(entries)
            }
        }
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 获取所有配置键
    fn keys(&self) -> Vec<String>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 配置管理器
///
/// 按优先级依次查询配置源；容器通过 `register_properties` 注册的属性
/// 保存在独立的表中，优先级高于所有配置源，容器关闭时清空。
pub struct Environment {
    /// 配置源列表（按优先级排序）
    sources: RwLock<Vec<Box<dyn PropertySource>>>,

    /// 容器注册的属性
    registered: RwLock<HashMap<String, ConfigValue>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("sources_count", &self.sources.read().len())
            .field("registered_count", &self.registered.read().len())
            .finish()
    }
}

impl Environment {
    /// 创建新的环境
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            registered: RwLock::new(HashMap::new()),
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        tracing::debug!(
            "Adding property source '{}' (priority {})",
            source.name(),
            source.priority()
        );
        let mut sources = self.sources.write();
        sources.push(source);
        // 按优先级降序排序，同优先级保持添加顺序
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 注册属性，同名属性被覆盖
    pub fn register_properties<I, K, V>(&self, properties: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        let mut registered = self.registered.write();
        for (key, value) in properties {
            registered.insert(key.into(), value.into());
        }
    }

    /// 清空注册的属性
    pub fn clear_registered(&self) {
        self.registered.write().clear();
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.registered.read().get(key) {
            return Some(value.clone());
        }
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Config '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        tracing::trace!("Config '{}' not found in any source", key);
        None
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 获取字符串配置
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_text())
    }

    /// 获取字符串配置（带默认值）
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    /// 获取整数配置
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// 获取布尔值配置
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// 获取字符串数组配置
    /// 支持两种格式:
    /// 1. TOML数组: key = ["a", "b", "c"]
    /// 2. 逗号分隔字符串: key = "a, b, c"
    pub fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            ConfigValue::Array(arr) => Some(arr.iter().map(ConfigValue::to_text).collect()),
            ConfigValue::String(s) => Some(
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// 替换文本中的 `${key}` 与 `${key:default}` 占位符
    ///
    /// 无法解析且没有默认值的占位符原样保留。
    pub fn resolve_placeholders(&self, text: &str) -> String {
        if !text.contains("${") {
            return text.to_string();
        }
        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                result.push_str(&rest[start..]);
                return result;
            };
            let expression = &after[..end];
            let (key, default) = match expression.split_once(':') {
                Some((key, default)) => (key.trim(), Some(default)),
                None => (expression.trim(), None),
            };
            match (self.get_string(key), default) {
                (Some(value), _) => result.push_str(&value),
                (None, Some(default)) => result.push_str(default),
                (None, None) => {
                    tracing::warn!("Unresolved placeholder '${{{}}}'", key);
                    result.push_str(&rest[start..start + 2 + end + 1]);
                }
            }
            rest = &after[end + 1..];
        }
        result.push_str(rest);
        result
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Property Sources ==========

/// 环境变量配置源
pub struct EnvironmentPropertySource {
    prefix: String,
    priority: i32,
}

impl EnvironmentPropertySource {
    /// 创建环境变量配置源
    ///
    /// # 参数
    /// * `prefix` - 环境变量前缀，例如 "APP_"
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            priority: 100, // 环境变量优先级较高
        }
    }

    /// 将环境变量名转换为配置键
    /// 例如: APP_DATABASE_URL -> database.url
    fn env_to_key(&self, env_key: &str) -> String {
        env_key
            .strip_prefix(&self.prefix)
            .unwrap_or(env_key)
            .to_lowercase()
            .replace('_', ".")
    }

    /// 将配置键转换为环境变量名
    /// 例如: database.url -> APP_DATABASE_URL
    fn key_to_env(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.replace('.', "_").to_uppercase())
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.key_to_env(key)).ok().map(ConfigValue::String)
    }

    fn keys(&self) -> Vec<String> {
        std::env::vars()
            .filter(|(k, _)| k.starts_with(&self.prefix))
            .map(|(k, _)| self.env_to_key(&k))
            .collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// TOML 文件配置源
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    /// 从文件加载 TOML 配置
    pub fn from_file(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let location = path.to_string_lossy().to_string();
        let content = fs::read_to_string(path).map_err(|e| ContainerError::io(&location, e))?;
        Self::parse(&content, location)
    }

    /// 从字符串解析 TOML 配置
    pub fn parse(content: &str, name: impl Into<String>) -> ContainerResult<Self> {
        let name = name.into();
        let value: toml::Value = toml::from_str(content).map_err(|e| {
            ContainerError::configuration(format!("Failed to parse TOML '{}': {}", name, e))
        })?;

        let mut properties = HashMap::new();
        flatten_toml(&value, String::new(), &mut properties);

        Ok(Self {
            name,
            properties,
            priority: 0, // 文件配置优先级最低
        })
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 取出展平后的全部属性
    pub fn into_properties(self) -> HashMap<String, ConfigValue> {
        self.properties
    }
}

/// 展平 TOML 结构
/// 例如: { database: { url: "xxx" } } -> { "database.url": "xxx" }
pub(crate) fn flatten_toml(
    value: &toml::Value,
    prefix: String,
    result: &mut HashMap<String, ConfigValue>,
) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_toml(val, new_prefix, result);
            }
        }
        other => {
            result.insert(prefix, toml_value_to_config(other));
        }
    }
}

/// 转换 TOML 值为 ConfigValue
fn toml_value_to_config(value: &toml::Value) -> ConfigValue {
    match value {
        toml::Value::String(s) => ConfigValue::String(s.clone()),
        toml::Value::Integer(i) => ConfigValue::Int(*i),
        toml::Value::Float(f) => ConfigValue::Float(*f),
        toml::Value::Boolean(b) => ConfigValue::Bool(*b),
        toml::Value::Array(arr) => ConfigValue::Array(arr.iter().map(toml_value_to_config).collect()),
        toml::Value::Table(table) => ConfigValue::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_value_to_config(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// `.properties` / `.ini` 风格的配置源
///
/// 每行 `key = value` 或 `key: value`；`#` 与 `;` 开头为注释；
/// `[section]` 下的键加上 `section.` 前缀。
pub struct IniPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl IniPropertySource {
    pub fn parse(content: &str, name: impl Into<String>) -> ContainerResult<Self> {
        Ok(Self {
            name: name.into(),
            properties: parse_ini(content)?,
            priority: 0,
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn into_properties(self) -> HashMap<String, ConfigValue> {
        self.properties
    }
}

impl PropertySource for IniPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 用 `config` crate 的 INI 格式解析 `.properties` / `.ini` 文本，节按 `.` 展开
pub fn parse_ini(content: &str) -> ContainerResult<HashMap<String, ConfigValue>> {
    let table = ::config::Config::builder()
        .add_source(::config::File::from_str(content, ::config::FileFormat::Ini))
        .build()
        .and_then(|settings| ::config::Source::collect(&settings))
        .map_err(|e| ContainerError::configuration(format!("Invalid properties content: {}", e)))?;
    let mut properties = HashMap::new();
    flatten_ini("", table, &mut properties);
    Ok(properties)
}

fn flatten_ini(
    prefix: &str,
    table: ::config::Map<String, ::config::Value>,
    properties: &mut HashMap<String, ConfigValue>,
) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key
        } else {
            format!("{}.{}", prefix, key)
        };
        match value.kind {
            ::config::ValueKind::Table(table) => flatten_ini(&key, table, properties),
            _ => {
                properties.insert(key, ConfigValue::String(value.to_string()));
            }
        }
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("low").with_property("db.host", "low").with_priority(1),
        ));
        env.add_property_source(Box::new(
            MapPropertySource::new("high").with_property("db.host", "high").with_priority(10),
        ));
        assert_eq!(env.get_string("db.host").as_deref(), Some("high"));

        env.register_properties([("db.host", "registered")]);
        assert_eq!(env.get_string("db.host").as_deref(), Some("registered"));

        env.clear_registered();
        assert_eq!(env.get_string("db.host").as_deref(), Some("high"));
    }

    #[test]
    fn test_toml_flatten() {
        let source = TomlPropertySource::parse(
            r#"
            [database]
            url = "postgres://localhost"
            pool = 5
            hosts = ["a", "b"]
            "#,
            "test",
        )
        .unwrap();
        assert_eq!(
            source.get("database.url"),
            Some(ConfigValue::String("postgres://localhost".into()))
        );
        assert_eq!(source.get("database.pool").and_then(|v| v.as_i64()), Some(5));

        let env = Environment::new();
        env.add_property_source(Box::new(source));
        assert_eq!(
            env.get_string_array("database.hosts"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_invalid_toml() {
        let err = TomlPropertySource::parse("not = [valid", "broken").err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_parse_ini() {
        let properties = parse_ini(
            "# comment\nname = arbor\nmail.sender = a@b.c\n; other comment\n[db]\nuser: \"admin\"\n",
        )
        .unwrap();
        assert_eq!(properties.get("name"), Some(&ConfigValue::String("arbor".into())));
        assert_eq!(properties.get("mail.sender"), Some(&ConfigValue::String("a@b.c".into())));
        assert_eq!(properties.get("db.user"), Some(&ConfigValue::String("admin".into())));
        assert_eq!(properties.len(), 3);

        let source = IniPropertySource::parse("[db]\nport = 5432\n", "db.ini").unwrap();
        assert_eq!(source.get("db.port").and_then(|v| v.as_i64()), Some(5432));
    }

    #[test]
    fn test_resolve_placeholders() {
        let env = Environment::new();
        env.register_properties([("host", "localhost"), ("port", "5432")]);

        assert_eq!(env.resolve_placeholders("${host}:${port}"), "localhost:5432");
        assert_eq!(env.resolve_placeholders("${user:guest}@${host}"), "guest@localhost");
        assert_eq!(env.resolve_placeholders("${missing}/x"), "${missing}/x");
        assert_eq!(env.resolve_placeholders("plain"), "plain");
        assert_eq!(env.resolve_placeholders("${unterminated"), "${unterminated");
    }

    #[test]
    fn test_config_value_into_value() {
        let value = Value::from(ConfigValue::Array(vec![ConfigValue::Int(1), ConfigValue::Bool(true)]));
        assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Bool(true)]));
    }
}
