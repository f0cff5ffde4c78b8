//! 声明式文件的统一文档树
//!
//! YAML 与 TOML 文件都转换为保持键顺序的 `Node`，provider 只处理这一种结构。

use crate::definition::ValueDefinition;
use crate::error::{ContainerError, ContainerResult};
use crate::value::Literal;

/// 文档节点
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Seq(Vec<Node>),
    Map(Vec<(String, Node)>),
}

impl Node {
    pub fn parse_yaml(content: &str, origin: &str) -> ContainerResult<Node> {
        if content.trim().is_empty() {
            return Ok(Node::Null);
        }
        let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| {
            ContainerError::configuration(format!("Could not parse '{}': {}", origin, e))
        })?;
        Ok(Node::from(value))
    }

    pub fn parse_toml(content: &str, origin: &str) -> ContainerResult<Node> {
        let value: toml::Table = toml::from_str(content).map_err(|e| {
            ContainerError::configuration(format!("Could not parse '{}': {}", origin, e))
        })?;
        Ok(Node::from(toml::Value::Table(value)))
    }

    /// 按扩展名选择解析器，`.toml` 之外的文件都按 YAML 解析
    pub fn parse_file_content(content: &str, filename: &str) -> ContainerResult<Node> {
        if filename.ends_with(".toml") {
            Self::parse_toml(content, filename)
        } else {
            Self::parse_yaml(content, filename)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// 空文档：null、空映射或空序列
    pub fn is_empty(&self) -> bool {
        match self {
            Node::Null => true,
            Node::Map(entries) => entries.is_empty(),
            Node::Seq(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Node::Seq(_) | Node::Map(_))
    }

    pub fn as_map(&self) -> Option<&[(String, Node)]> {
        match self {
            Node::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Vec<(String, Node)>> {
        match self {
            Node::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Node]> {
        match self {
            Node::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.as_map_mut()?
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 标量的文本形式，序列与映射返回 None
    pub fn as_text(&self) -> Option<String> {
        match self {
            Node::Null => Some(String::new()),
            Node::Bool(b) => Some(b.to_string()),
            Node::Int(i) => Some(i.to_string()),
            Node::Float(f) => Some(f.to_string()),
            Node::String(s) => Some(s.clone()),
            Node::Seq(_) | Node::Map(_) => None,
        }
    }

    /// 取 `key` 的文本值
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Node::as_text)
    }

    /// 布尔开关，接受 `true` 与字符串 `"true"`
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Node::Bool(b)) => *b,
            Some(Node::String(s)) => s.trim() == "true",
            _ => false,
        }
    }

    /// 标量转为字面量定义
    pub fn to_literal(&self) -> Option<Literal> {
        match self {
            Node::Null => Some(Literal::Null),
            Node::Bool(b) => Some(Literal::Bool(*b)),
            Node::Int(i) => Some(Literal::Int(*i)),
            Node::Float(f) => Some(Literal::Float(*f)),
            Node::String(s) => Some(Literal::String(s.clone())),
            Node::Seq(_) | Node::Map(_) => None,
        }
    }

    pub(crate) fn literal_value(&self) -> Option<ValueDefinition> {
        self.to_literal().map(ValueDefinition::Literal)
    }
}

impl From<serde_yaml::Value> for Node {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Node::Null,
            serde_yaml::Value::Bool(b) => Node::Bool(b),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Node::Int(i),
                None => Node::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_yaml::Value::String(s) => Node::String(s),
            serde_yaml::Value::Sequence(items) => Node::Seq(items.into_iter().map(Node::from).collect()),
            serde_yaml::Value::Mapping(map) => Node::Map(
                map.into_iter()
                    .map(|(k, v)| (crate::evaluator::yaml_key(k), Node::from(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Node::from(tagged.value),
        }
    }
}

impl From<toml::Value> for Node {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Node::String(s),
            toml::Value::Integer(i) => Node::Int(i),
            toml::Value::Float(f) => Node::Float(f),
            toml::Value::Boolean(b) => Node::Bool(b),
            toml::Value::Datetime(dt) => Node::String(dt.to_string()),
            toml::Value::Array(items) => Node::Seq(items.into_iter().map(Node::from).collect()),
            toml::Value::Table(table) => {
                Node::Map(table.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_keeps_key_order() {
        let node = Node::parse_yaml("beans:\n  z: {class: Z}\n  a: {class: A}\n", "t.yaml").unwrap();
        let beans = node.get("beans").unwrap().as_map().unwrap();
        assert_eq!(beans[0].0, "z");
        assert_eq!(beans[1].0, "a");
        assert_eq!(node.get("beans").unwrap().get("a").unwrap().text("class").as_deref(), Some("A"));
    }

    #[test]
    fn test_toml_keeps_key_order() {
        let node = Node::parse_file_content(
            "[beans.z]\nclass = \"Z\"\n[beans.a]\nclass = \"A\"\nprimary = true\n",
            "t.toml",
        )
        .unwrap();
        let beans = node.get("beans").unwrap();
        assert_eq!(beans.as_map().unwrap()[0].0, "z");
        assert!(beans.get("a").unwrap().flag("primary"));
    }

    #[test]
    fn test_flag_and_text() {
        let node = Node::parse_yaml("a: 'true'\nb: false\nc: 3\n", "t.yaml").unwrap();
        assert!(node.flag("a"));
        assert!(!node.flag("b"));
        assert!(!node.flag("missing"));
        assert_eq!(node.text("c").as_deref(), Some("3"));
    }

    #[test]
    fn test_parse_error_is_configuration() {
        let err = Node::parse_yaml("beans: [", "broken.yaml").unwrap_err();
        assert!(err.is_configuration());
        assert!(Node::parse_toml("beans = ", "broken.toml").is_err());
    }

    #[test]
    fn test_empty_documents() {
        assert!(Node::parse_yaml("", "e.yaml").unwrap().is_empty());
        assert!(Node::parse_toml("", "e.toml").unwrap().is_empty());
    }
}
