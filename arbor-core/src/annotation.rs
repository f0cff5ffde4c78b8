//! 注解模型
//!
//! 注解名与选项名大小写不敏感，构造时统一转为小写。
//! 选项是多值的：同名选项多次添加会追加而不是覆盖。

use std::fmt;

use crate::error::{ContainerError, ContainerResult};

/// 单个注解，例如 `@Inject(type=UserRepository, required=false)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    name: String,
    options: Vec<(String, Vec<String>)>,
}

impl Annotation {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            options: Vec::new(),
        }
    }

    /// 追加选项值
    pub fn add_option(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let key = name.as_ref().to_lowercase();
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.options.push((key, vec![value])),
        }
    }

    /// 构建器风格的 `add_option`
    pub fn with_option(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.add_option(name, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_option(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        self.options.iter().any(|(k, _)| *k == key)
    }

    /// 获取选项的所有值，选项不存在时返回 Lookup 错误
    pub fn get_option_values(&self, name: &str) -> ContainerResult<&[String]> {
        let key = name.to_lowercase();
        self.options
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, values)| values.as_slice())
            .ok_or_else(|| ContainerError::Lookup(format!("Unknown option: {}", name)))
    }

    /// 获取选项的第一个值
    pub fn get_option_single_value(&self, name: &str) -> ContainerResult<&str> {
        let values = self.get_option_values(name)?;
        values
            .first()
            .map(String::as_str)
            .ok_or_else(|| ContainerError::Lookup(format!("Unknown option: {}", name)))
    }

    /// 选项存在时返回第一个值
    pub fn option(&self, name: &str) -> Option<&str> {
        self.get_option_single_value(name).ok()
    }

    pub fn option_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.option(name).unwrap_or(default)
    }

    /// 读取布尔选项，只有字面量 `true` 视为真
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.option(name).map(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if self.options.is_empty() {
            return Ok(());
        }
        let rendered: Vec<String> = self
            .options
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| format!("{}={}", k, v)))
            .collect();
        write!(f, "({})", rendered.join(", "))
    }
}

/// 注解集合，以小写注解名为键，同名注解可以重复出现
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationCollection {
    annotations: Vec<(String, Vec<Annotation>)>,
}

impl AnnotationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, annotation: Annotation) {
        let key = annotation.name().to_string();
        match self.annotations.iter_mut().find(|(k, _)| *k == key) {
            Some((_, list)) => list.push(annotation),
            None => self.annotations.push((key, vec![annotation])),
        }
    }

    pub fn with(mut self, annotation: Annotation) -> Self {
        self.add(annotation);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        self.annotations.iter().any(|(k, _)| *k == key)
    }

    /// 获取某个名称下的全部注解，不存在时返回 Lookup 错误
    pub fn get_annotations(&self, name: &str) -> ContainerResult<&[Annotation]> {
        let key = name.to_lowercase();
        self.annotations
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, list)| list.as_slice())
            .ok_or_else(|| ContainerError::Lookup(format!("Unknown annotation: {}", name)))
    }

    /// 获取某个名称下的第一个注解
    pub fn get_single_annotation(&self, name: &str) -> Option<&Annotation> {
        self.get_annotations(name).ok().and_then(|list| list.first())
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// 注解名数量（同名注解只计一次）
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().flat_map(|(_, list)| list.iter())
    }
}

impl FromIterator<Annotation> for AnnotationCollection {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        let mut collection = AnnotationCollection::new();
        for annotation in iter {
            collection.add(annotation);
        }
        collection
    }
}
