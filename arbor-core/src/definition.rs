//! Bean 定义模型
//!
//! 定义由 provider 创建，经过生命周期管道（AfterDefinition drivers）修改，
//! 最后由容器冻结为 `Arc<BeanDefinition>` 并用于实例化。

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::aspect::AspectDefinition;
use crate::scope::Scope;
use crate::value::Literal;

static NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 属性值 / 构造参数值的定义
#[derive(Debug, Clone, PartialEq)]
pub enum ValueDefinition {
    /// 字面量，字符串中的 `${...}` 占位符在装配时解析
    Literal(Literal),
    /// 按名称引用另一个 Bean
    Bean(String),
    /// 嵌套数组，元素本身也是值定义
    Array(Vec<ArrayElement>),
    /// 装配时交给表达式求值器计算的代码
    Code(String),
}

impl ValueDefinition {
    pub fn literal(value: impl Into<Literal>) -> Self {
        ValueDefinition::Literal(value.into())
    }

    pub fn bean(name: impl Into<String>) -> Self {
        ValueDefinition::Bean(name.into())
    }

    pub fn code(expression: impl Into<String>) -> Self {
        ValueDefinition::Code(expression.into())
    }

    /// 由 Bean 名称列表构成的数组（按类型注入多个候选时使用）
    pub fn bean_array<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueDefinition::Array(
            names
                .into_iter()
                .map(|name| ArrayElement::new(ValueDefinition::Bean(name.into())))
                .collect(),
        )
    }

    /// 收集该值直接或间接引用的 Bean 名称
    pub fn referenced_beans(&self, out: &mut Vec<String>) {
        match self {
            ValueDefinition::Bean(name) => out.push(name.clone()),
            ValueDefinition::Array(items) => {
                for item in items {
                    item.value.referenced_beans(out);
                }
            }
            ValueDefinition::Literal(_) | ValueDefinition::Code(_) => {}
        }
    }
}

/// 数组元素，`key` 为映射形式数组的键
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayElement {
    pub key: Option<String>,
    pub value: ValueDefinition,
}

impl ArrayElement {
    pub fn new(value: ValueDefinition) -> Self {
        Self { key: None, value }
    }

    pub fn keyed(key: impl Into<String>, value: ValueDefinition) -> Self {
        Self {
            key: Some(key.into()),
            value,
        }
    }
}

/// 属性定义
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub name: String,
    pub value: ValueDefinition,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, value: ValueDefinition) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// 构造参数定义
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorArgumentDefinition {
    pub name: Option<String>,
    pub value: ValueDefinition,
}

impl ConstructorArgumentDefinition {
    pub fn new(value: ValueDefinition) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: ValueDefinition) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// 查找方法注入：调用 `method` 时返回容器中名为 `bean` 的 Bean
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInjection {
    pub method: String,
    pub bean: String,
}

impl MethodInjection {
    pub fn new(method: impl Into<String>, bean: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            bean: bean.into(),
        }
    }
}

/// Bean 定义 - 描述如何创建和装配 Bean
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeanDefinition {
    /// Bean 的名称（规范名）
    pub name: String,

    /// 实现类名，通过 ClassMetadataProvider 解析
    pub class: String,

    /// Bean 的作用域
    pub scope: Scope,

    /// 属性定义（按名称唯一，保持首次出现的顺序）
    pub properties: Vec<PropertyDefinition>,

    /// 构造参数定义
    pub arguments: Vec<ConstructorArgumentDefinition>,

    /// 切面列表，None 表示尚未计算，空列表表示计算后没有切面
    pub aspects: Option<Vec<AspectDefinition>>,

    /// 工厂 Bean 名称
    pub factory_bean: Option<String>,

    /// 工厂方法名称（配合 factory_bean 时是实例方法，否则是类的静态工厂）
    pub factory_method: Option<String>,

    /// 初始化方法
    pub init_method: Option<String>,

    /// 销毁方法
    pub destroy_method: Option<String>,

    /// 显式依赖，在创建本 Bean 之前先创建
    pub depends_on: Vec<String>,

    /// 查找方法注入
    pub method_injections: Vec<MethodInjection>,

    /// 抽象定义只能作为父定义使用，不能实例化
    pub is_abstract: bool,

    /// 父定义名称（仅记录，子定义通过 make_child_bean 显式生成）
    pub parent: Option<String>,

    /// 别名
    pub aliases: BTreeSet<String>,

    /// 按类型注入出现多个候选时的首选标记
    pub primary: bool,

    /// 织入切面后的代理类名
    pub proxy_class_name: Option<String>,
}

impl BeanDefinition {
    /// 创建新的 Bean 定义
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 生成唯一名称，用于内联 Bean、匿名切面与切点
    pub fn generate_name(prefix: &str) -> String {
        let id = NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", prefix, id)
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: ValueDefinition) -> Self {
        self.set_property(PropertyDefinition::new(name, value));
        self
    }

    pub fn with_argument(mut self, argument: ConstructorArgumentDefinition) -> Self {
        self.set_argument(argument);
        self
    }

    pub fn with_factory_bean(mut self, bean: impl Into<String>) -> Self {
        self.factory_bean = Some(bean.into());
        self
    }

    pub fn with_factory_method(mut self, method: impl Into<String>) -> Self {
        self.factory_method = Some(method.into());
        self
    }

    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method = Some(method.into());
        self
    }

    pub fn with_destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method = Some(method.into());
        self
    }

    pub fn with_depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn with_method_injection(mut self, method: impl Into<String>, bean: impl Into<String>) -> Self {
        self.method_injections.push(MethodInjection::new(method, bean));
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.add_alias(alias);
        self
    }

    pub fn with_aspect(mut self, aspect: AspectDefinition) -> Self {
        self.add_aspect(aspect);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn abstract_definition(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// 设置属性，同名属性被替换
    pub fn set_property(&mut self, property: PropertyDefinition) {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.get_property(name).is_some()
    }

    /// 设置构造参数，命名参数按名称替换，匿名参数追加
    pub fn set_argument(&mut self, argument: ConstructorArgumentDefinition) {
        if let Some(name) = &argument.name {
            if let Some(existing) = self
                .arguments
                .iter_mut()
                .find(|a| a.name.as_deref() == Some(name.as_str()))
            {
                *existing = argument;
                return;
            }
        }
        self.arguments.push(argument);
    }

    /// 添加切面，同名切面只保留一份
    pub fn add_aspect(&mut self, aspect: AspectDefinition) {
        let aspects = self.aspects.get_or_insert_with(Vec::new);
        if !aspects.iter().any(|a| a.name == aspect.name) {
            aspects.push(aspect);
        }
    }

    pub fn add_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        if alias != self.name {
            self.aliases.insert(alias);
        }
    }

    pub fn clear_aliases(&mut self) {
        self.aliases.clear();
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains(alias)
    }

    pub fn make_abstract(&mut self) {
        self.is_abstract = true;
    }

    pub fn make_concrete(&mut self) {
        self.is_abstract = false;
    }

    pub fn mark_as_primary_candidate(&mut self) {
        self.primary = true;
    }

    pub fn is_singleton(&self) -> bool {
        self.scope == Scope::Singleton
    }

    pub fn is_prototype(&self) -> bool {
        self.scope == Scope::Prototype
    }

    /// 由构造函数创建（没有工厂方法）
    pub fn is_created_by_constructor(&self) -> bool {
        self.factory_method.as_deref().map_or(true, str::is_empty)
    }

    /// 由工厂 Bean 创建
    pub fn is_created_with_factory_bean(&self) -> bool {
        self.factory_bean.as_deref().map_or(false, |b| !b.is_empty())
    }

    pub fn has_aspects(&self) -> bool {
        self.aspects.as_ref().map_or(false, |a| !a.is_empty())
    }

    /// 基于当前定义生成子定义：深拷贝、改名、清空别名、置为具体定义
    pub fn make_child_bean(&self, name: impl Into<String>) -> BeanDefinition {
        let mut child = self.clone();
        child.name = name.into();
        child.parent = Some(self.name.clone());
        child.clear_aliases();
        child.make_concrete();
        child.proxy_class_name = None;
        child
    }

    /// 所有直接引用的 Bean（属性、构造参数、工厂 Bean、显式依赖）
    pub fn referenced_beans(&self) -> Vec<String> {
        let mut out = Vec::new();
        for property in &self.properties {
            property.value.referenced_beans(&mut out);
        }
        for argument in &self.arguments {
            argument.value.referenced_beans(&mut out);
        }
        if let Some(factory) = &self.factory_bean {
            out.push(factory.clone());
        }
        out.extend(self.depends_on.iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::AspectType;

    fn parent_definition() -> BeanDefinition {
        BeanDefinition::new("parent")
            .with_class("X")
            .with_property("p", ValueDefinition::literal(1i64))
            .with_argument(ConstructorArgumentDefinition::named(
                "host",
                ValueDefinition::literal("localhost"),
            ))
            .with_aspect(AspectDefinition::new(
                "logging",
                vec!["all".into()],
                AspectType::Method,
                "logger",
                "",
            ))
            .with_alias("base")
            .abstract_definition()
    }

    #[test]
    fn test_defaults() {
        let def = BeanDefinition::new("a");
        assert!(def.is_singleton());
        assert!(def.aspects.is_none());
        assert!(def.is_created_by_constructor());
        assert!(!def.is_created_with_factory_bean());
        assert!(!def.is_abstract);
    }

    #[test]
    fn test_make_child_bean() {
        let parent = parent_definition();
        let mut child = parent.make_child_bean("child");

        assert_eq!(child.name, "child");
        assert!(!child.is_abstract);
        assert!(child.aliases.is_empty());
        assert_eq!(child.properties, parent.properties);
        assert_eq!(child.arguments, parent.arguments);
        assert_eq!(child.aspects, parent.aspects);
        assert_eq!(child.parent.as_deref(), Some("parent"));

        child.set_property(PropertyDefinition::new("p", ValueDefinition::literal(2i64)));
        child.add_aspect(AspectDefinition::new(
            "tx",
            vec![],
            AspectType::Exception,
            "tx",
            "",
        ));
        assert_eq!(
            parent.get_property("p").unwrap().value,
            ValueDefinition::literal(1i64)
        );
        assert_eq!(parent.aspects.as_ref().unwrap().len(), 1);
        assert!(parent.is_abstract);
        assert!(parent.has_alias("base"));
    }

    #[test]
    fn test_set_property_replaces_in_place() {
        let mut def = BeanDefinition::new("a")
            .with_property("first", ValueDefinition::literal("1"))
            .with_property("second", ValueDefinition::literal("2"));
        def.set_property(PropertyDefinition::new("first", ValueDefinition::bean("other")));
        assert_eq!(def.properties.len(), 2);
        assert_eq!(def.properties[0].value, ValueDefinition::bean("other"));
    }

    #[test]
    fn test_named_arguments_replace() {
        let mut def = BeanDefinition::new("a");
        def.set_argument(ConstructorArgumentDefinition::named("x", ValueDefinition::literal("1")));
        def.set_argument(ConstructorArgumentDefinition::new(ValueDefinition::literal("2")));
        def.set_argument(ConstructorArgumentDefinition::named("x", ValueDefinition::literal("3")));
        assert_eq!(def.arguments.len(), 2);
        assert_eq!(def.arguments[0].value, ValueDefinition::literal("3"));
    }

    #[test]
    fn test_add_aspect_deduplicates() {
        let aspect = AspectDefinition::new("a", vec![], AspectType::Method, "b", "");
        let mut def = BeanDefinition::new("x");
        def.add_aspect(aspect.clone());
        def.add_aspect(aspect);
        assert_eq!(def.aspects.unwrap().len(), 1);
    }

    #[test]
    fn test_generate_name_is_unique() {
        let a = BeanDefinition::generate_name("Bean");
        let b = BeanDefinition::generate_name("Bean");
        assert!(a.starts_with("Bean"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_referenced_beans() {
        let def = BeanDefinition::new("a")
            .with_property("repo", ValueDefinition::bean("repository"))
            .with_property("listeners", ValueDefinition::bean_array(["l1", "l2"]))
            .with_factory_bean("factory")
            .with_depends_on("init");
        assert_eq!(
            def.referenced_beans(),
            vec!["repository", "l1", "l2", "factory", "init"]
        );
    }
}
