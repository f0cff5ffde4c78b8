//! 类元数据门面
//!
//! Rust 没有运行时反射，类的结构（父类、接口、方法、属性、注解、构造方式）
//! 通过 `ClassMetadata` 显式描述，并注册到 `ClassRegistry`。
//! 其它 crate 可以用 `register_class!` 在链接期提交元数据，
//! 由 `ClassRegistry::from_inventory()` 统一收集。

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::annotation::{Annotation, AnnotationCollection};
use crate::bean::Bean;
use crate::error::ContainerResult;
use crate::value::Arguments;

/// 构造函数 / 静态工厂
pub type InstanceFactory = Arc<dyn Fn(Arguments) -> ContainerResult<Box<dyn Bean>> + Send + Sync>;

/// 构造函数在元数据中的方法名
pub const CONSTRUCTOR_NAME: &str = "new";

/// 方法参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMetadata {
    pub name: String,
    /// 参数类型（类名或接口名），基础类型为 None
    pub type_name: Option<String>,
}

/// 方法元数据
#[derive(Debug, Clone, Default)]
pub struct MethodMetadata {
    pub name: String,
    pub parameters: Vec<ParameterMetadata>,
    pub return_type: Option<String>,
    pub annotations: AnnotationCollection,
}

impl MethodMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 带类型的参数
    pub fn with_param(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.parameters.push(ParameterMetadata {
            name: name.into(),
            type_name: Some(type_name.into()),
        });
        self
    }

    /// 不带类型的参数
    pub fn with_untyped_param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(ParameterMetadata {
            name: name.into(),
            type_name: None,
        });
        self
    }

    pub fn with_return_type(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = Some(type_name.into());
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.add(annotation);
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

/// 属性元数据
#[derive(Debug, Clone, Default)]
pub struct PropertyMetadata {
    pub name: String,
    pub type_name: Option<String>,
    pub annotations: AnnotationCollection,
}

impl PropertyMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.add(annotation);
        self
    }
}

/// 构造函数元数据
#[derive(Clone)]
pub struct ConstructorMetadata {
    pub method: MethodMetadata,
    pub factory: InstanceFactory,
}

impl fmt::Debug for ConstructorMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorMetadata")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// 类元数据
#[derive(Clone, Default)]
pub struct ClassMetadata {
    pub name: String,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub is_abstract: bool,
    pub annotations: AnnotationCollection,
    pub methods: Vec<MethodMetadata>,
    pub properties: Vec<PropertyMetadata>,
    pub constructor: Option<ConstructorMetadata>,
    /// 静态工厂方法（`factory-method` 且没有 `factory-bean` 时使用）
    pub static_factories: HashMap<String, InstanceFactory>,
}

impl fmt::Debug for ClassMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut factories: Vec<&String> = self.static_factories.keys().collect();
        factories.sort();
        f.debug_struct("ClassMetadata")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("interfaces", &self.interfaces)
            .field("is_abstract", &self.is_abstract)
            .field("annotations", &self.annotations)
            .field("methods", &self.methods)
            .field("properties", &self.properties)
            .field("constructor", &self.constructor)
            .field("static_factories", &factories)
            .finish()
    }
}

impl ClassMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.add(annotation);
        self
    }

    pub fn with_method(mut self, method: MethodMetadata) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_property(mut self, property: PropertyMetadata) -> Self {
        self.properties.push(property);
        self
    }

    /// 无注解的构造函数
    pub fn with_constructor<F>(self, factory: F) -> Self
    where
        F: Fn(Arguments) -> ContainerResult<Box<dyn Bean>> + Send + Sync + 'static,
    {
        self.with_constructor_metadata(MethodMetadata::new(CONSTRUCTOR_NAME), factory)
    }

    /// 带参数 / 注解描述的构造函数
    pub fn with_constructor_metadata<F>(mut self, method: MethodMetadata, factory: F) -> Self
    where
        F: Fn(Arguments) -> ContainerResult<Box<dyn Bean>> + Send + Sync + 'static,
    {
        let mut method = method;
        method.name = CONSTRUCTOR_NAME.to_string();
        self.constructor = Some(ConstructorMetadata {
            method,
            factory: Arc::new(factory),
        });
        self
    }

    pub fn with_static_factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Arguments) -> ContainerResult<Box<dyn Bean>> + Send + Sync + 'static,
    {
        self.static_factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// 本类声明的方法（包括构造函数）
    pub fn method(&self, name: &str) -> Option<&MethodMetadata> {
        if name == CONSTRUCTOR_NAME {
            if let Some(constructor) = &self.constructor {
                return Some(&constructor.method);
            }
        }
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn is_instantiable(&self) -> bool {
        !self.is_abstract && self.constructor.is_some()
    }
}

/// 类元数据提供者
///
/// 注解扫描与各个 driver 只通过这个接口读取类结构。
/// 未知类的注解查询返回空集合，祖先查询返回空列表。
pub trait ClassMetadataProvider: Send + Sync {
    fn get_class(&self, name: &str) -> Option<Arc<ClassMetadata>>;

    /// 带有指定注解的类，按注册顺序返回
    fn get_classes_by_annotation(&self, annotation: &str) -> Vec<String>;

    fn get_class_annotations(&self, class: &str) -> AnnotationCollection {
        self.get_class(class)
            .map(|c| c.annotations.clone())
            .unwrap_or_default()
    }

    /// 父类链，最近的父类在前
    fn get_class_ancestors(&self, class: &str) -> Vec<String> {
        walk_ancestors(self, class)
    }

    /// 父类链加上本类与所有父类实现的接口
    fn get_class_ancestors_and_interfaces(&self, class: &str) -> Vec<String> {
        let ancestors = self.get_class_ancestors(class);
        let mut result = ancestors.clone();
        let mut seen: HashSet<String> = ancestors.iter().cloned().collect();
        for name in std::iter::once(class.to_string()).chain(ancestors) {
            if let Some(metadata) = self.get_class(&name) {
                for interface in &metadata.interfaces {
                    if seen.insert(interface.clone()) {
                        result.push(interface.clone());
                    }
                }
            }
        }
        result
    }

    /// 查找方法（包括继承的方法，子类声明优先）
    fn get_method(&self, class: &str, method: &str) -> Option<MethodMetadata> {
        std::iter::once(class.to_string())
            .chain(self.get_class_ancestors(class))
            .filter_map(|name| self.get_class(&name))
            .find_map(|metadata| metadata.method(method).cloned())
    }

    fn get_method_annotations(&self, class: &str, method: &str) -> AnnotationCollection {
        self.get_method(class, method)
            .map(|m| m.annotations)
            .unwrap_or_default()
    }

    fn get_property_annotations(&self, class: &str, property: &str) -> AnnotationCollection {
        std::iter::once(class.to_string())
            .chain(self.get_class_ancestors(class))
            .filter_map(|name| self.get_class(&name))
            .find_map(|metadata| metadata.property(property).map(|p| p.annotations.clone()))
            .unwrap_or_default()
    }

    /// 本类及父类声明的全部方法，同名方法只保留子类版本
    fn get_all_methods(&self, class: &str) -> Vec<MethodMetadata> {
        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        for name in std::iter::once(class.to_string()).chain(self.get_class_ancestors(class)) {
            if let Some(metadata) = self.get_class(&name) {
                for method in &metadata.methods {
                    if seen.insert(method.name.clone()) {
                        methods.push(method.clone());
                    }
                }
            }
        }
        methods
    }

    /// 本类及父类声明的全部属性，同名属性只保留子类版本
    fn get_all_properties(&self, class: &str) -> Vec<PropertyMetadata> {
        let mut seen = HashSet::new();
        let mut properties = Vec::new();
        for name in std::iter::once(class.to_string()).chain(self.get_class_ancestors(class)) {
            if let Some(metadata) = self.get_class(&name) {
                for property in &metadata.properties {
                    if seen.insert(property.name.clone()) {
                        properties.push(property.clone());
                    }
                }
            }
        }
        properties
    }
}

/// 沿 parent 链向上遍历，遇到环时截断
fn walk_ancestors<P: ClassMetadataProvider + ?Sized>(provider: &P, class: &str) -> Vec<String> {
    let mut ancestors = Vec::new();
    let mut seen = HashSet::new();
    seen.insert(class.to_string());
    let mut current = provider.get_class(class).and_then(|c| c.parent.clone());
    while let Some(parent) = current {
        if !seen.insert(parent.clone()) {
            tracing::warn!("Class hierarchy of '{}' loops at '{}'", class, parent);
            break;
        }
        current = provider.get_class(&parent).and_then(|c| c.parent.clone());
        ancestors.push(parent);
    }
    ancestors
}

/// 链接期注册的类元数据
pub struct ClassRegistration {
    pub build: fn() -> ClassMetadata,
}

inventory::collect!(ClassRegistration);

/// 在链接期提交类元数据
///
/// ```ignore
/// arbor_core::register_class!(|| ClassMetadata::new("UserService")
///     .with_annotation(Annotation::new("component"))
///     .with_constructor(|_| Ok(Box::new(UserService::default()))));
/// ```
#[macro_export]
macro_rules! register_class {
    ($build:expr) => {
        $crate::inventory::submit! {
            $crate::reflection::ClassRegistration { build: $build }
        }
    };
}

#[derive(Default)]
struct RegistryInner {
    order: Vec<String>,
    classes: HashMap<String, Arc<ClassMetadata>>,
}

/// 线程安全的类元数据注册表
///
/// 维护注解到类的反向索引（按注册顺序），并缓存祖先链；
/// 任何类的重新注册都会使祖先缓存失效。
#[derive(Default)]
pub struct ClassRegistry {
    inner: RwLock<RegistryInner>,
    ancestors: RwLock<HashMap<String, Vec<String>>>,
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.inner.read().order)
            .finish()
    }
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集所有通过 `register_class!` 提交的元数据
    pub fn from_inventory() -> Self {
        let registry = Self::new();
        for registration in inventory::iter::<ClassRegistration> {
            registry.register((registration.build)());
        }
        tracing::debug!("Collected {} class(es) from inventory", registry.len());
        registry
    }

    pub fn with_class(self, metadata: ClassMetadata) -> Self {
        self.register(metadata);
        self
    }

    /// 注册类元数据，同名类被替换（保留原注册位置）
    pub fn register(&self, metadata: ClassMetadata) {
        let name = metadata.name.clone();
        {
            let mut inner = self.inner.write();
            if inner.classes.insert(name.clone(), Arc::new(metadata)).is_none() {
                inner.order.push(name.clone());
            }
        }
        self.ancestors.write().clear();
        tracing::trace!("Registered class metadata '{}'", name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn class_names(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }
}

impl ClassMetadataProvider for ClassRegistry {
    fn get_class(&self, name: &str) -> Option<Arc<ClassMetadata>> {
        self.inner.read().classes.get(name).cloned()
    }

    fn get_classes_by_annotation(&self, annotation: &str) -> Vec<String> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter(|name| {
                inner
                    .classes
                    .get(*name)
                    .map_or(false, |c| c.annotations.contains(annotation))
            })
            .cloned()
            .collect()
    }

    fn get_class_ancestors(&self, class: &str) -> Vec<String> {
        if let Some(cached) = self.ancestors.read().get(class) {
            return cached.clone();
        }
        let ancestors = walk_ancestors(self, class);
        self.ancestors
            .write()
            .insert(class.to_string(), ancestors.clone());
        ancestors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Bean for Plain {}

    fn registry() -> ClassRegistry {
        ClassRegistry::new()
            .with_class(
                ClassMetadata::new("Base")
                    .abstract_class()
                    .with_interface("Service")
                    .with_method(
                        MethodMetadata::new("set_repository")
                            .with_param("repository", "Repository")
                            .with_annotation(Annotation::new("Inject")),
                    )
                    .with_property(
                        PropertyMetadata::new("timeout")
                            .with_annotation(Annotation::new("Value").with_option("value", "30")),
                    ),
            )
            .with_class(
                ClassMetadata::new("Middle")
                    .with_parent("Base")
                    .with_interface("Auditable")
                    .with_annotation(Annotation::new("Component")),
            )
            .with_class(
                ClassMetadata::new("Leaf")
                    .with_parent("Middle")
                    .with_interface("Service")
                    .with_annotation(Annotation::new("component"))
                    .with_constructor(|_| Ok(Box::new(Plain))),
            )
    }

    #[test]
    fn test_ancestors() {
        let registry = registry();
        assert_eq!(registry.get_class_ancestors("Leaf"), vec!["Middle", "Base"]);
        assert!(registry.get_class_ancestors("Unknown").is_empty());
        assert_eq!(
            registry.get_class_ancestors_and_interfaces("Leaf"),
            vec!["Middle", "Base", "Service", "Auditable"]
        );
    }

    #[test]
    fn test_classes_by_annotation_in_registration_order() {
        let registry = registry();
        assert_eq!(registry.get_classes_by_annotation("COMPONENT"), vec!["Middle", "Leaf"]);
        assert!(registry.get_classes_by_annotation("aspect").is_empty());
    }

    #[test]
    fn test_inherited_members() {
        let registry = registry();
        assert!(registry
            .get_method_annotations("Leaf", "set_repository")
            .contains("inject"));
        assert!(registry
            .get_property_annotations("Leaf", "timeout")
            .contains("value"));
        assert_eq!(registry.get_all_methods("Leaf").len(), 1);
        assert!(registry.get_class_annotations("Unknown").is_empty());
    }

    #[test]
    fn test_reregistration_invalidates_ancestor_cache() {
        let registry = registry();
        assert_eq!(registry.get_class_ancestors("Leaf"), vec!["Middle", "Base"]);
        registry.register(ClassMetadata::new("Leaf").with_parent("Base"));
        assert_eq!(registry.get_class_ancestors("Leaf"), vec!["Base"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_constructor_metadata() {
        let registry = registry();
        let leaf = registry.get_class("Leaf").unwrap();
        assert!(leaf.is_instantiable());
        assert!(leaf.method(CONSTRUCTOR_NAME).is_some());
        let base = registry.get_class("Base").unwrap();
        assert!(!base.is_instantiable());
    }

    #[test]
    fn test_hierarchy_loop_is_cut() {
        let registry = ClassRegistry::new()
            .with_class(ClassMetadata::new("A").with_parent("B"))
            .with_class(ClassMetadata::new("B").with_parent("A"));
        assert_eq!(registry.get_class_ancestors("A"), vec!["B"]);
    }
}
