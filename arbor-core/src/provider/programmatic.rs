use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{BeanDefinitionProvider, ClassIndex, EventIndex};
use crate::aspect::{AspectDefinition, AspectManager, PointcutDefinition};
use crate::container::Container;
use crate::definition::BeanDefinition;
use crate::error::ContainerResult;
use crate::reflection::ClassMetadataProvider;

#[derive(Default)]
struct CoreState {
    order: Vec<String>,
    definitions: HashMap<String, BeanDefinition>,
    aliases: HashMap<String, String>,
    classes: ClassIndex,
    events: EventIndex,
    pointcuts: Vec<PointcutDefinition>,
    aspects: Vec<AspectDefinition>,
    metadata: Option<Arc<dyn ClassMetadataProvider>>,
}

impl CoreState {
    fn index(&mut self, definition: &BeanDefinition) {
        let Some(metadata) = self.metadata.clone() else {
            return;
        };
        // 静态工厂的 class 是工厂类而不是产品类型
        let static_factory = !definition.is_created_by_constructor()
            && !definition.is_created_with_factory_bean();
        if definition.is_abstract || static_factory || definition.class.is_empty() {
            return;
        }
        self.classes.add(metadata.as_ref(), &definition.class, &definition.name);
    }
}

/// 以代码方式注册的 Bean 定义
///
/// ```ignore
/// let provider = CoreProvider::new()
///     .with_definition(BeanDefinition::new("repository").with_class("SqlRepository"))
///     .with_listener("auditLog", "userCreated");
/// ```
pub struct CoreProvider {
    name: String,
    state: RwLock<CoreState>,
}

impl CoreProvider {
    pub fn new() -> Self {
        Self::named("core")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(CoreState::default()),
        }
    }

    pub fn with_definition(self, definition: BeanDefinition) -> Self {
        self.register(definition);
        self
    }

    pub fn with_listener(self, bean: &str, events: &str) -> Self {
        self.state.write().events.add_csv(events, bean);
        self
    }

    pub fn with_pointcut(self, pointcut: PointcutDefinition) -> Self {
        self.state.write().pointcuts.push(pointcut);
        self
    }

    /// 全局切面，容器构建时交给切面管理器
    pub fn with_aspect(self, aspect: AspectDefinition) -> Self {
        self.state.write().aspects.push(aspect);
        self
    }

    /// 注册定义，同名定义被替换
    pub fn register(&self, definition: BeanDefinition) {
        let mut state = self.state.write();
        let name = definition.name.clone();
        for alias in &definition.aliases {
            state.aliases.insert(alias.clone(), name.clone());
        }
        state.index(&definition);
        if state.definitions.insert(name.clone(), definition).is_none() {
            state.order.push(name.clone());
        }
        tracing::debug!("Registered bean definition '{}' in provider '{}'", name, self.name);
    }

    pub fn contains(&self, name: &str) -> bool {
        let state = self.state.read();
        state.definitions.contains_key(name) || state.aliases.contains_key(name)
    }
}

impl Default for CoreProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanDefinitionProvider for CoreProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, container: &Container) -> ContainerResult<()> {
        let mut state = self.state.write();
        state.metadata = Some(container.metadata().clone());
        let definitions: Vec<BeanDefinition> = state
            .order
            .iter()
            .filter_map(|name| state.definitions.get(name).cloned())
            .collect();
        for definition in &definitions {
            state.index(definition);
        }
        Ok(())
    }

    fn get_bean_definition(
        &self,
        name: &str,
        _container: &Container,
    ) -> ContainerResult<Option<BeanDefinition>> {
        let state = self.state.read();
        let canonical = state.aliases.get(name).map(String::as_str).unwrap_or(name);
        Ok(state.definitions.get(canonical).cloned())
    }

    fn get_beans_by_class(&self, class: &str) -> Vec<String> {
        self.state.read().classes.get(class)
    }

    fn get_beans_listening_on(&self, event: &str) -> Vec<String> {
        self.state.read().events.get(event)
    }

    fn get_aspects(&self, manager: &AspectManager) -> ContainerResult<Vec<AspectDefinition>> {
        let state = self.state.read();
        for pointcut in &state.pointcuts {
            manager.set_pointcut(pointcut.clone());
        }
        Ok(state.aspects.clone())
    }

    fn bean_names(&self) -> Vec<String> {
        self.state.read().order.clone()
    }
}
