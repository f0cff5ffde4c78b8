//! 生命周期管道
//!
//! 容器在固定的阶段调用监听器：
//!
//! ```text
//! AfterConfig ─ 构建时一次
//! AfterDefinition ─ 每个定义解析时（drivers 在这里修改定义）
//! BeforeCreate → 实例化 → BeforeAssemble → 装配属性 → AfterAssemble → init → AfterCreate
//! ```
//!
//! 管道由 `BeanLifecycleManager` 显式持有并交给容器构建器，没有全局注册。
//! 每个阶段内按 `order()` 升序执行，相同 order 保持添加顺序。

use std::fmt;
use std::sync::Arc;

use crate::bean::Bean;
use crate::container::Container;
use crate::definition::BeanDefinition;
use crate::error::ContainerResult;

/// 默认顺序
pub const DEFAULT_ORDER: i32 = 1000;

/// 容器构建完成（provider 初始化、切面收集之后）时调用
pub trait AfterConfigListener: Send + Sync {
    fn name(&self) -> &str {
        "AfterConfigListener"
    }

    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }

    fn after_config(&self, container: &Container) -> ContainerResult<()>;
}

/// 定义解析后、冻结前调用，返回（可能修改过的）定义
///
/// 同一个定义可能被处理多次（例如子定义基于已处理的父定义生成），
/// 实现需要保证重复处理的结果不变。
pub trait AfterDefinitionListener: Send + Sync {
    fn name(&self) -> &str {
        "AfterDefinitionListener"
    }

    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }

    fn after_definition(
        &self,
        definition: BeanDefinition,
        container: &Container,
    ) -> ContainerResult<BeanDefinition>;
}

/// 实例化之前调用
pub trait BeforeCreateListener: Send + Sync {
    fn name(&self) -> &str {
        "BeforeCreateListener"
    }

    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }

    fn before_create(&self, definition: &BeanDefinition, container: &Container) -> ContainerResult<()>;
}

/// 实例化之后、属性装配之前调用
pub trait BeforeAssembleListener: Send + Sync {
    fn name(&self) -> &str {
        "BeforeAssembleListener"
    }

    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }

    fn before_assemble(
        &self,
        bean: &mut dyn Bean,
        definition: &BeanDefinition,
        container: &Container,
    ) -> ContainerResult<()>;
}

/// 属性装配之后、init 方法之前调用
pub trait AfterAssembleListener: Send + Sync {
    fn name(&self) -> &str {
        "AfterAssembleListener"
    }

    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }

    fn after_assemble(
        &self,
        bean: &mut dyn Bean,
        definition: &BeanDefinition,
        container: &Container,
    ) -> ContainerResult<()>;
}

/// Bean 完全就绪后调用，可以返回替换对象（例如切面代理）
pub trait AfterCreateListener: Send + Sync {
    fn name(&self) -> &str {
        "AfterCreateListener"
    }

    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }

    fn after_create(
        &self,
        bean: Arc<dyn Bean>,
        definition: &BeanDefinition,
        container: &Container,
    ) -> ContainerResult<Arc<dyn Bean>>;
}

/// 按阶段区分的监听器
#[derive(Clone)]
pub enum LifecycleListener {
    AfterConfig(Arc<dyn AfterConfigListener>),
    AfterDefinition(Arc<dyn AfterDefinitionListener>),
    BeforeCreate(Arc<dyn BeforeCreateListener>),
    BeforeAssemble(Arc<dyn BeforeAssembleListener>),
    AfterAssemble(Arc<dyn AfterAssembleListener>),
    AfterCreate(Arc<dyn AfterCreateListener>),
}

impl LifecycleListener {
    pub fn name(&self) -> &str {
        match self {
            LifecycleListener::AfterConfig(l) => l.name(),
            LifecycleListener::AfterDefinition(l) => l.name(),
            LifecycleListener::BeforeCreate(l) => l.name(),
            LifecycleListener::BeforeAssemble(l) => l.name(),
            LifecycleListener::AfterAssemble(l) => l.name(),
            LifecycleListener::AfterCreate(l) => l.name(),
        }
    }

    pub fn order(&self) -> i32 {
        match self {
            LifecycleListener::AfterConfig(l) => l.order(),
            LifecycleListener::AfterDefinition(l) => l.order(),
            LifecycleListener::BeforeCreate(l) => l.order(),
            LifecycleListener::BeforeAssemble(l) => l.order(),
            LifecycleListener::AfterAssemble(l) => l.order(),
            LifecycleListener::AfterCreate(l) => l.order(),
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            LifecycleListener::AfterConfig(_) => "AfterConfig",
            LifecycleListener::AfterDefinition(_) => "AfterDefinition",
            LifecycleListener::BeforeCreate(_) => "BeforeCreate",
            LifecycleListener::BeforeAssemble(_) => "BeforeAssemble",
            LifecycleListener::AfterAssemble(_) => "AfterAssemble",
            LifecycleListener::AfterCreate(_) => "AfterCreate",
        }
    }
}

impl fmt::Debug for LifecycleListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, order {})", self.stage(), self.name(), self.order())
    }
}

fn insert_ordered<T: ?Sized>(list: &mut Vec<Arc<T>>, listener: Arc<T>, order: impl Fn(&T) -> i32) {
    list.push(listener);
    list.sort_by_key(|l| order(&**l));
}

/// 生命周期管道
#[derive(Default, Clone)]
pub struct BeanLifecycleManager {
    after_config: Vec<Arc<dyn AfterConfigListener>>,
    after_definition: Vec<Arc<dyn AfterDefinitionListener>>,
    before_create: Vec<Arc<dyn BeforeCreateListener>>,
    before_assemble: Vec<Arc<dyn BeforeAssembleListener>>,
    after_assemble: Vec<Arc<dyn AfterAssembleListener>>,
    after_create: Vec<Arc<dyn AfterCreateListener>>,
}

impl fmt::Debug for BeanLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.listeners()).finish()
    }
}

impl BeanLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加监听器
    pub fn add(&mut self, listener: LifecycleListener) {
        tracing::debug!(
            "Adding {} listener '{}' (order {})",
            listener.stage(),
            listener.name(),
            listener.order()
        );
        match listener {
            LifecycleListener::AfterConfig(l) => insert_ordered(&mut self.after_config, l, |l| l.order()),
            LifecycleListener::AfterDefinition(l) => {
                insert_ordered(&mut self.after_definition, l, |l| l.order())
            }
            LifecycleListener::BeforeCreate(l) => insert_ordered(&mut self.before_create, l, |l| l.order()),
            LifecycleListener::BeforeAssemble(l) => {
                insert_ordered(&mut self.before_assemble, l, |l| l.order())
            }
            LifecycleListener::AfterAssemble(l) => {
                insert_ordered(&mut self.after_assemble, l, |l| l.order())
            }
            LifecycleListener::AfterCreate(l) => insert_ordered(&mut self.after_create, l, |l| l.order()),
        }
    }

    pub fn with(mut self, listener: LifecycleListener) -> Self {
        self.add(listener);
        self
    }

    /// 所有监听器，按阶段再按顺序
    pub fn listeners(&self) -> Vec<LifecycleListener> {
        let mut all = Vec::new();
        all.extend(self.after_config.iter().cloned().map(LifecycleListener::AfterConfig));
        all.extend(self.after_definition.iter().cloned().map(LifecycleListener::AfterDefinition));
        all.extend(self.before_create.iter().cloned().map(LifecycleListener::BeforeCreate));
        all.extend(self.before_assemble.iter().cloned().map(LifecycleListener::BeforeAssemble));
        all.extend(self.after_assemble.iter().cloned().map(LifecycleListener::AfterAssemble));
        all.extend(self.after_create.iter().cloned().map(LifecycleListener::AfterCreate));
        all
    }

    pub fn len(&self) -> usize {
        self.after_config.len()
            + self.after_definition.len()
            + self.before_create.len()
            + self.before_assemble.len()
            + self.after_assemble.len()
            + self.after_create.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn after_config(&self, container: &Container) -> ContainerResult<()> {
        for listener in &self.after_config {
            tracing::trace!("AfterConfig: {}", listener.name());
            listener.after_config(container)?;
        }
        Ok(())
    }

    pub fn after_definition(
        &self,
        mut definition: BeanDefinition,
        container: &Container,
    ) -> ContainerResult<BeanDefinition> {
        for listener in &self.after_definition {
            tracing::trace!("AfterDefinition '{}': {}", definition.name, listener.name());
            definition = listener.after_definition(definition, container)?;
        }
        Ok(definition)
    }

    pub fn before_create(&self, definition: &BeanDefinition, container: &Container) -> ContainerResult<()> {
        for listener in &self.before_create {
            listener.before_create(definition, container)?;
        }
        Ok(())
    }

    pub fn before_assemble(
        &self,
        bean: &mut dyn Bean,
        definition: &BeanDefinition,
        container: &Container,
    ) -> ContainerResult<()> {
        for listener in &self.before_assemble {
            listener.before_assemble(bean, definition, container)?;
        }
        Ok(())
    }

    pub fn after_assemble(
        &self,
        bean: &mut dyn Bean,
        definition: &BeanDefinition,
        container: &Container,
    ) -> ContainerResult<()> {
        for listener in &self.after_assemble {
            listener.after_assemble(bean, definition, container)?;
        }
        Ok(())
    }

    pub fn after_create(
        &self,
        mut bean: Arc<dyn Bean>,
        definition: &BeanDefinition,
        container: &Container,
    ) -> ContainerResult<Arc<dyn Bean>> {
        for listener in &self.after_create {
            tracing::trace!("AfterCreate '{}': {}", definition.name, listener.name());
            bean = listener.after_create(bean, definition, container)?;
        }
        Ok(bean)
    }
}
