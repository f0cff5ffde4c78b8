//! 容器
//!
//! 一个 Bean 名称在容器中的状态：
//!
//! ```text
//! Unknown ─get_bean_definition→ DefinitionResolving ─→ DefinitionCached
//!        ─get_bean→ Creating ─→ Created（单例缓存 / 原型直接返回）
//! ```
//!
//! 解析与创建由一把可重入锁串行化，`CreationTracker` 记录正在解析 / 创建的名称，
//! 再次进入同一名称即为循环依赖。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use regex::Regex;

use crate::aspect::{AspectDefinition, AspectManager};
use crate::bean::Bean;
use crate::config::{ConfigValue, Environment, PropertySource};
use crate::definition::{BeanDefinition, ValueDefinition};
use crate::driver::{self, MethodInjectionDriver, PropertiesDriver};
use crate::error::{ContainerError, ContainerResult};
use crate::evaluator::{ExpressionEvaluator, LiteralEvaluator};
use crate::lifecycle::{BeanLifecycleManager, LifecycleListener};
use crate::message::MessageSource;
use crate::options::ContainerOptions;
use crate::plugin::{load_plugins, ContainerPlugin, PluginRegistry};
use crate::provider::{BeanDefinitionProvider, DeclarativeProvider};
use crate::reflection::{ClassMetadata, ClassMetadataProvider, ClassRegistry};
use crate::resource::{DefaultResourceLoader, Resource, ResourceLoader};
use crate::utils::dependency::CreationTracker;
use crate::utils::naming::event_handler_names;
use crate::value::{Arguments, Literal, Value};

/// Shutdown hook 类型
pub type ShutdownHook = Box<dyn Fn() -> ContainerResult<()> + Send + Sync>;

enum ShutdownAction {
    Method {
        label: String,
        bean: Arc<dyn Bean>,
        method: String,
    },
    Hook(ShutdownHook),
}

impl ShutdownAction {
    fn run(&self) -> ContainerResult<()> {
        match self {
            ShutdownAction::Method { bean, method, .. } => bean.invoke(method, &[]).map(|_| ()),
            ShutdownAction::Hook(hook) => hook(),
        }
    }

    fn label(&self) -> &str {
        match self {
            ShutdownAction::Method { label, .. } => label,
            ShutdownAction::Hook(_) => "shutdown hook",
        }
    }
}

/// 容器的弱引用句柄
///
/// Bean 通过 `set_container` 拿到句柄，用于在运行时查找其它 Bean；
/// 句柄不会延长容器的生命周期。
#[derive(Clone)]
pub struct ContainerHandle(Weak<Container>);

impl ContainerHandle {
    pub fn container(&self) -> ContainerResult<Arc<Container>> {
        self.0
            .upgrade()
            .filter(|c| !c.is_disposed())
            .ok_or(ContainerError::ContainerDisposed)
    }

    pub fn get_bean(&self, name: &str) -> ContainerResult<Arc<dyn Bean>> {
        self.container()?.get_bean(name)
    }

    pub fn get_bean_as<T: Bean>(&self, name: &str) -> ContainerResult<Arc<T>> {
        self.container()?.get_bean_as::<T>(name)
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

/// 依赖注入容器
pub struct Container {
    self_ref: Weak<Container>,

    providers: RwLock<Vec<Arc<dyn BeanDefinitionProvider>>>,
    metadata: Arc<dyn ClassMetadataProvider>,
    lifecycle: BeanLifecycleManager,
    aspect_manager: AspectManager,
    environment: Arc<Environment>,
    resource_loader: Arc<dyn ResourceLoader>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    options: ContainerOptions,
    plugins: PluginRegistry,

    /// 规范名、别名与请求过的名称都指向同一个冻结的定义
    definitions: RwLock<HashMap<String, Arc<BeanDefinition>>>,
    singletons: RwLock<HashMap<String, Arc<dyn Bean>>>,
    creation_order: Mutex<Vec<String>>,
    listeners: RwLock<HashMap<String, Vec<String>>>,
    shutdown_actions: Mutex<Vec<ShutdownAction>>,
    message_source: RwLock<Option<Arc<dyn MessageSource>>>,
    patterns: Mutex<HashMap<String, Regex>>,

    lock: ReentrantMutex<()>,
    resolving: CreationTracker,
    creating: CreationTracker,
    disposed: AtomicBool,
}

impl MessageSource for Container {
    fn get_message(
        &self,
        bundle: &str,
        key: &str,
        args: &[Value],
        locale: &str,
    ) -> ContainerResult<Option<String>> {
        Container::get_message(self, bundle, key, args, locale)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("providers", &self.providers.read().len())
            .field("definitions", &self.definitions.read().len())
            .field("singletons", &self.singletons.read().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// 当前容器的句柄
    pub fn handle(&self) -> ContainerHandle {
        ContainerHandle(self.self_ref.clone())
    }

    pub fn metadata(&self) -> &Arc<dyn ClassMetadataProvider> {
        &self.metadata
    }

    pub fn aspect_manager(&self) -> &AspectManager {
        &self.aspect_manager
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn resource_loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.resource_loader
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_active(&self) -> ContainerResult<()> {
        if self.is_disposed() {
            Err(ContainerError::ContainerDisposed)
        } else {
            Ok(())
        }
    }

    // ========== 定义 ==========

    /// 解析 Bean 定义
    ///
    /// 第一个返回定义的 provider 生效；定义经过 AfterDefinition 管道与切面织入后冻结，
    /// 以规范名、所有别名以及本次请求的名称缓存。
    pub fn get_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>> {
        self.ensure_active()?;
        if let Some(definition) = self.definitions.read().get(name) {
            return Ok(Arc::clone(definition));
        }

        let _lock = self.lock.lock();
        if let Some(definition) = self.definitions.read().get(name) {
            return Ok(Arc::clone(definition));
        }
        let _guard = self
            .resolving
            .enter(name)
            .map_err(ContainerError::CircularDependency)?;

        let definition = self.find_definition(name)?;

        let existing = self.definitions.read().get(&definition.name).cloned();
        if let Some(existing) = existing {
            self.definitions
                .write()
                .insert(name.to_string(), Arc::clone(&existing));
            return Ok(existing);
        }

        let definition = self.lifecycle.after_definition(definition, self)?;
        let definition = Arc::new(self.weave_aspects(definition)?);

        let mut definitions = self.definitions.write();
        definitions.insert(definition.name.clone(), Arc::clone(&definition));
        for alias in &definition.aliases {
            definitions.insert(alias.clone(), Arc::clone(&definition));
        }
        definitions.insert(name.to_string(), Arc::clone(&definition));
        tracing::debug!(
            "Resolved bean definition '{}' (class {}, {})",
            definition.name,
            definition.class,
            definition.scope
        );
        Ok(definition)
    }

    /// provider 声明的原始定义，不经过 AfterDefinition 管道
    ///
    /// 已解析的定义直接返回缓存；用于读取 primary 等不受管道影响的标记，
    /// 避免为了读取标记而解析候选 Bean 的依赖。
    pub fn raw_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        self.ensure_active()?;
        if let Some(definition) = self.definitions.read().get(name) {
            return Ok(BeanDefinition::clone(definition));
        }
        self.find_definition(name)
    }

    fn find_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        let providers = self.providers.read().clone();
        for provider in &providers {
            if let Some(definition) = provider.get_bean_definition(name, self)? {
                tracing::trace!("Bean '{}' defined by provider '{}'", name, provider.name());
                return Ok(definition);
            }
        }
        Err(ContainerError::BeanNotFound(name.to_string()))
    }

    /// 合并定义自带的切面与类名匹配的全局切面
    fn weave_aspects(&self, mut definition: BeanDefinition) -> ContainerResult<BeanDefinition> {
        let mut aspects: Vec<AspectDefinition> = definition.aspects.take().unwrap_or_default();
        for aspect in self.aspect_manager.get_aspects() {
            if self.class_matches(&aspect.class_expression, &definition.class)? {
                aspects.push(aspect);
            }
        }
        // 拦截器 Bean 不拦截自己
        aspects.retain(|aspect| aspect.bean_name != definition.name);
        let mut seen = std::collections::HashSet::new();
        aspects.retain(|aspect| seen.insert(aspect.name.clone()));
        for aspect in &aspects {
            for pointcut in &aspect.pointcuts {
                let pointcut = self.aspect_manager.require_pointcut(pointcut)?;
                self.pattern(&pointcut.expression, "pointcut")?;
            }
        }

        definition.proxy_class_name = if aspects.is_empty() {
            None
        } else {
            Some(format!("{}Proxy", definition.class))
        };
        definition.aspects = Some(aspects);
        Ok(definition)
    }

    fn class_matches(&self, expression: &str, class: &str) -> ContainerResult<bool> {
        if expression.is_empty() {
            return Ok(true);
        }
        Ok(self.pattern(expression, "class")?.is_match(class))
    }

    fn pattern(&self, expression: &str, kind: &str) -> ContainerResult<Regex> {
        let mut patterns = self.patterns.lock();
        if let Some(pattern) = patterns.get(expression) {
            return Ok(pattern.clone());
        }
        let pattern = Regex::new(expression).map_err(|e| {
            ContainerError::configuration(format!("Invalid {} expression '{}': {}", kind, expression, e))
        })?;
        patterns.insert(expression.to_string(), pattern.clone());
        Ok(pattern)
    }

    /// 名称是否能解析为定义
    pub fn contains_bean(&self, name: &str) -> bool {
        self.get_bean_definition(name).is_ok()
    }

    /// 所有 provider 声明的规范名
    pub fn bean_names(&self) -> Vec<String> {
        let providers = self.providers.read().clone();
        let mut names = Vec::new();
        for provider in providers {
            for name in provider.bean_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// 类、父类或接口为 `class` 的 Bean，合并所有 provider 的结果
    pub fn get_beans_by_class(&self, class: &str) -> Vec<String> {
        let providers = self.providers.read().clone();
        let mut names = Vec::new();
        for provider in providers {
            for name in provider.get_beans_by_class(class) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// 注册额外的 provider，立即初始化并收集它的切面
    pub fn register_bean_definition_provider(
        &self,
        provider: Arc<dyn BeanDefinitionProvider>,
    ) -> ContainerResult<()> {
        self.ensure_active()?;
        provider.init(self)?;
        for aspect in provider.get_aspects(&self.aspect_manager)? {
            self.aspect_manager.set_aspect(aspect);
        }
        tracing::debug!("Registered bean definition provider '{}'", provider.name());
        self.providers.write().push(provider);
        Ok(())
    }

    // ========== Bean ==========

    /// 获取 Bean，单例在首次请求时创建并缓存
    pub fn get_bean(&self, name: &str) -> ContainerResult<Arc<dyn Bean>> {
        let definition = self.get_bean_definition(name)?;
        if definition.is_singleton() {
            if let Some(bean) = self.singletons.read().get(&definition.name) {
                tracing::trace!("Returning cached instance of singleton bean '{}'", definition.name);
                return Ok(Arc::clone(bean));
            }
        }

        let _lock = self.lock.lock();
        if definition.is_singleton() {
            if let Some(bean) = self.singletons.read().get(&definition.name) {
                return Ok(Arc::clone(bean));
            }
        }
        let _guard = self.creating.enter(&definition.name).map_err(|chain| {
            tracing::error!("Circular dependency detected: {}", chain.join(" -> "));
            ContainerError::CircularDependency(chain)
        })?;
        self.create_bean(&definition)
    }

    /// 获取 Bean 并转换为具体类型（代理对象转换其原始 Bean）
    pub fn get_bean_as<T: Bean>(&self, name: &str) -> ContainerResult<Arc<T>> {
        let bean = self.get_bean(name)?;
        <dyn Bean>::downcast_arc::<T>(bean).ok_or_else(|| ContainerError::TypeMismatch {
            bean: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
    }

    fn create_bean(&self, definition: &Arc<BeanDefinition>) -> ContainerResult<Arc<dyn Bean>> {
        let name = definition.name.as_str();
        if definition.is_abstract {
            return Err(ContainerError::creation(
                name,
                "abstract definitions cannot be instantiated",
            ));
        }
        tracing::debug!("Creating {} bean '{}'", definition.scope, name);

        for dependency in &definition.depends_on {
            self.get_bean(dependency)?;
        }

        self.lifecycle.before_create(definition, self)?;
        let mut instance = self
            .instantiate(definition)
            .map_err(|e| creation_error(name, e))?;
        instance.set_container(self.handle());

        self.lifecycle
            .before_assemble(&mut *instance, definition, self)?;
        for property in &definition.properties {
            let value = self.resolve_value(&property.value)?;
            instance
                .set_property(&property.name, value)
                .map_err(|e| creation_error(name, e))?;
        }
        self.lifecycle
            .after_assemble(&mut *instance, definition, self)?;

        if let Some(init) = definition.init_method.as_deref() {
            tracing::trace!("Calling init method {}() on '{}'", init, name);
            instance.invoke_mut(init, &[]).map_err(|e| {
                ContainerError::creation(name, format!("init method {}() failed: {}", init, e))
            })?;
        }

        let bean: Arc<dyn Bean> = Arc::from(instance);
        let bean = self.lifecycle.after_create(bean, definition, self)?;

        if definition.is_singleton() {
            self.singletons
                .write()
                .insert(name.to_string(), Arc::clone(&bean));
            self.creation_order.lock().push(name.to_string());
            if let Some(destroy) = definition.destroy_method.as_deref() {
                self.shutdown_actions.lock().push(ShutdownAction::Method {
                    label: format!("{}.{}()", name, destroy),
                    bean: Arc::clone(&bean),
                    method: destroy.to_string(),
                });
            }
        }
        Ok(bean)
    }

    fn resolve_class(&self, class: &str) -> Option<Arc<ClassMetadata>> {
        self.metadata
            .get_class(class)
            .or_else(|| driver::builtin_class(class))
    }

    fn instantiate(&self, definition: &BeanDefinition) -> ContainerResult<Box<dyn Bean>> {
        let name = definition.name.as_str();
        let arguments = self.resolve_arguments(definition)?;

        if let Some(factory_bean) = definition.factory_bean.as_deref().filter(|b| !b.is_empty()) {
            let method = definition
                .factory_method
                .as_deref()
                .ok_or_else(|| ContainerError::creation(name, "factory-bean needs a factory-method"))?;
            let factory = self.get_bean(factory_bean)?;
            tracing::trace!("Producing '{}' with {}.{}()", name, factory_bean, method);
            return factory.produce(method, arguments);
        }

        let class_name = self.resolve_placeholders(&definition.class);
        if class_name.is_empty() {
            return Err(ContainerError::creation(name, "no class specified"));
        }
        let class = self
            .resolve_class(&class_name)
            .ok_or_else(|| ContainerError::creation(name, format!("unknown class '{}'", class_name)))?;

        if let Some(method) = definition.factory_method.as_deref().filter(|m| !m.is_empty()) {
            let factory = class.static_factories.get(method).ok_or_else(|| {
                ContainerError::creation(
                    name,
                    format!("class '{}' has no static factory {}()", class_name, method),
                )
            })?;
            return factory(arguments);
        }

        if class.is_abstract {
            return Err(ContainerError::creation(
                name,
                format!("class '{}' is abstract", class_name),
            ));
        }
        let constructor = class.constructor.as_ref().ok_or_else(|| {
            ContainerError::creation(name, format!("class '{}' has no constructor", class_name))
        })?;
        (constructor.factory)(arguments)
    }

    fn resolve_arguments(&self, definition: &BeanDefinition) -> ContainerResult<Arguments> {
        let mut arguments = Arguments::new();
        for argument in &definition.arguments {
            let value = self.resolve_value(&argument.value)?;
            match &argument.name {
                Some(name) => arguments.push_named(name.clone(), value),
                None => arguments.push(value),
            }
        }
        Ok(arguments)
    }

    /// 把值定义转换为运行时值
    fn resolve_value(&self, value: &ValueDefinition) -> ContainerResult<Value> {
        match value {
            ValueDefinition::Literal(Literal::String(text)) => {
                Ok(Value::String(self.resolve_placeholders(text)))
            }
            ValueDefinition::Literal(literal) => Ok(Value::from(literal.clone())),
            ValueDefinition::Bean(name) => Ok(Value::Bean(self.get_bean(name)?)),
            ValueDefinition::Code(code) => self.evaluator.evaluate(&self.resolve_placeholders(code)),
            ValueDefinition::Array(items) => {
                if items.iter().any(|item| item.key.is_some()) {
                    let mut entries = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        let key = item.key.clone().unwrap_or_else(|| index.to_string());
                        entries.push((key, self.resolve_value(&item.value)?));
                    }
                    Ok(Value::Map(entries))
                } else {
                    items
                        .iter()
                        .map(|item| self.resolve_value(&item.value))
                        .collect::<ContainerResult<Vec<_>>>()
                        .map(Value::Array)
                }
            }
        }
    }

    // ========== 事件 ==========

    /// 监听 `event` 的 Bean，包括通过 `event_listen` 注册的
    pub fn get_beans_listening_on(&self, event: &str) -> Vec<String> {
        let providers = self.providers.read().clone();
        let mut names = Vec::new();
        for provider in providers {
            for name in provider.get_beans_listening_on(event) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        if let Some(registered) = self.listeners.read().get(event) {
            for name in registered {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// 注册事件监听 Bean
    pub fn event_listen(&self, event: &str, bean: &str) {
        let mut listeners = self.listeners.write();
        let beans = listeners.entry(event.to_string()).or_default();
        if !beans.iter().any(|b| b == bean) {
            beans.push(bean.to_string());
        }
    }

    /// 分发事件：对每个监听 Bean 调用 `on_<event>`，不存在时调用 `on<Event>`
    pub fn event_dispatch(&self, event: &str, data: Value) -> ContainerResult<()> {
        self.ensure_active()?;
        let [snake, pascal] = event_handler_names(event);
        let listeners = self.get_beans_listening_on(event);
        tracing::debug!("Dispatching event '{}' to {} listener(s)", event, listeners.len());
        for name in listeners {
            let bean = self.get_bean(&name)?;
            let args = [data.clone()];
            match bean.invoke(&snake, &args) {
                Err(e) if e.is_no_such_method(&snake) => {
                    bean.invoke(&pascal, &args)?;
                }
                result => {
                    result?;
                }
            }
        }
        Ok(())
    }

    // ========== 属性 ==========

    /// 注册属性，优先级高于所有配置源
    pub fn register_properties<I, K, V>(&self, properties: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        self.environment.register_properties(properties);
    }

    pub fn get_property(&self, key: &str) -> Option<ConfigValue> {
        self.environment.get(key)
    }

    /// 替换 `${key}` / `${key:default}` 占位符
    pub fn resolve_placeholders(&self, text: &str) -> String {
        self.environment.resolve_placeholders(text)
    }

    pub fn get_resource(&self, location: &str) -> ContainerResult<Box<dyn Resource>> {
        self.resource_loader.get_resource(location)
    }

    // ========== 消息 ==========

    /// 安装容器的消息源，替换之前安装的
    pub fn set_message_source(&self, source: Arc<dyn MessageSource>) {
        *self.message_source.write() = Some(source);
    }

    pub fn message_source(&self) -> Option<Arc<dyn MessageSource>> {
        self.message_source.read().clone()
    }

    /// 通过已安装的消息源查找消息，没有安装消息源时返回 None
    pub fn get_message(
        &self,
        bundle: &str,
        key: &str,
        args: &[Value],
        locale: &str,
    ) -> ContainerResult<Option<String>> {
        self.ensure_active()?;
        match self.message_source() {
            Some(source) => source.get_message(bundle, key, args, locale),
            None => Ok(None),
        }
    }

    // ========== 关闭 ==========

    /// 容器关闭时调用 Bean 的方法
    pub fn register_shutdown_method(&self, bean: Arc<dyn Bean>, method: impl Into<String>) {
        let method = method.into();
        self.shutdown_actions.lock().push(ShutdownAction::Method {
            label: format!("{}.{}()", bean.class_name(), method),
            bean,
            method,
        });
    }

    /// 注册 shutdown hook
    pub fn register_shutdown_hook<F>(&self, hook: F)
    where
        F: Fn() -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.shutdown_actions
            .lock()
            .push(ShutdownAction::Hook(Box::new(hook)));
    }

    /// 单例的创建顺序
    pub fn creation_order(&self) -> Vec<String> {
        self.creation_order.lock().clone()
    }

    /// 关闭容器
    ///
    /// 按注册的逆序调用 destroy 方法与 shutdown hooks（失败只记录日志），
    /// 然后清空单例、定义缓存与注册的属性。重复调用没有效果。
    pub fn shutdown(&self) -> ContainerResult<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!("Shutting down container");
        let _lock = self.lock.lock();

        self.plugins.shutdown_all(self);

        let actions = std::mem::take(&mut *self.shutdown_actions.lock());
        tracing::info!("Executing {} shutdown action(s)", actions.len());
        for action in actions.iter().rev() {
            match action.run() {
                Ok(()) => tracing::debug!("{} completed", action.label()),
                Err(e) => tracing::warn!("{} failed: {}", action.label(), e),
            }
        }

        self.singletons.write().clear();
        self.message_source.write().take();
        self.definitions.write().clear();
        self.creation_order.lock().clear();
        self.environment.clear_registered();
        tracing::info!("Container shutdown complete");
        Ok(())
    }

    // ========== 启动 ==========

    fn initialize(&self) -> ContainerResult<()> {
        let providers = self.providers.read().clone();
        for provider in &providers {
            tracing::debug!("Initializing provider '{}'", provider.name());
            provider.init(self)?;
        }
        for provider in &providers {
            for aspect in provider.get_aspects(&self.aspect_manager)? {
                self.aspect_manager.set_aspect(aspect);
            }
        }
        tracing::debug!(
            "Collected {} pointcut(s) and {} global aspect(s)",
            self.aspect_manager.pointcut_count(),
            self.aspect_manager.aspect_count()
        );

        self.lifecycle.after_config(self)?;

        if self.options.eager_definitions {
            for name in self.bean_names() {
                self.get_bean_definition(&name)?;
            }
        }
        if self.options.preinstantiate_singletons {
            for name in self.bean_names() {
                let definition = self.get_bean_definition(&name)?;
                if definition.is_singleton() && !definition.is_abstract {
                    self.get_bean(&name)?;
                }
            }
        }
        tracing::info!(
            "Container started with {} provider(s) and {} bean(s)",
            providers.len(),
            self.bean_names().len()
        );
        Ok(())
    }
}

fn creation_error(name: &str, error: ContainerError) -> ContainerError {
    match error {
        ContainerError::Invocation { .. } | ContainerError::Other(_) => {
            ContainerError::creation(name, error.to_string())
        }
        other => other,
    }
}

/// 容器构建器
///
/// ```ignore
/// let container = Container::builder()
///     .with_provider(Arc::new(AnnotationProvider::new()))
///     .with_options(ContainerOptions::from_file("arbor.toml")?)
///     .with_standard_drivers()
///     .build()?;
/// ```
pub struct ContainerBuilder {
    providers: Vec<Arc<dyn BeanDefinitionProvider>>,
    metadata: Option<Arc<dyn ClassMetadataProvider>>,
    lifecycle: BeanLifecycleManager,
    options: ContainerOptions,
    property_sources: Vec<Box<dyn PropertySource>>,
    properties: Vec<(String, ConfigValue)>,
    resource_loader: Option<Arc<dyn ResourceLoader>>,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    plugins: PluginRegistry,
    standard_drivers: bool,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            metadata: None,
            lifecycle: BeanLifecycleManager::new(),
            options: ContainerOptions::default(),
            property_sources: Vec::new(),
            properties: Vec::new(),
            resource_loader: None,
            evaluator: None,
            plugins: PluginRegistry::new(),
            standard_drivers: false,
        }
    }

    /// 添加 provider，按添加顺序查询
    pub fn with_provider(mut self, provider: Arc<dyn BeanDefinitionProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// 类元数据，默认为 `ClassRegistry::from_inventory()`
    pub fn with_metadata(mut self, metadata: Arc<dyn ClassMetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// 替换整个生命周期管道
    pub fn with_lifecycle(mut self, lifecycle: BeanLifecycleManager) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_listener(mut self, listener: LifecycleListener) -> Self {
        self.lifecycle.add(listener);
        self
    }

    pub fn add_listener(&mut self, listener: LifecycleListener) {
        self.lifecycle.add(listener);
    }

    pub fn add_provider(&mut self, provider: Arc<dyn BeanDefinitionProvider>) {
        self.providers.push(provider);
    }

    /// 启用内置 drivers
    pub fn with_standard_drivers(mut self) -> Self {
        self.standard_drivers = true;
        self
    }

    pub fn with_options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    pub fn lifecycle(&self) -> &BeanLifecycleManager {
        &self.lifecycle
    }

    pub fn with_properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_property_source(mut self, source: Box<dyn PropertySource>) -> Self {
        self.property_sources.push(source);
        self
    }

    pub fn with_resource_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.resource_loader = Some(loader);
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_plugins(mut self, plugins: Vec<Box<dyn ContainerPlugin>>) -> Self {
        for plugin in plugins {
            self.plugins.register(plugin);
        }
        self
    }

    /// 加载通过 `submit_plugin!` 提交的插件
    pub fn with_discovered_plugins(mut self) -> Self {
        self.plugins.merge(load_plugins());
        self
    }

    pub fn build(mut self) -> ContainerResult<Arc<Container>> {
        let mut plugins = std::mem::take(&mut self.plugins);
        plugins.sort_by_priority();
        plugins.configure_all(&mut self)?;

        if let Some(logging) = self.options.logging.clone() {
            if let Err(e) = logging.init() {
                tracing::debug!("Logging already initialized: {}", e);
            }
        }

        let mut providers = self.providers;
        if !self.options.declarative.is_empty() {
            providers.push(Arc::new(DeclarativeProvider::from_options(
                &self.options.declarative,
            )));
        }
        let mut lifecycle = self.lifecycle;
        if self.standard_drivers {
            let method_injection = Arc::new(MethodInjectionDriver::new());
            for listener in driver::standard_drivers(Arc::clone(&method_injection)) {
                lifecycle.add(listener);
            }
            providers.push(method_injection);
        }
        if !self.options.property_files.is_empty() {
            lifecycle.add(LifecycleListener::AfterConfig(Arc::new(PropertiesDriver::new(
                self.options.property_files.clone(),
            ))));
        }

        let environment = Arc::new(Environment::new());
        for source in self.property_sources {
            environment.add_property_source(source);
        }
        environment.register_properties(self.options.properties.clone());
        environment.register_properties(self.properties);

        let metadata = self
            .metadata
            .unwrap_or_else(|| Arc::new(ClassRegistry::from_inventory()));
        let resource_loader = self
            .resource_loader
            .unwrap_or_else(|| Arc::new(DefaultResourceLoader::new()));
        let evaluator = self
            .evaluator
            .unwrap_or_else(|| Arc::new(LiteralEvaluator));
        let options = self.options;

        let container = Arc::new_cyclic(|self_ref| Container {
            self_ref: self_ref.clone(),
            providers: RwLock::new(providers),
            metadata,
            lifecycle,
            aspect_manager: AspectManager::new(),
            environment,
            resource_loader,
            evaluator,
            options,
            plugins,
            definitions: RwLock::new(HashMap::new()),
            singletons: RwLock::new(HashMap::new()),
            creation_order: Mutex::new(Vec::new()),
            listeners: RwLock::new(HashMap::new()),
            shutdown_actions: Mutex::new(Vec::new()),
            message_source: RwLock::new(None),
            patterns: Mutex::new(HashMap::new()),
            lock: ReentrantMutex::new(()),
            resolving: CreationTracker::new(),
            creating: CreationTracker::new(),
            disposed: AtomicBool::new(false),
        });

        if let Err(e) = container.initialize() {
            tracing::error!("Container startup failed: {}", e);
            container.disposed.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ArrayElement, ConstructorArgumentDefinition};
    use crate::provider::CoreProvider;
    use crate::scope::Scope;

    #[derive(Default)]
    struct Service {
        name: String,
        repository: Option<Arc<dyn Bean>>,
        tags: Vec<Value>,
        started: bool,
    }

    impl Bean for Service {
        fn set_property(&mut self, name: &str, value: Value) -> ContainerResult<()> {
            match name {
                "name" => self.name = value.to_display_string(),
                "repository" => self.repository = value.as_bean().cloned(),
                "tags" => self.tags = value.as_array().map(<[Value]>::to_vec).unwrap_or_default(),
                other => return Err(ContainerError::invocation("Service", other, "unknown property")),
            }
            Ok(())
        }

        fn invoke_mut(&mut self, method: &str, _args: &[Value]) -> ContainerResult<Value> {
            match method {
                "start" => {
                    self.started = true;
                    Ok(Value::Null)
                }
                other => Err(ContainerError::no_such_method("Service", other)),
            }
        }
    }

    #[derive(Default)]
    struct Repository {
        url: String,
    }

    impl Bean for Repository {}

    fn registry() -> Arc<ClassRegistry> {
        Arc::new(
            ClassRegistry::new()
                .with_class(
                    ClassMetadata::new("Service")
                        .with_constructor(|_| Ok(Box::new(Service::default()) as Box<dyn Bean>)),
                )
                .with_class(ClassMetadata::new("Repository").with_constructor(|args| {
                    let url = args.resolve("url", 0).map(Value::to_display_string).unwrap_or_default();
                    Ok(Box::new(Repository { url }) as Box<dyn Bean>)
                })),
        )
    }

    fn build(provider: CoreProvider) -> Arc<Container> {
        Container::builder()
            .with_metadata(registry())
            .with_provider(Arc::new(provider))
            .with_properties([("db.url", "sqlite://memory")])
            .build()
            .unwrap()
    }

    #[test]
    fn test_singleton_and_alias_identity() {
        let container = build(CoreProvider::new().with_definition(
            BeanDefinition::new("repository")
                .with_class("Repository")
                .with_alias("repo"),
        ));

        let by_name = container.get_bean("repository").unwrap();
        let by_alias = container.get_bean("repo").unwrap();
        assert!(Arc::ptr_eq(&by_name, &by_alias));
        assert!(Arc::ptr_eq(
            &container.get_bean_definition("repository").unwrap(),
            &container.get_bean_definition("repo").unwrap()
        ));
    }

    #[test]
    fn test_prototype_creates_new_instances() {
        let container = build(CoreProvider::new().with_definition(
            BeanDefinition::new("repository")
                .with_class("Repository")
                .with_scope(Scope::Prototype),
        ));
        let a = container.get_bean("repository").unwrap();
        let b = container.get_bean("repository").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_assembly_resolves_values() {
        let container = build(
            CoreProvider::new()
                .with_definition(
                    BeanDefinition::new("repository")
                        .with_class("Repository")
                        .with_argument(ConstructorArgumentDefinition::named(
                            "url",
                            ValueDefinition::literal("${db.url}"),
                        )),
                )
                .with_definition(
                    BeanDefinition::new("service")
                        .with_class("Service")
                        .with_property("name", ValueDefinition::literal("${app.name:demo}"))
                        .with_property("repository", ValueDefinition::bean("repository"))
                        .with_property(
                            "tags",
                            ValueDefinition::Array(vec![
                                ArrayElement::new(ValueDefinition::literal("a")),
                                ArrayElement::new(ValueDefinition::code("[1, 2]")),
                            ]),
                        )
                        .with_init_method("start"),
                ),
        );

        let service = container.get_bean_as::<Service>("service").unwrap();
        assert_eq!(service.name, "demo");
        assert!(service.started);
        assert_eq!(service.tags.len(), 2);
        assert_eq!(service.tags[1].as_array().map(<[Value]>::len), Some(2));

        let repository = service.repository.clone().unwrap();
        let repository = <dyn Bean>::downcast_arc::<Repository>(repository).unwrap();
        assert_eq!(repository.url, "sqlite://memory");
    }

    #[test]
    fn test_circular_dependency_is_reported() {
        let container = build(
            CoreProvider::new()
                .with_definition(
                    BeanDefinition::new("a")
                        .with_class("Service")
                        .with_property("repository", ValueDefinition::bean("b")),
                )
                .with_definition(
                    BeanDefinition::new("b")
                        .with_class("Service")
                        .with_property("repository", ValueDefinition::bean("a")),
                ),
        );
        match container.get_bean("a") {
            Err(ContainerError::CircularDependency(chain)) => {
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("expected circular dependency, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unknown_bean() {
        let container = build(CoreProvider::new());
        assert!(matches!(
            container.get_bean("missing"),
            Err(ContainerError::BeanNotFound(name)) if name == "missing"
        ));
        assert!(!container.contains_bean("missing"));
    }

    #[test]
    fn test_abstract_definition_cannot_be_created() {
        let container = build(CoreProvider::new().with_definition(
            BeanDefinition::new("base").with_class("Service").abstract_definition(),
        ));
        assert!(container.get_bean_definition("base").is_ok());
        assert!(matches!(
            container.get_bean("base"),
            Err(ContainerError::BeanCreationFailed { .. })
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let container = build(
            CoreProvider::new()
                .with_definition(BeanDefinition::new("repository").with_class("Repository")),
        );
        assert!(matches!(
            container.get_bean_as::<Service>("repository"),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_shutdown_disposes_container() {
        let container = build(
            CoreProvider::new()
                .with_definition(BeanDefinition::new("repository").with_class("Repository")),
        );
        container.get_bean("repository").unwrap();
        let handle = container.handle();
        container.shutdown().unwrap();
        container.shutdown().unwrap();

        assert!(container.is_disposed());
        assert!(matches!(
            container.get_bean("repository"),
            Err(ContainerError::ContainerDisposed)
        ));
        assert!(matches!(handle.get_bean("repository"), Err(ContainerError::ContainerDisposed)));
        assert!(container.get_property("db.url").is_none());
    }

    #[test]
    fn test_invalid_pointcuts_fail_the_build() {
        use crate::aspect::{AspectType, PointcutDefinition};

        let aspected = |pointcut: &str| {
            BeanDefinition::new("repository").with_class("Repository").with_aspect(AspectDefinition::new(
                "tracing",
                vec![pointcut.to_string()],
                AspectType::Method,
                "tracer",
                "",
            ))
        };
        let build = |provider: CoreProvider| {
            Container::builder()
                .with_metadata(registry())
                .with_provider(Arc::new(provider))
                .build()
        };

        let err = build(CoreProvider::new().with_definition(aspected("missing"))).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Unknown pointcut: missing"));

        let err = build(
            CoreProvider::new()
                .with_pointcut(PointcutDefinition::new("broken", "^(save", "trace"))
                .with_definition(aspected("broken")),
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Invalid pointcut expression '^(save'"));
    }
}
