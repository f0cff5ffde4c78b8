//! 插件机制
//!
//! 插件在容器构建之前配置 `ContainerBuilder`（添加 provider、生命周期监听器、属性等），
//! 并在容器关闭时收到通知。通过 `submit_plugin!` 提交的插件在链接期收集。

use crate::container::{Container, ContainerBuilder};
use crate::error::ContainerResult;

/// 容器插件
pub trait ContainerPlugin: Send + Sync {
    /// 插件名称
    fn name(&self) -> &str;

    /// 插件优先级（数字越小优先级越高）
    fn priority(&self) -> i32 {
        100
    }

    /// 配置阶段，在容器构建之前执行
    fn configure(&self, _builder: &mut ContainerBuilder) -> ContainerResult<()> {
        Ok(())
    }

    /// 关闭阶段，在 destroy 方法之前执行
    fn on_shutdown(&self, _container: &Container) -> ContainerResult<()> {
        Ok(())
    }
}

/// 插件注册表
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn ContainerPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册插件，同名插件只保留第一个
    pub fn register(&mut self, plugin: Box<dyn ContainerPlugin>) {
        if self.plugins.iter().any(|p| p.name() == plugin.name()) {
            tracing::debug!("Plugin '{}' already registered", plugin.name());
            return;
        }
        tracing::debug!("Registering plugin: {}", plugin.name());
        self.plugins.push(plugin);
    }

    /// 合并另一个注册表
    pub fn merge(&mut self, other: PluginRegistry) {
        for plugin in other.plugins {
            self.register(plugin);
        }
    }

    /// 按优先级排序插件
    pub fn sort_by_priority(&mut self) {
        self.plugins.sort_by_key(|p| p.priority());
    }

    pub fn plugins(&self) -> &[Box<dyn ContainerPlugin>] {
        &self.plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// 执行配置阶段
    pub fn configure_all(&self, builder: &mut ContainerBuilder) -> ContainerResult<()> {
        for plugin in &self.plugins {
            tracing::info!("Configuring plugin: {}", plugin.name());
            plugin.configure(builder)?;
        }
        Ok(())
    }

    /// 执行关闭阶段，逆序，失败只记录日志
    pub fn shutdown_all(&self, container: &Container) {
        for plugin in self.plugins.iter().rev() {
            tracing::info!("Shutting down plugin: {}", plugin.name());
            if let Err(e) = plugin.on_shutdown(container) {
                tracing::error!("Failed to shutdown plugin {}: {}", plugin.name(), e);
            }
        }
    }
}

/// 用于全局收集插件的宏
#[macro_export]
macro_rules! submit_plugin {
    ($plugin_type:ty) => {
        $crate::inventory::submit! {
            $crate::PluginSubmission {
                create: || Box::new(<$plugin_type>::default())
            }
        }
    };
}

/// 插件提交结构
pub struct PluginSubmission {
    pub create: fn() -> Box<dyn ContainerPlugin>,
}

inventory::collect!(PluginSubmission);

/// 从全局注册表加载所有插件
pub fn load_plugins() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    for submission in inventory::iter::<PluginSubmission> {
        registry.register((submission.create)());
    }
    registry.sort_by_priority();
    tracing::debug!("Loaded {} plugin(s)", registry.len());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingPlugin {
        name: &'static str,
        priority: i32,
        shutdowns: Arc<AtomicUsize>,
    }

    impl ContainerPlugin for CountingPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn configure(&self, builder: &mut ContainerBuilder) -> ContainerResult<()> {
            let key = format!("plugin.{}", self.name);
            *builder = std::mem::take(builder).with_properties([(key, "on")]);
            Ok(())
        }

        fn on_shutdown(&self, _container: &Container) -> ContainerResult<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn plugin(name: &'static str, priority: i32, shutdowns: &Arc<AtomicUsize>) -> Box<dyn ContainerPlugin> {
        Box::new(CountingPlugin {
            name,
            priority,
            shutdowns: Arc::clone(shutdowns),
        })
    }

    #[test]
    fn test_sort_and_dedupe() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry.register(plugin("late", 200, &shutdowns));
        registry.register(plugin("early", 10, &shutdowns));
        registry.register(plugin("early", 1, &shutdowns));
        registry.sort_by_priority();

        let names: Vec<_> = registry.plugins().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn test_plugins_configure_and_shutdown() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let container = Container::builder()
            .with_metadata(Arc::new(crate::reflection::ClassRegistry::new()))
            .with_plugins(vec![plugin("a", 1, &shutdowns), plugin("b", 2, &shutdowns)])
            .build()
            .unwrap();

        assert_eq!(
            container.get_property("plugin.a").and_then(|v| v.as_str().map(str::to_string)),
            Some("on".to_string())
        );
        container.shutdown().unwrap();
        assert_eq!(shutdowns.load(Ordering::SeqCst), 2);
    }
}
