//! AOP 插件 - 通过插件机制把 AOP 集成到容器

use std::sync::Arc;

use arbor_core::prelude::*;
use arbor_core::LifecycleListener;

use crate::AopBeanPostProcessor;

/// AOP 容器插件
///
/// 在容器构建之前注册 [`AopBeanPostProcessor`]。插件通过 inventory 自动提交，
/// 使用 `ContainerBuilder::with_discovered_plugins` 即可启用：
///
/// ```ignore
/// let container = Container::builder()
///     .with_metadata(registry)
///     .with_discovered_plugins()
///     .build()?;
/// ```
///
/// 也可以显式添加：
///
/// ```ignore
/// Container::builder().with_plugins(vec![Box::new(AopPlugin::new())])
/// ```
pub struct AopPlugin {
    /// 插件名称
    name: String,
    /// 是否启用
    enabled: bool,
}

impl AopPlugin {
    pub fn new() -> Self {
        Self {
            name: "AopPlugin".to_string(),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            name: "AopPlugin".to_string(),
            enabled: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for AopPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerPlugin for AopPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        50
    }

    fn configure(&self, builder: &mut ContainerBuilder) -> ContainerResult<()> {
        if !self.enabled {
            tracing::info!("AOP plugin is disabled, skipping");
            return Ok(());
        }
        builder.add_listener(LifecycleListener::AfterCreate(Arc::new(
            AopBeanPostProcessor::new(),
        )));
        tracing::debug!("AopBeanPostProcessor registered");
        Ok(())
    }

    fn on_shutdown(&self, container: &Container) -> ContainerResult<()> {
        if self.enabled {
            tracing::debug!(
                "AOP plugin shutting down ({} pointcut(s), {} global aspect(s))",
                container.aspect_manager().pointcut_count(),
                container.aspect_manager().aspect_count()
            );
        }
        Ok(())
    }
}

arbor_core::submit_plugin!(AopPlugin);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_creation() {
        let plugin = AopPlugin::new();
        assert_eq!(plugin.name(), "AopPlugin");
        assert!(plugin.enabled);
    }

    #[test]
    fn test_disabled_plugin() {
        let plugin = AopPlugin::disabled();
        assert!(!plugin.enabled);

        let mut builder = ContainerBuilder::new();
        plugin.configure(&mut builder).unwrap();
        assert!(builder_listener_names(&builder).is_empty());
    }

    #[test]
    fn test_custom_name() {
        let plugin = AopPlugin::new().with_name("CustomAopPlugin");
        assert_eq!(plugin.name(), "CustomAopPlugin");
    }

    #[test]
    fn test_discovered() {
        let registry = arbor_core::load_plugins();
        assert!(registry.plugins().iter().any(|p| p.name() == "AopPlugin"));
    }

    #[test]
    fn test_registers_post_processor() {
        let mut builder = ContainerBuilder::new();
        AopPlugin::new().configure(&mut builder).unwrap();
        assert_eq!(builder_listener_names(&builder), vec!["AopBeanPostProcessor"]);
    }

    fn builder_listener_names(builder: &ContainerBuilder) -> Vec<String> {
        builder
            .lifecycle()
            .listeners()
            .iter()
            .map(|l| l.name().to_string())
            .collect()
    }
}
