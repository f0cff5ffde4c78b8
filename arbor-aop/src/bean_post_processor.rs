//! AOP 后处理器 - 为带切面的 Bean 包装代理

use std::sync::Arc;

use arbor_core::prelude::*;
use arbor_core::AfterCreateListener;

use crate::advisor::Advisor;
use crate::proxy::AspectProxy;

/// AOP 后处理器
///
/// 作为 `AfterCreate` 监听器运行：Bean 定义的 `aspects` 非空时，
/// 把已经装配好的 Bean 替换为 [`AspectProxy`]。
pub struct AopBeanPostProcessor {
    /// 是否启用 AOP
    enabled: bool,
}

impl AopBeanPostProcessor {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn should_apply_aop(&self, definition: &BeanDefinition) -> bool {
        self.enabled && definition.has_aspects()
    }
}

impl Default for AopBeanPostProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl AfterCreateListener for AopBeanPostProcessor {
    fn name(&self) -> &str {
        "AopBeanPostProcessor"
    }

    fn order(&self) -> i32 {
        // 在其它 AfterCreate 监听器之后执行
        2000
    }

    fn after_create(
        &self,
        bean: Arc<dyn Bean>,
        definition: &BeanDefinition,
        container: &Container,
    ) -> ContainerResult<Arc<dyn Bean>> {
        if !self.should_apply_aop(definition) {
            return Ok(bean);
        }

        let aspects = definition.aspects.as_deref().unwrap_or_default();
        let advisors = Advisor::from_definitions(aspects, container.aspect_manager())?;
        if advisors.is_empty() {
            return Ok(bean);
        }

        let class_name = definition
            .proxy_class_name
            .clone()
            .unwrap_or_else(|| format!("{}Proxy", bean.class_name()));
        tracing::debug!(
            "Wrapping bean '{}' in {} with {} advisor(s)",
            definition.name,
            class_name,
            advisors.len()
        );
        Ok(Arc::new(AspectProxy::new(
            bean,
            &definition.name,
            class_name,
            advisors,
            container.handle(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{AspectDefinition, CoreProvider, Invocation, LifecycleListener, PointcutDefinition};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Counter;

    impl Bean for Counter {
        fn class_name(&self) -> &str {
            "Counter"
        }

        fn invoke(&self, method: &str, _args: &[Value]) -> ContainerResult<Value> {
            match method {
                "count" => Ok(Value::from(1)),
                other => Err(ContainerError::no_such_method("Counter", other)),
            }
        }
    }

    #[derive(Default)]
    struct Tracer {
        calls: Mutex<Vec<String>>,
    }

    impl Bean for Tracer {
        fn intercept(&self, entry: &str, invocation: &mut dyn Invocation) -> ContainerResult<Value> {
            self.calls
                .lock()
                .push(format!("{}:{}", entry, invocation.method_name()));
            invocation.proceed()
        }
    }

    fn build(processor: AopBeanPostProcessor) -> Arc<Container> {
        let registry = ClassRegistry::new()
            .with_class(
                ClassMetadata::new("Counter")
                    .with_constructor(|_| Ok(Box::new(Counter) as Box<dyn Bean>)),
            )
            .with_class(
                ClassMetadata::new("Tracer")
                    .with_constructor(|_| Ok(Box::new(Tracer::default()) as Box<dyn Bean>)),
            );
        let provider = CoreProvider::new()
            .with_pointcut(PointcutDefinition::new("counting", "^count$", "trace"))
            .with_definition(BeanDefinition::new("tracer").with_class("Tracer"))
            .with_definition(BeanDefinition::new("counter").with_class("Counter").with_aspect(
                AspectDefinition::new(
                    "tracing",
                    vec!["counting".to_string()],
                    AspectType::Method,
                    "tracer",
                    "",
                ),
            ));
        Container::builder()
            .with_metadata(Arc::new(registry))
            .with_provider(Arc::new(provider))
            .with_listener(LifecycleListener::AfterCreate(Arc::new(processor)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_should_apply_aop() {
        let container = build(AopBeanPostProcessor::new());
        let counter = container.get_bean("counter").unwrap();
        assert!(counter.is::<AspectProxy>());
        assert_eq!(counter.class_name(), "CounterProxy");
        assert_eq!(counter.invoke("count", &[]).unwrap(), Value::from(1));
        assert!(<dyn Bean>::downcast_arc::<Counter>(counter).is_some());

        let tracer = container.get_bean_as::<Tracer>("tracer").unwrap();
        assert_eq!(*tracer.calls.lock(), vec!["trace:count"]);
        assert!(!container.get_bean("tracer").unwrap().is::<AspectProxy>());
    }

    #[test]
    fn test_disabled_processor() {
        let processor = AopBeanPostProcessor::disabled();
        assert!(!processor.is_enabled());

        let container = build(processor);
        let counter = container.get_bean("counter").unwrap();
        assert!(counter.is::<Counter>());
        counter.invoke("count", &[]).unwrap();
        assert!(container
            .get_bean_as::<Tracer>("tracer")
            .unwrap()
            .calls
            .lock()
            .is_empty());
    }

    #[test]
    fn test_processor_order() {
        let processor = AopBeanPostProcessor::new();
        assert_eq!(processor.order(), 2000);
        assert_eq!(processor.name(), "AopBeanPostProcessor");
    }
}
