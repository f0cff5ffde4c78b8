//! 查找方法注入
//!
//! `lookup-methods: {create_session: session}` 使得调用 `create_session` 时
//! 返回容器中的 `session` Bean（原型作用域时每次都是新实例）。
//!
//! 每个查找方法生成：
//! - 一个 `MethodInjectionAspect` 拦截器 Bean（由本 driver 作为 provider 提供）
//! - 一个匹配 `^method$`、入口为 `invoke` 的切点
//! - 一个方法切面，加到目标定义上

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::aspect::{AspectDefinition, AspectType, Invocation, PointcutDefinition};
use crate::bean::Bean;
use crate::constants::METHOD_INJECTION_ASPECT_CLASS;
use crate::container::{Container, ContainerHandle};
use crate::definition::{BeanDefinition, ValueDefinition};
use crate::error::{ContainerError, ContainerResult};
use crate::lifecycle::AfterDefinitionListener;
use crate::provider::BeanDefinitionProvider;
use crate::value::Value;

/// 查找方法的拦截器：直接返回容器中的目标 Bean
#[derive(Default)]
pub struct MethodInjectionAspect {
    bean_name: String,
    container: Option<ContainerHandle>,
}

impl Bean for MethodInjectionAspect {
    fn class_name(&self) -> &str {
        METHOD_INJECTION_ASPECT_CLASS
    }

    fn set_property(&mut self, name: &str, value: Value) -> ContainerResult<()> {
        match name {
            "bean_name" => {
                self.bean_name = value.to_display_string();
                Ok(())
            }
            other => Err(ContainerError::invocation(
                METHOD_INJECTION_ASPECT_CLASS,
                format!("set {}", other),
                "unknown property",
            )),
        }
    }

    fn set_container(&mut self, container: ContainerHandle) {
        self.container = Some(container);
    }

    fn intercept(&self, entry: &str, _invocation: &mut dyn Invocation) -> ContainerResult<Value> {
        if entry != "invoke" {
            return Err(ContainerError::no_such_method(METHOD_INJECTION_ASPECT_CLASS, entry));
        }
        let container = self
            .container
            .as_ref()
            .ok_or(ContainerError::ContainerDisposed)?;
        Ok(Value::Bean(container.get_bean(&self.bean_name)?))
    }
}

/// 把 `method_injections` 转换为切面的 driver，同时提供生成的拦截器 Bean 定义
#[derive(Default)]
pub struct MethodInjectionDriver {
    beans: RwLock<HashMap<String, BeanDefinition>>,
}

impl MethodInjectionDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AfterDefinitionListener for MethodInjectionDriver {
    fn name(&self) -> &str {
        "MethodInjectionDriver"
    }

    fn order(&self) -> i32 {
        500
    }

    fn after_definition(
        &self,
        mut definition: BeanDefinition,
        container: &Container,
    ) -> ContainerResult<BeanDefinition> {
        let injections = definition.method_injections.clone();
        for injection in injections {
            let aspect_bean = format!("methodInjection.{}.{}", injection.method, injection.bean);
            self.beans.write().entry(aspect_bean.clone()).or_insert_with(|| {
                BeanDefinition::new(&aspect_bean)
                    .with_class(METHOD_INJECTION_ASPECT_CLASS)
                    .with_property("bean_name", ValueDefinition::literal(injection.bean.as_str()))
            });

            let pointcut = format!("{}.pointcut", aspect_bean);
            container.aspect_manager().set_pointcut(PointcutDefinition::new(
                &pointcut,
                format!("^{}$", regex::escape(&injection.method)),
                "invoke",
            ));
            definition.add_aspect(AspectDefinition::new(
                format!("{}.aspect", aspect_bean),
                vec![pointcut],
                AspectType::Method,
                &aspect_bean,
                "",
            ));
            tracing::debug!(
                "Bean '{}' looks up '{}' through {}()",
                definition.name,
                injection.bean,
                injection.method
            );
        }
        Ok(definition)
    }
}

impl BeanDefinitionProvider for MethodInjectionDriver {
    fn name(&self) -> &str {
        "method-injection"
    }

    fn get_bean_definition(
        &self,
        name: &str,
        _container: &Container,
    ) -> ContainerResult<Option<BeanDefinition>> {
        Ok(self.beans.read().get(name).cloned())
    }

    fn get_beans_by_class(&self, _class: &str) -> Vec<String> {
        Vec::new()
    }
}
