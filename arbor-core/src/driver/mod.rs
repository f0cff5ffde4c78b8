//! 内置 drivers
//!
//! driver 是挂在生命周期管道上的监听器，在 AfterDefinition 阶段根据类元数据上的注解
//! 修改 Bean 定义。默认顺序：
//!
//! | driver | order |
//! |--------|-------|
//! | InitDestroyDriver | 100 |
//! | InjectDriver | 200 |
//! | ResourceDriver | 300 |
//! | ValueDriver | 400 |
//! | MethodInjectionDriver | 500 |
//! | RequiredDriver | 900 |
//!
//! `MessageSourceDriver` 挂在 AfterConfig（order 100）与 AfterAssemble 阶段。

mod init_destroy;
mod inject;
mod message_source;
mod method_injection;
mod properties;
mod required;
mod resource;
mod value;

pub use self::init_destroy::InitDestroyDriver;
pub use self::inject::InjectDriver;
pub use self::message_source::MessageSourceDriver;
pub use self::method_injection::{MethodInjectionAspect, MethodInjectionDriver};
pub use self::properties::PropertiesDriver;
pub use self::required::RequiredDriver;
pub use self::resource::ResourceDriver;
pub use self::value::ValueDriver;

use std::sync::Arc;

use crate::bean::Bean;
use crate::constants::{METHOD_INJECTION_ASPECT_CLASS, RESOURCE_MESSAGE_SOURCE_CLASS};
use crate::container::Container;
use crate::definition::BeanDefinition;
use crate::error::ContainerResult;
use crate::lifecycle::LifecycleListener;
use crate::message::ResourceMessageSource;
use crate::reflection::{ClassMetadata, MethodMetadata};

/// 默认 driver 集合；`method_injection` 同时要作为 provider 注册到容器
pub fn standard_drivers(method_injection: Arc<MethodInjectionDriver>) -> Vec<LifecycleListener> {
    vec![
        LifecycleListener::AfterDefinition(Arc::new(InitDestroyDriver)),
        LifecycleListener::AfterDefinition(Arc::new(InjectDriver)),
        LifecycleListener::AfterDefinition(Arc::new(ResourceDriver)),
        LifecycleListener::AfterDefinition(Arc::new(ValueDriver)),
        LifecycleListener::AfterDefinition(method_injection),
        LifecycleListener::AfterDefinition(Arc::new(RequiredDriver)),
        LifecycleListener::AfterConfig(Arc::new(MessageSourceDriver)),
        LifecycleListener::AfterAssemble(Arc::new(MessageSourceDriver)),
    ]
}

/// 容器内置的类，不需要注册到类元数据
pub(crate) fn builtin_class(name: &str) -> Option<Arc<ClassMetadata>> {
    let metadata = match name {
        METHOD_INJECTION_ASPECT_CLASS => ClassMetadata::new(name)
            .with_constructor(|_| Ok(Box::new(MethodInjectionAspect::default()) as Box<dyn Bean>)),
        RESOURCE_MESSAGE_SOURCE_CLASS => ClassMetadata::new(name)
            .with_constructor(|_| Ok(Box::new(ResourceMessageSource::default()) as Box<dyn Bean>)),
        _ => return None,
    };
    Some(Arc::new(metadata))
}

/// 定义的实现类元数据，未知类返回 None
pub(crate) fn class_of(container: &Container, definition: &BeanDefinition) -> Option<Arc<ClassMetadata>> {
    if definition.class.is_empty() {
        return None;
    }
    container.metadata().get_class(&definition.class)
}

/// 创建 Bean 的方法：构造函数、工厂 Bean 上的工厂方法或类的静态工厂
pub(crate) fn creation_method(
    container: &Container,
    definition: &BeanDefinition,
) -> ContainerResult<Option<MethodMetadata>> {
    let metadata = container.metadata();
    if definition.is_created_by_constructor() {
        return Ok(class_of(container, definition)
            .and_then(|class| class.constructor.as_ref().map(|c| c.method.clone())));
    }
    let Some(method) = definition.factory_method.as_deref() else {
        return Ok(None);
    };
    if let Some(factory_bean) = definition.factory_bean.as_deref().filter(|b| !b.is_empty()) {
        let factory = container.get_bean_definition(factory_bean)?;
        return Ok(metadata.get_method(&factory.class, method));
    }
    Ok(metadata.get_method(&definition.class, method))
}
