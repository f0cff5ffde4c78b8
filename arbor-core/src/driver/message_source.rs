use std::sync::Arc;

use crate::bean::Bean;
use crate::constants::MESSAGE_SOURCE_BEAN;
use crate::container::Container;
use crate::definition::BeanDefinition;
use crate::error::{ContainerError, ContainerResult};
use crate::lifecycle::{AfterAssembleListener, AfterConfigListener};
use crate::message::BeanMessageSource;

/// 安装 `messageSource` Bean 并注入到其它 Bean
///
/// AfterConfig 阶段（属性文件加载之后）取出 `messageSource` 安装为容器的消息源；
/// 之后创建的 Bean 在装配完成后通过 `set_message_source` 拿到它。
pub struct MessageSourceDriver;

impl AfterConfigListener for MessageSourceDriver {
    fn name(&self) -> &str {
        "MessageSourceDriver"
    }

    fn order(&self) -> i32 {
        100
    }

    fn after_config(&self, container: &Container) -> ContainerResult<()> {
        match container.get_bean_definition(MESSAGE_SOURCE_BEAN) {
            Ok(_) => {}
            Err(ContainerError::BeanNotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        }
        let bean = container.get_bean(MESSAGE_SOURCE_BEAN)?;
        tracing::info!(
            "Installing message source '{}' ({})",
            MESSAGE_SOURCE_BEAN,
            bean.class_name()
        );
        container.set_message_source(Arc::new(BeanMessageSource::new(bean)));
        Ok(())
    }
}

impl AfterAssembleListener for MessageSourceDriver {
    fn name(&self) -> &str {
        "MessageSourceDriver"
    }

    fn after_assemble(
        &self,
        bean: &mut dyn Bean,
        definition: &BeanDefinition,
        container: &Container,
    ) -> ContainerResult<()> {
        if let Some(source) = container.message_source() {
            tracing::trace!("Injecting message source into '{}'", definition.name);
            bean.set_message_source(source);
        }
        Ok(())
    }
}
