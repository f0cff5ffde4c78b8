use crate::constants::{POST_CONSTRUCT, PRE_DESTROY};
use crate::container::Container;
use crate::definition::BeanDefinition;
use crate::error::ContainerResult;
use crate::lifecycle::AfterDefinitionListener;

/// 方法上的 `@PostConstruct` / `@PreDestroy` 设置 init / destroy 方法
pub struct InitDestroyDriver;

impl AfterDefinitionListener for InitDestroyDriver {
    fn name(&self) -> &str {
        "InitDestroyDriver"
    }

    fn order(&self) -> i32 {
        100
    }

    fn after_definition(
        &self,
        mut definition: BeanDefinition,
        container: &Container,
    ) -> ContainerResult<BeanDefinition> {
        if definition.class.is_empty() {
            return Ok(definition);
        }
        for method in container.metadata().get_all_methods(&definition.class) {
            if method.annotations.contains(POST_CONSTRUCT) {
                definition.init_method = Some(method.name.clone());
            } else if method.annotations.contains(PRE_DESTROY) {
                definition.destroy_method = Some(method.name.clone());
            }
        }
        Ok(definition)
    }
}
