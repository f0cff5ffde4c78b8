use crate::constants::REQUIRED;
use crate::container::Container;
use crate::definition::BeanDefinition;
use crate::error::{ContainerError, ContainerResult};
use crate::lifecycle::AfterDefinitionListener;
use crate::utils::naming::setter_to_property;

/// 标注 `@Required` 的 setter 必须有对应的属性定义
pub struct RequiredDriver;

impl AfterDefinitionListener for RequiredDriver {
    fn name(&self) -> &str {
        "RequiredDriver"
    }

    fn order(&self) -> i32 {
        900
    }

    fn after_definition(
        &self,
        definition: BeanDefinition,
        container: &Container,
    ) -> ContainerResult<BeanDefinition> {
        if definition.class.is_empty() || definition.is_abstract {
            return Ok(definition);
        }
        for method in container.metadata().get_all_methods(&definition.class) {
            if !method.annotations.contains(REQUIRED) {
                continue;
            }
            let property = setter_to_property(&method.name).unwrap_or_else(|| method.name.clone());
            if !definition.has_property(&property) {
                return Err(ContainerError::wiring(
                    &definition.name,
                    &method.name,
                    format!("Missing @Required property: {}", method.name),
                ));
            }
        }
        Ok(definition)
    }
}
