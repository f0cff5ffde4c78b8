use crate::constants::RESOURCE;
use crate::container::Container;
use crate::definition::{BeanDefinition, PropertyDefinition, ValueDefinition};
use crate::error::ContainerResult;
use crate::lifecycle::AfterDefinitionListener;
use crate::utils::naming::setter_to_property;

/// `@Resource` 按名称注入
///
/// setter 与属性都可以标注，Bean 名称取 `name=`，默认为属性名。
pub struct ResourceDriver;

impl AfterDefinitionListener for ResourceDriver {
    fn name(&self) -> &str {
        "ResourceDriver"
    }

    fn order(&self) -> i32 {
        300
    }

    fn after_definition(
        &self,
        mut definition: BeanDefinition,
        container: &Container,
    ) -> ContainerResult<BeanDefinition> {
        if definition.class.is_empty() {
            return Ok(definition);
        }
        let metadata = container.metadata();

        for method in metadata.get_all_methods(&definition.class) {
            let Some(property) = setter_to_property(&method.name) else {
                continue;
            };
            let Some(annotation) = method.annotations.get_single_annotation(RESOURCE) else {
                continue;
            };
            let bean = annotation.option("name").unwrap_or(&property).to_string();
            definition.set_property(PropertyDefinition::new(property, ValueDefinition::Bean(bean)));
        }

        for property in metadata.get_all_properties(&definition.class) {
            let Some(annotation) = property.annotations.get_single_annotation(RESOURCE) else {
                continue;
            };
            let bean = annotation.option("name").unwrap_or(&property.name).to_string();
            definition.set_property(PropertyDefinition::new(
                property.name.clone(),
                ValueDefinition::Bean(bean),
            ));
        }
        Ok(definition)
    }
}
