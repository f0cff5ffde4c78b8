use crate::annotation::AnnotationCollection;
use crate::constants::VALUE;
use crate::container::Container;
use crate::definition::{
    BeanDefinition, ConstructorArgumentDefinition, PropertyDefinition, ValueDefinition,
};
use crate::error::ContainerResult;
use crate::lifecycle::AfterDefinitionListener;

use super::creation_method;

/// `@Value` 字面量注入
///
/// 属性上的 `@Value(value=...)` 生成字面量属性；构造函数 / 工厂方法上的
/// 每个 `@Value` 生成构造参数，带 `name=` 时为命名参数。
/// 字面量中的 `${...}` 在装配时解析。
pub struct ValueDriver;

impl ValueDriver {
    fn apply_to_arguments(definition: &mut BeanDefinition, annotations: &AnnotationCollection) {
        if !annotations.contains(VALUE) {
            return;
        }
        let mut positional = Vec::new();
        for annotation in annotations.get_annotations(VALUE).unwrap_or_default() {
            let values = annotation.get_option_values(VALUE).unwrap_or_default();
            match annotation.option("name") {
                Some(name) => {
                    let group: Vec<_> = values
                        .iter()
                        .map(|v| ConstructorArgumentDefinition::named(name, ValueDefinition::literal(v.as_str())))
                        .collect();
                    replace_named(&mut definition.arguments, name, group);
                }
                None => positional.extend(
                    values
                        .iter()
                        .map(|v| ConstructorArgumentDefinition::new(ValueDefinition::literal(v.as_str()))),
                ),
            }
        }
        // 定义可能被重复处理（父定义已经处理过），已存在的参数序列不再追加
        if positional.is_empty() || contains_sequence(&definition.arguments, &positional) {
            return;
        }
        definition.arguments.extend(positional);
    }
}

/// 以整组替换同名参数，保持同名参数第一次出现的位置
fn replace_named(
    arguments: &mut Vec<ConstructorArgumentDefinition>,
    name: &str,
    group: Vec<ConstructorArgumentDefinition>,
) {
    let position = arguments
        .iter()
        .position(|a| a.name.as_deref() == Some(name))
        .unwrap_or(arguments.len());
    arguments.retain(|a| a.name.as_deref() != Some(name));
    let position = position.min(arguments.len());
    arguments.splice(position..position, group);
}

fn contains_sequence(
    arguments: &[ConstructorArgumentDefinition],
    sequence: &[ConstructorArgumentDefinition],
) -> bool {
    arguments.windows(sequence.len()).any(|window| window == sequence)
}

impl AfterDefinitionListener for ValueDriver {
    fn name(&self) -> &str {
        "ValueDriver"
    }

    fn order(&self) -> i32 {
        400
    }

    fn after_definition(
        &self,
        mut definition: BeanDefinition,
        container: &Container,
    ) -> ContainerResult<BeanDefinition> {
        if !definition.class.is_empty() {
            for property in container.metadata().get_all_properties(&definition.class) {
                let Some(value) = property
                    .annotations
                    .get_single_annotation(VALUE)
                    .and_then(|a| a.option(VALUE))
                else {
                    continue;
                };
                definition.set_property(PropertyDefinition::new(
                    property.name.clone(),
                    ValueDefinition::literal(value),
                ));
            }
        }
        if let Some(method) = creation_method(container, &definition)? {
            Self::apply_to_arguments(&mut definition, &method.annotations);
        }
        Ok(definition)
    }
}
