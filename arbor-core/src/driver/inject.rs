//! `@Inject` 按类型注入
//!
//! 候选 Bean 来自 `Container::get_beans_by_class`，选择规则：
//!
//! 1. 类型以 `[]` 结尾时注入全部候选组成的数组
//! 2. 只有一个候选时直接注入
//! 3. 多个候选时，`@Named(name=...)` 指定的候选优先，否则取唯一的 primary 候选
//! 4. 其余情况（没有候选、多个 primary、多个普通候选）都是装配错误
//!
//! `required=false` 时没有候选不报错，也不注入。

use crate::annotation::{Annotation, AnnotationCollection};
use crate::constants::{ARRAY_TYPE_SUFFIX, BEAN, INJECT, NAMED};
use crate::container::Container;
use crate::definition::{BeanDefinition, ConstructorArgumentDefinition, PropertyDefinition, ValueDefinition};
use crate::error::{ContainerError, ContainerResult};
use crate::lifecycle::AfterDefinitionListener;
use crate::reflection::MethodMetadata;
use crate::utils::naming::setter_to_property;

use super::{class_of, creation_method};

pub struct InjectDriver;

struct InjectionPoint<'a> {
    bean: &'a str,
    target: &'a str,
    annotation: &'a Annotation,
    declared_type: Option<&'a str>,
    named: Option<&'a Annotation>,
}

impl InjectionPoint<'_> {
    fn fail(&self, reason: impl Into<String>) -> ContainerError {
        ContainerError::wiring(self.bean, self.target, reason)
    }

    fn resolve(&self, container: &Container) -> ContainerResult<Option<ValueDefinition>> {
        let required = self.annotation.flag("required").unwrap_or(true);
        let type_name = match self.annotation.option("type").or(self.declared_type) {
            Some(type_name) => type_name,
            None => return Err(self.fail("Missing type= option")),
        };
        let (type_name, is_array) = match type_name.strip_suffix(ARRAY_TYPE_SUFFIX) {
            Some(element) => (element, true),
            None => (type_name, false),
        };

        let mut candidates = container.get_beans_by_class(type_name);
        if candidates.is_empty() {
            if required {
                return Err(self.fail(format!(
                    "Did not find any candidates for injecting by type {}",
                    type_name
                )));
            }
            tracing::debug!(
                "No candidates of type {} for optional {} on '{}'",
                type_name,
                self.target,
                self.bean
            );
            return Ok(None);
        }
        if is_array {
            return Ok(Some(ValueDefinition::bean_array(candidates)));
        }

        if candidates.len() > 1 {
            if let Some(named) = self.named {
                let preferred = named
                    .option("name")
                    .ok_or_else(|| self.fail("@Named needs a name= option"))?;
                if !candidates.iter().any(|c| c == preferred) {
                    return Err(self.fail(format!(
                        "Specified bean name in @Named not found: {}",
                        preferred
                    )));
                }
                candidates = vec![preferred.to_string()];
            } else {
                let mut primary = None;
                for candidate in &candidates {
                    if container.raw_bean_definition(candidate)?.primary {
                        if primary.is_some() {
                            return Err(self.fail(format!(
                                "Too many (primary) candidates for injecting by type {}",
                                type_name
                            )));
                        }
                        primary = Some(candidate.clone());
                    }
                }
                if let Some(primary) = primary {
                    candidates = vec![primary];
                }
            }
            if candidates.len() > 1 {
                return Err(self.fail(format!(
                    "Too many candidates for injecting by type {}: {}",
                    type_name,
                    candidates.join(", ")
                )));
            }
        }
        Ok(candidates.pop().map(ValueDefinition::Bean))
    }
}

/// 构造参数上 `@Named(arg=..., name=...)` 指定的候选
fn named_for_argument<'a>(annotations: &'a AnnotationCollection, argument: &str) -> Option<&'a Annotation> {
    annotations
        .get_annotations(NAMED)
        .ok()?
        .iter()
        .filter(|named| named.option("arg") == Some(argument))
        .last()
}

impl InjectDriver {
    fn inject_properties(
        definition: &mut BeanDefinition,
        container: &Container,
    ) -> ContainerResult<()> {
        for property in container.metadata().get_all_properties(&definition.class) {
            let Some(annotation) = property.annotations.get_single_annotation(INJECT) else {
                continue;
            };
            let point = InjectionPoint {
                bean: &definition.name,
                target: &property.name,
                annotation,
                declared_type: property.type_name.as_deref(),
                named: property.annotations.get_single_annotation(NAMED),
            };
            if let Some(value) = point.resolve(container)? {
                definition.set_property(PropertyDefinition::new(property.name.clone(), value));
            }
        }
        Ok(())
    }

    fn inject_methods(definition: &mut BeanDefinition, container: &Container) -> ContainerResult<()> {
        for method in container.metadata().get_all_methods(&definition.class) {
            let annotations = &method.annotations;
            let Some(annotation) = annotations.get_single_annotation(INJECT) else {
                continue;
            };
            if annotations.contains(BEAN) || method.is_constructor() {
                continue;
            }
            let parameter = match method.parameters.as_slice() {
                [] => {
                    return Err(ContainerError::wiring(
                        &definition.name,
                        &method.name,
                        "Nothing to inject (no arguments in method)",
                    ))
                }
                [parameter] => parameter,
                _ => {
                    return Err(ContainerError::wiring(
                        &definition.name,
                        &method.name,
                        "Multiple arguments are not yet supported",
                    ))
                }
            };
            let point = InjectionPoint {
                bean: &definition.name,
                target: &method.name,
                annotation,
                declared_type: parameter.type_name.as_deref(),
                named: annotations.get_single_annotation(NAMED),
            };
            if let Some(value) = point.resolve(container)? {
                let property = setter_to_property(&method.name).unwrap_or_else(|| method.name.clone());
                definition.set_property(PropertyDefinition::new(property, value));
            }
        }
        Ok(())
    }

    fn inject_arguments(
        definition: &mut BeanDefinition,
        method: &MethodMetadata,
        container: &Container,
    ) -> ContainerResult<()> {
        let annotations = &method.annotations;
        if !annotations.contains(INJECT) {
            return Ok(());
        }
        for annotation in annotations.get_annotations(INJECT)? {
            let mut injected = Vec::new();
            match (annotation.option("name"), annotation.option("type")) {
                (Some(name), Some(type_name)) => {
                    let point = InjectionPoint {
                        bean: &definition.name,
                        target: name,
                        annotation,
                        declared_type: Some(type_name),
                        named: named_for_argument(annotations, name),
                    };
                    injected.push((name.to_string(), point.resolve(container)?));
                }
                (Some(_), None) => {
                    return Err(ContainerError::wiring(
                        &definition.name,
                        &method.name,
                        "Cant specify name without type",
                    ))
                }
                (None, Some(_)) => {
                    return Err(ContainerError::wiring(
                        &definition.name,
                        &method.name,
                        "Cant specify type without name",
                    ))
                }
                (None, None) => {
                    for parameter in &method.parameters {
                        let Some(type_name) = parameter.type_name.as_deref() else {
                            continue;
                        };
                        let point = InjectionPoint {
                            bean: &definition.name,
                            target: &parameter.name,
                            annotation,
                            declared_type: Some(type_name),
                            named: named_for_argument(annotations, &parameter.name),
                        };
                        injected.push((parameter.name.clone(), point.resolve(container)?));
                    }
                }
            }
            for (name, value) in injected {
                if let Some(value) = value {
                    definition.set_argument(ConstructorArgumentDefinition::named(name, value));
                }
            }
        }
        Ok(())
    }
}

impl AfterDefinitionListener for InjectDriver {
    fn name(&self) -> &str {
        "InjectDriver"
    }

    fn order(&self) -> i32 {
        200
    }

    fn after_definition(
        &self,
        mut definition: BeanDefinition,
        container: &Container,
    ) -> ContainerResult<BeanDefinition> {
        if class_of(container, &definition).is_some() {
            Self::inject_properties(&mut definition, container)?;
            Self::inject_methods(&mut definition, container)?;
        }
        if let Some(method) = creation_method(container, &definition)? {
            Self::inject_arguments(&mut definition, &method, container)?;
        }
        Ok(definition)
    }
}
