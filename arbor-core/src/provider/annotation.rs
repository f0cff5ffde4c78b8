//! 基于类注解的 Bean 定义
//!
//! 带有标记注解（`@Bean`、`@Component`、`@Controller`、`@Configuration`、
//! `@Aspect`、`@Named`）的类成为 Bean：
//!
//! - 名称：标记注解的 `name=` 值，第一个为规范名，其余为别名；默认是类名的 camelCase
//! - `class=` 覆盖实现类
//! - `@Scope(value=...)` / `@Singleton` / `@Prototype`、`@Primary` 或 `primary=true`
//! - `@InitMethod(method=...)` / `@DestroyMethod(method=...)`
//! - `@Configuration` 类中带 `@Bean` 的方法成为工厂 Bean
//! - 最近的已注册祖先类的定义作为父定义（沿整条祖先链查找）
//! - `@ListensOn(value="a,b")` 在本类与所有祖先类上声明的事件都会登记
//! - `@Aspect` 类中的 `@MethodInterceptor` / `@ExceptionInterceptor` 方法生成全局切面

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{split_csv, BeanDefinitionProvider, ClassIndex, EventIndex};
use crate::annotation::{Annotation, AnnotationCollection};
use crate::aspect::{AspectDefinition, AspectManager, AspectType, PointcutDefinition};
use crate::constants::*;
use crate::container::Container;
use crate::definition::BeanDefinition;
use crate::error::ContainerResult;
use crate::reflection::ClassMetadataProvider;
use crate::scope::Scope;
use crate::utils::naming::to_camel_case;

#[derive(Debug, Clone)]
enum BeanSource {
    Class,
    FactoryMethod { factory_bean: String, method: String },
}

#[derive(Debug, Clone)]
struct ScannedBean {
    /// 第一个是规范名
    names: Vec<String>,
    class: String,
    marker: &'static str,
    annotations: AnnotationCollection,
    source: BeanSource,
}

impl ScannedBean {
    fn lead(&self) -> &str {
        &self.names[0]
    }

    fn marker_annotation(&self) -> Option<&Annotation> {
        self.annotations.get_single_annotation(self.marker)
    }
}

#[derive(Default)]
struct ScanState {
    order: Vec<String>,
    beans: HashMap<String, ScannedBean>,
    /// 任意名称 -> 规范名
    names: HashMap<String, String>,
    /// 类 -> 由该类直接声明的 Bean（不含工厂方法 Bean）
    class_beans: HashMap<String, String>,
    classes: ClassIndex,
    events: EventIndex,
    metadata: Option<Arc<dyn ClassMetadataProvider>>,
}

impl ScanState {
    fn add(&mut self, metadata: &dyn ClassMetadataProvider, bean: ScannedBean) -> Option<String> {
        let lead = bean.lead().to_string();
        if self.beans.contains_key(&lead) {
            tracing::warn!(
                "Bean name '{}' of class '{}' is already taken, skipping",
                lead,
                bean.class
            );
            return None;
        }
        for name in &bean.names {
            self.names.entry(name.clone()).or_insert_with(|| lead.clone());
        }
        let is_abstract = metadata
            .get_class(&bean.class)
            .map_or(false, |c| c.is_abstract);
        if !is_abstract {
            self.classes.add(metadata, &bean.class, &lead);
        }
        if matches!(bean.source, BeanSource::Class) {
            self.class_beans.insert(bean.class.clone(), lead.clone());
        }
        tracing::trace!("Found annotated bean '{}' ({})", lead, bean.class);
        self.order.push(lead.clone());
        self.beans.insert(lead.clone(), bean);
        Some(lead)
    }

    fn register_events(&mut self, metadata: &dyn ClassMetadataProvider, bean: &ScannedBean) {
        let lead = bean.lead().to_string();
        let mut register = |annotations: &AnnotationCollection| {
            if let Some(listens_on) = annotations.get_single_annotation(LISTENS_ON) {
                for events in listens_on.get_option_values(VALUE).unwrap_or_default() {
                    self.events.add_csv(events, &lead);
                }
            }
        };
        match bean.source {
            BeanSource::FactoryMethod { .. } => register(&bean.annotations),
            BeanSource::Class => {
                if metadata.get_class(&bean.class).map_or(false, |c| c.is_abstract) {
                    return;
                }
                register(&bean.annotations);
                for ancestor in metadata.get_class_ancestors(&bean.class) {
                    register(&metadata.get_class_annotations(&ancestor));
                }
            }
        }
    }
}

fn simple_class_name(class: &str) -> &str {
    class.rsplit("::").next().unwrap_or(class)
}

fn declared_names(marker: Option<&Annotation>, default: String) -> Vec<String> {
    let names: Vec<String> = marker
        .and_then(|a| a.get_option_values("name").ok())
        .map(|values| values.iter().flat_map(|v| split_csv(v)).map(str::to_string).collect())
        .unwrap_or_default();
    if names.is_empty() {
        vec![default]
    } else {
        names
    }
}

/// 注解扫描 provider
pub struct AnnotationProvider {
    state: RwLock<ScanState>,
}

impl AnnotationProvider {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ScanState::default()),
        }
    }

    fn scan(&self, metadata: &dyn ClassMetadataProvider) -> ScanState {
        let mut state = ScanState::default();
        let mut seen = HashSet::new();

        for marker in BEAN_MARKER_ANNOTATIONS {
            for class in metadata.get_classes_by_annotation(marker) {
                if !seen.insert(class.clone()) {
                    continue;
                }
                let annotations = metadata.get_class_annotations(&class);
                let names = declared_names(
                    annotations.get_single_annotation(marker),
                    to_camel_case(simple_class_name(&class)),
                );
                let is_configuration = annotations.contains(CONFIGURATION);
                let bean = ScannedBean {
                    names,
                    class: class.clone(),
                    marker,
                    annotations,
                    source: BeanSource::Class,
                };
                let Some(factory_bean) = state.add(metadata, bean) else {
                    continue;
                };
                if is_configuration {
                    Self::scan_factory_methods(metadata, &mut state, &class, &factory_bean);
                }
            }
        }

        let beans: Vec<ScannedBean> = state
            .order
            .iter()
            .filter_map(|lead| state.beans.get(lead).cloned())
            .collect();
        for bean in &beans {
            state.register_events(metadata, bean);
        }
        state
    }

    fn scan_factory_methods(
        metadata: &dyn ClassMetadataProvider,
        state: &mut ScanState,
        class: &str,
        factory_bean: &str,
    ) {
        for method in metadata.get_all_methods(class) {
            let Some(bean_annotation) = method.annotations.get_single_annotation(BEAN) else {
                continue;
            };
            let product = bean_annotation
                .option("class")
                .map(str::to_string)
                .or_else(|| method.return_type.clone())
                .unwrap_or_else(|| DEFAULT_OBJECT_CLASS.to_string());
            let names = declared_names(Some(bean_annotation), method.name.clone());
            state.add(
                metadata,
                ScannedBean {
                    names,
                    class: product,
                    marker: BEAN,
                    annotations: method.annotations.clone(),
                    source: BeanSource::FactoryMethod {
                        factory_bean: factory_bean.to_string(),
                        method: method.name.clone(),
                    },
                },
            );
        }
    }

    /// 最近的、自身是 Bean 的祖先类对应的 Bean 名称
    fn parent_bean(&self, metadata: &dyn ClassMetadataProvider, class: &str) -> Option<String> {
        let state = self.state.read();
        metadata
            .get_class_ancestors(class)
            .into_iter()
            .find_map(|ancestor| state.class_beans.get(&ancestor).cloned())
    }

    fn make_definition(
        &self,
        bean: &ScannedBean,
        container: &Container,
    ) -> ContainerResult<BeanDefinition> {
        let metadata = container.metadata();
        let lead = bean.lead();

        let parent = match bean.source {
            BeanSource::Class => self.parent_bean(metadata.as_ref(), &bean.class),
            BeanSource::FactoryMethod { .. } => None,
        };
        let mut definition = match parent {
            Some(parent) => {
                tracing::trace!("Bean '{}' inherits definition of '{}'", lead, parent);
                container.get_bean_definition(&parent)?.make_child_bean(lead)
            }
            None => BeanDefinition::new(lead),
        };

        if let BeanSource::FactoryMethod { factory_bean, method } = &bean.source {
            definition.factory_bean = Some(factory_bean.clone());
            definition.factory_method = Some(method.clone());
        }

        if metadata.get_class(&bean.class).map_or(false, |c| c.is_abstract) {
            definition.make_abstract();
        } else {
            definition.make_concrete();
        }
        definition.class = bean.class.clone();

        let marker = bean.marker_annotation();
        if let Some(class) = marker.and_then(|a| a.option("class")) {
            definition.class = class.to_string();
        }
        for alias in &bean.names[1..] {
            definition.add_alias(alias.clone());
        }

        let annotations = &bean.annotations;
        if let Some(scope) = annotations.get_single_annotation(SCOPE) {
            if let Some(value) = scope.option(VALUE) {
                definition.scope = value.parse::<Scope>()?;
            }
        } else if annotations.contains(SINGLETON) {
            definition.scope = Scope::Singleton;
        } else if annotations.contains(PROTOTYPE) {
            definition.scope = Scope::Prototype;
        }

        let primary = annotations.contains(PRIMARY)
            || marker.and_then(|a| a.flag(PRIMARY)).unwrap_or(false);
        if primary {
            definition.mark_as_primary_candidate();
        }

        if let Some(method) = annotations
            .get_single_annotation(INIT_METHOD)
            .and_then(|a| a.option("method"))
        {
            definition.init_method = Some(method.to_string());
        }
        if let Some(method) = annotations
            .get_single_annotation(DESTROY_METHOD)
            .and_then(|a| a.option("method"))
        {
            definition.destroy_method = Some(method.to_string());
        }

        Ok(definition)
    }
}

impl Default for AnnotationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanDefinitionProvider for AnnotationProvider {
    fn name(&self) -> &str {
        "annotation"
    }

    fn init(&self, container: &Container) -> ContainerResult<()> {
        let metadata = container.metadata().clone();
        let mut state = self.scan(metadata.as_ref());
        state.metadata = Some(metadata);
        tracing::info!("Annotation scan found {} bean(s)", state.order.len());
        *self.state.write() = state;
        Ok(())
    }

    fn get_bean_definition(
        &self,
        name: &str,
        container: &Container,
    ) -> ContainerResult<Option<BeanDefinition>> {
        let bean = {
            let state = self.state.read();
            let Some(lead) = state.names.get(name) else {
                return Ok(None);
            };
            match state.beans.get(lead) {
                Some(bean) => bean.clone(),
                None => return Ok(None),
            }
        };
        self.make_definition(&bean, container).map(Some)
    }

    fn get_beans_by_class(&self, class: &str) -> Vec<String> {
        self.state.read().classes.get(class)
    }

    fn get_beans_listening_on(&self, event: &str) -> Vec<String> {
        self.state.read().events.get(event)
    }

    fn get_aspects(&self, manager: &AspectManager) -> ContainerResult<Vec<AspectDefinition>> {
        let (metadata, aspect_beans) = {
            let state = self.state.read();
            let Some(metadata) = state.metadata.clone() else {
                return Ok(Vec::new());
            };
            let beans: Vec<(String, String)> = state
                .order
                .iter()
                .filter_map(|lead| state.beans.get(lead))
                .filter(|bean| {
                    matches!(bean.source, BeanSource::Class) && bean.annotations.contains(ASPECT)
                })
                .map(|bean| (bean.lead().to_string(), bean.class.clone()))
                .collect();
            (metadata, beans)
        };

        let mut aspects = Vec::new();
        for (bean_name, class) in aspect_beans {
            for method in metadata.get_all_methods(&class) {
                for (marker, kind) in [
                    (METHOD_INTERCEPTOR, AspectType::Method),
                    (EXCEPTION_INTERCEPTOR, AspectType::Exception),
                ] {
                    if !method.annotations.contains(marker) {
                        continue;
                    }
                    for annotation in method.annotations.get_annotations(marker)? {
                        let expression = annotation.get_option_single_value("expression")?;
                        let class_expression = annotation.option_or("class-expression", "");
                        let pointcut = BeanDefinition::generate_name("PointcutAnnotation");
                        manager.set_pointcut(PointcutDefinition::new(
                            pointcut.clone(),
                            expression,
                            method.name.clone(),
                        ));
                        aspects.push(AspectDefinition::new(
                            BeanDefinition::generate_name("AnnotationAspect"),
                            vec![pointcut],
                            kind,
                            bean_name.clone(),
                            class_expression,
                        ));
                    }
                }
            }
        }
        tracing::debug!("Annotation scan declared {} aspect(s)", aspects.len());
        Ok(aspects)
    }

    fn bean_names(&self) -> Vec<String> {
        self.state.read().order.clone()
    }
}
