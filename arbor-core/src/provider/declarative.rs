//! 声明式 Bean 文件（YAML / TOML）
//!
//! 文件结构：
//!
//! ```yaml
//! import: [other.yaml]
//! alias:
//!   repository: "repo, store"
//! beans:
//!   repository:
//!     class: SqlRepository
//!     scope: singleton
//!     properties:
//!       url: {value: "${db.url}"}
//!       cache: {ref: cache}
//!       codec: {bean: {class: JsonCodec}}
//!     constructor-args: [{ref: pool}, 10]
//!     aspects:
//!       - {ref: timer, type: method, pointcuts: [{pointcut-ref: all}]}
//!     lookup-methods: {create_session: session}
//! pointcuts:
//!   all: {expression: ".*", method: invoke}
//! aspects:
//!   - {id: audit, ref: auditor, type: method, expression: "Service$", pointcuts: [...]}
//! ```
//!
//! 文件在每个搜索目录中查找，多个目录都有同名文件时最后一个目录生效。

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::document::Node;
use super::{split_csv, BeanDefinitionProvider, ClassIndex, EventIndex};
use crate::aspect::{AspectDefinition, AspectManager, AspectType, PointcutDefinition};
use crate::container::Container;
use crate::definition::{
    ArrayElement, BeanDefinition, ConstructorArgumentDefinition, MethodInjection,
    PropertyDefinition, ValueDefinition,
};
use crate::error::{ContainerError, ContainerResult};
use crate::options::DeclarativeOptions;
use crate::scope::Scope;

#[derive(Default)]
struct DeclarativeState {
    /// 已加载的文档，按加载顺序（文件名, 文档）
    documents: Vec<(String, Node)>,
    aliases: HashMap<String, String>,
    order: Vec<String>,
    classes: ClassIndex,
    events: EventIndex,
}

impl DeclarativeState {
    fn find_bean(&self, name: &str) -> Option<Node> {
        self.documents
            .iter()
            .find_map(|(_, doc)| doc.get("beans").and_then(|beans| beans.get(name)))
            .cloned()
    }

    fn aliases_of(&self, name: &str) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort();
        aliases
    }
}

/// 声明式文件 provider
pub struct DeclarativeProvider {
    files: Vec<String>,
    directories: Vec<PathBuf>,
    state: RwLock<DeclarativeState>,
}

impl DeclarativeProvider {
    pub fn new<I, S>(files: I, directories: Vec<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            directories,
            state: RwLock::new(DeclarativeState::default()),
        }
    }

    pub fn from_options(options: &DeclarativeOptions) -> Self {
        Self::new(options.files.clone(), options.directories.clone())
    }

    fn locate(&self, filename: &str) -> ContainerResult<PathBuf> {
        let path = Path::new(filename);
        if path.is_absolute() || self.directories.is_empty() {
            return if path.exists() {
                Ok(path.to_path_buf())
            } else {
                Err(ContainerError::configuration(format!("{} not found", filename)))
            };
        }
        self.directories
            .iter()
            .map(|dir| dir.join(filename))
            .filter(|candidate| candidate.exists())
            .last()
            .ok_or_else(|| {
                ContainerError::configuration(format!(
                    "{} not found in {:?}",
                    filename, self.directories
                ))
            })
    }

    fn load(
        &self,
        filename: &str,
        seen: &mut HashSet<String>,
        documents: &mut Vec<(String, Node)>,
    ) -> ContainerResult<()> {
        if !seen.insert(filename.to_string()) {
            return Ok(());
        }
        let path = self.locate(filename)?;
        let content = fs::read_to_string(&path)
            .map_err(|e| ContainerError::io(path.display().to_string(), e))?;
        let mut document = Node::parse_file_content(&content, filename)?;
        if document.is_empty() {
            return Err(ContainerError::configuration(format!(
                "Could not parse: {}",
                filename
            )));
        }
        tracing::debug!("Loaded bean file '{}' from {}", filename, path.display());
        hoist_inline_beans(&mut document);

        let imports: Vec<String> = match document.get("import") {
            Some(Node::Seq(items)) => items.iter().filter_map(Node::as_text).collect(),
            Some(node) => node.as_text().into_iter().collect(),
            None => Vec::new(),
        };
        documents.push((filename.to_string(), document));
        for import in imports {
            self.load(&import, seen, documents)?;
        }
        Ok(())
    }

    fn index(container: &Container, state: &mut DeclarativeState) {
        let metadata = container.metadata().clone();
        let documents = std::mem::take(&mut state.documents);
        for (_, document) in &documents {
            if let Some(aliases) = document.get("alias").and_then(Node::as_map) {
                for (bean, list) in aliases {
                    for alias in split_csv(&list.as_text().unwrap_or_default()) {
                        state.aliases.insert(alias.to_string(), bean.clone());
                    }
                }
            }
            let Some(beans) = document.get("beans").and_then(Node::as_map) else {
                continue;
            };
            for (name, body) in beans {
                if state.order.contains(name) {
                    continue;
                }
                state.order.push(name.clone());
                if let Some(names) = body.text("name") {
                    for alias in split_csv(&names) {
                        state.aliases.insert(alias.to_string(), name.clone());
                    }
                }
                if let Some(events) = body.text("listens-on") {
                    state.events.add_csv(&events, name);
                }
                if let Some(class) = body.text("class") {
                    // 静态工厂的 class 是工厂类而不是产品类型
                    let static_factory =
                        body.contains_key("factory-method") && !body.contains_key("factory-bean");
                    if !static_factory && !body.flag("abstract") && !class.contains("${") {
                        state.classes.add(metadata.as_ref(), &class, name);
                    }
                }
            }
        }
        state.documents = documents;
    }
}

impl BeanDefinitionProvider for DeclarativeProvider {
    fn name(&self) -> &str {
        "declarative"
    }

    fn init(&self, container: &Container) -> ContainerResult<()> {
        let mut seen = HashSet::new();
        let mut documents = Vec::new();
        for file in &self.files {
            self.load(file, &mut seen, &mut documents)?;
        }
        let mut state = DeclarativeState {
            documents,
            ..Default::default()
        };
        Self::index(container, &mut state);
        tracing::info!(
            "Loaded {} bean file(s) declaring {} bean(s)",
            state.documents.len(),
            state.order.len()
        );
        *self.state.write() = state;
        Ok(())
    }

    fn get_bean_definition(
        &self,
        name: &str,
        container: &Container,
    ) -> ContainerResult<Option<BeanDefinition>> {
        let (canonical, body, aliases) = {
            let state = self.state.read();
            let canonical = state.aliases.get(name).cloned().unwrap_or_else(|| name.to_string());
            let Some(body) = state.find_bean(&canonical) else {
                return Ok(None);
            };
            let aliases = state.aliases_of(&canonical);
            (canonical, body, aliases)
        };

        let mut definition = match body.text("parent").filter(|p| !p.is_empty()) {
            Some(parent) => {
                tracing::trace!("Bean '{}' inherits definition of '{}'", canonical, parent);
                container.get_bean_definition(&parent)?.make_child_bean(&canonical)
            }
            None => BeanDefinition::new(&canonical),
        };
        for alias in aliases {
            definition.add_alias(alias);
        }
        apply_bean_body(&mut definition, &body, container.aspect_manager())?;
        Ok(Some(definition))
    }

    fn get_beans_by_class(&self, class: &str) -> Vec<String> {
        self.state.read().classes.get(class)
    }

    fn get_beans_listening_on(&self, event: &str) -> Vec<String> {
        self.state.read().events.get(event)
    }

    fn get_aspects(&self, manager: &AspectManager) -> ContainerResult<Vec<AspectDefinition>> {
        let state = self.state.read();
        let mut aspects = Vec::new();
        for (_, document) in &state.documents {
            if let Some(pointcuts) = document.get("pointcuts").and_then(Node::as_map) {
                for (name, pointcut) in pointcuts {
                    manager.set_pointcut(load_pointcut(name.clone(), pointcut)?);
                }
            }
            if let Some(list) = document.get("aspects").and_then(Node::as_seq) {
                for aspect in list {
                    aspects.push(load_aspect(aspect, None, manager)?);
                }
            }
        }
        Ok(aspects)
    }

    fn bean_names(&self) -> Vec<String> {
        self.state.read().order.clone()
    }
}

fn apply_bean_body(
    definition: &mut BeanDefinition,
    body: &Node,
    manager: &AspectManager,
) -> ContainerResult<()> {
    if let Some(class) = body.text("class") {
        definition.class = class;
    }
    if let Some(scope) = body.text("scope") {
        definition.scope = scope.parse::<Scope>()?;
    }
    if body.flag("primary") {
        definition.mark_as_primary_candidate();
    }
    if let Some(method) = body.text("factory-method") {
        definition.factory_method = Some(method);
    }
    if let Some(bean) = body.text("factory-bean") {
        definition.factory_bean = Some(bean);
    }
    if let Some(method) = body.text("init-method") {
        definition.init_method = Some(method);
    }
    if let Some(method) = body.text("destroy-method") {
        definition.destroy_method = Some(method);
    }
    if let Some(depends_on) = body.get("depends-on") {
        let names: Vec<String> = match depends_on {
            Node::Seq(items) => items.iter().filter_map(Node::as_text).collect(),
            node => split_csv(&node.as_text().unwrap_or_default())
                .map(str::to_string)
                .collect(),
        };
        for name in names {
            if !definition.depends_on.contains(&name) {
                definition.depends_on.push(name);
            }
        }
    }
    if body.flag("abstract") {
        definition.make_abstract();
    }

    if let Some(properties) = body.get("properties").and_then(Node::as_map) {
        for (name, node) in properties {
            definition.set_property(PropertyDefinition::new(name.clone(), property_value(node)?));
        }
    }

    if let Some(arguments) = body.get("constructor-args") {
        definition.arguments.clear();
        match arguments {
            Node::Map(entries) => {
                for (name, node) in entries {
                    definition.set_argument(ConstructorArgumentDefinition::named(
                        name.clone(),
                        argument_value(node)?,
                    ));
                }
            }
            Node::Seq(items) => {
                for node in items {
                    definition
                        .set_argument(ConstructorArgumentDefinition::new(argument_value(node)?));
                }
            }
            node => {
                definition.set_argument(ConstructorArgumentDefinition::new(argument_value(node)?))
            }
        }
    }

    match body.get("aspects") {
        Some(Node::Seq(items)) => {
            for aspect in items {
                definition.add_aspect(load_aspect(aspect, None, manager)?);
            }
        }
        Some(Node::Map(entries)) => {
            for (id, aspect) in entries {
                definition.add_aspect(load_aspect(aspect, Some(id.clone()), manager)?);
            }
        }
        _ => {}
    }

    if let Some(lookups) = body.get("lookup-methods").and_then(Node::as_map) {
        for (method, bean) in lookups {
            let bean = bean.as_text().unwrap_or_default();
            definition.method_injections.retain(|m| &m.method != method);
            definition
                .method_injections
                .push(MethodInjection::new(method.clone(), bean));
        }
    }
    Ok(())
}

/// 属性值：`ref`、`eval`、`value`（标量或递归数组），裸标量视为字面量
fn property_value(node: &Node) -> ContainerResult<ValueDefinition> {
    match node {
        Node::Map(_) => {
            if let Some(bean) = node.text("ref") {
                return Ok(ValueDefinition::Bean(bean));
            }
            if let Some(code) = node.text("eval") {
                return Ok(ValueDefinition::Code(code));
            }
            if node.contains_key("bean") {
                return Err(ContainerError::configuration(
                    "Inline bean must be declared inside properties or constructor-args",
                ));
            }
            match node.get("value") {
                Some(value) if value.is_scalar() => Ok(literal(value)),
                Some(value) => array_of(value, property_value),
                None => array_of(node, property_value),
            }
        }
        Node::Seq(_) => array_of(node, property_value),
        scalar => Ok(literal(scalar)),
    }
}

/// 构造参数值：标量为字面量，带 `ref`/`eval`/`value` 的映射同属性值，其它映射与序列为数组
fn argument_value(node: &Node) -> ContainerResult<ValueDefinition> {
    match node {
        Node::Map(_)
            if ["ref", "eval", "bean", "value"]
                .iter()
                .any(|key| node.contains_key(key)) =>
        {
            property_value(node)
        }
        Node::Map(_) | Node::Seq(_) => array_of(node, argument_value),
        scalar => Ok(literal(scalar)),
    }
}

fn literal(node: &Node) -> ValueDefinition {
    node.literal_value()
        .unwrap_or_else(|| ValueDefinition::literal(""))
}

fn array_of(
    node: &Node,
    element: fn(&Node) -> ContainerResult<ValueDefinition>,
) -> ContainerResult<ValueDefinition> {
    let items = match node {
        Node::Seq(items) => items
            .iter()
            .map(|item| element(item).map(ArrayElement::new))
            .collect::<ContainerResult<Vec<_>>>()?,
        Node::Map(entries) => entries
            .iter()
            .map(|(key, item)| element(item).map(|value| ArrayElement::keyed(key.clone(), value)))
            .collect::<ContainerResult<Vec<_>>>()?,
        scalar => vec![ArrayElement::new(literal(scalar))],
    };
    Ok(ValueDefinition::Array(items))
}

fn load_pointcut(name: String, node: &Node) -> ContainerResult<PointcutDefinition> {
    let expression = node.text("expression").ok_or_else(|| {
        ContainerError::configuration(format!("Pointcut '{}' is missing expression", name))
    })?;
    let method = node.text("method").ok_or_else(|| {
        ContainerError::configuration(format!("Pointcut '{}' is missing method", name))
    })?;
    Ok(PointcutDefinition::new(name, expression, method))
}

fn load_aspect(
    node: &Node,
    default_id: Option<String>,
    manager: &AspectManager,
) -> ContainerResult<AspectDefinition> {
    let name = node
        .text("id")
        .or(default_id)
        .unwrap_or_else(|| BeanDefinition::generate_name("AspectYAML"));
    let expression = node.text("expression").unwrap_or_default();
    let bean = node.text("ref").ok_or_else(|| {
        ContainerError::configuration(format!("Aspect '{}' is missing ref", name))
    })?;
    let kind = node
        .text("type")
        .ok_or_else(|| ContainerError::configuration("Invalid aspect type"))?
        .parse::<AspectType>()?;

    let mut pointcuts = Vec::new();
    for pointcut in node.get("pointcuts").and_then(Node::as_seq).unwrap_or_default() {
        if pointcut.contains_key("expression") {
            let id = pointcut
                .text("id")
                .unwrap_or_else(|| BeanDefinition::generate_name("PointcutYAML"));
            let definition = load_pointcut(id.clone(), pointcut)?;
            manager.set_pointcut(definition);
            pointcuts.push(id);
        } else if let Some(reference) = pointcut.text("pointcut-ref") {
            pointcuts.push(reference);
        }
    }
    Ok(AspectDefinition::new(name, pointcuts, kind, bean, expression))
}

/// 把 `{bean: {...}}` 形式的内联 Bean 提升为顶层 Bean，原位置改为 `{ref: 生成名}`
fn hoist_inline_beans(document: &mut Node) {
    let mut hoisted = Vec::new();
    if let Some(beans) = document.get_mut("beans").and_then(Node::as_map_mut) {
        for (_, body) in beans.iter_mut() {
            hoist_from_body(body, &mut hoisted);
        }
        for (name, _) in &hoisted {
            tracing::trace!("Hoisted inline bean '{}'", name);
        }
        beans.extend(hoisted);
    }
}

fn hoist_from_body(body: &mut Node, hoisted: &mut Vec<(String, Node)>) {
    if let Some(properties) = body.get_mut("properties").and_then(Node::as_map_mut) {
        for (_, value) in properties.iter_mut() {
            hoist_from_value(value, hoisted);
        }
    }
    if let Some(arguments) = body.get_mut("constructor-args") {
        match arguments {
            Node::Seq(items) => items.iter_mut().for_each(|v| hoist_from_value(v, hoisted)),
            Node::Map(entries) => entries
                .iter_mut()
                .for_each(|(_, v)| hoist_from_value(v, hoisted)),
            _ => {}
        }
    }
}

fn hoist_from_value(value: &mut Node, hoisted: &mut Vec<(String, Node)>) {
    match value {
        Node::Map(entries) => {
            if let Some(position) = entries.iter().position(|(k, _)| k == "bean") {
                let (_, mut body) = entries.remove(position);
                hoist_from_body(&mut body, hoisted);
                let name = BeanDefinition::generate_name("Bean");
                hoisted.push((name.clone(), body));
                *value = Node::Map(vec![("ref".to_string(), Node::String(name))]);
            } else if !entries.iter().any(|(k, _)| k == "ref" || k == "eval") {
                entries
                    .iter_mut()
                    .for_each(|(_, v)| hoist_from_value(v, hoisted));
            }
        }
        Node::Seq(items) => items.iter_mut().for_each(|v| hoist_from_value(v, hoisted)),
        _ => {}
    }
}
