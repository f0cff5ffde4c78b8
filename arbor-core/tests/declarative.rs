mod common;

use std::sync::Arc;

use arbor_core::prelude::*;
use common::{registry, write_file, Journal, Repository, Worker};

fn build(dir: &std::path::Path, file: &str) -> ContainerResult<Arc<Container>> {
    Container::builder()
        .with_metadata(Arc::new(registry()))
        .with_options(
            ContainerOptions::new()
                .with_declarative_file(file)
                .with_declarative_directory(dir)
                .with_property("db.url", "postgres://db"),
        )
        .with_standard_drivers()
        .build()
}

const BEANS: &str = r#"
alias:
  repository: "repo, store"
beans:
  journal:
    class: Journal
  repository:
    class: Repository
    constructor-args:
      url: "${db.url}"
      pool_size: 8
  memory:
    class: Repository
    factory-method: in_memory
  connections:
    class: ConnectionFactory
  pooled:
    factory-bean: connections
    factory-method: open
    scope: prototype
    constructor-args: ["sqlite://pooled", 2]
  base:
    abstract: true
    class: Worker
    properties:
      id: {value: base}
      journal: {ref: journal}
  worker:
    parent: base
    init-method: start
    destroy-method: stop
    properties:
      id: {value: worker}
      store: {ref: repo}
      helpers:
        - {bean: {class: Repository, constructor-args: ["inline://a"]}}
        - {value: plain}
"#;

#[test]
fn test_aliases_share_one_instance() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "beans.yaml", BEANS);
    let container = build(dir.path(), "beans.yaml").unwrap();

    let repository = container.get_bean("repository").unwrap();
    assert!(Arc::ptr_eq(&repository, &container.get_bean("repo").unwrap()));
    assert!(Arc::ptr_eq(&repository, &container.get_bean("store").unwrap()));

    let repository = container.get_bean_as::<Repository>("repo").unwrap();
    assert_eq!(repository.url, "postgres://db");
    assert_eq!(repository.pool_size, 8);
}

#[test]
fn test_factories() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "beans.yaml", BEANS);
    let container = build(dir.path(), "beans.yaml").unwrap();

    let memory = container.get_bean_as::<Repository>("memory").unwrap();
    assert_eq!(memory.url, "memory");

    let a = container.get_bean_as::<Repository>("pooled").unwrap();
    let b = container.get_bean_as::<Repository>("pooled").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a.url, "sqlite://pooled");
    assert_eq!(a.pool_size, 2);

    // 静态工厂与工厂 Bean 生产的 Bean 不参与按类型查找
    let stores = container.get_beans_by_class("Store");
    assert!(stores.contains(&"repository".to_string()));
    assert!(!stores.contains(&"memory".to_string()));
    assert!(!stores.contains(&"pooled".to_string()));
}

#[test]
fn test_parent_definition_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "beans.yaml", BEANS);
    let container = build(dir.path(), "beans.yaml").unwrap();

    let base = container.get_bean_definition("base").unwrap();
    let worker = container.get_bean_definition("worker").unwrap();
    assert!(base.is_abstract);
    assert!(!worker.is_abstract);
    assert_eq!(worker.class, "Worker");
    assert_eq!(worker.parent.as_deref(), Some("base"));
    assert!(worker.has_property("journal"));
    assert_eq!(
        worker.get_property("id").map(|p| p.value.clone()),
        Some(ValueDefinition::literal("worker"))
    );
    assert_eq!(
        base.get_property("id").map(|p| p.value.clone()),
        Some(ValueDefinition::literal("base"))
    );
    assert!(container.get_bean("base").is_err());
}

#[test]
fn test_assembly_and_shutdown_order() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "beans.yaml", BEANS);
    let container = build(dir.path(), "beans.yaml").unwrap();

    let worker = container.get_bean_as::<Worker>("worker").unwrap();
    assert_eq!(worker.id, "worker");
    assert!(worker.handle.is_some());
    assert_eq!(worker.helpers.len(), 2);
    assert_eq!(worker.helpers[1], Value::from("plain"));
    let inline = worker.helpers[0].downcast::<Repository>().unwrap();
    assert_eq!(inline.url, "inline://a");

    let store = worker.store.clone().unwrap();
    assert!(Arc::ptr_eq(&store, &container.get_bean("repository").unwrap()));

    let journal = container.get_bean_as::<Journal>("journal").unwrap();
    container.register_shutdown_hook({
        let journal = Arc::clone(&journal);
        move || {
            journal.record("hook");
            Ok(())
        }
    });
    container.shutdown().unwrap();
    assert_eq!(journal.entries(), vec!["worker:start", "hook", "worker:stop"]);
}

#[test]
fn test_imports_and_search_directories() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    write_file(first.path(), "main.yaml", "import: [extra.yaml]\nbeans:\n  journal: {class: Journal}\n");
    write_file(first.path(), "extra.yaml", "beans:\n  repository: {class: Repository, constructor-args: [first]}\n");
    write_file(second.path(), "extra.yaml", "beans:\n  repository: {class: Repository, constructor-args: [second]}\n");

    let container = Container::builder()
        .with_metadata(Arc::new(registry()))
        .with_options(
            ContainerOptions::new()
                .with_declarative_file("main.yaml")
                .with_declarative_directory(first.path())
                .with_declarative_directory(second.path()),
        )
        .build()
        .unwrap();

    let repository = container.get_bean_as::<Repository>("repository").unwrap();
    assert_eq!(repository.url, "second");
    assert!(container.contains_bean("journal"));
}

#[test]
fn test_toml_bean_file() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "beans.toml",
        r#"
[beans.repository]
class = "Repository"
scope = "prototype"
constructor-args = ["toml://db", 3]
"#,
    );
    let container = build(dir.path(), "beans.toml").unwrap();
    let definition = container.get_bean_definition("repository").unwrap();
    assert_eq!(definition.scope, Scope::Prototype);
    let repository = container.get_bean_as::<Repository>("repository").unwrap();
    assert_eq!(repository.pool_size, 3);
}

#[test]
fn test_configuration_errors() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "empty.yaml", "");
    write_file(dir.path(), "scope.yaml", "beans:\n  a: {class: Worker, scope: session}\n");

    let err = build(dir.path(), "missing.yaml").unwrap_err();
    assert!(err.is_configuration());
    let err = build(dir.path(), "empty.yaml").unwrap_err();
    assert!(err.to_string().contains("Could not parse: empty.yaml"));
    let err = build(dir.path(), "scope.yaml").unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_lookup_methods_return_fresh_prototypes() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "beans.yaml",
        r#"
beans:
  session:
    class: Repository
    scope: prototype
  worker:
    class: Worker
    lookup-methods:
      create_session: session
"#,
    );
    let container = build(dir.path(), "beans.yaml").unwrap();
    let definition = container.get_bean_definition("worker").unwrap();
    assert!(definition.has_aspects());
    assert_eq!(definition.proxy_class_name.as_deref(), Some("WorkerProxy"));

    let lookup = container
        .get_bean_definition("methodInjection.create_session.session")
        .unwrap();
    assert_eq!(lookup.class, "MethodInjectionAspect");
    let pointcut = container
        .aspect_manager()
        .get_pointcut("methodInjection.create_session.session.pointcut")
        .unwrap();
    assert_eq!(pointcut.expression, "^create_session$");
    assert_eq!(pointcut.method, "invoke");
}
