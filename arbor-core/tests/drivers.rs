mod common;

use std::sync::Arc;

use arbor_core::prelude::*;
use common::{Journal, Repository, Worker};

fn component(class: &str) -> ClassMetadata {
    ClassMetadata::new(class).with_annotation(Annotation::new("Component"))
}

fn store(class: &str) -> ClassMetadata {
    component(class)
        .with_interface("Store")
        .with_constructor(|_| Ok(Box::new(Repository::default())))
}

fn worker(class: &str) -> ClassMetadata {
    component(class).with_constructor(|_| Ok(Box::new(Worker::default())))
}

fn inject_store(annotation: Annotation) -> PropertyMetadata {
    PropertyMetadata::new("store")
        .with_type("Store")
        .with_annotation(annotation)
}

fn build(registry: ClassRegistry) -> ContainerResult<Arc<Container>> {
    Container::builder()
        .with_metadata(Arc::new(registry))
        .with_provider(Arc::new(AnnotationProvider::new()))
        .with_properties([("report.id", "reports")])
        .with_standard_drivers()
        .build()
}

#[test]
fn test_annotated_service_is_fully_wired() {
    let registry = ClassRegistry::new()
        .with_class(store("SqlStore"))
        .with_class(
            ClassMetadata::new("Journal")
                .with_annotation(Annotation::new("Component").with_option("name", "auditJournal"))
                .with_constructor(|_| Ok(Box::new(Journal::default()))),
        )
        .with_class(
            worker("ReportService")
                .with_property(inject_store(Annotation::new("Inject")))
                .with_property(
                    PropertyMetadata::new("id")
                        .with_annotation(Annotation::new("Value").with_option("value", "${report.id}")),
                )
                .with_method(
                    MethodMetadata::new("setJournal")
                        .with_param("journal", "Journal")
                        .with_annotation(Annotation::new("Resource").with_option("name", "auditJournal")),
                )
                .with_method(MethodMetadata::new("setId").with_annotation(Annotation::new("Required")))
                .with_method(MethodMetadata::new("start").with_annotation(Annotation::new("PostConstruct")))
                .with_method(MethodMetadata::new("stop").with_annotation(Annotation::new("PreDestroy"))),
        );
    let container = build(registry).unwrap();

    let definition = container.get_bean_definition("reportService").unwrap();
    assert_eq!(definition.init_method.as_deref(), Some("start"));
    assert_eq!(definition.destroy_method.as_deref(), Some("stop"));

    let service = container.get_bean_as::<Worker>("reportService").unwrap();
    assert_eq!(service.id, "reports");
    let store = service.store.clone().unwrap();
    assert!(Arc::ptr_eq(&store, &container.get_bean("sqlStore").unwrap()));

    let journal = container.get_bean_as::<Journal>("auditJournal").unwrap();
    container.shutdown().unwrap();
    assert_eq!(journal.entries(), vec!["reports:start", "reports:stop"]);
}

#[test]
fn test_ambiguous_candidates_fail() {
    let registry = ClassRegistry::new()
        .with_class(store("AStore"))
        .with_class(store("BStore"))
        .with_class(worker("Consumer").with_property(inject_store(Annotation::new("Inject"))));
    let err = build(registry).unwrap_err();
    assert!(err.is_wiring());
    assert!(err
        .to_string()
        .contains("Too many candidates for injecting by type Store: aStore, bStore"));
}

#[test]
fn test_primary_candidate_wins() {
    let registry = ClassRegistry::new()
        .with_class(store("AStore"))
        .with_class(store("BStore").with_annotation(Annotation::new("Primary")))
        .with_class(worker("Consumer").with_property(inject_store(Annotation::new("Inject"))));
    let container = build(registry).unwrap();
    let definition = container.get_bean_definition("consumer").unwrap();
    assert_eq!(
        definition.get_property("store").map(|p| p.value.clone()),
        Some(ValueDefinition::bean("bStore"))
    );
}

#[test]
fn test_two_primary_candidates_fail() {
    let registry = ClassRegistry::new()
        .with_class(store("AStore").with_annotation(Annotation::new("Primary")))
        .with_class(store("BStore").with_annotation(Annotation::new("Primary")))
        .with_class(worker("Consumer").with_property(inject_store(Annotation::new("Inject"))));
    let err = build(registry).unwrap_err();
    assert!(err.to_string().contains("Too many (primary) candidates"));
}

#[test]
fn test_named_selects_candidate() {
    let named = |name: &str| {
        ClassRegistry::new()
            .with_class(store("AStore"))
            .with_class(store("BStore"))
            .with_class(
                worker("Consumer").with_property(
                    inject_store(Annotation::new("Inject"))
                        .with_annotation(Annotation::new("Named").with_option("name", name)),
                ),
            )
    };

    let container = build(named("aStore")).unwrap();
    let definition = container.get_bean_definition("consumer").unwrap();
    assert_eq!(
        definition.get_property("store").map(|p| p.value.clone()),
        Some(ValueDefinition::bean("aStore"))
    );

    let err = build(named("cStore")).unwrap_err();
    assert!(err.to_string().contains("Specified bean name in @Named not found: cStore"));
}

#[test]
fn test_optional_and_array_injection() {
    let registry = ClassRegistry::new()
        .with_class(store("AStore"))
        .with_class(store("BStore"))
        .with_class(
            worker("Consumer")
                .with_property(
                    PropertyMetadata::new("helpers")
                        .with_annotation(Annotation::new("Inject").with_option("type", "Store[]")),
                )
                .with_property(
                    PropertyMetadata::new("journal")
                        .with_type("Journal")
                        .with_annotation(Annotation::new("Inject").with_option("required", "false")),
                ),
        );
    let container = build(registry).unwrap();
    let definition = container.get_bean_definition("consumer").unwrap();
    assert!(!definition.has_property("journal"));

    let consumer = container.get_bean_as::<Worker>("consumer").unwrap();
    assert_eq!(consumer.helpers.len(), 2);
    assert!(consumer.helpers.iter().all(|h| h.downcast::<Repository>().is_some()));
}

#[test]
fn test_missing_candidates_and_required() {
    let registry = ClassRegistry::new()
        .with_class(worker("Consumer").with_property(inject_store(Annotation::new("Inject"))));
    let err = build(registry).unwrap_err();
    assert!(err
        .to_string()
        .contains("Did not find any candidates for injecting by type Store"));

    let registry = ClassRegistry::new().with_class(
        worker("Consumer")
            .with_method(MethodMetadata::new("setStore").with_annotation(Annotation::new("Required"))),
    );
    let err = build(registry).unwrap_err();
    assert!(err.is_wiring());
    assert!(err.to_string().contains("Missing @Required property: setStore"));
}

#[test]
fn test_constructor_injection() {
    let registry = ClassRegistry::new().with_class(store("SqlStore")).with_class(
        component("Consumer").with_constructor_metadata(
            MethodMetadata::new("new")
                .with_param("store", "Store")
                .with_param("id", "String")
                .with_annotation(Annotation::new("Inject").with_option("name", "store").with_option("type", "Store"))
                .with_annotation(Annotation::new("Value").with_option("name", "id").with_option("value", "${report.id}")),
            |args| {
                Ok(Box::new(Worker {
                    id: args.require("id", 1)?.to_display_string(),
                    store: args.named("store").and_then(Value::as_bean).cloned(),
                    ..Worker::default()
                }))
            },
        ),
    );
    let container = build(registry).unwrap();
    let consumer = container.get_bean_as::<Worker>("consumer").unwrap();
    assert_eq!(consumer.id, "reports");
    assert!(consumer.store.is_some());

    let registry = ClassRegistry::new().with_class(store("SqlStore")).with_class(
        component("Consumer").with_constructor_metadata(
            MethodMetadata::new("new")
                .with_param("store", "Store")
                .with_annotation(Annotation::new("Inject").with_option("name", "store")),
            |_| Ok(Box::new(Worker::default())),
        ),
    );
    let err = build(registry).unwrap_err();
    assert!(err.to_string().contains("Cant specify name without type"));
}

#[test]
fn test_setter_injection_needs_exactly_one_argument() {
    let registry = ClassRegistry::new().with_class(store("SqlStore")).with_class(
        worker("Consumer").with_method(MethodMetadata::new("setStore").with_annotation(Annotation::new("Inject"))),
    );
    let err = build(registry).unwrap_err();
    assert!(err.is_wiring());
    assert!(err.to_string().contains("Nothing to inject (no arguments in method)"));

    let registry = ClassRegistry::new().with_class(store("SqlStore")).with_class(
        worker("Consumer").with_method(
            MethodMetadata::new("setStores")
                .with_param("first", "Store")
                .with_param("second", "Store")
                .with_annotation(Annotation::new("Inject")),
        ),
    );
    let err = build(registry).unwrap_err();
    assert!(err.is_wiring());
    assert!(err.to_string().contains("Multiple arguments are not yet supported"));
}

#[test]
fn test_primary_lookup_does_not_resolve_candidates() {
    let injects = |class: &str, interface: &str, wants: &str| {
        worker(class)
            .with_interface(interface)
            .with_property(
                PropertyMetadata::new("store")
                    .with_type(wants)
                    .with_annotation(Annotation::new("Inject")),
            )
    };
    // sOne -> rOne -> sTwo 无环，但 rOne 的候选里有 sOne
    let registry = ClassRegistry::new()
        .with_class(injects("SOne", "Source", "Reader"))
        .with_class(injects("ROne", "Reader", "Source").with_annotation(Annotation::new("Primary")))
        .with_class(worker("RTwo").with_interface("Reader"))
        .with_class(worker("STwo").with_interface("Source").with_annotation(Annotation::new("Primary")));
    let container = build(registry).unwrap();

    let source = container.get_bean_as::<Worker>("sOne").unwrap();
    let reader = container.get_bean("rOne").unwrap();
    assert!(Arc::ptr_eq(source.store.as_ref().unwrap(), &reader));

    let reader = container.get_bean_as::<Worker>("rOne").unwrap();
    assert!(Arc::ptr_eq(reader.store.as_ref().unwrap(), &container.get_bean("sTwo").unwrap()));
}

#[test]
fn test_concurrent_singleton_lookup() {
    let registry = ClassRegistry::new().with_class(store("SqlStore"));
    let container = build(registry).unwrap();
    let barrier = std::sync::Barrier::new(2);

    let beans: Vec<Arc<dyn Bean>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    container.get_bean("sqlStore").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(Arc::ptr_eq(&beans[0], &beans[1]));
}
