#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use arbor_core::prelude::*;

/// 记录回调顺序
#[derive(Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

impl Bean for Journal {}

#[derive(Default)]
pub struct Worker {
    pub id: String,
    pub journal: Option<Arc<Journal>>,
    pub store: Option<Arc<dyn Bean>>,
    pub helpers: Vec<Value>,
    pub received: Mutex<Vec<String>>,
    pub handle: Option<ContainerHandle>,
}

impl Worker {
    fn record(&self, what: &str) {
        if let Some(journal) = &self.journal {
            journal.record(format!("{}:{}", self.id, what));
        }
    }
}

impl Bean for Worker {
    fn class_name(&self) -> &str {
        "Worker"
    }

    fn set_property(&mut self, name: &str, value: Value) -> ContainerResult<()> {
        match name {
            "id" => self.id = value.to_display_string(),
            "journal" => self.journal = Some(value.expect_bean::<Journal>("journal")?),
            "store" => self.store = value.as_bean().cloned(),
            "helpers" => self.helpers = value.as_array().map(<[Value]>::to_vec).unwrap_or_default(),
            other => {
                return Err(ContainerError::invocation("Worker", format!("set {}", other), "unknown property"))
            }
        }
        Ok(())
    }

    fn set_container(&mut self, container: ContainerHandle) {
        self.handle = Some(container);
    }

    fn invoke(&self, method: &str, args: &[Value]) -> ContainerResult<Value> {
        match method {
            "stop" => {
                self.record("stop");
                Ok(Value::Null)
            }
            "describe" => Ok(Value::String(self.id.clone())),
            "on_order_placed" | "onCacheFlushed" => {
                let payload = args.first().map(Value::to_display_string).unwrap_or_default();
                self.received
                    .lock()
                    .unwrap()
                    .push(format!("{}({})", method, payload));
                Ok(Value::Null)
            }
            other => Err(ContainerError::no_such_method("Worker", other)),
        }
    }

    fn invoke_mut(&mut self, method: &str, args: &[Value]) -> ContainerResult<Value> {
        match method {
            "start" => {
                self.record("start");
                Ok(Value::Null)
            }
            other => self.invoke(other, args),
        }
    }
}

/// 构造参数：`url`（或第 0 个）与 `pool_size`（或第 1 个）
#[derive(Default)]
pub struct Repository {
    pub url: String,
    pub pool_size: i64,
}

impl Bean for Repository {
    fn class_name(&self) -> &str {
        "Repository"
    }

    fn set_property(&mut self, name: &str, value: Value) -> ContainerResult<()> {
        match name {
            "url" => self.url = value.to_display_string(),
            "pool_size" => self.pool_size = value.as_i64().unwrap_or_default(),
            other => {
                return Err(ContainerError::invocation("Repository", format!("set {}", other), "unknown property"))
            }
        }
        Ok(())
    }
}

fn repository(args: Arguments) -> ContainerResult<Box<dyn Bean>> {
    Ok(Box::new(Repository {
        url: args.resolve("url", 0).map(Value::to_display_string).unwrap_or_default(),
        pool_size: args.resolve("pool_size", 1).and_then(Value::as_i64).unwrap_or(1),
    }))
}

/// 以 `open(url)` 生产 Repository 的工厂 Bean
#[derive(Default)]
pub struct ConnectionFactory;

impl Bean for ConnectionFactory {
    fn produce(&self, method: &str, args: Arguments) -> ContainerResult<Box<dyn Bean>> {
        match method {
            "open" => repository(args),
            other => Err(ContainerError::no_such_method("ConnectionFactory", other)),
        }
    }
}

pub fn registry() -> ClassRegistry {
    ClassRegistry::new()
        .with_class(ClassMetadata::new("Journal").with_constructor(|_| Ok(Box::new(Journal::default()))))
        .with_class(ClassMetadata::new("Worker").with_constructor(|_| Ok(Box::new(Worker::default()))))
        .with_class(
            ClassMetadata::new("Repository")
                .with_interface("Store")
                .with_constructor(repository)
                .with_static_factory("in_memory", |_| {
                    Ok(Box::new(Repository {
                        url: "memory".to_string(),
                        pool_size: 0,
                    }))
                }),
        )
        .with_class(
            ClassMetadata::new("CachingRepository")
                .with_parent("Repository")
                .with_constructor(repository),
        )
        .with_class(
            ClassMetadata::new("ConnectionFactory")
                .with_constructor(|_| Ok(Box::new(ConnectionFactory))),
        )
}

pub fn write_file(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
