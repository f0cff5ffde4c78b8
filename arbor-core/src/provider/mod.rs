//! Bean 定义提供者
//!
//! 容器把多个 provider 组合成一个命名空间：
//! - `get_bean_definition`：第一个返回定义的 provider 生效
//! - `get_beans_by_class` / `get_beans_listening_on`：合并所有 provider 的结果

mod annotation;
mod programmatic;
mod declarative;
mod document;

pub use self::annotation::AnnotationProvider;
pub use self::programmatic::CoreProvider;
pub use self::declarative::DeclarativeProvider;
pub use self::document::Node;

use std::collections::HashMap;

use crate::aspect::{AspectDefinition, AspectManager};
use crate::container::Container;
use crate::definition::BeanDefinition;
use crate::error::ContainerResult;
use crate::reflection::ClassMetadataProvider;

/// Bean 定义提供者
pub trait BeanDefinitionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// 容器构建时调用一次，可以在这里建立索引
    fn init(&self, _container: &Container) -> ContainerResult<()> {
        Ok(())
    }

    /// 按名称（规范名或别名）返回定义，未知名称返回 `None`
    fn get_bean_definition(
        &self,
        name: &str,
        container: &Container,
    ) -> ContainerResult<Option<BeanDefinition>>;

    /// 类、父类或接口为 `class` 的 Bean 名称
    fn get_beans_by_class(&self, class: &str) -> Vec<String>;

    /// 监听 `event` 的 Bean 名称
    fn get_beans_listening_on(&self, _event: &str) -> Vec<String> {
        Vec::new()
    }

    /// 全局切面；切点直接注册到 `manager`
    fn get_aspects(&self, _manager: &AspectManager) -> ContainerResult<Vec<AspectDefinition>> {
        Ok(Vec::new())
    }

    /// 该 provider 声明的所有规范名
    fn bean_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// 类名到 Bean 名称的索引，Bean 同时登记在父类与接口名下
#[derive(Debug, Default, Clone)]
pub(crate) struct ClassIndex {
    beans: HashMap<String, Vec<String>>,
}

impl ClassIndex {
    pub(crate) fn add(&mut self, metadata: &dyn ClassMetadataProvider, class: &str, bean: &str) {
        self.push(class, bean);
        for related in metadata.get_class_ancestors_and_interfaces(class) {
            self.push(&related, bean);
        }
    }

    fn push(&mut self, class: &str, bean: &str) {
        let beans = self.beans.entry(class.to_string()).or_default();
        if !beans.iter().any(|b| b == bean) {
            beans.push(bean.to_string());
        }
    }

    pub(crate) fn get(&self, class: &str) -> Vec<String> {
        self.beans.get(class).cloned().unwrap_or_default()
    }
}

/// 事件名到 Bean 名称的索引
#[derive(Debug, Default, Clone)]
pub(crate) struct EventIndex {
    listeners: HashMap<String, Vec<String>>,
}

impl EventIndex {
    /// 登记逗号分隔的事件列表
    pub(crate) fn add_csv(&mut self, events: &str, bean: &str) {
        for event in events.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let beans = self.listeners.entry(event.to_string()).or_default();
            if !beans.iter().any(|b| b == bean) {
                beans.push(bean.to_string());
            }
        }
    }

    pub(crate) fn get(&self, event: &str) -> Vec<String> {
        self.listeners.get(event).cloned().unwrap_or_default()
    }
}

/// 拆分逗号分隔的名称列表
pub(crate) fn split_csv(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{ClassMetadata, ClassRegistry};

    #[test]
    fn test_class_index_covers_hierarchy() {
        let registry = ClassRegistry::new()
            .with_class(ClassMetadata::new("Base").with_interface("Repository"))
            .with_class(ClassMetadata::new("SqlRepository").with_parent("Base"));
        let mut index = ClassIndex::default();
        index.add(&registry, "SqlRepository", "sql");
        index.add(&registry, "SqlRepository", "sql");

        assert_eq!(index.get("SqlRepository"), vec!["sql"]);
        assert_eq!(index.get("Base"), vec!["sql"]);
        assert_eq!(index.get("Repository"), vec!["sql"]);
        assert!(index.get("Other").is_empty());
    }

    #[test]
    fn test_event_index() {
        let mut index = EventIndex::default();
        index.add_csv("started, stopped,", "a");
        index.add_csv("started", "b");
        assert_eq!(index.get("started"), vec!["a", "b"]);
        assert_eq!(index.get("stopped"), vec!["a"]);
    }
}
