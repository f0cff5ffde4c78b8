// arbor-core: 依赖注入 / 控制反转容器
//
// 提供：
// - 可组合的 Bean 定义提供者（注解扫描、声明式 YAML/TOML、编程式注册）
// - 单例和原型作用域、别名、父子定义、工厂 Bean 与静态工厂
// - 生命周期管道与内置 drivers（@Inject、@Resource、@Value、@Required、查找方法注入）
// - 属性占位符、事件分发、消息源、关闭时的 destroy 回调
// - 切面定义（代理织入由 arbor-aop 提供）

pub mod annotation;
pub mod aspect;
pub mod bean;
pub mod config;
pub mod constants;
pub mod container;
pub mod definition;
pub mod driver;
pub mod error;
pub mod evaluator;
pub mod lifecycle;
pub mod logging;
pub mod message;
pub mod options;
pub mod plugin;
pub mod provider;
pub mod reflection;
pub mod resource;
pub mod scope;
pub mod utils;
pub mod value;

// 重新导出常用类型
pub use annotation::{Annotation, AnnotationCollection};
pub use aspect::{AspectDefinition, AspectManager, AspectType, Invocation, PointcutDefinition};
pub use bean::{AsAny, Bean};
pub use crate::config::{
    ConfigValue, Environment, EnvironmentPropertySource, IniPropertySource, MapPropertySource,
    PropertySource, TomlPropertySource,
};
pub use container::{Container, ContainerBuilder, ContainerHandle, ShutdownHook};
pub use definition::{
    ArrayElement, BeanDefinition, ConstructorArgumentDefinition, MethodInjection,
    PropertyDefinition, ValueDefinition,
};
pub use error::{ContainerError, ContainerResult};
pub use evaluator::{ExpressionEvaluator, LiteralEvaluator};
pub use lifecycle::{
    AfterAssembleListener, AfterConfigListener, AfterCreateListener, AfterDefinitionListener,
    BeanLifecycleManager, BeforeAssembleListener, BeforeCreateListener, LifecycleListener,
};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use message::{BeanMessageSource, MessageSource, ResourceMessageSource};
pub use options::{ContainerOptions, DeclarativeOptions};
pub use provider::{AnnotationProvider, BeanDefinitionProvider, CoreProvider, DeclarativeProvider};
pub use reflection::{
    ClassMetadata, ClassMetadataProvider, ClassRegistry, MethodMetadata, PropertyMetadata,
};
pub use resource::{DefaultResourceLoader, FilesystemResource, Resource, ResourceLoader};
pub use scope::Scope;
pub use value::{Arguments, Literal, Value};

// 导出 inventory，供宏使用
pub use inventory;

// 导出插件相关
pub use plugin::{load_plugins, ContainerPlugin, PluginRegistry, PluginSubmission};

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::annotation::{Annotation, AnnotationCollection};
    pub use crate::aspect::{AspectType, Invocation};
    pub use crate::bean::Bean;
    pub use crate::config::{ConfigValue, Environment, PropertySource};
    pub use crate::container::{Container, ContainerBuilder, ContainerHandle};
    pub use crate::definition::{BeanDefinition, ConstructorArgumentDefinition, ValueDefinition};
    pub use crate::error::{ContainerError, ContainerResult};
    pub use crate::message::MessageSource;
    pub use crate::options::ContainerOptions;
    pub use crate::plugin::ContainerPlugin;
    pub use crate::provider::{AnnotationProvider, CoreProvider, DeclarativeProvider};
    pub use crate::reflection::{ClassMetadata, ClassRegistry, MethodMetadata, PropertyMetadata};
    pub use crate::scope::Scope;
    pub use crate::value::{Arguments, Value};
    pub use crate::utils;
}
