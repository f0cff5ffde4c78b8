//! 注解名称与内置类名常量
//!
//! 注解名统一使用小写，与 `Annotation::new` 的规范化结果一致。

/// 把类声明为 Bean 的标记注解，按扫描顺序排列
pub const BEAN_MARKER_ANNOTATIONS: &[&str] = &[
    BEAN,
    COMPONENT,
    CONTROLLER,
    CONFIGURATION,
    ASPECT,
    NAMED,
];

pub const BEAN: &str = "bean";
pub const COMPONENT: &str = "component";
pub const CONTROLLER: &str = "controller";
pub const CONFIGURATION: &str = "configuration";
pub const ASPECT: &str = "aspect";
pub const NAMED: &str = "named";

pub const SCOPE: &str = "scope";
pub const SINGLETON: &str = "singleton";
pub const PROTOTYPE: &str = "prototype";
pub const PRIMARY: &str = "primary";
pub const INIT_METHOD: &str = "initmethod";
pub const DESTROY_METHOD: &str = "destroymethod";
pub const POST_CONSTRUCT: &str = "postconstruct";
pub const PRE_DESTROY: &str = "predestroy";
pub const LISTENS_ON: &str = "listenson";

pub const INJECT: &str = "inject";
pub const RESOURCE: &str = "resource";
pub const VALUE: &str = "value";
pub const REQUIRED: &str = "required";

pub const METHOD_INTERCEPTOR: &str = "methodinterceptor";
pub const EXCEPTION_INTERCEPTOR: &str = "exceptioninterceptor";

/// 内置类：查找方法注入的拦截器与资源消息源
pub const METHOD_INJECTION_ASPECT_CLASS: &str = "MethodInjectionAspect";
pub const RESOURCE_MESSAGE_SOURCE_CLASS: &str = "ResourceMessageSource";

/// 安装为容器消息源的 Bean 名称
pub const MESSAGE_SOURCE_BEAN: &str = "messageSource";
pub const DEFAULT_LOCALE: &str = "default";

/// `@Bean` 工厂方法既没有 `class=` 也没有返回类型时使用的类名
pub const DEFAULT_OBJECT_CLASS: &str = "Object";

/// 按类型注入时表示"注入所有候选"的类型后缀
pub const ARRAY_TYPE_SUFFIX: &str = "[]";
