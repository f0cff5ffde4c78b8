//! Arbor AOP - 面向切面编程支持
//!
//! 为声明了切面的 Bean 织入代理：
//! - 方法拦截：按切点正则匹配方法名，拦截器组成调用链
//! - 异常拦截：目标方法返回错误时执行，可以恢复或重试
//! - 通过 `AfterCreate` 监听器自动包装 Bean
//! - 通过插件机制自动注册

pub mod advisor;
pub mod bean_post_processor;
pub mod joinpoint;
pub mod plugin;
pub mod pointcut;
pub mod proxy;

// 重新导出核心类型
pub use advisor::Advisor;
pub use bean_post_processor::AopBeanPostProcessor;
pub use joinpoint::{Interceptor, MethodInvocation};
pub use plugin::AopPlugin;
pub use pointcut::CompiledPointcut;
pub use proxy::AspectProxy;

/// 预导入模块
pub mod prelude {
    pub use crate::advisor::Advisor;
    pub use crate::bean_post_processor::AopBeanPostProcessor;
    pub use crate::joinpoint::MethodInvocation;
    pub use crate::plugin::AopPlugin;
    pub use crate::proxy::AspectProxy;
    pub use arbor_core::{AspectType, Invocation};
}
