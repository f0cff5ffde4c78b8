//! 切面代理

use std::sync::Arc;

use arbor_core::{Arguments, Bean, ContainerError, ContainerHandle, ContainerResult, Invocation, Value};

use crate::advisor::Advisor;
use crate::joinpoint::{Interceptor, MethodInvocation};

/// 包装原始 Bean 的代理
///
/// 方法调用先经过匹配的方法拦截器；目标方法（或某个拦截器）返回错误时，
/// 依次交给匹配的异常拦截器，第一个返回成功的拦截器的结果作为调用结果，
/// 全部失败时返回最后一个错误。
///
/// 拦截器 Bean 在每次调用时通过容器句柄查找，原型拦截器每次都是新实例。
pub struct AspectProxy {
    target: Arc<dyn Bean>,
    bean_name: String,
    class_name: String,
    advisors: Vec<Advisor>,
    container: ContainerHandle,
}

impl AspectProxy {
    pub fn new(
        target: Arc<dyn Bean>,
        bean_name: impl Into<String>,
        class_name: impl Into<String>,
        advisors: Vec<Advisor>,
        container: ContainerHandle,
    ) -> Self {
        Self {
            target,
            bean_name: bean_name.into(),
            class_name: class_name.into(),
            advisors,
            container,
        }
    }

    pub fn target(&self) -> &Arc<dyn Bean> {
        &self.target
    }

    pub fn bean_name(&self) -> &str {
        &self.bean_name
    }

    pub fn advisors(&self) -> &[Advisor] {
        &self.advisors
    }

    fn interceptors(
        &self,
        method: &str,
        applies: fn(&Advisor) -> bool,
    ) -> ContainerResult<Vec<Interceptor>> {
        self.advisors
            .iter()
            .filter(|advisor| applies(advisor) && advisor.matches(method))
            .map(|advisor| {
                tracing::trace!(
                    "{}::{}() matched pointcut '{}' ({})",
                    self.bean_name,
                    method,
                    advisor.pointcut.name(),
                    advisor.pointcut.expression()
                );
                let bean = self.container.get_bean(&advisor.interceptor)?;
                Ok(Interceptor::new(&advisor.aspect, bean, advisor.entry()))
            })
            .collect()
    }

    fn recover(
        &self,
        method: &str,
        arguments: Vec<Value>,
        mut error: ContainerError,
    ) -> ContainerResult<Value> {
        let handlers = self.interceptors(method, Advisor::is_exception)?;
        for handler in &handlers {
            tracing::debug!(
                "Bean '{}' {}() failed, trying exception aspect '{}'",
                self.bean_name,
                method,
                handler.aspect
            );
            let mut invocation =
                MethodInvocation::failed(self.target.as_ref(), method, arguments.clone(), error);
            match handler.bean.intercept(&handler.entry, &mut invocation) {
                Ok(value) => return Ok(value),
                Err(e) => error = e,
            }
        }
        Err(error)
    }
}

impl Bean for AspectProxy {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn invoke(&self, method: &str, args: &[Value]) -> ContainerResult<Value> {
        let chain = self.interceptors(method, Advisor::is_method)?;
        let mut invocation =
            MethodInvocation::new(self.target.as_ref(), method, args.to_vec(), &chain);
        match invocation.proceed() {
            Ok(value) => Ok(value),
            Err(error) => self.recover(method, invocation.into_arguments(), error),
        }
    }

    fn produce(&self, method: &str, args: Arguments) -> ContainerResult<Box<dyn Bean>> {
        self.target.produce(method, args)
    }

    fn intercept(&self, entry: &str, invocation: &mut dyn Invocation) -> ContainerResult<Value> {
        self.target.intercept(entry, invocation)
    }

    fn proxied_target(&self) -> Option<Arc<dyn Bean>> {
        Some(self.target.clone())
    }
}

impl std::fmt::Debug for AspectProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectProxy")
            .field("bean_name", &self.bean_name)
            .field("class_name", &self.class_name)
            .field("advisors", &self.advisors.len())
            .finish()
    }
}
