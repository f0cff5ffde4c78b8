//! 连接点 - 一次被拦截的方法调用

use std::sync::Arc;

use arbor_core::{Bean, ContainerError, ContainerResult, Invocation, Value};

/// 调用链中的一个拦截器
#[derive(Clone)]
pub struct Interceptor {
    /// 所属切面名称，用于日志
    pub aspect: String,
    pub bean: Arc<dyn Bean>,
    /// 拦截器 Bean 上的入口方法
    pub entry: String,
}

impl Interceptor {
    pub fn new(aspect: impl Into<String>, bean: Arc<dyn Bean>, entry: impl Into<String>) -> Self {
        Self {
            aspect: aspect.into(),
            bean,
            entry: entry.into(),
        }
    }
}

/// 方法调用
///
/// 每次 `proceed` 把调用交给链上的下一个拦截器，链走完后调用目标对象。
/// 拦截器返回后位置会回退，所以同一个拦截器可以多次 `proceed`（例如重试）。
///
/// 异常拦截使用空链并携带目标方法的错误，此时 `proceed` 直接重新调用目标方法。
pub struct MethodInvocation<'a> {
    target: &'a dyn Bean,
    class: &'a str,
    method: &'a str,
    arguments: Vec<Value>,
    chain: &'a [Interceptor],
    position: usize,
    error: Option<ContainerError>,
}

impl<'a> MethodInvocation<'a> {
    pub fn new(
        target: &'a dyn Bean,
        method: &'a str,
        arguments: Vec<Value>,
        chain: &'a [Interceptor],
    ) -> Self {
        Self {
            target,
            class: target.class_name(),
            method,
            arguments,
            chain,
            position: 0,
            error: None,
        }
    }

    /// 异常拦截用的调用，`proceed` 会重试目标方法
    pub fn failed(
        target: &'a dyn Bean,
        method: &'a str,
        arguments: Vec<Value>,
        error: ContainerError,
    ) -> Self {
        Self {
            error: Some(error),
            ..Self::new(target, method, arguments, &[])
        }
    }

    /// 取出参数（拦截器可能已经改写）
    pub fn into_arguments(self) -> Vec<Value> {
        self.arguments
    }

    pub fn take_error(&mut self) -> Option<ContainerError> {
        self.error.take()
    }
}

impl Invocation for MethodInvocation<'_> {
    fn class_name(&self) -> &str {
        self.class
    }

    fn method_name(&self) -> &str {
        self.method
    }

    fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    fn set_arguments(&mut self, arguments: Vec<Value>) {
        self.arguments = arguments;
    }

    fn error(&self) -> Option<&ContainerError> {
        self.error.as_ref()
    }

    fn proceed(&mut self) -> ContainerResult<Value> {
        let chain = self.chain;
        let Some(interceptor) = chain.get(self.position) else {
            return self.target.invoke(self.method, &self.arguments);
        };
        tracing::trace!(
            "{}::{} -> aspect '{}' ({})",
            self.class,
            self.method,
            interceptor.aspect,
            interceptor.entry
        );
        self.position += 1;
        let result = interceptor.bean.intercept(&interceptor.entry, self);
        self.position -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Calculator;

    impl Bean for Calculator {
        fn class_name(&self) -> &str {
            "Calculator"
        }

        fn invoke(&self, method: &str, args: &[Value]) -> ContainerResult<Value> {
            match method {
                "add" => Ok(Value::from(args.iter().filter_map(Value::as_i64).sum::<i64>())),
                _ => Err(ContainerError::no_such_method("Calculator", method)),
            }
        }
    }

    /// 记录调用并把第一个参数加倍
    struct Doubler {
        seen: Mutex<Vec<String>>,
    }

    impl Bean for Doubler {
        fn intercept(&self, entry: &str, invocation: &mut dyn Invocation) -> ContainerResult<Value> {
            self.seen.lock().push(format!(
                "{}:{}::{}",
                entry,
                invocation.class_name(),
                invocation.method_name()
            ));
            let mut args = invocation.arguments().to_vec();
            if let Some(first) = args.first().and_then(Value::as_i64) {
                args[0] = Value::from(first * 2);
            }
            invocation.set_arguments(args);
            invocation.proceed()
        }
    }

    #[test]
    fn test_chain_reaches_target() {
        let doubler = Arc::new(Doubler {
            seen: Mutex::new(Vec::new()),
        });
        let chain = vec![
            Interceptor::new("first", doubler.clone(), "around"),
            Interceptor::new("second", doubler.clone(), "around"),
        ];
        let target = Calculator;
        let mut invocation =
            MethodInvocation::new(&target, "add", vec![Value::from(1), Value::from(10)], &chain);

        assert_eq!(invocation.proceed().unwrap(), Value::from(14));
        assert_eq!(invocation.arguments()[0], Value::from(4));
        assert_eq!(
            *doubler.seen.lock(),
            vec!["around:Calculator::add", "around:Calculator::add"]
        );
    }

    #[test]
    fn test_failed_invocation_retries_target() {
        let target = Calculator;
        let mut invocation = MethodInvocation::failed(
            &target,
            "add",
            vec![Value::from(2), Value::from(3)],
            ContainerError::invocation("Calculator", "add", "overflow"),
        );
        assert!(invocation.error().is_some());
        assert_eq!(invocation.proceed().unwrap(), Value::from(5));
        assert!(invocation.take_error().is_some());
        assert!(invocation.error().is_none());
    }
}
