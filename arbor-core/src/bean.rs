use std::any::Any;
use std::sync::Arc;

use crate::aspect::Invocation;
use crate::container::ContainerHandle;
use crate::error::{ContainerError, ContainerResult};
use crate::message::MessageSource;
use crate::value::{Arguments, Value};

/// 类型擦除辅助 trait，为所有 `Any + Send + Sync` 类型自动实现
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Bean trait - 所有可以被容器管理的对象都需要实现此 trait
///
/// 容器不依赖运行时反射，而是通过这组对象安全的方法完成装配：
/// - `set_property`：属性注入（setter 注入）
/// - `set_container`：容器感知
/// - `set_message_source`：消息源感知
/// - `invoke` / `invoke_mut`：按名称调用方法（事件、init/destroy、切面代理）
/// - `produce`：作为工厂 Bean 生产其它 Bean
/// - `intercept`：作为切面拦截器处理一次方法调用
///
/// 所有方法都有默认实现，Bean 只需覆盖自己支持的部分。
pub trait Bean: AsAny {
    /// 类名，用于日志与错误信息
    fn class_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 注入属性
    fn set_property(&mut self, name: &str, _value: Value) -> ContainerResult<()> {
        Err(ContainerError::invocation(
            self.class_name(),
            format!("set {}", name),
            "unknown property",
        ))
    }

    /// 注入容器句柄，在属性装配之前调用
    fn set_container(&mut self, _container: ContainerHandle) {}

    /// 注入容器安装的消息源，在属性装配之后调用；容器没有消息源时不调用
    fn set_message_source(&mut self, _source: Arc<dyn MessageSource>) {}

    /// 调用方法
    fn invoke(&self, method: &str, _args: &[Value]) -> ContainerResult<Value> {
        Err(ContainerError::no_such_method(self.class_name(), method))
    }

    /// 在 Bean 被共享之前调用方法（init 回调），默认转发到 `invoke`
    fn invoke_mut(&mut self, method: &str, args: &[Value]) -> ContainerResult<Value> {
        self.invoke(method, args)
    }

    /// 工厂方法：由 `factory-bean` + `factory-method` 定义的 Bean 通过此方法生产
    fn produce(&self, method: &str, _args: Arguments) -> ContainerResult<Box<dyn Bean>> {
        Err(ContainerError::no_such_method(self.class_name(), method))
    }

    /// 拦截器入口：`entry` 是切点定义中的方法名
    fn intercept(&self, entry: &str, _invocation: &mut dyn Invocation) -> ContainerResult<Value> {
        Err(ContainerError::no_such_method(self.class_name(), entry))
    }

    /// 代理对象返回被包装的原始 Bean
    fn proxied_target(&self) -> Option<Arc<dyn Bean>> {
        None
    }
}

impl dyn Bean {
    pub fn is<T: Bean>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Bean>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Bean>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// 转换为具体类型，代理对象会转换其原始 Bean
    pub fn downcast_arc<T: Bean>(bean: Arc<dyn Bean>) -> Option<Arc<T>> {
        if bean.is::<T>() {
            return AsAny::into_any_arc(bean).downcast::<T>().ok();
        }
        bean.proxied_target()
            .and_then(|target| <dyn Bean>::downcast_arc::<T>(target))
    }
}
