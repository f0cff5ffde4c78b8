use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use arbor_aop::AspectProxy;
use arbor_core::prelude::*;
use arbor_core::{register_class, DefaultResourceLoader, LoggingConfig};

// ==================== 业务对象 ====================

/// 内存订单仓库
#[derive(Default)]
struct InMemoryOrderRepository {
    orders: Mutex<Vec<String>>,
}

impl Bean for InMemoryOrderRepository {
    fn class_name(&self) -> &str {
        "InMemoryOrderRepository"
    }

    fn invoke(&self, method: &str, args: &[Value]) -> ContainerResult<Value> {
        let mut orders = self
            .orders
            .lock()
            .map_err(|_| ContainerError::invocation(self.class_name(), method, "lock poisoned"))?;
        match method {
            "save" => {
                orders.push(args.first().map(Value::to_display_string).unwrap_or_default());
                Ok(Value::from(orders.len() as i64))
            }
            "count" => Ok(Value::from(orders.len() as i64)),
            other => Err(ContainerError::no_such_method(self.class_name(), other)),
        }
    }
}

/// 订单服务 - 通过注解装配
#[derive(Default)]
struct OrderService {
    region: String,
    repository: Option<Arc<dyn Bean>>,
    started: bool,
}

impl OrderService {
    fn repository(&self) -> ContainerResult<&Arc<dyn Bean>> {
        self.repository
            .as_ref()
            .ok_or_else(|| ContainerError::invocation("OrderService", "repository", "not injected"))
    }
}

impl Bean for OrderService {
    fn class_name(&self) -> &str {
        "OrderService"
    }

    fn set_property(&mut self, name: &str, value: Value) -> ContainerResult<()> {
        match name {
            "region" => self.region = value.to_display_string(),
            "repository" => self.repository = value.as_bean().cloned(),
            other => {
                return Err(ContainerError::invocation(
                    "OrderService",
                    format!("set {}", other),
                    "unknown property",
                ))
            }
        }
        Ok(())
    }

    fn invoke_mut(&mut self, method: &str, args: &[Value]) -> ContainerResult<Value> {
        match method {
            "start" => {
                self.started = true;
                println!("🎉 OrderService ready for region {}", self.region);
                Ok(Value::Null)
            }
            other => self.invoke(other, args),
        }
    }

    fn invoke(&self, method: &str, args: &[Value]) -> ContainerResult<Value> {
        match method {
            "place" => {
                let item = args.first().map(Value::to_display_string).unwrap_or_default();
                if !self.started {
                    return Err(ContainerError::invocation("OrderService", method, "not started"));
                }
                if item.is_empty() {
                    return Err(ContainerError::invocation("OrderService", method, "empty order"));
                }
                self.repository()?.invoke("save", &[Value::from(item)])
            }
            "on_order_placed" => {
                let total = self.repository()?.invoke("count", &[])?;
                let order = args.first().map(Value::to_display_string).unwrap_or_default();
                println!(
                    "📦 [{}] order #{} placed ({} total)",
                    self.region,
                    order,
                    total.to_display_string()
                );
                Ok(Value::Null)
            }
            "stop" => {
                println!("👋 OrderService shutting down");
                Ok(Value::Null)
            }
            other => Err(ContainerError::no_such_method("OrderService", other)),
        }
    }
}

/// 通知 - 原型 Bean，每次查找都是新实例
#[derive(Default)]
struct Notification {
    sender: String,
    subject: String,
}

impl Bean for Notification {
    fn class_name(&self) -> &str {
        "Notification"
    }

    fn set_property(&mut self, name: &str, value: Value) -> ContainerResult<()> {
        match name {
            "sender" => self.sender = value.to_display_string(),
            "subject" => self.subject = value.to_display_string(),
            other => {
                return Err(ContainerError::invocation(
                    "Notification",
                    format!("set {}", other),
                    "unknown property",
                ))
            }
        }
        Ok(())
    }
}

/// 发送通知，`create_notification` 由查找方法注入提供
#[derive(Default)]
struct Mailer;

impl Bean for Mailer {
    fn class_name(&self) -> &str {
        "Mailer"
    }

    fn invoke(&self, method: &str, args: &[Value]) -> ContainerResult<Value> {
        match method {
            "send" => {
                let to = args.first().map(Value::to_display_string).unwrap_or_default();
                Ok(Value::from(format!("sent to {}", to)))
            }
            "close" => {
                println!("📪 Mailer closed");
                Ok(Value::Null)
            }
            other => Err(ContainerError::no_such_method("Mailer", other)),
        }
    }
}

/// 审计切面：记录 `place` / `send` 调用，吞掉 `place` 的错误
#[derive(Default)]
struct AuditAspect;

impl Bean for AuditAspect {
    fn class_name(&self) -> &str {
        "AuditAspect"
    }

    fn intercept(&self, entry: &str, invocation: &mut dyn Invocation) -> ContainerResult<Value> {
        match entry {
            "around" => {
                tracing::info!(
                    "audit: {}::{}({:?})",
                    invocation.class_name(),
                    invocation.method_name(),
                    invocation.arguments()
                );
                invocation.proceed()
            }
            "on_error" => {
                if let Some(error) = invocation.error() {
                    tracing::warn!("audit: {} rejected: {}", invocation.method_name(), error);
                }
                Ok(Value::Null)
            }
            other => Err(ContainerError::no_such_method("AuditAspect", other)),
        }
    }
}

// ==================== 类元数据 ====================

register_class!(|| ClassMetadata::new("InMemoryOrderRepository")
    .with_interface("OrderRepository")
    .with_annotation(Annotation::new("Component").with_option("name", "orderRepository"))
    .with_constructor(|_| Ok(Box::new(InMemoryOrderRepository::default()))));

register_class!(|| ClassMetadata::new("OrderService")
    .with_annotation(Annotation::new("Component"))
    .with_annotation(Annotation::new("ListensOn").with_option("value", "order_placed"))
    .with_property(
        PropertyMetadata::new("repository")
            .with_type("OrderRepository")
            .with_annotation(Annotation::new("Inject")),
    )
    .with_property(
        PropertyMetadata::new("region")
            .with_annotation(Annotation::new("Value").with_option("value", "${app.region}")),
    )
    .with_method(MethodMetadata::new("start").with_annotation(Annotation::new("PostConstruct")))
    .with_method(MethodMetadata::new("stop").with_annotation(Annotation::new("PreDestroy")))
    .with_constructor(|_| Ok(Box::new(OrderService::default()))));

register_class!(|| ClassMetadata::new("AuditAspect")
    .with_annotation(Annotation::new("Aspect"))
    .with_method(
        MethodMetadata::new("around").with_annotation(
            Annotation::new("MethodInterceptor")
                .with_option("expression", "^place$")
                .with_option("class-expression", "^OrderService$"),
        ),
    )
    .with_method(
        MethodMetadata::new("on_error").with_annotation(
            Annotation::new("ExceptionInterceptor")
                .with_option("expression", "^place$")
                .with_option("class-expression", "^OrderService$"),
        ),
    )
    .with_constructor(|_| Ok(Box::new(AuditAspect))));

register_class!(|| ClassMetadata::new("Notification")
    .with_constructor(|_| Ok(Box::new(Notification::default()))));

register_class!(|| ClassMetadata::new("Mailer").with_constructor(|_| Ok(Box::new(Mailer))));

// ==================== 启动 ====================

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

fn main() -> anyhow::Result<()> {
    let config_dir = config_dir();
    let mut options = ContainerOptions::from_file(config_dir.join("app.toml"))?
        .with_declarative_directory(&config_dir);
    // 环境变量优先于配置文件
    if std::env::var("RUST_LOG").is_ok() {
        options.logging = Some(LoggingConfig::from_env());
    }

    let container = Container::builder()
        .with_options(options)
        .with_provider(Arc::new(AnnotationProvider::new()))
        .with_resource_loader(Arc::new(DefaultResourceLoader::with_base_dir(&config_dir)))
        .with_standard_drivers()
        .with_discovered_plugins()
        .build()?;

    println!("\n╔════════════════════════════════════════════════════╗");
    println!(
        "║  {}",
        container
            .get_property("app.name")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    );
    println!("╚════════════════════════════════════════════════════╝\n");
    println!("Beans: {}", container.bean_names().join(", "));

    let orders = container.get_bean("orderService")?;
    println!("OrderService proxied: {}", orders.is::<AspectProxy>());
    for item in ["book", "", "lamp"] {
        let result = orders.invoke("place", &[Value::from(item)])?;
        if !result.is_null() {
            container.event_dispatch("order_placed", result)?;
        }
    }

    for locale in ["default", "es"] {
        let message = container.get_message(
            "orders",
            "order.placed",
            &[Value::from(1), Value::from("eu-west")],
            locale,
        )?;
        println!("🌐 [{}] {}", locale, message.unwrap_or_default());
    }

    let mailer = container.get_bean("mailer")?;
    for _ in 0..2 {
        let notification = mailer.invoke("create_notification", &[])?;
        let notification = notification.expect_bean::<Notification>("notification")?;
        println!("✉️  {} <{}>", notification.subject, notification.sender);
    }
    println!("{}", mailer.invoke("send", &[Value::from("customer@example.com")])?);

    container.shutdown()?;
    Ok(())
}
