//! 消息源
//!
//! 消息按 bundle 组织，一个 bundle 对应一组属性文件：先找
//! `{bundle}_{locale}.properties`，找不到再回退到 `{bundle}.properties`。
//! 消息中的 `{0}`、`{1}` 按位置替换为参数。
//!
//! 名为 `messageSource` 的 Bean 在容器配置完成后被安装为容器的消息源，
//! 之后 `Container::get_message` 与 `Bean::set_message_source` 都使用它。

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean::Bean;
use crate::config::parse_ini;
use crate::constants::{DEFAULT_LOCALE, RESOURCE_MESSAGE_SOURCE_CLASS};
use crate::container::ContainerHandle;
use crate::error::{ContainerError, ContainerResult};
use crate::value::Value;

/// 消息源
pub trait MessageSource: Send + Sync {
    /// 查找消息，bundle 或 key 不存在时返回 None
    fn get_message(
        &self,
        bundle: &str,
        key: &str,
        args: &[Value],
        locale: &str,
    ) -> ContainerResult<Option<String>>;
}

/// 用参数替换 `{n}`，没有对应参数的占位符原样保留
pub fn format_message(template: &str, args: &[Value]) -> String {
    args.iter()
        .enumerate()
        .fold(template.to_string(), |message, (index, arg)| {
            message.replace(&format!("{{{}}}", index), &arg.to_display_string())
        })
}

/// 把任意 Bean 当作消息源
///
/// 调用约定：`get_message(bundle, key, [args...], locale)`，返回字符串或 Null。
/// 通过 `invoke` 调用，切面代理包装的消息源同样适用。
pub struct BeanMessageSource {
    bean: Arc<dyn Bean>,
}

impl BeanMessageSource {
    pub fn new(bean: Arc<dyn Bean>) -> Self {
        Self { bean }
    }
}

impl MessageSource for BeanMessageSource {
    fn get_message(
        &self,
        bundle: &str,
        key: &str,
        args: &[Value],
        locale: &str,
    ) -> ContainerResult<Option<String>> {
        let result = self.bean.invoke(
            "get_message",
            &[
                Value::from(bundle),
                Value::from(key),
                Value::Array(args.to_vec()),
                Value::from(locale),
            ],
        )?;
        Ok((!result.is_null()).then(|| result.to_display_string()))
    }
}

/// 从属性文件加载 bundle 的消息源，文件通过容器的 `ResourceLoader` 读取
///
/// 可选属性 `basedir` 是 bundle 文件所在的位置前缀。
#[derive(Default)]
pub struct ResourceMessageSource {
    basedir: String,
    container: Option<ContainerHandle>,
    bundles: RwLock<HashMap<String, Arc<HashMap<String, String>>>>,
}

impl ResourceMessageSource {
    pub fn new(basedir: impl Into<String>) -> Self {
        Self {
            basedir: basedir.into(),
            ..Self::default()
        }
    }

    fn location(&self, bundle: &str, locale: &str) -> String {
        let file = if locale.is_empty() || locale == DEFAULT_LOCALE {
            format!("{}.properties", bundle)
        } else {
            format!("{}_{}.properties", bundle, locale)
        };
        if self.basedir.is_empty() {
            file
        } else {
            format!("{}/{}", self.basedir.trim_end_matches('/'), file)
        }
    }

    fn load(&self, bundle: &str, locale: &str) -> ContainerResult<Option<Arc<HashMap<String, String>>>> {
        let location = self.location(bundle, locale);
        if let Some(messages) = self.bundles.read().get(&location) {
            return Ok(Some(Arc::clone(messages)));
        }
        let container = self
            .container
            .as_ref()
            .ok_or_else(|| {
                ContainerError::invocation(RESOURCE_MESSAGE_SOURCE_CLASS, "get_message", "no container attached")
            })?
            .container()?;
        let resource = container.get_resource(&location)?;
        if !resource.exists() {
            tracing::debug!("Message bundle {} not found", location);
            return Ok(None);
        }
        let messages: HashMap<String, String> = parse_ini(&resource.read_to_string()?)?
            .into_iter()
            .map(|(key, value)| (key, value.to_text()))
            .collect();
        tracing::debug!("Loaded {} messages from {}", messages.len(), location);
        let messages = Arc::new(messages);
        self.bundles.write().insert(location, Arc::clone(&messages));
        Ok(Some(messages))
    }
}

impl MessageSource for ResourceMessageSource {
    fn get_message(
        &self,
        bundle: &str,
        key: &str,
        args: &[Value],
        locale: &str,
    ) -> ContainerResult<Option<String>> {
        let mut locales = vec![locale];
        if locale != DEFAULT_LOCALE {
            locales.push(DEFAULT_LOCALE);
        }
        for locale in locales {
            let Some(messages) = self.load(bundle, locale)? else {
                continue;
            };
            if let Some(template) = messages.get(key) {
                return Ok(Some(format_message(template, args)));
            }
        }
        Ok(None)
    }
}

impl Bean for ResourceMessageSource {
    fn class_name(&self) -> &str {
        RESOURCE_MESSAGE_SOURCE_CLASS
    }

    fn set_property(&mut self, name: &str, value: Value) -> ContainerResult<()> {
        match name {
            "basedir" => self.basedir = value.to_display_string(),
            other => {
                return Err(ContainerError::invocation(
                    RESOURCE_MESSAGE_SOURCE_CLASS,
                    format!("set {}", other),
                    "unknown property",
                ))
            }
        }
        Ok(())
    }

    fn set_container(&mut self, container: ContainerHandle) {
        self.container = Some(container);
    }

    fn invoke(&self, method: &str, args: &[Value]) -> ContainerResult<Value> {
        match method {
            "get_message" => {
                let text = |index: usize| args.get(index).map(Value::to_display_string).unwrap_or_default();
                let arguments = args.get(2).and_then(Value::as_array).unwrap_or_default();
                let locale = args
                    .get(3)
                    .map(Value::to_display_string)
                    .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
                let message = MessageSource::get_message(self, &text(0), &text(1), arguments, &locale)?;
                Ok(message.map(Value::from).unwrap_or(Value::Null))
            }
            other => Err(ContainerError::no_such_method(RESOURCE_MESSAGE_SOURCE_CLASS, other)),
        }
    }
}
