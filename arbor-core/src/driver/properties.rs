use crate::config::{parse_ini, TomlPropertySource};
use crate::container::Container;
use crate::error::{ContainerError, ContainerResult};
use crate::lifecycle::AfterConfigListener;

/// 容器构建完成后加载属性文件，并注册为容器属性
///
/// `.toml` 文件按 TOML 解析（嵌套表展开为点分隔的键），其它文件按 `key=value` 解析。
pub struct PropertiesDriver {
    locations: Vec<String>,
}

impl PropertiesDriver {
    pub fn new<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locations: locations.into_iter().map(Into::into).collect(),
        }
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }
}

impl AfterConfigListener for PropertiesDriver {
    fn name(&self) -> &str {
        "PropertiesDriver"
    }

    fn order(&self) -> i32 {
        0
    }

    fn after_config(&self, container: &Container) -> ContainerResult<()> {
        for location in &self.locations {
            let location = location.trim();
            let resource = container.get_resource(location)?;
            if !resource.exists() {
                return Err(ContainerError::configuration(format!(
                    "Properties file not found: {}",
                    resource.get_url()
                )));
            }
            let content = resource.read_to_string()?;
            let filename = resource.get_filename();
            let properties = if filename.ends_with(".toml") {
                TomlPropertySource::parse(&content, filename)?.into_properties()
            } else {
                parse_ini(&content)?
            };
            tracing::debug!("Loaded {} properties from {}", properties.len(), location);
            container.register_properties(properties);
        }
        Ok(())
    }
}
