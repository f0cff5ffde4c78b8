//! 通知器：一个切面与一个切点的组合

use arbor_core::{AspectDefinition, AspectManager, AspectType, ContainerResult};

use crate::pointcut::CompiledPointcut;

/// 切面中的一个切点，连同拦截器 Bean 与类型
#[derive(Debug, Clone)]
pub struct Advisor {
    pub aspect: String,
    pub kind: AspectType,
    /// 拦截器 Bean 名称
    pub interceptor: String,
    pub pointcut: CompiledPointcut,
}

impl Advisor {
    /// 展开切面定义，每个切点生成一个通知器，保持切面与切点的声明顺序
    pub fn from_definitions(
        aspects: &[AspectDefinition],
        manager: &AspectManager,
    ) -> ContainerResult<Vec<Advisor>> {
        let mut advisors = Vec::new();
        for aspect in aspects {
            for name in &aspect.pointcuts {
                let pointcut = manager.require_pointcut(name)?;
                advisors.push(Advisor {
                    aspect: aspect.name.clone(),
                    kind: aspect.kind,
                    interceptor: aspect.bean_name.clone(),
                    pointcut: CompiledPointcut::compile(&pointcut)?,
                });
            }
        }
        Ok(advisors)
    }

    pub fn entry(&self) -> &str {
        self.pointcut.entry()
    }

    pub fn matches(&self, method: &str) -> bool {
        self.pointcut.matches(method)
    }

    pub fn is_method(&self) -> bool {
        self.kind == AspectType::Method
    }

    pub fn is_exception(&self) -> bool {
        self.kind == AspectType::Exception
    }
}
