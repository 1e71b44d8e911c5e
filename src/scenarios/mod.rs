//! # 场景目录
//!
//! 场景主体只通过 `PageBundle` 中的页面对象与组件操作页面，不直接访问文档。
//! 每个场景带有分类标签，供运行器筛选与报告使用。
//!
//! ## 主要功能
//! - **首页冒烟**: 首页标题校验
//! - **健康检查**: 首页核心元素、全局搜索、各板块标签页、分类菜单、页脚与登录链接
//! - **汽车回归**: 按固定筛选条件搜索车辆并打开最后一页的最后一条
//! - **房产回归**: 按卧室数量逐一生成场景，流程同上
//!
//! ## 模块结构
//! - `home`: TC-HOME-001
//! - `sanity`: TC-SAN-001 至 TC-SAN-008
//! - `motors`: TC-MOTORS-001 与 `MotorsSearch`
//! - `property`: TC-PROP-001 与 `PropertySearch`

pub mod home;
pub mod sanity;
pub mod motors;
pub mod property;

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::data::FixtureData;
use crate::diagnostics::Diagnostics;
use crate::fixture::{PageBundle, Provisioner};
use crate::scenario::{Outcome, ScenarioInfo, ScenarioReport};
use crate::{Error, Result};

pub use motors::MotorsSearch;
pub use property::PropertySearch;

type ScenarioBody = Arc<dyn Fn(PageBundle, Diagnostics) -> BoxFuture<'static, Result<Outcome>> + Send + Sync>;

/// A named, tagged scenario body
#[derive(Clone)]
pub struct Scenario {
    pub info: ScenarioInfo,
    body: ScenarioBody,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario").field("info", &self.info).finish()
    }
}

impl Scenario {
    pub fn new<S, F, Fut>(name: S, tags: &[&str], body: F) -> Self
    where
        S: Into<String>,
        F: Fn(PageBundle, Diagnostics) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome>> + Send + 'static,
    {
        Self {
            info: ScenarioInfo::new(name, tags),
            body: Arc::new(move |bundle, diagnostics| body(bundle, diagnostics).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Every requested tag present, and the name contains `grep` when given
    pub fn matches(&self, tags: &[String], grep: Option<&str>) -> bool {
        let tagged = tags.iter().all(|tag| self.info.has_tag(tag));
        let named = grep
            .map(|g| self.info.name.to_lowercase().contains(&g.to_lowercase()))
            .unwrap_or(true);
        tagged && named
    }

    pub async fn run(&self, provisioner: &Provisioner) -> ScenarioReport {
        let body = Arc::clone(&self.body);
        provisioner.run(&self.info, move |bundle, diagnostics| body(bundle, diagnostics)).await
    }
}

/// Fail with an assertion error unless `condition` holds
pub(crate) fn ensure(condition: bool, what: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::assertion(format!("expected {}", what)))
    }
}

/// Every scenario, in catalogue order
pub fn catalogue(data: &FixtureData) -> Vec<Scenario> {
    let mut scenarios = vec![home::title_scenario()];
    scenarios.extend(sanity::scenarios());
    scenarios.push(motors::scenario(data.motors.clone()));
    scenarios.extend(property::scenarios(&data.property));
    scenarios
}
