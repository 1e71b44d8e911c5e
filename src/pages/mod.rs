//! # 页面对象层
//!
//! 每个页面对象持有会话句柄、导航头部和自身的定位器，通过组合复用行为，
//! 不存在公共基类，页面对象之间互不引用。
//!
//! ## 主要功能
//! - **首页**: 全局搜索、分类下拉菜单、页脚链接
//! - **汽车板块**: 搜索表单、结果页、详情页
//! - **房产板块**: 搜索表单、结果页、详情页
//! - **招聘板块**: 搜索表单就绪探测
//! - **加载等待**: `LoadWaiter` 为每个页面提供统一的加载状态等待
//!
//! ## 模块结构
//! - `home`: `HomePage`
//! - `motors`: `MotorsSearchPage` / `MotorsResultsPage` / `MotorsDetailPage`
//! - `property`: `PropertySearchPage` / `PropertyResultsPage` / `PropertyDetailPage`
//! - `jobs`: `JobsSearchPage`
//! - `detail`: 详情页元素校验
//! - `results`: 结果数量与房源编号解析

pub mod home;
pub mod motors;
pub mod property;
pub mod jobs;
pub mod detail;
pub mod results;

use crate::session::{LoadState, Session};
use crate::Result;

pub use detail::{validate_elements, ElementCheck, Presence, Validation};
pub use home::HomePage;
pub use jobs::JobsSearchPage;
pub use motors::{MotorsDetailPage, MotorsResultsPage, MotorsSearchPage};
pub use property::{PropertyDetailPage, PropertyResultsPage, PropertySearchPage};
pub use results::{parse_listing_id, parse_result_count};

/// Waits for the load state a page is considered ready at
#[derive(Debug, Clone)]
pub struct LoadWaiter {
    session: Session,
    state: LoadState,
}

impl LoadWaiter {
    pub fn new(session: Session, state: LoadState) -> Self {
        Self { session, state }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub async fn wait_for_load(&self) -> Result<()> {
        self.session.wait_for_load(self.state).await
    }
}
