//! # 组件层
//!
//! 多个页面共享的界面片段。组件只持有会话句柄与定位器，不保存任何板块状态。
//!
//! ## 主要功能
//! - **导航头部**: 板块标签页与登录/注册链接
//! - **全局搜索**: 关键字搜索框
//! - **列表卡片**: 结果页的房源/车辆卡片集合，只关心数量与最后一项
//!
//! ## 模块结构
//! - `header`: `NavigationHeader`
//! - `search_bar`: `SearchBar`
//! - `listings`: `ListingCollection`

pub mod header;
pub mod search_bar;
pub mod listings;

pub use header::{AuthAction, NavigationHeader, Section};
pub use listings::{ListingCollection, LISTING_SELECTOR};
pub use search_bar::SearchBar;
