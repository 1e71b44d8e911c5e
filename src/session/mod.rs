//! # 会话层
//!
//! 为每个场景提供一个隔离的页面，以及建立在其上的惰性元素句柄。
//!
//! ## 主要功能
//! - **页面隔离**: 每个页面运行在独立的 browser context 中，不共享 cookie 与存储
//! - **惰性定位**: `ElementHandle` 只保存定位器，每次探测或操作都重新解析
//! - **有界等待**: 所有等待都以固定间隔轮询，超时后返回带定位器描述的错误
//! - **原子操作**: 解析、可操作性检查与点击/填写/选择在同一次求值中完成
//! - **加载状态**: load / DOMContentLoaded / network idle
//!
//! ## 核心概念
//! - **BrowserContext**: 页面的来源，每次创建互相隔离的页面
//! - **PageContext**: 单个页面，执行定位器查询
//! - **Session**: 场景持有的页面句柄，包含站点地址与等待预算
//!
//! ## 模块结构
//! - `traits`: 会话层的核心 trait 定义
//! - `browser`: 基于 CDP 的浏览器上下文实现
//! - `page`: 基于 CDP 的页面实现
//! - `element`: 惰性元素句柄
//! - `handle`: 场景会话句柄
//! - `mock`: 内存文档实现，用于测试
//!
//! ## 使用示例
//! ```rust,no_run
//! use chaser_probe::session::{BrowserContext, PageOptions, Session};
//! use chaser_probe::locator::{Locator, Role};
//! use chaser_probe::config::Timeouts;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(browser: Arc<dyn BrowserContext>) -> Result<(), Box<dyn std::error::Error>> {
//! let page = browser.new_page(PageOptions::default()).await?;
//! let session = Session::new(page, "https://www.trademe.co.nz", Timeouts::default(), Duration::ZERO)?;
//!
//! session.goto("/").await?;
//! session.locator(Locator::role(Role::Link).name_exact("Motors").first()).click().await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod browser;
pub mod page;
pub mod element;
pub mod handle;
pub mod mock;

#[cfg(test)]
pub mod tests;

pub use traits::{BrowserContext, LoadState, PageContext, PageOptions, WaitState};

// Re-export implementation structs
pub use browser::BrowserContextImpl;
pub use page::PageContextImpl;
pub use element::ElementHandle;
pub use handle::Session;

// Re-export mock implementations for testing
pub use mock::{MockBrowser, MockDocument, MockNode, MockPage, MockSite};
