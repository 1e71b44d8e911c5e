//! # Chrome DevTools Protocol (CDP) 层
//!
//! 提供 Chrome/Chromium 浏览器的 WebSocket 通信接口，是页面对象层唯一的浏览器驱动。
//!
//! ## 主要功能
//! - **WebSocket 连接管理**: 建立和维护与浏览器的 CDP WebSocket 连接
//! - **协议通信**: 发送 CDP 命令并接收响应
//! - **隔离目标**: 每个场景在独立的 browser context 中创建页面
//! - **脚本执行**: 在页面上下文中执行定位器解析脚本
//! - **输入与截图**: 键盘事件、视口设置、失败截图
//!
//! ## 模块结构
//! - `traits`: CDP 操作的核心 trait 定义
//! - `types`: CDP 协议相关的数据类型
//! - `connection`: WebSocket 连接实现
//! - `client`: CDP 客户端实现
//! - `browser`: 浏览器级别的操作
//! - `mock`: 用于测试的 Mock 实现
//!
//! ## 使用示例
//! ```rust,no_run
//! use chaser_probe::cdp::{CdpBrowser, CdpBrowserImpl};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let browser = CdpBrowserImpl::new("http://localhost:9222");
//! let target = browser.create_isolated_target("about:blank").await?;
//! let client = browser.create_client(&target).await?;
//!
//! client.navigate("https://www.trademe.co.nz/").await?;
//! browser.dispose_target(&target).await?;
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod types;
pub mod connection;
pub mod client;
pub mod browser;
pub mod mock;

#[cfg(test)]
pub mod tests;

pub use traits::{
    CdpConnection, CdpClient, CdpBrowser, CdpResponse, CdpError,
    NavigationResult, EvaluationResult, BrowserVersion, TargetHandle,
};

// Re-export implementation structs
pub use connection::CdpWebSocketConnection;
pub use client::CdpClientImpl;
pub use browser::CdpBrowserImpl;

// Re-export mock for development/testing
pub use mock::{MockCdpConnection, MockCdpBrowser};
