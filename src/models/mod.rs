//! 数据模型模块
//!
//! 包含所有核心数据结构:
//! - errors: 错误类型定义 (API、持久化状态错误)
//! - login_state: 登录状态机 (令牌链、状态迁移表、扫码流程)
//! - peer: 三种对端 (好友/群/讨论组) 及其详情块
//! - message: 归一化入站消息与出站字体元数据
//! - events: 可观察事件与事件主题
//! - wire: 远端响应的JSON形状

pub mod errors;
pub mod events;
pub mod login_state;
pub mod message;
pub mod peer;
pub mod wire;

// 重导出常用类型,简化外部引用
pub use errors::{ApiError, StoreError};
pub use events::{EventKind, QQEvent};
pub use login_state::{LoginState, QrAction, QrPollResult, QrScanFlow, Tokens};
pub use message::{Font, ReceivedMessage};
pub use peer::{Buddy, DiscuDetail, Discussion, Group, GroupDetail, PeerKind};
pub use wire::{ApiResponse, PollMessage};
