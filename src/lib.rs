//! WebQQ协议客户端
//!
//! 纯协议实现的机器人客户端: 扫码/cookie两路登录、四级令牌链、
//! 花名册缓存与名称解析、长轮询接收、事件发布/订阅、三类对端的
//! 文本消息发送。
//!
//! 典型用法:
//!
//! ```no_run
//! use std::sync::Arc;
//! use qq_bot::{EventKind, QQ, QQConfig, QQEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let qq = Arc::new(QQ::new(QQConfig::from_env())?);
//!     qq.on(EventKind::Msg, |event| {
//!         if let QQEvent::Message { msg, .. } = event {
//!             println!("{}: {}", msg.name, msg.content);
//!         }
//!     });
//!     qq.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use client::QQ;
pub use config::QQConfig;
pub use models::{ApiError, EventKind, Font, PeerKind, QQEvent, ReceivedMessage};
pub use services::{Dispatcher, MsgHandler};
