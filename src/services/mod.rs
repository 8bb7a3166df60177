//! 服务层
//!
//! - http_client: 传输层 (定制请求头、手工cookie罐、重定向开关)
//! - cookie_store: cookie文本块的持久化
//! - session: 登录状态机与令牌链
//! - roster: 花名册缓存与名称解析
//! - message_agent: 入站翻译与出站信封组装
//! - poll_service: 长轮询接收循环
//! - dispatcher: 事件发布/订阅

pub mod cookie_store;
pub mod dispatcher;
pub mod http_client;
pub mod message_agent;
pub mod poll_service;
pub mod roster;
pub mod session;

pub use cookie_store::CookieStore;
pub use dispatcher::{Dispatcher, MsgHandler};
pub use http_client::{HttpClient, HttpRequest};
pub use message_agent::MessageAgent;
pub use poll_service::{FailureGate, PollExit, PollService};
pub use roster::{NameCache, NameKey, Roster};
pub use session::Session;
