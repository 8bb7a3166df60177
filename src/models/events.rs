use std::path::PathBuf;

use crate::models::message::ReceivedMessage;
use crate::models::peer::PeerKind;

/// 事件主题
///
/// Dispatcher 的注册键: 按对端类型细分的消息主题 + `Msg` 通配主题,
/// 外加登录生命周期与发送侧主题。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// 登录流程启动
    LoginStart,
    /// 从持久化cookie恢复会话成功(进入令牌交换)
    CookieResumed,
    /// 持久化cookie无法解析,已丢弃
    CookieInvalid,
    /// 二维码已签发并写入文件
    QrIssued,
    /// 二维码过期,即将重新签发
    QrExpired,
    /// cookie已过期,重走扫码路径
    CookieExpired,
    /// 登录成功
    LoginSuccess,
    /// 任意入站消息 (通配)
    Msg,
    /// 好友消息
    BuddyMsg,
    /// 群消息
    GroupMsg,
    /// 讨论组消息
    DiscuMsg,
    /// 一轮长轮询结束
    PollEnd,
    /// 会话断开
    Disconnect,
    /// 观察者处理出错
    HandlingError,
    /// 任意出站消息 (通配)
    SendMsg,
    /// 发送好友消息
    SendBuddyMsg,
    /// 发送群消息
    SendGroupMsg,
    /// 发送讨论组消息
    SendDiscuMsg,
}

impl EventKind {
    /// 入站消息的对端类型对应的主题
    pub fn msg_of(kind: PeerKind) -> EventKind {
        match kind {
            PeerKind::Buddy => EventKind::BuddyMsg,
            PeerKind::Group => EventKind::GroupMsg,
            PeerKind::Discu => EventKind::DiscuMsg,
        }
    }

    /// 出站消息的对端类型对应的主题
    pub fn send_of(kind: PeerKind) -> EventKind {
        match kind {
            PeerKind::Buddy => EventKind::SendBuddyMsg,
            PeerKind::Group => EventKind::SendGroupMsg,
            PeerKind::Discu => EventKind::SendDiscuMsg,
        }
    }
}

/// 核心暴露的可观察事件
#[derive(Debug, Clone)]
pub enum QQEvent {
    /// 登录流程启动
    LoginStart,
    /// 从cookie恢复,已提取中间令牌
    CookieResumed,
    /// cookie文本块无效,已丢弃
    CookieInvalid { reason: String },
    /// 二维码已写入文件
    QrIssued { path: PathBuf, bytes: usize },
    /// 二维码过期
    QrExpired,
    /// cookie过期 (令牌交换失败)
    CookieExpired,
    /// 登录成功,cookie已持久化到该路径
    LoginSuccess { cookie_path: PathBuf },
    /// 收到一条归一化消息,附原始轮询事件
    Message {
        msg: ReceivedMessage,
        raw: serde_json::Value,
    },
    /// 一轮轮询结束,附原始响应
    PollEnd { raw: serde_json::Value },
    /// 会话断开
    Disconnect { reason: String },
    /// 某个观察者处理事件时出错
    HandlingError { kind: EventKind, message: String },
    /// 即将发送一条消息,附完整信封
    SendInitiated {
        kind: PeerKind,
        envelope: serde_json::Value,
    },
}

impl QQEvent {
    /// 事件匹配的全部主题
    ///
    /// 消息类事件同时命中按类型细分的主题与通配主题,
    /// 顺序为先细分后通配。
    pub fn kinds(&self) -> Vec<EventKind> {
        match self {
            QQEvent::LoginStart => vec![EventKind::LoginStart],
            QQEvent::CookieResumed => vec![EventKind::CookieResumed],
            QQEvent::CookieInvalid { .. } => vec![EventKind::CookieInvalid],
            QQEvent::QrIssued { .. } => vec![EventKind::QrIssued],
            QQEvent::QrExpired => vec![EventKind::QrExpired],
            QQEvent::CookieExpired => vec![EventKind::CookieExpired],
            QQEvent::LoginSuccess { .. } => vec![EventKind::LoginSuccess],
            QQEvent::Message { msg, .. } => vec![EventKind::msg_of(msg.kind), EventKind::Msg],
            QQEvent::PollEnd { .. } => vec![EventKind::PollEnd],
            QQEvent::Disconnect { .. } => vec![EventKind::Disconnect],
            QQEvent::HandlingError { .. } => vec![EventKind::HandlingError],
            QQEvent::SendInitiated { kind, .. } => {
                vec![EventKind::send_of(*kind), EventKind::SendMsg]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_消息事件命中细分与通配主题() {
        let event = QQEvent::Message {
            msg: ReceivedMessage {
                kind: PeerKind::Group,
                id: 1,
                name: "n".to_string(),
                content: "c".to_string(),
                group_id: Some(2),
                group_name: Some("g".to_string()),
            },
            raw: serde_json::Value::Null,
        };
        assert_eq!(event.kinds(), vec![EventKind::GroupMsg, EventKind::Msg]);
    }

    #[test]
    fn test_生命周期事件单主题() {
        assert_eq!(QQEvent::LoginStart.kinds(), vec![EventKind::LoginStart]);
        assert_eq!(QQEvent::QrExpired.kinds(), vec![EventKind::QrExpired]);
    }
}
