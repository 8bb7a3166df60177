use serde_json::{json, Value};

use crate::models::errors::ApiError;
use crate::models::message::{Font, ReceivedMessage};
use crate::models::peer::PeerKind;
use crate::models::wire::PollMessage;
use crate::services::roster::Roster;
use crate::utils::urls;

/// 出站信封的固定face值
const FACE: u64 = 537;

/// 消息译员
///
/// 入站方向: 把原始轮询事件翻译为归一化消息,名称经花名册解析;
/// 出站方向: 把 (对端, 文本) 组装成远端要求的完整信封。
pub struct MessageAgent {
    font: Font,
}

impl MessageAgent {
    pub fn new(font: Font) -> Self {
        Self { font }
    }

    /// 翻译一条入站轮询事件
    ///
    /// 返回None的情形: 未知的poll_type、群/讨论组事件缺少发言者、
    /// 发言者是操作者本人 (自己发出的消息回流,不投递)。
    pub async fn translate(
        &self,
        raw: &PollMessage,
        self_uin: u64,
        roster: &Roster,
    ) -> Option<ReceivedMessage> {
        let content = join_text(&raw.value.content);
        match raw.poll_type.as_str() {
            "message" => {
                let sender = raw.value.from_uin;
                if sender == self_uin {
                    return None;
                }
                let name = roster.resolve_buddy_name(sender).await;
                Some(ReceivedMessage {
                    kind: PeerKind::Buddy,
                    id: sender,
                    name,
                    content,
                    group_id: None,
                    group_name: None,
                })
            }
            "group_message" => {
                let gid = raw.value.from_uin;
                let Some(sender) = raw.value.send_uin else {
                    tracing::warn!(gid, "群消息缺少发言者字段,丢弃");
                    return None;
                };
                if sender == self_uin {
                    return None;
                }
                let name = roster.resolve_member_in_group(sender, gid).await;
                let group_name = roster.resolve_group_name(gid).await;
                Some(ReceivedMessage {
                    kind: PeerKind::Group,
                    id: sender,
                    name,
                    content,
                    group_id: Some(gid),
                    group_name: Some(group_name),
                })
            }
            "discu_message" => {
                let did = raw.value.from_uin;
                let Some(sender) = raw.value.send_uin else {
                    tracing::warn!(did, "讨论组消息缺少发言者字段,丢弃");
                    return None;
                };
                if sender == self_uin {
                    return None;
                }
                let name = roster.resolve_member_in_discu(sender, did).await;
                let group_name = roster.resolve_discu_name(did).await;
                Some(ReceivedMessage {
                    kind: PeerKind::Discu,
                    id: sender,
                    name,
                    content,
                    group_id: Some(did),
                    group_name: Some(group_name),
                })
            }
            other => {
                tracing::warn!(poll_type = other, "未知的轮询事件类型,忽略");
                None
            }
        }
    }

    /// 组装一封出站信封
    ///
    /// content字段是二次编码的JSON字符串: `[文本, ["font", 字体]]`。
    /// 收件人键按对端类型取 to / group_uin / did。
    pub fn build(
        &self,
        kind: PeerKind,
        id: u64,
        text: &str,
        msg_id: u64,
        psessionid: &str,
    ) -> Result<Value, ApiError> {
        let font = json!({
            "name": self.font.name,
            "size": self.font.size,
            "style": self.font.style,
            "color": self.font.color,
        });
        let content = serde_json::to_string(&json!([text, ["font", font]]))?;

        let recipient_key = match kind {
            PeerKind::Buddy => "to",
            PeerKind::Group => "group_uin",
            PeerKind::Discu => "did",
        };
        Ok(json!({
            recipient_key: id,
            "content": content,
            "face": FACE,
            "clientid": urls::CLIENT_ID,
            "msg_id": msg_id,
            "psessionid": psessionid,
        }))
    }
}

/// 拼接轮询事件的content数组
///
/// 只保留字符串条目,空格连接;字体元数据等结构化条目丢弃。
pub fn join_text(content: &[Value]) -> String {
    content
        .iter()
        .filter_map(|item| item.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// 从出站信封中取回纯文本 (content字段的反向解码)
pub fn extract_text(envelope: &Value) -> Option<String> {
    let encoded = envelope.get("content")?.as_str()?;
    let parts: Vec<Value> = serde_json::from_str(encoded).ok()?;
    parts.first()?.as_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> MessageAgent {
        MessageAgent::new(Font::default())
    }

    #[test]
    fn test_拼接只保留文本条目() {
        let content = vec![json!(["font", {"size": 10}]), json!("你好"), json!("世界")];
        assert_eq!(join_text(&content), "你好 世界");
        assert_eq!(join_text(&[]), "");
    }

    #[test]
    fn test_信封_content二次编码可还原() {
        let envelope = agent()
            .build(PeerKind::Buddy, 123, "hi there", 42, "SESSION")
            .unwrap();
        assert_eq!(envelope["to"], 123);
        assert_eq!(envelope["face"], 537);
        assert_eq!(envelope["clientid"], urls::CLIENT_ID);
        assert_eq!(envelope["msg_id"], 42);
        assert_eq!(envelope["psessionid"], "SESSION");
        // content是字符串而非数组
        assert!(envelope["content"].is_string());
        assert_eq!(extract_text(&envelope).unwrap(), "hi there");
    }

    #[test]
    fn test_信封_收件人键随对端类型变化() {
        let a = agent();
        let group = a.build(PeerKind::Group, 9000, "x", 1, "S").unwrap();
        assert_eq!(group["group_uin"], 9000);
        assert!(group.get("to").is_none());

        let discu = a.build(PeerKind::Discu, 7000, "x", 2, "S").unwrap();
        assert_eq!(discu["did"], 7000);
    }
}
