use serde::{Deserialize, Serialize};

use crate::models::peer::PeerKind;

/// 归一化后的入站消息
///
/// 每条轮询事件构造一次,由 Dispatcher 同步消费,不做保留。
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedMessage {
    /// 对端类型
    pub kind: PeerKind,
    /// 发言者账号
    pub id: u64,
    /// 发言者显示名 (已解析)
    pub name: String,
    /// 文本内容 (非文本条目已丢弃,空格连接)
    pub content: String,
    /// 容器标识 (仅群/讨论组消息)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
    /// 容器显示名 (仅群/讨论组消息)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

/// 出站消息的字体元数据
///
/// 随消息信封一起发送的展示属性。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Font {
    pub name: String,
    pub size: u32,
    /// 粗体/斜体/下划线三元组
    pub style: [u8; 3],
    /// RGB十六进制色值
    pub color: String,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "宋体".to_string(),
            size: 10,
            style: [0, 0, 0],
            color: "000000".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_默认字体() {
        let font = Font::default();
        assert_eq!(font.name, "宋体");
        assert_eq!(font.size, 10);
        assert_eq!(font.style, [0, 0, 0]);
        assert_eq!(font.color, "000000");
    }

    #[test]
    fn test_入站消息序列化_单聊无容器字段() {
        let msg = ReceivedMessage {
            kind: PeerKind::Buddy,
            id: 123,
            name: "某人".to_string(),
            content: "hi".to_string(),
            group_id: None,
            group_name: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "buddy");
        assert!(json.get("group_id").is_none());
    }
}
