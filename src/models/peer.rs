use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 对端类型
///
/// 协议支持三种对端: 好友(单聊)、群、讨论组。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerKind {
    /// 好友
    Buddy,
    /// 群 (gid用于发送,code用于查询详情)
    Group,
    /// 讨论组
    Discu,
}

/// 好友
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buddy {
    /// 账号标识
    pub uin: u64,
    /// 网络昵称
    pub nick: String,
    /// 操作者设置的备注名,优先于昵称
    pub markname: Option<String>,
}

impl Buddy {
    /// 显示名: 备注名优先,其次昵称
    pub fn display_name(&self) -> &str {
        self.markname.as_deref().unwrap_or(&self.nick)
    }
}

/// 群
///
/// gid 与 code 是两个不同的数字标识: 发消息用 gid,查详情用 code。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub gid: u64,
    pub code: u64,
    pub name: String,
    /// 懒加载的详情块,首次需要成员名时才拉取
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<GroupDetail>,
}

/// 群详情
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupDetail {
    /// 成员昵称 (uin -> nick)
    pub nicks: HashMap<u64, String>,
    /// 成员群名片 (uin -> card),优先于昵称
    pub cards: HashMap<u64, String>,
}

impl GroupDetail {
    /// 成员显示名: 群名片优先,其次昵称
    pub fn member_name(&self, uin: u64) -> Option<&str> {
        self.cards
            .get(&uin)
            .or_else(|| self.nicks.get(&uin))
            .map(|s| s.as_str())
    }
}

/// 讨论组
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discussion {
    pub did: u64,
    pub name: String,
    /// 懒加载的成员列表
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<DiscuDetail>,
}

/// 讨论组详情
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscuDetail {
    /// 成员昵称 (uin -> nick)
    pub nicks: HashMap<u64, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_好友显示名_备注优先() {
        let buddy = Buddy {
            uin: 123,
            nick: "昵称".to_string(),
            markname: Some("备注".to_string()),
        };
        assert_eq!(buddy.display_name(), "备注");
    }

    #[test]
    fn test_好友显示名_无备注用昵称() {
        let buddy = Buddy {
            uin: 123,
            nick: "昵称".to_string(),
            markname: None,
        };
        assert_eq!(buddy.display_name(), "昵称");
    }

    #[test]
    fn test_群成员名_名片优先() {
        let mut detail = GroupDetail::default();
        detail.nicks.insert(1, "nick".to_string());
        detail.cards.insert(1, "card".to_string());
        assert_eq!(detail.member_name(1), Some("card"));
        detail.cards.remove(&1);
        assert_eq!(detail.member_name(1), Some("nick"));
        assert_eq!(detail.member_name(2), None);
    }
}
