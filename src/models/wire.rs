use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::errors::ApiError;

/// 通用JSON信封
///
/// 除二维码图片与扫码状态外,远端所有响应都是 `{ retcode, result }`。
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub retcode: i64,
    #[serde(default)]
    pub result: Option<Value>,
}

impl ApiResponse {
    /// retcode为0时取出result,否则报InvalidResponse
    pub fn ok_result(&self) -> Result<&Value, ApiError> {
        if self.retcode != 0 {
            return Err(ApiError::InvalidResponse(format!(
                "retcode={}",
                self.retcode
            )));
        }
        self.result
            .as_ref()
            .ok_or_else(|| ApiError::InvalidResponse("缺少result字段".to_string()))
    }

    /// 将result反序列化为目标类型
    pub fn result_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let value = self.ok_result()?;
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// getvfwebqq 的 result
#[derive(Debug, Deserialize)]
pub struct VfwebqqResult {
    pub vfwebqq: String,
}

/// login2 的 result
#[derive(Debug, Deserialize)]
pub struct Login2Result {
    pub uin: u64,
    pub psessionid: String,
}

/// get_self_info2 的 result (仅保留渲染消息所需字段)
#[derive(Debug, Clone, Deserialize)]
pub struct SelfInfo {
    pub uin: u64,
    pub nick: String,
}

/// get_user_friends2 的 result
#[derive(Debug, Deserialize)]
pub struct FriendsResult {
    /// 昵称表
    #[serde(default)]
    pub info: Vec<UinNick>,
    /// 备注名表
    #[serde(default)]
    pub marknames: Vec<MarkName>,
}

/// (uin, nick) 二元组,好友昵称/群成员/讨论组成员共用
#[derive(Debug, Clone, Deserialize)]
pub struct UinNick {
    pub uin: u64,
    pub nick: String,
}

/// 好友备注名
#[derive(Debug, Deserialize)]
pub struct MarkName {
    pub uin: u64,
    pub markname: String,
}

/// get_group_name_list_mask2 的 result
#[derive(Debug, Deserialize)]
pub struct GroupListResult {
    #[serde(default)]
    pub gnamelist: Vec<GroupEntry>,
}

/// 群名单条目
#[derive(Debug, Deserialize)]
pub struct GroupEntry {
    pub gid: u64,
    pub code: u64,
    pub name: String,
}

/// get_discus_list 的 result
#[derive(Debug, Deserialize)]
pub struct DiscuListResult {
    #[serde(default)]
    pub dnamelist: Vec<DiscuEntry>,
}

/// 讨论组名单条目
#[derive(Debug, Deserialize)]
pub struct DiscuEntry {
    pub did: u64,
    pub name: String,
}

/// get_group_info_ext2 的 result
#[derive(Debug, Deserialize)]
pub struct GroupDetailResult {
    /// 成员昵称表
    #[serde(default)]
    pub minfo: Vec<UinNick>,
    /// 成员群名片表
    #[serde(default)]
    pub cards: Vec<GroupCard>,
}

/// 群名片条目
#[derive(Debug, Deserialize)]
pub struct GroupCard {
    pub muin: u64,
    pub card: String,
}

/// get_discu_info 的 result
#[derive(Debug, Deserialize)]
pub struct DiscuDetailResult {
    #[serde(default)]
    pub mem_info: Vec<UinNick>,
}

/// get_online_buddies2 的 result 条目
#[derive(Debug, Clone, Deserialize)]
pub struct OnlineBuddy {
    pub uin: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub client_type: i64,
}

/// poll2 result 列表中的单条事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollMessage {
    pub poll_type: String,
    pub value: PollValue,
}

/// 轮询事件载荷
///
/// 单聊时 from_uin 即发言者;群/讨论组消息中 from_uin 是容器,
/// send_uin 才是发言者。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollValue {
    pub from_uin: u64,
    #[serde(default)]
    pub send_uin: Option<u64>,
    #[serde(default)]
    pub content: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_信封_成功取result() {
        let resp: ApiResponse =
            serde_json::from_value(json!({"retcode": 0, "result": {"vfwebqq": "abc"}})).unwrap();
        let vf: VfwebqqResult = resp.result_as().unwrap();
        assert_eq!(vf.vfwebqq, "abc");
    }

    #[test]
    fn test_信封_非零retcode报错() {
        let resp: ApiResponse = serde_json::from_value(json!({"retcode": 103})).unwrap();
        assert!(matches!(
            resp.ok_result(),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_轮询事件反序列化() {
        let raw = json!({
            "poll_type": "group_message",
            "value": {
                "from_uin": 99,
                "send_uin": 42,
                "content": [["font", {"size": 10}], "hello", "world"]
            }
        });
        let msg: PollMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.poll_type, "group_message");
        assert_eq!(msg.value.from_uin, 99);
        assert_eq!(msg.value.send_uin, Some(42));
        assert_eq!(msg.value.content.len(), 3);
    }
}
