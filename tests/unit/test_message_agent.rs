//! 消息翻译与信封组装的公开API测试

use std::sync::Arc;

use qq_bot::models::wire::{PollMessage, PollValue};
use qq_bot::models::{Font, PeerKind};
use qq_bot::services::message_agent::{extract_text, join_text};
use qq_bot::services::{Dispatcher, HttpClient, MessageAgent, Roster, Session};
use qq_bot::QQConfig;
use serde_json::json;

fn empty_roster() -> Roster {
    let client = Arc::new(HttpClient::new().unwrap());
    let session = Arc::new(Session::new(
        Arc::clone(&client),
        QQConfig::default(),
        Arc::new(Dispatcher::new()),
    ));
    Roster::new(client, session)
}

fn buddy_event(from: u64, text: &str) -> PollMessage {
    PollMessage {
        poll_type: "message".to_string(),
        value: PollValue {
            from_uin: from,
            send_uin: None,
            content: vec![json!(["font", {"size": 10}]), json!(text)],
        },
    }
}

#[tokio::test]
async fn test_好友消息翻译_未知好友回退原始id() {
    let agent = MessageAgent::new(Font::default());
    let roster = empty_roster();

    let msg = agent
        .translate(&buddy_event(123, "你好"), 999, &roster)
        .await
        .unwrap();
    assert_eq!(msg.kind, PeerKind::Buddy);
    assert_eq!(msg.id, 123);
    assert_eq!(msg.name, "123");
    assert_eq!(msg.content, "你好");
    assert!(msg.group_id.is_none());
}

#[tokio::test]
async fn test_自己发出的消息回流不投递() {
    let agent = MessageAgent::new(Font::default());
    let roster = empty_roster();
    assert!(agent
        .translate(&buddy_event(999, "echo"), 999, &roster)
        .await
        .is_none());
}

#[tokio::test]
async fn test_群消息翻译_容器字段齐全() {
    let agent = MessageAgent::new(Font::default());
    let roster = empty_roster();

    let event = PollMessage {
        poll_type: "group_message".to_string(),
        value: PollValue {
            from_uin: 9000,
            send_uin: Some(42),
            content: vec![json!("大家好")],
        },
    };
    let msg = agent.translate(&event, 999, &roster).await.unwrap();
    assert_eq!(msg.kind, PeerKind::Group);
    assert_eq!(msg.id, 42);
    assert_eq!(msg.group_id, Some(9000));
    assert_eq!(msg.group_name.as_deref(), Some("9000"));
}

#[tokio::test]
async fn test_群消息缺发言者_丢弃() {
    let agent = MessageAgent::new(Font::default());
    let roster = empty_roster();

    let event = PollMessage {
        poll_type: "group_message".to_string(),
        value: PollValue {
            from_uin: 9000,
            send_uin: None,
            content: vec![json!("孤儿消息")],
        },
    };
    assert!(agent.translate(&event, 999, &roster).await.is_none());
}

#[tokio::test]
async fn test_未知事件类型_忽略() {
    let agent = MessageAgent::new(Font::default());
    let roster = empty_roster();

    let event = PollMessage {
        poll_type: "kick_message".to_string(),
        value: PollValue {
            from_uin: 1,
            send_uin: None,
            content: vec![],
        },
    };
    assert!(agent.translate(&event, 999, &roster).await.is_none());
}

#[test]
fn test_拼接丢弃结构化条目() {
    let content = vec![
        json!(["font", {"size": 10}]),
        json!("hello"),
        json!(["face", 14]),
        json!("world"),
    ];
    assert_eq!(join_text(&content), "hello world");
}

#[test]
fn test_信封往返_好友123() {
    let agent = MessageAgent::new(Font::default());
    let envelope = agent
        .build(PeerKind::Buddy, 123, "hi", 7, "PSESSION")
        .unwrap();

    assert_eq!(envelope["to"], 123);
    assert_eq!(envelope["face"], 537);
    assert_eq!(envelope["msg_id"], 7);
    assert_eq!(extract_text(&envelope).unwrap(), "hi");

    // content里带默认字体元数据
    let inner: Vec<serde_json::Value> =
        serde_json::from_str(envelope["content"].as_str().unwrap()).unwrap();
    assert_eq!(inner[1][0], "font");
    assert_eq!(inner[1][1]["name"], "宋体");
    assert_eq!(inner[1][1]["size"], 10);
}
