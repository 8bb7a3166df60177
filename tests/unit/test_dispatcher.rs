//! 事件分发的公开API测试

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use qq_bot::models::{EventKind, PeerKind, QQEvent, ReceivedMessage};
use qq_bot::services::{Dispatcher, MsgHandler};

fn message(kind: PeerKind) -> QQEvent {
    QQEvent::Message {
        msg: ReceivedMessage {
            kind,
            id: 1,
            name: "某人".to_string(),
            content: "hi".to_string(),
            group_id: None,
            group_name: None,
        },
        raw: serde_json::Value::Null,
    }
}

#[test]
fn test_细分主题先于通配主题() {
    let dispatcher = Dispatcher::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let o = Arc::clone(&order);
    dispatcher.subscribe(EventKind::Msg, move |_| {
        o.lock().unwrap().push("通配");
    });
    let o = Arc::clone(&order);
    dispatcher.subscribe(EventKind::GroupMsg, move |_| {
        o.lock().unwrap().push("细分");
    });

    dispatcher.publish(&message(PeerKind::Group));
    assert_eq!(*order.lock().unwrap(), vec!["细分", "通配"]);
}

#[test]
fn test_观察者内部可继续订阅() {
    let dispatcher = Arc::new(Dispatcher::new());
    let hits = Arc::new(AtomicU32::new(0));

    let d = Arc::clone(&dispatcher);
    let h = Arc::clone(&hits);
    dispatcher.subscribe(EventKind::Msg, move |_| {
        let h = Arc::clone(&h);
        // 快照式调用下,发布过程中订阅不会死锁
        d.subscribe(EventKind::PollEnd, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
    });

    dispatcher.publish(&message(PeerKind::Buddy));
    dispatcher.publish(&QQEvent::PollEnd {
        raw: serde_json::Value::Null,
    });
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_发送事件命中发送通配主题() {
    let dispatcher = Dispatcher::new();
    let hits = Arc::new(AtomicU32::new(0));

    let h = Arc::clone(&hits);
    dispatcher.subscribe(EventKind::SendMsg, move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });
    let h = Arc::clone(&hits);
    dispatcher.subscribe(EventKind::SendGroupMsg, move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });

    dispatcher.publish(&QQEvent::SendInitiated {
        kind: PeerKind::Group,
        envelope: serde_json::Value::Null,
    });
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_msg_handler_多类型过滤() {
    let dispatcher = Dispatcher::new();
    let hits = Arc::new(AtomicU32::new(0));

    let h = Arc::clone(&hits);
    MsgHandler::new(
        move |msg| {
            assert_ne!(msg.kind, PeerKind::Discu);
            h.fetch_add(1, Ordering::SeqCst);
        },
        &[PeerKind::Buddy, PeerKind::Group],
    )
    .register(&dispatcher);

    dispatcher.publish(&message(PeerKind::Buddy));
    dispatcher.publish(&message(PeerKind::Group));
    dispatcher.publish(&message(PeerKind::Discu));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
