use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use crate::models::events::{EventKind, QQEvent};
use crate::models::message::ReceivedMessage;
use crate::models::peer::PeerKind;

/// 事件观察者
pub type Handler = Arc<dyn Fn(&QQEvent) + Send + Sync>;

/// 类型化的发布/订阅注册表
///
/// 注册键为事件主题: 按对端类型细分的消息主题 + `Msg` 通配主题,
/// 以及登录生命周期主题。发布是同步的,按注册顺序依次调用;
/// 单个观察者的panic被就地捕获,通过 HandlingError 主题上报,
/// 不会中断其余观察者或接收循环。
pub struct Dispatcher {
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// 订阅一个主题
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&QQEvent) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().expect("注册表锁中毒");
        handlers.entry(kind).or_default().push(Arc::new(handler));
    }

    /// 发布一个事件
    ///
    /// 事件命中的每个主题下,观察者按注册顺序同步调用。
    pub fn publish(&self, event: &QQEvent) {
        for kind in event.kinds() {
            // 先快照再调用,观察者内部可以继续订阅而不死锁
            let snapshot: Vec<Handler> = {
                let handlers = self.handlers.read().expect("注册表锁中毒");
                handlers.get(&kind).cloned().unwrap_or_default()
            };
            for handler in snapshot {
                let outcome = catch_unwind(AssertUnwindSafe(|| handler(event)));
                if let Err(panic) = outcome {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "观察者panic".to_string());
                    tracing::error!(kind = ?kind, error = %message, "观察者处理事件失败");
                    // HandlingError 自身的观察者出错时只记日志,避免递归
                    if !matches!(event, QQEvent::HandlingError { .. }) {
                        self.publish(&QQEvent::HandlingError { kind, message });
                    }
                }
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 类型化回调约定
///
/// 构造时给定处理函数与接受的对端类型集合,注册后作为
/// `Msg` 通配主题之上的过滤适配器工作。
pub struct MsgHandler {
    handler: Arc<dyn Fn(&ReceivedMessage) + Send + Sync>,
    accept: Vec<PeerKind>,
}

impl MsgHandler {
    pub fn new<F>(handler: F, accept: &[PeerKind]) -> Self
    where
        F: Fn(&ReceivedMessage) + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            accept: accept.to_vec(),
        }
    }

    /// 注册到Dispatcher
    pub fn register(self, dispatcher: &Dispatcher) {
        let MsgHandler { handler, accept } = self;
        dispatcher.subscribe(EventKind::Msg, move |event| {
            if let QQEvent::Message { msg, .. } = event {
                if accept.contains(&msg.kind) {
                    handler(msg);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn buddy_msg(id: u64) -> QQEvent {
        QQEvent::Message {
            msg: ReceivedMessage {
                kind: PeerKind::Buddy,
                id,
                name: "某人".to_string(),
                content: "hi".to_string(),
                group_id: None,
                group_name: None,
            },
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_按注册顺序调用() {
        let dispatcher = Dispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            dispatcher.subscribe(EventKind::Msg, move |_| {
                order.lock().unwrap().push(tag);
            });
        }

        dispatcher.publish(&buddy_msg(1));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_消息同时命中细分与通配主题() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicU32::new(0));

        let h1 = Arc::clone(&hits);
        dispatcher.subscribe(EventKind::BuddyMsg, move |_| {
            h1.fetch_add(1, Ordering::SeqCst);
        });
        let h2 = Arc::clone(&hits);
        dispatcher.subscribe(EventKind::Msg, move |_| {
            h2.fetch_add(1, Ordering::SeqCst);
        });
        let h3 = Arc::clone(&hits);
        dispatcher.subscribe(EventKind::GroupMsg, move |_| {
            h3.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.publish(&buddy_msg(1));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_观察者panic被隔离并上报() {
        let dispatcher = Dispatcher::new();
        let survived = Arc::new(AtomicU32::new(0));
        let errors = Arc::new(AtomicU32::new(0));

        dispatcher.subscribe(EventKind::Msg, |_| panic!("观察者故障"));
        let s = Arc::clone(&survived);
        dispatcher.subscribe(EventKind::Msg, move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let e = Arc::clone(&errors);
        dispatcher.subscribe(EventKind::HandlingError, move |event| {
            if let QQEvent::HandlingError { message, .. } = event {
                assert!(message.contains("观察者故障"));
                e.fetch_add(1, Ordering::SeqCst);
            }
        });

        dispatcher.publish(&buddy_msg(1));
        // panic之后的观察者仍被调用
        assert_eq!(survived.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_msg_handler_按类型过滤() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicU32::new(0));

        let h = Arc::clone(&hits);
        MsgHandler::new(
            move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            },
            &[PeerKind::Group],
        )
        .register(&dispatcher);

        dispatcher.publish(&buddy_msg(1));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
