use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::QQConfig;
use crate::models::errors::ApiError;
use crate::models::events::{EventKind, QQEvent};
use crate::models::peer::PeerKind;
use crate::services::dispatcher::{Dispatcher, MsgHandler};
use crate::services::http_client::{HttpClient, HttpRequest};
use crate::services::message_agent::MessageAgent;
use crate::services::poll_service::{PollExit, PollService};
use crate::services::roster::Roster;
use crate::services::session::Session;
use crate::utils::urls;

/// 客户端门面
///
/// 组装传输层、会话、花名册与接收循环,对外只暴露
/// 订阅、发送与运行三类入口。
pub struct QQ {
    client: Arc<HttpClient>,
    session: Arc<Session>,
    roster: Arc<Roster>,
    dispatcher: Arc<Dispatcher>,
    agent: MessageAgent,
    config: QQConfig,
    cancel: CancellationToken,
}

impl QQ {
    pub fn new(config: QQConfig) -> Result<Self, ApiError> {
        let client = Arc::new(HttpClient::new()?);
        let dispatcher = Arc::new(Dispatcher::new());
        let session = Arc::new(Session::new(
            Arc::clone(&client),
            config.clone(),
            Arc::clone(&dispatcher),
        ));
        let roster = Arc::new(Roster::new(Arc::clone(&client), Arc::clone(&session)));
        let agent = MessageAgent::new(config.font.clone());
        Ok(Self {
            client,
            session,
            roster,
            dispatcher,
            agent,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// 订阅一个事件主题
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&QQEvent) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(kind, handler);
    }

    /// 注册一个类型化的消息回调
    pub fn on_msg(&self, handler: MsgHandler) {
        handler.register(&self.dispatcher);
    }

    /// 批量注册类型化的消息回调
    pub fn handlers(&self, handlers: Vec<MsgHandler>) {
        for handler in handlers {
            handler.register(&self.dispatcher);
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn config(&self) -> &QQConfig {
        &self.config
    }

    /// 请求关停,run会在当前轮次结束后返回
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// 驱动完整生命周期: 登录 → 填充花名册 → 接收循环
    ///
    /// 会话断开 (远端作废或连续失败超限) 后自动重新登录;
    /// 只有操作者关停或登录本身失败才返回。
    pub async fn run(&self) -> Result<(), ApiError> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            self.session.login().await?;
            self.roster.init().await?;

            let refresh_cancel = self.cancel.child_token();
            let refresh_task = tokio::spawn(refresh_loop(
                Arc::clone(&self.roster),
                self.config.roster_refresh_interval,
                refresh_cancel.clone(),
            ));

            let poller = PollService::new(
                Arc::clone(&self.client),
                Arc::clone(&self.session),
                Arc::clone(&self.roster),
                Arc::clone(&self.dispatcher),
                self.config.clone(),
            );
            let exit = poller.run(&self.cancel).await;

            refresh_cancel.cancel();
            let _ = refresh_task.await;

            match exit {
                PollExit::Shutdown => return Ok(()),
                PollExit::Disconnected => {
                    tracing::warn!("会话断开,重新登录");
                }
            }
        }
    }

    /// 发送好友消息
    pub async fn send_buddy_msg(&self, uin: u64, text: &str) -> Result<(), ApiError> {
        self.send_inner(PeerKind::Buddy, uin, text).await
    }

    /// 发送群消息 (按gid)
    pub async fn send_group_msg(&self, gid: u64, text: &str) -> Result<(), ApiError> {
        self.send_inner(PeerKind::Group, gid, text).await
    }

    /// 发送讨论组消息
    pub async fn send_discu_msg(&self, did: u64, text: &str) -> Result<(), ApiError> {
        self.send_inner(PeerKind::Discu, did, text).await
    }

    async fn send_inner(&self, kind: PeerKind, id: u64, text: &str) -> Result<(), ApiError> {
        let tokens = self.session.require_auth()?;
        let msg_id = self.session.next_msg_id();
        let envelope = self
            .agent
            .build(kind, id, text, msg_id, &tokens.psessionid)?;

        self.dispatcher.publish(&QQEvent::SendInitiated {
            kind,
            envelope: envelope.clone(),
        });

        let url = match kind {
            PeerKind::Buddy => urls::SEND_BUDDY_MSG,
            PeerKind::Group => urls::SEND_GROUP_MSG,
            PeerKind::Discu => urls::SEND_DISCU_MSG,
        };
        // 发送接口的请求体是信封JSON本身,不走表单字段
        let response = self
            .client
            .post_body(
                HttpRequest::new(url)
                    .referer(urls::D_REFERER)
                    .origin(urls::D_ORIGIN),
                envelope.to_string(),
            )
            .await?;

        // 发送接口的retcode与实际送达不对应,只记录不判错
        tracing::info!(kind = ?kind, id, msg_id, retcode = response.retcode, "消息已提交");
        Ok(())
    }
}

/// 花名册定时刷新
///
/// 刷新在定时器回调内同步等待完成,慢轮次只会推迟下一轮,
/// 不会与自身重叠。
async fn refresh_loop(roster: Arc<Roster>, every: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval的首个tick立即完成,跳过
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(e) = roster.refresh().await {
                    tracing::warn!(error = %e, "花名册定时刷新失败");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::ReceivedMessage;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_门面订阅转发到注册表() {
        let qq = QQ::new(QQConfig::default()).unwrap();
        let hits = Arc::new(AtomicU32::new(0));

        let h = Arc::clone(&hits);
        qq.on(EventKind::BuddyMsg, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        qq.dispatcher.publish(&QQEvent::Message {
            msg: ReceivedMessage {
                kind: PeerKind::Buddy,
                id: 1,
                name: "某人".to_string(),
                content: "hi".to_string(),
                group_id: None,
                group_name: None,
            },
            raw: serde_json::Value::Null,
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_未认证时发送快速失败() {
        let qq = QQ::new(QQConfig::default()).unwrap();
        let result = qq.send_buddy_msg(123, "hi").await;
        assert!(matches!(result, Err(ApiError::NotAuthenticated)));
    }
}
