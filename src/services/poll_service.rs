use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::QQConfig;
use crate::models::errors::ApiError;
use crate::models::events::QQEvent;
use crate::models::wire::{ApiResponse, PollMessage};
use crate::services::dispatcher::Dispatcher;
use crate::services::http_client::{HttpClient, HttpRequest};
use crate::services::message_agent::MessageAgent;
use crate::services::roster::Roster;
use crate::services::session::Session;
use crate::utils::urls;

/// 长轮询接受的状态码
///
/// 远端把"本轮无消息"表达为504,与200同为正常轮次。
const POLL_OK: &[u16] = &[200, 504];

/// 连续传输失败计数器
///
/// 失败累加,任意一次成功清零;只有"连续"超限才判定致命。
pub struct FailureGate {
    failures: u32,
    limit: u32,
}

impl FailureGate {
    pub fn new(limit: u32) -> Self {
        Self { failures: 0, limit }
    }

    /// 记一次失败,返回是否已超出容忍上限
    pub fn record_failure(&mut self) -> bool {
        self.failures += 1;
        self.failures > self.limit
    }

    /// 记一次成功,计数清零
    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// 一轮轮询响应的分类结果
#[derive(Debug)]
pub enum PollOutcome {
    /// retcode=0且带事件列表
    Messages(Vec<PollMessage>),
    /// 本轮无消息 (504空响应体,或retcode=0无result)
    Empty,
    /// retcode=103: 远端认为在线状态已陈旧,需重载在线列表
    RefreshOnline,
    /// retcode=121: 会话已被远端作废,必须断开重登
    Invalidated,
    /// 未收录的retcode,忽略本轮
    Unknown(i64),
}

/// 分类一轮轮询的JSON信封
///
/// 事件列表逐条解析,畸形条目跳过而不拖垮整轮。
pub fn classify(response: &ApiResponse) -> PollOutcome {
    match response.retcode {
        0 => match &response.result {
            Some(Value::Array(items)) => {
                let mut messages = Vec::with_capacity(items.len());
                for item in items {
                    match serde_json::from_value::<PollMessage>(item.clone()) {
                        Ok(msg) => messages.push(msg),
                        Err(e) => {
                            tracing::warn!(error = %e, "轮询事件条目无法解析,跳过")
                        }
                    }
                }
                if messages.is_empty() {
                    PollOutcome::Empty
                } else {
                    PollOutcome::Messages(messages)
                }
            }
            _ => PollOutcome::Empty,
        },
        103 => PollOutcome::RefreshOnline,
        121 => PollOutcome::Invalidated,
        other => PollOutcome::Unknown(other),
    }
}

/// 接收循环的退出方式
#[derive(Debug, PartialEq, Eq)]
pub enum PollExit {
    /// 操作者主动关停
    Shutdown,
    /// 会话失效或连续失败超限,调用方可重新登录
    Disconnected,
}

/// 长轮询接收循环
///
/// 串行执行: 一轮完整结束 (含消息投递) 才开始下一轮,
/// 保证消息按到达顺序投递。
pub struct PollService {
    client: Arc<HttpClient>,
    session: Arc<Session>,
    roster: Arc<Roster>,
    dispatcher: Arc<Dispatcher>,
    agent: MessageAgent,
    config: QQConfig,
}

impl PollService {
    pub fn new(
        client: Arc<HttpClient>,
        session: Arc<Session>,
        roster: Arc<Roster>,
        dispatcher: Arc<Dispatcher>,
        config: QQConfig,
    ) -> Self {
        let agent = MessageAgent::new(config.font.clone());
        Self {
            client,
            session,
            roster,
            dispatcher,
            agent,
            config,
        }
    }

    /// 驱动接收循环直到关停或断开
    pub async fn run(&self, cancel: &CancellationToken) -> PollExit {
        self.run_with(cancel, || self.poll_once()).await
    }

    /// 接收循环本体,轮询步骤由调用方注入
    async fn run_with<F, Fut>(&self, cancel: &CancellationToken, mut poll: F) -> PollExit
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ApiResponse, ApiError>>,
    {
        let mut gate = FailureGate::new(self.config.poll_fail_limit);
        tracing::info!("接收循环启动");

        loop {
            let cycle = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("接收循环收到关停信号");
                    return PollExit::Shutdown;
                }
                result = poll() => result,
            };

            match cycle {
                Ok(response) => {
                    gate.record_success();
                    if self.handle_response(response).await {
                        return PollExit::Disconnected;
                    }
                }
                Err(ApiError::NotAuthenticated) => {
                    // 认证态被并发撤销,重试无意义
                    self.session.mark_disconnected("接收循环发现会话未认证");
                    return PollExit::Disconnected;
                }
                Err(e) => {
                    let exceeded = gate.record_failure();
                    tracing::warn!(
                        consecutive = gate.failures(),
                        limit = self.config.poll_fail_limit,
                        error = %e,
                        "一轮长轮询失败"
                    );
                    if exceeded {
                        self.session.mark_disconnected("长轮询连续失败超出容忍上限");
                        return PollExit::Disconnected;
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => return PollExit::Shutdown,
                        _ = tokio::time::sleep(self.config.poll_retry_delay) => {}
                    }
                }
            }
        }
    }

    /// 发出一轮长轮询请求
    ///
    /// 请求会在远端挂起直到有消息或超时;504的空响应体按
    /// "本轮无消息"解析。
    async fn poll_once(&self) -> Result<ApiResponse, ApiError> {
        let tokens = self.session.require_auth()?;
        let payload = serde_json::json!({
            "ptwebqq": tokens.ptwebqq,
            "clientid": urls::CLIENT_ID,
            "psessionid": tokens.psessionid,
            "key": "",
        })
        .to_string();

        let (status, body) = self
            .client
            .post_form_raw(
                HttpRequest::new(urls::POLL2)
                    .referer(urls::D_REFERER)
                    .origin(urls::D_ORIGIN)
                    .accept(POLL_OK),
                &[("r", &payload)],
            )
            .await?;

        if body.trim().is_empty() {
            tracing::debug!(status, "本轮无消息");
            return Ok(ApiResponse {
                retcode: 0,
                result: None,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// 处理一轮成功到达的响应,返回会话是否已失效
    async fn handle_response(&self, response: ApiResponse) -> bool {
        let raw = serde_json::json!({
            "retcode": response.retcode,
            "result": response.result.clone(),
        });
        let mut invalidated = false;
        match classify(&response) {
            PollOutcome::Messages(messages) => {
                let self_uin = self.session.tokens().uin;
                for message in messages {
                    let raw_event = serde_json::to_value(&message).unwrap_or(Value::Null);
                    if let Some(msg) = self.agent.translate(&message, self_uin, &self.roster).await
                    {
                        tracing::info!(
                            kind = ?msg.kind,
                            from = %msg.name,
                            content = %msg.content,
                            "收到消息"
                        );
                        self.dispatcher.publish(&QQEvent::Message {
                            msg,
                            raw: raw_event,
                        });
                    }
                }
            }
            PollOutcome::Empty => {}
            PollOutcome::RefreshOnline => {
                tracing::info!("远端提示在线状态陈旧,重载在线列表");
                if let Err(e) = self.roster.load_online().await {
                    tracing::warn!(error = %e, "在线列表重载失败");
                }
            }
            PollOutcome::Invalidated => {
                self.session.mark_disconnected("会话已被远端作废 (retcode=121)");
                invalidated = true;
            }
            PollOutcome::Unknown(retcode) => {
                tracing::warn!(retcode, "未收录的轮询retcode,忽略本轮");
            }
        }
        self.dispatcher.publish(&QQEvent::PollEnd { raw });
        invalidated
    }
}
