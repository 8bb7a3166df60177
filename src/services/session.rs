use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::QQConfig;
use crate::models::errors::ApiError;
use crate::models::events::QQEvent;
use crate::models::login_state::{
    invalid_transition, LoginState, QrAction, QrPollResult, QrScanFlow, Tokens,
};
use crate::models::wire::{Login2Result, VfwebqqResult};
use crate::services::cookie_store::CookieStore;
use crate::services::dispatcher::Dispatcher;
use crate::services::http_client::{HttpClient, HttpRequest};
use crate::utils::{codec, urls};

/// ptqrlogin 脚本体中的单引号字段
static QUOTED_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"'[^,]*'").expect("正则语法错误"));

/// 会话
///
/// 持有令牌链与登录状态机,是三项共享可变状态的唯一属主:
/// - 令牌链 (uin/ptwebqq/vfwebqq/psessionid)
/// - 登录状态
/// - 出站消息的单调序号
///
/// 登录流程通过异步互斥门串行化,同一会话不会并发执行两次登录。
pub struct Session {
    client: Arc<HttpClient>,
    store: CookieStore,
    dispatcher: Arc<Dispatcher>,
    config: QQConfig,
    tokens: Mutex<Tokens>,
    state: Mutex<LoginState>,
    /// 出站消息序号,以进程启动时刻为种子
    msg_id: AtomicU64,
    /// 登录串行化门
    login_gate: tokio::sync::Mutex<()>,
}

impl Session {
    pub fn new(client: Arc<HttpClient>, config: QQConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let seed = (Utc::now().timestamp_millis() % 100_000_000) as u64;
        Self {
            store: CookieStore::new(config.cookie_path.clone()),
            client,
            dispatcher,
            config,
            tokens: Mutex::new(Tokens::default()),
            state: Mutex::new(LoginState::Idle),
            msg_id: AtomicU64::new(seed),
            login_gate: tokio::sync::Mutex::new(()),
        }
    }

    // ------------------------------------------------------------------
    // 状态访问
    // ------------------------------------------------------------------

    pub fn state(&self) -> LoginState {
        *self.state.lock().expect("状态锁中毒")
    }

    pub fn tokens(&self) -> Tokens {
        self.tokens.lock().expect("令牌锁中毒").clone()
    }

    /// 认证后才允许的调用先经过这里,未就绪时快速失败
    pub fn require_auth(&self) -> Result<Tokens, ApiError> {
        if self.state() != LoginState::Authenticated {
            return Err(ApiError::NotAuthenticated);
        }
        let tokens = self.tokens();
        if tokens.psessionid.is_empty() {
            return Err(ApiError::NotAuthenticated);
        }
        Ok(tokens)
    }

    /// 下一个出站消息序号,严格递增
    pub fn next_msg_id(&self) -> u64 {
        self.msg_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 状态迁移,迁移表之外的请求一律拒绝
    ///
    /// 迁入 Authenticated 额外要求令牌链完整。
    fn advance(&self, next: LoginState) -> Result<(), ApiError> {
        let mut state = self.state.lock().expect("状态锁中毒");
        if !state.can_transition(next) {
            return Err(invalid_transition(*state, next));
        }
        if next == LoginState::Authenticated && !self.tokens.lock().expect("令牌锁中毒").is_complete()
        {
            return Err(ApiError::NotAuthenticated);
        }
        tracing::debug!(from = ?*state, to = ?next, "登录状态迁移");
        *state = next;
        Ok(())
    }

    fn emit(&self, event: QQEvent) {
        self.dispatcher.publish(&event);
    }

    /// 由接收循环在会话被远端作废或失败超限时调用
    pub fn mark_disconnected(&self, reason: &str) {
        if let Err(e) = self.advance(LoginState::Disconnected) {
            tracing::warn!(error = %e, "断开时状态迁移失败");
        }
        self.emit(QQEvent::Disconnect {
            reason: reason.to_string(),
        });
    }

    // ------------------------------------------------------------------
    // 登录流程
    // ------------------------------------------------------------------

    /// 登录
    ///
    /// 两条路径: 持久化cookie自动恢复,失败则交互式扫码握手。
    /// 整个流程在串行化门内执行,步骤2-5严格顺序依赖。
    pub async fn login(&self) -> Result<(), ApiError> {
        let _gate = self.login_gate.lock().await;

        if self.state() == LoginState::Disconnected {
            self.advance(LoginState::Idle)?;
        }
        self.emit(QQEvent::LoginStart);
        tracing::info!("(0/5) 开始登录");

        if self.try_resume().await? {
            return Ok(());
        }
        self.qr_login().await
    }

    /// cookie恢复路径
    ///
    /// 返回 true 表示已完成认证;false 表示需要走扫码路径。
    async fn try_resume(&self) -> Result<bool, ApiError> {
        let Some(blob) = self.store.load().await else {
            return Ok(false);
        };
        self.advance(LoginState::ResumingFromCookie)?;

        let parsed = self.client.load_cookie_string(&blob);
        let ptwebqq = self.client.cookie("ptwebqq");
        let Some(ptwebqq) = ptwebqq.filter(|_| parsed > 0) else {
            tracing::warn!("cookie文本块无法解析,按全新登录处理");
            self.emit(QQEvent::CookieInvalid {
                reason: "文本块缺少ptwebqq".to_string(),
            });
            self.store.remove().await;
            self.client.clear_cookies();
            return Ok(false);
        };

        self.tokens.lock().expect("令牌锁中毒").ptwebqq = ptwebqq;
        self.emit(QQEvent::CookieResumed);
        tracing::info!("从持久化cookie恢复,跳过扫码");

        self.advance(LoginState::ExchangingTokens)?;
        match self.exchange_and_finalize().await {
            Ok(()) => Ok(true),
            Err(ApiError::StaleCredential(reason)) => {
                tracing::warn!(reason = %reason, "cookie已过期,重走扫码路径");
                self.emit(QQEvent::CookieExpired);
                self.store.remove().await;
                self.client.clear_cookies();
                *self.tokens.lock().expect("令牌锁中毒") = Tokens::default();
                self.advance(LoginState::CookieExpiredRetry)?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// 扫码路径: 签发 -> 轮询 -> 302捕获 -> 令牌交换
    async fn qr_login(&self) -> Result<(), ApiError> {
        let redirect_url = self.qr_phase().await?;
        self.advance(LoginState::ExchangingTokens)?;
        self.capture_redirect(&redirect_url).await?;
        self.exchange_and_finalize().await
    }

    /// 扫码阶段,过期时重新签发,确认后返回重定向URL
    async fn qr_phase(&self) -> Result<String, ApiError> {
        let mut flow = QrScanFlow::new();
        loop {
            self.advance(LoginState::AwaitingQrIssue)?;
            self.issue_qr().await?;
            flow.on_issue();
            self.advance(LoginState::AwaitingQrScan)?;

            let qrsig = self.client.cookie("qrsig").ok_or_else(|| {
                ApiError::InvalidResponse("二维码响应未写入qrsig".to_string())
            })?;
            let poll_url = urls::ptqrlogin(codec::ptqr_token(&qrsig));

            loop {
                let result = self.poll_qr_once(&poll_url).await?;
                match flow.on_poll(&result) {
                    QrAction::Wait => {
                        tokio::time::sleep(self.config.qr_poll_interval).await;
                    }
                    QrAction::Reissue => {
                        tracing::info!(issues = flow.issues(), "二维码已过期,重新签发");
                        self.emit(QQEvent::QrExpired);
                        break;
                    }
                    QrAction::Proceed(url) => {
                        tracing::info!("(2/5) 二维码扫描完成");
                        return Ok(url);
                    }
                }
            }
        }
    }

    /// 签发二维码: 种入随机跟踪值,预热握手页,下载图片并落盘
    async fn issue_qr(&self) -> Result<(), ApiError> {
        let pgv_info = format!("ssid=s{}", codec::rand_pgv());
        let pgv_pvid = codec::rand_pgv();
        self.client
            .set_cookies(&[("pgv_info", &pgv_info), ("pgv_pvid", &pgv_pvid)]);
        self.client
            .get_text(HttpRequest::new(urls::LOGIN_PREPARE))
            .await?;

        let qr_url = urls::qrcode();
        let bytes = self.client.get_bytes(HttpRequest::new(&qr_url)).await?;
        tokio::fs::write(&self.config.qrcode_path, &bytes)
            .await
            .map_err(|e| ApiError::QrWriteFailed(e.to_string()))?;

        tracing::info!(
            path = %self.config.qrcode_path.display(),
            bytes = bytes.len(),
            "(1/5) 二维码下载完成,等待扫描"
        );
        self.emit(QQEvent::QrIssued {
            path: self.config.qrcode_path.clone(),
            bytes: bytes.len(),
        });
        Ok(())
    }

    /// 单次扫码状态轮询
    async fn poll_qr_once(&self, poll_url: &str) -> Result<QrPollResult, ApiError> {
        let body = self
            .client
            .get_text(HttpRequest::new(poll_url).referer(urls::PTQRLOGIN_REFERER))
            .await?;
        tracing::debug!(body = %body, "扫码状态响应");
        parse_qr_poll_body(&body)
    }

    /// 302捕获: 请求重定向目标,仅接受302,从cookie罐提取ptwebqq
    async fn capture_redirect(&self, redirect_url: &str) -> Result<(), ApiError> {
        self.client
            .get_text(
                HttpRequest::new(redirect_url)
                    .no_redirect()
                    .accept(&[302])
                    .referer(urls::PTLOGIN4_REFERER),
            )
            .await?;
        let ptwebqq = self.client.cookie("ptwebqq").ok_or_else(|| {
            ApiError::StaleCredential("重定向响应未写入ptwebqq".to_string())
        })?;
        self.tokens.lock().expect("令牌锁中毒").ptwebqq = ptwebqq;
        tracing::info!("(3/5) 获取 ptwebqq 成功");
        Ok(())
    }

    async fn exchange_and_finalize(&self) -> Result<(), ApiError> {
        self.exchange_vfwebqq().await?;
        self.finalize_login().await
    }

    /// 第二级令牌交换
    ///
    /// 响应缺少vfwebqq字段按凭证过期处理,恢复路径据此重走扫码。
    async fn exchange_vfwebqq(&self) -> Result<(), ApiError> {
        let ptwebqq = self.tokens().ptwebqq;
        let url = urls::vfwebqq(&ptwebqq);
        let response = self
            .client
            .get_json(HttpRequest::new(&url).referer(urls::S_REFERER))
            .await?;
        let result: VfwebqqResult = response
            .result_as()
            .map_err(|_| ApiError::StaleCredential("getvfwebqq响应缺少vfwebqq".to_string()))?;
        self.tokens.lock().expect("令牌锁中毒").vfwebqq = result.vfwebqq;
        tracing::info!("(4/5) 获取 vfwebqq 成功");
        Ok(())
    }

    /// 最终令牌交换: login2 返回 uin 与 psessionid
    async fn finalize_login(&self) -> Result<(), ApiError> {
        let payload = serde_json::json!({
            "ptwebqq": self.tokens().ptwebqq,
            "clientid": urls::CLIENT_ID,
            "psessionid": "",
            "status": "online",
        })
        .to_string();
        let response = self
            .client
            .post_form(
                HttpRequest::new(urls::LOGIN2)
                    .referer(urls::D_REFERER)
                    .origin(urls::D_ORIGIN),
                &[("r", &payload)],
            )
            .await?;
        let result: Login2Result = response
            .result_as()
            .map_err(|_| ApiError::StaleCredential("login2响应缺少uin/psessionid".to_string()))?;

        {
            let mut tokens = self.tokens.lock().expect("令牌锁中毒");
            tokens.uin = result.uin;
            tokens.psessionid = result.psessionid;
        }
        self.advance(LoginState::Authenticated)?;
        tracing::info!(uin = result.uin, "(5/5) 获取 psessionid 和 uin 成功");

        // cookie持久化不阻塞登录完成
        let blob = self.client.cookie_string();
        let path = self.store.path().to_path_buf();
        tokio::spawn(async move {
            if let Err(e) = CookieStore::new(path).save(&blob).await {
                tracing::warn!(error = %e, "cookie持久化失败");
            }
        });

        // 扫码成功后移除二维码临时文件
        let _ = tokio::fs::remove_file(&self.config.qrcode_path).await;

        self.emit(QQEvent::LoginSuccess {
            cookie_path: self.config.cookie_path.clone(),
        });
        Ok(())
    }
}

/// 解析 ptqrlogin 的脚本体
///
/// 按位置提取单引号字段: 字段0为状态码,`0`时字段2是重定向URL。
pub fn parse_qr_poll_body(body: &str) -> Result<QrPollResult, ApiError> {
    let fields: Vec<&str> = QUOTED_FIELD
        .find_iter(body)
        .map(|m| {
            let s = m.as_str();
            &s[1..s.len() - 1]
        })
        .collect();
    let Some(&status) = fields.first() else {
        return Err(ApiError::QrPollMalformed(body.to_string()));
    };
    Ok(match status {
        "0" => {
            let redirect_url = fields
                .get(2)
                .filter(|u| !u.is_empty())
                .ok_or_else(|| ApiError::QrPollMalformed(body.to_string()))?;
            QrPollResult::Confirmed {
                redirect_url: redirect_url.to_string(),
            }
        }
        "65" => QrPollResult::Expired,
        "67" => QrPollResult::Scanned,
        _ => QrPollResult::Pending,
    })
}
