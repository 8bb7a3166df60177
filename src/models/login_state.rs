use serde::{Deserialize, Serialize};

use crate::models::errors::ApiError;

/// 会话令牌链
///
/// 四个凭证互相依赖,必须按 ptwebqq -> vfwebqq -> psessionid/uin 的顺序获取。
/// 全部就绪后会话才算完成认证。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tokens {
    /// 账号标识
    pub uin: u64,
    /// 第一级令牌 (从cookie中提取)
    pub ptwebqq: String,
    /// 第二级令牌 (getvfwebqq 响应)
    pub vfwebqq: String,
    /// 最终会话凭证 (login2 响应)
    pub psessionid: String,
}

impl Tokens {
    /// 令牌链是否完整
    ///
    /// 只有四个值全部就绪,状态机才允许迁移到 Authenticated。
    pub fn is_complete(&self) -> bool {
        self.uin != 0
            && !self.ptwebqq.is_empty()
            && !self.vfwebqq.is_empty()
            && !self.psessionid.is_empty()
    }
}

/// 登录状态机
///
/// 状态转换流程 (汇聚型,cookie复用成功时跳过扫码路径):
///
/// ```text
/// Idle ──> ResumingFromCookie ──> ExchangingTokens ──> Authenticated
///   │              │                     │                   │
///   │              │ (blob无效)          │ (凭证过期)         ▼
///   │              ▼                     ▼              Disconnected ──> Idle
///   └──────> AwaitingQrIssue <── CookieExpiredRetry
///                  │   ▲
///                  ▼   │ (二维码过期,重新签发)
///            AwaitingQrScan ──────> ExchangingTokens
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    /// 初始状态
    Idle,

    /// 尝试从持久化cookie恢复会话
    ResumingFromCookie,

    /// 准备签发二维码
    AwaitingQrIssue,

    /// 等待扫码 (子状态由 QrPollResult 表达)
    AwaitingQrScan,

    /// 令牌交换中 (捕获302重定向 + getvfwebqq + login2)
    ExchangingTokens,

    /// 认证完成,可以发起轮询与发送
    Authenticated,

    /// cookie过期,丢弃后重走扫码路径
    CookieExpiredRetry,

    /// 会话被远端作废或连续失败超限
    Disconnected,
}

impl LoginState {
    /// 状态迁移表
    ///
    /// 表之外的迁移一律拒绝。
    pub fn can_transition(self, next: LoginState) -> bool {
        use LoginState::*;
        matches!(
            (self, next),
            (Idle, ResumingFromCookie)
                | (Idle, AwaitingQrIssue)
                | (ResumingFromCookie, ExchangingTokens)
                | (ResumingFromCookie, AwaitingQrIssue)
                | (AwaitingQrIssue, AwaitingQrScan)
                | (AwaitingQrScan, AwaitingQrIssue)
                | (AwaitingQrScan, ExchangingTokens)
                | (ExchangingTokens, Authenticated)
                | (ExchangingTokens, CookieExpiredRetry)
                | (CookieExpiredRetry, AwaitingQrIssue)
                | (Authenticated, Disconnected)
                | (Disconnected, Idle)
        )
    }
}

/// 单次扫码状态轮询的结果
///
/// ptqrlogin 返回脚本体,按位置提取引号字段:
/// 字段0为状态码, `0`=已确认(字段2为重定向URL), `65`=已过期,
/// `67`=已扫码未确认, 其余视为等待扫码。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrPollResult {
    /// 尚未扫码
    Pending,
    /// 已扫码,等待手机端确认
    Scanned,
    /// 二维码已过期,需要重新签发
    Expired,
    /// 确认成功,携带重定向目标URL
    Confirmed { redirect_url: String },
}

/// 对单次轮询结果应作出的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrAction {
    /// 固定延迟后重试
    Wait,
    /// 丢弃当前二维码,重新签发
    Reissue,
    /// 进入令牌交换,携带重定向URL
    Proceed(String),
}

/// 扫码阶段的流程记录
///
/// 跟踪二维码签发次数,并把轮询结果映射为动作。
/// 登录循环与测试共用同一份判定逻辑。
#[derive(Debug, Default)]
pub struct QrScanFlow {
    issues: u32,
}

impl QrScanFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次二维码签发
    pub fn on_issue(&mut self) {
        self.issues += 1;
    }

    /// 已签发二维码的次数
    pub fn issues(&self) -> u32 {
        self.issues
    }

    /// 将轮询结果映射为动作
    pub fn on_poll(&mut self, result: &QrPollResult) -> QrAction {
        match result {
            QrPollResult::Pending | QrPollResult::Scanned => QrAction::Wait,
            QrPollResult::Expired => QrAction::Reissue,
            QrPollResult::Confirmed { redirect_url } => QrAction::Proceed(redirect_url.clone()),
        }
    }
}

/// 生成非法迁移错误
pub fn invalid_transition(from: LoginState, to: LoginState) -> ApiError {
    ApiError::InvalidTransition {
        from: format!("{:?}", from),
        to: format!("{:?}", to),
    }
}
