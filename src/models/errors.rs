use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API调用相关错误
///
/// 处理与WebQQ远端服务交互时的各种失败场景。
/// 每个错误都包含足够的上下文信息,帮助调试和恢复。
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum ApiError {
    /// 网络请求失败
    ///
    /// 可能原因:
    /// - 网络连接中断
    /// - 远端服务器不可达
    /// - DNS解析失败
    #[error("网络请求失败: {0}")]
    NetworkFailed(String),

    /// HTTP状态码错误
    ///
    /// 远端返回了调用方未声明接受的状态码
    #[error("HTTP错误 {status}: {url}")]
    HttpStatus { status: u16, url: String },

    /// JSON解析失败
    ///
    /// 远端返回的数据格式不符合预期
    #[error("响应数据解析失败: {0}")]
    JsonParseFailed(String),

    /// 响应格式无效
    ///
    /// 响应可以解析,但缺少预期字段或retcode异常
    #[error("响应格式无效: {0}")]
    InvalidResponse(String),

    /// 凭证已失效
    ///
    /// 令牌交换的响应缺少预期字段,视为cookie过期,
    /// 需要丢弃持久化的cookie并重新走扫码登录
    #[error("凭证已失效: {0}")]
    StaleCredential(String),

    /// 尚未完成认证
    ///
    /// psessionid 未就绪时发起了需要认证的调用,必须快速失败
    #[error("会话尚未认证,拒绝调用")]
    NotAuthenticated,

    /// 非法的登录状态迁移
    ///
    /// 登录状态机收到了迁移表之外的请求
    #[error("非法状态迁移: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// 扫码响应无法解析
    ///
    /// ptqrlogin 返回的脚本体中提取不到引号字段
    #[error("扫码状态响应无法解析: {0}")]
    QrPollMalformed(String),

    /// 二维码图片写入失败
    #[error("二维码图片写入失败: {0}")]
    QrWriteFailed(String),
}

/// 持久化状态相关错误
///
/// 处理cookie文本块读写过程中的失败场景
#[derive(Debug, Error)]
pub enum StoreError {
    /// 文件读写失败
    #[error("cookie文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    /// cookie文本块无法解析
    ///
    /// 解析不出任何键值对,按全新登录处理
    #[error("cookie文本块无法解析")]
    Malformed,
}

/// 实现从reqwest::Error到ApiError的转换
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::NetworkFailed("请求超时".to_string())
        } else if err.is_connect() {
            ApiError::NetworkFailed("无法连接到服务器".to_string())
        } else {
            ApiError::NetworkFailed(err.to_string())
        }
    }
}

/// 实现从serde_json::Error到ApiError的转换
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonParseFailed(err.to_string())
    }
}
