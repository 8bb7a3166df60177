use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::Font;

/// 客户端配置
///
/// 路径与各计时参数都可由操作者覆盖;未设置时使用与
/// 原始协议行为一致的默认值。
#[derive(Debug, Clone)]
pub struct QQConfig {
    /// cookie文本块的持久化路径
    pub cookie_path: PathBuf,

    /// 二维码图片的临时路径 (扫码成功后删除)
    pub qrcode_path: PathBuf,

    /// 扫码状态轮询的固定间隔
    pub qr_poll_interval: Duration,

    /// 长轮询连续传输失败的容忍上限,超出视为致命断开
    pub poll_fail_limit: u32,

    /// 长轮询传输失败后的重试等待
    pub poll_retry_delay: Duration,

    /// 花名册定时刷新间隔
    pub roster_refresh_interval: Duration,

    /// 出站消息的字体元数据
    pub font: Font,
}

impl Default for QQConfig {
    fn default() -> Self {
        Self {
            cookie_path: PathBuf::from("/tmp/qq-bot.cookie"),
            qrcode_path: PathBuf::from("/tmp/qq-bot-code.png"),
            qr_poll_interval: Duration::from_secs(2),
            poll_fail_limit: 10,
            poll_retry_delay: Duration::from_secs(2),
            roster_refresh_interval: Duration::from_secs(60),
            font: Font::default(),
        }
    }
}

impl QQConfig {
    /// 从环境变量加载配置
    ///
    /// 读取的变量 (均可缺省):
    /// - `QQ_COOKIE_PATH`: cookie持久化路径
    /// - `QQ_QRCODE_PATH`: 二维码图片路径
    /// - `QQ_POLL_FAIL_LIMIT`: 轮询失败容忍上限
    /// - `QQ_ROSTER_REFRESH_SECS`: 花名册刷新间隔(秒)
    ///
    /// 格式错误的值按缺省处理,不报错。
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = env::var("QQ_COOKIE_PATH") {
            if !path.is_empty() {
                config.cookie_path = PathBuf::from(path);
            }
        }

        if let Ok(path) = env::var("QQ_QRCODE_PATH") {
            if !path.is_empty() {
                config.qrcode_path = PathBuf::from(path);
            }
        }

        if let Some(limit) = env::var("QQ_POLL_FAIL_LIMIT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            config.poll_fail_limit = limit;
        }

        if let Some(secs) = env::var("QQ_ROSTER_REFRESH_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.roster_refresh_interval = Duration::from_secs(secs);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_默认配置() {
        let config = QQConfig::default();
        assert_eq!(config.poll_fail_limit, 10);
        assert_eq!(config.qr_poll_interval, Duration::from_secs(2));
        assert_eq!(config.roster_refresh_interval, Duration::from_secs(60));
    }
}
