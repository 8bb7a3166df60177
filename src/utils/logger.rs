use std::io;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志系统
///
/// 配置结构化日志输出:
/// - JSON格式文件: 便于机器解析和日志分析
/// - 按天轮转: 每天一个新文件
/// - 双输出: 控制台(开发) + 文件(生产)
/// - 环境变量控制: RUST_LOG=debug 可调整日志级别
///
/// # 日志级别
/// - ERROR: 严重错误,需要立即关注
/// - WARN: 警告信息,可能导致问题 (如未识别的轮询retcode)
/// - INFO: 关键业务事件 (默认级别,登录步骤、断开)
/// - DEBUG: 详细调试信息 (原始响应体)
/// - TRACE: 极详细的跟踪信息
pub fn init() -> Result<(), io::Error> {
    // 日志目录: ./logs
    let log_dir = "logs";

    // 按天轮转的文件写入器
    // 文件命名格式: qq-bot.2026-08-23.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("qq-bot")
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    // 环境变量过滤器
    // 默认: INFO级别,可通过 RUST_LOG=debug 覆盖
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // 文件层: JSON格式,便于日志分析工具解析
    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false);

    // 控制台层: 人类可读格式,便于开发调试
    let console_layer = fmt::layer()
        .with_writer(io::stdout)
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    // 组合订阅器
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(())
}
