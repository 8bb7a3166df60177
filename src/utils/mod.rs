//! 工具模块
//!
//! - codec: 握手随机值与键控哈希 (纯函数)
//! - urls: 远端接口地址表
//! - logger: 结构化日志初始化

pub mod codec;
pub mod logger;
pub mod urls;
