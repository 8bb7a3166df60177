use std::sync::Arc;

use qq_bot::{EventKind, MsgHandler, PeerKind, QQ, QQConfig, QQEvent};

/// 演示机器人: 打印全部入站消息,并对好友消息自动回复
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    qq_bot::utils::logger::init()?;

    let config = QQConfig::from_env();
    tracing::info!(
        cookie_path = %config.cookie_path.display(),
        qrcode_path = %config.qrcode_path.display(),
        "客户端启动,扫码图片将写入上述路径"
    );

    let qq = Arc::new(QQ::new(config)?);

    // 生命周期事件
    qq.on(EventKind::QrIssued, |event| {
        if let QQEvent::QrIssued { path, .. } = event {
            tracing::info!(path = %path.display(), "请用手机QQ扫描二维码");
        }
    });
    qq.on(EventKind::Disconnect, |event| {
        if let QQEvent::Disconnect { reason } = event {
            tracing::warn!(reason = %reason, "会话断开");
        }
    });

    // 全量消息日志
    qq.on(EventKind::Msg, |event| {
        if let QQEvent::Message { msg, .. } = event {
            match (&msg.group_name, &msg.group_id) {
                (Some(group), _) => {
                    tracing::info!("[{}] {}: {}", group, msg.name, msg.content)
                }
                _ => tracing::info!("{}: {}", msg.name, msg.content),
            }
        }
    });

    // 好友消息自动回复
    let replier = Arc::clone(&qq);
    qq.on_msg(MsgHandler::new(
        move |msg| {
            let qq = Arc::clone(&replier);
            let uin = msg.id;
            tokio::spawn(async move {
                if let Err(e) = qq.send_buddy_msg(uin, "你好,我是机器人").await {
                    tracing::warn!(uin, error = %e, "自动回复失败");
                }
            });
        },
        &[PeerKind::Buddy],
    ));

    // Ctrl-C 优雅关停
    let stopper = Arc::clone(&qq);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("收到中断信号,关停中");
            stopper.shutdown();
        }
    });

    qq.run().await?;
    Ok(())
}
