use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::session::{GatewayState, Session};

/// 绑定一个设备接入端口
pub async fn bind(addr: &str, port: u16) -> Result<TcpListener> {
    let listener = TcpListener::bind((addr, port)).await?;
    info!("设备接入端口监听: {}:{}", addr, port);
    Ok(listener)
}

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// 连续接入失败时的等待时间，按倍数增长到上限
fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_MIN
        .saturating_mul(2u32.saturating_pow(failures.saturating_sub(1)))
        .min(ACCEPT_BACKOFF_MAX)
}

/// 接入循环：每条连接一个任务
///
/// 单条连接的错误只影响它自己的任务，接入失败只记录日志并退避后重试。
pub async fn serve(listener: TcpListener, state: Arc<GatewayState>) -> Result<()> {
    let local = listener.local_addr()?;
    let mut failures = 0u32;
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => {
                failures = 0;
                accepted
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let delay = accept_backoff(failures);
                error!("[{}] 接受连接失败: {}，{:?} 后重试", local, e, delay);
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        let peer_ip = peer.ip().to_string();
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = Session::new(socket, peer_ip.clone(), state).run().await {
                warn!("[{}] 会话异常结束: {}", peer_ip, e);
            }
        });
    }
}
