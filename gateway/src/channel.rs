//! 出站命令通道
//!
//! 每条命令都新建一条到设备的 TCP 连接：发送一帧，等待同 `ID` 的确认，然后关闭。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::device::UNKNOWN_IP;
use crate::error::{GatewayError, Result};
use crate::protocol::{read_message, write_message, Message};

/// 向设备下发命令
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// 发送一条命令并等待确认
    async fn send(&self, ip: &str, port: u16, message: Message) -> Result<()>;
}

/// 基于 TCP 的命令通道
pub struct TcpCommandChannel {
    next_id: AtomicU64,
    timeout: Duration,
}

impl TcpCommandChannel {
    pub fn new(timeout: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    async fn exchange(&self, target: &str, message: &Message) -> Result<Option<Message>> {
        let stream = TcpStream::connect(target)
            .await
            .map_err(|e| GatewayError::transmission(target, e))?;
        let mut stream = BufReader::new(stream);

        write_message(&mut stream, message)
            .await
            .map_err(|e| GatewayError::transmission(target, e))?;

        read_message(&mut stream)
            .await
            .map_err(|e| GatewayError::transmission(target, e))
    }
}

#[async_trait]
impl CommandChannel for TcpCommandChannel {
    async fn send(&self, ip: &str, port: u16, mut message: Message) -> Result<()> {
        let target = format!("{}:{}", ip, port);
        if ip == UNKNOWN_IP {
            return Err(GatewayError::transmission(target, "device has no known address"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        message.set_id(id);
        debug!(
            "下发命令: type={}, target={}, id={}",
            message.message_type(),
            target,
            id
        );

        let ack = tokio::time::timeout(self.timeout, self.exchange(&target, &message))
            .await
            .map_err(|_| GatewayError::transmission(&target, "timed out awaiting acknowledgment"))??;

        match ack {
            Some(ack) if ack.id() == message.id() => {
                debug!("命令已确认: target={}, id={}", target, id);
                Ok(())
            }
            Some(ack) => {
                warn!(
                    "确认 ID 不匹配: target={}, expected={}, got={:?}",
                    target,
                    id,
                    ack.id()
                );
                Err(GatewayError::transmission(target, "acknowledgment id mismatch"))
            }
            None => Err(GatewayError::transmission(
                target,
                "connection closed before acknowledgment",
            )),
        }
    }
}
