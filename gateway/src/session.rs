//! 入站连接会话
//!
//! 每条连接只处理一条报文：读取、立即确认、分派，然后关闭。

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::channel::CommandChannel;
use crate::config::GatewayConfig;
use crate::device::Device;
use crate::error::{GatewayError, ProtocolError, Result};
use crate::notifier::Notifier;
use crate::protocol::{read_message, write_message, Message, MessageType, Template};
use crate::registry::DeviceRegistry;

/// 会话共享的组件
pub struct GatewayState {
    pub registry: Arc<DeviceRegistry>,
    pub channel: Arc<dyn CommandChannel>,
    pub notifier: Arc<dyn Notifier>,
    pub config: GatewayConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    AwaitingMessage,
    Acknowledging,
    Dispatching,
    Closed,
}

pub struct Session<S> {
    stream: BufReader<S>,
    peer_ip: String,
    state: SessionState,
    gateway: Arc<GatewayState>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer_ip: impl Into<String>, gateway: Arc<GatewayState>) -> Self {
        Self {
            stream: BufReader::new(stream),
            peer_ip: peer_ip.into(),
            state: SessionState::Accepted,
            gateway,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 跑完整个会话，无论成功与否连接都会关闭
    pub async fn run(mut self) -> Result<()> {
        let result = self.process().await;
        self.close().await;
        result
    }

    async fn process(&mut self) -> Result<()> {
        self.transition(SessionState::AwaitingMessage);
        let message = match read_message(&mut self.stream).await? {
            Some(message) => message,
            None => {
                debug!("[{}] 连接关闭，未收到报文", self.peer_ip);
                return Ok(());
            }
        };
        let id = message
            .id()
            .cloned()
            .ok_or(ProtocolError::MissingField("ID"))?;

        self.transition(SessionState::Acknowledging);
        let mut ack = Template::Response.build();
        ack.set_id(id.clone());
        write_message(&mut self.stream, &ack).await.map_err(ProtocolError::Io)?;
        info!(">[{}][{}] 已确认", self.peer_ip, id);

        self.transition(SessionState::Dispatching);
        self.dispatch(&id, message).await
    }

    async fn close(&mut self) {
        self.transition(SessionState::Closed);
        if let Err(e) = self.stream.get_mut().shutdown().await {
            debug!("[{}] 关闭连接失败: {}", self.peer_ip, e);
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("[{}] {:?} -> {:?}", self.peer_ip, self.state, next);
        self.state = next;
    }

    async fn dispatch(&self, id: &Value, message: Message) -> Result<()> {
        match message.message_type() {
            MessageType::Registration => self.on_registration(id, message).await,
            MessageType::Status => self.on_status(id, message).await,
            MessageType::Alert => self.on_alert(id, message).await,
            MessageType::LogMessage => {
                info!(
                    "<[{}][{}] {}",
                    self.peer_ip,
                    id,
                    message.get_str("LogString").unwrap_or_default()
                );
                Ok(())
            }
            other => {
                warn!("<[{}][{}] 未知报文类型: {}", self.peer_ip, id, other);
                debug!("<[{}][{}] {}", self.peer_ip, id, message);
                Ok(())
            }
        }
    }

    async fn on_registration(&self, id: &Value, message: Message) -> Result<()> {
        let serial_number = message
            .get_str("SystemSerialNumber")
            .unwrap_or_default()
            .to_string();
        let registry = &self.gateway.registry;

        // 已有记录也要先通过工厂校验，型号变化时设备类别随之更新
        let mut device = match DeviceRegistry::create(&self.peer_ip, message) {
            Ok(device) => device,
            Err(e @ GatewayError::UnknownDeviceModel(_)) | Err(e @ GatewayError::Protocol(_)) => {
                warn!(
                    "<[{}][{}] 丢弃来自 {} 的注册报文: {}",
                    self.peer_ip, id, serial_number, e
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if let Some(known) = registry.resolve_by_serial(&serial_number).await? {
            device.hostname = known.hostname;
            device.friendly_name = known.friendly_name;
            device.status = known.status;
        }
        device.registered = true;
        device.touch();
        registry.upsert(&device).await?;
        info!(
            "<[{}][{}] 设备注册: {} - {}",
            self.peer_ip, id, serial_number, device.hostname
        );

        let config = &self.gateway.config;
        if let Err(e) = device
            .commands(self.gateway.channel.as_ref())
            .send_initial_register_set(
                &config.wifi_country_code,
                config.video_anti_flicker_rate,
                &config.video_quality_default,
                config.settings_for(&serial_number),
            )
            .await
        {
            error!("[{}] 初始配置下发失败: {}", serial_number, e);
        }

        if config.notify.registration_and_status {
            let result = self
                .gateway
                .notifier
                .registration_received(&device)
                .await;
            log_notification_failure(&device, "registration", result);
        }
        Ok(())
    }

    async fn on_status(&self, id: &Value, message: Message) -> Result<()> {
        let serial_number = message
            .get_str("SystemSerialNumber")
            .ok_or(ProtocolError::MissingField("SystemSerialNumber"))?
            .to_string();
        info!("<[{}][{}] 状态上报: {}", self.peer_ip, id, serial_number);

        let Some(mut device) = self.gateway.registry.resolve_by_serial(&serial_number).await? else {
            warn!(
                "<[{}][{}] {}",
                self.peer_ip,
                id,
                GatewayError::UnresolvedDevice(serial_number)
            );
            return Ok(());
        };
        device.ip = self.peer_ip.clone();
        device.status = Some(message);
        device.touch();
        self.gateway.registry.upsert(&device).await?;

        if self.gateway.config.notify.registration_and_status {
            if let Some(status) = &device.status {
                let result = self.gateway.notifier.status_received(&device, status).await;
                log_notification_failure(&device, "status", result);
            }
        }

        if let Err(e) = device
            .commands(self.gateway.channel.as_ref())
            .send_epoch_time()
            .await
        {
            warn!("[{}] 时间同步失败: {}", serial_number, e);
        }
        Ok(())
    }

    async fn on_alert(&self, id: &Value, message: Message) -> Result<()> {
        let alert_type = message.get_str("AlertType").unwrap_or_default();
        info!("<[{}][{}] {}", self.peer_ip, id, alert_type);

        let Some(device) = self.gateway.registry.resolve_by_ip(&self.peer_ip).await? else {
            warn!(
                "<[{}][{}] {}",
                self.peer_ip,
                id,
                GatewayError::UnresolvedDevice(self.peer_ip.clone())
            );
            return Ok(());
        };

        let notify = &self.gateway.config.notify;
        let notifier = &self.gateway.notifier;
        let result = match alert_type {
            "pirMotionAlert" => {
                if !notify.motion_alert {
                    return Ok(());
                }
                let zones = message
                    .get("PIRMotion")
                    .and_then(|motion| motion.get("zones"))
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                notifier.motion_detected(&device, &zones).await
            }
            "audioAlert" => {
                if !notify.audio_alert {
                    return Ok(());
                }
                notifier.audio_detected(&device).await
            }
            "buttonPressAlert" => {
                if !notify.button_press_alert {
                    return Ok(());
                }
                let triggered = message
                    .get("ButtonPress")
                    .and_then(|press| press.get("Triggered"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                notifier.button_pressed(&device, triggered).await
            }
            "motionTimeoutAlert" => {
                if !notify.motion_timeout_alert {
                    return Ok(());
                }
                notifier.motion_timeout(&device).await
            }
            other => {
                warn!("<[{}][{}] 未知告警类型: {:?}", self.peer_ip, id, other);
                debug!("<[{}][{}] {}", self.peer_ip, id, message);
                return Ok(());
            }
        };
        log_notification_failure(&device, alert_type, result);
        Ok(())
    }
}

fn log_notification_failure(device: &Device, event: &str, result: Result<()>) {
    if let Err(e) = result {
        warn!(
            "[{}] {} 通知发送失败: {}",
            device.serial_number, event, e
        );
    }
}
