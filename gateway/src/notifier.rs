//! 事件通知
//!
//! 对引擎来说是发出即忘：会话只记录失败，不会因此中断。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::device::Device;
use crate::error::{GatewayError, Result};
use crate::protocol::Message;

/// 通知分发
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 注册报文取自 `device.registration`
    async fn registration_received(&self, device: &Device) -> Result<()>;

    async fn status_received(&self, device: &Device, status: &Message) -> Result<()>;

    async fn motion_detected(&self, device: &Device, zones: &[Value]) -> Result<()>;

    async fn audio_detected(&self, device: &Device) -> Result<()>;

    async fn button_pressed(&self, device: &Device, triggered: bool) -> Result<()>;

    async fn motion_timeout(&self, device: &Device) -> Result<()>;
}

/// 通过 HTTP POST 把事件推送到配置的 webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    urls: Vec<String>,
}

impl WebhookNotifier {
    pub fn new(urls: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, urls })
    }

    /// 逐个推送，返回第一个失败
    async fn post(&self, device: &Device, event: &str, fields: Value) -> Result<()> {
        let mut body = json!({
            "event": event,
            "ip": device.ip,
            "friendly_name": device.friendly_name,
            "hostname": device.hostname,
            "serial_number": device.serial_number,
        });
        if let (Some(body), Value::Object(fields)) = (body.as_object_mut(), fields) {
            body.extend(fields);
        }

        let mut first_error: Option<GatewayError> = None;
        for url in &self.urls {
            debug!("推送 Webhook: event={}, url={}", event, url);
            let result = self
                .client
                .post(url)
                .json(&body)
                .send()
                .await
                .and_then(|response| response.error_for_status());
            if let Err(e) = result {
                warn!("Webhook 推送失败: event={}, url={}, error={}", event, url, e);
                first_error.get_or_insert(e.into());
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn registration_received(&self, device: &Device) -> Result<()> {
        self.post(
            device,
            "registrationReceived",
            json!({"registration": device.registration}),
        )
        .await
    }

    async fn status_received(&self, device: &Device, status: &Message) -> Result<()> {
        self.post(device, "statusReceived", json!({"status": status}))
            .await
    }

    async fn motion_detected(&self, device: &Device, zones: &[Value]) -> Result<()> {
        self.post(device, "motionDetected", json!({"zones": zones}))
            .await
    }

    async fn audio_detected(&self, device: &Device) -> Result<()> {
        self.post(device, "audioDetected", json!({})).await
    }

    async fn button_pressed(&self, device: &Device, triggered: bool) -> Result<()> {
        self.post(device, "buttonPressed", json!({"triggered": triggered}))
            .await
    }

    async fn motion_timeout(&self, device: &Device) -> Result<()> {
        self.post(device, "motionTimeout", json!({})).await
    }
}
