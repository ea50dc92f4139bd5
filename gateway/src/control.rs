//! 控制面
//!
//! 供外部 API 使用：按序列号查询、删除设备，或者调用任意设备命令。

use std::str::FromStr;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::channel::CommandChannel;
use crate::device::{Device, DeviceSummary};
use crate::error::{GatewayError, Result};
use crate::registry::DeviceRegistry;

/// 可通过控制面调用的设备命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    StatusRequest,
    Arm,
    PirLed,
    NightModeLightSourceAlert,
    VideoFlip,
    VideoMirror,
    NightModeGrey,
    Quality,
    Snapshot,
    AudioMic,
    AudioSpeaker,
    UserStreamActive,
    SetActivityZones,
    UnsetActivityZones,
    Message,
    RegisterSet,
    Settings,
}

impl FromStr for DeviceCommand {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        let command = match s {
            "statusrequest" => Self::StatusRequest,
            "arm" => Self::Arm,
            "pirled" => Self::PirLed,
            "nightmodelightsourcealert" => Self::NightModeLightSourceAlert,
            "videoflip" => Self::VideoFlip,
            "videomirror" => Self::VideoMirror,
            "nightmodegrey" => Self::NightModeGrey,
            "quality" => Self::Quality,
            "snapshot" => Self::Snapshot,
            "audiomic" => Self::AudioMic,
            "audiospeaker" => Self::AudioSpeaker,
            "userstreamactive" => Self::UserStreamActive,
            "activityzones" => Self::SetActivityZones,
            "unsetactivityzones" => Self::UnsetActivityZones,
            "message" => Self::Message,
            "registerset" => Self::RegisterSet,
            "settings" => Self::Settings,
            other => {
                return Err(GatewayError::validation(format!(
                    "unknown command: {}",
                    other
                )))
            }
        };
        Ok(command)
    }
}

pub struct DeviceController {
    registry: Arc<DeviceRegistry>,
    channel: Arc<dyn CommandChannel>,
}

impl DeviceController {
    pub fn new(registry: Arc<DeviceRegistry>, channel: Arc<dyn CommandChannel>) -> Self {
        Self { registry, channel }
    }

    pub async fn list_devices(&self) -> Result<Vec<DeviceSummary>> {
        let devices = self.registry.list().await?;
        info!("查询设备列表: {} 台", devices.len());
        Ok(devices)
    }

    pub async fn device(&self, serial_number: &str) -> Result<Device> {
        self.registry
            .resolve_by_serial(serial_number)
            .await?
            .ok_or_else(|| GatewayError::UnresolvedDevice(serial_number.to_string()))
    }

    /// 最近一次状态上报，没有时为 `{}`
    pub async fn status(&self, serial_number: &str) -> Result<Value> {
        let device = self.device(serial_number).await?;
        Ok(device
            .status
            .map(|status| status.into_value())
            .unwrap_or_else(|| json!({})))
    }

    pub async fn registration(&self, serial_number: &str) -> Result<Value> {
        let device = self.device(serial_number).await?;
        Ok(device.registration.into_value())
    }

    pub async fn delete_device(&self, serial_number: &str) -> Result<bool> {
        let device = self.device(serial_number).await?;
        self.registry.delete(&device).await
    }

    pub async fn set_friendly_name(&self, serial_number: &str, name: &str) -> Result<()> {
        let mut device = self.device(serial_number).await?;
        device.friendly_name = Some(name.to_string());
        self.registry.upsert(&device).await
    }

    /// 调用设备命令
    ///
    /// 参数校验失败或设备不支持时返回错误；下发失败返回 `Ok(false)`。
    pub async fn invoke(&self, serial_number: &str, command: DeviceCommand, body: &Value) -> Result<bool> {
        let device = self.device(serial_number).await?;
        let commands = device.commands(self.channel.as_ref());

        let result = match command {
            DeviceCommand::StatusRequest => commands.status_request().await,
            DeviceCommand::Arm => commands.arm(body).await,
            DeviceCommand::PirLed => commands.pir_led(body).await,
            DeviceCommand::NightModeLightSourceAlert => {
                commands.night_mode_light_source_alert(body).await
            }
            DeviceCommand::VideoFlip => commands.video_flip(body).await,
            DeviceCommand::VideoMirror => commands.video_mirror(body).await,
            DeviceCommand::NightModeGrey => commands.night_mode_grey(body).await,
            DeviceCommand::Quality => commands.set_quality(body).await,
            DeviceCommand::Snapshot => {
                let url = required_str(body, "url")?;
                commands.snapshot_request(url).await
            }
            DeviceCommand::AudioMic => commands.mic_request(required_bool(body, "enabled")?).await,
            DeviceCommand::AudioSpeaker => {
                commands.speaker_request(required_bool(body, "enabled")?).await
            }
            DeviceCommand::UserStreamActive => {
                commands
                    .set_user_stream_active(required_bool(body, "active")?)
                    .await
            }
            DeviceCommand::SetActivityZones => commands.set_activity_zones(body).await,
            DeviceCommand::UnsetActivityZones => commands.unset_activity_zones().await,
            DeviceCommand::Message => commands.send_raw(body).await,
            DeviceCommand::RegisterSet => commands.register_set(body).await,
            DeviceCommand::Settings => commands.update_settings(body).await,
        };

        match result {
            Ok(()) => Ok(true),
            Err(GatewayError::CommandTransmission { target, reason }) => {
                warn!(
                    "[{}] 命令 {:?} 下发失败: target={}, error={}",
                    serial_number, command, target, reason
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

fn required_str<'v>(body: &'v Value, key: &str) -> Result<&'v str> {
    body.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::validation(format!("{} is required", key)))
}

/// 接受布尔值或 0 / 1
fn required_bool(body: &Value, key: &str) -> Result<bool> {
    match body.get(key) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) if n.as_i64().is_some() => Ok(n.as_i64() != Some(0)),
        _ => Err(GatewayError::validation(format!("{} is required", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_parse() {
        assert_eq!("quality".parse::<DeviceCommand>().unwrap(), DeviceCommand::Quality);
        assert_eq!(
            "unsetactivityzones".parse::<DeviceCommand>().unwrap(),
            DeviceCommand::UnsetActivityZones
        );
        assert!("reboot".parse::<DeviceCommand>().is_err());
    }

    #[test]
    fn required_bool_accepts_integers() {
        assert!(required_bool(&json!({"enabled": 1}), "enabled").unwrap());
        assert!(!required_bool(&json!({"enabled": false}), "enabled").unwrap());
        assert!(required_bool(&json!({"enabled": "yes"}), "enabled").is_err());
    }
}
