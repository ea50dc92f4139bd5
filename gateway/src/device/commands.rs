//! 设备命令集
//!
//! 基础命令所有设备都支持；摄像头命令在普通设备上返回
//! [`GatewayError::UnsupportedOperation`]，不会发送任何报文。

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::{Device, ModelFamily, Quality};
use crate::channel::CommandChannel;
use crate::error::{GatewayError, Result};
use crate::protocol::{Message, Template};

/// 已绑定命令通道的设备句柄
pub struct DeviceCommands<'a> {
    device: &'a Device,
    channel: &'a dyn CommandChannel,
}

impl<'a> DeviceCommands<'a> {
    pub(super) fn new(device: &'a Device, channel: &'a dyn CommandChannel) -> Self {
        Self { device, channel }
    }

    /// 通过命令通道发送一条报文
    pub async fn send_message(&self, message: Message) -> Result<()> {
        debug!(
            "[{}] -> {} {}",
            self.device.serial_number,
            message.message_type(),
            message
        );
        self.channel
            .send(&self.device.ip, self.device.kind().command_port(), message)
            .await
    }

    /// 原样透传一条报文
    pub async fn send_raw(&self, body: &Value) -> Result<()> {
        let message = Message::from_value(body.clone())
            .map_err(|_| GatewayError::validation("message body must be a JSON object"))?;
        self.send_message(message).await
    }

    /// `registerSet`，body 整体作为 `SetValues`
    pub async fn register_set(&self, body: &Value) -> Result<()> {
        let values = as_object(body, "register set body")?;
        let mut register_set = Template::RegisterSet.build();
        register_set.replace_set_values(values.clone());
        self.send_message(register_set).await
    }

    pub async fn status_request(&self) -> Result<()> {
        self.send_message(Template::StatusRequest.build()).await
    }

    /// 时间同步
    pub async fn send_epoch_time(&self) -> Result<()> {
        let mut epoch = Template::EpochBsTime.build();
        epoch.insert("EpochBSTime", chrono::Utc::now().timestamp());
        self.send_message(epoch).await
    }

    /// 布防 / 撤防
    pub async fn arm(&self, params: &Value) -> Result<()> {
        let pir_target_state = required(params, "PIRTargetState")?.clone();

        let mut register_set = Template::RegisterSet.build();
        register_set.replace_set_values(object(json!({
            "PIRTargetState": pir_target_state,
            "PIRStartSensitivity": or_default(params, "PIRStartSensitivity", json!(80)),
            "PIRAction": or_default(params, "PIRAction", json!("Stream")),
            "VideoMotionEstimationEnable": or_default(params, "VideoMotionEstimationEnable", json!(false)),
            "VideoMotionSensitivity": 80,
            "AudioTargetState": or_default(params, "AudioTargetState", json!("Disarmed")),
            "DefaultMotionStreamTimeLimit": 10
        })));

        self.send_message(register_set).await
    }

    /// 画质，两条命令都发送成功才算成功
    pub async fn set_quality(&self, params: &Value) -> Result<()> {
        self.require_camera("set_quality")?;
        let quality: Quality = required_str(params, "quality")?.parse()?;
        self.apply_quality(quality).await
    }

    async fn apply_quality(&self, quality: Quality) -> Result<()> {
        let (ra_params, register_set) = quality.templates(self.device.family());
        self.send_message(ra_params.build()).await?;
        self.send_message(register_set.build()).await
    }

    pub async fn pir_led(&self, params: &Value) -> Result<()> {
        self.require_camera("pir_led")?;
        let enabled = required(params, "enabled")?;
        let sensitivity = required(params, "sensitivity")?;
        self.send_set_values(json!({
            "PIREnableLED": enabled,
            "PIRLEDSensitivity": sensitivity
        }))
        .await
    }

    pub async fn night_mode_light_source_alert(&self, params: &Value) -> Result<()> {
        self.require_camera("night_mode_light_source_alert")?;
        let enabled = i32::from(is_truthy(required(params, "enabled")?));
        self.send_set_values(json!({"NightModeLightSourceAlert": enabled}))
            .await
    }

    pub async fn video_flip(&self, params: &Value) -> Result<()> {
        self.require_camera("video_flip")?;
        let enabled = required(params, "enabled")?;
        self.send_set_values(json!({"VideoFlip": enabled})).await
    }

    pub async fn video_mirror(&self, params: &Value) -> Result<()> {
        self.require_camera("video_mirror")?;
        let enabled = required(params, "enabled")?;
        self.send_set_values(json!({"VideoMirror": enabled})).await
    }

    pub async fn night_mode_grey(&self, params: &Value) -> Result<()> {
        self.require_camera("night_mode_grey")?;
        let value = required(params, "value")?;
        self.send_set_values(json!({"NightModeGrey": value})).await
    }

    /// 任意寄存器设置，`settings` 必须是对象
    pub async fn update_settings(&self, params: &Value) -> Result<()> {
        self.require_camera("update_settings")?;
        let settings = match params.get("settings") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(settings)) => settings.clone(),
            Some(_) => return Err(GatewayError::validation("settings must be a JSON object")),
        };
        let mut register_set = Template::RegisterSet.build();
        register_set.replace_set_values(settings);
        self.send_message(register_set).await
    }

    /// 目前总是发送覆盖全画面的区域，坐标参数尚未解析
    pub async fn set_activity_zones(&self, _params: &Value) -> Result<()> {
        self.require_camera("set_activity_zones")?;
        self.send_message(Template::ActivityZoneAll.build()).await
    }

    pub async fn unset_activity_zones(&self) -> Result<()> {
        self.require_camera("unset_activity_zones")?;
        self.send_message(Template::ActivityZoneDelete.build()).await
    }

    /// 让设备抓拍并上传到指定 URL
    pub async fn snapshot_request(&self, url: &str) -> Result<()> {
        self.require_camera("snapshot_request")?;
        let mut snapshot = Template::Snapshot.build();
        snapshot.insert("DestinationURL", url);
        self.send_message(snapshot).await
    }

    pub async fn set_user_stream_active(&self, active: bool) -> Result<()> {
        self.require_camera("set_user_stream_active")?;
        self.send_set_values(json!({"UserStreamActive": i32::from(active)}))
            .await
    }

    pub async fn mic_request(&self, enabled: bool) -> Result<()> {
        self.require_camera("mic_request")?;
        let mut request = Template::AudioMic.build();
        request.insert("Enable", enabled);
        self.send_message(request).await
    }

    pub async fn speaker_request(&self, enabled: bool) -> Result<()> {
        self.require_camera("speaker_request")?;
        let mut request = Template::AudioSpeaker.build();
        request.insert("Enable", enabled);
        self.send_message(request).await
    }

    /// 注册完成后的初始配置
    ///
    /// `device_settings` 中的 `VideoQuality` 会覆盖默认画质，其余字段叠加到初始寄存器集上。
    pub async fn send_initial_register_set(
        &self,
        wifi_country_code: &str,
        anti_flicker_rate: u32,
        default_quality: &str,
        device_settings: Option<&Map<String, Value>>,
    ) -> Result<()> {
        let mut register_set = if self.device.is_camera() {
            match self.device.family() {
                ModelFamily::Ultra => Template::RegisterSetInitialUltra.build(),
                ModelFamily::Floodlight => Template::RegisterSetInitialFloodlight.build(),
                ModelFamily::Standard => {
                    if let Err(e) = self.arm(&json!({"PIRTargetState": "Armed"})).await {
                        warn!("[{}] 初始布防失败: {}", self.device.serial_number, e);
                    }
                    Template::RegisterSetInitialSubscription.build()
                }
            }
        } else {
            Template::RegisterSet.build()
        };

        let values = register_set.set_values_mut();
        values.insert("WifiCountryCode".into(), json!(wifi_country_code));
        values.insert("VideoAntiFlickerRate".into(), json!(anti_flicker_rate));

        let mut quality = default_quality.to_string();
        if let Some(settings) = device_settings {
            let mut overlay = settings.clone();
            if let Some(Value::String(requested)) = overlay.remove("VideoQuality") {
                quality = requested;
            }
            values.extend(overlay);
        }

        self.send_message(register_set).await?;

        if !self.device.is_camera() {
            return Ok(());
        }

        if quality.eq_ignore_ascii_case("default") {
            quality = "insane".to_string();
        }
        info!(
            "[{}] 应用初始画质: {}",
            self.device.serial_number, quality
        );
        self.apply_quality(quality.parse()?).await
    }

    /// 发送一条 `SetValues` 为给定对象的 `registerSet`
    async fn send_set_values(&self, values: Value) -> Result<()> {
        let mut register_set = Template::RegisterSet.build();
        register_set.replace_set_values(object(values));
        self.send_message(register_set).await
    }

    fn require_camera(&self, operation: &'static str) -> Result<()> {
        if self.device.is_camera() {
            Ok(())
        } else {
            Err(GatewayError::UnsupportedOperation {
                serial: self.device.serial_number.clone(),
                operation,
            })
        }
    }
}

fn required<'v>(params: &'v Value, key: &str) -> Result<&'v Value> {
    match params.get(key) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(GatewayError::validation(format!("missing required field: {}", key))),
    }
}

fn required_str<'v>(params: &'v Value, key: &str) -> Result<&'v str> {
    required(params, key)?
        .as_str()
        .ok_or_else(|| GatewayError::validation(format!("{} must be a string", key)))
}

fn as_object<'v>(value: &'v Value, what: &str) -> Result<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| GatewayError::validation(format!("{} must be a JSON object", what)))
}

/// 缺省或假值时使用默认值
fn or_default(params: &Value, key: &str, default: Value) -> Value {
    match params.get(key) {
        Some(value) if is_truthy(value) => value.clone(),
        _ => default,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
