use serde::Serialize;

use crate::channel::CommandChannel;
use crate::error::ProtocolError;
use crate::protocol::Message;

mod commands;
mod quality;

pub use commands::DeviceCommands;
pub use quality::Quality;

/// IP 被其他设备占用后写入的占位值
pub const UNKNOWN_IP: &str = "UNKNOWN";

/// 摄像头类设备接收命令的端口
pub const CAMERA_COMMAND_PORT: u16 = 4000;

/// 普通设备接收命令的端口
pub const DEVICE_COMMAND_PORT: u16 = 4100;

/// 设备能力类别，在创建时确定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// 只支持基础命令集
    Generic,
    /// 支持完整的摄像头命令集
    Camera,
}

impl DeviceKind {
    pub fn command_port(self) -> u16 {
        match self {
            DeviceKind::Generic => DEVICE_COMMAND_PORT,
            DeviceKind::Camera => CAMERA_COMMAND_PORT,
        }
    }
}

/// 型号系列，决定初始配置和画质模板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Ultra,
    Floodlight,
    Standard,
}

impl ModelFamily {
    pub fn from_model(model_number: &str) -> Self {
        if model_number.starts_with("VMC5040") {
            ModelFamily::Ultra
        } else if model_number.starts_with("FB1001") {
            ModelFamily::Floodlight
        } else {
            ModelFamily::Standard
        }
    }
}

/// 设备
///
/// 每个序列号对应唯一一条记录。`status` 和 `registration`
/// 每次收到对应类型的报文时整体替换。
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub ip: String,
    pub serial_number: String,
    pub hostname: String,
    pub friendly_name: Option<String>,
    pub status: Option<Message>,
    pub registration: Message,
    pub registered: bool,
    pub last_seen: Option<i64>,
    kind: DeviceKind,
}

impl Device {
    pub(crate) fn new(kind: DeviceKind, ip: &str, registration: Message) -> Result<Self, ProtocolError> {
        let serial_number = registration
            .get_str("SystemSerialNumber")
            .ok_or(ProtocolError::MissingField("SystemSerialNumber"))?
            .to_string();
        let model_number = registration
            .get_str("SystemModelNumber")
            .ok_or(ProtocolError::MissingField("SystemModelNumber"))?;
        let suffix_start = serial_number
            .char_indices()
            .rev()
            .nth(4)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let hostname = format!("{}-{}", model_number, &serial_number[suffix_start..]);

        Ok(Self {
            ip: ip.to_string(),
            serial_number,
            hostname,
            friendly_name: None,
            status: None,
            registration,
            registered: false,
            last_seen: None,
            kind,
        })
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn is_camera(&self) -> bool {
        self.kind == DeviceKind::Camera
    }

    pub fn model_number(&self) -> &str {
        self.registration
            .get_str("SystemModelNumber")
            .unwrap_or_default()
    }

    pub fn family(&self) -> ModelFamily {
        ModelFamily::from_model(self.model_number())
    }

    /// 记录本次报文到达时间
    pub fn touch(&mut self) {
        self.last_seen = Some(chrono::Utc::now().timestamp());
    }

    /// 绑定命令通道，得到可下发命令的句柄
    pub fn commands<'a>(&'a self, channel: &'a dyn CommandChannel) -> DeviceCommands<'a> {
        DeviceCommands::new(self, channel)
    }

    pub fn to_record(&self) -> DeviceRecord {
        DeviceRecord {
            ip: self.ip.clone(),
            serial_number: self.serial_number.clone(),
            hostname: self.hostname.clone(),
            status: self.status.as_ref().map(Message::to_json),
            registration: Some(self.registration.to_json()),
            friendly_name: self.friendly_name.clone(),
            registered: self.registered,
            last_seen: self.last_seen,
        }
    }
}

/// 持久化记录，`status` / `registration` 以 JSON 文本存储
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub ip: String,
    pub serial_number: String,
    pub hostname: String,
    pub status: Option<String>,
    pub registration: Option<String>,
    pub friendly_name: Option<String>,
    pub registered: bool,
    pub last_seen: Option<i64>,
}

/// 设备列表条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub ip: String,
    pub hostname: String,
    pub serial_number: String,
    pub friendly_name: Option<String>,
    pub registered: bool,
    pub last_seen: Option<i64>,
}

impl From<DeviceRecord> for DeviceSummary {
    fn from(record: DeviceRecord) -> Self {
        Self {
            ip: record.ip,
            hostname: record.hostname,
            serial_number: record.serial_number,
            friendly_name: record.friendly_name,
            registered: record.registered,
            last_seen: record.last_seen,
        }
    }
}
