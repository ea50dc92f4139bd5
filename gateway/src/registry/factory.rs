use crate::device::{Device, DeviceKind};
use crate::error::{GatewayError, ProtocolError, Result};
use crate::protocol::Message;

/// 型号前缀表，按顺序匹配
const MODEL_PREFIXES: &[(&str, DeviceKind)] = &[
    ("VMC", DeviceKind::Camera),
    ("VML", DeviceKind::Camera),
    ("ABC", DeviceKind::Camera),
    ("FB", DeviceKind::Camera),
    ("AVD", DeviceKind::Generic),
];

/// 根据注册报文创建对应类型的设备
pub struct DeviceFactory;

impl DeviceFactory {
    /// 按型号前缀解析设备类别
    pub fn resolve_kind(model_number: &str) -> Option<DeviceKind> {
        MODEL_PREFIXES
            .iter()
            .find(|(prefix, _)| model_number.starts_with(*prefix))
            .map(|(_, kind)| *kind)
    }

    /// 创建设备，`status` 为空
    ///
    /// 型号不在前缀表中时返回 [`GatewayError::UnknownDeviceModel`]，
    /// 缺少序列号或型号字段时返回协议错误。
    pub fn create(ip: &str, registration: Message) -> Result<Device> {
        let model_number = registration
            .get_str("SystemModelNumber")
            .ok_or(ProtocolError::MissingField("SystemModelNumber"))?;
        let kind = Self::resolve_kind(model_number)
            .ok_or_else(|| GatewayError::UnknownDeviceModel(model_number.to_string()))?;

        Ok(Device::new(kind, ip, registration)?)
    }
}
