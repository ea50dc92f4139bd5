use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// 报文类型（`Type` 字段）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    Registration,
    Status,
    Alert,
    LogMessage,
    Response,
    /// 其他类型，保留原始字符串用于日志
    Other(String),
}

impl MessageType {
    pub fn parse(value: &str) -> Self {
        match value {
            "registration" => Self::Registration,
            "status" => Self::Status,
            "alert" => Self::Alert,
            "logMessage" => Self::LogMessage,
            "response" => Self::Response,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Registration => "registration",
            Self::Status => "status",
            Self::Alert => "alert",
            Self::LogMessage => "logMessage",
            Self::Response => "response",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 协议报文
///
/// 报文本身是一个可变的 JSON 对象：`ID`、`Type` 加上各类型自己的字段。
/// 编解码层不解释 `Type`，只负责分帧。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// 从任意 JSON 值构造，要求是对象
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ProtocolError::NotAnObject),
        }
    }

    /// 从持久化或线路上的文本形式解析
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    /// 序列化为紧凑 JSON 文本
    pub fn to_json(&self) -> String {
        self.to_string()
    }

    pub fn id(&self) -> Option<&Value> {
        self.0.get("ID")
    }

    pub fn set_id(&mut self, id: impl Into<Value>) {
        self.0.insert("ID".to_string(), id.into());
    }

    pub fn message_type(&self) -> MessageType {
        MessageType::parse(self.get_str("Type").unwrap_or_default())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// 命令报文的 `SetValues`
    pub fn set_values(&self) -> Option<&Map<String, Value>> {
        self.0.get("SetValues").and_then(Value::as_object)
    }

    /// 取得可写的 `SetValues`，不存在或不是对象时替换为空对象
    pub fn set_values_mut(&mut self) -> &mut Map<String, Value> {
        let slot = self
            .0
            .entry("SetValues")
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(map) => map,
            _ => unreachable!("SetValues was just replaced with an object"),
        }
    }

    /// 整体替换 `SetValues`
    pub fn replace_set_values(&mut self, values: Map<String, Value>) {
        self.0.insert("SetValues".to_string(), Value::Object(values));
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl From<Map<String, Value>> for Message {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
