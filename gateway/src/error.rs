//! 网关错误类型

/// Result 类型别名
pub type Result<T> = std::result::Result<T, GatewayError>;

/// 线路协议错误（帧格式或报文内容不合法）
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 帧头缺少 `L:` 前缀
    #[error("frame header does not start with 'L:'")]
    MissingPrefix,

    /// 长度字段不是合法的十进制数
    #[error("invalid frame length: {0:?}")]
    InvalidLength(String),

    /// 帧长度超过上限
    #[error("frame length {0} exceeds limit")]
    FrameTooLarge(usize),

    /// 帧头过长，或者对端在帧中途断开
    #[error("truncated frame")]
    Truncated,

    /// JSON 解析失败
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// 报文不是 JSON 对象
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// 缺少必需字段
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// 读写 socket 失败
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 网关错误
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 入站报文格式错误
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 注册报文中的型号不在已知前缀表中
    #[error("unknown device model: {0}")]
    UnknownDeviceModel(String),

    /// 按序列号或 IP 找不到设备记录
    #[error("unresolved device: {0}")]
    UnresolvedDevice(String),

    /// 向设备下发命令失败（连接、发送或等待确认）
    #[error("command transmission to {target} failed: {reason}")]
    CommandTransmission { target: String, reason: String },

    /// 命令参数缺失或取值非法
    #[error("validation error: {0}")]
    Validation(String),

    /// 设备类型不支持该命令
    #[error("device {serial} does not support {operation}")]
    UnsupportedOperation {
        serial: String,
        operation: &'static str,
    },

    /// 数据库错误
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Webhook 请求错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn transmission(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::CommandTransmission {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
