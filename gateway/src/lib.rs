//! 本地设备网关
//!
//! 摄像头和安防设备通过原始 TCP 向网关注册、上报状态和告警，网关再反向连接设备下发命令。

pub mod channel;
pub mod config;
pub mod control;
pub mod device;
pub mod error;
pub mod listener;
pub mod notifier;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod store;

pub use error::{GatewayError, ProtocolError, Result};
