//! 集成测试共用的替身组件
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use arlo_gateway::channel::CommandChannel;
use arlo_gateway::config::GatewayConfig;
use arlo_gateway::device::Device;
use arlo_gateway::error::{GatewayError, Result};
use arlo_gateway::notifier::Notifier;
use arlo_gateway::protocol::Message;
use arlo_gateway::registry::DeviceRegistry;
use arlo_gateway::session::GatewayState;
use arlo_gateway::store::SqliteDeviceStore;
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;

/// 一条已下发的命令
#[derive(Debug, Clone)]
pub struct Sent {
    pub ip: String,
    pub port: u16,
    pub message: Message,
}

/// 记录所有命令，可以配置从第 n 条开始失败
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
    fail_from: Option<usize>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 前 `n` 条成功，之后全部失败
    pub fn failing_after(n: usize) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_from: Some(n),
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|sent| sent.message.get_str("Type").unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl CommandChannel for RecordingChannel {
    async fn send(&self, ip: &str, port: u16, message: Message) -> Result<()> {
        let mut sent = self.sent.lock().unwrap();
        if self.fail_from.is_some_and(|n| sent.len() >= n) {
            return Err(GatewayError::transmission(
                format!("{}:{}", ip, port),
                "connection refused",
            ));
        }
        sent.push(Sent {
            ip: ip.to_string(),
            port,
            message,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Registration(String),
    Status(String, Message),
    Motion(String, Vec<Value>),
    Audio(String),
    Button(String, bool),
    MotionTimeout(String),
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Event>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 记录事件后返回失败
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: Event) -> Result<()> {
        self.events.lock().unwrap().push(event);
        if self.fail {
            Err(GatewayError::validation("webhook unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn registration_received(&self, device: &Device) -> Result<()> {
        self.record(Event::Registration(device.serial_number.clone()))
    }

    async fn status_received(&self, device: &Device, status: &Message) -> Result<()> {
        self.record(Event::Status(device.serial_number.clone(), status.clone()))
    }

    async fn motion_detected(&self, device: &Device, zones: &[Value]) -> Result<()> {
        self.record(Event::Motion(device.serial_number.clone(), zones.to_vec()))
    }

    async fn audio_detected(&self, device: &Device) -> Result<()> {
        self.record(Event::Audio(device.serial_number.clone()))
    }

    async fn button_pressed(&self, device: &Device, triggered: bool) -> Result<()> {
        self.record(Event::Button(device.serial_number.clone(), triggered))
    }

    async fn motion_timeout(&self, device: &Device) -> Result<()> {
        self.record(Event::MotionTimeout(device.serial_number.clone()))
    }
}

/// 单连接内存 SQLite，连接不回收以保留数据
pub async fn memory_store() -> SqliteDeviceStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory database");
    let store = SqliteDeviceStore::new(pool);
    store.migrate().await.expect("migrate");
    store
}

pub async fn memory_registry() -> Arc<DeviceRegistry> {
    Arc::new(DeviceRegistry::new(Arc::new(memory_store().await)))
}

pub fn message(value: Value) -> Message {
    Message::from_value(value).expect("test message must be an object")
}

pub fn registration(id: u64, serial: &str, model: &str) -> Message {
    message(json!({
        "ID": id,
        "Type": "registration",
        "SystemSerialNumber": serial,
        "SystemModelNumber": model,
        "SystemFirmwareVersion": "1.2.3"
    }))
}

pub fn device(ip: &str, serial: &str, model: &str) -> Device {
    DeviceRegistry::create(ip, registration(1, serial, model)).expect("known model")
}

pub fn gateway_state(
    registry: Arc<DeviceRegistry>,
    channel: Arc<RecordingChannel>,
    notifier: Arc<RecordingNotifier>,
    config: GatewayConfig,
) -> Arc<GatewayState> {
    Arc::new(GatewayState {
        registry,
        channel,
        notifier,
        config,
    })
}
