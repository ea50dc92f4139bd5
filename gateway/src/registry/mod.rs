//! 设备注册表
//!
//! 所有读写都在同一个互斥域内执行，入站会话和控制面共用一个实例。
//! 这里只保证单次 resolve / upsert / delete 的原子性，
//! 跨越整个报文处理过程的读-改-写仍然是后写者胜出。

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::device::{Device, DeviceRecord, DeviceSummary, UNKNOWN_IP};
use crate::error::Result;
use crate::protocol::Message;
use crate::store::DeviceStore;

mod factory;

pub use factory::DeviceFactory;

pub struct DeviceRegistry {
    store: Arc<dyn DeviceStore>,
    lock: Mutex<()>,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// 工厂方法，见 [`DeviceFactory::create`]
    pub fn create(ip: &str, registration: Message) -> Result<Device> {
        DeviceFactory::create(ip, registration)
    }

    pub async fn resolve_by_serial(&self, serial_number: &str) -> Result<Option<Device>> {
        let _guard = self.lock.lock().await;
        let record = self.store.get(serial_number).await?;
        Ok(record.and_then(device_from_record))
    }

    /// `UNKNOWN` 占位 IP 永远解析不到设备
    pub async fn resolve_by_ip(&self, ip: &str) -> Result<Option<Device>> {
        if ip == UNKNOWN_IP {
            return Ok(None);
        }
        let _guard = self.lock.lock().await;
        let record = self.store.get_by_ip(ip).await?;
        Ok(record.and_then(device_from_record))
    }

    /// 写入设备，同时释放其他记录占用的同一 IP
    pub async fn upsert(&self, device: &Device) -> Result<()> {
        let _guard = self.lock.lock().await;
        let released = self.store.put(&device.to_record()).await?;
        if released > 0 {
            info!(
                "IP {} 已被 {} 占用，{} 条旧记录标记为 {}",
                device.ip, device.serial_number, released, UNKNOWN_IP
            );
        }
        Ok(())
    }

    /// 只有 IP 和序列号都与存储一致时才删除
    pub async fn delete(&self, device: &Device) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let deleted = self.store.delete(&device.ip, &device.serial_number).await?;
        if !deleted {
            debug!(
                "没有匹配的记录可删除: serial_number={}, ip={}",
                device.serial_number, device.ip
            );
        }
        Ok(deleted)
    }

    pub async fn list(&self) -> Result<Vec<DeviceSummary>> {
        let _guard = self.lock.lock().await;
        let records = self.store.list_all().await?;
        Ok(records.into_iter().map(DeviceSummary::from).collect())
    }
}

/// 还原设备；注册报文缺失或型号已不可识别时丢弃该记录
fn device_from_record(record: DeviceRecord) -> Option<Device> {
    let registration = match record.registration.as_deref().map(Message::from_json) {
        Some(Ok(registration)) => registration,
        Some(Err(e)) => {
            warn!(
                "设备 {} 的注册报文无法解析: {}",
                record.serial_number, e
            );
            return None;
        }
        None => {
            warn!("设备 {} 的记录缺少注册报文", record.serial_number);
            return None;
        }
    };

    let mut device = match DeviceFactory::create(&record.ip, registration) {
        Ok(device) => device,
        Err(e) => {
            warn!("设备 {} 的记录无法还原: {}", record.serial_number, e);
            return None;
        }
    };

    device.status = match record.status.as_deref().map(Message::from_json) {
        Some(Ok(status)) => Some(status),
        Some(Err(e)) => {
            warn!("设备 {} 的状态报文无法解析: {}", record.serial_number, e);
            None
        }
        None => None,
    };
    device.hostname = record.hostname;
    device.friendly_name = record.friendly_name;
    device.registered = record.registered;
    device.last_seen = record.last_seen;
    Some(device)
}
