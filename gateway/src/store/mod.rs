use async_trait::async_trait;

use crate::device::DeviceRecord;
use crate::error::Result;

mod sqlite_device_store;

pub use sqlite_device_store::SqliteDeviceStore;

/// 设备记录存储
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get(&self, serial_number: &str) -> Result<Option<DeviceRecord>>;

    async fn get_by_ip(&self, ip: &str) -> Result<Option<DeviceRecord>>;

    /// 按序列号整体替换记录
    ///
    /// 同一事务内先把其他占用该 IP 的记录改为 `UNKNOWN`，返回被释放的条数。
    /// 写入失败时整个事务回滚。
    async fn put(&self, record: &DeviceRecord) -> Result<u64>;

    /// 删除 IP 和序列号都匹配的记录
    async fn delete(&self, ip: &str, serial_number: &str) -> Result<bool>;

    async fn list_all(&self) -> Result<Vec<DeviceRecord>>;
}
