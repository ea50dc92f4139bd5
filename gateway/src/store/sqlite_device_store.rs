use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::debug;

use super::DeviceStore;
use crate::device::{DeviceRecord, UNKNOWN_IP};
use crate::error::Result;

#[derive(Clone)]
pub struct SqliteDeviceStore {
    pool: SqlitePool,
}

impl SqliteDeviceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 建表和索引
    ///
    /// IP 唯一性只约束非 `UNKNOWN` 的记录，多条失效记录可以共存。
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                serial_number TEXT PRIMARY KEY NOT NULL,
                ip TEXT NOT NULL,
                hostname TEXT NOT NULL,
                status TEXT,
                registration TEXT,
                friendly_name TEXT,
                registered BOOLEAN NOT NULL DEFAULT 0,
                last_seen INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_devices_ip ON devices (ip) WHERE ip <> 'UNKNOWN'",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_devices_friendly_name ON devices (friendly_name)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn record_from_row(row: SqliteRow) -> DeviceRecord {
    DeviceRecord {
        ip: row.get("ip"),
        serial_number: row.get("serial_number"),
        hostname: row.get("hostname"),
        status: row.get("status"),
        registration: row.get("registration"),
        friendly_name: row.get("friendly_name"),
        registered: row.get("registered"),
        last_seen: row.get("last_seen"),
    }
}

#[async_trait]
impl DeviceStore for SqliteDeviceStore {
    async fn get(&self, serial_number: &str) -> Result<Option<DeviceRecord>> {
        debug!("查询设备: serial_number={}", serial_number);

        let row = sqlx::query(
            r#"
            SELECT ip, serial_number, hostname, status, registration,
                   friendly_name, registered, last_seen
            FROM devices
            WHERE serial_number = ?
            "#,
        )
        .bind(serial_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(record_from_row))
    }

    async fn get_by_ip(&self, ip: &str) -> Result<Option<DeviceRecord>> {
        debug!("按 IP 查询设备: ip={}", ip);

        let row = sqlx::query(
            r#"
            SELECT ip, serial_number, hostname, status, registration,
                   friendly_name, registered, last_seen
            FROM devices
            WHERE ip = ?
            "#,
        )
        .bind(ip)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(record_from_row))
    }

    async fn put(&self, record: &DeviceRecord) -> Result<u64> {
        debug!(
            "写入设备: serial_number={}, ip={}",
            record.serial_number, record.ip
        );

        let mut tx = self.pool.begin().await?;

        let released = if record.ip == UNKNOWN_IP {
            0
        } else {
            sqlx::query("UPDATE devices SET ip = ? WHERE ip = ? AND serial_number <> ?")
                .bind(UNKNOWN_IP)
                .bind(&record.ip)
                .bind(&record.serial_number)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        };

        sqlx::query(
            r#"
            INSERT INTO devices (
                ip, serial_number, hostname, status, registration,
                friendly_name, registered, last_seen
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(serial_number) DO UPDATE SET
                ip = excluded.ip,
                hostname = excluded.hostname,
                status = excluded.status,
                registration = excluded.registration,
                friendly_name = excluded.friendly_name,
                registered = excluded.registered,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(&record.ip)
        .bind(&record.serial_number)
        .bind(&record.hostname)
        .bind(&record.status)
        .bind(&record.registration)
        .bind(&record.friendly_name)
        .bind(record.registered)
        .bind(record.last_seen)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(released)
    }

    async fn delete(&self, ip: &str, serial_number: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM devices WHERE ip = ? AND serial_number = ?")
            .bind(ip)
            .bind(serial_number)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<DeviceRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT ip, serial_number, hostname, status, registration,
                   friendly_name, registered, last_seen
            FROM devices
            ORDER BY serial_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(record_from_row).collect())
    }
}
