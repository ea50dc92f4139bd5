use std::collections::HashMap;
use std::env;

use serde_json::{Map, Value};

/// 每类事件是否推送通知
#[derive(Debug, Clone, PartialEq)]
pub struct NotifySettings {
    pub motion_alert: bool,
    pub motion_timeout_alert: bool,
    pub audio_alert: bool,
    pub button_press_alert: bool,
    /// 注册和状态上报
    pub registration_and_status: bool,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            motion_alert: true,
            motion_timeout_alert: false,
            audio_alert: false,
            button_press_alert: true,
            registration_and_status: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 数据库连接 URL
    pub database_url: String,

    /// 数据库连接池大小
    pub db_pool_size: u32,

    /// 监听地址
    pub listen_addr: String,

    /// 设备接入端口
    pub listen_ports: Vec<u16>,

    /// 日志级别
    pub log_level: String,

    /// 下发给设备的 WiFi 国家码
    pub wifi_country_code: String,

    /// 防闪烁频率（50 / 60）
    pub video_anti_flicker_rate: u32,

    /// 注册后应用的默认画质，`default` 表示最高档
    pub video_quality_default: String,

    pub notify: NotifySettings,

    /// 按序列号覆盖的初始寄存器设置
    pub device_settings: HashMap<String, Map<String, Value>>,

    /// Webhook 地址
    pub webhook_urls: Vec<String>,

    /// Webhook 请求超时时间（毫秒）
    pub webhook_timeout_ms: u64,

    /// 下发命令等待确认的超时时间（毫秒）
    pub command_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://arlo.db".to_string(),
            db_pool_size: 5,
            listen_addr: "0.0.0.0".to_string(),
            listen_ports: vec![4000, 4100],
            log_level: "info".to_string(),
            wifi_country_code: "US".to_string(),
            video_anti_flicker_rate: 60,
            video_quality_default: "default".to_string(),
            notify: NotifySettings::default(),
            device_settings: HashMap::new(),
            webhook_urls: Vec::new(),
            webhook_timeout_ms: 5000,
            command_timeout_ms: 10000,
        }
    }
}

impl GatewayConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let notify = NotifySettings {
            motion_alert: env_parse("NOTIFY_ON_MOTION_ALERT", defaults.notify.motion_alert),
            motion_timeout_alert: env_parse(
                "NOTIFY_ON_MOTION_TIMEOUT_ALERT",
                defaults.notify.motion_timeout_alert,
            ),
            audio_alert: env_parse("NOTIFY_ON_AUDIO_ALERT", defaults.notify.audio_alert),
            button_press_alert: env_parse(
                "NOTIFY_ON_BUTTON_PRESS_ALERT",
                defaults.notify.button_press_alert,
            ),
            registration_and_status: env_parse(
                "NOTIFY_REGISTERED_AND_STATUS_UPDATE",
                defaults.notify.registration_and_status,
            ),
        };

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),

            db_pool_size: env_parse("DB_POOL_SIZE", defaults.db_pool_size),

            listen_addr: env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),

            listen_ports: env::var("LISTEN_PORTS")
                .ok()
                .and_then(|s| parse_ports(&s))
                .unwrap_or(defaults.listen_ports),

            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),

            wifi_country_code: env::var("WIFI_COUNTRY_CODE").unwrap_or(defaults.wifi_country_code),

            video_anti_flicker_rate: env_parse(
                "VIDEO_ANTI_FLICKER_RATE",
                defaults.video_anti_flicker_rate,
            ),

            video_quality_default: env::var("VIDEO_QUALITY_DEFAULT")
                .unwrap_or(defaults.video_quality_default),

            notify,

            device_settings: env::var("DEVICE_SETTINGS")
                .ok()
                .and_then(|s| parse_device_settings(&s))
                .unwrap_or_default(),

            webhook_urls: env::var("WEBHOOK_URLS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),

            webhook_timeout_ms: env_parse("WEBHOOK_TIMEOUT_MS", defaults.webhook_timeout_ms),

            command_timeout_ms: env_parse("COMMAND_TIMEOUT_MS", defaults.command_timeout_ms),
        }
    }

    /// 某台设备的覆盖设置
    pub fn settings_for(&self, serial_number: &str) -> Option<&Map<String, Value>> {
        self.device_settings.get(serial_number)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_ports(value: &str) -> Option<Vec<u16>> {
    let ports = split_list(value)
        .iter()
        .map(|s| s.parse().ok())
        .collect::<Option<Vec<u16>>>()?;
    if ports.is_empty() {
        None
    } else {
        Some(ports)
    }
}

/// `{"<serial>": {"VideoQuality": "high", ...}}`
fn parse_device_settings(value: &str) -> Option<HashMap<String, Map<String, Value>>> {
    serde_json::from_str(value).ok()
}
