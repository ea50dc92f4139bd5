use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::task::JoinSet;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arlo_gateway::channel::TcpCommandChannel;
use arlo_gateway::config::GatewayConfig;
use arlo_gateway::listener;
use arlo_gateway::notifier::WebhookNotifier;
use arlo_gateway::registry::DeviceRegistry;
use arlo_gateway::session::GatewayState;
use arlo_gateway::store::SqliteDeviceStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenv::dotenv().ok();

    // 加载配置
    let config = GatewayConfig::from_env();

    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("arlo_gateway={},sqlx=warn", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("启动 Arlo 网关服务...");
    info!("  - 数据库: {}", config.database_url);
    info!("  - 接入端口: {:?}", config.listen_ports);
    info!("  - WiFi 国家码: {}", config.wifi_country_code);
    info!("  - 默认画质: {}", config.video_quality_default);
    info!("  - 设备覆盖设置: {} 条", config.device_settings.len());
    info!("  - Webhook 数量: {}", config.webhook_urls.len());

    // 初始化数据库
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("DATABASE_URL 无效")?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_pool_size)
        .connect_with(options)
        .await
        .context("连接数据库失败")?;

    let store = SqliteDeviceStore::new(pool);
    store.migrate().await.context("初始化数据库失败")?;
    info!("数据库初始化完成");

    let notifier = WebhookNotifier::new(
        config.webhook_urls.clone(),
        Duration::from_millis(config.webhook_timeout_ms),
    )
    .context("创建 Webhook 客户端失败")?;

    // 创建网关状态
    let state = Arc::new(GatewayState {
        registry: Arc::new(DeviceRegistry::new(Arc::new(store))),
        channel: Arc::new(TcpCommandChannel::new(Duration::from_millis(
            config.command_timeout_ms,
        ))),
        notifier: Arc::new(notifier),
        config: config.clone(),
    });

    // 绑定端口失败直接退出
    let mut servers = JoinSet::new();
    for port in &config.listen_ports {
        let device_listener = listener::bind(&config.listen_addr, *port)
            .await
            .with_context(|| format!("绑定端口 {} 失败", port))?;
        servers.spawn(listener::serve(device_listener, state.clone()));
    }

    info!("Arlo 网关已启动");

    while let Some(result) = servers.join_next().await {
        result??;
    }

    Ok(())
}
