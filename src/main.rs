use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use geotalk::{
    AppState,
    cache::{BucketStore, MemoryBucketStore, RedisBucketStore},
    config::Config,
    index::ProximityIndex,
    routes,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 使用进程内存储代替 Redis 的地址
const IN_MEMORY_URL: &str = "memory://";

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 存储客户端只在这里创建一次，之后注入索引
    let store: Arc<dyn BucketStore> = if config.redis_url == IN_MEMORY_URL {
        tracing::warn!("Using in-process bucket store, messages are lost on restart");
        Arc::new(MemoryBucketStore::new())
    } else {
        let redis_client =
            redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
        let store = RedisBucketStore::connect(&redis_client, config.store_timeout())
            .await
            .expect("Failed to connect to Redis");
        Arc::new(store)
    };

    let index = ProximityIndex::new(store, config.index_settings());
    tracing::info!(
        "Index ready: ttl={}s, limit per bucket={}, precision={}",
        config.message_ttl().num_seconds(),
        index.settings().limit_per_bucket,
        index.settings().precision
    );

    let state = AppState {
        config: config.clone(),
        index: Arc::new(index),
    };
    let app = routes::router(state);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .await
    .expect("Failed to start server");
}
