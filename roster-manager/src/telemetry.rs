use tracing_subscriber::{fmt, EnvFilter};

/// fmt サブスクライバを入れる。RUST_LOG があればそちらを優先する。
/// 2 回目以降の呼び出しは何もしない
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
