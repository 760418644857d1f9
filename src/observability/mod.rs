//! 可观测性：tracing 订阅器初始化
//!
//! 日志写到 stderr，避免与交互输出混在一起；RUST_LOG 存在时覆盖配置中的级别。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSection;

pub fn init(logging: &LoggingSection) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {e}");
    }
}
