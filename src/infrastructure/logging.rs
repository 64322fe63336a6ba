use std::io;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{config::AppConfig, infrastructure::directories::ResolvedPaths};

/// HTTP client noise from long polling, capped regardless of `LOG_LEVEL`.
const QUIET_DEPENDENCIES: &str = "hyper=warn,reqwest=warn";

static INIT: OnceCell<()> = OnceCell::new();
static GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// `RUST_LOG` wins when it parses; otherwise `LOG_LEVEL` plus the dependency caps.
fn build_env_filter(rust_log: Option<&str>, level: &str) -> EnvFilter {
    if let Some(filter) = rust_log.and_then(|raw| EnvFilter::try_new(raw).ok()) {
        return filter;
    }
    EnvFilter::try_new(format!("{level},{QUIET_DEPENDENCIES}"))
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{QUIET_DEPENDENCIES}")))
}

pub fn init_tracing(config: &AppConfig, paths: &ResolvedPaths) -> Result<()> {
    INIT.get_or_try_init::<_, anyhow::Error>(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        let env_filter = build_env_filter(rust_log.as_deref(), &config.logging.level);

        let file_appender =
            tracing_appender::rolling::daily(&paths.logs_dir, &config.logging.file_name);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        let _ = GUARD.set(guard);

        let console_layer = fmt::layer()
            .with_writer(io::stdout)
            .with_target(true)
            .with_ansi(true);

        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        tracing::info!(
            target: "lifecycle",
            logs = %paths.logs_dir.join(&config.logging.file_name).display(),
            level = %config.logging.level,
            rust_log = rust_log.is_some(),
            "tracing initialized"
        );
        Ok(())
    })?;
    Ok(())
}
