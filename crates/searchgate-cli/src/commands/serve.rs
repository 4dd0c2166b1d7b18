//! `serve` command - run the HTTP gateway until Ctrl-C

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;

use searchgate_core::config::{DEFAULT_BIND_ADDR, DEFAULT_UPSTREAM_TIMEOUT_SECS};
use searchgate_core::{GatewayConfig, ProviderRegistry, SearchGateway};

use super::Context;
use crate::api::{self, AppState};
use crate::output::{print_info, print_warning};

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "SEARCHGATE_BIND", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    /// Upstream request timeout in seconds
    #[arg(long, env = "SEARCHGATE_UPSTREAM_TIMEOUT_SECS", default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECS)]
    pub upstream_timeout: u64,

    /// Token required on admin routes (falls back to ADMIN_TOKEN)
    #[arg(long, env = "SEARCHGATE_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,
}

impl ServeArgs {
    fn into_config(self) -> GatewayConfig {
        let admin_token = self.admin_token.or_else(|| std::env::var("ADMIN_TOKEN").ok());
        GatewayConfig {
            bind_addr: self.bind,
            upstream_timeout_secs: self.upstream_timeout,
            admin_token,
        }
        .validate()
    }
}

pub async fn execute(ctx: &Context, args: ServeArgs) -> Result<()> {
    let config = args.into_config();
    let addr = config.socket_addr()?;

    let registry = ProviderRegistry::new(&ctx.db);
    let gateway = SearchGateway::new(registry.clone(), &config)?;
    let state = AppState {
        registry,
        gateway: Arc::new(gateway),
        admin_token: config.admin_token.as_deref().map(Arc::from),
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    log::info!(
        "[api] Serving with database {} (upstream timeout {}s)",
        ctx.db_path.display(),
        config.upstream_timeout_secs
    );
    if config.admin_token.is_none() {
        print_warning("No admin token configured; admin routes are open", ctx.quiet);
    }
    print_info(&format!("searchgate listening on http://{}", addr), ctx.quiet);

    axum::serve(listener, api::create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    print_info("Shut down", ctx.quiet);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("[api] Failed to listen for Ctrl-C: {}", e);
    }
}
