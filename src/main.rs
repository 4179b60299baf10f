mod app;
mod config;
mod irc;
mod logging;
mod modules;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::app::dispatch::Dispatcher;
use crate::irc::outbound::Outbound;
use crate::irc::registration::Registration;
use crate::irc::transport::LineTransport;

#[tokio::main]
async fn main() -> Result<()> {
    // Optional config path as the only argument
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let cfg = Arc::new(config::load_config(path.as_deref())?);

    logging::init(&cfg.logging);

    let server = &cfg.server;
    let mut transport = LineTransport::connect(&server.host, server.port)
        .await?
        .with_wire_logging(cfg.logging.wire);

    let mut registration = Registration::new(&mut transport, server);
    let state = match registration.run().await {
        Ok(state) => state,
        Err(e) => {
            error!(state = ?registration.state(), "registration failed: {}", e);
            return Err(e).context("registration failed");
        }
    };
    info!(?state, channels = server.channels.len(), "registered");

    let out = Outbound::new(transport.sender(), &server.nickname);
    let dispatcher = Dispatcher::from_config(&cfg, out)?;
    info!(modules = ?dispatcher.module_names(), "dispatching");

    app::run(transport, Arc::new(dispatcher)).await
}
