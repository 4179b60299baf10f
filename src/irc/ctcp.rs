//! CTCP request handling.
//!
//! Messages wrapped in `\x01` never reach the module chain. Requests the
//! config allows are answered with a `NOTICE` to the sender; everything
//! else (including `ACTION`) is ignored.

use chrono::Local;
use tracing::debug;

use super::message::{ChatEvent, CTCP_DELIM};
use super::outbound::Outbound;
use super::transport::TransportError;
use crate::config::CtcpConfig;

/// Build the reply for one CTCP request body (delimiters already stripped).
pub fn reply_for(config: &CtcpConfig, ctcp: &str) -> Option<String> {
    let (command, arg) = ctcp.split_once(' ').unwrap_or((ctcp, ""));

    match command.to_uppercase().as_str() {
        "VERSION" if config.reply_version => Some(format!("VERSION {}", config.version_string)),
        "PING" if config.reply_ping => Some(format!("PING {}", arg)),
        "TIME" if config.reply_time => Some(format!(
            "TIME {}",
            Local::now().format("%a %b %d %H:%M:%S %Y")
        )),
        "FINGER" if config.reply_finger => Some(format!("FINGER {}", config.finger_string)),
        _ => None,
    }
}

/// Answer the CTCP request carried by `event`, if any.
pub async fn handle_request(
    config: &CtcpConfig,
    event: &ChatEvent,
    out: &Outbound,
) -> Result<(), TransportError> {
    let ctcp = event.body.trim_matches(CTCP_DELIM);
    debug!(sender = %event.sender, request = %ctcp, "CTCP request");

    if let Some(response) = reply_for(config, ctcp) {
        let wrapped = format!("{}{}{}", CTCP_DELIM, response, CTCP_DELIM);
        out.notice(&wrapped, &event.sender).await?;
    }
    Ok(())
}
