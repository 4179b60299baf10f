//! IRC protocol layer: line framing, the connection, registration, inbound
//! parsing, outbound splitting and CTCP replies.

pub mod codec;
pub mod ctcp;
pub mod message;
pub mod outbound;
pub mod registration;
pub mod transport;
