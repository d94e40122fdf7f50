//! Shared networking constants and helpers used by host and display.

/// TCP port the host listens on for display connections.
pub const HOST_PORT: u16 = 8080;

/// Helper to format an address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}
