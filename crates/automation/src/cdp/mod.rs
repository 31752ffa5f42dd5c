//! Chrome DevTools Protocol driver.
//!
//! One WebSocket connection per client, one dedicated incognito browser
//! context per user, so no automation state is ever shared across users.

mod connection;
mod driver;

pub use connection::CdpConnection;
pub use driver::CdpDriver;
