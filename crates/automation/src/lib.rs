//! Browser automation against the booking site.
//!
//! The crate is split along the seam the fragile parts live behind:
//! [`driver`] abstracts a browser-like context (navigate, wait, click,
//! cookies), [`selectors`] owns the site's markup contract, [`step`] turns
//! login/booking flows into declarative stage-tagged sequences, and
//! [`client`] is the state machine that runs them. The production [`cdp`]
//! driver speaks Chrome DevTools Protocol over a WebSocket.

pub mod api;
pub mod cdp;
pub mod client;
pub mod driver;
pub mod error;
pub mod selectors;
pub mod stage;
pub mod step;

pub use api::AutomationApi;
pub use client::{Client, ClientConfig};
pub use driver::{Driver, DriverError, Locator};
pub use error::AutomationError;
pub use stage::Stage;

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, AutomationError>;
