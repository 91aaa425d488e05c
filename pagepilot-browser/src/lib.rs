//! Shared browser resource: one page behind an exclusive lease, with liveness
//! probing and recreation of dead pages.

pub mod chrome;
pub mod driver;
pub mod error;
pub mod manager;

pub use chrome::{ChromeDriver, ChromeSettings};
pub use driver::{BrowserDriver, MouseButton, PageActions, Viewport};
pub use error::BrowserError;
pub use manager::{PageLease, RecoveryPolicy, ResourceManager};
