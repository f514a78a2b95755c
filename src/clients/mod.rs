pub mod auth;
pub mod currency;
pub mod hubspot;
pub mod sheets;
pub mod types;

pub use auth::*;
pub use currency::*;
pub use hubspot::*;
pub use sheets::*;

use std::time::Duration;

/// Default HTTP request timeout
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
