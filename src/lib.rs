//! Browser cookie jar management.
//!
//! Locates, reads and edits the SQLite cookie databases of desktop browsers
//! through one [`CookieManager`], with the browser specific SQL supplied by a
//! [`CookieDialect`] per browser family.

pub mod browsers;
pub mod cookie;
pub mod error;
pub mod manager;
pub mod platform;
pub mod schema;
pub mod timestamp;

pub use browsers::{Browser, Chrome, Firefox};
pub use cookie::{CookieRecord, NewCookie};
pub use error::{CookieError, Result};
pub use manager::{BrowserProfile, CookieDialect, CookieManager, RowFilter, SqlCommand};
pub use platform::Platform;
pub use schema::SchemaDescriptor;
