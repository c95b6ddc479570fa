//! Supported browser cookie jars

pub mod chrome;
pub mod firefox;

use std::fmt;
use std::str::FromStr;

pub use chrome::{Chrome, CHROME};
pub use firefox::{Firefox, FIREFOX};

use crate::manager::CookieDialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    Chrome,
    Firefox,
}

impl Browser {
    pub fn all() -> [Browser; 2] {
        [Browser::Chrome, Browser::Firefox]
    }

    pub fn name(&self) -> &'static str {
        self.dialect().profile().name
    }

    pub fn dialect(&self) -> Box<dyn CookieDialect> {
        match self {
            Browser::Chrome => Box::new(Chrome),
            Browser::Firefox => Box::new(Firefox),
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chrome" | "chromium" | "google-chrome" => Ok(Browser::Chrome),
            "firefox" | "mozilla" => Ok(Browser::Firefox),
            other => Err(format!(
                "Unknown browser: {}. Use 'chrome' or 'firefox'",
                other
            )),
        }
    }
}
