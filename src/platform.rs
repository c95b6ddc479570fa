use std::path::PathBuf;

use crate::error::{CookieError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Mac,
    Windows,
}

impl Platform {
    /// Classify an OS identifier such as `std::env::consts::OS`.
    pub fn from_os(os: &str) -> Result<Self> {
        let os = os.to_lowercase();
        if os.contains("linux") {
            Ok(Platform::Linux)
        } else if os == "macos" || os.contains("darwin") {
            Ok(Platform::Mac)
        } else if matches!(os.as_str(), "windows" | "win32" | "cygwin") {
            Ok(Platform::Windows)
        } else {
            Err(CookieError::UnsupportedPlatform(os))
        }
    }

    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn id(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Windows => "windows",
        }
    }
}

/// Per-platform path templates for one browser. `~` stands for the home directory.
#[derive(Debug, Clone, Copy)]
pub struct DefaultPaths {
    pub linux: &'static str,
    pub mac: &'static str,
    pub windows: &'static str,
}

impl DefaultPaths {
    pub fn for_platform(&self, platform: Platform) -> &'static str {
        match platform {
            Platform::Linux => self.linux,
            Platform::Mac => self.mac,
            Platform::Windows => self.windows,
        }
    }
}

fn home_dir() -> Result<PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var_os(var)
        .map(PathBuf::from)
        .ok_or_else(|| CookieError::UnsupportedPlatform(format!("{} is not set", var)))
}

/// Replace a leading `~` with the user's home directory.
pub fn expand_home(template: &str) -> Result<PathBuf> {
    match template.strip_prefix('~') {
        Some(rest) => {
            let rest = rest.trim_start_matches(['/', '\\']);
            let mut path = home_dir()?;
            for part in rest.split(['/', '\\']).filter(|p| !p.is_empty()) {
                path.push(part);
            }
            Ok(path)
        }
        None => Ok(PathBuf::from(template)),
    }
}
