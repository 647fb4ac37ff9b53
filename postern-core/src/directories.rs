//! Server directory layout
//!
//! The paths are decided once at startup and read everywhere else. Until
//! [`Directories::install`] is called, [`Directories::get`] hands out the
//! platform defaults.

use std::path::PathBuf;
use std::sync::OnceLock;

static DIRECTORIES: OnceLock<Directories> = OnceLock::new();

/// Directories used by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directories {
    /// Data that must survive restarts (queues, databases)
    pub state: PathBuf,
    /// Sockets and other data that lives as long as the process.
    /// Relative unix socket endpoints are resolved against it.
    pub runtime: PathBuf,
    /// Helper binaries
    pub libexec: PathBuf,
}

impl Directories {
    /// Platform defaults: `$XDG_RUNTIME_DIR/postern` and friends, falling
    /// back to the temporary directory when the platform has none.
    pub fn from_platform() -> Self {
        Self {
            state: dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join("postern"),
            runtime: dirs::runtime_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("postern"),
            libexec: PathBuf::from("/usr/lib/postern"),
        }
    }

    /// Fix the process-wide layout.
    ///
    /// Returns the rejected value if the layout was already fixed, either by
    /// an earlier `install` or by a [`Directories::get`] call.
    pub fn install(self) -> Result<(), Self> {
        tracing::debug!("📁 Using runtime directory {:?}", self.runtime);
        DIRECTORIES.set(self)
    }

    /// The process-wide layout
    pub fn get() -> &'static Directories {
        DIRECTORIES.get_or_init(Self::from_platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_defaults_are_absolute() {
        let dirs = Directories::from_platform();
        assert!(dirs.runtime.is_absolute());
        assert!(dirs.state.is_absolute());
        assert!(dirs.runtime.ends_with("postern"));
    }

    #[test]
    fn test_get_is_stable() {
        let first = Directories::get();
        let second = Directories::get();
        assert!(std::ptr::eq(first, second));
        assert!(Directories::from_platform().install().is_err());
    }
}
