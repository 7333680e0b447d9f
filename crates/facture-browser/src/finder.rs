use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Locates the Chrome binary a session should run.
///
/// An explicitly pinned path is validated and wins; otherwise the platform
/// defaults are probed. `Ok(None)` means nothing was found here and launch
/// falls back to chromiumoxide's own detection.
pub struct ChromeFinder {
    pinned_path: Option<PathBuf>,
}

impl ChromeFinder {
    pub fn new(pinned_path: Option<PathBuf>) -> Self {
        Self { pinned_path }
    }

    pub fn resolve(&self) -> Result<Option<PathBuf>> {
        if let Some(ref path) = self.pinned_path {
            return validate_binary(path).map(Some);
        }

        Ok(Self::default_paths()
            .into_iter()
            .find(|path| path.exists()))
    }

    fn default_paths() -> Vec<PathBuf> {
        #[cfg(target_os = "macos")]
        return vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ];

        #[cfg(target_os = "linux")]
        return vec![
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/usr/bin/chromium-browser"),
        ];

        #[cfg(target_os = "windows")]
        return vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        return vec![];
    }
}

fn validate_binary(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(Error::Browser(format!(
            "Chrome not found at: {}",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path).map_err(Error::Io)?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(Error::Browser(format!(
                "Chrome binary not executable: {}",
                path.display()
            )));
        }
    }

    Ok(path.to_path_buf())
}
