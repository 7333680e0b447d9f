pub mod batch;
pub mod error;
pub mod merge;
pub mod navigate;
pub mod profile;
pub mod retry;
pub mod watcher;

pub use batch::{BatchConfig, BatchResult, BatchRunner};
pub use error::{Error, Result};
pub use navigate::{FormNavigator, SessionProvider};
pub use profile::{Profile, ProfileStore};
pub use retry::{AttemptOutcome, RetryController};
pub use watcher::{DownloadSnapshot, DownloadWatcher};
