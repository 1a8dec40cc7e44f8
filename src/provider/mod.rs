//! Media extraction providers
//!
//! The job runner never talks to a video host itself. It hands a
//! [`FetchRequest`] and a [`ProgressSink`] to a [`MediaProvider`] and turns
//! the events that come back into job status.
//!
//! - [`YtDlpProvider`] - runs the `yt-dlp` binary as a subprocess
//! - [`ScriptedProvider`] - replays canned events, used by tests

mod error;
mod events;
pub mod scripted;
mod traits;
pub mod ytdlp;

pub use error::{ProviderError, Result};
pub use events::{ProgressSink, ProviderEvent};
pub use scripted::{ScriptHandle, ScriptedProvider, Step};
pub use traits::{FetchRequest, FetchSummary, MediaInfo, MediaProvider};
pub use ytdlp::YtDlpProvider;
