pub mod client;
pub mod streaming;
pub mod traits;
pub mod types;

pub use client::MastodonClient;
pub use streaming::{UserStream, parse_frame, streaming_url};
pub use traits::{EventSource, EventStream, StatusDeleter};
pub use types::{Account, Status, StreamEvent, Visibility};
