pub mod classifier;
pub mod consumer;

pub use classifier::{classify, pending_entry, qualifies};
pub use consumer::{StreamConsumer, StreamSettings};
