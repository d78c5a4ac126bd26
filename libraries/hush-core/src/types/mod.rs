mod completion;
mod ids;
pub mod seconds;
mod session;

pub use completion::{AggregateCounters, AggregateDelta, CompletionRecord};
pub use ids::SessionId;
pub use session::{Category, PlayableSession};
