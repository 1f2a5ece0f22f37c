//! Synchronized query/mutation cache.
//!
//! Queries are keyed, deduplicated and observable; mutations are tracked
//! one-shot writes that invalidate query families by key prefix.

mod key;
mod mutation;
mod query;
mod state;

pub use key::{KeySegment, QueryKey};
pub use mutation::Mutation;
pub use query::{QueryClient, QueryHandle, QueryOptions};
pub use state::{MutationState, MutationStatus, QueryState, QueryStatus};
