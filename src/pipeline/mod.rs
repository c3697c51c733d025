//! Message processing pipeline.
//!
//! Every inbound scammer message flows through:
//! 1. `ScamClassifier::classify()` - weighted rule scoring
//! 2. `EntityExtractor::extract()` - accounts, handles, phones, links
//! 3. `merge_into()` - accumulate intelligence on the session
//! 4. `should_engage()` - decide whether the persona replies
//! 5. `compute_metrics()` - per-turn engagement metrics
//!
//! [`MessageProcessor`] ties the steps together around the session store.

pub mod engagement;
pub mod merge;
pub mod metrics;
pub mod processor;
pub mod types;

pub use engagement::should_engage;
pub use merge::merge_into;
pub use metrics::compute_metrics;
pub use processor::{MessageProcessor, SessionBackend};
pub use types::{EngagementMetrics, ProcessRequest, ProcessResponse, RequestMetadata, ResponseStatus};
