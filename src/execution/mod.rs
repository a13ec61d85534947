pub mod publisher;

pub use publisher::{PublishSummary, Publisher, PurgeSummary};
