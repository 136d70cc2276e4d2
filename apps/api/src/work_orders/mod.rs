pub mod completion;
pub mod handlers;
pub mod queries;
pub mod stats;
