pub mod chat;
pub mod handlers;
pub mod submission;
