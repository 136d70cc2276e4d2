pub mod allocation;
pub mod car;
pub mod context;
pub mod conversation;
pub mod handlers;
pub mod prompts;
pub mod validation;
