//! Analysis and chat pipeline: extraction, aggregation, generation and the stores.

mod service;
pub mod types;

pub use service::{MedbriefApi, MedbriefService};
pub use types::{ChatReply, ChatRequest, ConversationView, ServiceError};
