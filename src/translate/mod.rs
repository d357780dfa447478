//! Translation between the LM Studio REST API and OpenAI-compatible backends.
//!
//! Requests, model listings and streamed responses are rewritten here. All
//! functions are pure except the relay, which only pulls from the stream it is given.

pub mod message;
pub mod model_list;
pub mod openai_types;
pub mod relay;
pub mod request;
pub mod studio_types;
