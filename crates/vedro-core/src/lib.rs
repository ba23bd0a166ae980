//! vedro-core: Tutoring engine, traits, and schema validation.
//!
//! This crate defines the data model, the provider trait, and the
//! prompt → completion → validation pipeline that every vedro front end
//! builds on.

pub mod cache;
pub mod error;
pub mod lab;
pub mod model;
pub mod prompt;
pub mod quiz;
pub mod retry;
pub mod router;
pub mod schema;
pub mod traits;
pub mod tutor;

pub use error::{ProviderError, SchemaError, SchemaViolation};
pub use model::{ActionResult, ChatReply, ChatbotInput, DataUriError, LearningPack};
pub use retry::RetryPolicy;
pub use traits::{GenerateRequest, GenerateResponse, LlmProvider, ResponseFormat};
pub use tutor::{Tutor, TutorConfig};
