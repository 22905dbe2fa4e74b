//! Type definitions for the gateway client
//!
//! - [`identifiers`] - Type-safe ID wrappers (`ContextId`, `DocumentId`, `RequestId`, ...)
//! - [`options`] - Client and polling configuration
//! - [`document`] - Uploaded documents and upload input
//! - [`messages`] - Conversation messages and completion payloads
//! - [`auth`] - Login/register payloads and the user profile

pub mod auth;
pub mod document;
pub mod identifiers;
pub mod messages;
pub mod options;
mod timestamp;

// Re-export commonly used types
pub use auth::{Ack, LoginRequest, RegisterRequest, UserProfile};
pub use document::{Document, DocumentChunk, DocumentStatus, UploadFile};
pub use identifiers::{ContextId, DocumentId, MessageId, RequestId, UserId};
pub use messages::{CompletionOptions, CompletionResponse, Message, MessageInput, Role};
pub use options::{ClientOptions, ClientOptionsBuilder, PollOptions};
