//! API layer - HTTP endpoint handlers.

mod admission;
mod health;
mod history;
mod identity;
mod routes;
mod video;

pub use health::health;
pub use identity::{client_ip, resolve_identifier};
pub use routes::api_routes;
pub use video::{AnalyzeRequest, AnalyzeResponse, QuestionRequest, QuestionResponse};
