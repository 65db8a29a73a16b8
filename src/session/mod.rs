pub mod api_session;
pub mod dto;
pub mod urls;

pub use api_session::{ApiError, ApiSession};
