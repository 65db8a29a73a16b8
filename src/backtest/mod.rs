pub mod model;
pub mod poller;
pub mod service;

pub use model::{BacktestForm, BatchForm, JobKind};
pub use service::BacktestService;
