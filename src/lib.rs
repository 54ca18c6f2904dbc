pub mod chat;
pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod generator;
pub mod ingest;
pub mod openai;
pub mod quiz;
pub mod runner;
pub mod schema;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub type DispatchError = Box<dyn std::error::Error + Send + Sync + 'static>;
type HandlerResult = Result<(), DispatchError>;
