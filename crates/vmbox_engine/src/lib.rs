//! Vmbox engine: HTTP task protocol and effect execution.
mod client;
mod decode;
mod engine;
mod types;

pub use client::{ClientSettings, ReqwestTaskClient, TaskClient};
pub use decode::{decode_markup, DecodeError, DecodedMarkup};
pub use engine::EngineHandle;
pub use types::{EngineError, EngineEvent, TaskError};
