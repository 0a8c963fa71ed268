pub mod config;
pub mod context;
pub mod error;
pub mod value;

pub use config::EngineConfig;
pub use context::*;
pub use error::*;
pub use value::*;
