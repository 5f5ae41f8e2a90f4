//! Library surface for proctop_agent (used by the binary and integration tests).

pub mod config;
pub mod http;
pub mod push;
pub mod sampler;
pub mod state;
pub mod types;
