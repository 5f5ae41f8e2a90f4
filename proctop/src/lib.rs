//! Library surface for the proctop dashboard (used by the binary and integration tests).

pub mod action;
pub mod app;
pub mod fetch;
pub mod filter;
pub mod input;
pub mod profiles;
pub mod resources;
pub mod scheduler;
pub mod state;
pub mod tree;
pub mod types;
pub mod ui;
pub mod view;
