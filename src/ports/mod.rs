//! Port traits at the edges of the domain.

pub mod config_port;
pub mod export_port;
pub mod source_port;
