//! Client library for a plans REST API: typed models, an HTTP client, and
//! an entity store that holds the last-known server state for a front end
//! to render from.

pub mod api;
pub mod config;
pub mod model;
pub mod store;
