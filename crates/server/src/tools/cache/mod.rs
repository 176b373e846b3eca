//! Cache inspection and maintenance tools.

pub mod generations;
pub mod get;
pub mod purge;

pub use generations::generations_impl;
pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
