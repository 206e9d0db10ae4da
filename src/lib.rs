//! fact-hub turns the facts pushed by monitoring agents into server-side state.
//!
//! Two parts do the heavy lifting:
//!
//! - [`facts`] maps between the flat, path-addressed key/value store agents
//!   publish into and nested [`facts::Tree`]s.
//! - [`pipeline`] runs every collected event through the [`projectors`]
//!   registered for its type, which update the entities in [`storage`].
//!
//! [`collector`] is the submission point for agent reports.

pub mod collector;
pub mod config;
pub mod facts;
pub mod pipeline;
pub mod projectors;
pub mod storage;
pub mod util;
