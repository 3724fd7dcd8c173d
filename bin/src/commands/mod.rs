//! CLI command implementations.

pub(crate) mod events;
pub(crate) mod get;
pub(crate) mod track;
