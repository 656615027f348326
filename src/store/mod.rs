//! Storage internals: the callback-keyed entry table and retained value
//! handles.

pub mod handle;
pub(crate) mod table;
