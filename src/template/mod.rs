//! `{{name}}` template resolution for strings and whole request drafts.
mod draft;
mod render;


pub use draft::resolve_draft;
pub use render::{ResolveMeta, lookup_var, resolve_str};
