//! Cross-module scenarios for the knowledge crate.

mod end_to_end;
mod support;
