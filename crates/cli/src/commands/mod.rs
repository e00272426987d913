//! Front ends for DocQA.
//!
//! Both call the same [`docqa_knowledge::QuestionAnswerer`].

pub mod repl;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;
