//! Process source for the Linux `/proc` filesystem.

pub mod parser;
mod source;

pub use source::ProcfsSource;
