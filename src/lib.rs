//! Documentation enhancer for Python modules.
//!
//! Parses a module's classes and functions, asks a completion provider for
//! summaries, explanations and examples, optionally translates them, runs
//! docstring examples in a sandboxed interpreter, and writes one Markdown
//! page per module. Generated pages can be indexed and searched by
//! embedding similarity.

pub mod analyze;
pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod runner;
pub mod search;
pub mod types;

pub use error::{DocError, ProviderError, Result};
pub use pipeline::{ModuleReport, Pipeline, PipelineOptions};
