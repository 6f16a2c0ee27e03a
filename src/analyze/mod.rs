mod examples;
mod grammar;
mod lexer;
mod python;

use std::path::Path;

pub use examples::{dedent, extract_examples};
pub use python::{cleandoc, parse_module};

/// Module name for a source file: "pkg/shapes.py" → "shapes".
pub fn module_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "module".to_string())
}
