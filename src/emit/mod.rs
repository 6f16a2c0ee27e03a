mod markdown;

pub use markdown::{output_path_for, render_module, write_module};
