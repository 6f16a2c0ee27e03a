use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DocError, Result};
use crate::types::{CodeUnit, EnhancementResult, ExampleTestResult, UnitKey, UnitKind};

const SNIPPET_WIDTH: usize = 60;
const OUTPUT_WIDTH: usize = 120;

/// Render the Markdown page for one module.
///
/// Output depends only on the inputs: no timestamps, and units are visited in
/// source order, so regenerating unchanged input gives identical bytes.
pub fn render_module(
    module: &CodeUnit,
    results: &BTreeMap<UnitKey, EnhancementResult>,
    tests: &BTreeMap<UnitKey, Vec<ExampleTestResult>>,
    fallback_language: &str,
) -> String {
    let units = module.walk();
    let language = units
        .iter()
        .find_map(|u| results.get(&u.key()))
        .map(|r| r.language.as_str())
        .unwrap_or(fallback_language);

    let mut output = String::new();
    output.push_str(&format!(
        "# Documentation for `{}` [{}]\n\n",
        module.name, language
    ));

    if let Some(doc) = module.docstring.as_deref().filter(|d| !d.trim().is_empty()) {
        output.push_str(doc.trim());
        output.push_str("\n\n");
    }

    let definitions: Vec<&CodeUnit> = units
        .into_iter()
        .filter(|u| u.kind != UnitKind::Module)
        .collect();

    if definitions.is_empty() {
        output.push_str("*No classes or functions found.*\n");
        return output;
    }

    for unit in definitions {
        let key = unit.key();
        render_unit(
            &mut output,
            module,
            unit,
            results.get(&key),
            tests.get(&key).map(Vec::as_slice),
        );
    }

    output
}

fn render_unit(
    output: &mut String,
    module: &CodeUnit,
    unit: &CodeUnit,
    result: Option<&EnhancementResult>,
    tests: Option<&[ExampleTestResult]>,
) {
    let label = match unit.kind {
        UnitKind::Class => "Class",
        _ if unit.is_method() => "Method",
        _ => "Function",
    };
    output.push_str(&format!("## {}: `{}`\n\n", label, unit.local_name(module)));
    push_code_block(output, "python", &unit.signature);

    if let Some(doc) = unit.docstring.as_deref().filter(|d| !d.trim().is_empty()) {
        output.push_str("**Docstring**:\n\n");
        push_code_block(output, "text", doc);
    }

    if let Some(result) = result {
        output.push_str(&format!("**Summary**: {}\n\n", result.summary.trim()));
        output.push_str(&format!("**Explanation**: {}\n\n", result.explanation.trim()));
        if !result.example.trim().is_empty() {
            output.push_str("**Example**:\n\n");
            push_code_block(output, "python", result.example.trim_end());
        }
    }

    if let Some(tests) = tests.filter(|t| !t.is_empty()) {
        output.push_str("**Example Test Results**:\n\n");
        output.push_str("| # | Snippet | Status | Output |\n");
        output.push_str("|---|---------|--------|--------|\n");
        for (i, test) in tests.iter().enumerate() {
            output.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                i + 1,
                snippet_cell(&test.snippet),
                test.status,
                table_cell(&test.output, OUTPUT_WIDTH)
            ));
        }
        output.push('\n');
    }
}

/// Fence long enough that no backtick run inside `content` can close it.
fn push_code_block(output: &mut String, language: &str, content: &str) {
    let longest_run = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat((longest_run + 1).max(3));
    output.push_str(&format!("{}{}\n{}\n{}\n\n", fence, language, content, fence));
}

fn snippet_cell(snippet: &str) -> String {
    let cell = table_cell(snippet, SNIPPET_WIDTH);
    if cell.is_empty() || cell.contains('`') {
        cell
    } else {
        format!("`{}`", cell)
    }
}

/// Single-line, pipe-escaped, truncated table cell.
fn table_cell(text: &str, width: usize) -> String {
    let flat = text
        .trim()
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join(" ⏎ ");
    let truncated = if flat.chars().count() > width {
        let mut cut: String = flat.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        flat
    };
    truncated.replace('|', "\\|")
}

/// Write the rendered page, creating parent directories as needed.
pub fn write_module(
    module: &CodeUnit,
    results: &BTreeMap<UnitKey, EnhancementResult>,
    tests: &BTreeMap<UnitKey, Vec<ExampleTestResult>>,
    destination: &Path,
    fallback_language: &str,
) -> Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DocError::io(parent, e))?;
    }
    let content = render_module(module, results, tests, fallback_language);
    fs::write(destination, content).map_err(|e| DocError::io(destination, e))
}

/// Output location for a module: its path relative to `root` with `.md`
/// appended, under `output_dir`. Modules outside `root` use their file name.
pub fn output_path_for(module_path: &Path, root: &Path, output_dir: &Path) -> PathBuf {
    let relative = module_path
        .strip_prefix(root)
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| module_path.file_name().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("module"));

    let mut name = relative.into_os_string();
    name.push(".md");
    output_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::parse_module;
    use std::time::Duration;

    const SOURCE: &str = r#""""Sample module."""

def double(x):
    """Doubles x.

    ```python
    print(double(2))
    ```
    """
    return x * 2


class Counter:
    def bump(self):
        pass
"#;

    fn inputs() -> (
        CodeUnit,
        BTreeMap<UnitKey, EnhancementResult>,
        BTreeMap<UnitKey, Vec<ExampleTestResult>>,
    ) {
        let module = parse_module(SOURCE, "sample").unwrap();
        let double = module.children[0].key();
        let mut results = BTreeMap::new();
        results.insert(
            double.clone(),
            EnhancementResult {
                summary: "Doubles a number.".into(),
                explanation: "Returns x times two.".into(),
                example: "print(double(21))".into(),
                language: "fr".into(),
            },
        );
        let mut tests = BTreeMap::new();
        tests.insert(
            double,
            vec![
                ExampleTestResult::passed("print(double(2))", "4".into(), Duration::from_millis(30)),
                ExampleTestResult::failed(
                    "a | b\nreturn 1/0",
                    "ZeroDivisionError: division by zero".into(),
                    Duration::from_millis(12),
                ),
            ],
        );
        (module, results, tests)
    }

    #[test]
    fn test_render_is_deterministic() {
        let (module, results, tests) = inputs();
        let first = render_module(&module, &results, &tests, "en");
        let second = render_module(&module, &results, &tests, "en");
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_render_structure() {
        let (module, results, tests) = inputs();
        let page = render_module(&module, &results, &tests, "en");

        assert!(page.starts_with("# Documentation for `sample` [fr]\n\nSample module.\n"));
        assert!(page.contains("## Function: `double`"));
        assert!(page.contains("## Class: `Counter`"));
        assert!(page.contains("## Method: `Counter.bump`"));
        assert!(page.contains("**Summary**: Doubles a number."));
        assert!(page.contains("**Explanation**: Returns x times two."));
        assert!(page.contains("```python\nprint(double(21))\n```"));
        // The docstring contains a fence, so it is wrapped in a longer one.
        assert!(page.contains("````text\nDoubles x."));
        assert!(page.contains("| 1 | `print(double(2))` | Passed | 4 |"));
        assert!(page.contains("| 2 | `a \\| b ⏎ return 1/0` | Failed | ZeroDivisionError: division by zero |"));

        // Order follows the source.
        let double_at = page.find("`double`").unwrap();
        let counter_at = page.find("`Counter`").unwrap();
        assert!(double_at < counter_at);
    }

    #[test]
    fn test_fallback_language_without_results() {
        let (module, _, _) = inputs();
        let page = render_module(&module, &BTreeMap::new(), &BTreeMap::new(), "de");
        assert!(page.starts_with("# Documentation for `sample` [de]"));
        assert!(!page.contains("**Summary**"));
        assert!(!page.contains("Example Test Results"));
    }

    #[test]
    fn test_same_name_units_keep_their_own_text() {
        let source = "class Box:\n    @property\n    def size(self):\n        return 1\n\n    @size.setter\n    def size(self, value):\n        pass\n";
        let module = parse_module(source, "box").unwrap();
        let getter = &module.children[0].children[0];
        let setter = &module.children[0].children[1];
        assert_eq!(getter.qualified_name, setter.qualified_name);

        let mut results = BTreeMap::new();
        for (unit, summary) in [(getter, "Reads the size."), (setter, "Sets the size.")] {
            results.insert(
                unit.key(),
                EnhancementResult {
                    summary: summary.into(),
                    explanation: "Details.".into(),
                    example: String::new(),
                    language: "en".into(),
                },
            );
        }

        let page = render_module(&module, &results, &BTreeMap::new(), "en");
        assert_eq!(page.matches("**Summary**: Reads the size.").count(), 1);
        assert_eq!(page.matches("**Summary**: Sets the size.").count(), 1);
        assert!(page.find("Reads the size.").unwrap() < page.find("Sets the size.").unwrap());
    }

    #[test]
    fn test_empty_module() {
        let module = parse_module("x = 1\n", "consts").unwrap();
        let page = render_module(&module, &BTreeMap::new(), &BTreeMap::new(), "en");
        assert!(page.contains("No classes or functions found"));
    }

    #[test]
    fn test_table_cell_truncation() {
        let long = "x".repeat(200);
        let cell = table_cell(&long, 10);
        assert_eq!(cell.chars().count(), 10);
        assert!(cell.ends_with('…'));
    }

    #[test]
    fn test_write_module_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let (module, results, tests) = inputs();
        let destination = dir.path().join("docs").join("pkg").join("sample.py.md");
        write_module(&module, &results, &tests, &destination, "en").unwrap();
        let written = fs::read_to_string(&destination).unwrap();
        assert_eq!(written, render_module(&module, &results, &tests, "en"));
    }

    #[test]
    fn test_write_module_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let (module, results, tests) = inputs();
        let err = write_module(&module, &results, &tests, &blocker.join("out.md"), "en")
            .unwrap_err();
        assert_eq!(err.kind(), "IOError");
    }

    #[test]
    fn test_output_path_for() {
        let root = Path::new("/work");
        let out = Path::new("/docs");
        assert_eq!(
            output_path_for(Path::new("/work/pkg/shapes.py"), root, out),
            PathBuf::from("/docs/pkg/shapes.py.md")
        );
        assert_eq!(
            output_path_for(Path::new("/elsewhere/tool.py"), root, out),
            PathBuf::from("/docs/tool.py.md")
        );
    }
}
