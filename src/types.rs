use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::analyze::extract_examples;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Module,
    Class,
    Function,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Module => write!(f, "module"),
            UnitKind::Class => write!(f, "class"),
            UnitKind::Function => write!(f, "function"),
        }
    }
}

/// Identifies one unit within a module. A property setter or a redefinition
/// repeats its qualified name, so the definition line is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitKey {
    pub qualified_name: String,
    pub line: usize,
}

/// A parsed module, class, or function with its docstring and signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeUnit {
    pub kind: UnitKind,
    pub name: String,
    /// Dotted path rooted at the module name: "shapes.Circle.area"
    pub qualified_name: String,
    pub signature: String,
    pub docstring: Option<String>,
    /// 1-based line of the `def`/`class` keyword (1 for modules)
    pub line: usize,
    /// Qualified name of the nearest enclosing class, if any
    pub enclosing_class: Option<String>,
    pub children: Vec<CodeUnit>,
}

impl CodeUnit {
    pub fn module(name: &str, docstring: Option<String>) -> Self {
        Self {
            kind: UnitKind::Module,
            name: name.to_string(),
            qualified_name: name.to_string(),
            signature: format!("module {}", name),
            docstring,
            line: 1,
            enclosing_class: None,
            children: Vec::new(),
        }
    }

    pub fn key(&self) -> UnitKey {
        UnitKey {
            qualified_name: self.qualified_name.clone(),
            line: self.line,
        }
    }

    /// A function whose direct parent is a class.
    pub fn is_method(&self) -> bool {
        let parent = self.qualified_name.rsplit_once('.').map(|(parent, _)| parent);
        self.kind == UnitKind::Function
            && self.enclosing_class.is_some()
            && self.enclosing_class.as_deref() == parent
    }

    /// Depth-first, pre-order traversal including `self`.
    pub fn walk(&self) -> Vec<&CodeUnit> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(CodeUnit::count).sum::<usize>()
    }

    /// Name relative to the module: "Circle.area" for "shapes.Circle.area".
    pub fn local_name<'a>(&'a self, module: &CodeUnit) -> &'a str {
        self.qualified_name
            .strip_prefix(&module.qualified_name)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(&self.qualified_name)
    }

    pub fn examples(&self) -> Vec<CodeExample> {
        self.docstring
            .as_deref()
            .map(extract_examples)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExampleOrigin {
    Fence,
    Doctest,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeExample {
    pub code: String,
    pub language: Option<String>,
    pub origin: ExampleOrigin,
}

impl CodeExample {
    pub fn new(code: String, language: Option<String>, origin: ExampleOrigin) -> Self {
        Self {
            code,
            language,
            origin,
        }
    }

    /// Untagged fences and doctests are assumed to be Python.
    pub fn is_python(&self) -> bool {
        match self.language.as_deref() {
            None => true,
            Some(lang) => matches!(
                lang.to_ascii_lowercase().as_str(),
                "python" | "py" | "python3" | "pycon"
            ),
        }
    }
}

/// LLM-generated documentation for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementResult {
    pub summary: String,
    pub explanation: String,
    pub example: String,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExampleStatus {
    Passed,
    Failed,
}

impl fmt::Display for ExampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExampleStatus::Passed => write!(f, "Passed"),
            ExampleStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExampleTestResult {
    pub snippet: String,
    pub status: ExampleStatus,
    /// Captured stdout on success, the verbatim error or timeout notice on failure
    pub output: String,
    #[serde(skip)]
    pub duration: Duration,
}

impl ExampleTestResult {
    pub fn passed(snippet: &str, output: String, duration: Duration) -> Self {
        Self {
            snippet: snippet.to_string(),
            status: ExampleStatus::Passed,
            output,
            duration,
        }
    }

    pub fn failed(snippet: &str, output: String, duration: Duration) -> Self {
        Self {
            snippet: snippet.to_string(),
            status: ExampleStatus::Failed,
            output,
            duration,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == ExampleStatus::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(kind: UnitKind, qualified: &str, children: Vec<CodeUnit>) -> CodeUnit {
        CodeUnit {
            kind,
            name: qualified.rsplit('.').next().unwrap_or(qualified).to_string(),
            qualified_name: qualified.to_string(),
            signature: String::new(),
            docstring: None,
            line: 1,
            enclosing_class: None,
            children,
        }
    }

    #[test]
    fn test_walk_is_preorder() {
        let tree = unit(
            UnitKind::Module,
            "m",
            vec![
                unit(
                    UnitKind::Class,
                    "m.A",
                    vec![unit(UnitKind::Function, "m.A.f", vec![])],
                ),
                unit(UnitKind::Function, "m.g", vec![]),
            ],
        );
        let names: Vec<&str> = tree.walk().iter().map(|u| u.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["m", "m.A", "m.A.f", "m.g"]);
        assert_eq!(tree.count(), 4);
        assert_eq!(tree.children[0].children[0].local_name(&tree), "A.f");
    }

    #[test]
    fn test_example_language_detection() {
        let py = CodeExample::new("x = 1".into(), Some("Python".into()), ExampleOrigin::Fence);
        let bare = CodeExample::new("x = 1".into(), None, ExampleOrigin::Doctest);
        let sh = CodeExample::new("ls".into(), Some("bash".into()), ExampleOrigin::Fence);
        assert!(py.is_python());
        assert!(bare.is_python());
        assert!(!sh.is_python());
    }
}
