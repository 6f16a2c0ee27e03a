//! Whole-module syntax check against the tree-sitter Python grammar.
//!
//! The line scanner only understands block structure. Statement and
//! expression errors (`x = = 1`, a dangling operator) are found here.

use tree_sitter::{Language, Node, Parser, Tree};

use super::lexer::LexError;

// Python 2 statement forms the grammar still accepts.
const LEGACY_STATEMENTS: &[(&str, &str)] = &[
    ("print_statement", "print"),
    ("exec_statement", "exec"),
];

pub fn check_syntax(source: &str) -> Result<(), LexError> {
    let language: Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| LexError::new(1, format!("failed to load Python grammar: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| LexError::new(1, "invalid syntax"))?;

    match first_invalid(&tree) {
        Some(node) => Err(LexError::new(node.start_position().row + 1, describe(node))),
        None => Ok(()),
    }
}

/// First error, missing token or legacy statement in pre-order.
fn first_invalid(tree: &Tree) -> Option<Node<'_>> {
    let mut cursor = tree.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() || legacy_keyword(node).is_some() {
            return Some(node);
        }
        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// `print x` is legacy; `print(x)` read as a statement is still a call.
fn legacy_keyword(node: Node<'_>) -> Option<&'static str> {
    let (_, keyword) = LEGACY_STATEMENTS
        .iter()
        .find(|(kind, _)| *kind == node.kind())?;
    let argument = node.named_child(0)?;
    let parenthesized =
        node.named_child_count() == 1 && argument.kind() == "parenthesized_expression";
    (!parenthesized).then_some(*keyword)
}

fn describe(node: Node<'_>) -> String {
    if let Some(keyword) = legacy_keyword(node) {
        return format!("invalid syntax: missing parentheses in call to '{}'", keyword);
    }
    if node.is_missing() {
        return format!("invalid syntax: expected '{}'", node.kind());
    }
    "invalid syntax".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_modern_python() {
        let src = "\
import asyncio

async def main(xs: list[int]) -> None:
    async with lock:
        total = sum(x for x in xs if x)
    match total:
        case 0:
            print(\"none\")
        case _:
            print(f\"{total:>4}\", end=\"\")
    lam = lambda *a, **kw: (a, kw)
    print((1, 2))
";
        assert_eq!(check_syntax(src), Ok(()));
    }

    #[test]
    fn test_reports_statement_errors_with_line() {
        let err = check_syntax("x = 1\ny = = 2\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.starts_with("invalid syntax"));

        let err = check_syntax("print 'hello'\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("print"));
    }
}
