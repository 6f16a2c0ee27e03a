use once_cell::sync::Lazy;
use regex::Regex;

use super::grammar::check_syntax;
use super::lexer::{logical_lines, LexError, LogicalLine};
use crate::error::{DocError, Result};
use crate::types::{CodeUnit, UnitKind};

// def name(   /   async def name(
static DEF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:async\s+)?def\s+([^\W\d]\w*)\s*\(").unwrap());

// class Name:   /   class Name(Base, metaclass=M):
static CLASS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^class\s+([^\W\d]\w*)\s*[(:\[]").unwrap());

static DEFINITION_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:async\s+def|def|class)\b").unwrap());

static STRING_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(?i)(rb|br|fr|rf|r|u|b|f)?["']"#).unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

struct OpenUnit {
    unit: CodeUnit,
    header_indent: usize,
}

/// Parse a Python module into a tree of code units.
///
/// Every `class`, `def` and `async def` becomes a node, at any nesting depth.
/// Invalid syntax yields `DocError::Parse`; no partial tree is returned.
pub fn parse_module(source: &str, module_name: &str) -> Result<CodeUnit> {
    let parse_error = |line: usize, message: String| DocError::Parse {
        path: module_name.to_string(),
        line,
        message,
    };

    let lines = logical_lines(source).map_err(|e| parse_error(e.line, e.message))?;

    check_indentation(&lines).map_err(|e| parse_error(e.line, e.message))?;
    check_syntax(source).map_err(|e| parse_error(e.line, e.message))?;

    let module_doc = lines.first().and_then(|l| string_literal(&l.text));
    let mut module = CodeUnit::module(module_name, module_doc);

    let mut stack: Vec<OpenUnit> = Vec::new();
    // Set after a block header; its first body statement may be a docstring.
    let mut awaiting_docstring = false;

    for line in &lines {
        if awaiting_docstring {
            awaiting_docstring = false;
            if let Some(top) = stack.last_mut() {
                if line.indent > top.header_indent {
                    if let Some(doc) = string_literal(&line.text) {
                        top.unit.docstring = Some(doc);
                        continue;
                    }
                }
            }
        }

        while stack
            .last()
            .is_some_and(|open| open.header_indent >= line.indent)
        {
            close_top(&mut stack, &mut module);
        }

        if !DEFINITION_KEYWORD.is_match(&line.text) {
            continue;
        }

        let header = parse_header(line).map_err(|msg| parse_error(line.line, msg))?;

        let parent_qualified = stack
            .last()
            .map(|open| open.unit.qualified_name.clone())
            .unwrap_or_else(|| module.qualified_name.clone());
        let enclosing_class = stack
            .iter()
            .rev()
            .find(|open| open.unit.kind == UnitKind::Class)
            .map(|open| open.unit.qualified_name.clone());

        let unit = CodeUnit {
            kind: header.kind,
            qualified_name: format!("{}.{}", parent_qualified, header.name),
            name: header.name,
            signature: header.signature,
            docstring: header.inline_body.as_deref().and_then(string_literal),
            line: line.line,
            enclosing_class,
            children: Vec::new(),
        };

        awaiting_docstring = header.inline_body.is_none();
        stack.push(OpenUnit {
            unit,
            header_indent: line.indent,
        });
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut module);
    }

    Ok(module)
}

fn close_top(stack: &mut Vec<OpenUnit>, module: &mut CodeUnit) {
    if let Some(open) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.unit.children.push(open.unit),
            None => module.children.push(open.unit),
        }
    }
}

/// Mirrors the tokenizer's INDENT/DEDENT rules.
fn check_indentation(lines: &[LogicalLine]) -> std::result::Result<(), LexError> {
    let mut levels = vec![0usize];
    let mut expecting_block: Option<usize> = None;

    for line in lines {
        let current = *levels.last().unwrap_or(&0);
        if let Some(opened_at) = expecting_block.take() {
            if line.indent <= current {
                return Err(LexError {
                    line: line.line,
                    message: format!("expected an indented block after line {}", opened_at),
                });
            }
            levels.push(line.indent);
        } else if line.indent > current {
            return Err(LexError {
                line: line.line,
                message: "unexpected indent".to_string(),
            });
        } else if line.indent < current {
            while levels.last().is_some_and(|&level| level > line.indent) {
                levels.pop();
            }
            if levels.last() != Some(&line.indent) {
                return Err(LexError {
                    line: line.line,
                    message: "unindent does not match any outer indentation level".to_string(),
                });
            }
        }

        if line.opens_block() {
            expecting_block = Some(line.line);
        }
    }

    if let (Some(opened_at), Some(last)) = (expecting_block, lines.last()) {
        return Err(LexError {
            line: last.line,
            message: format!("expected an indented block after line {}", opened_at),
        });
    }

    Ok(())
}

struct Header {
    kind: UnitKind,
    name: String,
    signature: String,
    inline_body: Option<String>,
}

fn parse_header(line: &LogicalLine) -> std::result::Result<Header, String> {
    let text = line.text.as_str();
    let (kind, name, after_name) = if let Some(cap) = DEF_PATTERN.captures(text) {
        let name = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        // The match ends just past the opening parenthesis.
        let open = cap.get(0).map(|m| m.end() - 1).unwrap_or_default();
        let close = matching_close(text, open).ok_or("invalid syntax in parameter list")?;
        (UnitKind::Function, name, close + 1)
    } else if let Some(cap) = CLASS_PATTERN.captures(text) {
        let name = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        let end = cap.get(1).map(|m| m.end()).unwrap_or_default();
        (UnitKind::Class, name, end)
    } else {
        return Err("invalid syntax".to_string());
    };

    let colon = block_colon(text, after_name).ok_or("expected ':'")?;
    let rest = text[after_name..colon].trim();
    if kind == UnitKind::Function && !rest.is_empty() && !rest.starts_with("->") {
        return Err("invalid syntax".to_string());
    }

    let signature = normalize_signature(&text[..colon]);
    let body = text[colon + 1..].trim();
    let inline_body = if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    };

    Ok(Header {
        kind,
        name: name.to_string(),
        signature,
        inline_body,
    })
}

fn normalize_signature(raw: &str) -> String {
    WHITESPACE
        .replace_all(raw.trim(), " ")
        .replace("( ", "(")
        .replace(" )", ")")
        .replace("[ ", "[")
        .replace(" ]", "]")
}

/// Index of the bracket closing the one at `open`, skipping string literals.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'(' | b'[' | b'{' => {
                depth += 1;
                i += 1;
            }
            b')' | b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// First `:` at bracket depth zero at or after `from`.
fn block_colon(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'(' | b'[' | b'{' => {
                depth += 1;
                i += 1;
            }
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b':' if depth == 0 => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let triple = bytes.get(start + 1) == Some(&quote) && bytes.get(start + 2) == Some(&quote);
    let mut i = if triple { start + 3 } else { start + 1 };
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            if !triple {
                return i + 1;
            }
            if bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote) {
                return i + 3;
            }
        }
        i += 1;
    }
    bytes.len()
}

/// If `text` is a statement consisting only of string literals usable as a
/// docstring, return its cleaned value. Byte strings and f-strings are not
/// docstrings.
fn string_literal(text: &str) -> Option<String> {
    let mut rest = text.trim();
    let mut value = String::new();
    let mut found = false;

    while !rest.is_empty() {
        let cap = STRING_PREFIX.captures(rest)?;
        let prefix = cap.get(1).map(|m| m.as_str().to_ascii_lowercase());
        let raw = match prefix.as_deref() {
            None | Some("u") => false,
            Some("r") => true,
            Some(_) => return None,
        };
        let quote_at = cap.get(0).map(|m| m.end() - 1)?;
        let bytes = rest.as_bytes();
        let end = skip_string(bytes, quote_at);
        let quote = bytes[quote_at];
        let triple = bytes.get(quote_at + 1) == Some(&quote) && bytes.get(quote_at + 2) == Some(&quote);
        let delim = if triple { 3 } else { 1 };
        if end < quote_at + 2 * delim || end > rest.len() {
            return None;
        }
        let body = &rest[quote_at + delim..end - delim];
        if raw {
            value.push_str(body);
        } else {
            value.push_str(&unescape(body));
        }
        found = true;
        rest = rest[end..].trim_start();
    }

    if found {
        Some(cleandoc(&value))
    } else {
        None
    }
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some('\r') if chars.peek() == Some(&'\n') => {
                chars.next();
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Strip the common leading indentation of every line after the first and
/// trim blank lines at both ends.
pub fn cleandoc(doc: &str) -> String {
    let expanded = expand_tabs(doc);
    let lines: Vec<&str> = expanded.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    cleaned.push(lines[0].trim_start().to_string());
    for l in lines.iter().skip(1) {
        if l.trim().is_empty() {
            cleaned.push(String::new());
        } else {
            let stripped = l.get(margin..).unwrap_or_else(|| l.trim_start());
            cleaned.push(stripped.trim_end().to_string());
        }
    }

    while cleaned.first().is_some_and(|l| l.trim().is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.trim().is_empty()) {
        cleaned.pop();
    }

    cleaned.join("\n")
}

/// Tabs advance to the next multiple of eight columns, counted from the
/// start of each line.
fn expand_tabs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0;
    for c in text.chars() {
        match c {
            '\t' => {
                let width = 8 - column % 8;
                out.extend(std::iter::repeat(' ').take(width));
                column += width;
            }
            '\n' | '\r' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}
