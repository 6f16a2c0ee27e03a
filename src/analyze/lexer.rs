//! Splits Python source into logical lines.
//!
//! A logical line joins physical lines inside brackets or after a trailing
//! backslash. Comments are dropped, string literals are kept verbatim so the
//! parser can read docstrings back out of them.

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    /// 1-based physical line where the logical line starts
    pub line: usize,
    /// Indentation width in columns (tabs advance to the next multiple of 8)
    pub indent: usize,
    pub text: String,
}

impl LogicalLine {
    /// A line ending in `:` opens a block that needs an indented body.
    pub fn opens_block(&self) -> bool {
        self.text.ends_with(':')
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

impl LexError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

pub fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, LexError> {
    let chars: Vec<char> = source.chars().collect();
    let mut lines = Vec::new();
    let mut brackets: Vec<(char, usize)> = Vec::new();

    let mut buf = String::new();
    let mut start_line = 1;
    let mut indent = 0;
    let mut line = 1;
    let mut at_line_start = true;
    let mut i = 0;

    while i < chars.len() {
        if at_line_start && buf.is_empty() && brackets.is_empty() {
            let (width, next) = measure_indent(&chars, i);
            indent = width;
            start_line = line;
            i = next;
            at_line_start = false;
            continue;
        }
        at_line_start = false;

        let c = chars[i];
        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '"' | '\'' => {
                let end = scan_string(&chars, i, &mut line)?;
                buf.extend(&chars[i..end]);
                i = end;
            }
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                buf.push(' ');
                line += 1;
                i += 2;
            }
            '\\' if chars.get(i + 1) == Some(&'\r') && chars.get(i + 2) == Some(&'\n') => {
                buf.push(' ');
                line += 1;
                i += 3;
            }
            '(' | '[' | '{' => {
                brackets.push((c, line));
                buf.push(c);
                i += 1;
            }
            ')' | ']' | '}' => {
                match brackets.pop() {
                    Some((open, _)) if matching(open) == c => {}
                    Some((open, _)) => {
                        return Err(LexError::new(
                            line,
                            format!(
                                "closing parenthesis '{}' does not match opening parenthesis '{}'",
                                c, open
                            ),
                        ))
                    }
                    None => return Err(LexError::new(line, format!("unmatched '{}'", c))),
                }
                buf.push(c);
                i += 1;
            }
            '\n' => {
                line += 1;
                i += 1;
                if brackets.is_empty() {
                    flush(&mut lines, &mut buf, start_line, indent);
                    at_line_start = true;
                } else {
                    buf.push(' ');
                }
            }
            '\r' => {
                i += 1;
            }
            _ => {
                buf.push(c);
                i += 1;
            }
        }
    }

    if let Some((open, opened_at)) = brackets.first() {
        return Err(LexError::new(
            *opened_at,
            format!("'{}' was never closed", open),
        ));
    }
    flush(&mut lines, &mut buf, start_line, indent);

    Ok(lines)
}

fn flush(lines: &mut Vec<LogicalLine>, buf: &mut String, line: usize, indent: usize) {
    let text = buf.trim();
    if !text.is_empty() {
        lines.push(LogicalLine {
            line,
            indent,
            text: text.to_string(),
        });
    }
    buf.clear();
}

fn measure_indent(chars: &[char], mut i: usize) -> (usize, usize) {
    let mut width = 0;
    while i < chars.len() {
        match chars[i] {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            '\x0c' => width = 0,
            _ => break,
        }
        i += 1;
    }
    (width, i)
}

fn matching(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Returns the index one past the closing quote of the string starting at `start`.
fn scan_string(chars: &[char], start: usize, line: &mut usize) -> Result<usize, LexError> {
    let quote = chars[start];
    let opened_at = *line;
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut i = if triple { start + 3 } else { start + 1 };

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            match (chars.get(i + 1), chars.get(i + 2)) {
                (Some('\r'), Some('\n')) => {
                    *line += 1;
                    i += 3;
                }
                (Some('\n'), _) => {
                    *line += 1;
                    i += 2;
                }
                _ => i += 2,
            }
            continue;
        }
        if c == '\n' {
            if !triple {
                return Err(LexError::new(opened_at, "unterminated string literal"));
            }
            *line += 1;
        }
        if c == quote {
            if !triple {
                return Ok(i + 1);
            }
            if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                return Ok(i + 3);
            }
        }
        i += 1;
    }

    if triple {
        Err(LexError::new(
            opened_at,
            "unterminated triple-quoted string literal",
        ))
    } else {
        Err(LexError::new(opened_at, "unterminated string literal"))
    }
}
