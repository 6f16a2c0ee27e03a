use crate::types::{CodeExample, ExampleOrigin};

/// Extract code examples from docstring text in order of appearance:
/// fenced blocks (``` or ~~~) and doctest sessions (`>>>`).
pub fn extract_examples(docstring: &str) -> Vec<CodeExample> {
    let lines: Vec<&str> = docstring.lines().collect();
    let mut examples = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim_start();

        if let Some(fence) = Fence::open(lines[i]) {
            let mut body = Vec::new();
            i += 1;
            while i < lines.len() && !fence.closes(lines[i]) {
                body.push(fence.strip_indent(lines[i]));
                i += 1;
            }
            // Skip the closing fence; an unterminated fence runs to the end.
            i += 1;

            let code = dedent(&body.join("\n"));
            let code = if fence.is_console() || code.trim_start().starts_with(">>>") {
                doctest_source(code.lines())
            } else {
                code
            };
            if !code.trim().is_empty() {
                examples.push(CodeExample::new(code, fence.language, ExampleOrigin::Fence));
            }
            continue;
        }

        if trimmed.starts_with(">>>") {
            let start = i;
            while i < lines.len() && !lines[i].trim().is_empty() && Fence::open(lines[i]).is_none() {
                i += 1;
            }
            let code = doctest_source(lines[start..i].iter().copied());
            if !code.trim().is_empty() {
                examples.push(CodeExample::new(code, None, ExampleOrigin::Doctest));
            }
            continue;
        }

        i += 1;
    }

    examples
}

struct Fence {
    marker: char,
    len: usize,
    indent: usize,
    language: Option<String>,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        let info = trimmed[len..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }
        let language = info
            .split(|c: char| c.is_whitespace() || c == '{' || c == ',')
            .next()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        Some(Self {
            marker,
            len,
            indent,
            language,
        })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let run = trimmed.chars().take_while(|c| *c == self.marker).count();
        run >= self.len && run == trimmed.chars().count()
    }

    fn strip_indent<'a>(&self, line: &'a str) -> &'a str {
        let leading = line.len() - line.trim_start().len();
        let cut = leading.min(self.indent);
        line.get(cut..).unwrap_or(line)
    }

    fn is_console(&self) -> bool {
        matches!(self.language.as_deref(), Some("pycon") | Some(">>>"))
    }
}

/// Turn a doctest session into plain source: keep prompt lines without their
/// prompts and drop expected output. A `...` line continues source only
/// directly after a prompt line; elsewhere it is output.
fn doctest_source<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let mut code = Vec::new();
    let mut in_source = false;
    for line in lines {
        let trimmed = line.trim_start();
        let rest = match trimmed.strip_prefix(">>>") {
            Some(rest) => Some(rest),
            None if in_source => trimmed.strip_prefix("..."),
            None => None,
        };
        in_source = rest.is_some();
        if let Some(rest) = rest {
            code.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
    }
    code.join("\n")
}

/// Remove whitespace common to the start of every non-blank line.
pub fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                ""
            } else {
                l.get(margin..).unwrap_or(l).trim_end()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
