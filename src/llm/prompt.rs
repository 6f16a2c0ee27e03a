//! Prompt templates and the section convention used to read replies.
//!
//! Enhancement replies must contain three headed sections:
//!
//! ~~~text
//! ### SUMMARY
//! ...
//! ### EXPLANATION
//! ...
//! ### EXAMPLE
//! ```python
//! ...
//! ```
//! ~~~

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ProviderError;
use crate::types::CodeUnit;

// "### SUMMARY", "## Summary:", "**Summary**", "SUMMARY:" on a line of their own
static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[ \t]*(?:#{1,6}[ \t]*)?(?:\*\*)?(summary|explanation|example)(?:\*\*)?[ \t]*:?[ \t]*(?:\*\*)?[ \t]*$")
        .unwrap()
});

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[^\n`]*\n(.*?)\n?```").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct Sections {
    pub summary: String,
    pub explanation: String,
    pub example: String,
}

pub fn enhance_prompt(unit: &CodeUnit, language: &str) -> String {
    let docstring = unit
        .docstring
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("(no docstring)");

    format!(
        "You are documenting Python code. Write all prose in the language with code \"{language}\".\n\
         \n\
         Kind: {kind}\n\
         Name: {name}\n\
         Signature:\n\
         ```python\n\
         {signature}\n\
         ```\n\
         Docstring:\n\
         \"\"\"\n\
         {docstring}\n\
         \"\"\"\n\
         \n\
         Reply with exactly these three sections and nothing else:\n\
         ### SUMMARY\n\
         One or two sentences describing what it does.\n\
         ### EXPLANATION\n\
         A short paragraph on behaviour, parameters and return value.\n\
         ### EXAMPLE\n\
         A single ```python fenced block with a short, self-contained usage example.\n",
        language = language,
        kind = unit.kind,
        name = unit.qualified_name,
        signature = unit.signature,
        docstring = docstring,
    )
}

pub fn translate_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following documentation into the language with code \"{target}\".\n\
         Keep Markdown structure, code blocks, identifiers, and function names unchanged.\n\
         Reply with the translation only.\n\
         \n\
         {text}\n",
        target = target_language,
        text = text,
    )
}

pub fn translate_code_prompt(code: &str, target_language: &str) -> String {
    format!(
        "Translate only the comments and string literals meant for humans in this Python code \
         into the language with code \"{target}\". Do not change identifiers, keywords, or logic.\n\
         Reply with the code only, in a single ```python fenced block.\n\
         \n\
         ```python\n\
         {code}\n\
         ```\n",
        target = target_language,
        code = code,
    )
}

struct Heading<'a> {
    start: usize,
    end: usize,
    label: &'a str,
}

/// Section headings in reply order. Lines inside fenced code blocks are never
/// headings, so a `# Example` comment in the snippet stays part of it.
fn find_headings(reply: &str) -> Vec<Heading<'_>> {
    let mut headings = Vec::new();
    let mut open_fence: Option<&str> = None;
    let mut offset = 0;

    for line in reply.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let text = line.trim_end_matches(['\n', '\r']);

        if let Some(marker) = fence_marker(text) {
            open_fence = match open_fence {
                // A closing fence repeats the opening character at least as often.
                Some(open) if marker.starts_with(open) => None,
                Some(open) => Some(open),
                None => Some(marker),
            };
            continue;
        }
        if open_fence.is_some() {
            continue;
        }

        if let Some(label) = SECTION_HEADING.captures(text).and_then(|cap| cap.get(1)) {
            headings.push(Heading {
                start,
                end: offset,
                label: label.as_str(),
            });
        }
    }

    headings
}

/// The run of backticks or tildes opening a fence line, if any.
fn fence_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let first = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = trimmed.len() - trimmed.trim_start_matches(first).len();
    (run >= 3).then(|| &trimmed[..run])
}

/// Split an enhancement reply into its three sections.
pub fn parse_sections(provider: &str, reply: &str) -> Result<Sections, ProviderError> {
    let mut summary = None;
    let mut explanation = None;
    let mut example = None;

    let headings = find_headings(reply);
    if headings.is_empty() {
        return Err(ProviderError::malformed(
            provider,
            "reply has no SUMMARY/EXPLANATION/EXAMPLE sections",
        ));
    }

    for (idx, heading) in headings.iter().enumerate() {
        let end = headings
            .get(idx + 1)
            .map(|next| next.start)
            .unwrap_or(reply.len());
        let body = reply[heading.end..end].trim().to_string();

        let slot = match heading.label.to_ascii_lowercase().as_str() {
            "summary" => &mut summary,
            "explanation" => &mut explanation,
            _ => &mut example,
        };
        if slot.is_none() {
            *slot = Some(body);
        }
    }

    let require = |value: Option<String>, name: &str| {
        value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::malformed(provider, format!("missing {} section", name)))
    };

    let summary = require(summary, "SUMMARY")?;
    let explanation = require(explanation, "EXPLANATION")?;
    let example = require(example.map(|e| strip_fence(&e)), "EXAMPLE")?;

    Ok(Sections {
        summary,
        explanation,
        example,
    })
}

/// Body of the first fenced block, or the trimmed text when there is none.
pub fn strip_fence(text: &str) -> String {
    FENCED_BLOCK
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim_end().to_string())
        .unwrap_or_else(|| text.trim().to_string())
}
