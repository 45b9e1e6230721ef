//! Fenced code extraction from model answers.

/// The first fenced block of an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Lowercased first word of the info string, if any.
    pub language: Option<String>,
    /// Text between the fences, trimmed.
    pub body: String,
}

impl CodeBlock {
    /// File extension for the artifact: `py` for Python, `sh` for shell, `txt` otherwise.
    pub fn extension(&self) -> &'static str {
        match self.language.as_deref() {
            Some("python") | Some("py") | Some("python3") => "py",
            Some("bash") | Some("sh") | Some("shell") => "sh",
            _ => "txt",
        }
    }
}

/// Find the first complete ```` ``` ```` fenced block in `text`.
///
/// Returns `None` when there is no fence, the opening fence is never closed, or the body is
/// blank.
///
/// ```
/// use aichat::code_block::extract_code_block;
///
/// let answer = "Here you go:\n```python\nprint(1+1)\n```\nDone.";
/// let block = extract_code_block(answer).unwrap();
/// assert_eq!(block.language.as_deref(), Some("python"));
/// assert_eq!(block.body, "print(1+1)");
/// assert_eq!(block.extension(), "py");
/// ```
pub fn extract_code_block(text: &str) -> Option<CodeBlock> {
    const FENCE: &str = "```";

    let open = text.find(FENCE)?;
    let rest = &text[open + FENCE.len()..];
    let close = rest.find(FENCE)?;
    let inner = &rest[..close];

    // ```lang\nbody``` vs. the inline ```body```
    let (language, body) = match inner.split_once('\n') {
        Some((info, body)) => {
            let language = info
                .split_whitespace()
                .next()
                .map(|word| word.to_lowercase());
            (language, body)
        }
        None => (None, inner),
    };

    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    Some(CodeBlock {
        language,
        body: body.to_string(),
    })
}
