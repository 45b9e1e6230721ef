//! Instructions that bypass the secretary and go straight to the file store.

/// `create file <name> <content>` or `read file <name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Passthrough {
    CreateFile { name: String, content: String },
    ReadFile { name: String },
}

impl Passthrough {
    /// Recognise a passthrough form. Keywords are case-insensitive; `create file` needs both a
    /// name and content, anything shorter is not a passthrough.
    ///
    /// ```
    /// use aichat::commands::Passthrough;
    ///
    /// assert_eq!(
    ///     Passthrough::parse("create file hello.py print('hi there')"),
    ///     Some(Passthrough::CreateFile {
    ///         name: "hello.py".into(),
    ///         content: "print('hi there')".into(),
    ///     })
    /// );
    /// assert_eq!(Passthrough::parse("what is a file?"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        if let Some(rest) = strip_keyword(input, "create file ") {
            let (name, content) = rest.trim_start().split_once(' ')?;
            if name.is_empty() || content.is_empty() {
                return None;
            }
            return Some(Passthrough::CreateFile {
                name: name.to_string(),
                content: content.to_string(),
            });
        }
        if let Some(rest) = strip_keyword(input, "read file ") {
            let name = rest.trim();
            if name.is_empty() {
                return None;
            }
            return Some(Passthrough::ReadFile {
                name: name.to_string(),
            });
        }
        None
    }
}

fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    let head = input.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) {
        Some(&input[keyword.len()..])
    } else {
        None
    }
}
