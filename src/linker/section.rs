//! Named, machine-rewritable regions inside a PR description.
//!
//! A section named `relatedPrs` looks like this on the wire (CRLF line
//! endings, as GitHub stores descriptions edited in the browser):
//!
//! ```text
//! <!---
//! <relatedPrs>
//! -->
//! - https://github.com/org/api/pull/9
//! <!---
//! </relatedPrs>
//! -->
//! ```
//!
//! Sections are only ever rewritten, never inserted: a body without the
//! markers comes back untouched.

use regex::{Captures, Regex};

const LINE_ENDING: &str = "\r\n";

/// Compiled matcher for one section name.
#[derive(Debug, Clone)]
pub struct Section {
    name: String,
    pattern: Regex,
}

impl Section {
    /// Section names match case-insensitively. Bare `\n` line endings inside
    /// the markers are accepted as well as `\r\n`.
    pub fn new(name: &str) -> Result<Section, regex::Error> {
        let name_pattern = regex::escape(name);
        let pattern = Regex::new(&format!(
            r"(?i)(<!---\r?\n<{name}>\r?\n-->\r?\n)(?s:.*?)(<!---\r?\n</{name}>\r?\n-->)",
            name = name_pattern
        ))?;
        Ok(Section {
            name: name.to_string(),
            pattern,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_present(&self, body: &str) -> bool {
        self.pattern.is_match(body)
    }

    /// Replace the content of the first instance of this section with
    /// `content`. Everything outside the section, including other sections,
    /// is preserved byte for byte. Without markers `body` is returned as is.
    pub fn rewrite(&self, body: &str, content: &str) -> String {
        self.pattern
            .replacen(body, 1, |caps: &Captures| {
                let mut out = String::with_capacity(caps[0].len() + content.len());
                out.push_str(&caps[1]);
                if !content.is_empty() {
                    out.push_str(content);
                    out.push_str(LINE_ENDING);
                }
                out.push_str(&caps[2]);
                out
            })
            .into_owned()
    }

    /// Empty section markers, for PR templates.
    pub fn template(&self) -> String {
        format!(
            "<!---{le}<{name}>{le}-->{le}<!---{le}</{name}>{le}-->",
            le = LINE_ENDING,
            name = self.name
        )
    }
}
