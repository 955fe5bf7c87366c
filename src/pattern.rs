//! Typed template paths.
//!
//! A template's path relative to the template root may embed two placeholder
//! tokens:
//!
//! - `{{LANG}}`: replaced by each configured language code
//! - `{{NAME}}`: replaced by the stem of each content file in the template's
//!   directory
//!
//! Instead of searching and replacing on the raw string at every expansion,
//! the path is parsed once into an ordered list of [`Segment`]s. Expansion
//! then walks the segments and fills each placeholder from a [`Bindings`]
//! value, so the result does not depend on which token is substituted first.
//!
//! ```text
//! blog/{{NAME}}.{{LANG}}.tmd
//! └──┬─┘└───┬──┘└┬┘└───┬──┘└─┬─┘
//! Literal  Name  Lit  Lang  Literal
//! ```

use std::fmt;

/// Placeholder for a language code.
pub const LANG_TOKEN: &str = "{{LANG}}";

/// Placeholder for a content file stem.
pub const NAME_TOKEN: &str = "{{NAME}}";

/// One piece of a template path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Lang,
    Name,
}

/// Values substituted for placeholders during expansion.
///
/// A `None` binding leaves the placeholder token in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bindings<'a> {
    pub lang: Option<&'a str>,
    pub name: Option<&'a str>,
}

/// A template path parsed into literal segments and placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePattern {
    segments: Vec<Segment>,
}

impl TemplatePattern {
    /// Parse a `/`-separated relative template path.
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = path;

        loop {
            let next = [(LANG_TOKEN, Segment::Lang), (NAME_TOKEN, Segment::Name)]
                .into_iter()
                .filter_map(|(token, seg)| rest.find(token).map(|pos| (pos, token, seg)))
                .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, token, seg)) => {
                    if pos > 0 {
                        segments.push(Segment::Literal(rest[..pos].to_string()));
                    }
                    segments.push(seg);
                    rest = &rest[pos + token.len()..];
                }
                None => {
                    if !rest.is_empty() {
                        segments.push(Segment::Literal(rest.to_string()));
                    }
                    break;
                }
            }
        }

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the path contains `{{LANG}}`.
    pub fn is_language_parameterized(&self) -> bool {
        self.segments.contains(&Segment::Lang)
    }

    /// Whether the path contains `{{NAME}}`.
    pub fn is_name_parameterized(&self) -> bool {
        self.segments.contains(&Segment::Name)
    }

    /// Directory part of the template path, with placeholders left as tokens.
    ///
    /// Empty for templates at the root of the template tree.
    pub fn directory(&self) -> String {
        let raw = self.to_string();
        match raw.rfind('/') {
            Some(pos) => raw[..pos].to_string(),
            None => String::new(),
        }
    }

    /// Produce a concrete path by filling placeholders from `bindings`.
    pub fn expand(&self, bindings: Bindings<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Lang => out.push_str(bindings.lang.unwrap_or(LANG_TOKEN)),
                Segment::Name => out.push_str(bindings.name.unwrap_or(NAME_TOKEN)),
            }
        }
        out
    }
}

impl fmt::Display for TemplatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expand(Bindings::default()))
    }
}
