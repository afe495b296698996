use std::fmt;
use std::ops::Range;

/// The full text under transformation.
///
/// A Document is never edited in place: substitution builds a new value and
/// leaves the original untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Document {
    text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Document { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// The text covered by `range`.
    pub fn slice(&self, range: Range<usize>) -> &str {
        &self.text[range]
    }

    /// Convert a byte offset to a 1-based line number.
    pub fn line_of(&self, offset: usize) -> usize {
        self.text[..offset.min(self.text.len())]
            .bytes()
            .filter(|&b| b == b'\n')
            .count()
            + 1
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Document { text }
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Document {
            text: text.to_string(),
        }
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Replacement text for one block's body. Inserted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Payload {
    text: String,
}

impl Payload {
    pub fn new(text: impl Into<String>) -> Self {
        Payload { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines the payload occupies once spliced into a block.
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload { text }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload {
            text: text.to_string(),
        }
    }
}

impl AsRef<str> for Payload {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
