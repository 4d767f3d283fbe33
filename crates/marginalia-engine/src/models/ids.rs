use serde::Serialize;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a paragraph, unique within a document
    ParagraphId
);
string_id!(
    /// Identifier of a sentence, unique within a document
    SentenceId
);
string_id!(
    /// Identifier of a remark, unique within a document
    RemarkId
);

/// Source of fresh identifiers for paragraphs, sentences and remarks.
///
/// `Uuid` is what a live session uses. `Sequential` hands out short
/// predictable ids (`p1`, `s2`, `r3`, ...) sharing one counter, which keeps
/// test output and snapshots stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdGenerator {
    #[default]
    Uuid,
    Sequential { next: u64 },
}

impl IdGenerator {
    pub fn sequential() -> Self {
        IdGenerator::Sequential { next: 1 }
    }

    /// Produce the next raw id string with the given kind prefix
    pub fn next_raw(&mut self, prefix: &str) -> String {
        match self {
            IdGenerator::Uuid => format!("{prefix}-{}", uuid::Uuid::new_v4().simple()),
            IdGenerator::Sequential { next } => {
                let id = format!("{prefix}{next}");
                *next += 1;
                id
            }
        }
    }

    pub fn paragraph_id(&mut self) -> ParagraphId {
        ParagraphId(self.next_raw("p"))
    }

    pub fn sentence_id(&mut self) -> SentenceId {
        SentenceId(self.next_raw("s"))
    }

    pub fn remark_id(&mut self) -> RemarkId {
        RemarkId(self.next_raw("r"))
    }
}
