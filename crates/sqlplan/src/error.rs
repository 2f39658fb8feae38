use std::fmt::Debug;

use serde::Serialize;

/// A sqlplan error, raised either while compiling a statement or while
/// decoding the rows a driver returned for it.
#[derive(Debug, Clone)]
pub struct Error {
    /// Message kind. Currently only Error is implemented.
    pub kind: MessageKind,
    pub reason: Reason,
    pub hints: Vec<String>,
    /// Machine readable identifier error code eg, "E0001"
    pub code: Option<&'static str>,
}

/// Compile message kind. Currently only Error is implemented.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    Simple(String),
    Expected {
        who: Option<String>,
        expected: String,
        found: String,
    },
    Unexpected {
        found: String,
    },
    NotFound {
        name: String,
        namespace: String,
    },
    /// The target dialect lacks a capability and has no equivalent rendering.
    UnsupportedFeature {
        feature: String,
        dialect: Option<String>,
    },
    /// A raw row does not match the projection the statement promised.
    DecodeMismatch {
        statement: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    Bug {
        details: Option<String>,
    },
}

impl Error {
    pub fn new(reason: Reason) -> Self {
        Error {
            kind: MessageKind::Error,
            reason,
            hints: Vec::new(),
            code: None,
        }
    }

    pub fn new_simple<S: ToString>(reason: S) -> Self {
        Error::new(Reason::Simple(reason.to_string()))
    }

    pub fn new_unsupported<S: ToString>(feature: S) -> Self {
        Error::new(Reason::UnsupportedFeature {
            feature: feature.to_string(),
            dialect: None,
        })
        .with_code("E0101")
    }

    /// Used for things that you *think* should never happen, but are not sure.
    pub fn new_assert<S: ToString>(details: S) -> Self {
        Error::new(Reason::Bug {
            details: Some(details.to_string()),
        })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self.reason, Reason::UnsupportedFeature { .. })
    }

    /// Attaches the dialect name to an unsupported-feature error that was
    /// raised somewhere that did not know which dialect it was rendering for.
    pub(crate) fn in_dialect(mut self, name: &str) -> Self {
        if let Reason::UnsupportedFeature { dialect, .. } = &mut self.reason {
            dialect.get_or_insert_with(|| name.to_string());
        }
        self
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reason::Simple(text) => f.write_str(text),
            Reason::Expected {
                who,
                expected,
                found,
            } => {
                if let Some(who) = who {
                    write!(f, "{who} ")?;
                }
                write!(f, "expected {expected}, but found {found}")
            }
            Reason::Unexpected { found } => write!(f, "unexpected {found}"),
            Reason::NotFound { name, namespace } => write!(f, "{namespace} `{name}` not found"),
            Reason::UnsupportedFeature { feature, dialect } => {
                write!(f, "{feature} is not supported")?;
                if let Some(dialect) = dialect {
                    write!(f, " by dialect {dialect}")?;
                }
                Ok(())
            }
            Reason::DecodeMismatch {
                statement,
                row,
                expected,
                found,
            } => write!(
                f,
                "cannot decode row {row} of {statement} statement: expected {expected} columns, but found {found}"
            ),
            Reason::Bug { details } => {
                write!(f, "internal compiler error")?;
                if let Some(details) = details {
                    write!(f, "; {details}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(code) = self.code {
            write!(f, "[{code}] ")?;
        }
        write!(f, "{}", self.reason)?;
        for hint in &self.hints {
            write!(f, "\n  ↳ hint: {hint}")?;
        }
        Ok(())
    }
}

pub trait WithErrorInfo: Sized {
    fn push_hint<S: Into<String>>(self, hint: S) -> Self;

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(self, hints: I) -> Self;

    fn with_code(self, code: &'static str) -> Self;
}

impl WithErrorInfo for Error {
    fn push_hint<S: Into<String>>(mut self, hint: S) -> Self {
        self.hints.push(hint.into());
        self
    }

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(mut self, hints: I) -> Self {
        self.hints = hints.into_iter().map(|x| x.into()).collect();
        self
    }

    fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

impl<T, E: WithErrorInfo> WithErrorInfo for Result<T, E> {
    fn push_hint<S: Into<String>>(self, hint: S) -> Self {
        self.map_err(|e| e.push_hint(hint))
    }

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(self, hints: I) -> Self {
        self.map_err(|e| e.with_hints(hints))
    }

    fn with_code(self, code: &'static str) -> Self {
        self.map_err(|e| e.with_code(code))
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
