//! Identifier quoting and string literal escaping
//!
//! Quoting doubles the closing delimiter, which keeps it injective: two
//! different identifiers never quote to the same text, and [`QuoteStyle::unquote`]
//! recovers the original exactly.

use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

/// Longest identifier accepted by [`QuoteStyle::quote`], in bytes
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// How a dialect delimits identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteStyle {
    /// `` `name` `` (MySQL, MariaDB)
    Backtick,
    /// `"name"` (PostgreSQL, SQLite, ANSI)
    DoubleQuote,
    /// `[name]` (SQL Server)
    Bracket,
}

impl QuoteStyle {
    pub fn open(self) -> char {
        match self {
            QuoteStyle::Backtick => '`',
            QuoteStyle::DoubleQuote => '"',
            QuoteStyle::Bracket => '[',
        }
    }

    pub fn close(self) -> char {
        match self {
            QuoteStyle::Backtick => '`',
            QuoteStyle::DoubleQuote => '"',
            QuoteStyle::Bracket => ']',
        }
    }

    /// Quote an identifier, escaping embedded delimiters
    pub fn quote(self, identifier: &str) -> Result<String> {
        validate_identifier(identifier)?;
        let close = self.close();
        let mut quoted = String::with_capacity(identifier.len() + 2);
        quoted.push(self.open());
        for ch in identifier.chars() {
            if ch == close {
                quoted.push(close);
            }
            quoted.push(ch);
        }
        quoted.push(close);
        Ok(quoted)
    }

    /// Parse quoted text produced by [`QuoteStyle::quote`] back into the identifier
    pub fn unquote(self, quoted: &str) -> Result<String> {
        let close = self.close();
        let inner = quoted
            .strip_prefix(self.open())
            .and_then(|rest| rest.strip_suffix(close))
            .ok_or_else(|| CoreError::invalid_identifier(quoted, "missing delimiters"))?;

        let mut identifier = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            if ch == close {
                match chars.next() {
                    Some(next) if next == close => identifier.push(close),
                    _ => {
                        return Err(CoreError::invalid_identifier(
                            quoted,
                            format!("unescaped {close} inside quoted identifier"),
                        ));
                    }
                }
            } else {
                identifier.push(ch);
            }
        }
        validate_identifier(&identifier)?;
        Ok(identifier)
    }
}

/// How a dialect escapes the body of a single-quoted string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralStyle {
    /// Only `'` is special and is doubled
    Standard,
    /// Backslash is an escape character as well (MySQL default sql_mode)
    Backslash,
}

impl LiteralStyle {
    /// Escape the body of a literal. Total: every string has an escaped form.
    pub fn escape(self, value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for ch in value.chars() {
            match (self, ch) {
                (_, '\'') => escaped.push_str("''"),
                (LiteralStyle::Backslash, '\\') => escaped.push_str("\\\\"),
                (LiteralStyle::Backslash, '\0') => escaped.push_str("\\0"),
                (LiteralStyle::Backslash, '\n') => escaped.push_str("\\n"),
                (LiteralStyle::Backslash, '\r') => escaped.push_str("\\r"),
                (LiteralStyle::Backslash, '\u{1a}') => escaped.push_str("\\Z"),
                (_, other) => escaped.push(other),
            }
        }
        escaped
    }

    /// Escape and wrap in single quotes
    pub fn quote(self, value: &str) -> String {
        format!("'{}'", self.escape(value))
    }
}

/// Reject identifiers no dialect can represent
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(CoreError::invalid_identifier(identifier, "identifier is empty"));
    }
    if identifier.contains('\0') {
        return Err(CoreError::invalid_identifier(
            identifier,
            "identifier contains a NUL character",
        ));
    }
    if identifier.len() > MAX_IDENTIFIER_LENGTH {
        return Err(CoreError::invalid_identifier(
            identifier,
            format!("identifier exceeds {MAX_IDENTIFIER_LENGTH} bytes"),
        ));
    }
    Ok(())
}
