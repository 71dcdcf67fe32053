//! Success/failure heuristics over the output of a command.
//!
//! Devices print errors on the same channel as everything else, so "no
//! output" or "no line matching an error pattern" is the best success signal
//! available.

use super::matcher;
use crate::error::{Error, Result};

pub struct ResultChecker<'a> {
    lines: &'a [String],
}

impl<'a> ResultChecker<'a> {
    pub fn new(lines: &'a [String]) -> Self {
        ResultChecker { lines }
    }

    pub fn lines(&self) -> &'a [String] {
        self.lines
    }

    /// Fails with `error()` if the command printed anything.
    pub fn on_any_result<F, E>(self, error: F) -> Result<Self>
    where
        F: FnOnce() -> E,
        E: Into<Error>,
    {
        if !self.lines.is_empty() {
            return Err(error().into());
        }

        Ok(self)
    }

    /// Fails with `error()` if a line matches `pattern` from its start.
    pub fn on_result_matching<F, E>(self, pattern: &str, error: F) -> Result<Self>
    where
        F: FnOnce() -> E,
        E: Into<Error>,
    {
        match matcher::first_match(pattern, self.lines)? {
            Some(_) => Err(error().into()),
            None => Ok(self),
        }
    }
}
