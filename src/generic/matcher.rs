//! Pattern helpers shared by the terminal engine and the CLI parsers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

use regex::Regex;

use crate::error::Result;

/// Marks the end of a device response in the read buffer.
#[derive(Debug, Clone)]
pub enum Terminator {
    /// The buffer must end with this exact text.
    Literal(String),
    /// The buffer must match this pattern, anchored at its end.
    Pattern(Regex),
}

impl Terminator {
    pub fn literal(text: impl Into<String>) -> Self {
        Terminator::Literal(text.into())
    }

    /// Compiles `pattern`, adding a `$` anchor when it has none.
    pub fn pattern(pattern: &str) -> Result<Self> {
        let anchored = if pattern.ends_with('$') {
            pattern.to_string()
        } else {
            format!("(?:{})$", pattern)
        };

        Ok(Terminator::Pattern(Regex::new(&anchored)?))
    }

    pub fn is_end_of(&self, buffer: &str) -> bool {
        match self {
            Terminator::Literal(text) => buffer.ends_with(text.as_str()),
            Terminator::Pattern(regex) => regex.is_match(buffer),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Literal(text) => write!(f, "{:?}", text),
            Terminator::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Renders a list of terminators for error messages.
pub fn describe(terminators: &[Terminator]) -> String {
    terminators
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Captured groups of a successful match. Index 0 is the whole match,
/// groups that did not participate are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Groups(Vec<Option<String>>);

impl Groups {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|group| group.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn compiled(pattern: &str) -> Result<Regex> {
    static CACHE: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();

    let mut cache = CACHE
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }

    let regex = Regex::new(pattern)?;
    cache.insert(pattern.to_string(), regex.clone());

    Ok(regex)
}

/// Matches `pattern` at the start of `text` and returns its groups.
pub fn regex_match(pattern: &str, text: &str) -> Result<Option<Groups>> {
    let regex = compiled(pattern)?;

    Ok(regex
        .captures(text)
        .filter(|captures| captures.get(0).is_some_and(|m| m.start() == 0))
        .map(|captures| {
            Groups(
                captures
                    .iter()
                    .map(|group| group.map(|m| m.as_str().to_string()))
                    .collect(),
            )
        }))
}

/// Returns the groups of the first line matching `pattern`.
pub fn first_match<S: AsRef<str>>(pattern: &str, lines: &[S]) -> Result<Option<Groups>> {
    for line in lines {
        if let Some(groups) = regex_match(pattern, line.as_ref())? {
            return Ok(Some(groups));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_terminators_match_suffix_only() {
        let prompt = Terminator::literal("#");
        assert!(prompt.is_end_of("show vlan\r\nswitch#"));
        assert!(!prompt.is_end_of("switch# show"));
    }

    #[test]
    fn pattern_terminators_are_anchored() -> anyhow::Result<()> {
        let prompt = Terminator::pattern(r"[Pp]assword: ?")?;
        assert!(prompt.is_end_of("Password: "));
        assert!(!prompt.is_end_of("Password: hunter2\r\nswitch>"));

        let prompt = Terminator::pattern(r"\(config\)#$")?;
        assert!(prompt.is_end_of("switch(config)#"));

        Ok(())
    }

    #[test]
    fn regex_match_returns_groups_by_value() -> anyhow::Result<()> {
        let groups = regex_match(r"VLAN (\d+)(?: name (\S+))?", "VLAN 100 name web")?
            .expect("should match");
        assert_eq!(groups.get(1), Some("100"));
        assert_eq!(groups.get(2), Some("web"));

        let groups = regex_match(r"VLAN (\d+)(?: name (\S+))?", "VLAN 200")?.expect("should match");
        assert_eq!(groups.get(2), None);

        assert!(regex_match(r"VLAN (\d+)", "  VLAN 100")?.is_none());

        Ok(())
    }

    #[test]
    fn first_match_scans_lines_in_order() -> anyhow::Result<()> {
        let lines = [
            "Interface Gi0/1",
            "  switchport access vlan 10",
            "  switchport access vlan 20",
        ];
        let groups =
            first_match(r"\s*switchport access vlan (\d+)", &lines)?.expect("should match");
        assert_eq!(groups.get(1), Some("10"));

        assert!(first_match(r"shutdown", &lines)?.is_none());
        assert!(regex_match(r"(", "x").is_err());

        Ok(())
    }
}
