//! Scoped navigation into CLI configuration contexts.
//!
//! ```ignore
//! let interface = SubShellContext::new(["configure terminal", "interface Gi0/1"], "exit")
//!     .validate(fail_on_contains("Invalid input", || SwitchError::unknown_interface("Gi0/1")));
//!
//! let mut shell = interface.enter(&mut session)?;
//! shell.execute("switchport access vlan 100")?;
//! // both levels are exited when `shell` goes out of scope
//! ```

use log::{debug, warn};
use regex::Regex;

use super::session::{Expect, Shell};
use crate::error::{Error, Result};

/// Inspects the output of an enter command, failing when it shows an error.
pub type Validator = Box<dyn Fn(&[String]) -> Result<()>>;

/// Enter commands, the command backing out of each level, and an optional
/// validator applied to the output of every enter command.
pub struct SubShellContext {
    enter: Vec<String>,
    exit: String,
    validator: Option<Validator>,
}

impl SubShellContext {
    pub fn new<I, S>(enter: I, exit: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SubShellContext {
            enter: enter.into_iter().map(Into::into).collect(),
            exit: exit.to_string(),
            validator: None,
        }
    }

    pub fn validate(mut self, validator: impl Fn(&[String]) -> Result<()> + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Sends the enter commands in order. Every level entered so far is
    /// exited before an error is returned.
    pub fn enter<'a, S: Shell + ?Sized>(&self, shell: &'a mut S) -> Result<SubShell<'a, S>> {
        let mut sub_shell = SubShell {
            shell,
            exit: self.exit.clone(),
            depth: 0,
        };

        for command in &self.enter {
            let lines = sub_shell.shell.execute(command)?;
            sub_shell.depth += 1;

            if let Some(validator) = &self.validator {
                validator(&lines)?;
            }
        }

        Ok(sub_shell)
    }
}

/// Guard over an entered context. Dropping it sends the exit command once
/// per level entered; [`SubShell::close`] does the same but reports errors.
pub struct SubShell<'a, S: Shell + ?Sized> {
    shell: &'a mut S,
    exit: String,
    depth: usize,
}

impl<S: Shell + ?Sized> SubShell<'_, S> {
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn close(mut self) -> Result<()> {
        self.exit_all()
    }

    fn exit_all(&mut self) -> Result<()> {
        let mut result = Ok(());

        while self.depth > 0 {
            self.depth -= 1;
            debug!("Leaving sub-shell level {}", self.depth + 1);

            if let Err(e) = self.shell.execute(&self.exit) {
                if result.is_ok() {
                    result = Err(e);
                } else {
                    warn!("Failed to exit sub-shell: {}", e);
                }
            }
        }

        result
    }
}

impl<S: Shell + ?Sized> Shell for SubShell<'_, S> {
    fn execute_with(&mut self, command: &str, expect: &Expect) -> Result<Vec<String>> {
        self.shell.execute_with(command, expect)
    }

    fn send_key_with(&mut self, key: &str, expect: &Expect) -> Result<Vec<String>> {
        self.shell.send_key_with(key, expect)
    }

    fn quit(&mut self, command: &str) -> Result<()> {
        self.shell.quit(command)
    }

    fn current_prompt(&self) -> &str {
        self.shell.current_prompt()
    }
}

impl<S: Shell + ?Sized> Drop for SubShell<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.exit_all() {
            warn!("Failed to exit sub-shell: {}", e);
        }
    }
}

/// Fails with `error()` when a line contains `text`.
pub fn fail_on_contains<F, E>(text: &str, error: F) -> impl Fn(&[String]) -> Result<()>
where
    F: Fn() -> E,
    E: Into<Error>,
{
    let text = text.to_string();

    move |lines: &[String]| {
        if lines.iter().any(|line| line.contains(text.as_str())) {
            return Err(error().into());
        }
        Ok(())
    }
}

/// Fails with `error()` when a line matches `pattern` anywhere.
pub fn fail_on_match<F, E>(pattern: &str, error: F) -> Result<impl Fn(&[String]) -> Result<()>>
where
    F: Fn() -> E,
    E: Into<Error>,
{
    let regex = Regex::new(pattern)?;

    Ok(move |lines: &[String]| {
        if lines.iter().any(|line| regex.is_match(line)) {
            return Err(error().into());
        }
        Ok(())
    })
}
