use log::debug;

use super::matcher::Terminator;
use super::session::{Expect, Shell};
use crate::error::{Error, Result};

const PRIVILEGED_PROMPT: &str = "#";

pub fn is_privileged(shell: &(impl Shell + ?Sized)) -> bool {
    shell.current_prompt().ends_with(PRIVILEGED_PROMPT)
}

/// Moves an unprivileged (`>`) session to the privileged (`#`) level.
pub fn enable<S: Shell + ?Sized>(shell: &mut S, password: &str) -> Result<()> {
    if is_privileged(&*shell) {
        return Ok(());
    }

    debug!("Enabling privileged mode from {:?}", shell.current_prompt());
    shell.execute_with("enable", &Expect::new().wait_for(Terminator::literal(": ")))?;
    shell.execute(password)?;

    if !is_privileged(&*shell) {
        return Err(Error::AuthenticationFailed {
            user: "enable".to_string(),
        });
    }

    Ok(())
}
