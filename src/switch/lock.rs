//! Per-switch mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use log::trace;

use crate::error::{Error, Result};

/// A lock that can be held across calls, released explicitly.
pub trait SwitchLock: Send + Sync {
    fn acquire(&self) -> Result<()>;

    fn release(&self) -> Result<()>;
}

/// Blocking lock for one device, optionally giving up after a timeout.
#[derive(Debug)]
pub struct DeviceLock {
    name: String,
    held: Mutex<bool>,
    released: Condvar,
    timeout: Option<Duration>,
}

impl DeviceLock {
    pub fn new(name: &str, timeout: Option<Duration>) -> Self {
        DeviceLock {
            name: name.to_string(),
            held: Mutex::new(false),
            released: Condvar::new(),
            timeout,
        }
    }
}

impl SwitchLock for DeviceLock {
    fn acquire(&self) -> Result<()> {
        trace!("Acquiring lock on {}", self.name);
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);

        match self.timeout {
            None => {
                while *held {
                    held = self
                        .released
                        .wait(held)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
            Some(timeout) => {
                let (guard, _) = self
                    .released
                    .wait_timeout_while(held, timeout, |held| *held)
                    .unwrap_or_else(PoisonError::into_inner);
                held = guard;

                if *held {
                    return Err(Error::LockTimeout {
                        switch: self.name.clone(),
                    });
                }
            }
        }

        *held = true;
        trace!("Acquired lock on {}", self.name);

        Ok(())
    }

    fn release(&self) -> Result<()> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        *held = false;
        self.released.notify_one();
        trace!("Released lock on {}", self.name);

        Ok(())
    }
}

/// Hands out one lock per hostname, created on first use.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<DeviceLock>>>,
    timeout: Option<Duration>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        LockRegistry {
            timeout: Some(timeout),
            ..Default::default()
        }
    }

    /// Registry shared by the whole process.
    pub fn global() -> &'static LockRegistry {
        static GLOBAL: OnceLock<LockRegistry> = OnceLock::new();
        GLOBAL.get_or_init(LockRegistry::new)
    }

    pub fn lock_for(&self, hostname: &str) -> Arc<dyn SwitchLock> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        let lock = locks
            .entry(hostname.to_string())
            .or_insert_with(|| Arc::new(DeviceLock::new(hostname, self.timeout)));

        Arc::clone(lock) as Arc<dyn SwitchLock>
    }
}
