//! Scoped `NYUUKIT_DATA_DIR` overrides for path tests.

use std::env;
use std::ffi::OsString;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::platform::DATA_DIR_ENV;

static DATA_DIR_LOCK: Mutex<()> = Mutex::new(());

/// Points the data root at `path` until dropped.
///
/// Holds a process-wide lock for its lifetime, so tests that touch the data
/// root run one at a time. A panicking test does not poison later ones.
pub struct DataDirOverride {
    previous: Option<OsString>,
    _lock: MutexGuard<'static, ()>,
}

impl DataDirOverride {
    #[allow(unsafe_code)]
    pub fn set(path: impl AsRef<Path>) -> Self {
        let lock = DATA_DIR_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = env::var_os(DATA_DIR_ENV);
        // SAFETY: every writer of this variable holds DATA_DIR_LOCK.
        unsafe { env::set_var(DATA_DIR_ENV, path.as_ref()) };
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for DataDirOverride {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: the lock is still held; it is released after this body.
        match self.previous.take() {
            Some(value) => unsafe { env::set_var(DATA_DIR_ENV, value) },
            None => unsafe { env::remove_var(DATA_DIR_ENV) },
        }
    }
}
