//! Credential Pool: round-robin rotation over interchangeable API keys.
//!
//! No health tracking: a key that was rate-limited a moment ago is still
//! handed out on its next turn.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Number of leading characters kept when a credential is displayed.
const VISIBLE_PREFIX: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("credential pool requires at least one credential")]
    Empty,
}

/// An opaque secret token. `Debug` and `Display` only ever show the masked form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    /// The raw secret, for placing in an outbound request header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First few characters followed by `...`.
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(VISIBLE_PREFIX).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Ordered, immutable set of credentials with a shared rotation cursor.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Builds a pool, dropping duplicates while keeping first-seen order.
    pub fn new<I, S>(credentials: I) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let mut unique: Vec<Credential> = Vec::new();
        for value in credentials {
            let credential = Credential::new(value);
            if !unique.contains(&credential) {
                unique.push(credential);
            }
        }

        if unique.is_empty() {
            return Err(PoolError::Empty);
        }

        Ok(Self {
            credentials: unique,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Returns the credential at the cursor and advances it, wrapping at the end.
    pub fn acquire(&self) -> Credential {
        let len = self.credentials.len();
        // fetch_update keeps the cursor in [0, len) instead of letting it grow unbounded.
        let index = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or_else(|current| current);
        self.credentials[index].clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_empty_pool_is_rejected() {
        let result = CredentialPool::new(Vec::<String>::new());
        assert_eq!(result.unwrap_err(), PoolError::Empty);
    }

    #[test]
    fn test_acquire_cycles_in_insertion_order() {
        for size in 1..=5 {
            let keys: Vec<String> = (0..size).map(|i| format!("key-{i}")).collect();
            let pool = CredentialPool::new(keys.clone()).unwrap();

            let first_round: Vec<String> = (0..size)
                .map(|_| pool.acquire().expose().to_string())
                .collect();
            assert_eq!(first_round, keys);

            // N+1-th acquisition wraps back to the first credential
            assert_eq!(pool.acquire().expose(), "key-0");
        }
    }

    #[test]
    fn test_single_credential_is_always_returned() {
        let pool = CredentialPool::new(["only-key"]).unwrap();
        for _ in 0..10 {
            assert_eq!(pool.acquire().expose(), "only-key");
        }
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let pool = CredentialPool::new(["a", "b", "a"]).unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_credential_debug_and_display_are_masked() {
        let credential = Credential::new("AIzaSyD-super-secret-value");
        assert_eq!(credential.to_string(), "AIzaS...");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("AIzaS..."));
    }

    #[test]
    fn test_masking_short_credential() {
        assert_eq!(Credential::new("abc").masked(), "abc...");
    }

    #[test]
    fn test_concurrent_acquisition_stays_fair() {
        let pool = Arc::new(CredentialPool::new(["a", "b", "c"]).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    (0..300)
                        .map(|_| pool.acquire().expose().to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for key in handle.join().unwrap() {
                *counts.entry(key).or_default() += 1;
            }
        }

        // 1200 acquisitions over 3 credentials: each handed out exactly 400 times
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&c| c == 400));
    }
}
