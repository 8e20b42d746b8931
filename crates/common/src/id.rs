//! ID generation utilities.

use std::fmt;
use std::sync::{Arc, Mutex};

use ulid::Generator;

/// Monotonic ULID generator for complaint identifiers.
///
/// Clones share one underlying generator, so every id handed out by a
/// process is distinct and sorts after the previous one, even when several
/// are created within the same millisecond.
#[derive(Clone)]
pub struct IdGenerator {
    inner: Arc<Mutex<Generator>>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Generator::new())),
        }
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new lowercase ULID.
    ///
    /// ULIDs are:
    /// - Lexicographically sortable
    /// - Strictly increasing within one generator
    /// - 26 characters long
    #[must_use]
    pub fn generate(&self) -> String {
        let mut generator = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Overflow only happens after 2^80 ids in a single millisecond.
        let ulid = generator
            .generate()
            .unwrap_or_else(|_| ulid::Ulid::new());
        ulid.to_string().to_lowercase()
    }
}
