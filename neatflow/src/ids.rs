use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe source of strictly increasing identifiers.
///
/// Gene and genome IDs are drawn from one shared provider so
/// that no two entities created during a run ever collide.
pub trait IdProvider: Send + Sync {
    /// Returns an ID greater than every ID previously returned.
    fn next(&self) -> u64;
}

/// Sequential [`IdProvider`] backed by an atomic counter.
///
/// # Examples
/// ```
/// use neatflow::{IdProvider, SequentialIds};
///
/// let ids = SequentialIds::new();
/// assert_eq!(ids.next(), 1);
/// assert_eq!(ids.next(), 2);
///
/// // Resuming after previously persisted genomes.
/// let ids = SequentialIds::starting_after(41);
/// assert_eq!(ids.next(), 42);
/// ```
#[derive(Debug, Default)]
pub struct SequentialIds {
    last: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> SequentialIds {
        SequentialIds::starting_after(0)
    }

    /// Returns a provider whose first ID is `last + 1`.
    pub fn starting_after(last: u64) -> SequentialIds {
        SequentialIds {
            last: AtomicU64::new(last),
        }
    }
}

impl IdProvider for SequentialIds {
    fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn unique_across_threads() {
        let ids = Arc::new(SequentialIds::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..250).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 1000);
        assert_eq!(ids.next(), 1001);
    }
}
