use std::sync::atomic::{AtomicBool, Ordering};

/// Holds an in-flight flag for as long as it lives.
///
/// Used to turn re-entrant calls (a second authorization, an overlapping sync
/// pass) into no-ops.
pub(crate) struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    /// Sets `flag`, or returns `None` if it was already set.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let flag = AtomicBool::new(false);
        let guard = FlightGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(FlightGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(FlightGuard::acquire(&flag).is_some());
    }
}
