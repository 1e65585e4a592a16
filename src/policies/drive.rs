//! # Drive policy: how many uploads of one batch run at once.
//!
//! [`DrivePolicy`] is the explicit concurrency bound for driving accepted tasks
//! through the transport.
//!
//! - [`DrivePolicy::Sequential`] task N+1's transport call starts only after task N
//!   settles, so transport invocation order equals creation order (default).
//! - [`DrivePolicy::Pooled`] at most `n` uploads of the batch are in flight.
//! - [`DrivePolicy::Unbounded`] every accepted task starts immediately.
//!
//! In every mode a failing task never aborts its siblings.
//!
//! ```text
//! Sequential:  a ────► b ────► c
//! Pooled(2):   a ────► c
//!              b ──►
//! Unbounded:   a ──►
//!              b ────►
//!              c ─►
//! ```

/// Concurrency bound for the uploads of one accepted batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrivePolicy {
    /// One upload at a time, in creation order (default).
    #[default]
    Sequential,
    /// At most `n` uploads at a time (`0` is treated as `1`).
    Pooled(usize),
    /// No bound.
    Unbounded,
}

impl DrivePolicy {
    /// Returns the bound as an `Option` (`None` = unbounded).
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        match *self {
            DrivePolicy::Sequential => Some(1),
            DrivePolicy::Pooled(n) => Some(n.max(1)),
            DrivePolicy::Unbounded => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        assert_eq!(DrivePolicy::default(), DrivePolicy::Sequential);
        assert_eq!(DrivePolicy::Sequential.limit(), Some(1));
        assert_eq!(DrivePolicy::Pooled(4).limit(), Some(4));
        assert_eq!(DrivePolicy::Pooled(0).limit(), Some(1));
        assert_eq!(DrivePolicy::Unbounded.limit(), None);
    }
}
