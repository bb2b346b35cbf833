//! Progress events emitted by the reconciler.
//!
//! The reconciler reports through [`ProgressReporter`]; the app crate
//! renders events on stderr as text or JSON lines.

/// Which operation is running.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Build,
    Sync,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Build => "build",
            Operation::Sync => "sync",
        }
    }
}

/// A single progress event.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// Enumerating the source tree. Total unknown.
    Discovering { op: Operation, alias: String },
    /// `n` of `total` files processed, successfully or not.
    Processing {
        op: Operation,
        alias: String,
        n: u64,
        total: u64,
    },
}

impl ProgressEvent {
    /// Completed fraction in percent, `None` while discovering.
    pub fn percent(&self) -> Option<f64> {
        match self {
            ProgressEvent::Discovering { .. } => None,
            ProgressEvent::Processing { total: 0, .. } => Some(100.0),
            ProgressEvent::Processing { n, total, .. } => Some(*n as f64 / *total as f64 * 100.0),
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards every event.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent() {
        let ev = ProgressEvent::Processing {
            op: Operation::Build,
            alias: "p".into(),
            n: 1,
            total: 4,
        };
        assert_eq!(ev.percent(), Some(25.0));

        let empty = ProgressEvent::Processing {
            op: Operation::Sync,
            alias: "p".into(),
            n: 0,
            total: 0,
        };
        assert_eq!(empty.percent(), Some(100.0));
    }
}
