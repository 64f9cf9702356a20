//! Upload progress counters and reporting sinks.

use std::fmt;

/// Counts of finished uploads for the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Tasks in the run
    pub total: usize,

    /// Tasks finished, successfully or not
    pub completed: usize,

    /// Tasks whose upload failed
    pub errors: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Record one finished task.
    pub fn record(&mut self, ok: bool) {
        self.completed += 1;
        if !ok {
            self.errors += 1;
        }
    }

    pub fn succeeded(&self) -> usize {
        self.completed - self.errors
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} files uploaded", self.succeeded(), self.total)?;
        match self.errors {
            0 => Ok(()),
            1 => write!(f, ", 1 error"),
            n => write!(f, ", {n} errors"),
        }
    }
}

/// Receives progress after every finished task.
pub trait ProgressSink {
    fn update(&mut self, progress: &Progress);

    /// Called once after the last worker has exited.
    fn finish(&mut self, _progress: &Progress) {}
}

/// Discards all progress.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _progress: &Progress) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_successes_and_errors() {
        let mut p = Progress::new(3);
        p.record(true);
        p.record(false);
        p.record(true);
        assert_eq!(p.completed, 3);
        assert_eq!(p.errors, 1);
        assert_eq!(p.succeeded(), 2);
    }

    #[test]
    fn formats_with_errors() {
        let p = Progress {
            total: 100,
            completed: 45,
            errors: 3,
        };
        let text = p.to_string();
        assert_eq!(text, "42/100 files uploaded, 3 errors");
    }

    #[test]
    fn formats_without_errors() {
        let p = Progress {
            total: 10,
            completed: 5,
            errors: 0,
        };
        assert_eq!(p.to_string(), "5/10 files uploaded");
    }
}
