pub const DEFAULT_FLUSH_EVERY: usize = 5;

/// Number of leading rows whose code and name are both filled in.
///
/// Counting stops at the first row missing either value, so a partially
/// written row is classified again.
pub fn resume_index<'a, I>(labels: I) -> usize
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    labels
        .into_iter()
        .take_while(|(code, name)| !code.trim().is_empty() && !name.trim().is_empty())
        .count()
}

/// Decides when the working copy must be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushSchedule {
    every: usize,
}

impl FlushSchedule {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }

    pub fn every(&self) -> usize {
        self.every
    }

    /// `index` is 0-based; a flush is due on every `every`-th row and on the
    /// last row.
    pub fn is_due(&self, index: usize, total: usize) -> bool {
        let position = index + 1;
        position % self.every == 0 || position == total
    }
}

impl Default for FlushSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_EVERY)
    }
}
