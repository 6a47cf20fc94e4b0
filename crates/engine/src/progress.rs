/// Byte-based progress through a pass.
///
/// Passes report per-item byte deltas on their events; whoever is displaying
/// progress feeds them in here and reads back a percentage.
///
/// ```
/// use s3sync_engine::Progress;
///
/// let mut progress = Progress::new(20);
/// progress.advance(5);
/// assert_eq!(progress.percent(), 25);
/// progress.advance(15);
/// assert!(progress.is_complete());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    total: u64,
    completed: u64,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Self { total, completed: 0 }
    }

    pub fn advance(&mut self, delta: u64) {
        self.completed = self.completed.saturating_add(delta);
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Whole percentage, clamped to 100. A pass with nothing to transfer is
    /// complete from the start.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let percent = u128::from(self.completed.min(self.total)) * 100 / u128::from(self.total);
        // Infallible: clamped to 0..=100 above.
        u8::try_from(percent).unwrap_or(100)
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}
