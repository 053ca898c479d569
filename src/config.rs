use crate::decoder::SignalGroupMode;

/// Options applied to every read of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderOptions {
    /// Fail with `OutOfRange` when a non-empty request misses the recording.
    pub require_non_empty: bool,
    /// Clamp raw samples to the declared digital range before calibration.
    pub clamp_to_digital_range: bool,
    /// Batching used by grouped reads.
    pub group_mode: SignalGroupMode,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self {
            require_non_empty: false,
            clamp_to_digital_range: false,
            group_mode: SignalGroupMode::GroupByRate,
        }
    }

    pub fn require_non_empty(mut self, yes: bool) -> Self {
        self.require_non_empty = yes;
        self
    }

    pub fn clamp_to_digital_range(mut self, yes: bool) -> Self {
        self.clamp_to_digital_range = yes;
        self
    }

    pub fn group_mode(mut self, mode: SignalGroupMode) -> Self {
        self.group_mode = mode;
        self
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::new()
    }
}
