use std::borrow::Cow;

/// Residual store that decouples the parsers from recv boundaries.
///
/// When a parse attempt runs out of bytes mid-unit, the unconsumed suffix is
/// stored here and glued onto the front of the next receive. Two slots are
/// kept so that the suffix being stored may still point into the view built
/// from the previously active slot; the active slot is moved out before any
/// overwrite, so no copy of live data is ever clobbered.
///
/// Invariant: at most one slot holds unconsumed bytes at any moment.
#[derive(Default)]
pub struct RollingBuffer {
    buffers: [Vec<u8>; 2],
    index: usize,
}

impl RollingBuffer {
    pub fn new() -> Self {
        RollingBuffer::default()
    }

    /// Return the logical view `stored suffix ∥ data`.
    ///
    /// Borrows `data` unchanged when no suffix is pending; otherwise the
    /// active slot is taken, extended with `data`, and returned owned.
    pub fn continue_with<'a>(&mut self, data: &'a [u8]) -> Cow<'a, [u8]> {
        let active = &mut self.buffers[self.index];
        if active.is_empty() {
            return Cow::Borrowed(data);
        }
        let mut combined = std::mem::take(active);
        combined.extend_from_slice(data);
        Cow::Owned(combined)
    }

    /// Save an unconsumed suffix for the next call, flipping the active slot.
    pub fn store_remaining(&mut self, suffix: &[u8]) {
        self.index = (self.index + 1) % 2;
        let next = &mut self.buffers[self.index];
        next.clear();
        next.extend_from_slice(suffix);
    }

    pub fn clear(&mut self) {
        self.buffers[0].clear();
        self.buffers[1].clear();
        self.index = 0;
    }

    pub fn has_pending(&self) -> bool {
        !self.buffers[self.index].is_empty()
    }
}
