use super::producers::TransportState;

pub const AUTO_ADVANCE_LEAD_SECONDS: f64 = 0.5;
pub const AUTO_ADVANCE_REARM_SECONDS: f64 = 1.0;

/// Makes end-of-item advancement fire once per item.
///
/// Two guards must agree before advancing: the caller's `playback_started`
/// flag (the transport has reported the current item actually playing) and
/// the item index differing from the last one that triggered. The index guard
/// clears once the position is safely away from the end again.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AutoAdvanceGuard {
    last_advanced_item: Option<usize>,
}

impl AutoAdvanceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_last_advanced(item_index: usize) -> Self {
        Self {
            last_advanced_item: Some(item_index),
        }
    }

    pub fn last_advanced_item(&self) -> Option<usize> {
        self.last_advanced_item
    }

    pub fn clear(&mut self) {
        self.last_advanced_item = None;
    }

    /// `true` means: advance now. The guard is already recorded when this
    /// returns, before the caller starts loading the next item.
    pub fn should_advance(
        &mut self,
        transport: &TransportState,
        playback_started: bool,
        item_index: usize,
    ) -> bool {
        if !transport.duration_known() {
            return false;
        }

        if self.last_advanced_item.is_some()
            && transport.position
                < transport.duration - AUTO_ADVANCE_REARM_SECONDS
        {
            self.last_advanced_item = None;
        }

        let near_end = transport.position
            >= transport.duration - AUTO_ADVANCE_LEAD_SECONDS;

        if near_end
            && playback_started
            && self.last_advanced_item != Some(item_index)
        {
            self.last_advanced_item = Some(item_index);
            return true;
        }

        false
    }
}
