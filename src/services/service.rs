//! Service crew: guest flow counters and crowd control.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrowdControlLevel {
    #[default]
    Normal,
    Elevated,
    Critical,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GuestFlow {
    pub live_guest_count: u32,
    pub crowd_control_level: CrowdControlLevel,
}

impl GuestFlow {
    /// A ticket validation scan admitted one guest.
    pub fn admit_guest(&mut self) -> u32 {
        self.live_guest_count = self.live_guest_count.saturating_add(1);
        self.live_guest_count
    }

    /// Returns true when the level changed.
    pub fn set_crowd_control(&mut self, level: CrowdControlLevel) -> bool {
        let changed = self.crowd_control_level != level;
        self.crowd_control_level = level;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_and_counts() {
        let mut flow = GuestFlow::default();
        assert_eq!(flow.admit_guest(), 1);
        assert_eq!(flow.admit_guest(), 2);
        assert_eq!(flow.live_guest_count, 2);
    }

    #[test]
    fn crowd_control_reports_changes() {
        let mut flow = GuestFlow::default();
        assert_eq!(flow.crowd_control_level, CrowdControlLevel::Normal);
        assert!(flow.set_crowd_control(CrowdControlLevel::Elevated));
        assert!(!flow.set_crowd_control(CrowdControlLevel::Elevated));
        let level: CrowdControlLevel = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert!(flow.set_crowd_control(level));
    }
}
