//! Checklists: per-session task lists with a completion event.
//!
//! DESIGN
//! ======
//! Items are independent booleans; there are no ordering or dependency
//! rules. An item flagged `requires_scan` cannot be ticked directly until it
//! has been scanned: toggling it asks the caller to start a checklist scan,
//! and `complete_scan` marks it done and scanned.
//!
//! The completion event fires once per transition into 100%. Unticking an
//! item and ticking it again fires it again.

use serde::{Deserialize, Serialize};

use crate::frame::{Data, ErrorCode, Frame};
use crate::roles::{AppMode, View};
use crate::services::logs::CheckResult;

pub const UPKEEP_ZONE: &str = "Central Warehouse";
pub const CHECKLIST_COMPLETED: &str = "checklist:completed";

const MAINTENANCE_DAILY: [&str; 12] = [
    "Inspect lighting system (Zone 4 Entry)",
    "Check audio output (Ambience emitters)",
    "Test RFID reader at Staff Gate A",
    "Verify positioning alignment (Leviathan-03)",
    "Test emergency exit lighting",
    "Verify Creature Containment Locks (Sector 4B)",
    "Calibrate Temperature Sensors",
    "Check Hydraulic Fluid Levels (Leviathan-03)",
    "Clear Ventilation Ducts of Debris",
    "Test Communication Intercoms",
    "Verify Safety Barrier Integrity",
    "Submit Morning Status Report",
];

const FNB_DAILY: [&str; 6] = [
    "Calibrate Fridge Thermometers",
    "Sanitize Food Prep Surfaces",
    "Check Expiration Labels on Perishables",
    "Refill Sanitation Stations",
    "Verify Cash Register Float",
    "Test Inventory Scanner",
];

const UPKEEP: [(&str, &str); 4] = [
    ("check-1", "Hydraulic Piston Leak Test"),
    ("check-2", "Lidar Lens Calibration"),
    ("check-3", "Network Patch Panel Integrity"),
    ("check-4", "Projector Cooling Fan Verification"),
];

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistKind {
    /// Maintenance or F&B daily list, depending on the session mode.
    Daily,
    Cleaning,
    Experience,
}

impl ChecklistKind {
    /// Views whose dashboards drive this list.
    #[must_use]
    pub fn views(self) -> &'static [View] {
        match self {
            Self::Daily => &[View::DailyChecklist],
            Self::Cleaning => &[View::Cleaning],
            Self::Experience => &[View::Experience],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: u32,
    pub category: Option<String>,
    pub text: String,
    pub done: bool,
    pub requires_scan: bool,
    pub scanned: bool,
}

impl ChecklistItem {
    fn plain(id: u32, text: &str) -> Self {
        Self { id, category: None, text: text.to_owned(), done: false, requires_scan: false, scanned: false }
    }

    fn categorized(id: u32, category: &str, text: &str, done: bool, requires_scan: bool) -> Self {
        Self {
            id,
            category: Some(category.to_owned()),
            text: text.to_owned(),
            done,
            requires_scan,
            scanned: false,
        }
    }
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// The item flipped. `completed` is true when the list just reached 100%.
    Flipped { done: bool, completed: bool },
    /// The item needs a scan before it can be ticked.
    ScanRequired,
}

#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    #[error("checklist item {0} out of range")]
    OutOfRange(usize),
    #[error("upkeep check not found: {0}")]
    UnknownCheck(String),
}

impl ErrorCode for ChecklistError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfRange(_) => "E_CHECKLIST_RANGE",
            Self::UnknownCheck(_) => "E_UNKNOWN_CHECK",
        }
    }
}

// =============================================================================
// CHECKLIST
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Checklist {
    pub items: Vec<ChecklistItem>,
    /// Number of times the list has transitioned to 100%.
    pub completions: u32,
}

impl Checklist {
    fn new(items: Vec<ChecklistItem>) -> Self {
        Self { items, completions: 0 }
    }

    /// The 12-task maintenance daily list, or the 6-task F&B list.
    #[must_use]
    pub fn daily(mode: AppMode) -> Self {
        let tasks: &[&str] = if mode == AppMode::Fnb { &FNB_DAILY } else { &MAINTENANCE_DAILY };
        Self::new(
            tasks
                .iter()
                .zip(1u32..)
                .map(|(text, id)| ChecklistItem::plain(id, text))
                .collect(),
        )
    }

    /// Sanitation list. Items 2 and 6 require a scan; 3 and 5 start done.
    #[must_use]
    pub fn cleaning() -> Self {
        Self::new(vec![
            ChecklistItem::categorized(1, "Restrooms", "Sanitize all sinks and surfaces", false, false),
            ChecklistItem::categorized(2, "Restrooms", "Deep Clean Core Restroom Node", false, true),
            ChecklistItem::categorized(3, "High-Touch", "Disinfect interactive rails", true, false),
            ChecklistItem::categorized(4, "High-Touch", "Wipe down dining tables", false, false),
            ChecklistItem::categorized(5, "Waste", "Empty all primary refuse bins", true, false),
            ChecklistItem::categorized(6, "Waste", "Deep Clean Waste Compressor Area", false, true),
        ])
    }

    #[must_use]
    pub fn experience() -> Self {
        let mut items = vec![
            ChecklistItem::plain(1, "Projector 4B Alignment Check"),
            ChecklistItem::plain(2, "Crystal Cave Audio Levels (Ambient)"),
            ChecklistItem::plain(3, "Interactive Moss Sensors Calibrated"),
            ChecklistItem::plain(4, "Fog Machine Fluid Levels"),
        ];
        items[2].done = true;
        Self::new(items)
    }

    #[must_use]
    pub fn done_count(&self) -> usize {
        self.items.iter().filter(|i| i.done).count()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.done_count() == self.items.len()
    }

    /// Rounded completion percentage.
    #[must_use]
    pub fn progress(&self) -> u32 {
        if self.items.is_empty() {
            return 0;
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = ((self.done_count() as f64 / self.items.len() as f64) * 100.0).round() as u32;
        pct
    }

    /// Flip an item, unless it still needs its scan.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for bad indexes.
    pub fn toggle(&mut self, index: usize) -> Result<Toggle, ChecklistError> {
        let was_complete = self.is_complete();
        let item = self.items.get_mut(index).ok_or(ChecklistError::OutOfRange(index))?;
        if item.requires_scan && !item.scanned && !item.done {
            return Ok(Toggle::ScanRequired);
        }
        item.done = !item.done;
        let done = item.done;
        Ok(Toggle::Flipped { done, completed: self.note_completion(was_complete) })
    }

    /// Scan finished for a scan-gated item: mark it done and scanned.
    /// Returns true when the list just reached 100%.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for bad indexes.
    pub fn complete_scan(&mut self, index: usize) -> Result<bool, ChecklistError> {
        let was_complete = self.is_complete();
        let item = self.items.get_mut(index).ok_or(ChecklistError::OutOfRange(index))?;
        item.done = true;
        item.scanned = true;
        Ok(self.note_completion(was_complete))
    }

    /// Tick every item. No-op when already complete. Returns true when the
    /// list just reached 100%.
    pub fn mark_all(&mut self) -> bool {
        let was_complete = self.is_complete();
        if was_complete {
            return false;
        }
        for item in &mut self.items {
            item.done = true;
            if item.requires_scan {
                item.scanned = true;
            }
        }
        self.note_completion(was_complete)
    }

    fn note_completion(&mut self, was_complete: bool) -> bool {
        let fired = !was_complete && self.is_complete();
        if fired {
            self.completions += 1;
        }
        fired
    }
}

// =============================================================================
// UPKEEP
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpkeepStatus {
    Pending,
    Pass,
    Fail,
}

impl From<CheckResult> for UpkeepStatus {
    fn from(result: CheckResult) -> Self {
        match result {
            CheckResult::Pass => Self::Pass,
            CheckResult::Fail => Self::Fail,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpkeepCheck {
    pub id: String,
    pub item: String,
    pub status: UpkeepStatus,
}

/// Maintenance hardware upkeep checks.
#[derive(Debug, Clone, Serialize)]
pub struct UpkeepChecklist {
    pub checks: Vec<UpkeepCheck>,
}

impl Default for UpkeepChecklist {
    fn default() -> Self {
        Self {
            checks: UPKEEP
                .iter()
                .map(|(id, item)| UpkeepCheck {
                    id: (*id).to_owned(),
                    item: (*item).to_owned(),
                    status: UpkeepStatus::Pending,
                })
                .collect(),
        }
    }
}

impl UpkeepChecklist {
    /// Record Pass or Fail for a check. Returns the updated check.
    ///
    /// # Errors
    ///
    /// `UnknownCheck` for unknown IDs.
    pub fn record_result(&mut self, id: &str, result: CheckResult) -> Result<UpkeepCheck, ChecklistError> {
        let check = self
            .checks
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ChecklistError::UnknownCheck(id.to_owned()))?;
        check.status = result.into();
        Ok(check.clone())
    }
}

// =============================================================================
// SESSION LISTS
// =============================================================================

/// The checklists one staff session works through.
#[derive(Debug, Clone, Serialize)]
pub struct SessionChecklists {
    pub daily: Checklist,
    pub cleaning: Checklist,
    pub experience: Checklist,
}

impl SessionChecklists {
    #[must_use]
    pub fn for_mode(mode: AppMode) -> Self {
        Self { daily: Checklist::daily(mode), cleaning: Checklist::cleaning(), experience: Checklist::experience() }
    }

    pub fn get_mut(&mut self, kind: ChecklistKind) -> &mut Checklist {
        match kind {
            ChecklistKind::Daily => &mut self.daily,
            ChecklistKind::Cleaning => &mut self.cleaning,
            ChecklistKind::Experience => &mut self.experience,
        }
    }

    #[must_use]
    pub fn get(&self, kind: ChecklistKind) -> &Checklist {
        match kind {
            ChecklistKind::Daily => &self.daily,
            ChecklistKind::Cleaning => &self.cleaning,
            ChecklistKind::Experience => &self.experience,
        }
    }
}

/// Event broadcast when a staff member's list reaches 100%.
#[must_use]
pub fn checklist_completed(staff_id: &str, name: &str, kind: ChecklistKind) -> Frame {
    Frame::request(CHECKLIST_COMPLETED, Data::new())
        .with_data("staff_id", staff_id)
        .with_data("name", name)
        .with_data("kind", serde_json::json!(kind))
}

#[cfg(test)]
#[path = "checklist_test.rs"]
mod tests;
