//! Compliance logs: append-only records kept for the session.
//!
//! Nothing here is ever removed or edited once appended. IDs combine a kind
//! prefix with a per-log sequence so entries appended in the same
//! millisecond stay distinct.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::frame::{ErrorCode, now_ms};

pub const DEFAULT_WASTE_REASON: &str = "Expired";

/// Largest drift applied to a live fridge reading per jitter tick.
const FRIDGE_JITTER: f64 = 0.2;

// =============================================================================
// ENTRIES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FridgeReading {
    pub id: String,
    pub temp: f64,
    pub timestamp: i64,
    pub logged_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepBatch {
    pub id: String,
    pub item: String,
    pub quantity: u32,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteEntry {
    pub id: String,
    pub item: String,
    pub reason: String,
    pub quantity: u32,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoScan {
    pub code: String,
    pub scanned_at: i64,
    pub scanned_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckResult {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareCheckEntry {
    pub id: String,
    pub zone: String,
    pub item: String,
    pub status: CheckResult,
    pub timestamp: i64,
    pub checked_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlight {
    pub timestamp: i64,
    pub text: String,
    pub logged_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatrolEntry {
    pub id: String,
    pub zone_id: String,
    pub logged_by: String,
    pub timestamp: i64,
}

/// Live readings for the two counter fridges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LiveFridges {
    pub fridge1: f64,
    pub fridge2: f64,
}

impl Default for LiveFridges {
    fn default() -> Self {
        Self { fridge1: 2.5, fridge2: 3.1 }
    }
}

impl LiveFridges {
    /// Drift each reading by a uniform amount in `[-0.2, 0.2)`.
    pub fn jitter(&mut self, rng: &mut impl Rng) {
        self.fridge1 += rng.random_range(-FRIDGE_JITTER..FRIDGE_JITTER);
        self.fridge2 += rng.random_range(-FRIDGE_JITTER..FRIDGE_JITTER);
    }

    /// Current reading for fridge 1 or 2.
    #[must_use]
    pub fn reading(&self, fridge: u32) -> Option<f64> {
        match fridge {
            1 => Some(self.fridge1),
            2 => Some(self.fridge2),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("{0} required")]
    MissingField(&'static str),
    #[error("quantity must be positive")]
    InvalidQuantity,
    #[error("unknown fridge: {0}")]
    UnknownFridge(u32),
}

impl ErrorCode for LogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::InvalidQuantity => "E_INVALID_QUANTITY",
            Self::UnknownFridge(_) => "E_UNKNOWN_FRIDGE",
        }
    }
}

// =============================================================================
// LOGS
// =============================================================================

#[derive(Debug, Default, Serialize)]
pub struct ComplianceLogs {
    pub fridge_temperatures: Vec<FridgeReading>,
    pub prep_batches: Vec<PrepBatch>,
    pub waste_logs: Vec<WasteEntry>,
    pub promo_codes: Vec<PromoScan>,
    pub hardware_checklists: Vec<HardwareCheckEntry>,
    pub highlights: Vec<Highlight>,
    pub patrols: Vec<PatrolEntry>,
    pub live_fridges: LiveFridges,
    #[serde(skip)]
    seq: u64,
}

fn required(value: &str, field: &'static str) -> Result<String, LogError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LogError::MissingField(field));
    }
    Ok(value.to_owned())
}

impl ComplianceLogs {
    fn next_id(&mut self, prefix: &str) -> String {
        self.seq += 1;
        format!("{prefix}-{}-{}", now_ms(), self.seq)
    }

    /// Log the current live reading of fridge 1 or 2.
    ///
    /// # Errors
    ///
    /// `UnknownFridge` for any other fridge number.
    pub fn log_fridge(&mut self, fridge: u32, staff_id: &str) -> Result<FridgeReading, LogError> {
        let temp = self.live_fridges.reading(fridge).ok_or(LogError::UnknownFridge(fridge))?;
        let entry = FridgeReading {
            id: self.next_id("FT"),
            temp,
            timestamp: now_ms(),
            logged_by: format!("{staff_id} (Fridge {fridge})"),
        };
        self.fridge_temperatures.push(entry.clone());
        Ok(entry)
    }

    /// # Errors
    ///
    /// Blank item or zero quantity.
    pub fn add_prep_batch(&mut self, item: &str, quantity: u32) -> Result<PrepBatch, LogError> {
        let item = required(item, "item")?;
        if quantity == 0 {
            return Err(LogError::InvalidQuantity);
        }
        let entry = PrepBatch { id: self.next_id("PB"), item, quantity, timestamp: now_ms() };
        self.prep_batches.push(entry.clone());
        Ok(entry)
    }

    /// Reason defaults to "Expired" when blank.
    ///
    /// # Errors
    ///
    /// Blank item or zero quantity.
    pub fn add_waste(&mut self, item: &str, quantity: u32, reason: Option<&str>) -> Result<WasteEntry, LogError> {
        let item = required(item, "item")?;
        if quantity == 0 {
            return Err(LogError::InvalidQuantity);
        }
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_WASTE_REASON)
            .to_owned();
        let entry = WasteEntry { id: self.next_id("WL"), item, reason, quantity, timestamp: now_ms() };
        self.waste_logs.push(entry.clone());
        Ok(entry)
    }

    /// Codes are stored uppercased.
    ///
    /// # Errors
    ///
    /// Blank code.
    pub fn add_promo(&mut self, code: &str, scanned_by: &str) -> Result<PromoScan, LogError> {
        let code = required(code, "code")?.to_uppercase();
        let entry = PromoScan { code, scanned_at: now_ms(), scanned_by: scanned_by.to_owned() };
        self.promo_codes.push(entry.clone());
        Ok(entry)
    }

    pub fn add_hardware_check(&mut self, zone: &str, item: &str, status: CheckResult, checked_by: &str) -> HardwareCheckEntry {
        let entry = HardwareCheckEntry {
            id: self.next_id("HC"),
            zone: zone.to_owned(),
            item: item.to_owned(),
            status,
            timestamp: now_ms(),
            checked_by: checked_by.to_owned(),
        };
        self.hardware_checklists.push(entry.clone());
        entry
    }

    /// Newest highlights first.
    ///
    /// # Errors
    ///
    /// Blank text.
    pub fn add_highlight(&mut self, text: &str, logged_by: &str) -> Result<Highlight, LogError> {
        let text = required(text, "text")?;
        let entry = Highlight { timestamp: now_ms(), text, logged_by: logged_by.to_owned() };
        self.highlights.insert(0, entry.clone());
        Ok(entry)
    }

    pub fn add_patrol(&mut self, zone_id: &str, logged_by: &str) -> PatrolEntry {
        let entry = PatrolEntry {
            id: self.next_id("PT"),
            zone_id: zone_id.to_owned(),
            logged_by: logged_by.to_owned(),
            timestamp: now_ms(),
        };
        self.patrols.push(entry.clone());
        entry
    }
}

#[cfg(test)]
#[path = "logs_test.rs"]
mod tests;
