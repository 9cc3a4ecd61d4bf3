//! Cleaning timers: per-zone sanitation state.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::frame::ErrorCode;

pub const ZONES: [&str; 4] = ["Z-01", "Z-02", "Z-03", "Z-04"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningTimer {
    /// Epoch millis when cleaning started, if it has.
    pub start_time: Option<i64>,
    /// Millis from start to ready, set when the zone is marked ready.
    pub duration: Option<i64>,
    pub is_clean: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ZoneStatus {
    Ready,
    Cleaning,
}

#[derive(Debug, thiserror::Error)]
pub enum CleaningError {
    #[error("unknown zone: {0}")]
    UnknownZone(String),
}

impl ErrorCode for CleaningError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownZone(_) => "E_UNKNOWN_ZONE",
        }
    }
}

#[derive(Debug)]
pub struct CleaningTimers {
    zones: BTreeMap<String, CleaningTimer>,
}

impl Default for CleaningTimers {
    fn default() -> Self {
        let zones = ZONES
            .iter()
            .map(|z| ((*z).to_owned(), CleaningTimer { start_time: None, duration: None, is_clean: true }))
            .collect();
        Self { zones }
    }
}

impl CleaningTimers {
    /// Begin cleaning a zone at `now`. The zone is no longer clean.
    ///
    /// # Errors
    ///
    /// `UnknownZone` for zones outside Z-01..Z-04.
    pub fn start(&mut self, zone_id: &str, now: i64) -> Result<CleaningTimer, CleaningError> {
        let timer = self.timer_mut(zone_id)?;
        *timer = CleaningTimer { start_time: Some(now), duration: None, is_clean: false };
        Ok(timer.clone())
    }

    /// Mark a zone ready. Duration is `now - start`, or 0 if never started.
    ///
    /// # Errors
    ///
    /// `UnknownZone` for zones outside Z-01..Z-04.
    pub fn mark_ready(&mut self, zone_id: &str, now: i64) -> Result<CleaningTimer, CleaningError> {
        let timer = self.timer_mut(zone_id)?;
        let duration = timer.start_time.map_or(0, |start| (now - start).max(0));
        timer.duration = Some(duration);
        timer.is_clean = true;
        Ok(timer.clone())
    }

    /// Millis since cleaning started, while the zone is being cleaned.
    #[must_use]
    pub fn elapsed(&self, zone_id: &str, now: i64) -> Option<i64> {
        let timer = self.zones.get(zone_id)?;
        if timer.is_clean {
            return None;
        }
        timer.start_time.map(|start| (now - start).max(0))
    }

    #[must_use]
    pub fn zone_statuses(&self) -> BTreeMap<String, ZoneStatus> {
        self.zones
            .iter()
            .map(|(zone, timer)| {
                let status = if timer.is_clean { ZoneStatus::Ready } else { ZoneStatus::Cleaning };
                (zone.clone(), status)
            })
            .collect()
    }

    #[must_use]
    pub fn timers(&self) -> &BTreeMap<String, CleaningTimer> {
        &self.zones
    }

    fn timer_mut(&mut self, zone_id: &str) -> Result<&mut CleaningTimer, CleaningError> {
        self.zones
            .get_mut(zone_id)
            .ok_or_else(|| CleaningError::UnknownZone(zone_id.to_owned()))
    }
}

#[cfg(test)]
#[path = "cleaning_test.rs"]
mod tests;
