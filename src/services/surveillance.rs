//! Zone surveillance: live staff markers, zone density, and usher dispatch.
//!
//! Only a high-density zone opens its usher roster. Ushering flips a staff
//! marker to `USHERING`; ushering the same member again changes nothing.

use serde::Serialize;

use crate::frame::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkerStatus {
    Active,
    Busy,
    Idle,
    Alert,
    Ushering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityLevel {
    Low,
    Med,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffMarker {
    pub id: String,
    pub name: String,
    pub role: String,
    pub zone_id: String,
    /// Map position in percent of width and height.
    pub x: u8,
    pub y: u8,
    pub status: MarkerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneDensity {
    pub zone_id: String,
    pub guests: u32,
    pub level: DensityLevel,
}

#[derive(Debug, thiserror::Error)]
pub enum SurveillanceError {
    #[error("unknown zone: {0}")]
    UnknownZone(String),
    #[error("zone {0} is not at high density")]
    NotHighDensity(String),
    #[error("staff member not on the map: {0}")]
    StaffNotFound(String),
}

impl ErrorCode for SurveillanceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownZone(_) => "E_UNKNOWN_ZONE",
            Self::NotHighDensity(_) => "E_NOT_HIGH_DENSITY",
            Self::StaffNotFound(_) => "E_STAFF_NOT_FOUND",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Surveillance {
    staff: Vec<StaffMarker>,
    zones: Vec<ZoneDensity>,
}

fn marker(id: &str, name: &str, role: &str, zone_id: &str, (x, y): (u8, u8), status: MarkerStatus) -> StaffMarker {
    StaffMarker {
        id: id.to_owned(),
        name: name.to_owned(),
        role: role.to_owned(),
        zone_id: zone_id.to_owned(),
        x,
        y,
        status,
    }
}

fn density(zone_id: &str, guests: u32, level: DensityLevel) -> ZoneDensity {
    ZoneDensity { zone_id: zone_id.to_owned(), guests, level }
}

impl Default for Surveillance {
    fn default() -> Self {
        Self {
            staff: vec![
                marker("8842-A", "Alex C.", "Supervisor", "Z-04", (75, 50), MarkerStatus::Active),
                marker("9921-B", "Sarah M.", "Maintenance", "Z-02", (25, 35), MarkerStatus::Busy),
                marker("7732-C", "David K.", "Security", "Z-01", (50, 85), MarkerStatus::Idle),
                marker("4451-D", "James W.", "Tech", "Z-03", (15, 15), MarkerStatus::Active),
                marker("SEC-01", "Team Alpha", "Response Unit", "Z-02", (35, 45), MarkerStatus::Alert),
                marker("SEC-02", "Team Bravo", "Response Unit", "Z-04", (80, 60), MarkerStatus::Active),
            ],
            zones: vec![
                density("Z-01", 142, DensityLevel::Med),
                density("Z-02", 384, DensityLevel::High),
                density("Z-03", 89, DensityLevel::Low),
                density("Z-04", 156, DensityLevel::Med),
            ],
        }
    }
}

impl Surveillance {
    #[must_use]
    pub fn staff(&self) -> &[StaffMarker] {
        &self.staff
    }

    #[must_use]
    pub fn zones(&self) -> &[ZoneDensity] {
        &self.zones
    }

    /// Staff currently inside a high-density zone.
    ///
    /// # Errors
    ///
    /// `UnknownZone`, or `NotHighDensity` when the zone is below high.
    pub fn usher_roster(&self, zone_id: &str) -> Result<Vec<StaffMarker>, SurveillanceError> {
        self.require_high(zone_id)?;
        Ok(self.staff.iter().filter(|s| s.zone_id == zone_id).cloned().collect())
    }

    /// Dispatch usher instructions to one staff member. Returns the marker
    /// and whether its status changed.
    ///
    /// # Errors
    ///
    /// `StaffNotFound`, or `NotHighDensity` when their zone is below high.
    pub fn usher(&mut self, staff_id: &str) -> Result<(StaffMarker, bool), SurveillanceError> {
        let zone_id = self
            .staff
            .iter()
            .find(|s| s.id == staff_id)
            .map(|s| s.zone_id.clone())
            .ok_or_else(|| SurveillanceError::StaffNotFound(staff_id.to_owned()))?;
        self.require_high(&zone_id)?;

        let Some(member) = self.staff.iter_mut().find(|s| s.id == staff_id) else {
            return Err(SurveillanceError::StaffNotFound(staff_id.to_owned()));
        };
        let changed = member.status != MarkerStatus::Ushering;
        member.status = MarkerStatus::Ushering;
        Ok((member.clone(), changed))
    }

    fn require_high(&self, zone_id: &str) -> Result<(), SurveillanceError> {
        let zone = self
            .zones
            .iter()
            .find(|z| z.zone_id == zone_id)
            .ok_or_else(|| SurveillanceError::UnknownZone(zone_id.to_owned()))?;
        if zone.level == DensityLevel::High {
            Ok(())
        } else {
            Err(SurveillanceError::NotHighDensity(zone_id.to_owned()))
        }
    }
}

#[cfg(test)]
#[path = "surveillance_test.rs"]
mod tests;
