//! Incident service: safety and operational reports.
//!
//! DESIGN
//! ======
//! Incidents carry a severity and a three-value status. Status is settable
//! to any value from any value; there is no state machine and no audit
//! trail beyond the current field. IDs come from one monotonic counter, with
//! a prefix naming where the report originated.

use serde::{Deserialize, Serialize};

use crate::frame::{ErrorCode, now_ms};

pub const DEFAULT_INCIDENT_TYPE: &str = "Creature Malfunction";
pub const DEFAULT_ZONE: &str = "Z-01";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationKind {
    Medical,
    Security,
    Maintenance,
}

impl EscalationKind {
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::Medical => Severity::High,
            Self::Security | Self::Maintenance => Severity::Medium,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Medical => "Medical",
            Self::Security => "Security",
            Self::Maintenance => "Maintenance",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub description: String,
    pub reported_by: String,
    pub zone_id: Option<String>,
    pub arrived_at: Option<i64>,
    pub evidence_logged: bool,
}

impl Incident {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status != IncidentStatus::Resolved
    }
}

#[derive(Debug, Clone)]
pub struct NewIncident {
    pub kind: Option<String>,
    pub severity: Severity,
    pub description: String,
    pub reported_by: String,
    pub zone_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IncidentError {
    #[error("incident not found: {0}")]
    NotFound(String),
    #[error("description required")]
    EmptyDescription,
    #[error("evidence already logged for {0}")]
    EvidenceAlreadyLogged(String),
    #[error("incident {0} is resolved")]
    AlreadyResolved(String),
}

impl ErrorCode for IncidentError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_INCIDENT_NOT_FOUND",
            Self::EmptyDescription => "E_INCIDENT_DESCRIPTION",
            Self::EvidenceAlreadyLogged(_) => "E_EVIDENCE_LOGGED",
            Self::AlreadyResolved(_) => "E_INCIDENT_RESOLVED",
        }
    }
}

// =============================================================================
// LOG
// =============================================================================

#[derive(Debug, Default)]
pub struct IncidentLog {
    incidents: Vec<Incident>,
    next_seq: u32,
}

impl IncidentLog {
    /// File a crew report.
    ///
    /// # Errors
    ///
    /// `EmptyDescription` when the description is blank.
    pub fn report(&mut self, new: NewIncident) -> Result<Incident, IncidentError> {
        let description = new.description.trim();
        if description.is_empty() {
            return Err(IncidentError::EmptyDescription);
        }
        let kind = new
            .kind
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(DEFAULT_INCIDENT_TYPE)
            .to_owned();
        Ok(self.push("INC", kind, new.severity, description.to_owned(), new.reported_by, new.zone_id))
    }

    /// Set status to any value, regardless of the current one.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown IDs.
    pub fn set_status(&mut self, id: &str, status: IncidentStatus) -> Result<Incident, IncidentError> {
        let incident = self.get_mut(id)?;
        incident.status = status;
        Ok(incident.clone())
    }

    /// One-tap escalation from the experience crew.
    pub fn escalate(&mut self, kind: EscalationKind, reported_by: &str, zone_id: Option<&str>) -> Incident {
        let description = format!("Accelerated escalation from Experience Crew in {}.", zone_id.unwrap_or("Sector"));
        self.push(
            "INC-EXP",
            format!("{} Escalation", kind.as_str()),
            kind.severity(),
            description,
            reported_by.to_owned(),
            Some(zone_id.unwrap_or(DEFAULT_ZONE).to_owned()),
        )
    }

    /// Damage or spill reported by sanitation in `zone_id`.
    pub fn log_facility_issue(&mut self, zone_id: &str, reported_by: &str) -> Incident {
        let zone_number = zone_id.trim_start_matches("Z-");
        let description =
            format!("Damage/Spill reported by Sanitation in Zone {zone_number}. Area requires physical maintenance.");
        self.push(
            "INC-CLN",
            "Facility Issue".to_owned(),
            Severity::Medium,
            description,
            reported_by.to_owned(),
            Some(zone_id.to_owned()),
        )
    }

    /// Security broadcasts a medical request for an existing incident.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown IDs.
    pub fn medical_escalation(&mut self, incident_id: &str, reported_by: &str) -> Result<Incident, IncidentError> {
        let source = self.get(incident_id).ok_or_else(|| IncidentError::NotFound(incident_id.to_owned()))?;
        let zone_id = source.zone_id.clone().unwrap_or_else(|| DEFAULT_ZONE.to_owned());
        let description = format!("Security Escalation at Sector {incident_id}");
        Ok(self.push(
            "INC-MED",
            "Medical Emergency".to_owned(),
            Severity::High,
            description,
            reported_by.to_owned(),
            Some(zone_id),
        ))
    }

    /// Check that an arrival scan may start for this incident.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `AlreadyResolved` for closed incidents.
    pub fn ensure_active(&self, id: &str) -> Result<(), IncidentError> {
        let incident = self.get(id).ok_or_else(|| IncidentError::NotFound(id.to_owned()))?;
        if !incident.is_active() {
            return Err(IncidentError::AlreadyResolved(id.to_owned()));
        }
        Ok(())
    }

    /// Responder arrived on scene. An open incident moves to investigating.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown IDs.
    pub fn record_arrival(&mut self, id: &str, at: i64) -> Result<Incident, IncidentError> {
        let incident = self.get_mut(id)?;
        incident.arrived_at = Some(at);
        if incident.status == IncidentStatus::Open {
            incident.status = IncidentStatus::Investigating;
        }
        Ok(incident.clone())
    }

    /// # Errors
    ///
    /// `NotFound`, or `EvidenceAlreadyLogged` when logged before.
    pub fn log_evidence(&mut self, id: &str) -> Result<Incident, IncidentError> {
        let incident = self.get_mut(id)?;
        if incident.evidence_logged {
            return Err(IncidentError::EvidenceAlreadyLogged(id.to_owned()));
        }
        incident.evidence_logged = true;
        Ok(incident.clone())
    }

    /// Unresolved incidents whose ID or type contains `search`, case-insensitive.
    #[must_use]
    pub fn active(&self, search: &str) -> Vec<&Incident> {
        let needle = search.trim().to_lowercase();
        self.incidents
            .iter()
            .filter(|i| i.is_active())
            .filter(|i| {
                needle.is_empty() || i.id.to_lowercase().contains(&needle) || i.kind.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Unresolved health-related incidents.
    #[must_use]
    pub fn active_medical(&self) -> Vec<&Incident> {
        self.incidents
            .iter()
            .filter(|i| i.is_active())
            .filter(|i| ["Health", "Medical", "Anomaly"].iter().any(|k| i.kind.contains(k)))
            .collect()
    }

    #[must_use]
    pub fn all(&self) -> &[Incident] {
        &self.incidents
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Incident> {
        self.incidents.iter().find(|i| i.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Incident, IncidentError> {
        self.incidents
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| IncidentError::NotFound(id.to_owned()))
    }

    fn push(
        &mut self,
        prefix: &str,
        kind: String,
        severity: Severity,
        description: String,
        reported_by: String,
        zone_id: Option<String>,
    ) -> Incident {
        self.next_seq += 1;
        let incident = Incident {
            id: format!("{prefix}-{:03}", self.next_seq),
            timestamp: now_ms(),
            kind,
            severity,
            status: IncidentStatus::Open,
            description,
            reported_by,
            zone_id,
            arrived_at: None,
            evidence_logged: false,
        };
        self.incidents.push(incident.clone());
        incident
    }
}

#[cfg(test)]
#[path = "incident_test.rs"]
mod tests;
