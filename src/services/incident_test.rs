use super::*;

fn report(log: &mut IncidentLog, kind: Option<&str>, description: &str) -> Result<Incident, IncidentError> {
    log.report(NewIncident {
        kind: kind.map(str::to_owned),
        severity: Severity::Low,
        description: description.into(),
        reported_by: "MNT-01".into(),
        zone_id: Some("Z-02".into()),
    })
}

#[test]
fn report_defaults_type_and_rejects_blank() {
    let mut log = IncidentLog::default();
    assert!(matches!(report(&mut log, None, "  "), Err(IncidentError::EmptyDescription)));

    let inc = report(&mut log, None, " Tentacle stuck ").unwrap();
    assert_eq!(inc.id, "INC-001");
    assert_eq!(inc.kind, DEFAULT_INCIDENT_TYPE);
    assert_eq!(inc.description, "Tentacle stuck");
    assert_eq!(inc.status, IncidentStatus::Open);

    let inc = report(&mut log, Some("Guest Injury"), "Slip").unwrap();
    assert_eq!(inc.id, "INC-002");
    assert_eq!(inc.kind, "Guest Injury");
}

#[test]
fn status_accepts_any_transition() {
    let mut log = IncidentLog::default();
    let inc = report(&mut log, None, "x").unwrap();

    let sequence = [
        IncidentStatus::Resolved,
        IncidentStatus::Open,
        IncidentStatus::Investigating,
        IncidentStatus::Open,
        IncidentStatus::Resolved,
        IncidentStatus::Investigating,
    ];
    for status in sequence {
        assert_eq!(log.set_status(&inc.id, status).unwrap().status, status);
    }
    assert!(matches!(log.set_status("INC-404", IncidentStatus::Open), Err(IncidentError::NotFound(_))));
}

#[test]
fn escalation_severity_by_kind() {
    let mut log = IncidentLog::default();
    let medical = log.escalate(EscalationKind::Medical, "EXP-02", Some("Z-03"));
    assert_eq!(medical.severity, Severity::High);
    assert_eq!(medical.kind, "Medical Escalation");
    assert!(medical.id.starts_with("INC-EXP-"));
    assert_eq!(medical.description, "Accelerated escalation from Experience Crew in Z-03.");

    let security = log.escalate(EscalationKind::Security, "EXP-02", None);
    assert_eq!(security.severity, Severity::Medium);
    assert_eq!(security.zone_id.as_deref(), Some("Z-01"));
    assert_eq!(security.description, "Accelerated escalation from Experience Crew in Sector.");

    assert_eq!(log.escalate(EscalationKind::Maintenance, "EXP-02", None).severity, Severity::Medium);
}

#[test]
fn facility_issue_names_zone_number() {
    let mut log = IncidentLog::default();
    let inc = log.log_facility_issue("Z-04", "CLN-01");
    assert_eq!(inc.kind, "Facility Issue");
    assert_eq!(inc.severity, Severity::Medium);
    assert!(inc.id.starts_with("INC-CLN-"));
    assert_eq!(
        inc.description,
        "Damage/Spill reported by Sanitation in Zone 04. Area requires physical maintenance."
    );
}

#[test]
fn medical_escalation_inherits_zone() {
    let mut log = IncidentLog::default();
    let source = report(&mut log, Some("Perimeter Breach"), "gate forced").unwrap();
    let med = log.medical_escalation(&source.id, "SEC-01").unwrap();
    assert_eq!(med.severity, Severity::High);
    assert_eq!(med.zone_id.as_deref(), Some("Z-02"));
    assert_eq!(med.description, format!("Security Escalation at Sector {}", source.id));
    assert_eq!(log.active_medical().len(), 1);
}

#[test]
fn arrival_moves_open_to_investigating() {
    let mut log = IncidentLog::default();
    let inc = report(&mut log, None, "x").unwrap();
    let arrived = log.record_arrival(&inc.id, 42).unwrap();
    assert_eq!(arrived.arrived_at, Some(42));
    assert_eq!(arrived.status, IncidentStatus::Investigating);

    log.set_status(&inc.id, IncidentStatus::Resolved).unwrap();
    assert!(matches!(log.ensure_active(&inc.id), Err(IncidentError::AlreadyResolved(_))));
}

#[test]
fn evidence_logged_once() {
    let mut log = IncidentLog::default();
    let inc = report(&mut log, None, "x").unwrap();
    assert!(log.log_evidence(&inc.id).unwrap().evidence_logged);
    assert!(matches!(log.log_evidence(&inc.id), Err(IncidentError::EvidenceAlreadyLogged(_))));
}

#[test]
fn active_filters_resolved_and_searches_id_and_type() {
    let mut log = IncidentLog::default();
    let a = report(&mut log, Some("Perimeter Breach"), "x").unwrap();
    let b = report(&mut log, Some("Health Anomaly"), "y").unwrap();
    let c = report(&mut log, None, "z").unwrap();
    log.set_status(&c.id, IncidentStatus::Resolved).unwrap();

    assert_eq!(log.active("").len(), 2);
    let hits: Vec<&str> = log.active("BREACH").iter().map(|i| i.id.as_str()).collect();
    assert_eq!(hits, vec![a.id.as_str()]);
    let hits: Vec<&str> = log.active("inc-002").iter().map(|i| i.id.as_str()).collect();
    assert_eq!(hits, vec![b.id.as_str()]);

    let medical: Vec<&str> = log.active_medical().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(medical, vec![b.id.as_str()]);
}

#[test]
fn incident_serializes_type_field() {
    let mut log = IncidentLog::default();
    let inc = report(&mut log, None, "x").unwrap();
    let json = serde_json::to_value(&inc).unwrap();
    assert_eq!(json["type"], DEFAULT_INCIDENT_TYPE);
    assert_eq!(json["severity"], "LOW");
    assert_eq!(json["status"], "OPEN");
}
