use super::*;

fn alert(severity: AlertSeverity, alert_type: &str, zone: Option<&str>) -> NewAlert {
    NewAlert {
        title: "Notice".into(),
        message: "Something happened".into(),
        severity,
        alert_type: alert_type.into(),
        zone_id: zone.map(str::to_owned),
    }
}

#[test]
fn red_alerts_by_severity_or_health_pulse() {
    let mut board = AlertBoard::default();
    board.raise(alert(AlertSeverity::Low, "general", None)).unwrap();
    board.raise(alert(AlertSeverity::High, "general", None)).unwrap();
    board.raise(alert(AlertSeverity::Critical, "security", None)).unwrap();
    board.raise(alert(AlertSeverity::Medium, HEALTH_PULSE, None)).unwrap();
    board.raise(alert(AlertSeverity::Medium, "general", None)).unwrap();

    let red: Vec<&str> = board.red_alerts().iter().map(|a| a.id.as_str()).collect();
    assert_eq!(red, vec!["ALT-004", "ALT-003", "ALT-002"]);
    let plain: Vec<&str> = board.announcements().iter().map(|a| a.id.as_str()).collect();
    assert_eq!(plain, vec!["ALT-005", "ALT-001"]);
}

#[test]
fn resolve_clears_red_alert_for_zone() {
    let mut board = AlertBoard::default();
    let red = board.raise(alert(AlertSeverity::High, "hardware", Some("Z-04"))).unwrap();
    assert!(board.active_red_in_zone("Z-04").is_some());
    assert!(board.active_red_in_zone("Z-01").is_none());

    board.resolve(&red.id).unwrap();
    assert!(board.active_red_in_zone("Z-04").is_none());
    assert!(board.red_alerts().is_empty());
}

#[test]
fn acknowledge_is_idempotent() {
    let mut board = AlertBoard::default();
    let a = board.raise(alert(AlertSeverity::Low, "general", None)).unwrap();
    assert!(board.has_unread("SEC-01"));
    board.acknowledge(&a.id, "SEC-01").unwrap();
    let acked = board.acknowledge(&a.id, "SEC-01").unwrap();
    assert_eq!(acked.acknowledged_by, vec!["SEC-01".to_owned()]);
    assert!(!board.has_unread("SEC-01"));
    assert!(board.has_unread("SEC-02"));
    assert!(matches!(board.acknowledge("ALT-999", "SEC-01"), Err(AlertError::NotFound(_))));
}

#[test]
fn blank_title_rejected() {
    let mut board = AlertBoard::default();
    let mut new = alert(AlertSeverity::Low, "general", None);
    new.title = "  ".into();
    assert!(matches!(board.raise(new), Err(AlertError::EmptyTitle)));
}
