use super::*;

fn new_request(item: &str, is_urgent: bool, details: Option<&str>) -> NewRestock {
    NewRestock {
        item: item.into(),
        quantity: 50,
        is_urgent,
        status_details: details.map(str::to_owned),
        requested_by: "FNB-07".into(),
    }
}

#[test]
fn request_creates_pending_task() {
    let mut board = RestockBoard::default();
    let task = board.request(new_request("Bottled Water", true, None)).unwrap();

    assert_eq!(task.id, "RS-0001");
    assert_eq!(task.status, RestockStatus::Pending);
    assert!(task.is_urgent);
    assert!(board.has_open_request("Bottled Water"));
    assert!(!board.has_open_request("Energy Snacks"));
}

#[test]
fn request_rejects_blank_item_and_zero_quantity() {
    let mut board = RestockBoard::default();
    assert!(matches!(board.request(new_request("   ", false, None)), Err(RestockError::EmptyItem)));

    let mut zero = new_request("Napkins", false, None);
    zero.quantity = 0;
    assert!(matches!(board.request(zero), Err(RestockError::InvalidQuantity)));
    assert!(board.all().is_empty());
}

#[test]
fn lifecycle_pending_in_transit_completed() {
    let mut board = RestockBoard::default();
    let task = board.request(new_request("Spill Kit", true, None)).unwrap();

    assert!(board.ensure_in_transit(&task.id).is_err());
    let picked = board.pickup(&task.id, 12).unwrap();
    assert_eq!(picked.status, RestockStatus::InTransit);
    assert_eq!(picked.picked_up_quantity, Some(12));
    assert_eq!(board.in_transit().len(), 1);

    board.ensure_in_transit(&task.id).unwrap();
    let done = board.complete(&task.id).unwrap();
    assert_eq!(done.status, RestockStatus::Completed);
    assert!(!board.has_open_request("Spill Kit"));
}

#[test]
fn transitions_cannot_skip_or_repeat() {
    let mut board = RestockBoard::default();
    let task = board.request(new_request("Paper Towels", false, None)).unwrap();

    let err = board.complete(&task.id).unwrap_err();
    assert!(matches!(
        err,
        RestockError::InvalidTransition { from: RestockStatus::Pending, expected: RestockStatus::InTransit, .. }
    ));

    board.pickup(&task.id, 5).unwrap();
    assert!(board.pickup(&task.id, 5).is_err());
    assert!(matches!(board.pickup("RS-9999", 1), Err(RestockError::NotFound(_))));
}

#[test]
fn pending_by_urgency_puts_priority_first_and_is_stable() {
    let mut board = RestockBoard::default();
    board.request(new_request("A", false, None)).unwrap();
    board.request(new_request("B", false, Some("Below Par: 12 units"))).unwrap();
    board.request(new_request("C", false, Some("Below Par: 4 units"))).unwrap();
    board.request(new_request("D", true, None)).unwrap();
    board.request(new_request("E", false, None)).unwrap();

    let order: Vec<&str> = board.pending_by_urgency().iter().map(|t| t.item.as_str()).collect();
    assert_eq!(order, vec!["C", "D", "A", "B", "E"]);
}

#[test]
fn below_par_without_number_is_not_priority() {
    let mut board = RestockBoard::default();
    let task = board.request(new_request("X", false, Some("Below Par"))).unwrap();
    assert!(!is_priority(&task));
}

#[test]
fn first_number_reads_leading_digits() {
    assert_eq!(first_number("Below Par: 4 units"), Some(4));
    assert_eq!(first_number("Below Par: 15 of 60"), Some(15));
    assert_eq!(first_number("none"), None);
}
