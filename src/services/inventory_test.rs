use super::*;
use crate::services::restock::RestockStatus;

#[test]
fn consumables_clamp_at_zero() {
    let mut inv = Inventory::default();
    assert_eq!(inv.use_consumable("Antiseptic", 12), 18);
    assert_eq!(inv.use_consumable("Antiseptic", 100), 0);
    assert_eq!(inv.restock_consumable("Antiseptic", 5).unwrap(), 5);
    assert!(matches!(inv.restock_consumable("Bandages", 0), Err(InventoryError::InvalidQuantity)));
}

#[test]
fn untracked_consumables_start_at_zero() {
    let mut inv = Inventory::default();
    assert_eq!(inv.use_consumable("Trauma Kits", 1), 0);
    assert_eq!(inv.consumables()["Trauma Kits"], 0);
    assert_eq!(inv.restock_consumable("IV Fluids", 4).unwrap(), 4);
    assert_eq!(inv.use_consumable("IV Fluids", 1), 3);
}

#[test]
fn intake_reconciles_po_and_credits_storage() {
    let mut inv = Inventory::default();
    let po = inv.intake("PO-1001", "Napkins", 200).unwrap();
    assert_eq!(po.status, PoStatus::Reconciled);
    assert_eq!(po.items[0].received, 200);
    assert_eq!(inv.central_storage()["Napkins"], 1200);

    inv.intake("PO-1001", "Napkins", 50).unwrap();
    assert_eq!(inv.purchase_orders()[0].items[0].received, 250);
    assert_eq!(inv.central_storage()["Napkins"], 1250);
}

#[test]
fn intake_rejects_unknown_po_and_item() {
    let mut inv = Inventory::default();
    assert!(matches!(inv.intake("PO-9", "Napkins", 1), Err(InventoryError::PoNotFound(_))));
    assert!(matches!(inv.intake("PO-1001", "Forks", 1), Err(InventoryError::NotOnPo { .. })));
    assert!(matches!(inv.intake("PO-1001", "Napkins", 0), Err(InventoryError::InvalidQuantity)));
    assert_eq!(inv.purchase_orders()[0].status, PoStatus::Pending);
}

#[test]
fn sale_below_threshold_files_exactly_one_restock() {
    let mut inv = Inventory::default();
    let mut board = RestockBoard::default();

    // Energy Snacks start at 15, already under 20.
    let first = inv.record_sale("Energy Snacks", 20, 50, "FNB-01", &mut board).unwrap();
    assert_eq!(first.stock, 14);
    let task = first.restock.expect("first sale under threshold files a restock");
    assert!(task.is_urgent);
    assert_eq!(task.quantity, 50);

    for _ in 0..5 {
        let again = inv.record_sale("Energy Snacks", 20, 50, "FNB-01", &mut board).unwrap();
        assert!(again.restock.is_none());
    }
    assert_eq!(board.all().len(), 1);

    board.pickup(&task.id, 50).unwrap();
    let still_open = inv.record_sale("Energy Snacks", 20, 50, "FNB-01", &mut board).unwrap();
    assert!(still_open.restock.is_none());

    board.complete(&task.id).unwrap();
    let after = inv.record_sale("Energy Snacks", 20, 50, "FNB-01", &mut board).unwrap();
    assert!(after.restock.is_some());
    assert_eq!(board.all().len(), 2);
}

#[test]
fn sale_above_threshold_files_nothing() {
    let mut inv = Inventory::default();
    let mut board = RestockBoard::default();
    let sale = inv.record_sale("Bottled Water", 20, 50, "FNB-01", &mut board).unwrap();
    assert_eq!(sale.stock, 99);
    assert!(sale.restock.is_none());
}

#[test]
fn sale_crosses_threshold_at_nineteen() {
    let mut inv = Inventory::default();
    let mut board = RestockBoard::default();
    let mut filed_at = None;
    for _ in 0..30 {
        let sale = inv.record_sale("Pre-packaged Meals", 20, 50, "FNB-01", &mut board).unwrap();
        if sale.restock.is_some() {
            filed_at = Some(sale.stock);
            break;
        }
    }
    assert_eq!(filed_at, Some(19));
}

#[test]
fn sale_clamps_at_zero() {
    let mut inv = Inventory::default();
    let mut board = RestockBoard::default();
    for _ in 0..20 {
        inv.record_sale("Energy Snacks", 20, 50, "FNB-01", &mut board).unwrap();
    }
    assert_eq!(inv.fnb_stock()["Energy Snacks"], 0);
    assert!(matches!(
        inv.record_sale("Caviar", 20, 50, "FNB-01", &mut board),
        Err(InventoryError::UnknownItem(_))
    ));
}

#[test]
fn shipment_received_once() {
    let mut inv = Inventory::default();
    let shipment = inv.receive_shipment("SHP-101").unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Received);
    assert_eq!(inv.retail()[0].stock, 32);
    assert_eq!(inv.retail()[1].stock, 24);

    assert!(matches!(inv.receive_shipment("SHP-101"), Err(InventoryError::ShipmentReceived(_))));
    assert_eq!(inv.retail()[0].stock, 32);
}

#[test]
fn damage_and_returns_adjust_stock() {
    let mut inv = Inventory::default();
    assert_eq!(inv.report_damage("Leviathan Plushie").unwrap().stock, 11);
    assert_eq!(
        inv.process_return("Leviathan Plushie", "Wrong size", ReturnAction::BackToShelf)
            .unwrap()
            .stock,
        12
    );
    assert_eq!(
        inv.process_return("Leviathan Plushie", "Torn seam", ReturnAction::Damaged)
            .unwrap()
            .stock,
        12
    );
    assert!(matches!(
        inv.process_return("Leviathan Plushie", " ", ReturnAction::BackToShelf),
        Err(InventoryError::MissingReason)
    ));
}

#[test]
fn damage_never_goes_negative() {
    let mut inv = Inventory::default();
    for _ in 0..10 {
        inv.report_damage("Aether Crystal Replica").unwrap();
    }
    assert_eq!(inv.retail()[1].stock, 0);
}

#[test]
fn cycle_count_reports_discrepancy() {
    let mut inv = Inventory::default();
    assert_eq!(inv.cycle_count("GS-02", 4).unwrap(), None);
    let alert = inv.cycle_count("GS-02", 3).unwrap().unwrap();
    assert_eq!(alert, "Discrepancy found: Aether Crystal Replica. System: 4, Physical: 3");
    assert_eq!(inv.shrinkage_alerts(), [alert]);
}

#[test]
fn below_par_uses_thirty_percent() {
    let inv = Inventory::default();
    let below: Vec<&str> = inv.retail().iter().filter(|i| i.is_below_par()).map(|i| i.id.as_str()).collect();
    // 12 <= 15, 4 <= 6; 45 > 18, 8 > 4.5
    assert_eq!(below, vec!["GS-01", "GS-02"]);
}

#[test]
fn retail_restock_urgent_when_below_par() {
    let inv = Inventory::default();
    let mut board = RestockBoard::default();
    let urgent = inv.request_retail_restock("GS-02", "GS-01", &mut board).unwrap();
    assert!(urgent.is_urgent);
    assert_eq!(urgent.quantity, 16);
    assert_eq!(urgent.status_details.as_deref(), Some("Below Par: 4 units"));
    assert_eq!(urgent.status, RestockStatus::Pending);

    let normal = inv.request_retail_restock("GS-03", "GS-01", &mut board).unwrap();
    assert!(!normal.is_urgent);
}

#[test]
fn supply_count_is_multiple_of_ten_below_500() {
    for _ in 0..100 {
        let n = simulated_supply_count();
        assert_eq!(n % 10, 0);
        assert!(n < 500);
    }
}
