//! Websocket syscall handlers, one per prefix.
//!
//! Handlers validate the request, mutate the store under its write lock, and
//! return an `Outcome`. Events that are not echoes of the request (a restock
//! filed by a sale, an alert raised by an escalation) are pushed through the
//! hub directly.

use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::frame::{Data, Frame, now_ms, to_data};
use crate::roles::{AppMode, View, mode_label, nav_items, views_for_syscall};
use crate::routes::ws::Outcome;
use crate::services::alerts::{AlertSeverity, HEALTH_PULSE, NewAlert};
use crate::services::checklist::{Checklist, ChecklistKind, Toggle, UPKEEP_ZONE, checklist_completed};
use crate::services::hub;
use crate::services::incident::{EscalationKind, IncidentStatus, NewIncident, Severity};
use crate::services::inventory::{ReturnAction, simulated_supply_count};
use crate::services::logs::CheckResult;
use crate::services::maintenance::HYDRAULICS_ASSET;
use crate::services::restock::NewRestock;
use crate::services::scan::{self, ScanJob, ScanOwner};
use crate::services::service::CrowdControlLevel;
use crate::services::shift::{self, ShiftError, ShiftWindow, local_now};
use crate::state::AppState;

pub const WORK_ORDER_COMPLETE: &str = "WORK_ORDER_COMPLETE";

/// Probability that a vendor zone unlock scan verifies.
const VENDOR_UNLOCK_PASS_RATE: f64 = 0.8;

type HandlerResult = Result<Outcome, Frame>;

/// The authenticated connection a request arrived on.
pub(crate) struct Ctx<'a> {
    pub state: &'a AppState,
    pub client_id: Uuid,
    pub session_key: &'a str,
    pub staff_id: String,
    pub name: String,
    pub mode: AppMode,
    pub on_shift: bool,
}

impl Ctx<'_> {
    fn scan_owner(&self) -> ScanOwner {
        ScanOwner {
            client_id: self.client_id,
            session_key: self.session_key.to_owned(),
            staff_id: self.staff_id.clone(),
            name: self.name.clone(),
        }
    }

    /// Start a scan and reply with its ID; progress arrives as pushes.
    async fn start_scan(&self, job: ScanJob) -> Data {
        let purpose = job.purpose();
        let scan_id = scan::start(self.state, self.scan_owner(), job).await;
        data_of([("scan_id", json!(scan_id)), ("purpose", json!(purpose))])
    }
}

// =============================================================================
// FIELD HELPERS
// =============================================================================

fn data_of<const N: usize>(pairs: [(&str, Value); N]) -> Data {
    pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect()
}

fn field<T: DeserializeOwned>(req: &Frame, key: &str) -> Result<T, Frame> {
    let value = req.data.get(key).ok_or_else(|| req.error(format!("{key} required")))?;
    serde_json::from_value(value.clone()).map_err(|e| req.error(format!("invalid {key}: {e}")))
}

fn opt_field<T: DeserializeOwned>(req: &Frame, key: &str) -> Result<Option<T>, Frame> {
    match req.data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| req.error(format!("invalid {key}: {e}"))),
    }
}

fn text<'a>(req: &'a Frame, key: &str) -> Result<&'a str, Frame> {
    req.str_field(key).ok_or_else(|| req.error(format!("{key} required")))
}

fn unknown_op(req: &Frame) -> Frame {
    req.error(format!("unknown {} op: {}", req.prefix(), req.op()))
}

// =============================================================================
// ROUTING
// =============================================================================

/// Views that gate a request. Checklist operations are gated by the view
/// that owns the list they name.
pub(crate) fn views_for(req: &Frame) -> Result<&'static [View], Frame> {
    if req.prefix() == "checklist" && req.op() != "upkeep" {
        let kind: ChecklistKind = field(req, "kind")?;
        return Ok(kind.views());
    }
    Ok(views_for_syscall(&req.syscall))
}

pub(crate) async fn dispatch(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    match req.prefix() {
        "restock" => handle_restock(ctx, req).await,
        "incident" => handle_incident(ctx, req).await,
        "cleaning" => handle_cleaning(ctx, req).await,
        "stock" => handle_stock(ctx, req).await,
        "log" => handle_log(ctx, req).await,
        "checklist" => handle_checklist(ctx, req).await,
        "scan" => handle_scan(ctx, req).await,
        "shift" => handle_shift(ctx, req).await,
        "service" => handle_service(ctx, req).await,
        "maint" => handle_maint(ctx, req).await,
        "alert" => handle_alert(ctx, req).await,
        "surveillance" => handle_surveillance(ctx, req).await,
        "nav" => handle_nav(ctx, req).await,
        prefix => Err(req.error(format!("unknown prefix: {prefix}"))),
    }
}

// =============================================================================
// RESTOCK
// =============================================================================

async fn handle_restock(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    match req.op() {
        "request" => {
            let new = NewRestock {
                item: text(req, "item")?.to_owned(),
                quantity: opt_field(req, "quantity")?.unwrap_or(state.config.restock_default_quantity),
                is_urgent: req.bool_field("is_urgent").unwrap_or(false),
                status_details: opt_field(req, "status_details")?,
                requested_by: ctx.staff_id.clone(),
            };
            let task = state.store.write().await.restock.request(new).map_err(|e| req.error_from(&e))?;
            info!(task_id = %task.id, item = %task.item, urgent = task.is_urgent, "restock requested");
            Ok(Outcome::Broadcast(to_data(&task)))
        }
        "queue" => {
            let store = state.store.read().await;
            Ok(Outcome::Reply(data_of([
                ("pending", json!(store.restock.pending_by_urgency())),
                ("in_transit", json!(store.restock.in_transit())),
            ])))
        }
        "pickup" => {
            let id = text(req, "id")?;
            let quantity: u32 = field(req, "quantity")?;
            let task = state.store.write().await.restock.pickup(id, quantity).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&task)))
        }
        "deliver" => {
            let id = text(req, "id")?;
            state.store.read().await.restock.ensure_in_transit(id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(ctx.start_scan(ScanJob::RestockDelivery { task_id: id.to_owned() }).await))
        }
        "list" => {
            let store = state.store.read().await;
            Ok(Outcome::Reply(data_of([("tasks", json!(store.restock.all()))])))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// INCIDENT
// =============================================================================

async fn handle_incident(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    match req.op() {
        "report" => {
            let new = NewIncident {
                kind: opt_field(req, "type")?,
                severity: opt_field(req, "severity")?.unwrap_or(Severity::Low),
                description: opt_field(req, "description")?.unwrap_or_default(),
                reported_by: ctx.staff_id.clone(),
                zone_id: opt_field(req, "zone_id")?,
            };
            let incident = state.store.write().await.incidents.report(new).map_err(|e| req.error_from(&e))?;
            info!(incident_id = %incident.id, severity = ?incident.severity, "incident reported");
            Ok(Outcome::Broadcast(to_data(&incident)))
        }
        "status" => {
            let id = text(req, "id")?;
            let status: IncidentStatus = field(req, "status")?;
            let incident = state.store.write().await.incidents.set_status(id, status).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&incident)))
        }
        "escalate" => {
            let kind: EscalationKind = field(req, "kind")?;
            let zone_id = req.str_field("zone_id");
            let incident = state.store.write().await.incidents.escalate(kind, &ctx.staff_id, zone_id);
            info!(incident_id = %incident.id, kind = kind.as_str(), "incident escalated");
            Ok(Outcome::Broadcast(to_data(&incident)))
        }
        "facility" => {
            let zone_id = text(req, "zone_id")?;
            let incident = state.store.write().await.incidents.log_facility_issue(zone_id, &ctx.staff_id);
            Ok(Outcome::Broadcast(to_data(&incident)))
        }
        "medical" => {
            let id = text(req, "id")?;
            let (incident, alert) = {
                let mut store = state.store.write().await;
                let incident = store.incidents.medical_escalation(id, &ctx.staff_id).map_err(|e| req.error_from(&e))?;
                let alert = store
                    .alerts
                    .raise(NewAlert {
                        title: "Medical Emergency".to_owned(),
                        message: incident.description.clone(),
                        severity: AlertSeverity::High,
                        alert_type: HEALTH_PULSE.to_owned(),
                        zone_id: incident.zone_id.clone(),
                    })
                    .map_err(|e| req.error_from(&e))?;
                (incident, alert)
            };
            hub::broadcast(state, &Frame::request("alert:raised", to_data(&alert)), None).await;
            info!(incident_id = %incident.id, source = %id, "medical escalation");
            Ok(Outcome::Broadcast(to_data(&incident)))
        }
        "arrival" => {
            let id = text(req, "id")?;
            state.store.read().await.incidents.ensure_active(id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(ctx.start_scan(ScanJob::IncidentArrival { incident_id: id.to_owned() }).await))
        }
        "evidence" => {
            let id = text(req, "id")?;
            let incident = state.store.write().await.incidents.log_evidence(id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&incident)))
        }
        "active" => {
            let search = req.str_field("search").unwrap_or_default();
            let store = state.store.read().await;
            Ok(Outcome::Reply(data_of([("incidents", json!(store.incidents.active(search)))])))
        }
        "medical_active" => {
            let store = state.store.read().await;
            Ok(Outcome::Reply(data_of([("incidents", json!(store.incidents.active_medical()))])))
        }
        "list" => {
            let store = state.store.read().await;
            Ok(Outcome::Reply(data_of([("incidents", json!(store.incidents.all()))])))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// CLEANING
// =============================================================================

async fn handle_cleaning(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    match req.op() {
        "start" | "ready" => {
            let zone_id = text(req, "zone_id")?;
            let mut store = state.store.write().await;
            let result = if req.op() == "start" {
                store.cleaning.start(zone_id, now_ms())
            } else {
                store.cleaning.mark_ready(zone_id, now_ms())
            };
            let timer = result.map_err(|e| req.error_from(&e))?;
            let mut data = to_data(&timer);
            data.insert("zone_id".into(), json!(zone_id));
            Ok(Outcome::Broadcast(data))
        }
        "status" => {
            let store = state.store.read().await;
            let now = now_ms();
            let elapsed: serde_json::Map<String, Value> = store
                .cleaning
                .timers()
                .keys()
                .map(|zone| (zone.clone(), json!(store.cleaning.elapsed(zone, now))))
                .collect();
            Ok(Outcome::Reply(data_of([
                ("zones", json!(store.cleaning.zone_statuses())),
                ("timers", json!(store.cleaning.timers())),
                ("elapsed", Value::Object(elapsed)),
            ])))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// STOCK
// =============================================================================

async fn handle_stock(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    match req.op() {
        "consume" | "consumable_restock" => {
            let item = text(req, "item")?;
            let amount = req.u32_field("amount").unwrap_or(1);
            let mut store = state.store.write().await;
            let stock = if req.op() == "consume" {
                store.inventory.use_consumable(item, amount)
            } else {
                store.inventory.restock_consumable(item, amount).map_err(|e| req.error_from(&e))?
            };
            Ok(Outcome::Broadcast(data_of([("item", json!(item)), ("stock", json!(stock))])))
        }
        "intake" => {
            let po_id = text(req, "po_id")?;
            let item = text(req, "item")?;
            let quantity: u32 = field(req, "quantity")?;
            let mut store = state.store.write().await;
            let po = store.inventory.intake(po_id, item, quantity).map_err(|e| req.error_from(&e))?;
            let mut data = to_data(&po);
            data.insert("central_storage".into(), json!(store.inventory.central_storage()));
            Ok(Outcome::Broadcast(data))
        }
        "supply_count" => Ok(Outcome::Reply(data_of([("count", json!(simulated_supply_count()))]))),
        "sale" => {
            let item = text(req, "item")?;
            let sale = {
                let mut guard = state.store.write().await;
                let store = &mut *guard;
                store
                    .inventory
                    .record_sale(
                        item,
                        state.config.low_stock_threshold,
                        state.config.restock_default_quantity,
                        &ctx.staff_id,
                        &mut store.restock,
                    )
                    .map_err(|e| req.error_from(&e))?
            };
            if let Some(task) = &sale.restock {
                info!(task_id = %task.id, item = %task.item, "low stock restock filed");
                hub::broadcast(state, &Frame::request("restock:request", to_data(task)), None).await;
            }
            Ok(Outcome::Broadcast(to_data(&sale)))
        }
        "receive" => {
            let shipment_id = text(req, "shipment_id")?;
            let mut store = state.store.write().await;
            let shipment = store.inventory.receive_shipment(shipment_id).map_err(|e| req.error_from(&e))?;
            let mut data = to_data(&shipment);
            data.insert("retail".into(), json!(store.inventory.retail()));
            Ok(Outcome::Broadcast(data))
        }
        "damage" => {
            let name = text(req, "name")?;
            let item = state.store.write().await.inventory.report_damage(name).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&item)))
        }
        "return" => {
            let name = text(req, "name")?;
            let reason = req.str_field("reason").unwrap_or_default();
            let action: ReturnAction = field(req, "action")?;
            let item = state
                .store
                .write()
                .await
                .inventory
                .process_return(name, reason, action)
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&item)))
        }
        "cycle_count" => {
            let item_id = text(req, "item_id")?;
            let physical: u32 = field(req, "physical")?;
            let alert = state
                .store
                .write()
                .await
                .inventory
                .cycle_count(item_id, physical)
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(data_of([
                ("item_id", json!(item_id)),
                ("physical", json!(physical)),
                ("alert", json!(alert)),
            ])))
        }
        "retail_restock" => {
            let item_id = text(req, "item_id")?;
            let task = {
                let mut guard = state.store.write().await;
                let store = &mut *guard;
                store
                    .inventory
                    .request_retail_restock(item_id, &ctx.staff_id, &mut store.restock)
                    .map_err(|e| req.error_from(&e))?
            };
            let data = to_data(&task);
            hub::broadcast(state, &Frame::request("restock:request", data.clone()), Some(ctx.client_id)).await;
            Ok(Outcome::Reply(data))
        }
        "snapshot" => {
            let snapshot = state.store.read().await.snapshot();
            Ok(Outcome::Reply(to_data(&snapshot)))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// LOG
// =============================================================================

async fn handle_log(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    match req.op() {
        "fridge" => {
            let fridge: u32 = field(req, "fridge")?;
            let reading = state.store.write().await.logs.log_fridge(fridge, &ctx.staff_id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&reading)))
        }
        "prep" => {
            let item = text(req, "item")?;
            let quantity: u32 = field(req, "quantity")?;
            let batch = state.store.write().await.logs.add_prep_batch(item, quantity).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&batch)))
        }
        "waste" => {
            let item = text(req, "item")?;
            let quantity: u32 = field(req, "quantity")?;
            let reason = req.str_field("reason");
            let entry = state
                .store
                .write()
                .await
                .logs
                .add_waste(item, quantity, reason)
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&entry)))
        }
        "highlight" => {
            let body = req.str_field("text").unwrap_or_default();
            let entry = state.store.write().await.logs.add_highlight(body, &ctx.staff_id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&entry)))
        }
        "patrol" => {
            let zone_id = text(req, "zone_id")?;
            Ok(Outcome::Reply(ctx.start_scan(ScanJob::PatrolLog { zone_id: zone_id.to_owned() }).await))
        }
        "list" => {
            let store = state.store.read().await;
            Ok(Outcome::Reply(to_data(&store.logs)))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// CHECKLIST
// =============================================================================

async fn handle_checklist(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    if req.op() == "upkeep" {
        let id = text(req, "id")?;
        let result: CheckResult = field(req, "result")?;
        let mut store = state.store.write().await;
        let check = store.maintenance.upkeep.record_result(id, result).map_err(|e| req.error_from(&e))?;
        let entry = store.logs.add_hardware_check(UPKEEP_ZONE, &check.item, result, &ctx.staff_id);
        return Ok(Outcome::Broadcast(data_of([("check", json!(check)), ("entry", json!(entry))])));
    }

    let kind: ChecklistKind = field(req, "kind")?;
    if req.op() == "get" {
        let sessions = state.sessions.read().await;
        let session = sessions.get(ctx.session_key).ok_or_else(|| req.error("session ended"))?;
        return Ok(Outcome::Reply(checklist_data(session.checklists.get(kind), kind)));
    }

    let (toggle, mut data) = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(ctx.session_key).ok_or_else(|| req.error("session ended"))?;
        let list = session.checklists.get_mut(kind);
        let toggle = match req.op() {
            "toggle" => list.toggle(field(req, "index")?).map_err(|e| req.error_from(&e))?,
            "mark_all" => Toggle::Flipped { done: true, completed: list.mark_all() },
            _ => return Err(unknown_op(req)),
        };
        (toggle, checklist_data(list, kind))
    };

    match toggle {
        Toggle::ScanRequired => {
            let index: usize = field(req, "index")?;
            let mut reply = ctx.start_scan(ScanJob::ChecklistItem { kind, index }).await;
            reply.insert("scan_required".into(), json!(true));
            Ok(Outcome::Reply(reply))
        }
        Toggle::Flipped { done, completed } => {
            if completed {
                info!(staff_id = %ctx.staff_id, ?kind, "checklist completed");
                hub::broadcast(state, &checklist_completed(&ctx.staff_id, &ctx.name, kind), None).await;
            }
            data.insert("done".into(), json!(done));
            data.insert("completed".into(), json!(completed));
            Ok(Outcome::Reply(data))
        }
    }
}

fn checklist_data(list: &Checklist, kind: ChecklistKind) -> Data {
    let mut data = to_data(list);
    data.insert("kind".into(), json!(kind));
    data.insert("progress".into(), json!(list.progress()));
    data
}

// =============================================================================
// SCAN
// =============================================================================

async fn handle_scan(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    match req.op() {
        "cancel" => {
            let scan_id: Uuid = field(req, "scan_id")?;
            let purpose = scan::cancel(ctx.state, scan_id, ctx.client_id).await.map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(data_of([("scan_id", json!(scan_id)), ("purpose", json!(purpose))])))
        }
        "list" => {
            let scans: Vec<Value> = scan::active_for_client(ctx.state, ctx.client_id)
                .await
                .into_iter()
                .map(|(id, purpose)| json!({ "scan_id": id, "purpose": purpose }))
                .collect();
            Ok(Outcome::Reply(data_of([("scans", json!(scans))])))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// SHIFT
// =============================================================================

async fn handle_shift(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    let config = &state.config;
    match req.op() {
        "status" => {
            let now = local_now(config.utc_offset).time();
            let window = ShiftWindow { start: config.shift_start, end: config.shift_end };
            let sessions = state.sessions.read().await;
            let session = sessions.get(ctx.session_key).ok_or_else(|| req.error("session ended"))?;
            Ok(Outcome::Reply(data_of([
                ("on_shift", json!(session.on_shift)),
                ("check_in", json!(session.check_in)),
                ("zone_id", json!(session.staff.current_zone_id)),
                ("countdown", json!(window.countdown(now))),
                ("late_if_checked_in_now", json!(window.is_late(now))),
            ])))
        }
        "permission" => {
            let mut sessions = state.sessions.write().await;
            let session = sessions.get_mut(ctx.session_key).ok_or_else(|| req.error("session ended"))?;
            session.check_in.grant_permission();
            Ok(Outcome::Reply(to_data(&session.check_in)))
        }
        "check_in" => {
            let zone_id = req
                .str_field("zone_id")
                .filter(|z| !z.trim().is_empty())
                .ok_or_else(|| req.error_from(&ShiftError::MissingZone))?;
            {
                let mut sessions = state.sessions.write().await;
                let session = sessions.get_mut(ctx.session_key).ok_or_else(|| req.error("session ended"))?;
                if session.on_shift {
                    return Err(req.error_from(&ShiftError::AlreadyOnShift));
                }
                session.check_in.begin_scan(zone_id).map_err(|e| req.error_from(&e))?;
            }
            Ok(Outcome::Reply(ctx.start_scan(ScanJob::ZoneCheckIn { zone_id: zone_id.to_owned() }).await))
        }
        "check_out" => {
            {
                let mut sessions = state.sessions.write().await;
                let session = sessions.get_mut(ctx.session_key).ok_or_else(|| req.error("session ended"))?;
                if !session.on_shift {
                    return Err(req.error_from(&ShiftError::NotOnShift));
                }
                session.on_shift = false;
                session.check_in.reset();
                session.staff.current_zone_id = None;
            }
            let record = state.store.write().await.check_ins.check_out(&ctx.staff_id, now_ms());
            info!(staff_id = %ctx.staff_id, "shift: checked out");
            Ok(Outcome::Broadcast(data_of([
                ("staff_id", json!(ctx.staff_id)),
                ("name", json!(ctx.name)),
                ("record", json!(record)),
            ])))
        }
        "log" => {
            let query = req.str_field("q").unwrap_or_default();
            let store = state.store.read().await;
            let records = store.check_ins.filter(query);
            Ok(Outcome::Reply(data_of([
                ("stats", json!(shift::stats(&records))),
                ("records", json!(records)),
            ])))
        }
        "roster" => {
            let today = local_now(config.utc_offset).day();
            Ok(Outcome::Reply(data_of([("days", json!(shift::roster(today)))])))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// SERVICE
// =============================================================================

async fn handle_service(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    match req.op() {
        "validate" => Ok(Outcome::Reply(ctx.start_scan(ScanJob::TicketValidation).await)),
        "promo" => {
            let code = req.str_field("code").unwrap_or_default();
            let entry = state.store.write().await.logs.add_promo(code, &ctx.staff_id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&entry)))
        }
        "crowd" => {
            let level: CrowdControlLevel = field(req, "level")?;
            let mut store = state.store.write().await;
            let changed = store.guests.set_crowd_control(level);
            if changed {
                info!(?level, "crowd control level changed");
            }
            let mut data = to_data(&store.guests);
            data.insert("changed".into(), json!(changed));
            Ok(Outcome::Broadcast(data))
        }
        "status" => {
            let store = state.store.read().await;
            Ok(Outcome::Reply(to_data(&store.guests)))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// SURVEILLANCE
// =============================================================================

async fn handle_surveillance(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    match req.op() {
        "overview" => {
            let store = state.store.read().await;
            Ok(Outcome::Reply(to_data(&store.surveillance)))
        }
        "zone" => {
            let zone_id = text(req, "zone_id")?;
            let store = state.store.read().await;
            let staff = store.surveillance.usher_roster(zone_id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(data_of([("zone_id", json!(zone_id)), ("staff", json!(staff))])))
        }
        "usher" => {
            let staff_id = text(req, "staff_id")?;
            let (member, changed) =
                state.store.write().await.surveillance.usher(staff_id).map_err(|e| req.error_from(&e))?;
            if changed {
                info!(%staff_id, zone_id = %member.zone_id, dispatched_by = %ctx.staff_id, "usher dispatched");
            }
            let mut data = to_data(&member);
            data.insert("changed".into(), json!(changed));
            Ok(Outcome::Broadcast(data))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// MAINTENANCE
// =============================================================================

async fn handle_maint(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    match req.op() {
        "hardware" => {
            let store = state.store.read().await;
            Ok(Outcome::Reply(data_of([
                ("hardware", json!(store.maintenance.hardware())),
                ("system_health", json!(store.maintenance.system_health())),
                ("upkeep", json!(store.maintenance.upkeep)),
            ])))
        }
        "diagnostics" => {
            let asset_id = text(req, "asset_id")?;
            let lines = state.store.read().await.maintenance.diagnostics(asset_id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Stream(lines.into_iter().map(|line| data_of([("line", json!(line))])).collect()))
        }
        "resolve" => {
            let asset_id = text(req, "asset_id")?;
            state.store.read().await.maintenance.ensure_asset(asset_id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(ctx.start_scan(ScanJob::AssetResolution { asset_id: asset_id.to_owned() }).await))
        }
        "photo" => {
            let asset_id = text(req, "asset_id")?;
            let (resolution, health) = {
                let mut guard = state.store.write().await;
                let store = &mut *guard;
                let resolution = store
                    .maintenance
                    .capture_photo(asset_id, &mut store.alerts)
                    .map_err(|e| req.error_from(&e))?;
                (resolution, store.maintenance.system_health())
            };
            if let Some(alert_id) = &resolution.resolved_alert {
                info!(%alert_id, %asset_id, "alert resolved by repair");
                let frame = Frame::request("alert:resolved", data_of([("id", json!(alert_id))]));
                hub::broadcast(state, &frame, None).await;
            }
            let mut data = to_data(&resolution);
            data.insert("system_health".into(), json!(health));
            Ok(Outcome::Broadcast(data))
        }
        "vendor" => {
            let now = now_ms();
            let mut store = state.store.write().await;
            let session = store.maintenance.open_vendor_session(&ctx.staff_id, now);
            let remaining = session.remaining_secs(store.maintenance.work_order.time_limit_secs, now);
            Ok(Outcome::Reply(data_of([
                ("work_order", json!(store.maintenance.work_order)),
                ("session", json!(session)),
                ("remaining_secs", json!(remaining.max(0))),
            ])))
        }
        "unlock" => {
            state.store.read().await.maintenance.vendor_session(&ctx.staff_id).map_err(|e| req.error_from(&e))?;
            let passes = rand::rng().random_bool(VENDOR_UNLOCK_PASS_RATE);
            Ok(Outcome::Reply(ctx.start_scan(ScanJob::VendorZoneUnlock { passes }).await))
        }
        "tool" => {
            state.store.read().await.maintenance.ensure_tool_ready(&ctx.staff_id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(ctx.start_scan(ScanJob::VendorTool).await))
        }
        "signoff" => {
            let session = state.store.write().await.maintenance.sign_off(&ctx.staff_id).map_err(|e| req.error_from(&e))?;
            info!(staff_id = %ctx.staff_id, "work order signed off");
            hub::terminate_session(state, ctx.session_key, WORK_ORDER_COMPLETE).await;
            Ok(Outcome::Reply(to_data(&session)))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// ALERT
// =============================================================================

/// Re-mirror alerts onto the hydraulics unit and push it if it changed.
async fn sync_hardware(state: &AppState) {
    let changed = {
        let mut guard = state.store.write().await;
        let store = &mut *guard;
        if store.maintenance.sync_with_alerts(&store.alerts) {
            store.maintenance.hardware().iter().find(|h| h.id == HYDRAULICS_ASSET).cloned()
        } else {
            None
        }
    };
    if let Some(unit) = changed {
        hub::broadcast(state, &Frame::request("maint:hardware_updated", to_data(&unit)), None).await;
    }
}

async fn handle_alert(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    let state = ctx.state;
    match req.op() {
        "list" => {
            let store = state.store.read().await;
            Ok(Outcome::Reply(data_of([
                ("red_alerts", json!(store.alerts.red_alerts())),
                ("announcements", json!(store.alerts.announcements())),
                ("has_unread", json!(store.alerts.has_unread(&ctx.staff_id))),
            ])))
        }
        "ack" => {
            let id = text(req, "id")?;
            let alert = state.store.write().await.alerts.acknowledge(id, &ctx.staff_id).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Broadcast(to_data(&alert)))
        }
        "raise" => {
            let new = NewAlert {
                title: req.str_field("title").unwrap_or_default().to_owned(),
                message: req.str_field("message").unwrap_or_default().to_owned(),
                severity: field(req, "severity")?,
                alert_type: req.str_field("alert_type").unwrap_or("announcement").to_owned(),
                zone_id: opt_field(req, "zone_id")?,
            };
            let alert = state.store.write().await.alerts.raise(new).map_err(|e| req.error_from(&e))?;
            info!(alert_id = %alert.id, severity = ?alert.severity, "alert raised");
            let data = to_data(&alert);
            hub::broadcast(state, &Frame::request("alert:raised", data.clone()), Some(ctx.client_id)).await;
            sync_hardware(state).await;
            Ok(Outcome::Reply(data))
        }
        "resolve" => {
            let id = text(req, "id")?;
            let alert = state.store.write().await.alerts.resolve(id).map_err(|e| req.error_from(&e))?;
            let data = to_data(&alert);
            hub::broadcast(state, &Frame::request("alert:resolved", data.clone()), Some(ctx.client_id)).await;
            sync_hardware(state).await;
            Ok(Outcome::Reply(data))
        }
        _ => Err(unknown_op(req)),
    }
}

// =============================================================================
// NAV
// =============================================================================

async fn handle_nav(ctx: &Ctx<'_>, req: &Frame) -> HandlerResult {
    match req.op() {
        "items" => Ok(Outcome::Reply(data_of([
            ("mode", json!(ctx.mode)),
            ("mode_label", json!(mode_label(ctx.mode))),
            ("on_shift", json!(ctx.on_shift)),
            ("nav", json!(nav_items(ctx.mode, ctx.on_shift))),
        ]))),
        "mode" => {
            let mode: AppMode = field(req, "mode")?;
            let on_shift = {
                let mut sessions = ctx.state.sessions.write().await;
                let session = sessions.get_mut(ctx.session_key).ok_or_else(|| req.error("session ended"))?;
                session.set_mode(mode);
                session.on_shift
            };
            info!(staff_id = %ctx.staff_id, ?mode, "mode changed");
            Ok(Outcome::Reply(data_of([
                ("mode", json!(mode)),
                ("mode_label", json!(mode_label(mode))),
                ("on_shift", json!(on_shift)),
                ("nav", json!(nav_items(mode, on_shift))),
            ])))
        }
        _ => Err(unknown_op(req)),
    }
}
