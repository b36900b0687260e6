use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::helpers::{date_or_today, get_required_str, parse_amount, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn sheet_view(state: &AppState) -> serde_json::Value {
    let snapshot = state.store.snapshot();
    let sheet = &state.pages.payments;
    let rows: Vec<serde_json::Value> = snapshot
        .students
        .iter()
        .map(|s| {
            json!({
                "studentId": s.id,
                "name": s.name,
                "tuitionFee": s.tuition_fee,
                "paidOnDate": calc::paid_on(&snapshot.payments, &s.id, &sheet.date),
                "amount": sheet.amounts.get(&s.id),
            })
        })
        .collect();
    json!({
        "date": sheet.date,
        "rows": rows,
        "pendingCount": sheet.pending().len(),
        "busy": sheet.page.busy,
    })
}

fn payments_open(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let date = date_or_today(params)?;
    state.pages.payments.open(&date);
    Ok(sheet_view(state))
}

fn payments_set_amount(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let amount = parse_amount(params.get("amount"))?;
    if state.store.snapshot().student(&student_id).is_none() {
        return Err(HandlerErr::not_found("student not found"));
    }
    state.pages.payments.set_amount(&student_id, amount);
    Ok(sheet_view(state))
}

fn payments_submit(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    if state.pages.payments.date.is_empty() {
        return Err(HandlerErr::bad_params("open a date first"));
    }
    let (mut env, pages) = state.split();
    let outcome = pages.payments.submit(&mut env);
    Ok(json!({ "outcome": outcome, "sheet": sheet_view(state) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "payments.open" => payments_open(state, &req.params),
        "payments.setAmount" => payments_set_amount(state, &req.params),
        "payments.submit" => payments_submit(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
