use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::helpers::{date_or_today, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use serde_json::json;

fn sheet_view(state: &AppState) -> serde_json::Value {
    let snapshot = state.store.snapshot();
    let sheet = &state.pages.attendance;
    let rows: Vec<serde_json::Value> = snapshot
        .students
        .iter()
        .map(|s| {
            json!({
                "studentId": s.id,
                "name": s.name,
                "totalPresents": calc::total_presents(&snapshot.attendance, &s.id),
                "status": sheet.status_of(&s.id).code(),
            })
        })
        .collect();
    let marks: Vec<AttendanceStatus> = snapshot
        .students
        .iter()
        .map(|s| sheet.status_of(&s.id))
        .collect();
    let counts = calc::day_counts(&marks);
    json!({
        "date": sheet.date,
        "total": snapshot.students.len(),
        "counts": counts,
        "rows": rows,
        "busy": sheet.page.busy,
    })
}

fn attendance_open(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let date = date_or_today(params)?;
    let snapshot = state.store.snapshot();
    state.pages.attendance.open(&date, &snapshot);
    Ok(sheet_view(state))
}

fn attendance_set_status(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let code = get_required_str(params, "status")?;
    let status = AttendanceStatus::from_code(&code)
        .ok_or_else(|| HandlerErr::bad_params("status must be one of: P, A, L"))?;
    if state.store.snapshot().student(&student_id).is_none() {
        return Err(HandlerErr::not_found("student not found"));
    }
    state.pages.attendance.set_status(&student_id, status);
    Ok(sheet_view(state))
}

fn attendance_submit(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    if state.pages.attendance.date.is_empty() {
        return Err(HandlerErr::bad_params("open a date first"));
    }
    let (mut env, pages) = state.split();
    let outcome = pages.attendance.submit(&mut env);
    Ok(json!({ "outcome": outcome, "sheet": sheet_view(state) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.open" => attendance_open(state, &req.params),
        "attendance.setStatus" => attendance_set_status(state, &req.params),
        "attendance.submit" => attendance_submit(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
