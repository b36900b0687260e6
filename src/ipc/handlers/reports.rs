use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::helpers::{report_window, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn reports_attendance(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let window = report_window(params)?;
    let view = state.store.view();
    let rows = calc::build_attendance_report(&view.snapshot.students, &view.snapshot.attendance, &window);
    let totals: calc::AttendanceTally = rows.iter().map(|r| r.tally).sum();
    Ok(json!({
        "window": window,
        "rows": rows,
        "totals": totals,
        "markedTotal": totals.marked(),
        "loading": view.loading,
        "error": view.error,
    }))
}

fn reports_student(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let window = report_window(params)?;
    let view = state.store.view();
    let rows = calc::build_student_report(
        &view.snapshot.students,
        &view.snapshot.attendance,
        &view.snapshot.payments,
        &window,
    );
    let totals = calc::ReportTotals::from_rows(&rows);
    Ok(json!({
        "window": window,
        "rows": rows,
        "totals": totals,
        "loading": view.loading,
        "error": view.error,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "reports.attendance" => reports_attendance(state, &req.params),
        "reports.student" => reports_student(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
