use crate::ipc::error::ok;
use crate::ipc::helpers::{get_optional_str, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::StudentDraft;
use serde_json::json;

fn list_view(state: &AppState) -> serde_json::Value {
    let view = state.store.view();
    let page = &state.pages.students;
    json!({
        "students": view.snapshot.students,
        "selection": page.selection,
        "allSelected": page.all_selected(&view.snapshot.students),
        "editing": page.editing,
        "deleting": page.deleting,
        "phase": page.page.phase,
        "busy": page.page.busy,
        "loading": view.loading,
        "error": view.error,
    })
}

fn students_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    Ok(list_view(state))
}

fn students_toggle(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    state.pages.students.toggle(&student_id);
    Ok(list_view(state))
}

fn students_select_all(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let checked = params
        .get("checked")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::bad_params("missing checked"))?;
    let snapshot = state.store.snapshot();
    state.pages.students.select_all(checked, &snapshot.students);
    Ok(list_view(state))
}

/// Opens the form. Without `studentId` the form is blank for a new student.
fn students_begin_edit(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let draft = match get_optional_str(params, "studentId") {
        Some(id) => {
            let snapshot = state.store.snapshot();
            let student = snapshot
                .student(&id)
                .ok_or_else(|| HandlerErr::not_found("student not found"))?;
            let draft = StudentDraft::from_student(student);
            state.pages.students.begin_edit(Some(id));
            draft
        }
        None => {
            state.pages.students.begin_edit(None);
            StudentDraft::default()
        }
    };
    Ok(json!({
        "mode": if state.pages.students.editing.is_some() { "edit" } else { "add" },
        "draft": draft,
    }))
}

fn students_begin_delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let snapshot = state.store.snapshot();
    let student = snapshot
        .student(&student_id)
        .ok_or_else(|| HandlerErr::not_found("student not found"))?;
    state.pages.students.begin_delete(student_id);
    Ok(json!({ "studentName": student.name }))
}

fn students_cancel(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    state.pages.students.cancel();
    Ok(list_view(state))
}

fn students_save(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let raw = params
        .get("draft")
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params("missing draft"))?;
    let draft: StudentDraft = serde_json::from_value(raw)
        .map_err(|e| HandlerErr::bad_params(format!("invalid draft: {e}")))?;
    let (mut env, pages) = state.split();
    let outcome = pages.students.save(&mut env, &draft);
    Ok(json!({ "outcome": outcome, "list": list_view(state) }))
}

fn students_confirm_delete(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (mut env, pages) = state.split();
    let outcome = pages.students.confirm_delete(&mut env);
    Ok(json!({ "outcome": outcome, "list": list_view(state) }))
}

fn students_delete_selected(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (mut env, pages) = state.split();
    let outcome = pages.students.delete_selected(&mut env);
    Ok(json!({ "outcome": outcome, "list": list_view(state) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state),
        "students.toggleSelect" => students_toggle(state, &req.params),
        "students.selectAll" => students_select_all(state, &req.params),
        "students.beginEdit" => students_begin_edit(state, &req.params),
        "students.beginDelete" => students_begin_delete(state, &req.params),
        "students.cancel" => students_cancel(state),
        "students.save" => students_save(state, &req.params),
        "students.confirmDelete" => students_confirm_delete(state),
        "students.deleteSelected" => students_delete_selected(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
