use crate::config;
use crate::flows::{Notice, MSG_LIST_REFRESHED};
use crate::ipc::error::{gateway_err, ok};
use crate::ipc::helpers::get_optional_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "gatewayUrl": state.gateway.endpoint(),
            "loading": state.store.loading(),
            "error": state.store.error(),
        }),
    )
}

fn handle_gateway_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let url = config::normalize_url(get_optional_str(&req.params, "url"));
    tracing::info!(url = ?url, "gateway endpoint selected");
    state.gateway.set_endpoint(url);

    // Best-effort initial load; a failure lands in the store's error field.
    let loaded = state.store.refresh(&state.gateway).is_ok();
    ok(
        &req.id,
        json!({
            "gatewayUrl": state.gateway.endpoint(),
            "loaded": loaded,
            "error": state.store.error(),
        }),
    )
}

fn handle_refresh(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.store.refresh(&state.gateway) {
        Ok(outcome) => {
            let notice = Notice::success(MSG_LIST_REFRESHED);
            state.toast.show(notice.clone());
            ok(
                &req.id,
                json!({
                    "applied": outcome == crate::store::RefreshOutcome::Applied,
                    "notice": notice,
                    "studentCount": state.store.snapshot().students.len(),
                }),
            )
        }
        Err(e) => gateway_err(&req.id, &e),
    }
}

fn handle_snapshot(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!(state.store.view()))
}

fn handle_notification(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "notice": state.toast.visible() }))
}

fn handle_dismiss(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.toast.dismiss();
    ok(&req.id, json!({}))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "gateway.select" => Some(handle_gateway_select(state, req)),
        "data.refresh" => Some(handle_refresh(state, req)),
        "data.snapshot" => Some(handle_snapshot(state, req)),
        "notifications.current" => Some(handle_notification(state, req)),
        "notifications.dismiss" => Some(handle_dismiss(state, req)),
        _ => None,
    }
}
