use crate::calc::ReportWindow;
use crate::ipc::error::err;
use chrono::NaiveDate;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: "not_found",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Dates cross the protocol as `YYYY-MM-DD`; anything else is rejected so
/// string comparison stays chronological.
pub fn parse_iso_date(key: &str, raw: &str) -> Result<String, HandlerErr> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| HandlerErr {
            code: "bad_params",
            message: format!("{} must be YYYY-MM-DD", key),
            details: Some(json!({ key: raw })),
        })
}

/// `params.date`, or today when absent.
pub fn date_or_today(params: &serde_json::Value) -> Result<String, HandlerErr> {
    match get_optional_str(params, "date") {
        Some(raw) => parse_iso_date("date", &raw),
        None => Ok(today().format("%Y-%m-%d").to_string()),
    }
}

/// `params.startDate`/`params.endDate`, each defaulting to the last-month window.
pub fn report_window(params: &serde_json::Value) -> Result<ReportWindow, HandlerErr> {
    let default = ReportWindow::last_month(today());
    let start_date = match get_optional_str(params, "startDate") {
        Some(raw) => parse_iso_date("startDate", &raw)?,
        None => default.start_date,
    };
    let end_date = match get_optional_str(params, "endDate") {
        Some(raw) => parse_iso_date("endDate", &raw)?,
        None => default.end_date,
    };
    Ok(ReportWindow::new(start_date, end_date))
}

/// Accepts a JSON number or a numeric string, as form inputs send either.
pub fn parse_amount(v: Option<&serde_json::Value>) -> Result<f64, HandlerErr> {
    match v {
        None | Some(serde_json::Value::Null) => Ok(0.0),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| HandlerErr::bad_params("amount must be a number")),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| HandlerErr::bad_params("amount must be a number")),
        Some(_) => Err(HandlerErr::bad_params("amount must be a number")),
    }
}
