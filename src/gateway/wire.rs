//! Shapes exchanged with the spreadsheet backend, and the single mapping
//! between them and the canonical model. Sheet-style keys such as
//! `"Guardian Name"` exist only in this file.

use crate::model::{
    AttendanceLog, AttendanceRecord, AttendanceStatus, PaymentLog, PaymentRecord, RowLocator,
    Snapshot, Student, StudentDraft,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub action: &'a str,
    pub payload: Value,
}

/// The fields every response carries. Action-specific data stays in the raw value.
#[derive(Debug, Default, Deserialize)]
pub struct Reply {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub message: Option<String>,
}

impl Reply {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("Error")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InitialData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub students: Vec<SheetStudent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attendance: BTreeMap<String, Vec<SheetAttendance>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payments: BTreeMap<String, Vec<SheetPayment>>,
}

#[derive(Debug, Deserialize)]
pub struct SheetStudent {
    #[serde(rename = "ID", default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "Name", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "Class", default, deserialize_with = "lenient_string")]
    pub class: String,
    #[serde(rename = "Section", default, deserialize_with = "lenient_string")]
    pub section: String,
    #[serde(rename = "Email", default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(rename = "Phone", default, deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(rename = "Guardian Name", default, deserialize_with = "lenient_string")]
    pub guardian: String,
    #[serde(rename = "Photo URL", default, deserialize_with = "lenient_opt_string")]
    pub photo_url: Option<String>,
    #[serde(rename = "Tuition Fee", default, deserialize_with = "lenient_amount")]
    pub tuition_fee: f64,
    #[serde(rename = "rowIndex", default, deserialize_with = "lenient_row")]
    pub row_index: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SheetAttendance {
    #[serde(rename = "studentId", default, deserialize_with = "lenient_string")]
    pub student_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SheetPayment {
    #[serde(rename = "studentId", default, deserialize_with = "lenient_string")]
    pub student_id: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct StudentFields<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "Class")]
    pub class: &'a str,
    #[serde(rename = "Section")]
    pub section: &'a str,
    #[serde(rename = "Email")]
    pub email: &'a str,
    #[serde(rename = "Phone")]
    pub phone: &'a str,
    #[serde(rename = "Guardian Name")]
    pub guardian: &'a str,
    #[serde(rename = "Tuition Fee")]
    pub tuition_fee: f64,
}

impl<'a> From<&'a StudentDraft> for StudentFields<'a> {
    fn from(d: &'a StudentDraft) -> Self {
        Self {
            name: &d.name,
            class: &d.class,
            section: &d.section,
            email: &d.email,
            phone: &d.phone,
            guardian: &d.guardian,
            tuition_fee: d.tuition_fee,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentUpdate<'a> {
    #[serde(rename = "ID")]
    pub id: &'a str,
    #[serde(flatten)]
    pub fields: StudentFields<'a>,
    #[serde(rename = "Photo URL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<&'a str>,
    #[serde(rename = "rowIndex", skip_serializing_if = "Option::is_none")]
    pub row_index: Option<i64>,
}

impl<'a> StudentUpdate<'a> {
    pub fn new(student: &'a Student) -> Self {
        Self {
            id: &student.id,
            fields: StudentFields {
                name: &student.name,
                class: &student.class,
                section: &student.section,
                email: &student.email,
                phone: &student.phone,
                guardian: &student.guardian,
                tuition_fee: student.tuition_fee,
            },
            photo_url: student.photo_url.as_deref(),
            row_index: student.row.map(|r| r.0),
        }
    }
}

/// Deletes are keyed by the business identifier only.
#[derive(Debug, Serialize)]
pub struct DeleteTarget<'a> {
    #[serde(rename = "ID")]
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DayBatch<T> {
    pub date: String,
    pub records: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceEntry<'a> {
    #[serde(rename = "studentId")]
    pub student_id: &'a str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PaymentEntry<'a> {
    #[serde(rename = "studentId")]
    pub student_id: &'a str,
    pub amount: f64,
}

pub fn student_from_sheet(raw: SheetStudent) -> Student {
    Student {
        id: raw.id,
        name: raw.name,
        class: raw.class,
        section: raw.section,
        email: raw.email,
        phone: raw.phone,
        guardian: raw.guardian,
        tuition_fee: raw.tuition_fee,
        photo_url: raw.photo_url,
        row: raw.row_index.map(RowLocator),
    }
}

pub fn snapshot_from_sheet(raw: InitialData) -> Snapshot {
    let mut ids: HashSet<String> = HashSet::new();
    let students = raw
        .students
        .into_iter()
        .map(student_from_sheet)
        .filter(|s| {
            let first = ids.insert(s.id.clone());
            if !first {
                tracing::warn!(student_id = %s.id, row = ?s.row, "duplicate student id; keeping the first row");
            }
            first
        })
        .collect();

    let mut attendance = AttendanceLog::new();
    for (date, records) in raw.attendance {
        let mut seen: HashSet<String> = HashSet::new();
        let mut day = Vec::with_capacity(records.len());
        for r in records {
            let Some(status) = AttendanceStatus::from_code(&r.status) else {
                tracing::warn!(%date, student_id = %r.student_id, status = %r.status, "dropping attendance record with unknown status");
                continue;
            };
            if !seen.insert(r.student_id.clone()) {
                tracing::warn!(%date, student_id = %r.student_id, "duplicate attendance record; keeping the first");
                continue;
            }
            day.push(AttendanceRecord {
                student_id: r.student_id,
                status,
            });
        }
        attendance.insert(date, day);
    }

    let mut payments = PaymentLog::new();
    for (date, records) in raw.payments {
        let day: Vec<PaymentRecord> = records
            .into_iter()
            .filter(|p| {
                let keep = p.amount.is_finite() && p.amount > 0.0;
                if !keep {
                    tracing::warn!(%date, student_id = %p.student_id, amount = p.amount, "dropping non-positive payment");
                }
                keep
            })
            .map(|p| PaymentRecord {
                student_id: p.student_id,
                amount: p.amount,
            })
            .collect();
        payments.insert(date, day);
    }

    Snapshot {
        students,
        attendance,
        payments,
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

// Sheet cells come back as whatever type the spreadsheet inferred.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let s = lenient_string(d)?;
    Ok(if s.trim().is_empty() { None } else { Some(s) })
}

fn lenient_amount<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_row<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}
