use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Opaque position of a student's row in the backing sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowLocator(pub i64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub class: String,
    pub section: String,
    pub email: String,
    pub phone: String,
    pub guardian: String,
    pub tuition_fee: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<RowLocator>,
}

/// Form contents for creating or editing a student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentDraft {
    pub name: String,
    pub class: String,
    pub section: String,
    pub email: String,
    pub phone: String,
    pub guardian: String,
    #[serde(deserialize_with = "form_amount")]
    pub tuition_fee: f64,
}

// Form inputs send numbers as strings; blank means zero.
fn form_amount<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::Null => Ok(0.0),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom("tuitionFee must be a number")),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(0.0),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("tuitionFee must be a number, got {s:?}"))),
        _ => Err(de::Error::custom("tuitionFee must be a number")),
    }
}

impl StudentDraft {
    pub fn from_student(s: &Student) -> Self {
        Self {
            name: s.name.clone(),
            class: s.class.clone(),
            section: s.section.clone(),
            email: s.email.clone(),
            phone: s.phone.clone(),
            guardian: s.guardian.clone(),
            tuition_fee: s.tuition_fee,
        }
    }

    /// Overlay this draft on an existing student, keeping its identity.
    pub fn apply_to(&self, existing: &Student) -> Student {
        Student {
            id: existing.id.clone(),
            name: self.name.clone(),
            class: self.class.clone(),
            section: self.section.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            guardian: self.guardian.clone(),
            tuition_fee: self.tuition_fee,
            photo_url: existing.photo_url.clone(),
            row: existing.row,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "A")]
    Absent,
    #[serde(rename = "L")]
    Leave,
}

impl AttendanceStatus {
    pub fn code(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "P",
            AttendanceStatus::Absent => "A",
            AttendanceStatus::Leave => "L",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "P" => Some(AttendanceStatus::Present),
            "A" => Some(AttendanceStatus::Absent),
            "L" => Some(AttendanceStatus::Leave),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub student_id: String,
    pub amount: f64,
}

/// ISO date (`YYYY-MM-DD`) to that day's records. Keys sort chronologically.
pub type AttendanceLog = BTreeMap<String, Vec<AttendanceRecord>>;
pub type PaymentLog = BTreeMap<String, Vec<PaymentRecord>>;

/// Everything `getInitialData` returns, already in canonical shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub students: Vec<Student>,
    pub attendance: AttendanceLog,
    pub payments: PaymentLog,
}

impl Snapshot {
    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }
}
