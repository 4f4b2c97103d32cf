use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub role: StaffRole,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Secretary,
    Detailer,
    Admin,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Secretary => "secretary",
            StaffRole::Detailer => "detailer",
            StaffRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "secretary" => Some(StaffRole::Secretary),
            "detailer" => Some(StaffRole::Detailer),
            "admin" => Some(StaffRole::Admin),
            _ => None,
        }
    }
}
