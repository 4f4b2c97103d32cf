use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A customer booking. Scheduling fields stay `None` while the booking is
/// still `requested`; they are populated together when staff commit the
/// booking to a detailer, never individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub service: ServiceCategory,
    pub status: BookingStatus,
    pub date: Option<NaiveDate>,
    #[serde(with = "crate::models::slot::hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "crate::models::slot::hhmm_opt")]
    pub end_time: Option<NaiveTime>,
    pub detailer_id: Option<String>,
    pub secretary_id: Option<String>,
    /// Price in cents.
    pub price: Option<i64>,
    pub location: Option<String>,
    pub cancel_reason: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Requested,
    Pending,
    Finished,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Pending => "pending",
            BookingStatus::Finished => "finished",
            BookingStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(BookingStatus::Requested),
            "pending" => Some(BookingStatus::Pending),
            "finished" => Some(BookingStatus::Finished),
            "canceled" => Some(BookingStatus::Canceled),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Finished | BookingStatus::Canceled)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Wash,
    Dryclean,
    Polish,
    Engraving,
    Nanoceramic,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Wash => "wash",
            ServiceCategory::Dryclean => "dryclean",
            ServiceCategory::Polish => "polish",
            ServiceCategory::Engraving => "engraving",
            ServiceCategory::Nanoceramic => "nanoceramic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wash" => Some(ServiceCategory::Wash),
            "dryclean" => Some(ServiceCategory::Dryclean),
            "polish" => Some(ServiceCategory::Polish),
            "engraving" => Some(ServiceCategory::Engraving),
            "nanoceramic" => Some(ServiceCategory::Nanoceramic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "transfer" => Some(PaymentMethod::Transfer),
            _ => None,
        }
    }
}
