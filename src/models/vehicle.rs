use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(rename = "uuid")]
    pub id: Uuid,
    #[serde(skip)]
    pub company_id: Uuid,
    pub registration_number: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Vehicle {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Registration plates are compared without whitespace and case.
pub fn normalize_registration(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct VehiclePatch {
    pub registration_number: Option<String>,
    pub brand: Option<Option<String>>,
    pub model: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl VehiclePatch {
    pub fn apply_to(self, vehicle: &mut Vehicle) {
        if let Some(registration_number) = self.registration_number {
            vehicle.registration_number = registration_number;
        }
        if let Some(brand) = self.brand {
            vehicle.brand = brand;
        }
        if let Some(model) = self.model {
            vehicle.model = model;
        }
        if let Some(is_active) = self.is_active {
            vehicle.is_active = is_active;
        }
    }
}
