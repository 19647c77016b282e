use serde::{Deserialize, Serialize};

use uteexpress_core::{DomainError, DomainResult, Entity, PrincipalId, ShipperId};

/// Input for registering a shipper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShipper {
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
    /// Shipper account driving this vehicle.
    pub user_id: Option<PrincipalId>,
}

/// A shipper (courier) in the delivery network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipper {
    id: ShipperId,
    code: String,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    vehicle_type: Option<String>,
    vehicle_number: Option<String>,
    user_id: Option<PrincipalId>,
}

impl Shipper {
    pub fn register(id: ShipperId, input: NewShipper) -> DomainResult<Self> {
        let code = input.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(DomainError::validation("shipper code cannot be empty"));
        }
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("shipper name cannot be empty"));
        }

        Ok(Self {
            id,
            code,
            name: input.name.trim().to_string(),
            phone: input.phone,
            email: input.email.map(|e| e.trim().to_lowercase()),
            vehicle_type: input.vehicle_type,
            vehicle_number: input.vehicle_number,
            user_id: input.user_id,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn vehicle_type(&self) -> Option<&str> {
        self.vehicle_type.as_deref()
    }

    pub fn vehicle_number(&self) -> Option<&str> {
        self.vehicle_number.as_deref()
    }

    pub fn user_id(&self) -> Option<PrincipalId> {
        self.user_id
    }
}

impl Entity for Shipper {
    type Id = ShipperId;

    fn id(&self) -> ShipperId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truck() -> NewShipper {
        NewShipper {
            code: "shp-hn".to_string(),
            name: "Tran Van B".to_string(),
            phone: Some("0981234567".to_string()),
            email: Some("shipper.hn@uteexpress.com".to_string()),
            vehicle_type: Some("Truck".to_string()),
            vehicle_number: Some("29A-12345".to_string()),
            user_id: None,
        }
    }

    #[test]
    fn register_normalizes_code() {
        let s = Shipper::register(ShipperId::new(), truck()).unwrap();
        assert_eq!(s.code(), "SHP-HN");
        assert_eq!(s.vehicle_number(), Some("29A-12345"));
    }

    #[test]
    fn register_rejects_blank_name() {
        let mut input = truck();
        input.name = " ".to_string();
        let err = Shipper::register(ShipperId::new(), input).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
