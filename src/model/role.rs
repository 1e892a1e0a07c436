use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Employee = 1,
    SeniorEmployee = 2,
    Admin = 3,
}

impl Default for Role {
    fn default() -> Self {
        Role::Employee
    }
}

impl Role {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Employee),
            2 => Some(Role::SeniorEmployee),
            3 => Some(Role::Admin),
            _ => None,
        }
    }

    /// Reporting bucket: seniors are grouped apart, everyone else is an employee.
    pub fn report_group(self) -> &'static str {
        match self {
            Role::SeniorEmployee => "senior",
            Role::Employee | Role::Admin => "employee",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn wire_names() {
        assert_eq!(Role::SeniorEmployee.as_ref(), "senior_employee");
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert_eq!(
            serde_json::to_string(&Role::SeniorEmployee).unwrap(),
            "\"senior_employee\""
        );
        assert!(Role::from_str("manager").is_err());
    }

    #[test]
    fn ids_round_trip() {
        for role in [Role::Employee, Role::SeniorEmployee, Role::Admin] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(9), None);
    }
}
