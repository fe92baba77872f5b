//! Staff directory payloads: employees, departments and designations.
//!
//! References between them (employee -> designation -> department) are
//! plain ids. Nothing guarantees the target still exists; resolve them
//! through [`crate::store::ReadModel`] lookups, which report dangling ids.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::Record;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(
        rename = "designation_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub designation_id: Option<String>,
    /// Fields this crate does not model, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepartmentFields {
    #[serde(
        rename = "department_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub department_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignationFields {
    #[serde(
        rename = "designation_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub designation_name: Option<String>,
    #[serde(
        rename = "department_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub department_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type Employee = Record<EmployeeFields>;
pub type Department = Record<DepartmentFields>;
pub type Designation = Record<DesignationFields>;

impl EmployeeFields {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        designation_id: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
            phone: Some(phone.into()),
            designation_id: Some(designation_id.into()),
            extra: Map::new(),
        }
    }
}

impl DepartmentFields {
    pub fn new(department_name: impl Into<String>) -> Self {
        Self {
            department_name: Some(department_name.into()),
            extra: Map::new(),
        }
    }
}

impl DesignationFields {
    pub fn new(designation_name: impl Into<String>, department_id: impl Into<String>) -> Self {
        Self {
            designation_name: Some(designation_name.into()),
            department_id: Some(department_id.into()),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn employee_decodes_wire_names_and_keeps_extras() {
        let employee: Employee = serde_json::from_value(json!({
            "id": "emp-1",
            "createdAt": 1_700_000_000_000_i64,
            "modifiedAt": 1_700_000_000_500_i64,
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "phone": "555-0100",
            "designation_id": "des-1",
            "badge": 42
        }))
        .unwrap();

        assert_eq!(employee.id, "emp-1");
        assert_eq!(employee.created_at, Some(1_700_000_000_000));
        assert_eq!(employee.fields.designation_id.as_deref(), Some("des-1"));
        assert_eq!(employee.fields.extra.get("badge"), Some(&json!(42)));
        assert!(!employee.fields.extra.contains_key("id"));
        assert!(!employee.fields.extra.contains_key("createdAt"));
    }

    #[test]
    fn missing_fields_are_absent_not_errors() {
        let designation: Designation =
            serde_json::from_value(json!({ "id": "des-9" })).unwrap();
        assert_eq!(designation.created_at, None);
        assert_eq!(designation.fields.designation_name, None);
        assert_eq!(designation.fields.department_id, None);
    }

    #[test]
    fn payload_serializes_without_bookkeeping() {
        let fields = DepartmentFields::new("DevSecOps");
        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value, json!({ "department_name": "DevSecOps" }));
    }
}
