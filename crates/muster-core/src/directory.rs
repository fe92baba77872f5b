//! Create, update and delete for employees, departments and designations.
//!
//! Deletes never cascade: removing a department or designation leaves any
//! dependent ids dangling, which [`crate::store::ReadModel`] lookups report.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::auth::{AuthSession, require_user};
use crate::model::{DepartmentFields, DesignationFields, EmployeeFields};
use crate::mutation::{MutationError, Stamp, ValidationError, document_fields, now_ms, required};
use crate::remote::{CollectionKind, CollectionSet, RemoteCollection};

const NAME_MIN_CHARS: usize = 4;
const NAME_MAX_CHARS: usize = 30;

/// Checks applied to an employee before it is written.
///
/// # Errors
///
/// The first [`ValidationError`] found.
pub fn validate_employee(employee: &EmployeeFields) -> Result<(), ValidationError> {
    let name = employee.name.as_deref().unwrap_or_default();
    let chars = name.chars().count();
    if chars < NAME_MIN_CHARS {
        return Err(ValidationError::new(
            "name",
            "must be greater than 3 characters",
        ));
    }
    if chars > NAME_MAX_CHARS {
        return Err(ValidationError::new(
            "name",
            "can not be longer than 30 characters",
        ));
    }
    if !is_valid_email(employee.email.as_deref().unwrap_or_default()) {
        return Err(ValidationError::new("email", "must be a valid email address"));
    }
    Ok(())
}

/// # Errors
///
/// Fails when the department name is blank.
pub fn validate_department(department: &DepartmentFields) -> Result<(), ValidationError> {
    required(
        "department_name",
        department.department_name.as_deref().unwrap_or_default(),
    )?;
    Ok(())
}

/// # Errors
///
/// Fails when the designation name or department id is blank.
pub fn validate_designation(designation: &DesignationFields) -> Result<(), ValidationError> {
    required(
        "designation_name",
        designation.designation_name.as_deref().unwrap_or_default(),
    )?;
    required(
        "department_id",
        designation.department_id.as_deref().unwrap_or_default(),
    )?;
    Ok(())
}

/// `local@domain.tld` with no whitespace.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Write access to the staff directory collections.
pub struct Directory {
    collections: CollectionSet,
    auth: Arc<dyn AuthSession>,
}

impl Directory {
    #[must_use]
    pub fn new(collections: &CollectionSet, auth: Arc<dyn AuthSession>) -> Self {
        Self {
            collections: collections.clone(),
            auth,
        }
    }

    /// # Errors
    ///
    /// [`MutationError::Auth`], [`MutationError::Validation`] or
    /// [`MutationError::Remote`].
    pub fn create_employee(&self, employee: &EmployeeFields) -> Result<String, MutationError> {
        self.create(CollectionKind::Employees, employee, validate_employee)
    }

    /// # Errors
    ///
    /// As for [`Directory::create_employee`].
    pub fn update_employee(&self, id: &str, employee: &EmployeeFields) -> Result<(), MutationError> {
        self.update(CollectionKind::Employees, id, employee, validate_employee)
    }

    /// # Errors
    ///
    /// [`MutationError::Auth`] or [`MutationError::Remote`].
    pub fn delete_employee(&self, id: &str) -> Result<(), MutationError> {
        self.delete(CollectionKind::Employees, id)
    }

    /// # Errors
    ///
    /// As for [`Directory::create_employee`].
    pub fn create_department(&self, department: &DepartmentFields) -> Result<String, MutationError> {
        self.create(CollectionKind::Departments, department, validate_department)
    }

    /// # Errors
    ///
    /// As for [`Directory::create_employee`].
    pub fn update_department(
        &self,
        id: &str,
        department: &DepartmentFields,
    ) -> Result<(), MutationError> {
        self.update(CollectionKind::Departments, id, department, validate_department)
    }

    /// Dependent designations keep their `department_id`.
    ///
    /// # Errors
    ///
    /// [`MutationError::Auth`] or [`MutationError::Remote`].
    pub fn delete_department(&self, id: &str) -> Result<(), MutationError> {
        self.delete(CollectionKind::Departments, id)
    }

    /// # Errors
    ///
    /// As for [`Directory::create_employee`].
    pub fn create_designation(
        &self,
        designation: &DesignationFields,
    ) -> Result<String, MutationError> {
        self.create(CollectionKind::Designations, designation, validate_designation)
    }

    /// # Errors
    ///
    /// As for [`Directory::create_employee`].
    pub fn update_designation(
        &self,
        id: &str,
        designation: &DesignationFields,
    ) -> Result<(), MutationError> {
        self.update(CollectionKind::Designations, id, designation, validate_designation)
    }

    /// Dependent employees keep their `designation_id`.
    ///
    /// # Errors
    ///
    /// [`MutationError::Auth`] or [`MutationError::Remote`].
    pub fn delete_designation(&self, id: &str) -> Result<(), MutationError> {
        self.delete(CollectionKind::Designations, id)
    }

    // Sign-in is checked before the payload.
    fn create<T: Serialize>(
        &self,
        kind: CollectionKind,
        payload: &T,
        validate: fn(&T) -> Result<(), ValidationError>,
    ) -> Result<String, MutationError> {
        let user = require_user(self.auth.as_ref())?;
        validate(payload)?;
        let fields = document_fields(payload, Stamp::Created(now_ms()))?;
        let id = self.collections.get(kind).create(fields)?;
        tracing::info!(%kind, %id, user = %user.email, "record created");
        Ok(id)
    }

    fn update<T: Serialize>(
        &self,
        kind: CollectionKind,
        id: &str,
        payload: &T,
        validate: fn(&T) -> Result<(), ValidationError>,
    ) -> Result<(), MutationError> {
        let user = require_user(self.auth.as_ref())?;
        validate(payload)?;
        let fields = document_fields(payload, Stamp::Modified(now_ms()))?;
        self.collections.get(kind).update(id, fields)?;
        tracing::info!(%kind, id, user = %user.email, "record updated");
        Ok(())
    }

    fn delete(&self, kind: CollectionKind, id: &str) -> Result<(), MutationError> {
        let user = require_user(self.auth.as_ref())?;
        self.collections.get(kind).delete(id)?;
        tracing::info!(%kind, id, user = %user.email, "record deleted");
        Ok(())
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory").finish_non_exhaustive()
    }
}
