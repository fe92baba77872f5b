//! Typed records for the four tracked collections.
//!
//! All of them are plain data. Every document is a [`record::Record`] whose
//! payload keeps unknown fields in an `extra` map so writes never drop data
//! this crate does not model.

pub mod amount;
pub mod directory;
pub mod penalty;
pub mod record;

pub use amount::{Amount, ParseAmountError};
pub use directory::{
    Department, DepartmentFields, Designation, DesignationFields, Employee, EmployeeFields,
};
pub use penalty::{InvalidTransition, ParseEnumError, Penalty, PenaltyFields, PenaltyStatus};
pub use record::Record;
