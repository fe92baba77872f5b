//! `mst employees`: staff directory with resolved references.

use std::io::{self, Write};

use clap::Args;
use muster_core::store::EmployeeView;
use serde::Serialize;

use super::{DataArgs, open_model};
use crate::output::{OutputMode, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct EmployeesArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Only list employees whose designation or department is missing.
    #[arg(long)]
    pub dangling: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct EmployeeRow {
    id: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    designation: Option<String>,
    department: Option<String>,
    dangling: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    problem: Option<String>,
}

impl From<&EmployeeView<'_>> for EmployeeRow {
    fn from(view: &EmployeeView<'_>) -> Self {
        let problem = match (&view.designation, &view.department) {
            (Err(err), _) | (Ok(_), Err(err)) => Some(err.to_string()),
            (Ok(_), Ok(_)) => None,
        };
        Self {
            id: view.id.to_string(),
            name: view.employee.name.clone(),
            email: view.employee.email.clone(),
            phone: view.employee.phone.clone(),
            designation: view.designation_name().map(str::to_string),
            department: view.department_name().map(str::to_string),
            dangling: view.is_dangling(),
            problem,
        }
    }
}

pub fn run_employees(args: &EmployeesArgs, output: OutputMode) -> anyhow::Result<()> {
    let model = open_model(&args.data.data, output)?;
    let rows: Vec<EmployeeRow> = model
        .employee_views()
        .iter()
        .map(EmployeeRow::from)
        .filter(|row| !args.dangling || row.dangling)
        .collect();
    render_mode(output, &rows, |rows, w| render_text(rows, w), |rows, w| render_pretty(rows, w))
}

fn dash(value: Option<&String>) -> &str {
    value.map_or("-", String::as_str)
}

fn render_text(rows: &[EmployeeRow], w: &mut dyn Write) -> io::Result<()> {
    for row in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}{}",
            row.id,
            dash(row.name.as_ref()),
            dash(row.email.as_ref()),
            dash(row.designation.as_ref()),
            dash(row.department.as_ref()),
            if row.dangling { "\tdangling" } else { "" }
        )?;
    }
    Ok(())
}

fn render_pretty(rows: &[EmployeeRow], w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Employees ({})", rows.len()))?;
    for row in rows {
        writeln!(
            w,
            "{:<24} {:<28} {:<16} {}",
            dash(row.name.as_ref()),
            dash(row.email.as_ref()),
            dash(row.designation.as_ref()),
            dash(row.department.as_ref())
        )?;
        if let Some(problem) = &row.problem {
            writeln!(w, "  ! {problem}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::model::{DepartmentFields, DesignationFields, EmployeeFields};
    use muster_core::store::LookupError;
    use muster_core::remote::CollectionKind;

    #[test]
    fn resolved_row_has_names_and_no_problem() {
        let employee = EmployeeFields::new("Ada Lovelace", "ada@example.com", "555", "des-1");
        let designation = DesignationFields::new("SRE", "dep-1");
        let department = DepartmentFields::new("DevSecOps");
        let view = EmployeeView {
            id: "emp-1",
            employee: &employee,
            designation: Ok(&designation),
            department: Ok(&department),
        };
        let row = EmployeeRow::from(&view);
        assert_eq!(row.designation.as_deref(), Some("SRE"));
        assert_eq!(row.department.as_deref(), Some("DevSecOps"));
        assert!(!row.dangling);
        assert!(row.problem.is_none());
    }

    #[test]
    fn dangling_row_reports_first_broken_link() {
        let employee = EmployeeFields::new("Ada Lovelace", "ada@example.com", "555", "des-9");
        let missing = LookupError::Dangling {
            kind: CollectionKind::Designations,
            id: "des-9".to_string(),
        };
        let view = EmployeeView {
            id: "emp-1",
            employee: &employee,
            designation: Err(missing.clone()),
            department: Err(missing),
        };
        let row = EmployeeRow::from(&view);
        assert!(row.dangling);
        assert_eq!(row.designation, None);
        assert_eq!(row.problem.as_deref(), Some("designations 'des-9' does not exist"));

        let mut buf = Vec::new();
        render_text(&[row], &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "emp-1\tAda Lovelace\tada@example.com\t-\t-\tdangling\n"
        );
    }
}
