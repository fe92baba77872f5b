//! `mst penalties`: filtered penalty list.

use std::io::{self, Write};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Args;
use muster_core::config::FilterDefaults;
use muster_core::model::Penalty;
use muster_core::query::{DateRange, DepartmentFilter, SearchFilters, StatusFilter, filter, parse_date};
use serde::Serialize;

use super::{DataArgs, open_model};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct PenaltiesArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Case-insensitive match on engineer name or reason.
    #[arg(short, long)]
    pub search: Option<String>,

    /// Department name, or ALL.
    #[arg(short, long)]
    pub department: Option<String>,

    /// PENDING, PAID, DISPUTED, or ALL.
    #[arg(long)]
    pub status: Option<String>,

    /// First date to include (YYYY-MM-DD).
    #[arg(long, value_name = "DATE", conflicts_with = "all_dates")]
    pub from: Option<String>,

    /// Last date to include (YYYY-MM-DD).
    #[arg(long, value_name = "DATE", conflicts_with = "all_dates")]
    pub to: Option<String>,

    /// Ignore dates entirely.
    #[arg(long)]
    pub all_dates: bool,
}

impl PenaltiesArgs {
    /// Session defaults with every flag given on the command line applied on top.
    pub fn filters(&self, defaults: &FilterDefaults, today: NaiveDate) -> anyhow::Result<SearchFilters> {
        let mut filters = SearchFilters::session_default(defaults, today);
        if let Some(search) = &self.search {
            filters.search.clone_from(search);
        }
        if let Some(department) = &self.department {
            filters.department = DepartmentFilter::from(department.as_str());
        }
        if let Some(status) = &self.status {
            filters.status = status.parse::<StatusFilter>().context("--status")?;
        }
        if self.all_dates {
            filters.date_range = DateRange::unbounded();
        }
        if let Some(from) = &self.from {
            parse_date(from).with_context(|| format!("--from: '{from}' is not YYYY-MM-DD"))?;
            filters.date_range.start.clone_from(from);
        }
        if let Some(to) = &self.to {
            parse_date(to).with_context(|| format!("--to: '{to}' is not YYYY-MM-DD"))?;
            filters.date_range.end.clone_from(to);
        }
        Ok(filters)
    }
}

#[derive(Debug, Serialize)]
struct FilterSummary<'a> {
    search: &'a str,
    department: &'a str,
    status: String,
    from: &'a str,
    to: &'a str,
}

#[derive(Debug, Serialize)]
struct PenaltyReport<'a> {
    filters: FilterSummary<'a>,
    count: usize,
    penalties: Vec<Penalty>,
}

pub fn run_penalties(
    args: &PenaltiesArgs,
    defaults: &FilterDefaults,
    output: OutputMode,
) -> anyhow::Result<()> {
    let filters = args.filters(defaults, Utc::now().date_naive())?;
    let model = open_model(&args.data.data, output)?;
    let penalties = filter(model.penalty_list(), &filters);
    tracing::debug!(
        total = model.penalty_list().len(),
        matched = penalties.len(),
        "filtered penalties"
    );

    let report = PenaltyReport {
        filters: FilterSummary {
            search: &filters.search,
            department: filters.department.as_str(),
            status: filters.status.to_string(),
            from: &filters.date_range.start,
            to: &filters.date_range.end,
        },
        count: penalties.len(),
        penalties,
    };
    render_mode(output, &report, render_text, render_pretty)
}

fn status_label(penalty: &Penalty) -> &'static str {
    penalty.fields.status.map_or("-", |status| status.as_str())
}

fn render_text(report: &PenaltyReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    for penalty in &report.penalties {
        let fields = &penalty.fields;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            penalty.id,
            fields.date(),
            status_label(penalty),
            fields.amount(),
            fields.department(),
            fields.engineer_name(),
            fields.reason()
        )?;
    }
    Ok(())
}

fn render_pretty(report: &PenaltyReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Penalties ({})", report.count))?;
    let range = match (report.filters.from, report.filters.to) {
        ("", "") => "any".to_string(),
        (from, to) => format!("{} .. {}", or_open(from), or_open(to)),
    };
    pretty_kv(w, "department", report.filters.department)?;
    pretty_kv(w, "status", &report.filters.status)?;
    pretty_kv(w, "dates", range)?;
    if !report.filters.search.is_empty() {
        pretty_kv(w, "search", report.filters.search)?;
    }
    pretty_rule(w)?;

    if report.penalties.is_empty() {
        return writeln!(w, "No penalties match.");
    }
    for penalty in &report.penalties {
        let fields = &penalty.fields;
        writeln!(
            w,
            "{:<10} {:<9} {:>10}  {:<12} {}",
            fields.date(),
            status_label(penalty),
            fields.amount().to_string(),
            fields.department(),
            fields.engineer_name()
        )?;
        if !fields.reason().is_empty() {
            writeln!(w, "{:<10} {}", "", fields.reason())?;
        }
    }
    Ok(())
}

const fn or_open(bound: &str) -> &str {
    if bound.is_empty() { "*" } else { bound }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use muster_core::model::PenaltyStatus;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: PenaltiesArgs,
    }

    fn parse(extra: &[&str]) -> PenaltiesArgs {
        let mut argv = vec!["test", "--data", "d.json"];
        argv.extend_from_slice(extra);
        Wrapper::parse_from(argv).args
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn no_flags_gives_session_defaults() {
        let filters = parse(&[]).filters(&FilterDefaults::default(), today()).unwrap();
        assert_eq!(filters.department, DepartmentFilter::from("DevSecOps"));
        assert_eq!(filters.status, StatusFilter::Only(PenaltyStatus::Pending));
        assert_eq!(filters.date_range, DateRange::new("2024-02-14", "2024-03-15"));
    }

    #[test]
    fn flags_override_defaults() {
        let filters = parse(&["--department", "ALL", "--status", "paid", "--from", "2024-01-01"])
            .filters(&FilterDefaults::default(), today())
            .unwrap();
        assert_eq!(filters.department, DepartmentFilter::All);
        assert_eq!(filters.status, StatusFilter::Only(PenaltyStatus::Paid));
        assert_eq!(filters.date_range, DateRange::new("2024-01-01", "2024-03-15"));
    }

    #[test]
    fn all_dates_clears_the_range() {
        let filters = parse(&["--all-dates"])
            .filters(&FilterDefaults::default(), today())
            .unwrap();
        assert_eq!(filters.date_range, DateRange::unbounded());
    }

    #[test]
    fn all_dates_conflicts_with_bounds() {
        assert!(Wrapper::try_parse_from(["test", "--data", "d", "--all-dates", "--to", "2024-01-01"]).is_err());
    }

    #[test]
    fn bad_inputs_are_rejected() {
        let defaults = FilterDefaults::default();
        assert!(parse(&["--status", "WAIVED"]).filters(&defaults, today()).is_err());
        assert!(parse(&["--from", "03/01/2024"]).filters(&defaults, today()).is_err());
    }
}
