//! `mst stats`: dashboard totals over every penalty.

use std::io::{self, Write};

use clap::Args;
use muster_core::{Stats, summarize};

use super::{DataArgs, open_model};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

/// Execute `mst stats`. Filters do not apply; totals cover the full list.
pub fn run_stats(args: &StatsArgs, output: OutputMode) -> anyhow::Result<()> {
    let model = open_model(&args.data.data, output)?;
    let stats = summarize(model.penalty_list());
    render_mode(output, &stats, render_text, render_pretty)
}

fn render_text(stats: &Stats, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "total_penalties\t{}", stats.total_penalties)?;
    writeln!(w, "total_amount\t{}", stats.total_amount)?;
    writeln!(w, "pending_amount\t{}", stats.pending_amount)?;
    writeln!(w, "paid_amount\t{}", stats.paid_amount)?;
    writeln!(w, "disputed_amount\t{}", stats.disputed_amount)
}

fn render_pretty(stats: &Stats, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Penalty totals")?;
    pretty_kv(w, "penalties", stats.total_penalties.to_string())?;
    pretty_kv(w, "total", stats.total_amount.to_string())?;
    pretty_kv(w, "pending", stats.pending_amount.to_string())?;
    pretty_kv(w, "paid", stats.paid_amount.to_string())?;
    pretty_kv(w, "disputed", stats.disputed_amount.to_string())?;
    let unclassified = stats.unclassified_amount();
    if !unclassified.is_zero() {
        pretty_kv(w, "no status", unclassified.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::model::Amount;

    fn sample() -> Stats {
        Stats {
            total_penalties: 3,
            total_amount: Amount::from_major(400),
            pending_amount: Amount::from_major(100),
            paid_amount: Amount::from_major(200),
            disputed_amount: Amount::from_major(50),
        }
    }

    #[test]
    fn text_is_one_key_per_line() {
        let mut buf = Vec::new();
        render_text(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("total_amount\t400.00"));
    }

    #[test]
    fn pretty_shows_unclassified_remainder() {
        let mut buf = Vec::new();
        render_pretty(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("no status:"));
        assert!(text.contains("50.00"));

        let mut buf = Vec::new();
        render_pretty(&Stats::default(), &mut buf).unwrap();
        assert!(!String::from_utf8(buf).unwrap().contains("no status"));
    }
}
