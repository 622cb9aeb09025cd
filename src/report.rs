//! Human-readable run reports on stdout.

use std::io::{self, Write};

use crate::commands::{InsertRun, LoadingRun};
use crate::error::Result;
use crate::models::CapturedQuery;

/// `first...last` of the inserted ids, `-` when nothing was inserted.
fn id_range(run: &InsertRun) -> String {
    match (run.first_id(), run.last_id()) {
        (Some(first), Some(last)) => format!("{}...{}", first, last),
        _ => "-".to_string(),
    }
}

pub fn write_insert_report<W: Write>(out: &mut W, run: &InsertRun) -> Result<()> {
    writeln!(out, "============== RESULTS ({}) ===========", run.strategy)?;
    writeln!(
        out,
        "*** Inserted IDs ({}): {}",
        run.inserted_ids.len(),
        id_range(run)
    )?;
    writeln!(out, "*** Emitted {} queries:", run.queries.len())?;
    writeln!(out)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&run.queries)?)?;
    writeln!(out, "*** total duration (s): {}", run.elapsed_seconds)?;
    Ok(())
}

pub fn print_insert_report(run: &InsertRun) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_insert_report(&mut out, run)
}

pub fn write_loading_report<W: Write>(out: &mut W, run: &LoadingRun) -> Result<()> {
    writeln!(
        out,
        "============== RESULTS ({} / {}) ===========",
        run.scenario, run.strategy
    )?;
    writeln!(out, "{}", serde_json::to_string_pretty(&run.results)?)?;
    writeln!(out, "*** Emitted {} queries", run.queries.len())?;
    writeln!(out, "*** total duration (s): {}", run.elapsed_seconds)?;
    Ok(())
}

pub fn print_loading_report(run: &LoadingRun) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_loading_report(&mut out, run)
}

/// Log each statement at debug level, numbered in execution order.
pub fn log_captured_queries(label: &str, queries: &[CapturedQuery]) {
    for (index, query) in queries.iter().enumerate() {
        log::debug!(
            "[{}] #{} {} {:?}",
            label,
            index + 1,
            query.statement,
            query.parameters
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{InsertStrategy, LoadStrategy, Scenario};
    use crate::models::SqlValue;

    fn insert_run(ids: Vec<i64>) -> InsertRun {
        InsertRun {
            strategy: InsertStrategy::AddAll,
            batch_id: "abc123".to_string(),
            inserted_ids: ids,
            queries: vec![CapturedQuery::new(
                "INSERT INTO entries (description, created_at) VALUES (?1, ?2) RETURNING id",
                &[SqlValue::from("abc123-row-0"), SqlValue::Null],
            )],
            elapsed_seconds: 0.25,
        }
    }

    fn render(run: &InsertRun) -> String {
        let mut buf = Vec::new();
        write_insert_report(&mut buf, run).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn insert_report_layout() {
        let text = render(&insert_run(vec![4, 5, 6]));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "============== RESULTS (add_all) ===========");
        assert_eq!(lines[1], "*** Inserted IDs (3): 4...6");
        assert_eq!(lines[2], "*** Emitted 1 queries:");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "[");
        assert!(text.contains("\"statement\": \"INSERT INTO entries"));
        assert_eq!(*lines.last().unwrap(), "*** total duration (s): 0.25");
    }

    #[test]
    fn empty_batch_prints_a_dash() {
        let text = render(&insert_run(Vec::new()));
        assert!(text.contains("*** Inserted IDs (0): -\n"));
    }

    #[test]
    fn single_id_repeats_as_range() {
        let text = render(&insert_run(vec![9]));
        assert!(text.contains("*** Inserted IDs (1): 9...9\n"));
    }

    #[test]
    fn loading_report_prints_results_then_count() {
        let run = LoadingRun {
            scenario: Scenario::Companies,
            strategy: LoadStrategy::Joined,
            results: serde_json::json!([{"name": "Iain Brown", "company_name": "Cobalt co."}]),
            queries: vec![CapturedQuery::new("SELECT 1", &[])],
            elapsed_seconds: 0.5,
        };
        let mut buf = Vec::new();
        write_loading_report(&mut buf, &run).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("============== RESULTS (companies / joined) ===========\n"));
        assert!(text.contains("\"company_name\": \"Cobalt co.\""));
        assert!(text.contains("*** Emitted 1 queries\n"));
        assert!(text.ends_with("*** total duration (s): 0.5\n"));
    }
}
