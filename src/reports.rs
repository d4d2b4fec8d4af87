//! Descriptive reporting queries
//!
//! A fixed sequence of independent read-only statements against the
//! warehouse tables. Each report targets one table; reports whose table is
//! missing (because its endpoint was skipped) are skipped as well.

use crate::error::Result;
use crate::warehouse::Warehouse;
use serde_json::Value;
use tracing::warn;

/// A single reporting query
#[derive(Debug, Clone, Copy)]
pub struct Report {
    /// Short name used in output headers
    pub name: &'static str,
    /// Table the query reads from
    pub table: &'static str,
    /// The SQL statement
    pub sql: &'static str,
}

/// The fixed report sequence, in display order
pub const REPORTS: &[Report] = &[
    Report {
        name: "top 10 tags by count",
        table: "tags",
        sql: "SELECT name, \"count\" FROM tags ORDER BY \"count\" DESC LIMIT 10",
    },
    Report {
        name: "average tag count",
        table: "tags",
        sql: "SELECT AVG(\"count\") AS avg_count FROM tags",
    },
    Report {
        name: "accepted answers",
        table: "answers",
        sql: "SELECT COUNT(*) AS accepted_count FROM answers WHERE is_accepted = true",
    },
    Report {
        name: "answers with score > 10 (%)",
        table: "answers",
        sql: "SELECT CASE WHEN COUNT(*) = 0 THEN 0.0 \
              ELSE 100.0 * COUNT(*) FILTER (WHERE score > 10) / COUNT(*) END \
              AS high_score_pct FROM answers",
    },
    Report {
        name: "top 5 users by total answer score",
        table: "answers",
        sql: "SELECT a.owner.user_id AS user_id, CAST(SUM(a.score) AS BIGINT) AS total_score \
              FROM answers a GROUP BY a.owner.user_id \
              ORDER BY total_score DESC LIMIT 5",
    },
    Report {
        name: "answered questions",
        table: "questions",
        sql: "SELECT COUNT(*) AS answered_count FROM questions WHERE is_answered = true",
    },
    Report {
        name: "top 5 questions by view count",
        table: "questions",
        sql: "SELECT question_id, title, view_count FROM questions \
              ORDER BY view_count DESC LIMIT 5",
    },
];

/// Result of one executed report
#[derive(Debug, Clone)]
pub struct ReportResult {
    /// Report name
    pub name: &'static str,
    /// Result rows as JSON objects
    pub rows: Vec<Value>,
}

/// Run every report whose table exists, in order.
///
/// Reports against missing tables are logged and skipped; a query failure
/// aborts the run.
pub fn run_all(warehouse: &Warehouse) -> Result<Vec<ReportResult>> {
    let mut results = Vec::with_capacity(REPORTS.len());

    for report in REPORTS {
        if !warehouse.table_exists(report.table)? {
            warn!(
                report = report.name,
                table = report.table,
                "skipping report, table not loaded"
            );
            continue;
        }

        let rows = warehouse.query_rows(report.sql)?;
        results.push(ReportResult {
            name: report.name,
            rows,
        });
    }

    Ok(results)
}

/// Render result rows as an aligned text table
pub fn render(result: &ReportResult) -> String {
    let mut out = format!("== {}\n", result.name);

    if result.rows.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }

    // Column order from the first row; serde_json maps keep keys sorted,
    // which keeps output stable across runs
    let columns: Vec<&String> = match &result.rows[0] {
        Value::Object(obj) => obj.keys().collect(),
        _ => return out,
    };

    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        let rendered: Vec<String> = columns
            .iter()
            .map(|col| match row.get(col.as_str()) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => "null".to_string(),
                Some(other) => other.to_string(),
            })
            .collect();
        for (i, cell) in rendered.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
        cells.push(rendered);
    }

    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
        .collect();
    out.push_str(&header.join("  "));
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::records_to_batch;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn seeded_warehouse() -> Warehouse {
        let warehouse = Warehouse::open(":memory:").unwrap();

        let tags: Vec<Value> = (1..=12)
            .map(|i| json!({"name": format!("tag{i:02}"), "count": i * 10}))
            .collect();
        warehouse
            .load_table("tags", &records_to_batch(&tags, None).unwrap())
            .unwrap();

        let answers = vec![
            json!({"answer_id": 1, "question_id": 1, "score": 25, "is_accepted": true,
                   "owner": {"user_id": 7}}),
            json!({"answer_id": 2, "question_id": 1, "score": 5, "is_accepted": false,
                   "owner": {"user_id": 7}}),
            json!({"answer_id": 3, "question_id": 2, "score": 50, "is_accepted": true,
                   "owner": {"user_id": 8}}),
            json!({"answer_id": 4, "question_id": 3, "score": 2, "is_accepted": false,
                   "owner": {"user_id": 9}}),
        ];
        warehouse
            .load_table("answers", &records_to_batch(&answers, None).unwrap())
            .unwrap();

        let questions = vec![
            json!({"question_id": 1, "title": "q1", "view_count": 900, "is_answered": true}),
            json!({"question_id": 2, "title": "q2", "view_count": 100, "is_answered": true}),
            json!({"question_id": 3, "title": "q3", "view_count": 500, "is_answered": false}),
        ];
        warehouse
            .load_table("questions", &records_to_batch(&questions, None).unwrap())
            .unwrap();

        warehouse
    }

    fn result_for<'a>(results: &'a [ReportResult], name: &str) -> &'a ReportResult {
        results
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("report '{name}' missing"))
    }

    #[test]
    fn test_all_reports_run() {
        let results = run_all(&seeded_warehouse()).unwrap();
        assert_eq!(results.len(), REPORTS.len());
    }

    #[test]
    fn test_top_tags_matches_manual_sort() {
        let results = run_all(&seeded_warehouse()).unwrap();
        let top = result_for(&results, "top 10 tags by count");

        // 12 tags seeded, top 10 by count descending
        assert_eq!(top.rows.len(), 10);
        assert_eq!(top.rows[0]["name"], json!("tag12"));
        assert_eq!(top.rows[0]["count"], json!(120));
        assert_eq!(top.rows[9]["count"], json!(30));
    }

    #[test]
    fn test_average_tag_count() {
        let results = run_all(&seeded_warehouse()).unwrap();
        let avg = result_for(&results, "average tag count");

        // counts are 10..=120 step 10; mean is 65
        assert_eq!(avg.rows[0]["avg_count"], json!(65.0));
    }

    #[test]
    fn test_accepted_and_high_score_answers() {
        let results = run_all(&seeded_warehouse()).unwrap();

        let accepted = result_for(&results, "accepted answers");
        assert_eq!(accepted.rows[0]["accepted_count"], json!(2));

        // 2 of 4 answers have score > 10
        let pct = result_for(&results, "answers with score > 10 (%)");
        assert_eq!(pct.rows[0]["high_score_pct"], json!(50.0));
    }

    #[test]
    fn test_top_users_by_total_score() {
        let results = run_all(&seeded_warehouse()).unwrap();
        let users = result_for(&results, "top 5 users by total answer score");

        assert_eq!(users.rows[0]["user_id"], json!(8));
        assert_eq!(users.rows[0]["total_score"], json!(50));
        assert_eq!(users.rows[1]["user_id"], json!(7));
        assert_eq!(users.rows[1]["total_score"], json!(30));
    }

    #[test]
    fn test_question_reports() {
        let results = run_all(&seeded_warehouse()).unwrap();

        let answered = result_for(&results, "answered questions");
        assert_eq!(answered.rows[0]["answered_count"], json!(2));

        let viewed = result_for(&results, "top 5 questions by view count");
        assert_eq!(viewed.rows[0]["question_id"], json!(1));
        assert_eq!(viewed.rows[1]["question_id"], json!(3));
        assert_eq!(viewed.rows[2]["question_id"], json!(2));
    }

    #[test]
    fn test_missing_table_skips_its_reports() {
        let warehouse = Warehouse::open(":memory:").unwrap();
        let tags = vec![json!({"name": "rust", "count": 1})];
        warehouse
            .load_table("tags", &records_to_batch(&tags, None).unwrap())
            .unwrap();

        let results = run_all(&warehouse).unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["top 10 tags by count", "average tag count"]);
    }

    #[test]
    fn test_render_aligns_columns() {
        let result = ReportResult {
            name: "top 10 tags by count",
            rows: vec![
                json!({"name": "javascript", "count": 2_500_000}),
                json!({"name": "go", "count": 70}),
            ],
        };
        let text = render(&result);

        assert!(text.starts_with("== top 10 tags by count\n"));
        // keys render alphabetically, count before name
        assert!(text.contains("count    name"));
        assert!(text.contains("2500000  javascript"));
        assert!(text.contains("70       go"));
    }

    #[test]
    fn test_render_empty() {
        let result = ReportResult {
            name: "accepted answers",
            rows: vec![],
        };
        assert!(render(&result).contains("(no rows)"));
    }
}
