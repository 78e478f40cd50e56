// src/utils/csv.rs

use crate::models::attempt::AttemptResult;

/// Escapes a CSV field and neutralizes spreadsheet formulas.
/// Fields starting with =, +, @, - or control characters get a leading tab;
/// fields containing separators, quotes or newlines are quoted.
pub fn escape_field(value: &str) -> String {
    let sanitized = if value.starts_with(['=', '+', '@', '-', '\t', '\r', '\n']) {
        format!("\t{}", value)
    } else {
        value.to_string()
    };

    if sanitized.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", sanitized.replace('"', "\"\""))
    } else {
        sanitized
    }
}

pub const RESULTS_HEADER: &str = "attempt_id,student_name,email,school,email_verified,identity,score,total_questions,started_at,completed_at,duration_seconds";

/// Renders completed attempts as CSV, header included.
pub fn results_csv(results: &[AttemptResult]) -> String {
    let mut lines = Vec::with_capacity(results.len() + 1);
    lines.push(RESULTS_HEADER.to_string());

    for r in results {
        let fields = [
            escape_field(&r.attempt_id),
            escape_field(&r.student_name),
            escape_field(&r.student_email),
            escape_field(&r.student_school),
            r.email_verified.to_string(),
            escape_field(&r.identity),
            r.score.to_string(),
            r.total_questions.to_string(),
            r.started_at.to_rfc3339(),
            r.completed_at.to_rfc3339(),
            r.duration_seconds().to_string(),
        ];
        lines.push(fields.join(","));
    }

    let mut csv = lines.join("\n");
    csv.push('\n');
    csv
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn test_escape_plain_and_quoted() {
        assert_eq!(escape_field("Ada"), "Ada");
        assert_eq!(escape_field("Smith, Jane"), "\"Smith, Jane\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_escape_formula_injection() {
        assert_eq!(escape_field("=SUM(A1:A9)"), "\t=SUM(A1:A9)");
        assert_eq!(escape_field("@cmd"), "\t@cmd");
    }

    #[test]
    fn test_results_csv_rows() {
        let started = Utc::now();
        let rows = vec![AttemptResult {
            attempt_id: "a-1".to_string(),
            student_name: "Lovelace, Ada".to_string(),
            student_email: "ada@example.com".to_string(),
            student_school: "Academy".to_string(),
            email_verified: false,
            identity: "10.0.0.1".to_string(),
            score: 4,
            total_questions: 5,
            started_at: started,
            completed_at: started + Duration::seconds(125),
        }];

        let csv = results_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], RESULTS_HEADER);
        assert!(lines[1].starts_with("a-1,\"Lovelace, Ada\",ada@example.com,Academy,false,10.0.0.1,4,5,"));
        assert!(lines[1].ends_with(",125"));
    }
}
