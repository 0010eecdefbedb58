//! Formatted output helpers for CLI commands.

use cellar_runtime::recorder::ContainerRecord;

const ID_WIDTH: usize = 12;

/// Truncates a container ID to its conventional short form.
#[must_use]
pub fn short_id(id: &str) -> &str {
    id.get(..ID_WIDTH).unwrap_or(id)
}

/// Renders container records as an aligned table with a header row.
#[must_use]
pub fn records_table(records: &[ContainerRecord]) -> String {
    let mut out = format!(
        "{:<12}  {:<16}  {:<8}  {:<8}  {:<24}  {}\n",
        "ID", "NAME", "PID", "STATUS", "COMMAND", "CREATED"
    );
    for r in records {
        out.push_str(&format!(
            "{:<12}  {:<16}  {:<8}  {:<8}  {:<24}  {}\n",
            short_id(r.id.as_str()),
            r.name,
            r.pid,
            r.status,
            r.command,
            r.created_at
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use cellar_common::types::{ContainerId, ContainerState};

    use super::*;

    #[test]
    fn short_id_truncates_long_ids() {
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn table_lists_one_row_per_record() {
        let record = ContainerRecord {
            pid: 42,
            id: ContainerId::new("0123456789abcdef"),
            name: "web".into(),
            command: "top".into(),
            status: ContainerState::Running,
            created_at: "2026-01-01T00:00:00+00:00".into(),
        };
        let table = records_table(&[record]);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].starts_with("0123456789ab  web"));
        assert!(lines[1].contains("running"));
    }
}
