use acara_core::models::RecordSummary;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Plain-text table of record summaries.
pub fn format_record_table(rows: &[RecordSummary]) -> String {
    let mut out = format!(
        "{:<36}  {:<10}  {:<24}  {:<12}  {:<16}  {}\n",
        "ID", "BA DATE", "NAME", "LICENSE", "DESA", "NO BERKAS"
    );
    for row in rows {
        let ba_date = row
            .ba_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<36}  {:<10}  {:<24}  {:<12}  {:<16}  {}\n",
            row.id,
            ba_date,
            truncate_string(&row.full_name, 24),
            truncate_string(&row.no_license, 12),
            truncate_string(&row.desa, 16),
            row.no_berkas
        ));
    }
    out
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_multibyte() {
        assert_eq!(truncate_string("Sukamaju Élan", 8), "Sukam...");
    }

    #[test]
    fn record_table_lists_rows() {
        let id = Uuid::new_v4();
        let table = format_record_table(&[RecordSummary {
            id,
            created_at: Utc::now(),
            ba_date: Some(Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap()),
            full_name: "Budi Santoso".to_string(),
            no_license: "L-01".to_string(),
            desa: "Sukamaju".to_string(),
            no_berkas: "B-7".to_string(),
        }]);

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].starts_with(&id.to_string()));
        assert!(lines[1].contains("2025-03-05"));
        assert!(lines[1].ends_with("B-7"));
    }
}
