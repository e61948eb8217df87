use super::tabular::Row;

fn date_prefix(value: &str) -> &str {
    match value.char_indices().nth(10) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Find the row for `target_date` (`YYYY-MM-DD`) by its `date` or `day` column.
///
/// When no row matches, the first row is returned instead. Single-row
/// "today's times" uploads rely on this; a multi-day sheet missing the date
/// will silently yield its first day.
pub fn select<'a>(rows: &'a [Row], target_date: &str) -> Option<&'a Row> {
    rows.iter()
        .find(|row| {
            ["date", "day"]
                .iter()
                .filter_map(|k| row.get(*k))
                .any(|v| date_prefix(v) == target_date)
        })
        .or_else(|| rows.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn first_matching_row_wins() {
        let rows = vec![
            row(&[("date", "2024-03-01"), ("fajr", "a")]),
            row(&[("date", "2024-03-02"), ("fajr", "b")]),
            row(&[("date", "2024-03-02"), ("fajr", "c")]),
        ];
        assert_eq!(select(&rows, "2024-03-02").unwrap()["fajr"], "b");
    }

    #[test]
    fn matches_day_column_and_datetime_prefix() {
        let rows = vec![
            row(&[("day", "2024-03-01"), ("fajr", "a")]),
            row(&[("date", "2024-03-02 00:00:00"), ("fajr", "b")]),
        ];
        assert_eq!(select(&rows, "2024-03-01").unwrap()["fajr"], "a");
        assert_eq!(select(&rows, "2024-03-02").unwrap()["fajr"], "b");
    }

    #[test]
    fn falls_back_to_first_row() {
        let rows = vec![row(&[("date", "2024-01-01"), ("fajr", "a")])];
        assert_eq!(select(&rows, "2024-03-01").unwrap()["fajr"], "a");
    }

    #[test]
    fn no_rows_no_result() {
        assert!(select(&[], "2024-03-01").is_none());
    }
}
