use rollcall_types::*;

const COLUMNS: [&str; 5] = ["NAME", "AGE", "COMMUTE", "COLLEGE", "HOBBIES"];

pub fn format_records(records: &[UserRecord]) -> String {
    if records.is_empty() {
        return "No users".to_string();
    }

    let rows: Vec<[String; 5]> = records.iter().map(record_cells).collect();

    let mut widths = COLUMNS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = vec![render_row(&COLUMNS.map(String::from), &widths)];
    lines.extend(rows.iter().map(|row| render_row(row, &widths)));
    lines.push(String::new());
    lines.push(format!(
        "{} user{}",
        records.len(),
        if records.len() == 1 { "" } else { "s" }
    ));
    lines.join("\n")
}

pub fn format_record(record: &UserRecord) -> String {
    COLUMNS
        .iter()
        .zip(record_cells(record))
        .map(|(label, value)| format!("{:<8} {}", format!("{}:", label.to_lowercase()), value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_message(response: &MessageResponse) -> String {
    let mut message = response.message.clone();
    if let Some(first) = message.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    message
}

pub fn format_describe_session_result(result: &DescribeSessionResult) -> String {
    let mirror = if result.mirror_enabled {
        "enabled"
    } else {
        "disabled"
    };
    [
        format!("Daemon PID: {}", result.daemon_pid),
        format!("Listening:  {}", result.bind),
        format!("Users:      {}", result.records),
        format!("Sheets:     {}", mirror),
    ]
    .join("\n")
}

fn record_cells(record: &UserRecord) -> [String; 5] {
    [
        record.name.clone(),
        record.age.to_string(),
        record.commute_method.clone(),
        record.college.clone(),
        record.hobbies.clone(),
    ]
}

fn render_row(cells: &[String; 5], widths: &[usize; 5]) -> String {
    cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
