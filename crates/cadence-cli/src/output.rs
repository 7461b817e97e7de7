use cadence_core::validation::ValidationErrors;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Print `rows` under `headers`, padding every column to its widest cell.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{cell:w$}")
            })
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };

    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|&w| "-".repeat(w)).collect());
    for row in rows {
        line(row);
    }
}

/// Shorten `s` to at most `max` characters, marking the cut with `…`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Report the outcome of a local definition check. Fails when `errors` is
/// not empty so the process exits non-zero.
pub fn report_validation(
    what: &str,
    errors: &ValidationErrors,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        print_json(&serde_json::json!({ "valid": errors.is_empty(), "errors": errors }))?;
    } else if errors.is_empty() {
        println!("{what} is valid");
    } else {
        for (field, message) in errors.iter() {
            println!("  {field}: {message}");
        }
    }
    if !errors.is_empty() {
        anyhow::bail!("{what} has {} validation error(s)", errors.len());
    }
    Ok(())
}

pub fn on_off(enabled: bool) -> String {
    if enabled { "on" } else { "off" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer caption", 8), "a longe…");
    }
}
