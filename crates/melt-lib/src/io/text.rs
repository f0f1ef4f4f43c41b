use crate::signal::{Sample, Series};
use anyhow::{Context, Result};
use std::path::Path;

/// Parse `time value` pairs, one per line, separated by whitespace, comma or semicolon.
/// Blank lines and `#` comments are skipped.
pub fn parse_sample_pairs(text: &str) -> Result<Series> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|f| !f.is_empty());
        let (time, value) = match (fields.next(), fields.next(), fields.next()) {
            (Some(t), Some(v), None) => (t, v),
            _ => anyhow::bail!(
                "line {} should hold exactly two columns (time value): {}",
                idx + 1,
                trimmed
            ),
        };
        let time: f64 = time
            .parse()
            .with_context(|| format!("line {} time is not f64: {}", idx + 1, time))?;
        let value: f64 = value
            .parse()
            .with_context(|| format!("line {} value is not f64: {}", idx + 1, value))?;
        out.push(Sample::new(time, value));
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(Series::new(out))
}

/// Read a two-column text series from disk.
pub fn read_sample_pairs(path: &Path) -> Result<Series> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_sample_pairs(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_separators_and_comments() {
        let text = "# time temperature\n0 300\n\n1.5,1800.25\n0.5;900\n";
        let series = parse_sample_pairs(text).unwrap();
        let times: Vec<f64> = series.times().collect();
        assert_eq!(times, vec![0.0, 0.5, 1.5]);
        assert_eq!(series.samples()[2].value, 1800.25);
    }

    #[test]
    fn rejects_single_column() {
        let err = parse_sample_pairs("1.0\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_sample_pairs("# only a comment\n").is_err());
    }
}
