use crate::{
    detectors::crossing::{is_above, Interval},
    signal::{Sample, Series},
};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Read a time/value series from a headed CSV file. Column lookup is case-insensitive.
pub fn read_series_csv(path: &Path, time_col: &str, value_col: &str) -> Result<Series> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_series_from(file, time_col, value_col)
        .with_context(|| format!("reading series from {}", path.display()))
}

pub fn read_series_from<R: std::io::Read>(
    reader: R,
    time_col: &str,
    value_col: &str,
) -> Result<Series> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers().context("reading header")?.clone();
    let time_idx = locate_column(&headers, time_col, "time")?;
    let value_idx = locate_column(&headers, value_col, "value")?;

    let mut samples = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.context("reading record")?;
        let time = parse_field(&record, time_idx, row, "time")?;
        let value = parse_field(&record, value_idx, row, "value")?;
        samples.push(Sample::new(time, value));
    }
    if samples.is_empty() {
        anyhow::bail!("no samples found");
    }
    Ok(Series::new(samples))
}

fn parse_field(record: &StringRecord, idx: usize, row: usize, hint: &str) -> Result<f64> {
    let raw = record
        .get(idx)
        .ok_or_else(|| anyhow::anyhow!("row {} is missing the {} column", row + 1, hint))?;
    raw.parse::<f64>()
        .with_context(|| format!("row {} {} is not f64: {}", row + 1, hint, raw))
}

pub(crate) fn locate_column(headers: &StringRecord, requested: &str, hint: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow::anyhow!("missing {} column ({})", hint, requested))
}

/// Write every sample with its above-threshold flag.
pub fn write_samples_csv(path: &Path, series: &Series, threshold: f64) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_samples(file, series, threshold)
}

pub fn write_samples<W: Write>(out: W, series: &Series, threshold: f64) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(out);
    writer.write_record(["time", "value", "above_threshold"])?;
    for Sample { time, value } in series.samples() {
        writer.write_record(&[
            time.to_string(),
            value.to_string(),
            is_above(*value, threshold).to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one row per above-threshold interval.
pub fn write_intervals_csv(path: &Path, intervals: &[Interval]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_intervals(file, intervals)
}

pub fn write_intervals<W: Write>(out: W, intervals: &[Interval]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(out);
    writer.write_record(["spike_number", "start_time", "end_time", "duration"])?;
    for iv in intervals {
        writer.write_record(&[
            iv.sequence_number.to_string(),
            iv.start_time.to_string(),
            iv.end_time.to_string(),
            iv.duration.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn reads_history_fixture() {
        let series = read_series_csv(
            &sample_path("test_data/melt_history.csv"),
            "time_ms",
            "temperature_K",
        )
        .expect("read fixture");
        assert_eq!(series.len(), 9);
        assert_eq!(series.samples()[0].time, 0.0);
    }

    #[test]
    fn column_lookup_ignores_case() {
        let data = "Time, Value\n1, 10\n0, 5\n";
        let series = read_series_from(data.as_bytes(), "time", "VALUE").unwrap();
        assert_eq!(series.samples()[0], Sample::new(0.0, 5.0));
    }

    #[test]
    fn missing_column_is_named() {
        let err = read_series_from("t,v\n0,1\n".as_bytes(), "time", "v").unwrap_err();
        assert!(err.to_string().contains("time"));
    }

    #[test]
    fn writes_flagged_samples() {
        let series = Series::from_pairs(&[(0.0, 1000.0), (1.0, 1000.5)]);
        let mut buf = Vec::new();
        write_samples(&mut buf, &series, 1000.0).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "time,value,above_threshold\n0,1000,false\n1,1000.5,true\n");
    }

    #[test]
    fn writes_interval_rows() {
        let intervals = [Interval {
            start_time: 0.5,
            end_time: 1.5,
            duration: 1.0,
            sequence_number: 1,
        }];
        let mut buf = Vec::new();
        write_intervals(&mut buf, &intervals).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "spike_number,start_time,end_time,duration\n1,0.5,1.5,1\n"
        );
    }

    fn sample_path(relative: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .and_then(|p| p.parent())
            .expect("workspace root")
            .join(relative)
    }
}
