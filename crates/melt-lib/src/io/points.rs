use crate::sampling::PointTable;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// Position column triples tried in order when reading a point table.
pub const POSITION_COLUMNS: [[&str; 3]; 3] = [
    ["Points:0", "Points:1", "Points:2"],
    ["x", "y", "z"],
    ["coordsX", "coordsY", "coordsZ"],
];

/// Load a point-data table exported as CSV (ParaView "Save Data" layout or plain x,y,z).
/// Every column other than the position triple is read as a named scalar field.
pub fn read_point_table(path: &Path) -> Result<PointTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_point_table_from(file).with_context(|| format!("reading point table {}", path.display()))
}

pub fn read_point_table_from<R: std::io::Read>(reader: R) -> Result<PointTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers().context("reading header")?.clone();
    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let position = POSITION_COLUMNS
        .iter()
        .find_map(|triple| match (find(triple[0]), find(triple[1]), find(triple[2])) {
            (Some(x), Some(y), Some(z)) => Some([x, y, z]),
            _ => None,
        })
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no position columns found; expected one of {:?}",
                POSITION_COLUMNS
            )
        })?;
    let field_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| !position.contains(i))
        .map(|(i, name)| (i, name.to_string()))
        .collect();

    let mut table = PointTable::new(field_columns.iter().map(|(_, n)| n.clone()).collect());
    for (row, result) in reader.records().enumerate() {
        let record = result.context("reading record")?;
        let parse = |idx: usize| -> Result<f64> {
            let raw = record.get(idx).unwrap_or("");
            raw.parse::<f64>()
                .with_context(|| format!("row {} column {} is not f64: {:?}", row + 1, idx + 1, raw))
        };
        let point = [parse(position[0])?, parse(position[1])?, parse(position[2])?];
        let values = field_columns
            .iter()
            .map(|(idx, _)| parse(*idx))
            .collect::<Result<Vec<f64>>>()?;
        table.push(point, &values);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::FieldSource;

    #[test]
    fn reads_paraview_layout() {
        let data = "\"T\",\"meltHistory\",\"Points:0\",\"Points:1\",\"Points:2\"\n\
                    300,0,0,0,0\n\
                    1800,2,0.001,0,0\n";
        let table = read_point_table_from(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.field_names(), ["T", "meltHistory"]);
        assert_eq!(table.point(1), Some([0.001, 0.0, 0.0]));
        assert_eq!(table.field("T").map(|v| v.to_vec()), Some(vec![300.0, 1800.0]));
    }

    #[test]
    fn falls_back_to_xyz_columns() {
        let data = "x,y,z,temp\n0,0,0,1\n";
        let table = read_point_table_from(data.as_bytes()).unwrap();
        assert_eq!(table.field_names(), ["temp"]);
    }

    #[test]
    fn rejects_table_without_positions() {
        let err = read_point_table_from("a,b\n1,2\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("position"));
    }
}
