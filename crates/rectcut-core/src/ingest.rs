//! CSV sample ingest.
//!
//! A sample file has a header row naming its columns. Every configured feature must
//! appear as a column; other columns are ignored. The optional weight column
//! defaults every weight to 1 when not configured.

use std::{collections::HashMap, fs::File, io::Read, path::Path};

use csv::StringRecord;

use crate::{
    error::IngestError,
    feature::FeatureTable,
    sample::{Event, Sample},
};

/// Reads a sample from a CSV file.
pub fn read_csv_sample(
    name: &str,
    path: &Path,
    features: &FeatureTable,
    weight_column: Option<&str>,
) -> Result<Sample, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_owned(),
        source,
    })?;
    read_csv(name, path, file, features, weight_column)
}

fn read_csv<R: Read>(
    name: &str,
    path: &Path,
    reader: R,
    features: &FeatureTable,
    weight_column: Option<&str>,
) -> Result<Sample, IngestError> {
    let csv_error = |source| IngestError::Csv {
        path: path.to_owned(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers().map_err(csv_error)?.clone();
    let header_map = build_header_map(&headers);

    let column_index = |column: &str| {
        header_map
            .get(column)
            .copied()
            .ok_or_else(|| IngestError::MissingColumn {
                path: path.to_owned(),
                column: column.to_owned(),
            })
    };
    let feature_columns = features
        .iter()
        .map(|f| column_index(f.name()).map(|idx| (f.name(), idx)))
        .collect::<Result<Vec<_>, _>>()?;
    let weight_index = weight_column
        .map(|column| column_index(column).map(|idx| (column, idx)))
        .transpose()?;

    let mut events = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // header is line 1
        let line = idx + 2;
        let record = record.map_err(csv_error)?;
        let parse = |(column, field): (&str, usize)| {
            let raw = record.get(field).unwrap_or_default();
            raw.parse::<f64>().map_err(|_| IngestError::InvalidValue {
                path: path.to_owned(),
                line,
                column: column.to_owned(),
                value: raw.to_owned(),
            })
        };
        let values = feature_columns
            .iter()
            .copied()
            .map(parse)
            .collect::<Result<Vec<_>, _>>()?;
        let weight = weight_index.map(parse).transpose()?.unwrap_or(1.0);
        events.push(Event::weighted(values, weight));
    }

    tracing::debug!(sample = name, path = %path.display(), events = events.len(), "sample loaded");
    Ok(Sample::from_aligned(name, features.len(), events))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim_start_matches('\u{feff}').to_owned(), idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::feature::{BoundaryType, FeatureSpec};

    fn features() -> FeatureTable {
        FeatureTable::new(vec![
            FeatureSpec::new("hoe", BoundaryType::UpperOnly, 0.95).unwrap(),
            FeatureSpec::new("deta", BoundaryType::TwoSided, 0.95).unwrap(),
        ])
        .unwrap()
    }

    fn read(text: &str, weight: Option<&str>) -> Result<Sample, IngestError> {
        read_csv(
            "signal",
            &PathBuf::from("signal.csv"),
            text.as_bytes(),
            &features(),
            weight,
        )
    }

    #[test]
    fn test_columns_are_matched_by_name() {
        let sample = read("deta, extra, hoe, w\n0.1, x, 0.01, 2\n-0.2, y, 0.03, 0.5\n", Some("w")).unwrap();
        assert_eq!(sample.len(), 2);
        assert_eq!(sample.events()[0].values, vec![0.01, 0.1]);
        assert_eq!(sample.events()[1].weight, 0.5);
    }

    #[test]
    fn test_weight_defaults_to_one() {
        let sample = read("\u{feff}hoe,deta\n1,2\n", None).unwrap();
        assert_eq!(sample.events()[0].weight, 1.0);
    }

    #[test]
    fn test_missing_column() {
        let err = read("hoe\n1\n", None).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { ref column, .. } if column == "deta"));
        let err = read("hoe,deta\n1,2\n", Some("weight")).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { ref column, .. } if column == "weight"));
    }

    #[test]
    fn test_invalid_value_reports_line() {
        let err = read("hoe,deta\n1,2\n1,abc\n", None).unwrap_err();
        assert!(matches!(err, IngestError::InvalidValue { line: 3, ref column, .. } if column == "deta"));
    }
}
