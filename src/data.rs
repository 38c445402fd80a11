use polars::prelude::*;
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("Could not read CSV preview: {0}")]
    Csv(#[from] PolarsError),
}

/// First rows of a selected CSV, rendered to strings for the preview table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreviewTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PreviewTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Parses at most `max_rows` rows of `contents` locally.
///
/// Display only: the backend remains the authority on whether a dataset is
/// valid, so a failed preview never blocks an upload.
pub fn preview_csv(
    contents: &[u8],
    max_rows: usize,
    infer_schema_length: usize,
) -> Result<PreviewTable, PreviewError> {
    let df = CsvReader::new(Cursor::new(contents))
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_n_rows(Some(max_rows))
                .with_infer_schema_length(Some(infer_schema_length))
                .with_ignore_errors(true),
        )
        .finish()?;

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows = (0..df.height())
        .map(|row_idx| {
            df.get_columns()
                .iter()
                .map(|column| match column.get(row_idx) {
                    Ok(AnyValue::String(s)) => s.to_string(),
                    Ok(AnyValue::StringOwned(s)) => s.to_string(),
                    Ok(AnyValue::Null) | Err(_) => String::new(),
                    Ok(other) => other.to_string(),
                })
                .collect()
        })
        .collect();

    Ok(PreviewTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_reads_header_and_limited_rows() {
        let csv = b"loc,module,defects\n120,parser,1\n45,lexer,0\n300,codegen,1\n";
        let table = preview_csv(csv, 2, 100).unwrap();
        assert_eq!(table.columns, vec!["loc", "module", "defects"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["120".to_string(), "parser".to_string(), "1".to_string()],
                vec!["45".to_string(), "lexer".to_string(), "0".to_string()],
            ]
        );
    }

    #[test]
    fn missing_values_render_empty() {
        let csv = b"a,b\n1,\n";
        let table = preview_csv(csv, 10, 100).unwrap();
        assert_eq!(table.rows, vec![vec!["1".to_string(), String::new()]]);
    }
}
