//!
//! src/schema.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Destination table layout and the columnar side of the loader: decode a
//! staged parquet buffer, then conform it positionally to the table
//!

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::{CastOptions, cast_with_options, concat_batches};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::LoaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    BigInt
}

impl ColumnKind {
    pub fn arrow_type(self) -> DataType {
        match self {
            ColumnKind::Text   => DataType::Utf8,
            ColumnKind::BigInt => DataType::Int64
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind
}

/// Versioned description of the warehouse table. Staged files are matched
/// to it by position, not by name
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub version: u16,
    pub columns: &'static [ColumnSpec]
}

pub const TRACKS_V1: TableSchema = TableSchema {
    version: 1,
    columns: &[
        ColumnSpec { name: "Id",           kind: ColumnKind::Text },
        ColumnSpec { name: "Artist",       kind: ColumnKind::Text },
        ColumnSpec { name: "Song_Name",    kind: ColumnKind::Text },
        ColumnSpec { name: "Plays",        kind: ColumnKind::BigInt },
        ColumnSpec { name: "Album",        kind: ColumnKind::Text },
        ColumnSpec { name: "Duration",     kind: ColumnKind::BigInt },
        ColumnSpec { name: "Release_Date", kind: ColumnKind::Text },
    ]
};

impl TableSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn arrow_schema(&self) -> Schema {
        Schema::new(
            self.columns.iter()
                .map(|c| Field::new(c.name, c.kind.arrow_type(), true))
                .collect::<Vec<_>>()
        )
    }

    /// Renames columns positionally and casts them to the table's kinds.
    /// Column counts must agree; a value that does not fit its kind fails
    /// the whole batch instead of being nulled
    pub fn conform(&self, batch: &RecordBatch) -> Result<RecordBatch, LoaderError> {
        if batch.num_columns() != self.columns.len() {
            return Err(LoaderError::Schema(format!(
                "expected {} columns for table schema v{}, found {} ({:?})",
                self.columns.len(),
                self.version,
                batch.num_columns(),
                batch.schema().fields().iter().map(|f| f.name().as_str()).collect::<Vec<_>>()
            )));
        }

        let options = CastOptions { safe: false, ..Default::default() };
        let columns = self.columns.iter()
            .zip(batch.columns())
            .map(|(spec, column)| {
                cast_with_options(column, &spec.kind.arrow_type(), &options)
                    .map_err(|e| LoaderError::Schema(
                        format!("column {}: {e}", spec.name)
                    ))
            })
            .collect::<Result<Vec<ArrayRef>, _>>()?;

        Ok(RecordBatch::try_new(Arc::new(self.arrow_schema()), columns)?)
    }
}

/// Decodes a whole parquet object into one batch, columns taken from the
/// file metadata
pub fn decode_parquet(data: Bytes) -> Result<RecordBatch, LoaderError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use arrow::array::{AsArray, Int32Array, Int64Array, StringArray};
    use arrow::datatypes::Int64Type;
    use parquet::arrow::ArrowWriter;
    use parquet::file::properties::WriterProperties;

    /// Two tracks laid out the way the staging job writes them
    pub(crate) fn staged_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, true),
            Field::new("artist", DataType::Utf8, true),
            Field::new("song_name", DataType::Utf8, true),
            Field::new("plays", DataType::Int32, true),
            Field::new("album", DataType::Utf8, true),
            Field::new("duration", DataType::Int64, true),
            Field::new("release_date", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(schema, vec![
            Arc::new(StringArray::from(vec!["t1", "t2"])),
            Arc::new(StringArray::from(vec!["Tame Impala", "Men I Trust"])),
            Arc::new(StringArray::from(vec!["Breathe Deeper", "Show Me How"])),
            Arc::new(Int32Array::from(vec![71, 64])),
            Arc::new(StringArray::from(vec!["The Slow Rush", "Oncle Jazz"])),
            Arc::new(Int64Array::from(vec![372, 215])),
            Arc::new(StringArray::from(vec!["2020-02-14", "2019-09-27"])),
        ]).unwrap()
    }

    /// Parquet bytes for `batch`, split in row groups of `group` rows
    pub(crate) fn to_parquet(batch: &RecordBatch, group: usize) -> Bytes {
        let mut buffer = Vec::new();
        let props = WriterProperties::builder()
            .set_max_row_group_size(group)
            .build();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props)).unwrap();
        writer.write(batch).unwrap();
        writer.close().unwrap();
        Bytes::from(buffer)
    }

    #[test]
    fn decode_reads_every_row_group() {
        let batch = staged_batch();
        let decoded = decode_parquet(to_parquet(&batch, 1)).unwrap();

        assert_eq!(decoded.num_rows(), 2);
        assert_eq!(decoded.num_columns(), 7);
        assert_eq!(decoded.schema().field(0).name(), "id");
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = decode_parquet(Bytes::from_static(b"definitely not parquet")).unwrap_err();
        assert!(matches!(err, LoaderError::Decode(_)));
    }

    #[test]
    fn conform_renames_and_casts() {
        let conformed = TRACKS_V1.conform(&staged_batch()).unwrap();

        let names: Vec<_> = conformed.schema().fields().iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, ["Id", "Artist", "Song_Name", "Plays", "Album", "Duration", "Release_Date"]);

        let plays = conformed.column(3).as_primitive::<Int64Type>();
        assert_eq!(plays.values().to_vec(), vec![71, 64]);
        assert_eq!(conformed.column(0).as_string::<i32>().value(1), "t2");
    }

    #[test]
    fn column_count_mismatch_is_schema_error() {
        let batch = staged_batch();
        let narrow = batch.project(&[0, 1, 2]).unwrap();
        assert!(matches!(TRACKS_V1.conform(&narrow), Err(LoaderError::Schema(_))));
    }

    #[test]
    fn uncastable_value_is_schema_error() {
        let batch = staged_batch();
        let mut columns = batch.columns().to_vec();
        columns[3] = Arc::new(StringArray::from(vec!["71", "lots"]));
        let mut fields: Vec<Field> = batch.schema().fields().iter()
            .map(|f| f.as_ref().clone())
            .collect();
        fields[3] = Field::new("plays", DataType::Utf8, true);
        let bad = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();

        match TRACKS_V1.conform(&bad) {
            Err(LoaderError::Schema(msg)) => assert!(msg.contains("Plays")),
            other => panic!("expected schema error, got {other:?}")
        }
    }
}
