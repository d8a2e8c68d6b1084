//!
//! src/persistent.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Appends conformed batches to the warehouse table. The warehouse speaks
//! the postgres wire protocol, one connection is opened per invocation
//!

use arrow::array::{Array, AsArray};
use arrow::datatypes::Int64Type;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use tracing::debug;

use crate::config::WarehouseConfig;
use crate::errors::LoaderError;
use crate::schema::{ColumnKind, TableSchema};
use crate::secrets::WarehouseCredentials;

/// Postgres caps bind parameters per statement at u16::MAX
const MAX_BIND_PARAMS: usize = 65_535;

#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn open(&self, credentials: &WarehouseCredentials) ->
        Result<Box<dyn WarehouseSession>, LoaderError>;
}

#[async_trait]
pub trait WarehouseSession: Send {
    /// Appends every row of `batch`, returns the number of rows written
    async fn append(&mut self, schema: &TableSchema, batch: &RecordBatch) ->
        Result<u64, LoaderError>;
}

/// One typed value of a row bound into the insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(Option<String>),
    BigInt(Option<i64>)
}

/// Row major view of a conformed batch
pub fn batch_rows(schema: &TableSchema, batch: &RecordBatch) ->
    Result<Vec<Vec<Cell>>, LoaderError> {
    let mut rows = vec![Vec::with_capacity(schema.columns.len()); batch.num_rows()];

    for (spec, column) in schema.columns.iter().zip(batch.columns()) {
        match spec.kind {
            ColumnKind::Text => {
                let values = column.as_string_opt::<i32>()
                    .ok_or_else(|| LoaderError::Append(
                        format!("column {} is not text", spec.name)
                    ))?;
                for (row, cells) in rows.iter_mut().enumerate() {
                    let value = (!values.is_null(row)).then(|| values.value(row).to_string());
                    cells.push(Cell::Text(value));
                }
            }
            ColumnKind::BigInt => {
                let values = column.as_primitive_opt::<Int64Type>()
                    .ok_or_else(|| LoaderError::Append(
                        format!("column {} is not bigint", spec.name)
                    ))?;
                for (row, cells) in rows.iter_mut().enumerate() {
                    let value = (!values.is_null(row)).then(|| values.value(row));
                    cells.push(Cell::BigInt(value));
                }
            }
        }
    }

    Ok(rows)
}

/// "public.Spotify" -> "public"."Spotify"
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Multi row INSERT for one chunk of rows
pub fn insert_statement<'a>(table: &str, schema: &TableSchema, rows: &'a [Vec<Cell>]) ->
    QueryBuilder<'a, Postgres> {
    let columns = schema.column_names()
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ");

    let mut builder = QueryBuilder::new(
        format!("INSERT INTO {} ({columns}) ", quote_ident(table))
    );
    builder.push_values(rows, |mut values, row| {
        for cell in row {
            match cell {
                Cell::Text(v)   => { values.push_bind(v.clone()); }
                Cell::BigInt(v) => { values.push_bind(*v); }
            }
        }
    });
    builder
}

/// Rows per statement so that binds stay under the protocol limit
pub fn rows_per_statement(schema: &TableSchema) -> usize {
    (MAX_BIND_PARAMS / schema.columns.len().max(1)).max(1)
}

pub struct PgWarehouse {
    cfg: WarehouseConfig
}

impl PgWarehouse {
    pub fn new(cfg: &WarehouseConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    fn connect_options(&self, credentials: &WarehouseCredentials) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.cfg.host())
            .port(self.cfg.port)
            .database(&self.cfg.database)
            .username(&credentials.username)
            .password(&credentials.password)
            .ssl_mode(PgSslMode::Require)
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn open(&self, credentials: &WarehouseCredentials) ->
        Result<Box<dyn WarehouseSession>, LoaderError> {
        let options = self.connect_options(credentials);
        let conn = tokio::time::timeout(
            self.cfg.connect_timeout,
            PgConnection::connect_with(&options)
        )
        .await
        .map_err(|_| LoaderError::Append(format!(
            "connect to {} timed out", self.cfg.host()
        )))??;

        debug!(host = %self.cfg.host(), database = %self.cfg.database, "warehouse.open");
        Ok(Box::new(PgSession { conn, table: self.cfg.table.clone() }))
    }
}

pub struct PgSession {
    conn: PgConnection,
    table: String
}

#[async_trait]
impl WarehouseSession for PgSession {
    async fn append(&mut self, schema: &TableSchema, batch: &RecordBatch) ->
        Result<u64, LoaderError> {
        let rows = batch_rows(schema, batch)?;
        let mut written = 0;

        for chunk in rows.chunks(rows_per_statement(schema)) {
            let mut statement = insert_statement(&self.table, schema, chunk);
            let result = statement.build().execute(&mut self.conn).await?;
            written += result.rows_affected();
        }

        debug!(table = %self.table, rows = written, "warehouse.append");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TRACKS_V1;
    use crate::schema::tests::staged_batch;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("Spotify"), "\"Spotify\"");
        assert_eq!(quote_ident("public.Spotify"), "\"public\".\"Spotify\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn rows_follow_table_order() {
        let batch = TRACKS_V1.conform(&staged_batch()).unwrap();
        let rows = batch_rows(&TRACKS_V1, &batch).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![
            Cell::Text(Some("t1".to_string())),
            Cell::Text(Some("Tame Impala".to_string())),
            Cell::Text(Some("Breathe Deeper".to_string())),
            Cell::BigInt(Some(71)),
            Cell::Text(Some("The Slow Rush".to_string())),
            Cell::BigInt(Some(372)),
            Cell::Text(Some("2020-02-14".to_string())),
        ]);
    }

    #[test]
    fn unconformed_batch_is_rejected() {
        // plays is still Int32 before conform
        let err = batch_rows(&TRACKS_V1, &staged_batch()).unwrap_err();
        assert!(matches!(err, LoaderError::Append(_)));
    }

    #[test]
    fn insert_lists_columns_and_binds_every_cell() {
        let batch = TRACKS_V1.conform(&staged_batch()).unwrap();
        let rows = batch_rows(&TRACKS_V1, &batch).unwrap();
        let statement = insert_statement("Spotify", &TRACKS_V1, &rows);
        let sql = statement.sql();

        assert!(sql.starts_with(
            "INSERT INTO \"Spotify\" (\"Id\", \"Artist\", \"Song_Name\", \"Plays\", \
             \"Album\", \"Duration\", \"Release_Date\") VALUES "
        ));
        assert!(sql.contains("$14"));
        assert!(!sql.contains("$15"));
    }

    #[test]
    fn chunking_respects_bind_limit() {
        let per = rows_per_statement(&TRACKS_V1);
        assert_eq!(per, 65_535 / 7);
        assert!(per * TRACKS_V1.columns.len() <= MAX_BIND_PARAMS);
    }
}
