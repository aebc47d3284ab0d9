//! Tabular dataset module
//!
//! A narrow table abstraction backed by a single Arrow `RecordBatch`. The
//! transformations only ever talk to this type, so they run unchanged
//! against small in-memory fixtures and full-size inputs.
//!
//! Relational operations (projection, filters, distinct-on and joins) are
//! planned and executed by DataFusion. Each call registers its input in a
//! fresh `SessionContext` and collects the result back into one batch.
//!
//! # Overview
//!
//! - `Dataset` - immutable table; every operation returns a new one
//! - `JoinKind` - inner, left-outer or right-outer
//! - `JoinOn` - join on shared column names or on explicit column pairs

use crate::error::{Error, Result};
use arrow::array::{ArrayRef, UInt64Array};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use datafusion::common::{Column, JoinType};
use datafusion::logical_expr::{ident, lit, Expr};
use datafusion::prelude::{DataFrame, SessionConfig, SessionContext};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

/// Row position column used to restore input order after a plan
const ROW_INDEX: &str = "__row_index";

/// Join inputs are registered under these table names
const LEFT: &str = "l";
const RIGHT: &str = "r";
const LEFT_ROW: &str = "__left_row";
const RIGHT_ROW: &str = "__right_row";

/// How unmatched rows are treated by [`Dataset::join`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Keep only matched rows
    Inner,
    /// Keep every row of the left side, padding the right with nulls
    Left,
    /// Keep every row of the right side, padding the left with nulls
    Right,
}

impl JoinKind {
    fn join_type(self) -> JoinType {
        match self {
            JoinKind::Inner => JoinType::Inner,
            JoinKind::Left => JoinType::Left,
            JoinKind::Right => JoinType::Right,
        }
    }
}

/// Join condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOn {
    /// Equality on columns that share a name on both sides.
    /// The key columns appear once in the result.
    Using(Vec<String>),
    /// Equality on `(left, right)` column pairs, combined with AND.
    /// Both sides keep all their columns.
    Columns(Vec<(String, String)>),
}

impl JoinOn {
    /// Join on shared column names
    pub fn using(columns: &[&str]) -> Self {
        Self::Using(columns.iter().map(|c| (*c).to_string()).collect())
    }

    /// Join on explicit `(left, right)` column pairs
    pub fn columns(pairs: &[(&str, &str)]) -> Self {
        Self::Columns(
            pairs
                .iter()
                .map(|(l, r)| ((*l).to_string(), (*r).to_string()))
                .collect(),
        )
    }

    fn key_pairs(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Using(cols) => cols.iter().map(|c| (c.as_str(), c.as_str())).collect(),
            Self::Columns(pairs) => pairs.iter().map(|(l, r)| (l.as_str(), r.as_str())).collect(),
        }
    }
}

/// An immutable in-memory table
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    /// Wrap a record batch
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// An empty dataset with the given schema
    pub fn empty(schema: SchemaRef) -> Self {
        Self::new(RecordBatch::new_empty(schema))
    }

    /// Concatenate batches sharing one schema into a single dataset
    pub fn from_batches(schema: SchemaRef, batches: &[RecordBatch]) -> Result<Self> {
        Ok(Self::new(concat_batches(&schema, batches)?))
    }

    /// Schema of the dataset
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Underlying record batch
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Consume into the underlying record batch
    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    /// Position of a column
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.batch
            .schema()
            .index_of(name)
            .map_err(|_| Error::column_not_found(name))
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Result<&ArrayRef> {
        Ok(self.batch.column(self.index_of(name)?))
    }

    /// Select columns by name, in the given order
    pub async fn project(&self, columns: &[&str]) -> Result<Self> {
        self.check_columns(columns)?;
        let frame = self.frame()?.select(columns.iter().map(|c| ident(*c)).collect())?;
        collect(frame).await
    }

    /// Keep rows whose string column equals `value`
    pub async fn filter_eq(&self, column: &str, value: &str) -> Result<Self> {
        self.index_of(column)?;
        let frame = self.frame()?.filter(ident(column).eq(lit(value)))?;
        collect(frame).await
    }

    /// Drop rows where any of the given columns is null
    pub async fn drop_nulls(&self, columns: &[&str]) -> Result<Self> {
        self.check_columns(columns)?;
        let Some(predicate) = columns
            .iter()
            .map(|c| ident(*c).is_not_null())
            .reduce(Expr::and)
        else {
            return Ok(self.clone());
        };
        collect(self.frame()?.filter(predicate)?).await
    }

    /// Keep one row per distinct key.
    ///
    /// The first occurrence in current row order survives. Null is an
    /// ordinary key value, so at most one null-key row is kept.
    pub async fn dedup_by(&self, keys: &[&str]) -> Result<Self> {
        self.check_columns(keys)?;
        let names = self.column_names();

        let on: Vec<Expr> = keys.iter().map(|k| ident(*k)).collect();
        let mut select: Vec<Expr> = names.iter().map(|n| ident(n.as_str())).collect();
        select.push(ident(ROW_INDEX));
        let mut order: Vec<_> = on.iter().map(|e| e.clone().sort(true, false)).collect();
        order.push(ident(ROW_INDEX).sort(true, false));

        let frame = session()
            .read_batch(self.with_row_index(ROW_INDEX)?)?
            .distinct_on(on, select, Some(order))?
            .sort(vec![ident(ROW_INDEX).sort(true, false)])?
            .select(names.iter().map(|n| ident(n.as_str())).collect())?;
        collect(frame).await
    }

    /// Rename a column
    pub fn rename(&self, from: &str, to: &str) -> Result<Self> {
        let idx = self.index_of(from)?;
        if from != to && self.batch.schema().index_of(to).is_ok() {
            return Err(Error::DuplicateColumn {
                column: to.to_string(),
            });
        }

        let schema = self.batch.schema();
        let fields: Vec<Field> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| {
                if i == idx {
                    f.as_ref().clone().with_name(to)
                } else {
                    f.as_ref().clone()
                }
            })
            .collect();
        let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
        Ok(Self::new(RecordBatch::try_new(
            schema,
            self.batch.columns().to_vec(),
        )?))
    }

    /// Add a column, or replace an existing one of the same name in place
    pub fn with_column(&self, name: &str, array: ArrayRef) -> Result<Self> {
        let schema = self.batch.schema();
        let field = Field::new(name, array.data_type().clone(), true);
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let mut columns = self.batch.columns().to_vec();

        match schema.index_of(name) {
            Ok(idx) => {
                fields[idx] = field;
                columns[idx] = array;
            }
            Err(_) => {
                fields.push(field);
                columns.push(array);
            }
        }

        Ok(Self::new(RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            columns,
        )?))
    }

    /// Join with another dataset. See [`JoinKind`] and [`JoinOn`].
    ///
    /// Null keys never match. One-to-many matches produce one output row
    /// per matching pair. Rows come out in the order of the preserved side
    /// (the left side for inner joins).
    pub async fn join(&self, other: &Dataset, on: &JoinOn, kind: JoinKind) -> Result<Self> {
        for (l, r) in on.key_pairs() {
            let (lt, rt) = (self.column(l)?.data_type(), other.column(r)?.data_type());
            if lt != rt {
                return Err(ArrowError::InvalidArgumentError(format!(
                    "join key type mismatch: {l} is {lt:?}, {r} is {rt:?}"
                ))
                .into());
            }
        }

        let outputs = self.join_outputs(other, on, kind);
        let mut seen = HashSet::with_capacity(outputs.len());
        for (_, name) in &outputs {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateColumn {
                    column: name.clone(),
                });
            }
        }

        let ctx = session();
        ctx.register_batch(LEFT, self.with_row_index(LEFT_ROW)?)?;
        ctx.register_batch(RIGHT, other.with_row_index(RIGHT_ROW)?)?;
        let left = ctx.table(LEFT).await?;
        let right = ctx.table(RIGHT).await?;

        let condition: Vec<Expr> = on
            .key_pairs()
            .into_iter()
            .map(|(l, r)| qualified(LEFT, l).eq(qualified(RIGHT, r)))
            .collect();
        let (preserved, matched) = if kind == JoinKind::Right {
            (qualified(RIGHT, RIGHT_ROW), qualified(LEFT, LEFT_ROW))
        } else {
            (qualified(LEFT, LEFT_ROW), qualified(RIGHT, RIGHT_ROW))
        };

        let frame = left
            .join_on(right, kind.join_type(), condition)?
            .sort(vec![preserved.sort(true, false), matched.sort(true, false)])?
            .select(
                outputs
                    .into_iter()
                    .map(|(side, name)| qualified(side, &name).alias(name))
                    .collect(),
            )?;
        collect(frame).await
    }

    /// Render the schema as an indented tree
    pub fn schema_tree(&self) -> String {
        let mut out = String::from("root\n");
        for field in self.batch.schema().fields() {
            let _ = writeln!(
                out,
                " |-- {}: {} (nullable = {})",
                field.name(),
                type_name(field.data_type()),
                field.is_nullable()
            );
        }
        out
    }

    fn check_columns(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.index_of(name)?;
        }
        Ok(())
    }

    fn frame(&self) -> Result<DataFrame> {
        Ok(session().read_batch(self.batch.clone())?)
    }

    /// The batch plus a trailing `UInt64` row position column
    fn with_row_index(&self, name: &str) -> Result<RecordBatch> {
        let rows = u64::try_from(self.num_rows()).map_err(|_| {
            Error::Other(format!("{} rows exceed the row index range", self.num_rows()))
        })?;
        let index: ArrayRef = Arc::new(UInt64Array::from_iter_values(0..rows));
        Ok(self.with_column(name, index)?.into_batch())
    }

    /// Source side and name of every join output column, in output order.
    /// `Using` keys come once, from the side whose rows are all kept.
    fn join_outputs(
        &self,
        other: &Dataset,
        on: &JoinOn,
        kind: JoinKind,
    ) -> Vec<(&'static str, String)> {
        let sides = [(LEFT, self.column_names()), (RIGHT, other.column_names())];
        match on {
            JoinOn::Using(keys) => {
                let key_side = if kind == JoinKind::Right { RIGHT } else { LEFT };
                let mut outputs: Vec<_> = keys.iter().map(|k| (key_side, k.clone())).collect();
                for (side, names) in sides {
                    outputs.extend(
                        names
                            .into_iter()
                            .filter(|n| !keys.contains(n))
                            .map(|n| (side, n)),
                    );
                }
                outputs
            }
            JoinOn::Columns(_) => sides
                .into_iter()
                .flat_map(|(side, names)| names.into_iter().map(move |n| (side, n)))
                .collect(),
        }
    }
}

/// Execution context for one operation
fn session() -> SessionContext {
    SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1))
}

fn qualified(table: &str, name: &str) -> Expr {
    Expr::Column(Column::new(Some(table), name))
}

/// Run a plan and gather its output into one dataset
async fn collect(frame: DataFrame) -> Result<Dataset> {
    let planned = Arc::clone(frame.schema().inner());
    let batches = frame.collect().await?;
    let schema = batches.first().map_or(planned, RecordBatch::schema);
    Dataset::from_batches(schema, &batches)
}

fn type_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 => "string".to_string(),
        DataType::Int64 => "long".to_string(),
        DataType::Int32 => "integer".to_string(),
        DataType::Float64 => "double".to_string(),
        DataType::Boolean => "boolean".to_string(),
        DataType::Timestamp(TimeUnit::Millisecond, _) => "timestamp".to_string(),
        other => format!("{other:?}").to_lowercase(),
    }
}
