//! Row accumulator trait and the generic flush loop that feeds table writers

use arrow::array::RecordBatch;
use arrow::error::ArrowError;

/// Rows buffered per `RecordBatch`.
pub const RECORD_BATCH_SIZE: usize = 8192;

/// Column-wise buffer turning typed rows into Arrow `RecordBatch`es.
pub trait Accumulator {
    type Row;

    fn push(&mut self, row: Self::Row);

    /// Number of rows currently buffered
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() >= RECORD_BATCH_SIZE
    }

    /// Take buffered rows as a RecordBatch, resetting internal state
    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError>;
}

/// Push every row through `acc`, handing each full (and the final partial)
/// batch to `write`. Returns the number of rows pushed.
pub fn write_rows<A, I>(
    acc: &mut A,
    rows: I,
    mut write: impl FnMut(&RecordBatch) -> std::io::Result<()>,
) -> std::io::Result<usize>
where
    A: Accumulator,
    I: IntoIterator<Item = A::Row>,
{
    let mut pushed = 0usize;
    for row in rows {
        acc.push(row);
        pushed += 1;
        if acc.is_full() {
            write(&acc.take_batch().map_err(std::io::Error::other)?)?;
        }
    }
    if !acc.is_empty() {
        write(&acc.take_batch().map_err(std::io::Error::other)?)?;
    }
    Ok(pushed)
}
