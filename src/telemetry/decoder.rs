use crate::telemetry::TelemetryError;
/// One decoded telemetry frame: `fields[0]` is the timestamp, the rest are
/// channel measurements in column order.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedRow {
    fields: Vec<f64>,
}
impl DecodedRow {
    pub fn new(fields: Vec<f64>) -> Self {
        Self { fields }
    }
    pub fn timestamp(&self) -> Option<f64> {
        self.fields.first().copied()
    }
    /// Channel values, without the timestamp.
    pub fn values(&self) -> &[f64] {
        self.fields.get(1..).unwrap_or(&[])
    }
    pub fn fields(&self) -> &[f64] {
        &self.fields
    }
    /// Total field count, timestamp included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
/// Result of decoding a micro-batch of records.
#[derive(Debug, Default)]
pub struct IngestBatch {
    pub rows: Vec<DecodedRow>,
    pub errors: Vec<TelemetryError>,
}
impl IngestBatch {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.errors.is_empty()
    }
}
/// Decode one whitespace-separated record. `inf` and `NaN` are malformed.
///
/// `expected_fields` is the field count established for the session, if any.
/// Decoding never touches session state; establishing the count from the
/// first good row is up to the caller.
pub fn decode(raw: &str, expected_fields: Option<usize>) -> Result<DecodedRow, TelemetryError> {
    let mut fields = Vec::new();
    for (position, token) in raw.split_whitespace().enumerate() {
        let value = token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| TelemetryError::MalformedRecord {
                token: token.to_owned(),
                position,
            })?;
        fields.push(value);
    }
    if fields.is_empty() {
        return Err(TelemetryError::EmptyRecord);
    }
    if let Some(expected) = expected_fields {
        if fields.len() != expected {
            return Err(TelemetryError::SchemaMismatch {
                expected,
                actual: fields.len(),
            });
        }
    }
    Ok(DecodedRow::new(fields))
}
/// Decode every record independently. Blank records are skipped without
/// being reported; bad records are collected while good rows still come back.
/// With no established field count, the first good row sets it for the rest
/// of the batch.
pub fn decode_batch<I, S>(raw_records: I, mut expected_fields: Option<usize>) -> IngestBatch
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut batch = IngestBatch::default();
    for raw in raw_records {
        match decode(raw.as_ref(), expected_fields) {
            Ok(row) => {
                if establishes_schema(&row) {
                    expected_fields.get_or_insert(row.len());
                }
                batch.rows.push(row);
            }
            Err(TelemetryError::EmptyRecord) => {}
            Err(err) => batch.errors.push(err),
        }
    }
    batch
}
// A timestamp with no channel values can't fix the field count.
fn establishes_schema(row: &DecodedRow) -> bool {
    row.len() >= 2
}
/// Decoder for callers that don't own the session (the ingest thread):
/// remembers the field count set by the first good row.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    field_count: Option<usize>,
}
impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }
    /// Pins the field count up front, e.g. from a configured channel count.
    pub fn with_field_count(field_count: usize) -> Self {
        Self {
            field_count: Some(field_count),
        }
    }
    pub fn field_count(&self) -> Option<usize> {
        self.field_count
    }
    pub fn decode(&mut self, raw: &str) -> Result<DecodedRow, TelemetryError> {
        let row = decode(raw, self.field_count)?;
        if establishes_schema(&row) {
            self.field_count.get_or_insert(row.len());
        }
        Ok(row)
    }
    pub fn decode_batch<I, S>(&mut self, raw_records: I) -> IngestBatch
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let batch = decode_batch(raw_records, self.field_count);
        if let Some(first) = batch.rows.iter().find(|row| establishes_schema(row)) {
            self.field_count.get_or_insert(first.len());
        }
        batch
    }
}
