//! Fortran unformatted sequential record framing.
//!
//! Every record is laid out as `[len: i32][payload: len bytes][len: i32]`, all
//! little-endian. Negative markers (gfortran sub-records) are rejected.

const MARKER_WIDTH: usize = std::mem::size_of::<i32>();

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record {record}: truncated length marker at byte {offset}")]
    TruncatedMarker { record: usize, offset: usize },
    #[error("record {record}: negative length marker {marker}")]
    NegativeLength { record: usize, marker: i32 },
    #[error("record {record}: declares {declared} payload bytes but only {available} remain")]
    TruncatedPayload {
        record: usize,
        declared: usize,
        available: usize,
    },
    #[error("record {record}: leading marker {leading} != trailing marker {trailing}")]
    MarkerMismatch {
        record: usize,
        leading: i32,
        trailing: i32,
    },
    #[error("record {record}: reading {field} needs {needed} bytes but only {remaining} remain in payload")]
    Overrun {
        record: usize,
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("record {record}: declared length {declared} but {consumed} bytes were consumed")]
    UnconsumedPayload {
        record: usize,
        declared: usize,
        consumed: usize,
    },
    #[error("record {record}: payload of {length} bytes is not a whole number of {width}-byte values")]
    RaggedPayload {
        record: usize,
        length: usize,
        width: usize,
    },
    #[error("payload of {length} bytes does not fit in a 32-bit length marker")]
    Oversized { length: usize },
}

impl RecordError {
    pub fn record(&self) -> Option<usize> {
        match self {
            Self::TruncatedMarker { record, .. }
            | Self::NegativeLength { record, .. }
            | Self::TruncatedPayload { record, .. }
            | Self::MarkerMismatch { record, .. }
            | Self::Overrun { record, .. }
            | Self::UnconsumedPayload { record, .. }
            | Self::RaggedPayload { record, .. } => Some(*record),
            Self::Oversized { .. } => None,
        }
    }
}

/// Walks the records of one file buffer in order. Record indices are 1-based.
#[derive(Debug)]
pub struct SequentialRecordReader<'a> {
    bytes: &'a [u8],
    offset: usize,
    records_read: usize,
}

impl<'a> SequentialRecordReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            records_read: 0,
        }
    }

    pub fn records_read(&self) -> usize {
        self.records_read
    }

    pub fn remaining_bytes(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_bytes() == 0
    }

    pub fn next_record(&mut self) -> Result<Record<'a>, RecordError> {
        let record = self.records_read + 1;
        let mut offset = self.offset;

        let leading = take_i32(self.bytes, &mut offset)
            .ok_or(RecordError::TruncatedMarker { record, offset })?;
        if leading < 0 {
            return Err(RecordError::NegativeLength {
                record,
                marker: leading,
            });
        }

        let declared = leading as usize;
        let available = self.bytes.len() - offset;
        if declared > available {
            return Err(RecordError::TruncatedPayload {
                record,
                declared,
                available,
            });
        }
        let payload = &self.bytes[offset..offset + declared];
        offset += declared;

        let trailing = take_i32(self.bytes, &mut offset)
            .ok_or(RecordError::TruncatedMarker { record, offset })?;
        if trailing != leading {
            return Err(RecordError::MarkerMismatch {
                record,
                leading,
                trailing,
            });
        }

        self.offset = offset;
        self.records_read = record;
        Ok(Record {
            index: record,
            payload,
            cursor: 0,
        })
    }
}

/// A single framed payload with a typed read cursor.
#[derive(Debug)]
pub struct Record<'a> {
    index: usize,
    payload: &'a [u8],
    cursor: usize,
}

impl<'a> Record<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.payload.len() - self.cursor
    }

    pub fn take_i32(&mut self, field: &'static str) -> Result<i32, RecordError> {
        let needed = std::mem::size_of::<i32>();
        let remaining = self.remaining();
        take_i32(self.payload, &mut self.cursor).ok_or(RecordError::Overrun {
            record: self.index,
            field,
            needed,
            remaining,
        })
    }

    pub fn take_f64(&mut self, field: &'static str) -> Result<f64, RecordError> {
        let needed = std::mem::size_of::<f64>();
        let remaining = self.remaining();
        take_f64(self.payload, &mut self.cursor).ok_or(RecordError::Overrun {
            record: self.index,
            field,
            needed,
            remaining,
        })
    }

    /// Reads exactly `count` integers; the count always comes from an earlier field.
    pub fn take_i32_array(
        &mut self,
        count: usize,
        field: &'static str,
    ) -> Result<Vec<i32>, RecordError> {
        let needed = count.saturating_mul(std::mem::size_of::<i32>());
        if needed > self.remaining() {
            return Err(RecordError::Overrun {
                record: self.index,
                field,
                needed,
                remaining: self.remaining(),
            });
        }
        (0..count).map(|_| self.take_i32(field)).collect()
    }

    /// Fails unless every declared payload byte has been consumed.
    pub fn finish(self) -> Result<(), RecordError> {
        if self.cursor != self.payload.len() {
            return Err(RecordError::UnconsumedPayload {
                record: self.index,
                declared: self.payload.len(),
                consumed: self.cursor,
            });
        }
        Ok(())
    }

    /// Interprets the whole payload as a flat array of reals.
    pub fn into_f64_array(self) -> Result<Vec<f64>, RecordError> {
        let width = std::mem::size_of::<f64>();
        if self.cursor != 0 || self.payload.len() % width != 0 {
            return Err(RecordError::RaggedPayload {
                record: self.index,
                length: self.payload.len() - self.cursor,
                width,
            });
        }

        Ok(self
            .payload
            .chunks_exact(width)
            .map(|chunk| {
                let mut raw = [0_u8; 8];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect())
    }
}

/// Payload under construction for [`SequentialRecordWriter`].
#[derive(Debug, Clone, Default)]
pub struct RecordPayload {
    bytes: Vec<u8>,
}

impl RecordPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_i32(&mut self, value: i32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_f64(&mut self, value: f64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_i32_slice(&mut self, values: &[i32]) -> &mut Self {
        for value in values {
            self.put_i32(*value);
        }
        self
    }

    pub fn put_f64_slice(&mut self, values: &[f64]) -> &mut Self {
        for value in values {
            self.put_f64(*value);
        }
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Debug, Clone, Default)]
pub struct SequentialRecordWriter {
    bytes: Vec<u8>,
}

impl SequentialRecordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_record(&mut self, payload: &RecordPayload) -> Result<(), RecordError> {
        self.push_raw(payload.as_bytes())
    }

    pub fn push_raw(&mut self, payload: &[u8]) -> Result<(), RecordError> {
        let marker = i32::try_from(payload.len()).map_err(|_| RecordError::Oversized {
            length: payload.len(),
        })?;
        self.bytes.extend_from_slice(&marker.to_le_bytes());
        self.bytes.extend_from_slice(payload);
        self.bytes.extend_from_slice(&marker.to_le_bytes());
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn take_i32(bytes: &[u8], offset: &mut usize) -> Option<i32> {
    let end = offset.checked_add(MARKER_WIDTH)?;
    let slice = bytes.get(*offset..end)?;
    let value = i32::from_le_bytes(slice.try_into().ok()?);
    *offset = end;
    Some(value)
}

fn take_f64(bytes: &[u8], offset: &mut usize) -> Option<f64> {
    let end = offset.checked_add(std::mem::size_of::<f64>())?;
    let slice = bytes.get(*offset..end)?;
    let value = f64::from_le_bytes(slice.try_into().ok()?);
    *offset = end;
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::{RecordError, RecordPayload, SequentialRecordReader, SequentialRecordWriter};

    fn framed(payload: &RecordPayload) -> Vec<u8> {
        let mut writer = SequentialRecordWriter::new();
        writer.push_record(payload).expect("payload should fit");
        writer.into_bytes()
    }

    #[test]
    fn reader_walks_consecutive_records() {
        let mut writer = SequentialRecordWriter::new();
        let mut header = RecordPayload::new();
        header.put_i32(7).put_f64(1.5);
        writer.push_record(&header).expect("header record");
        let mut reals = RecordPayload::new();
        reals.put_f64_slice(&[0.25, -3.0]);
        writer.push_record(&reals).expect("reals record");
        let bytes = writer.into_bytes();

        assert_eq!(bytes.len(), 4 + 12 + 4 + 4 + 16 + 4);

        let mut reader = SequentialRecordReader::new(&bytes);
        let mut first = reader.next_record().expect("first record");
        assert_eq!(first.index(), 1);
        assert_eq!(first.take_i32("n").expect("i32"), 7);
        assert_eq!(first.take_f64("t").expect("f64"), 1.5);
        first.finish().expect("fully consumed");

        let second = reader.next_record().expect("second record");
        assert_eq!(second.into_f64_array().expect("reals"), vec![0.25, -3.0]);
        assert!(reader.is_exhausted());
        assert_eq!(reader.records_read(), 2);
    }

    #[test]
    fn mismatched_trailing_marker_is_rejected() {
        let mut payload = RecordPayload::new();
        payload.put_f64(1.0);
        let mut bytes = framed(&payload);
        let trailing = bytes.len() - 4;
        bytes[trailing..].copy_from_slice(&9_i32.to_le_bytes());

        let error = SequentialRecordReader::new(&bytes)
            .next_record()
            .expect_err("framing mismatch should fail");
        assert_eq!(
            error,
            RecordError::MarkerMismatch {
                record: 1,
                leading: 8,
                trailing: 9
            }
        );
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut payload = RecordPayload::new();
        payload.put_f64_slice(&[1.0, 2.0]);
        let bytes = framed(&payload);

        let error = SequentialRecordReader::new(&bytes[..10])
            .next_record()
            .expect_err("truncated payload should fail");
        assert!(matches!(
            error,
            RecordError::TruncatedPayload {
                record: 1,
                declared: 16,
                available: 6
            }
        ));
    }

    #[test]
    fn negative_marker_is_rejected() {
        let bytes = (-8_i32).to_le_bytes();
        let error = SequentialRecordReader::new(&bytes)
            .next_record()
            .expect_err("negative marker should fail");
        assert_eq!(error, RecordError::NegativeLength { record: 1, marker: -8 });
    }

    #[test]
    fn unconsumed_payload_is_reported_on_finish() {
        let mut payload = RecordPayload::new();
        payload.put_i32(1).put_i32(2);
        let bytes = framed(&payload);

        let mut reader = SequentialRecordReader::new(&bytes);
        let mut record = reader.next_record().expect("record");
        record.take_i32("first").expect("first");
        assert_eq!(
            record.finish().expect_err("one field left"),
            RecordError::UnconsumedPayload {
                record: 1,
                declared: 8,
                consumed: 4
            }
        );
    }

    #[test]
    fn overrun_names_the_field() {
        let mut payload = RecordPayload::new();
        payload.put_i32(3);
        let bytes = framed(&payload);

        let mut reader = SequentialRecordReader::new(&bytes);
        let mut record = reader.next_record().expect("record");
        let error = record
            .take_i32_array(3, "iskin")
            .expect_err("array longer than payload");
        assert!(matches!(error, RecordError::Overrun { field: "iskin", needed: 12, .. }));
    }

    #[test]
    fn ragged_real_payload_is_rejected() {
        let mut payload = RecordPayload::new();
        payload.put_f64(1.0).put_i32(2);
        let bytes = framed(&payload);

        let error = SequentialRecordReader::new(&bytes)
            .next_record()
            .expect("record")
            .into_f64_array()
            .expect_err("12 bytes is not a whole number of reals");
        assert_eq!(
            error,
            RecordError::RaggedPayload {
                record: 1,
                length: 12,
                width: 8
            }
        );
    }
}
