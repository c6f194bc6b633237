mod model;
mod parser;

pub use model::{ParticleRecord, Snapshot, SnapshotHeader};
pub use parser::{SnapshotDecodeError, decode_snapshot, encode_snapshot, read_snapshot_file};

/// Bytes in the header payload before the `iskin` array.
pub const HEADER_FIXED_BYTES: usize = 4 + 4 + 8 + 4;
/// Bytes in the header payload after the `iskin` array.
pub const HEADER_TRAILING_BYTES: usize = 3 * 8;

pub const fn header_payload_len(species_count: usize) -> usize {
    HEADER_FIXED_BYTES + 4 * species_count + HEADER_TRAILING_BYTES
}

#[cfg(test)]
mod tests {
    use super::{
        ParticleRecord, Snapshot, SnapshotDecodeError, SnapshotHeader, decode_snapshot,
        encode_snapshot, header_payload_len, read_snapshot_file,
    };
    use crate::common::{RecordError, RecordPayload, SequentialRecordWriter};
    use crate::domain::IngestErrorCategory;
    use std::fs;
    use tempfile::TempDir;

    fn sample_snapshot(particles: usize) -> Snapshot {
        Snapshot {
            header: SnapshotHeader {
                process_count: 4,
                particle_count: particles as i32,
                end_time: 12.5,
                iskin: vec![0, 1],
                reserved: [1.0, -2.0, 0.125],
            },
            particles: ParticleRecord {
                s: (0..particles).map(|i| i as f64 / particles as f64).collect(),
                chi: (0..particles).map(|i| 0.1 * i as f64).collect(),
                phi: (0..particles).map(|i| -0.2 * i as f64).collect(),
            },
        }
    }

    fn frame(records: &[RecordPayload]) -> Vec<u8> {
        let mut writer = SequentialRecordWriter::new();
        for record in records {
            writer.push_record(record).expect("record should fit");
        }
        writer.into_bytes()
    }

    fn header_payload(nspecies: i32, iskin: &[i32]) -> RecordPayload {
        let mut payload = RecordPayload::new();
        payload
            .put_i32(1)
            .put_i32(3)
            .put_f64(0.5)
            .put_i32(nspecies)
            .put_i32_slice(iskin)
            .put_f64_slice(&[0.0; 3]);
        payload
    }

    fn reals(values: &[f64]) -> RecordPayload {
        let mut payload = RecordPayload::new();
        payload.put_f64_slice(values);
        payload
    }

    #[test]
    fn decode_inverts_encode_exactly() {
        let snapshot = sample_snapshot(17);
        let bytes = encode_snapshot(&snapshot).expect("encode");
        let decoded = decode_snapshot(&bytes, 2).expect("decode");
        assert_eq!(decoded, snapshot);

        let reencoded = encode_snapshot(&decoded).expect("re-encode");
        assert_eq!(reencoded, bytes);
    }

    #[test]
    fn header_record_size_follows_species_count() {
        let bytes = encode_snapshot(&sample_snapshot(1)).expect("encode");
        let marker = i32::from_le_bytes(bytes[..4].try_into().expect("4 bytes"));
        assert_eq!(marker as usize, header_payload_len(2));
        assert_eq!(header_payload_len(2), 52);
    }

    #[test]
    fn empty_particle_arrays_decode() {
        let snapshot = sample_snapshot(0);
        let bytes = encode_snapshot(&snapshot).expect("encode");
        let decoded = decode_snapshot(&bytes, 2).expect("decode");
        assert!(decoded.particles.is_empty());
    }

    #[test]
    fn fewer_species_than_expected_is_accepted() {
        let bytes = frame(&[
            header_payload(1, &[7]),
            reals(&[0.1]),
            reals(&[0.2]),
            reals(&[0.3]),
        ]);
        let decoded = decode_snapshot(&bytes, 3).expect("decode");
        assert_eq!(decoded.header.species_count(), 1);
        assert_eq!(decoded.header.iskin, vec![7]);
    }

    #[test]
    fn negative_species_count_is_malformed() {
        let bytes = frame(&[header_payload(-1, &[]), reals(&[]), reals(&[]), reals(&[])]);
        let error = decode_snapshot(&bytes, 2).expect_err("negative count");
        assert_eq!(
            error,
            SnapshotDecodeError::SpeciesCount {
                declared: -1,
                expected: 2
            }
        );
        assert_eq!(error.code(), "FORMAT.SPECIES_COUNT");
    }

    #[test]
    fn species_count_above_expected_is_malformed() {
        let bytes = frame(&[
            header_payload(3, &[0, 0, 0]),
            reals(&[]),
            reals(&[]),
            reals(&[]),
        ]);
        let error = decode_snapshot(&bytes, 2).expect_err("too many species");
        assert!(matches!(error, SnapshotDecodeError::SpeciesCount { declared: 3, .. }));
    }

    #[test]
    fn iskin_longer_than_declared_count_is_malformed() {
        // Declares 1 species but carries 2 iskin entries; the record has 4 extra bytes.
        let bytes = frame(&[
            header_payload(1, &[0, 0]),
            reals(&[]),
            reals(&[]),
            reals(&[]),
        ]);
        let error = decode_snapshot(&bytes, 2).expect_err("record length mismatch");
        assert!(matches!(
            error,
            SnapshotDecodeError::Framing(RecordError::UnconsumedPayload { record: 1, .. })
        ));
    }

    #[test]
    fn iskin_shorter_than_declared_count_is_malformed() {
        let bytes = frame(&[header_payload(2, &[0]), reals(&[]), reals(&[]), reals(&[])]);
        let error = decode_snapshot(&bytes, 2).expect_err("record too short");
        assert!(matches!(
            error,
            SnapshotDecodeError::Framing(RecordError::Overrun { record: 1, .. })
        ));
    }

    #[test]
    fn mismatched_array_lengths_are_malformed() {
        let bytes = frame(&[
            header_payload(0, &[]),
            reals(&[0.1, 0.2]),
            reals(&[0.1, 0.2]),
            reals(&[0.1]),
        ]);
        let error = decode_snapshot(&bytes, 0).expect_err("phi is short");
        assert_eq!(error, SnapshotDecodeError::ArrayLengths { s: 2, chi: 2, phi: 1 });
        assert_eq!(error.code(), "FORMAT.ARRAY_LENGTH");
    }

    #[test]
    fn missing_particle_record_is_malformed() {
        let bytes = frame(&[header_payload(0, &[]), reals(&[0.1]), reals(&[0.1])]);
        let error = decode_snapshot(&bytes, 0).expect_err("phi record missing");
        assert!(matches!(
            error,
            SnapshotDecodeError::Framing(RecordError::TruncatedMarker { record: 4, .. })
        ));
    }

    #[test]
    fn corrupted_trailing_marker_is_malformed() {
        let mut bytes = encode_snapshot(&sample_snapshot(3)).expect("encode");
        let last = bytes.len() - 4;
        bytes[last..].copy_from_slice(&23_i32.to_le_bytes());
        let error = decode_snapshot(&bytes, 2).expect_err("marker mismatch");
        assert!(matches!(
            error,
            SnapshotDecodeError::Framing(RecordError::MarkerMismatch {
                record: 4,
                leading: 24,
                trailing: 23
            })
        ));
    }

    #[test]
    fn trailing_records_are_ignored() {
        let snapshot = sample_snapshot(2);
        let mut bytes = encode_snapshot(&snapshot).expect("encode");
        bytes.extend(frame(&[reals(&[9.0])]));
        assert_eq!(decode_snapshot(&bytes, 2).expect("decode"), snapshot);
    }

    #[test]
    fn file_errors_name_the_file() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("e_0.dat");
        let mut bytes = encode_snapshot(&sample_snapshot(3)).expect("encode");
        bytes.truncate(bytes.len() - 2);
        fs::write(&path, bytes).expect("file should be written");

        let error = read_snapshot_file(&path, 2).expect_err("truncated file");
        assert_eq!(error.category(), IngestErrorCategory::MalformedRecordError);
        assert_eq!(error.code(), "FORMAT.RECORD_FRAMING");
        assert!(error.message().contains("e_0.dat"));
        assert!(error.message().contains("record 4"));

        let missing = read_snapshot_file(&temp.path().join("nope.dat"), 2).expect_err("missing");
        assert_eq!(missing.category(), IngestErrorCategory::IoSystemError);
    }
}
