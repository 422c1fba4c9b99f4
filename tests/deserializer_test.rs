// Integration tests for the RecordDeserializer buffer-feeding API
// Tests cover: result sequencing, spilling, prefix splits, buffer lifecycle, adapters

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{Bytes, BytesMut};
use spillframe::{
    Buffer, BufferPool, BufferRecycler, DeserializationResult, DeserializeError,
    DeserializerConfig, LENGTH_BYTES, MIN_SPILL_THRESHOLD, RecordDeserializer, RecordReader,
    frame_record,
};

use DeserializationResult::{IntermediateRecordFromBuffer, LastRecordFromBuffer, PartialRecord};

// ============================================================================
// Helpers
// ============================================================================

fn framed(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = BytesMut::new();
    for record in records {
        frame_record(record, &mut out).unwrap();
    }
    out.to_vec()
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn spill_files(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

/// Feeds `wire` split at `sizes` and collects (result, record) pairs for every call.
fn drive(
    deserializer: &mut RecordDeserializer,
    wire: &[u8],
    sizes: &[usize],
) -> (Vec<DeserializationResult>, Vec<Vec<u8>>) {
    let mut results = Vec::new();
    let mut records = Vec::new();
    let mut offset = 0;

    for &size in sizes {
        let chunk = wire[offset..offset + size].to_vec();
        offset += size;
        deserializer.set_next_buffer(Buffer::new(chunk)).unwrap();

        loop {
            let mut record = Vec::new();
            let result = deserializer.get_next_record(&mut record).unwrap();
            results.push(result);
            if result.is_full_record() {
                records.push(record);
            }
            if result.is_buffer_consumed() {
                break;
            }
        }
    }
    assert_eq!(offset, wire.len(), "sizes must cover the whole wire");
    (results, records)
}

/// Concatenates every segment of the deserializer's unconsumed snapshot.
fn snapshot_bytes(deserializer: &RecordDeserializer) -> Vec<u8> {
    deserializer
        .unconsumed_buffer()
        .unwrap()
        .collect::<std::io::Result<Vec<_>>>()
        .unwrap()
        .concat()
}

#[derive(Default)]
struct CountingRecycler {
    released: AtomicUsize,
}

impl BufferRecycler for CountingRecycler {
    fn recycle(&self, _segment: Bytes) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Result Sequencing Tests
// ============================================================================

#[test]
fn test_mixed_records_with_spilled_middle_record() {
    let dir = tempfile::tempdir().unwrap();
    let config = DeserializerConfig::default()
        .with_spill_threshold(100_000)
        .with_tmp_dir(dir.path());
    assert_eq!(config.spill_threshold(), MIN_SPILL_THRESHOLD);

    let records = vec![payload(3), payload(500_000), payload(2)];
    let wire = framed(&records);
    assert_eq!(wire.len(), 10 + 5 + 499_996 + 6);

    let mut deserializer = RecordDeserializer::new(config);
    let mut results = Vec::new();
    let mut decoded = Vec::new();
    let mut offset = 0;

    for size in [10, 5, 499_996, 6] {
        deserializer
            .set_next_buffer(Buffer::new(wire[offset..offset + size].to_vec()))
            .unwrap();
        offset += size;

        if size == 5 {
            assert!(deserializer.is_spilling(), "the large record must go to disk");
            assert_eq!(spill_files(dir.path()), 1);
        }

        loop {
            let mut record = Vec::new();
            let result = deserializer.get_next_record(&mut record).unwrap();
            results.push(result);
            if result.is_full_record() {
                decoded.push(record);
            }
            if result.is_buffer_consumed() {
                break;
            }
        }
    }

    assert_eq!(
        results,
        [
            IntermediateRecordFromBuffer,
            PartialRecord,
            PartialRecord,
            LastRecordFromBuffer,
            LastRecordFromBuffer,
        ]
    );
    assert_eq!(decoded, records);
    assert_eq!(spill_files(dir.path()), 0, "spill file must be deleted");
}

#[test]
fn test_single_huge_buffer() {
    let records: Vec<_> = (0..100).map(|i| payload(i * 7)).collect();
    let wire = framed(&records);

    let mut deserializer = RecordDeserializer::default();
    let (results, decoded) = drive(&mut deserializer, &wire, &[wire.len()]);

    assert_eq!(decoded, records);
    assert_eq!(results.last(), Some(&LastRecordFromBuffer));
    assert!(
        results[..results.len() - 1]
            .iter()
            .all(|r| *r == IntermediateRecordFromBuffer)
    );
}

#[test]
fn test_record_ending_exactly_at_buffer_boundary() {
    let records = vec![payload(6), payload(6)];
    let wire = framed(&records);

    let mut deserializer = RecordDeserializer::default();
    let (results, decoded) = drive(&mut deserializer, &wire, &[10, 10]);

    assert_eq!(results, [LastRecordFromBuffer, LastRecordFromBuffer]);
    assert_eq!(decoded, records);
}

// ============================================================================
// Spill Threshold Tests
// ============================================================================

fn spanning_record_storage(framed_size: usize) -> bool {
    let dir = tempfile::tempdir().unwrap();
    let config = DeserializerConfig::default()
        .with_spill_threshold(MIN_SPILL_THRESHOLD)
        .with_tmp_dir(dir.path());

    let record = payload(framed_size - LENGTH_BYTES);
    let wire = framed(std::slice::from_ref(&record));

    let mut deserializer = RecordDeserializer::new(config);
    deserializer.set_next_buffer(Buffer::new(wire[..100].to_vec())).unwrap();
    let mut out = Vec::new();
    assert_eq!(deserializer.get_next_record(&mut out).unwrap(), PartialRecord);
    let spilled = deserializer.is_spilling();
    assert_eq!(spill_files(dir.path()), usize::from(spilled));

    deserializer.set_next_buffer(Buffer::new(wire[100..].to_vec())).unwrap();
    assert_eq!(deserializer.get_next_record(&mut out).unwrap(), LastRecordFromBuffer);
    assert_eq!(out, record);
    assert_eq!(spill_files(dir.path()), 0);
    spilled
}

#[test]
fn test_threshold_boundaries() {
    assert!(!spanning_record_storage(MIN_SPILL_THRESHOLD - 1));
    assert!(!spanning_record_storage(MIN_SPILL_THRESHOLD));
    assert!(spanning_record_storage(MIN_SPILL_THRESHOLD + 1));
}

#[test]
fn test_unwritable_spill_directory_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let config = DeserializerConfig::default()
        .with_spill_threshold(MIN_SPILL_THRESHOLD)
        .with_tmp_dir(&missing);

    let wire = framed(&[payload(MIN_SPILL_THRESHOLD * 2)]);
    let mut deserializer = RecordDeserializer::new(config);
    deserializer.set_next_buffer(Buffer::new(wire[..64].to_vec())).unwrap();

    let mut out = Vec::new();
    let err = deserializer.get_next_record(&mut out).unwrap_err();
    assert!(matches!(err, DeserializeError::SpillFile { directories: 1, .. }));
    deserializer.clear();
}

#[test]
fn test_spill_falls_through_to_next_directory() {
    let good = tempfile::tempdir().unwrap();
    let config = DeserializerConfig::default()
        .with_spill_threshold(MIN_SPILL_THRESHOLD)
        .with_tmp_dirs([good.path().join("missing"), good.path().to_path_buf()]);

    let record = payload(MIN_SPILL_THRESHOLD * 2);
    let wire = framed(std::slice::from_ref(&record));

    let mut deserializer = RecordDeserializer::new(config);
    let (_, decoded) = drive(&mut deserializer, &wire, &[64, wire.len() - 64]);
    assert_eq!(decoded, [record]);
    assert_eq!(spill_files(good.path()), 0);
}

// ============================================================================
// Length Prefix Split Tests
// ============================================================================

#[test]
fn test_prefix_splits_resolve_identically() {
    let records = vec![payload(5), payload(9)];
    let wire = framed(&records);
    let second = LENGTH_BYTES + 5;

    for split in 1..LENGTH_BYTES {
        let mut deserializer = RecordDeserializer::default();
        let first_len = second + split;
        let (results, decoded) = drive(
            &mut deserializer,
            &wire,
            &[first_len, wire.len() - first_len],
        );

        assert_eq!(
            results,
            [IntermediateRecordFromBuffer, PartialRecord, LastRecordFromBuffer],
            "split {split}+{}",
            LENGTH_BYTES - split
        );
        assert_eq!(decoded, records);
    }
}

#[test]
fn test_zero_length_records() {
    let records = vec![Vec::new(), Vec::new(), payload(1), Vec::new()];
    let wire = framed(&records);

    let mut deserializer = RecordDeserializer::default();
    let sizes = vec![1; wire.len()];
    let (_, decoded) = drive(&mut deserializer, &wire, &sizes);
    assert_eq!(decoded, records);
}

// ============================================================================
// Buffer Lifecycle Tests
// ============================================================================

#[test]
fn test_every_buffer_released_exactly_once() {
    let recycler = Arc::new(CountingRecycler::default());
    let records = vec![payload(3), payload(40), payload(0), payload(17)];
    let wire = framed(&records);

    let mut deserializer = RecordDeserializer::default();
    let mut fed = 0;
    let mut decoded = Vec::new();

    for chunk in wire.chunks(6) {
        deserializer
            .set_next_buffer(Buffer::with_recycler(
                Bytes::copy_from_slice(chunk),
                recycler.clone(),
            ))
            .unwrap();
        fed += 1;

        loop {
            let mut record = Vec::new();
            let result = deserializer.get_next_record(&mut record).unwrap();
            if result.is_full_record() {
                decoded.push(record);
            }
            if result.is_buffer_consumed() {
                break;
            }
        }
        // Consumed buffers are never held on to
        assert_eq!(recycler.released.load(Ordering::SeqCst), fed);
    }

    assert_eq!(decoded, records);
    deserializer.clear();
    assert_eq!(recycler.released.load(Ordering::SeqCst), fed);
}

#[test]
fn test_clear_releases_held_buffer() {
    let recycler = Arc::new(CountingRecycler::default());
    let wire = framed(&[payload(2), payload(2)]);

    let mut deserializer = RecordDeserializer::default();
    deserializer
        .set_next_buffer(Buffer::with_recycler(Bytes::from(wire), recycler.clone()))
        .unwrap();
    let mut record = Vec::new();
    assert_eq!(
        deserializer.get_next_record(&mut record).unwrap(),
        IntermediateRecordFromBuffer
    );
    assert_eq!(recycler.released.load(Ordering::SeqCst), 0);

    deserializer.clear();
    assert_eq!(recycler.released.load(Ordering::SeqCst), 1);
    deserializer.clear();
    assert_eq!(recycler.released.load(Ordering::SeqCst), 1);
    assert_eq!(deserializer.pending_len(), 0);
}

#[test]
fn test_drop_releases_held_buffer_and_spill_file() {
    let dir = tempfile::tempdir().unwrap();
    let recycler = Arc::new(CountingRecycler::default());
    let config = DeserializerConfig::default()
        .with_spill_threshold(MIN_SPILL_THRESHOLD)
        .with_tmp_dir(dir.path());

    let wire = framed(&[payload(MIN_SPILL_THRESHOLD * 2), payload(8)]);
    {
        let mut deserializer = RecordDeserializer::new(config);
        deserializer
            .set_next_buffer(Buffer::with_recycler(
                Bytes::copy_from_slice(&wire[..128]),
                recycler.clone(),
            ))
            .unwrap();
        let mut record = Vec::new();
        assert_eq!(deserializer.get_next_record(&mut record).unwrap(), PartialRecord);
        assert_eq!(recycler.released.load(Ordering::SeqCst), 1);

        // Completes the spilled record and leaves the small one in the same buffer
        deserializer
            .set_next_buffer(Buffer::with_recycler(
                Bytes::copy_from_slice(&wire[128..]),
                recycler.clone(),
            ))
            .unwrap();
        assert_eq!(recycler.released.load(Ordering::SeqCst), 1);
        assert_eq!(spill_files(dir.path()), 1);
    }

    assert_eq!(recycler.released.load(Ordering::SeqCst), 2);
    assert_eq!(spill_files(dir.path()), 0);
}

#[test]
fn test_pool_buffers_come_back() {
    let pool = BufferPool::new(16);
    let wire = framed(&[payload(40), payload(3)]);
    let mut source = &wire[..];

    let mut deserializer = RecordDeserializer::default();
    let mut decoded = Vec::new();
    while let Some(buffer) = pool.read_buffer(&mut source).unwrap() {
        deserializer.set_next_buffer(buffer).unwrap();
        loop {
            let mut record = Vec::new();
            let result = deserializer.get_next_record(&mut record).unwrap();
            if result.is_full_record() {
                decoded.push(record);
            }
            if result.is_buffer_consumed() {
                break;
            }
        }
        assert!(pool.outstanding() <= 1);
    }

    assert_eq!(decoded.len(), 2);
    deserializer.clear();
    assert_eq!(pool.outstanding(), 0);
}

// ============================================================================
// Snapshot Tests
// ============================================================================

#[test]
fn test_snapshot_resumes_on_fresh_deserializer() {
    let records = vec![payload(10), payload(20), payload(5)];
    let wire = framed(&records);

    let mut first = RecordDeserializer::default();
    first.set_next_buffer(Buffer::new(wire[..30].to_vec())).unwrap();
    let mut record = Vec::new();
    assert_eq!(first.get_next_record(&mut record).unwrap(), IntermediateRecordFromBuffer);
    assert_eq!(first.get_next_record(&mut record).unwrap(), PartialRecord);

    let snapshot = snapshot_bytes(&first);
    assert_eq!(snapshot, &wire[14..30]);

    let mut resumed = RecordDeserializer::default();
    let mut rest = snapshot;
    rest.extend_from_slice(&wire[30..]);
    let (_, decoded) = drive(&mut resumed, &rest, &[rest.len()]);
    assert_eq!(decoded, records[1..]);
}

#[test]
fn test_spilled_snapshot_resumes_on_fresh_deserializer() {
    let dir = tempfile::tempdir().unwrap();
    let config = DeserializerConfig::default()
        .with_spill_threshold(MIN_SPILL_THRESHOLD)
        .with_tmp_dir(dir.path());

    // 200 KiB framed, twice the threshold
    let record = payload(204_800 - LENGTH_BYTES);
    let wire = framed(&[record.clone()]);

    let mut first = RecordDeserializer::new(config.clone());
    first.set_next_buffer(Buffer::new(wire[..1000].to_vec())).unwrap();
    let mut target = Vec::new();
    assert_eq!(first.get_next_record(&mut target).unwrap(), PartialRecord);
    assert!(first.is_spilling());

    let snapshot = snapshot_bytes(&first);
    assert_eq!(snapshot, &wire[..1000]);

    let mut rest = snapshot;
    rest.extend_from_slice(&wire[1000..]);
    let mut resumed = RecordDeserializer::new(config);
    let (_, decoded) = drive(&mut resumed, &rest, &[70_000, rest.len() - 70_000]);
    assert_eq!(decoded, vec![record.clone()]);

    // The snapshot left the first deserializer's spill file intact
    let (_, decoded) = drive(&mut first, &wire[1000..], &[wire.len() - 1000]);
    assert_eq!(decoded, vec![record]);
    assert_eq!(spill_files(dir.path()), 0);
}

#[test]
fn test_snapshot_of_assembled_spilled_record_and_left_over() {
    let dir = tempfile::tempdir().unwrap();
    let config = DeserializerConfig::default()
        .with_spill_threshold(MIN_SPILL_THRESHOLD)
        .with_tmp_dir(dir.path());

    let records = vec![payload(MIN_SPILL_THRESHOLD), b"tail".to_vec()];
    let wire = framed(&records);

    let mut deserializer = RecordDeserializer::new(config.clone());
    deserializer.set_next_buffer(Buffer::new(wire[..1000].to_vec())).unwrap();
    let mut target = Vec::new();
    assert_eq!(deserializer.get_next_record(&mut target).unwrap(), PartialRecord);

    // Completes the spilled record; the second record is left over
    deserializer.set_next_buffer(Buffer::new(wire[1000..].to_vec())).unwrap();
    assert_eq!(snapshot_bytes(&deserializer), wire);

    let mut resumed = RecordDeserializer::new(config);
    let (_, decoded) = drive(&mut resumed, &wire, &[wire.len()]);
    assert_eq!(decoded, records);

    let mut target = Vec::new();
    assert_eq!(
        deserializer.get_next_record(&mut target).unwrap(),
        IntermediateRecordFromBuffer
    );
    assert_eq!(target, records[0]);
    deserializer.clear();
    assert_eq!(spill_files(dir.path()), 0);
}

// ============================================================================
// Error Recovery Tests
// ============================================================================

#[test]
fn test_codec_error_keeps_framing_aligned() {
    let records = vec![b"fine".to_vec(), b"\xFF\xFE".to_vec(), b"also fine".to_vec()];
    let wire = framed(&records);

    let mut deserializer = RecordDeserializer::default();
    deserializer.set_next_buffer(Buffer::new(wire)).unwrap();

    let mut text = String::new();
    assert_eq!(
        deserializer.get_next_record(&mut text).unwrap(),
        IntermediateRecordFromBuffer
    );
    assert_eq!(text, "fine");
    assert!(matches!(
        deserializer.get_next_record(&mut text),
        Err(DeserializeError::Payload(_))
    ));
    assert_eq!(
        deserializer.get_next_record(&mut text).unwrap(),
        LastRecordFromBuffer
    );
    assert_eq!(text, "also fine");
}

#[test]
fn test_corrupt_spanning_length() {
    let mut deserializer = RecordDeserializer::default();
    deserializer.set_next_buffer(Buffer::new(vec![0x80, 0x00])).unwrap();
    let mut record = Vec::new();
    assert_eq!(deserializer.get_next_record(&mut record).unwrap(), PartialRecord);

    let err = deserializer
        .set_next_buffer(Buffer::new(vec![0x00, 0x00, 1, 2, 3]))
        .unwrap_err();
    assert!(matches!(err, DeserializeError::CorruptLength { length, .. } if length < 0));

    deserializer.clear();
    assert_eq!(deserializer.pending_len(), 0);
}

// ============================================================================
// Reader Adapter Tests
// ============================================================================

#[test]
fn test_record_reader_with_spilling() {
    let dir = tempfile::tempdir().unwrap();
    let config = DeserializerConfig::default()
        .with_spill_threshold(MIN_SPILL_THRESHOLD)
        .with_tmp_dir(dir.path());

    let records = vec![payload(12), payload(MIN_SPILL_THRESHOLD * 3), payload(1)];
    let wire = framed(&records);
    let pool = BufferPool::new(8 * 1024);

    let reader = RecordReader::<_, Vec<u8>>::with_pool(&wire[..], config, pool.clone());
    let decoded: Vec<_> = reader.collect::<Result<_, _>>().unwrap();

    assert_eq!(decoded, records);
    assert_eq!(pool.outstanding(), 0);
    assert_eq!(spill_files(dir.path()), 0);
}

#[test]
fn test_record_reader_eof_inside_record() {
    let wire = framed(&[payload(4), payload(100)]);
    let reader = RecordReader::<_, Vec<u8>>::new(&wire[..50], DeserializerConfig::default());

    let items: Vec<_> = reader.collect();
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(matches!(
        items[1],
        Err(DeserializeError::UnexpectedEof { pending: 42 })
    ));
}
