#![no_main]

use libfuzzer_sys::fuzz_target;
use spillframe::{Buffer, DeserializerConfig, MIN_SPILL_THRESHOLD, RecordDeserializer};

fuzz_target!(|data: Vec<u8>| {
    // First byte picks the buffer size, the rest is the wire
    let Some((&step, wire)) = data.split_first() else {
        return;
    };
    let step = usize::from(step).max(1);

    let config = DeserializerConfig::default()
        .with_spill_threshold(MIN_SPILL_THRESHOLD)
        .with_max_record_length(1 << 18);
    let mut deserializer = RecordDeserializer::new(config);
    let mut record = Vec::new();

    'feed: for batch in wire.chunks(step) {
        if deserializer.set_next_buffer(Buffer::from(batch.to_vec())).is_err() {
            break;
        }
        loop {
            match deserializer.get_next_record(&mut record) {
                Ok(result) => {
                    if result.is_full_record() {
                        assert!(record.len() <= 1 << 18);
                    }
                    if result.is_buffer_consumed() {
                        break;
                    }
                }
                Err(_) => break 'feed,
            }
        }

        // Snapshots must never disturb the stream
        if let Ok(segments) = deserializer.unconsumed_buffer() {
            let _ = segments.count();
        }
    }

    deserializer.clear();
    assert_eq!(deserializer.pending_len(), 0);
});
