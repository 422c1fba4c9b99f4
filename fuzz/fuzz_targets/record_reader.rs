#![no_main]

use libfuzzer_sys::fuzz_target;
use spillframe::{BufferPool, DeserializerConfig, RecordReader};

fuzz_target!(|data: Vec<u8>| {
    let pool = BufferPool::new(64);
    let config = DeserializerConfig::default().with_max_record_length(1 << 16);

    let reader = RecordReader::<_, String>::with_pool(&data[..], config, pool.clone());
    let mut consumed = 0usize;
    for record in reader.flatten() {
        consumed += 4 + record.len();
    }

    // Decoded records never claim more bytes than the input holds
    assert!(consumed <= data.len());
    assert_eq!(pool.outstanding(), 0);
});
