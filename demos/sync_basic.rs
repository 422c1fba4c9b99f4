//! Basic synchronous deserialization example with the buffer-feeding API.
//!
//! Run with:
//!     cargo run --example sync_basic

use bytes::{Bytes, BytesMut};
use spillframe::{Buffer, DeserializerConfig, RecordDeserializer, frame_record};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Frame some records of very different sizes
    let mut wire = BytesMut::new();
    for len in [5usize, 40_000, 0, 300_000, 12] {
        frame_record(&vec![b'x'; len], &mut wire)?;
    }
    let wire = wire.freeze();

    let config = DeserializerConfig::default().with_spill_threshold(128 * 1024);
    let mut deserializer = RecordDeserializer::new(config);

    println!("Deserializing {} bytes of framed data...\n", wire.len());

    let mut total_records = 0;
    let mut total_bytes = 0;
    let mut record = Vec::new();

    // Simulate a network channel delivering 8 KB buffers
    let batch_size = 8 * 1024;
    for (i, batch) in wire.chunks(batch_size).enumerate() {
        deserializer.set_next_buffer(Buffer::new(Bytes::copy_from_slice(batch)))?;

        loop {
            let result = deserializer.get_next_record(&mut record)?;
            if result.is_full_record() {
                total_records += 1;
                total_bytes += record.len();
                println!(
                    "Record {}: len={}, completed in buffer {}",
                    total_records,
                    record.len(),
                    i
                );
            } else if deserializer.is_spilling() {
                println!("Buffer {}: spilling, {} bytes gathered", i, deserializer.pending_len());
            }
            if result.is_buffer_consumed() {
                break;
            }
        }
    }

    deserializer.clear();

    println!("\nTotal: {} records, {} payload bytes", total_records, total_bytes);
    Ok(())
}
