#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let buffer = hexpatch::core::ByteBuffer::from_hex(text);
        let _ = buffer.to_hex();
    }
});
