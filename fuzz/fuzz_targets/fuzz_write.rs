#![no_main]

use jpeg_xmp_io::{embedder, extended, guid, JpegIO, ReadMode};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let codec = JpegIO::new();
    let Ok(document) = codec.read(&mut Cursor::new(data), ReadMode::Full) else {
        return;
    };

    // Rewrite unchanged
    let mut output = Vec::new();
    let _ = codec.write(&mut output, &document);

    // Embed a standard packet plus chunks built from the input itself
    let Ok(standard) = embedder::standard_segment(b"<x:xmpmeta>fuzz</x:xmpmeta>") else {
        return;
    };
    let mut segments = vec![standard];
    if let Ok(chunks) = extended::to_segments(data, &guid::digest(data)) {
        segments.extend(chunks);
    }
    if let Ok(document) = embedder::embed(document, segments) {
        let mut output = Vec::new();
        let _ = codec.write(&mut output, &document);
    }
});
