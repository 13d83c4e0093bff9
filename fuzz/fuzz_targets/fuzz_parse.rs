#![no_main]

use jpeg_xmp_io::{extended, locator, JpegIO, ReadMode, XmpMeta};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Any input must parse or fail, never panic
    let codec = JpegIO::new();
    let _ = codec.read(&mut Cursor::new(data), ReadMode::MetadataOnly);

    if let Ok(document) = codec.read(&mut Cursor::new(data), ReadMode::Full) {
        if let Some(packet) = locator::locate(&document) {
            if let Ok(meta) = XmpMeta::parse(packet) {
                if let Some(guid) = meta.extended_xmp_guid() {
                    let _ = extended::reassemble(&document, guid);
                }
            }
        }

        for segment in &document {
            let _ = extended::XmpChunk::parse(segment.payload());
        }
    }
});
