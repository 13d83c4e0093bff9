#![no_main]

use jpeg_xmp_io::{
    locator,
    namespace::{self, DC_NAMESPACE},
    SerializeOptions, XmpMeta,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    namespace::init();
    let _ = locator::content_end(data);

    if let Ok(mut meta) = XmpMeta::parse(data) {
        // Try modifications - these should all be safe
        let _ = meta.set_property(DC_NAMESPACE, "title", "Test");
        let _ = meta.set_property(DC_NAMESPACE, "", "");
        let _ = meta.set_property(DC_NAMESPACE, &"x".repeat(1000), "value");
        let _ = meta.delete_property(DC_NAMESPACE, "format");
        let _ = meta.extended_xmp_guid();

        let _ = meta.serialize(&SerializeOptions::embedding());
        let _ = meta.serialize(&SerializeOptions::new());
    }
});
