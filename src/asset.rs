//! Public read/write operations over JPEG files and streams
//!
//! The `read_*`/`embed_*` functions return [`Result`] and leave the caller's
//! streams open. The `extract*`/`write*` functions wrap them for callers that
//! only need success or failure: errors are logged and collapsed into
//! `None`/`false`.

use crate::{
    document::JpegDocument,
    embedder,
    error::{Error, Result},
    extended, guid,
    jpeg_io::{JpegIO, ReadMode},
    locator,
    namespace::{self, HAS_EXTENDED_XMP, XMP_NOTE_NAMESPACE},
    xmp::{SerializeOptions, XmpMeta},
};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

/// Read the standard XMP packet of a JPEG stream
///
/// Returns `Ok(None)` when the stream has no standard XMP segment.
pub fn read_xmp<R: Read>(source: &mut R) -> Result<Option<XmpMeta>> {
    namespace::init();
    let document = JpegIO::new().read(source, ReadMode::MetadataOnly)?;
    locator::locate(&document).map(XmpMeta::parse).transpose()
}

/// Read the extended XMP linked from the standard packet of a JPEG stream
///
/// Returns `Ok(None)` when there is no standard packet, the packet has no
/// `xmpNote:HasExtendedXMP` link, or no chunk carries the linked GUID.
pub fn read_extended_xmp<R: Read>(source: &mut R) -> Result<Option<XmpMeta>> {
    namespace::init();
    let document = JpegIO::new().read(source, ReadMode::MetadataOnly)?;
    let Some(packet) = locator::locate(&document) else {
        return Ok(None);
    };
    let standard = XmpMeta::parse(packet)?;
    let Some(guid) = standard.extended_xmp_guid() else {
        return Ok(None);
    };
    extended::reassemble(&document, guid)?
        .map(|payload| XmpMeta::parse(&payload))
        .transpose()
}

/// Embed `meta` as the standard XMP packet, copying `source` to `dest`
///
/// The whole output document is built before the first byte is written.
pub fn embed_xmp<R: Read, W: Write>(source: &mut R, dest: &mut W, meta: &XmpMeta) -> Result<()> {
    namespace::init();
    let document = embed_standard(source, meta)?;
    write_document(dest, &document)
}

/// Embed `standard` plus `extended` as a linked standard/extended XMP pair
///
/// `extended` is serialized and split into GUID-tagged chunks; a copy of
/// `standard` carrying `xmpNote:HasExtendedXMP = GUID` becomes the standard
/// packet.
pub fn embed_extended_xmp<R: Read, W: Write>(
    source: &mut R,
    dest: &mut W,
    standard: &XmpMeta,
    extended: &XmpMeta,
) -> Result<()> {
    namespace::init();
    let extended_bytes = extended.serialize(&SerializeOptions::embedding())?;
    let guid = guid::digest(&extended_bytes);

    let mut standard = standard.clone();
    standard.set_property(XMP_NOTE_NAMESPACE, HAS_EXTENDED_XMP, guid.as_str())?;

    let document = JpegIO::new().read(source, ReadMode::Full)?;
    let mut segments = vec![embedder::standard_segment(
        &standard.serialize(&SerializeOptions::embedding())?,
    )?];
    segments.extend(extended::to_segments(&extended_bytes, &guid)?);

    let document = embedder::embed(document, segments)?;
    write_document(dest, &document)
}

/// Extract the standard XMP tree from a `.jpg`/`.jpeg` file
pub fn extract<P: AsRef<Path>>(path: P) -> Option<XmpMeta> {
    let path = path.as_ref();
    logged("extract XMP", path, || {
        check_extension(path)?;
        let mut source = BufReader::new(File::open(path)?);
        read_xmp(&mut source)
    })
    .flatten()
}

/// Extract the standard XMP tree from a stream
pub fn extract_from<R: Read>(mut source: R) -> Option<XmpMeta> {
    logged("extract XMP", Path::new("<stream>"), || read_xmp(&mut source)).flatten()
}

/// Extract the standard XMP tree, or an empty one if there is none
pub fn extract_or_create<P: AsRef<Path>>(path: P) -> XmpMeta {
    extract(path).unwrap_or_default()
}

/// Extract the extended XMP tree linked from a file's standard packet
pub fn extract_extended<P: AsRef<Path>>(path: P) -> Option<XmpMeta> {
    let path = path.as_ref();
    logged("extract extended XMP", path, || {
        check_extension(path)?;
        let mut source = BufReader::new(File::open(path)?);
        read_extended_xmp(&mut source)
    })
    .flatten()
}

/// Extract the extended XMP tree linked from a stream's standard packet
pub fn extract_extended_from<R: Read>(mut source: R) -> Option<XmpMeta> {
    logged("extract extended XMP", Path::new("<stream>"), || {
        read_extended_xmp(&mut source)
    })
    .flatten()
}

/// Embed `meta` into a `.jpg`/`.jpeg` file in place
///
/// The new file is written next to the original and renamed over it, so a
/// failure part-way leaves the original untouched. Symlinks are followed and
/// the original's permissions are kept.
pub fn write_standard<P: AsRef<Path>>(path: P, meta: &XmpMeta) -> bool {
    let path = path.as_ref();
    logged("write XMP", path, || {
        check_extension(path)?;
        namespace::init();
        let document = {
            let mut source = BufReader::new(File::open(path)?);
            embed_standard(&mut source, meta)?
        };

        // Replace the link target, not the link
        let target = fs::canonicalize(path)?;
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        let temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            write_document(&mut writer, &document)?;
        }
        temp.as_file().set_permissions(fs::metadata(&target)?.permissions())?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| Error::Io(e.error))?;
        Ok(())
    })
    .is_some()
}

/// Embed `meta` while copying `source` to `dest`
pub fn write_standard_to<R: Read, W: Write>(mut source: R, mut dest: W, meta: &XmpMeta) -> bool {
    logged("write XMP", Path::new("<stream>"), || {
        embed_xmp(&mut source, &mut dest, meta)
    })
    .is_some()
}

/// Embed a linked standard/extended pair while copying `source` to `dest`
pub fn write_standard_plus_extended<R: Read, W: Write>(
    mut source: R,
    mut dest: W,
    standard: &XmpMeta,
    extended: &XmpMeta,
) -> bool {
    logged("write extended XMP", Path::new("<stream>"), || {
        embed_extended_xmp(&mut source, &mut dest, standard, extended)
    })
    .is_some()
}

fn embed_standard<R: Read>(source: &mut R, meta: &XmpMeta) -> Result<JpegDocument> {
    let packet = meta.serialize(&SerializeOptions::embedding())?;
    let segment = embedder::standard_segment(&packet)?;
    let document = JpegIO::new().read(source, ReadMode::Full)?;
    embedder::embed(document, vec![segment])
}

fn write_document<W: Write>(dest: &mut W, document: &JpegDocument) -> Result<()> {
    JpegIO::new().write(dest, document)?;
    dest.flush()?;
    Ok(())
}

fn check_extension(path: &Path) -> Result<()> {
    if JpegIO::accepts_path(path) {
        Ok(())
    } else {
        log::debug!("Only JPEG files are supported: {}", path.display());
        Err(Error::UnsupportedExtension(path.display().to_string()))
    }
}

/// Run `op`, logging and discarding its error
fn logged<T>(what: &str, path: &Path, op: impl FnOnce() -> Result<T>) -> Option<T> {
    match op() {
        Ok(value) => Some(value),
        Err(Error::UnsupportedExtension(_)) => None,
        Err(e) => {
            log::warn!("Failed to {} ({}): {}", what, path.display(), e);
            None
        }
    }
}
