//! Document recompression engine
//!
//! Owns one PDF's object graph for the duration of a single call: finds
//! embedded JPEG image streams, recompresses the ones worth touching,
//! scrubs metadata, and re-serializes with object streams to shrink the
//! cross-reference overhead.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};

use lopdf::{Dictionary, Document, Object, ObjectId, SaveOptions, Stream};

use crate::config::CompressionSettings;
use crate::error::{EngineError, ImageError};

use super::image::recompress_jpeg;

/// Result of one engine invocation
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    /// The rewritten document
    pub output: Vec<u8>,
    /// Images replaced with a smaller re-encode (diagnostic only)
    pub optimized_images: usize,
    /// Candidate images left alone or failed locally (diagnostic only)
    pub skipped_images: usize,
}

/// Run the full compression pipeline over one document.
///
/// A failure decoding a single image is caught locally and counted as
/// skipped; parse and save failures are terminal. The cancel flag is
/// checked before each image so an abandoned job stops doing work early,
/// best-effort.
pub fn compress_document(
    input: &[u8],
    settings: &CompressionSettings,
    cancel: &AtomicBool,
) -> Result<CompressionOutcome, EngineError> {
    let mut doc = Document::load_mem(input).map_err(|e| EngineError::Parse(e.to_string()))?;

    let candidates = collect_jpeg_images(&doc);
    log::debug!("Found {} JPEG image streams", candidates.len());

    let mut optimized_images = 0;
    let mut skipped_images = 0;

    for id in candidates {
        if cancel.load(Ordering::Relaxed) {
            return Err(EngineError::Cancelled);
        }

        match recompress_stream(&mut doc, id, settings) {
            Ok(true) => optimized_images += 1,
            Ok(false) => skipped_images += 1,
            Err(err) => {
                log::warn!("Failed to optimize image {:?}: {}", id, err);
                skipped_images += 1;
            }
        }
    }

    log::info!(
        "Optimized {} images, skipped {}",
        optimized_images,
        skipped_images
    );

    scrub_metadata(&mut doc, &settings.tool_name);

    let output = save_compacted(&mut doc)?;

    Ok(CompressionOutcome {
        output,
        optimized_images,
        skipped_images,
    })
}

/// Collect ids of stream objects carrying JPEG image data (Subtype /Image,
/// Filter /DCTDecode).
fn collect_jpeg_images(doc: &Document) -> Vec<ObjectId> {
    doc.objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) if is_jpeg_image(stream) => Some(*id),
            _ => None,
        })
        .collect()
}

fn is_jpeg_image(stream: &Stream) -> bool {
    let is_image = matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image");
    if !is_image {
        return false;
    }

    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        // A single-element filter array is equivalent; longer chains would
        // need their other filters re-applied, so leave those alone.
        Ok(Object::Array(filters)) => {
            filters.len() == 1 && matches!(&filters[0], Object::Name(n) if n == b"DCTDecode")
        }
        _ => false,
    }
}

/// Attempt to replace one image stream. Returns whether a replacement was
/// written. Width, Height and the payload are rewritten together so the
/// three stay consistent.
fn recompress_stream(
    doc: &mut Document,
    id: ObjectId,
    settings: &CompressionSettings,
) -> Result<bool, ImageError> {
    let stream = match doc.get_object(id) {
        Ok(Object::Stream(s)) => s.clone(),
        _ => return Ok(false),
    };

    let width = dict_u32(&stream.dict, b"Width").unwrap_or(0);
    let height = dict_u32(&stream.dict, b"Height").unwrap_or(0);
    if width == 0 || height == 0 {
        return Ok(false);
    }

    let replacement = match recompress_jpeg(&stream.content, width, height, settings)? {
        Some(replacement) => replacement,
        None => return Ok(false),
    };

    log::debug!(
        "Replacing image {:?}: {}x{} ({} bytes) -> {}x{} ({} bytes)",
        id,
        width,
        height,
        stream.content.len(),
        replacement.width,
        replacement.height,
        replacement.bytes.len()
    );

    let mut dict = stream.dict.clone();
    dict.set("Width", Object::Integer(replacement.width as i64));
    dict.set("Height", Object::Integer(replacement.height as i64));
    // The replacement is always an RGB JPEG regardless of the source encoding
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    doc.objects
        .insert(id, Object::Stream(Stream::new(dict, replacement.bytes)));

    Ok(true)
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key) {
        Ok(Object::Integer(n)) if *n > 0 => Some(*n as u32),
        _ => None,
    }
}

/// Clear Title and Author, stamp Producer and Creator with the tool string.
/// Other Info entries (Subject, Keywords, custom) are intentionally left
/// untouched.
fn scrub_metadata(doc: &mut Document, tool_name: &str) {
    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => *id,
        _ => {
            let id = doc.add_object(Dictionary::new());
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };

    if let Ok(Object::Dictionary(info)) = doc.get_object_mut(info_id) {
        info.set("Title", Object::string_literal(""));
        info.set("Author", Object::string_literal(""));
        info.set("Producer", Object::string_literal(tool_name));
        info.set("Creator", Object::string_literal(tool_name));
    } else {
        log::warn!("Document Info entry is not a dictionary, leaving metadata untouched");
    }
}

/// Serialize with object streams and cross-reference streams, the compact
/// writer mode.
fn save_compacted(doc: &mut Document) -> Result<Vec<u8>, EngineError> {
    // Object streams are a PDF 1.5 feature
    if doc.version.as_str() < "1.5" {
        doc.version = "1.5".to_string();
    }

    let options = SaveOptions::builder()
        .use_object_streams(true)
        .use_xref_streams(true)
        .build();

    let mut output = Cursor::new(Vec::new());
    doc.save_with_options(&mut output, options)
        .map_err(|e| EngineError::Save(e.to_string()))?;

    Ok(output.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use lopdf::dictionary;

    fn jpeg_fixture(width: u32, height: u32, quality: u8) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) * 3 % 256) as u8])
        });
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
        encoder.encode_image(&img).unwrap();
        out
    }

    /// One-page document embedding the given JPEG image streams.
    fn pdf_fixture(images: &[(Vec<u8>, u32, u32)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut xobjects = Dictionary::new();
        for (index, (bytes, width, height)) in images.iter().enumerate() {
            let image_id = doc.add_object(Object::Stream(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => *width as i64,
                    "Height" => *height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                bytes.clone(),
            )));
            xobjects.set(format!("Im{}", index), Object::Reference(image_id));
        }

        let content_id = doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            b"q Q".to_vec(),
        )));
        let resources_id = doc.add_object(dictionary! {
            "XObject" => Object::Dictionary(xobjects),
        });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Cursor::new(Vec::new());
        doc.save_to(&mut out).unwrap();
        out.into_inner()
    }

    fn image_streams(doc: &Document) -> Vec<&Stream> {
        doc.objects
            .values()
            .filter_map(|object| match object {
                Object::Stream(stream) if is_jpeg_image(stream) => Some(stream),
                _ => None,
            })
            .collect()
    }

    fn info_string(doc: &Document, key: &[u8]) -> Vec<u8> {
        let info_id = match doc.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => *id,
            other => panic!("Expected Info reference, got {:?}", other),
        };
        match doc.get_object(info_id) {
            Ok(Object::Dictionary(info)) => match info.get(key) {
                Ok(Object::String(bytes, _)) => bytes.clone(),
                other => panic!("Expected string for {:?}, got {:?}", key, other),
            },
            other => panic!("Expected Info dictionary, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_input_is_terminal() {
        let cancel = AtomicBool::new(false);
        let result =
            compress_document(b"not a pdf at all", &CompressionSettings::default(), &cancel);
        assert!(matches!(result, Err(EngineError::Parse(_))));
    }

    #[test]
    fn test_oversized_image_is_recompressed() {
        let jpeg = jpeg_fixture(3000, 2200, 95);
        let input = pdf_fixture(&[(jpeg, 3000, 2200)]);

        let cancel = AtomicBool::new(false);
        let outcome =
            compress_document(&input, &CompressionSettings::default(), &cancel).unwrap();

        assert_eq!(outcome.optimized_images, 1);
        assert_eq!(outcome.skipped_images, 0);
        assert!(outcome.output.len() < (input.len() as f64 * 0.9) as usize);

        let doc = Document::load_mem(&outcome.output).unwrap();
        let streams = image_streams(&doc);
        assert_eq!(streams.len(), 1);
        assert_eq!(dict_u32(&streams[0].dict, b"Width"), Some(2000));
        assert_eq!(dict_u32(&streams[0].dict, b"Height"), Some(1467));
    }

    #[test]
    fn test_small_image_round_trips_bit_identical() {
        let jpeg = jpeg_fixture(400, 300, 85);
        let input = pdf_fixture(&[(jpeg.clone(), 400, 300)]);

        let cancel = AtomicBool::new(false);
        let outcome =
            compress_document(&input, &CompressionSettings::default(), &cancel).unwrap();

        assert_eq!(outcome.optimized_images, 0);
        assert_eq!(outcome.skipped_images, 1);

        let doc = Document::load_mem(&outcome.output).unwrap();
        let streams = image_streams(&doc);
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].content, jpeg);
    }

    #[test]
    fn test_corrupt_image_does_not_abort_document() {
        let good = jpeg_fixture(3000, 2200, 95);
        let input = pdf_fixture(&[
            (b"garbage jpeg payload".to_vec(), 1200, 900),
            (good, 3000, 2200),
        ]);

        let cancel = AtomicBool::new(false);
        let outcome =
            compress_document(&input, &CompressionSettings::default(), &cancel).unwrap();

        assert_eq!(outcome.optimized_images, 1);
        assert_eq!(outcome.skipped_images, 1);
        assert!(Document::load_mem(&outcome.output).is_ok());
    }

    #[test]
    fn test_metadata_scrubbed() {
        let input = pdf_fixture(&[]);

        let cancel = AtomicBool::new(false);
        let outcome =
            compress_document(&input, &CompressionSettings::default(), &cancel).unwrap();

        let doc = Document::load_mem(&outcome.output).unwrap();
        assert_eq!(info_string(&doc, b"Title"), b"");
        assert_eq!(info_string(&doc, b"Author"), b"");
        assert_eq!(info_string(&doc, b"Producer"), b"pdfshrink");
        assert_eq!(info_string(&doc, b"Creator"), b"pdfshrink");
    }

    #[test]
    fn test_cancel_flag_stops_processing() {
        let jpeg = jpeg_fixture(600, 600, 95);
        let input = pdf_fixture(&[(jpeg, 600, 600)]);

        let cancel = AtomicBool::new(true);
        let result = compress_document(&input, &CompressionSettings::default(), &cancel);
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }
}
