//! lopdf-backed implementation of [`PdfProcessor`].

use std::collections::HashSet;
use std::path::Path;

use image::{DynamicImage, ImageBuffer, Rgb};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// Form-feed character pdf-extract emits between pages of some documents.
const PAGE_BREAK: char = '\u{0c}';

/// PDF content extractor.
///
/// Keeps both the parsed document (for image objects and structure) and
/// the raw bytes (for pdf-extract, which wants the whole file).
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    /// Load a PDF directly from a file path.
    pub fn from_file(path: &Path) -> std::result::Result<Self, crate::error::LsgbError> {
        let data = std::fs::read(path)?;
        let mut extractor = Self::new();
        extractor.load(&data)?;
        Ok(extractor)
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("no document loaded".to_string()))
    }

    /// Scan every object in the document for decodable image streams.
    fn extract_all_images(&self) -> Vec<DynamicImage> {
        let doc = match self.document.as_ref() {
            Some(d) => d,
            None => return Vec::new(),
        };

        let mut images = Vec::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();

        for (id, object) in doc.objects.iter() {
            if !seen.insert(*id) {
                continue;
            }
            if let Some(img) = self.try_extract_image_from_object(doc, object) {
                images.push(img);
            }
        }

        debug!("found {} images in document", images.len());
        images
    }

    fn try_extract_image_from_object(&self, doc: &Document, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        let subtype = dict.get(b"Subtype").ok()?;
        if subtype.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
        trace!("found image object: {}x{}", width, height);

        let data = match stream.decompressed_content() {
            Ok(d) => d,
            Err(_) => stream.content.clone(),
        };

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) if !arr.is_empty() => {
                    arr.first().and_then(|o| o.as_name().ok())
                }
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    // JPEG data is stored compressed; decode the raw stream.
                    trace!("decoding JPEG image");
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("unsupported image filter, skipping");
                    return None;
                }
                _ => {}
            }
        }

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8) as u8;

        decode_raw_image(&data, width, height, color_space, bits)
    }

    /// Resources dictionary for a page, walking up the page tree for
    /// inherited resources.
    fn page_resources(&self, doc: &Document, page_id: ObjectId) -> Option<lopdf::Dictionary> {
        let mut node_id = page_id;
        loop {
            let node = doc.get_object(node_id).ok()?;
            let Object::Dictionary(dict) = node else {
                return None;
            };

            if let Ok(resources) = dict.get(b"Resources") {
                if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                    return Some(res_dict.clone());
                }
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => node_id = *parent_id,
                _ => return None,
            }
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Some sources encrypt with an empty password; those are readable.
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(PdfError::InvalidPage(page));
        }

        let full_text = self.extract_text()?;

        // pdf-extract separates pages with form feeds when the document
        // structure allows; fall back to an even split by lines otherwise.
        let chunks: Vec<&str> = full_text.split(PAGE_BREAK).collect();
        if chunks.len() == page_count as usize {
            return Ok(chunks[(page - 1) as usize].trim().to_string());
        }

        let lines: Vec<&str> = full_text.lines().collect();
        let lines_per_page = lines.len().div_ceil(page_count as usize).max(1);
        let start = ((page - 1) as usize) * lines_per_page;
        let end = (page as usize) * lines_per_page;

        Ok(lines[start.min(lines.len())..end.min(lines.len())].join("\n"))
    }

    fn page_raster(&self, page: u32) -> Result<DynamicImage> {
        // Scanned documents embed the page scan as the dominant image on
        // the page; pick the largest by pixel area.
        let images = self.extract_images(page)?;
        if let Some(largest) = images
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
        {
            return Ok(largest);
        }

        // No per-page images; fall back to document order.
        let all_images = self.extract_all_images();
        let page_idx = (page - 1) as usize;
        if page_idx < all_images.len() {
            if let Some(img) = all_images.into_iter().nth(page_idx) {
                return Ok(img);
            }
        }

        Err(PdfError::RasterExtraction(format!(
            "no raster image found for page {}",
            page
        )))
    }

    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let doc = self.document()?;

        let pages = doc.get_pages();
        let page_id = pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let mut images = Vec::new();
        if let Some(resources) = self.page_resources(doc, *page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = doc.dereference(obj_ref) {
                            if let Some(img) = self.try_extract_image_from_object(doc, obj) {
                                images.push(img);
                            }
                        }
                    }
                }
            }
        }

        debug!("extracted {} images from page {}", images.len(), page);
        Ok(images)
    }

    fn has_digital_signature(&self) -> bool {
        let doc = match self.document.as_ref() {
            Some(d) => d,
            None => return false,
        };

        for (_, object) in doc.objects.iter() {
            let dict = match object {
                Object::Dictionary(d) => d,
                Object::Stream(s) => &s.dict,
                _ => continue,
            };

            let is_sig_type = dict
                .get(b"Type")
                .ok()
                .and_then(|o| o.as_name().ok())
                .is_some_and(|n| n == b"Sig");
            let is_sig_field = dict
                .get(b"FT")
                .ok()
                .and_then(|o| o.as_name().ok())
                .is_some_and(|n| n == b"Sig");
            let has_byte_range = dict.has(b"ByteRange") && dict.has(b"Contents");

            if is_sig_type || is_sig_field || has_byte_range {
                debug!("document carries a digital signature field");
                return true;
            }
        }

        false
    }
}

/// Decode an uncompressed image stream into an RGB buffer.
fn decode_raw_image(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    trace!(
        "decoding raw image: {}x{}, colorspace={:?}, bits={}",
        width,
        height,
        String::from_utf8_lossy(color_space),
        bits_per_component
    );

    if bits_per_component != 8 {
        trace!("unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = (width as usize) * (height as usize);
    let expected_rgb = pixels * 3;

    if color_space == b"DeviceRGB" || color_space == b"RGB" {
        if data.len() >= expected_rgb {
            return ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data[..expected_rgb].to_vec())
                .map(DynamicImage::ImageRgb8);
        }
    } else if color_space == b"DeviceGray" || color_space == b"G" {
        if data.len() >= pixels {
            let mut rgb = Vec::with_capacity(expected_rgb);
            for &gray in data[..pixels].iter() {
                rgb.extend_from_slice(&[gray, gray, gray]);
            }
            return ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8);
        }
    }

    trace!(
        "could not decode image: data_len={}, expected_rgb={}",
        data.len(),
        expected_rgb
    );
    None
}
