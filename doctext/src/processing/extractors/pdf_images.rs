use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, error, info};

use crate::error::{DoctextError, Result};

/// Writes the raster images embedded in a PDF to disk.
///
/// Runs independently of text extraction: a failure here is logged and
/// reported as zero images.
pub struct PdfImageExtractor;

/// Image XObject resolved to what gets written to disk.
enum ImageArtifact {
    /// Stream bytes written as-is under `ext`.
    Encoded { ext: &'static str, bytes: Vec<u8> },
    Gray { width: u32, height: u32, pixels: Vec<u8> },
    Rgb { width: u32, height: u32, pixels: Vec<u8> },
}

/// Colour model of an image's samples.
enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// One index per pixel into `palette`, whose entries are in `base`.
    Indexed { base: Box<ColorModel>, palette: Vec<u8> },
}

impl PdfImageExtractor {
    /// Best-effort variant used by the batch driver and the upload handler.
    pub fn extract(path: &Path, output_root: &Path) -> usize {
        match Self::try_extract(path, output_root) {
            Ok(count) => count,
            Err(e) => {
                error!(file = %path.display(), "Image extraction failed: {}", e);
                0
            }
        }
    }

    pub fn try_extract(path: &Path, output_root: &Path) -> Result<usize> {
        let doc = Document::load(path)
            .map_err(|e| DoctextError::Open(format!("{}: {e}", path.display())))?;

        let out_dir = Self::output_dir(path, output_root);
        std::fs::create_dir_all(&out_dir).map_err(|source| DoctextError::Write {
            path: out_dir.clone(),
            source,
        })?;

        let mut written = 0;
        for (page_index, (_, page_id)) in doc.get_pages().into_iter().enumerate() {
            for (image_index, (name, stream)) in page_images(&doc, page_id).into_iter().enumerate()
            {
                let artifact = classify(&doc, stream);
                if matches!(artifact, ImageArtifact::Encoded { ext: "raw", .. }) {
                    debug!(
                        page = page_index + 1,
                        xobject = %name,
                        "Image encoding not convertible; writing stream data"
                    );
                }

                let stem = format!("page{}_img{}", page_index + 1, image_index + 1);
                write_artifact(&out_dir, &stem, artifact)?;
                written += 1;
            }
        }

        info!(
            "Extracted {} image(s) from '{}' into: {}",
            written,
            path.file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default(),
            out_dir.display()
        );
        Ok(written)
    }

    /// `<output_root>/<stem>_images`
    pub fn output_dir(path: &Path, output_root: &Path) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        output_root.join(format!("{stem}_images"))
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resources of a page, following the `/Parent` chain for inherited ones.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    loop {
        if let Some(Object::Dictionary(resources)) =
            node.get(b"Resources").ok().and_then(|o| resolve(doc, o))
        {
            return Some(resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
}

/// Image XObjects referenced by a page, in resource order.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<(String, &Stream)> {
    let Some(resources) = page_resources(doc, page_id) else {
        return Vec::new();
    };
    let Some(Object::Dictionary(xobjects)) =
        resources.get(b"XObject").ok().and_then(|o| resolve(doc, o))
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, obj)| match resolve(doc, obj)? {
            Object::Stream(stream) if name_of(stream.dict.get(b"Subtype").ok()) == Some("Image") => {
                Some((String::from_utf8_lossy(name).into_owned(), stream))
            }
            _ => None,
        })
        .collect()
}

fn name_of(obj: Option<&Object>) -> Option<&str> {
    match obj? {
        Object::Name(name) => std::str::from_utf8(name).ok(),
        Object::Array(items) => name_of(items.last()),
        _ => None,
    }
}

fn integer_of(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match dict.get(key).ok()? {
        Object::Integer(v) => Some(*v),
        _ => None,
    }
}

impl ColorModel {
    fn components(&self) -> usize {
        match self {
            Self::Gray | Self::Indexed { .. } => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }

    /// `sample` holds `components()` 8-bit values.
    fn to_rgb(&self, sample: &[u8]) -> Option<[u8; 3]> {
        match self {
            Self::Gray => Some([sample[0]; 3]),
            Self::Rgb => Some([sample[0], sample[1], sample[2]]),
            Self::Cmyk => Some(cmyk_to_rgb(sample)),
            Self::Indexed { base, palette } => {
                let n = base.components();
                let start = usize::from(sample[0]) * n;
                base.to_rgb(palette.get(start..start + n)?)
            }
        }
    }
}

fn color_model(doc: &Document, obj: &Object) -> Option<ColorModel> {
    match resolve(doc, obj)? {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(ColorModel::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(ColorModel::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(ColorModel::Cmyk),
            _ => None,
        },
        Object::Array(items) => {
            let Object::Name(family) = items.first()? else {
                return None;
            };
            match family.as_slice() {
                b"ICCBased" => {
                    let Object::Stream(profile) = resolve(doc, items.get(1)?)? else {
                        return None;
                    };
                    match integer_of(&profile.dict, b"N") {
                        Some(1) => Some(ColorModel::Gray),
                        Some(3) => Some(ColorModel::Rgb),
                        Some(4) => Some(ColorModel::Cmyk),
                        _ => color_model(doc, profile.dict.get(b"Alternate").ok()?),
                    }
                }
                b"CalGray" => Some(ColorModel::Gray),
                b"CalRGB" => Some(ColorModel::Rgb),
                b"Indexed" | b"I" => {
                    let base = color_model(doc, items.get(1)?)?;
                    if matches!(base, ColorModel::Indexed { .. }) {
                        return None;
                    }
                    let palette = match resolve(doc, items.get(3)?)? {
                        Object::String(bytes, _) => bytes.clone(),
                        Object::Stream(lookup) => lookup
                            .decompressed_content()
                            .unwrap_or_else(|_| lookup.content.clone()),
                        _ => return None,
                    };
                    Some(ColorModel::Indexed {
                        base: Box::new(base),
                        palette,
                    })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn cmyk_to_rgb(sample: &[u8]) -> [u8; 3] {
    let k = 255 - u16::from(sample[3]);
    let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
    [channel(sample[0]), channel(sample[1]), channel(sample[2])]
}

/// One byte per sample. Rows are padded to a byte boundary.
fn unpack_samples(
    data: &[u8],
    width: usize,
    height: usize,
    components: usize,
    bits: u8,
) -> Option<Vec<u8>> {
    let per_row = width.checked_mul(components)?;
    if per_row == 0 || height == 0 {
        return None;
    }
    let row_bytes = (per_row * usize::from(bits)).div_ceil(8);
    if data.len() < row_bytes.checked_mul(height)? {
        return None;
    }
    if bits == 8 {
        return Some(data[..per_row * height].to_vec());
    }

    let mask = (1u16 << bits) - 1;
    let mut samples = Vec::with_capacity(per_row * height);
    for row in data.chunks_exact(row_bytes).take(height) {
        for i in 0..per_row {
            let bit = i * usize::from(bits);
            let shift = 8 - usize::from(bits) - bit % 8;
            samples.push(((u16::from(row[bit / 8]) >> shift) & mask) as u8);
        }
    }
    Some(samples)
}

/// Stretches `bits`-deep samples to the 0..=255 range.
fn scale(samples: Vec<u8>, bits: u8) -> Vec<u8> {
    if bits == 8 {
        return samples;
    }
    let max = (1u16 << bits) - 1;
    samples
        .into_iter()
        .map(|v| (u16::from(v) * 255 / max) as u8)
        .collect()
}

fn classify(doc: &Document, stream: &Stream) -> ImageArtifact {
    let dict = &stream.dict;
    let verbatim = |ext: &'static str| ImageArtifact::Encoded {
        ext,
        bytes: stream.content.clone(),
    };
    match name_of(dict.get(b"Filter").ok()) {
        Some("DCTDecode") => return verbatim("jpg"),
        Some("JPXDecode") => return verbatim("jp2"),
        Some("JBIG2Decode") => return verbatim("jb2"),
        Some("CCITTFaxDecode") => return verbatim("ccitt"),
        Some("FlateDecode") | Some("LZWDecode") | None => {}
        Some(_) => return verbatim("raw"),
    }

    let data = if dict.get(b"Filter").is_ok() {
        match decode_image_data(stream) {
            Ok(data) => data,
            Err(e) => {
                debug!("Failed to decode image stream: {}", e);
                return verbatim("raw");
            }
        }
    } else {
        stream.content.clone()
    };

    match to_raster(doc, dict, &data) {
        Some(artifact) => artifact,
        None => ImageArtifact::Encoded {
            ext: "raw",
            bytes: data,
        },
    }
}

/// lopdf refuses to decode streams whose subtype is `Image`.
fn decode_image_data(stream: &Stream) -> lopdf::Result<Vec<u8>> {
    let mut dict = stream.dict.clone();
    dict.remove(b"Subtype");
    Stream::new(dict, stream.content.clone()).decompressed_content()
}

/// Decoded samples converted to 8-bit gray or RGB pixels.
fn to_raster(doc: &Document, dict: &Dictionary, data: &[u8]) -> Option<ImageArtifact> {
    let width = u32::try_from(integer_of(dict, b"Width")?).ok()?;
    let height = u32::try_from(integer_of(dict, b"Height")?).ok()?;

    let stencil = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let (model, bpc) = if stencil {
        (ColorModel::Gray, 1)
    } else {
        (
            color_model(doc, dict.get(b"ColorSpace").ok()?)?,
            integer_of(dict, b"BitsPerComponent")?,
        )
    };
    let bits = u8::try_from(bpc)
        .ok()
        .filter(|b| matches!(b, 1 | 2 | 4 | 8))?;

    let samples = unpack_samples(
        data,
        width as usize,
        height as usize,
        model.components(),
        bits,
    )?;

    let pixels = match &model {
        ColorModel::Gray => {
            return Some(ImageArtifact::Gray {
                width,
                height,
                pixels: scale(samples, bits),
            })
        }
        ColorModel::Rgb => scale(samples, bits),
        ColorModel::Cmyk => scale(samples, bits)
            .chunks_exact(4)
            .flat_map(cmyk_to_rgb)
            .collect(),
        ColorModel::Indexed { .. } => {
            let mut pixels = Vec::with_capacity(samples.len() * 3);
            for index in samples.chunks_exact(1) {
                pixels.extend(model.to_rgb(index)?);
            }
            pixels
        }
    };

    Some(ImageArtifact::Rgb {
        width,
        height,
        pixels,
    })
}

fn write_artifact(dir: &Path, stem: &str, artifact: ImageArtifact) -> Result<()> {
    let (path, saved) = match artifact {
        ImageArtifact::Encoded { ext, bytes } => {
            let path = dir.join(format!("{stem}.{ext}"));
            return std::fs::write(&path, bytes)
                .map_err(|source| DoctextError::Write { path, source });
        }
        ImageArtifact::Gray {
            width,
            height,
            pixels,
        } => {
            let path = dir.join(format!("{stem}.png"));
            let saved = GrayImage::from_raw(width, height, pixels)
                .map(|img| img.save_with_format(&path, ImageFormat::Png));
            (path, saved)
        }
        ImageArtifact::Rgb {
            width,
            height,
            pixels,
        } => {
            let path = dir.join(format!("{stem}.png"));
            let saved = RgbImage::from_raw(width, height, pixels)
                .map(|img| img.save_with_format(&path, ImageFormat::Png));
            (path, saved)
        }
    };

    match saved {
        Some(Ok(())) => Ok(()),
        Some(Err(e)) => Err(DoctextError::Internal(format!(
            "Failed to encode {}: {e}",
            path.display()
        ))),
        None => Err(DoctextError::Internal(format!(
            "Pixel buffer does not match image size for {}",
            path.display()
        ))),
    }
}
