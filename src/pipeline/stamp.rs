//! Page-number stamping.
//!
//! Each stamped page gets one extra content stream appended after the
//! original ones: a save/restore-wrapped text block that draws the page
//! number in 9 pt italic, horizontally centred from the font's measured
//! string width, baseline 30 pt above the page's bottom edge. The original
//! content streams are never touched, so everything already on the page
//! renders unchanged underneath the label.
//!
//! The label font comes from [`FontPolicy`]: either the bundled italic TTF
//! (parsed for glyph metrics, embedded in the output as a TrueType simple
//! font) or the built-in Times-Italic base-14 font, which every viewer
//! ships and which needs no embedding.

use crate::config::{FontPolicy, NumberingPolicy};
use crate::error::BookletError;
use crate::pipeline::lookup_inherited;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::{debug, info};

/// Label size in points.
const LABEL_FONT_SIZE: f32 = 9.0;
/// Label baseline height above the page's bottom edge, in points.
const LABEL_BASELINE_Y: f32 = 30.0;
/// Resource name the label font is registered under on each page.
const LABEL_FONT_KEY: &str = "FPgNum";
/// US Letter, used when no media box is resolvable anywhere in the tree.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// In Times-Italic every digit advances 500/1000 em (standard AFM metrics).
const BUILTIN_DIGIT_ADVANCE: f32 = 500.0;

fn pdf_error(detail: impl std::fmt::Display) -> BookletError {
    BookletError::PdfProcessing {
        stage: "stamp",
        detail: detail.to_string(),
    }
}

// ── Fonts ─────────────────────────────────────────────────────────────────

/// A font usable for the page-number label: digit metrics plus the ability
/// to register itself in an output document.
pub enum StampFont {
    /// Parsed TTF, embedded into the output PDF.
    Embedded {
        base_name: String,
        data: Vec<u8>,
        units_per_em: f32,
        /// Advance widths for '0'..='9' in font units.
        digit_advances: [f32; 10],
        ascender: i16,
        descender: i16,
        cap_height: i16,
        bbox: [i16; 4],
    },
    /// Times-Italic base-14; metrics are the published AFM values.
    BuiltinItalic,
}

impl StampFont {
    /// Load the font the policy names. A missing bundled file is
    /// [`BookletError::ResourceMissing`]; a file that is not a parseable
    /// TrueType font is [`BookletError::FontUnusable`].
    pub fn load(policy: &FontPolicy) -> Result<Self, BookletError> {
        match policy {
            FontPolicy::BuiltinItalic => Ok(StampFont::BuiltinItalic),
            FontPolicy::Bundled(path) => Self::load_ttf(path),
        }
    }

    fn load_ttf(path: &Path) -> Result<Self, BookletError> {
        let data = std::fs::read(path).map_err(|_| BookletError::ResourceMissing {
            path: path.to_path_buf(),
        })?;
        let unusable = |detail: String| BookletError::FontUnusable {
            path: path.to_path_buf(),
            detail,
        };

        let face = ttf_parser::Face::parse(&data, 0).map_err(|e| unusable(e.to_string()))?;
        let units_per_em = face.units_per_em() as f32;

        let mut digit_advances = [0f32; 10];
        for (i, ch) in ('0'..='9').enumerate() {
            let glyph = face
                .glyph_index(ch)
                .ok_or_else(|| unusable(format!("font has no glyph for '{ch}'")))?;
            digit_advances[i] = face.glyph_hor_advance(glyph).unwrap_or(0) as f32;
        }

        let bbox = face.global_bounding_box();
        let base_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().replace(' ', "-"))
            .unwrap_or_else(|| "StampFont".to_string());

        debug!(font = %base_name, units_per_em, "Loaded stamp font");
        Ok(StampFont::Embedded {
            base_name,
            units_per_em,
            digit_advances,
            ascender: face.ascender(),
            descender: face.descender(),
            cap_height: face.capital_height().unwrap_or(face.ascender()),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            data,
        })
    }

    /// Rendered width of `text` at `size` points. Only digits carry exact
    /// metrics; anything else measures as a digit, which is fine for labels.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let advance_units: f32 = text
            .chars()
            .map(|ch| match self {
                StampFont::Embedded { digit_advances, .. } => {
                    let idx = ch.to_digit(10).unwrap_or(0) as usize;
                    digit_advances[idx]
                }
                StampFont::BuiltinItalic => BUILTIN_DIGIT_ADVANCE,
            })
            .sum();
        advance_units * size / self.units_per_em()
    }

    fn units_per_em(&self) -> f32 {
        match self {
            StampFont::Embedded { units_per_em, .. } => *units_per_em,
            StampFont::BuiltinItalic => 1000.0,
        }
    }

    /// Add this font's objects to `doc`, returning the font dictionary id
    /// to reference from page resources.
    fn register(&self, doc: &mut Document) -> ObjectId {
        match self {
            StampFont::BuiltinItalic => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Times-Italic",
            }),
            StampFont::Embedded {
                base_name,
                data,
                units_per_em,
                digit_advances,
                ascender,
                descender,
                cap_height,
                bbox,
            } => {
                let scale = 1000.0 / *units_per_em;
                let font_file = doc.add_object(Stream::new(
                    dictionary! { "Length1" => data.len() as i64 },
                    data.clone(),
                ));
                let name = Object::Name(base_name.clone().into_bytes());
                let descriptor = doc.add_object(dictionary! {
                    "Type" => "FontDescriptor",
                    "FontName" => name.clone(),
                    // Nonsymbolic + italic
                    "Flags" => 96_i64,
                    "ItalicAngle" => -12_i64,
                    "Ascent" => (*ascender as f32 * scale) as i64,
                    "Descent" => (*descender as f32 * scale) as i64,
                    "CapHeight" => (*cap_height as f32 * scale) as i64,
                    "StemV" => 80_i64,
                    "FontBBox" => bbox
                        .iter()
                        .map(|v| Object::Integer((*v as f32 * scale) as i64))
                        .collect::<Vec<_>>(),
                    "FontFile2" => font_file,
                });
                let widths: Vec<Object> = digit_advances
                    .iter()
                    .map(|w| Object::Integer((w * scale) as i64))
                    .collect();
                doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "TrueType",
                    "BaseFont" => name,
                    "FirstChar" => 48_i64,
                    "LastChar" => 57_i64,
                    "Widths" => widths,
                    "Encoding" => "WinAnsiEncoding",
                    "FontDescriptor" => descriptor,
                })
            }
        }
    }
}

impl std::fmt::Debug for StampFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StampFont::Embedded { base_name, .. } => {
                f.debug_struct("StampFont::Embedded").field("base_name", base_name).finish()
            }
            StampFont::BuiltinItalic => f.write_str("StampFont::BuiltinItalic"),
        }
    }
}

// ── Stamping ──────────────────────────────────────────────────────────────

/// Overlay a centred page-number label on each page per the numbering
/// policy. Returns the rewritten PDF; page count and original content are
/// preserved exactly.
pub fn stamp_page_numbers(
    pdf: &[u8],
    font: &StampFont,
    numbering: NumberingPolicy,
) -> Result<Vec<u8>, BookletError> {
    let mut doc = Document::load_mem(pdf).map_err(pdf_error)?;
    let pages = doc.get_pages();
    let font_id = font.register(&mut doc);

    let mut stamped = 0usize;
    for (&page_num, &page_id) in &pages {
        if numbering == NumberingPolicy::SkipFirst && page_num == 1 {
            continue;
        }
        let label = page_num.to_string();
        let media_box = resolve_media_box(&doc, page_id);
        let page_width = (media_box[2] - media_box[0]) as f32;
        let x = media_box[0] as f32 + (page_width - font.text_width(&label, LABEL_FONT_SIZE)) / 2.0;

        let content = label_content(&label, x);
        append_page_content(&mut doc, page_id, content.into_bytes())?;
        add_font_resource(&mut doc, page_id, font_id)?;
        stamped += 1;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output).map_err(pdf_error)?;
    info!(pages = pages.len(), stamped, "Page numbers stamped");
    Ok(output)
}

/// The label's content stream: an isolated graphics state drawing one
/// text run at the computed position.
fn label_content(label: &str, x: f32) -> String {
    format!(
        "q\nBT\n/{LABEL_FONT_KEY} {LABEL_FONT_SIZE} Tf\n{x:.2} {LABEL_BASELINE_Y} Td\n({label}) Tj\nET\nQ\n"
    )
}

/// Append a content stream to a page, preserving the existing streams.
///
/// `Contents` may be a direct array, a reference to a stream, or a
/// reference to an array object; the referenced array is flattened into a
/// direct one, since array elements must reference streams.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), BookletError> {
    let stream_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content)));

    let existing = doc
        .get_dictionary(page_id)
        .map_err(pdf_error)?
        .get(b"Contents")
        .ok()
        .cloned();
    let contents = match existing {
        Some(Object::Reference(first)) => match doc.get_object(first) {
            Ok(Object::Array(streams)) => {
                let mut streams = streams.clone();
                streams.push(Object::Reference(stream_id));
                Object::Array(streams)
            }
            _ => Object::Array(vec![
                Object::Reference(first),
                Object::Reference(stream_id),
            ]),
        },
        Some(Object::Array(mut streams)) => {
            streams.push(Object::Reference(stream_id));
            Object::Array(streams)
        }
        _ => Object::Reference(stream_id),
    };

    doc.get_dictionary_mut(page_id)
        .map_err(pdf_error)?
        .set("Contents", contents);
    Ok(())
}

/// Register the label font in the page's resources without disturbing the
/// fonts already there. Inherited resources are materialised onto the page
/// first so shared dictionaries in the Pages tree are never mutated.
fn add_font_resource(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<(), BookletError> {
    let mut resources = lookup_inherited(doc, page_id, b"Resources")
        .and_then(|obj| match obj {
            Object::Dictionary(d) => Some(d),
            _ => None,
        })
        .unwrap_or_default();

    let mut fonts = match resources.get(b"Font") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(r)) => doc.get_dictionary(*r).cloned().unwrap_or_default(),
        _ => Dictionary::new(),
    };
    fonts.set(LABEL_FONT_KEY, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    doc.get_dictionary_mut(page_id)
        .map_err(pdf_error)?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Media box for a page, walking up the Pages tree for inherited values.
fn resolve_media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let Some(Object::Array(values)) = lookup_inherited(doc, page_id, b"MediaBox") else {
        return DEFAULT_MEDIA_BOX;
    };
    if values.len() != 4 {
        return DEFAULT_MEDIA_BOX;
    }
    let mut media_box = DEFAULT_MEDIA_BOX;
    for (slot, value) in media_box.iter_mut().zip(&values) {
        match value {
            Object::Integer(i) => *slot = *i as f64,
            Object::Real(r) => *slot = *r as f64,
            _ => return DEFAULT_MEDIA_BOX,
        }
    }
    media_box
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pdftest::sample_pdf;

    fn page_text(pdf: &[u8], page_num: u32) -> String {
        let doc = Document::load_mem(pdf).unwrap();
        let pages = doc.get_pages();
        let page_id = pages[&page_num];
        String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
    }

    #[test]
    fn skip_first_labels_later_pages_only() {
        let pdf = sample_pdf(3, "body");
        let out =
            stamp_page_numbers(&pdf, &StampFont::BuiltinItalic, NumberingPolicy::SkipFirst)
                .unwrap();

        let doc = Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 3);

        let first = page_text(&out, 1);
        assert!(first.contains("(body 1)"), "original content preserved");
        assert!(!first.contains(LABEL_FONT_KEY), "first page left unstamped");

        for n in 2..=3u32 {
            let text = page_text(&out, n);
            assert!(text.contains(&format!("(body {n})")), "page {n} content intact");
            assert!(text.contains(&format!("({n}) Tj")), "page {n} labelled");
            assert!(text.contains(LABEL_FONT_KEY));
        }
    }

    #[test]
    fn all_pages_policy_labels_the_first_page() {
        let pdf = sample_pdf(2, "body");
        let out =
            stamp_page_numbers(&pdf, &StampFont::BuiltinItalic, NumberingPolicy::AllPages)
                .unwrap();
        assert!(page_text(&out, 1).contains("(1) Tj"));
        assert!(page_text(&out, 2).contains("(2) Tj"));
    }

    #[test]
    fn label_is_horizontally_centred() {
        // Times-Italic digits are 500/1000 em: "2" at 9 pt is 4.5 pt wide,
        // so on a 612 pt page the label starts at (612 - 4.5) / 2 = 303.75.
        let pdf = sample_pdf(2, "body");
        let out =
            stamp_page_numbers(&pdf, &StampFont::BuiltinItalic, NumberingPolicy::SkipFirst)
                .unwrap();
        assert!(page_text(&out, 2).contains("303.75 30 Td"));
    }

    #[test]
    fn stamp_font_resource_added_without_clobbering_existing_fonts() {
        let pdf = sample_pdf(2, "body");
        let out =
            stamp_page_numbers(&pdf, &StampFont::BuiltinItalic, NumberingPolicy::SkipFirst)
                .unwrap();
        let doc = Document::load_mem(&out).unwrap();
        let page_id = doc.get_pages()[&2];
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.get(LABEL_FONT_KEY.as_bytes()).is_ok());
        assert!(fonts.get(b"F1").is_ok(), "original font survives");
    }

    #[test]
    fn contents_reference_to_array_is_flattened() {
        // Legal but uncommon: the page's Contents is a reference to an
        // array object rather than a direct array of stream references.
        let mut src = Document::with_version("1.5");
        let pages_id = src.new_object_id();
        let content_id = src.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            b"BT (orig) Tj ET".to_vec(),
        )));
        let array_id = src.add_object(Object::Array(vec![Object::Reference(content_id)]));
        let page_id = src.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(array_id),
        });
        src.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1_i64,
            }),
        );
        let catalog_id = src.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        src.trailer.set("Root", catalog_id);
        let mut pdf = Vec::new();
        src.save_to(&mut pdf).unwrap();

        let out =
            stamp_page_numbers(&pdf, &StampFont::BuiltinItalic, NumberingPolicy::AllPages)
                .unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let page_id = doc.get_pages()[&1];
        let page = doc.get_dictionary(page_id).unwrap();
        let streams = page.get(b"Contents").unwrap().as_array().unwrap();
        assert_eq!(streams.len(), 2, "original stream + label stream");
        let first = doc
            .get_object(streams[0].as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        assert!(
            String::from_utf8_lossy(&first.content).contains("(orig)"),
            "original content kept first"
        );
        let second = doc
            .get_object(streams[1].as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        assert!(String::from_utf8_lossy(&second.content).contains("(1) Tj"));
    }

    #[test]
    fn builtin_text_width_uses_afm_digit_advance() {
        let font = StampFont::BuiltinItalic;
        assert_eq!(font.text_width("12", 9.0), 9.0);
        assert_eq!(font.text_width("7", 10.0), 5.0);
    }

    #[test]
    fn missing_bundled_font_is_resource_missing() {
        let policy = FontPolicy::Bundled("/nonexistent/Lora-Italic.ttf".into());
        let err = StampFont::load(&policy).unwrap_err();
        assert!(matches!(err, BookletError::ResourceMissing { .. }));
    }

    #[test]
    fn garbage_font_file_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        let err = StampFont::load(&FontPolicy::Bundled(path)).unwrap_err();
        assert!(matches!(err, BookletError::FontUnusable { .. }));
    }
}
