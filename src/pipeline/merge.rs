//! PDF concatenation.
//!
//! Merging rebuilds the object table, not the page content: every source
//! document is renumbered into a disjoint id range, its page objects are
//! re-parented under one new `Pages` node, and the original content
//! streams are carried over byte-for-byte. Nothing is re-encoded, so the
//! merged booklet renders each page exactly as its source did.
//!
//! Page order is the order the sources were given, and within each source
//! its own page order — pages are collected in page-number order, never by
//! object id, since object ids carry no ordering guarantee.

use crate::error::BookletError;
use crate::pipeline::{lookup_inherited, INHERITABLE_PAGE_KEYS};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info};

fn pdf_error(stage: &'static str, detail: impl std::fmt::Display) -> BookletError {
    BookletError::PdfProcessing {
        stage,
        detail: detail.to_string(),
    }
}

/// Number of pages in a PDF byte sequence.
pub fn page_count(pdf: &[u8]) -> Result<usize, BookletError> {
    let doc = Document::load_mem(pdf).map_err(|e| pdf_error("page-count", e))?;
    Ok(doc.get_pages().len())
}

/// Concatenate an ordered list of PDF byte sources into one PDF.
///
/// Absent (`None`) and zero-length sources are skipped — the end pages are
/// optional and a caller may pass a fixed-shape slice. Fails with
/// [`BookletError::NoInputPages`] when nothing usable remains.
pub fn merge_documents(sources: &[Option<Vec<u8>>]) -> Result<Vec<u8>, BookletError> {
    let documents: Vec<Document> = sources
        .iter()
        .filter_map(|source| source.as_deref())
        .filter(|bytes| !bytes.is_empty())
        .map(|bytes| Document::load_mem(bytes).map_err(|e| pdf_error("merge", e)))
        .collect::<Result<_, _>>()?;

    if documents.is_empty() {
        return Err(BookletError::NoInputPages);
    }
    debug!(sources = documents.len(), "Merging PDF sources");

    let mut merged = Document::with_version("1.5");
    let mut max_id = 1;
    // (id, object) pairs in final page order.
    let mut ordered_pages: Vec<(ObjectId, Object)> = Vec::new();

    for mut doc in documents {
        // Shift this document's ids past everything already collected so
        // the object tables can be unioned without collisions.
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_page_num, page_id) in doc.get_pages() {
            let mut page = doc
                .get_object(page_id)
                .and_then(Object::as_dict)
                .map_err(|e| pdf_error("merge", e))?
                .clone();
            // The source Pages tree is discarded below, so attributes a page
            // inherits from its ancestors (MediaBox, Resources, CropBox,
            // Rotate) must be resolved onto the page itself or they are lost.
            for key in INHERITABLE_PAGE_KEYS {
                if !page.has(key) {
                    if let Some(value) = lookup_inherited(&doc, page_id, key) {
                        page.set(key, value);
                    }
                }
            }
            ordered_pages.push((page_id, Object::Dictionary(page)));
        }

        // Carry every supporting object (fonts, images, content streams).
        // Catalog/Pages roots and outlines are rebuilt below instead.
        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    merged.objects.insert(object_id, object);
                }
            }
        }
    }

    if ordered_pages.is_empty() {
        return Err(BookletError::NoInputPages);
    }

    // One fresh Pages node parenting every collected page, in order.
    let pages_id = merged.new_object_id();
    for (page_id, page) in &ordered_pages {
        let mut dictionary = page
            .as_dict()
            .map_err(|e| pdf_error("merge", e))?
            .clone();
        dictionary.set("Parent", pages_id);
        merged
            .objects
            .insert(*page_id, Object::Dictionary(dictionary));
    }

    let kids: Vec<Object> = ordered_pages
        .iter()
        .map(|(page_id, _)| Object::Reference(*page_id))
        .collect();
    let mut pages_dict = lopdf::Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", ordered_pages.len() as i64);
    pages_dict.set("Kids", kids);
    merged
        .objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = lopdf::Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    let catalog_id = merged.add_object(Object::Dictionary(catalog_dict));

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.compress();

    let mut output = Vec::new();
    merged
        .save_to(&mut output)
        .map_err(|e| pdf_error("merge", e))?;
    info!(pages = ordered_pages.len(), bytes = output.len(), "Merged PDF written");
    Ok(output)
}
