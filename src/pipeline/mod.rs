//! Pipeline stages for booklet assembly.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets the two PDF
//! stages run without any network access.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ (remote copy/edit/export) ──▶ startpages ──▶ merge ──▶ stamp
//! (doc id)        (drive + docs)            (template)    (lopdf)   (lopdf)
//! ```
//!
//! 1. [`extract`]    — pull the opaque document id out of the submitted URL
//! 2. [`startpages`] — instantiate the start-pages template with the
//!    request's placeholder map
//! 3. [`merge`]      — concatenate [start, body, end] page-for-page,
//!    content streams untouched
//! 4. [`stamp`]      — overlay a centred italic page number on each page

pub mod extract;
pub mod merge;
pub mod stamp;
pub mod startpages;

use lopdf::{Document, Object, ObjectId};

/// Page attributes a Page may inherit from its Pages ancestors rather than
/// carry itself (PDF 32000-1 §7.7.3.4).
pub(crate) const INHERITABLE_PAGE_KEYS: [&[u8]; 4] =
    [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Look up a page attribute, following the Parent chain (bounded, so a
/// malformed cyclic tree cannot loop forever). References are dereferenced
/// one level, which covers every structure Docs exports produce.
pub(crate) fn lookup_inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    for _ in 0..10 {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return match value {
                Object::Reference(r) => doc.get_object(*r).ok().cloned(),
                other => Some(other.clone()),
            };
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// Synthesised PDFs for the merge/stamp tests — small real documents built
/// with lopdf so the assertions run against actual page trees, not mocks.
#[cfg(test)]
pub(crate) mod pdftest {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Build an N-page PDF whose page `i` (1-based) shows `"{label} {i}"`.
    pub fn sample_pdf(pages: usize, label: &str) -> Vec<u8> {
        build_pdf(pages, label, false)
    }

    /// Like [`sample_pdf`], but MediaBox (400x600) and Resources live only
    /// on the Pages node; the pages inherit both.
    pub fn sample_pdf_inherited(pages: usize, label: &str) -> Vec<u8> {
        build_pdf(pages, label, true)
    }

    fn build_pdf(pages: usize, label: &str, inherit_attrs: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for i in 1..=pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 500.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("{label} {i}"))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content"),
            ));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if !inherit_attrs {
                page.set(
                    "MediaBox",
                    vec![0.into(), 0.into(), 612.into(), 792.into()],
                );
                page.set("Resources", resources_id);
            }
            kids.push(doc.add_object(page).into());
        }

        let mut pages_node = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        };
        if inherit_attrs {
            pages_node.set(
                "MediaBox",
                vec![0.into(), 0.into(), 400.into(), 600.into()],
            );
            pages_node.set("Resources", resources_id);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages_node));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save sample pdf");
        out
    }
}
