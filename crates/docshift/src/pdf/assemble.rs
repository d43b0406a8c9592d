//! Builds a fresh PDF out of pages taken from one or more source documents.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::error::{PdfError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against malformed page trees with `Parent` cycles.
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// Accumulates pages from several documents, keeping them in the order they were added.
pub(crate) struct PageAssembler {
    next_id: u32,
    page_order: Vec<ObjectId>,
    pages: BTreeMap<ObjectId, Dictionary>,
    objects: BTreeMap<ObjectId, Object>,
}

impl PageAssembler {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            page_order: Vec::new(),
            pages: BTreeMap::new(),
            objects: BTreeMap::new(),
        }
    }

    pub(crate) fn page_count(&self) -> usize {
        self.page_order.len()
    }

    /// Append the given 1-based pages of `document`, in the order listed.
    ///
    /// Object ids are renumbered so they never collide with previously added documents.
    pub(crate) fn append(&mut self, mut document: Document, page_numbers: &[u32]) -> Result<()> {
        document.renumber_objects_with(self.next_id);
        self.next_id = document.max_id + 1;

        let page_map = document.get_pages();
        for number in page_numbers {
            let page_id = *page_map
                .get(number)
                .ok_or_else(|| PdfError::InvalidPdf(format!("page {} not found", number)))?;
            let page = flatten_page(&document, page_id)?;
            self.page_order.push(page_id);
            self.pages.insert(page_id, page);
        }

        for (object_id, object) in document.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    self.objects.insert(object_id, object);
                }
            }
        }

        Ok(())
    }

    /// Write the accumulated pages as a single new document.
    pub(crate) fn finish(self) -> Result<Vec<u8>> {
        if self.page_order.is_empty() {
            return Err(PdfError::NoPages);
        }

        let mut document = Document::with_version("1.5");
        document.max_id = self.next_id;

        for (object_id, object) in self.objects {
            document.objects.insert(object_id, object);
        }

        let pages_id = document.new_object_id();

        for (page_id, mut page) in self.pages {
            page.set("Parent", Object::Reference(pages_id));
            document.objects.insert(page_id, Object::Dictionary(page));
        }

        let kids: Vec<Object> = self.page_order.iter().map(|&id| Object::Reference(id)).collect();
        let page_tree = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
        ]);
        document.objects.insert(pages_id, Object::Dictionary(page_tree));

        let catalog_id = document.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        document.trailer.set("Root", Object::Reference(catalog_id));

        document.prune_objects();
        document.renumber_objects();
        document.compress();

        let mut output = Vec::new();
        document
            .save_to(&mut output)
            .map_err(|e| PdfError::SaveFailed(e.to_string()))?;

        Ok(output)
    }
}

/// Copy a page dictionary and materialise any attribute it inherits from the page tree.
fn flatten_page(document: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = document.get_dictionary(page_id)?.clone();

    for key in INHERITABLE_PAGE_KEYS {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(document, &page, key) {
            page.set(key, value);
        }
    }

    Ok(page)
}

fn inherited_attribute(document: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent_ref = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let parent = document.get_dictionary(parent_ref?).ok()?;
        if let Ok(value) = parent.get(key) {
            return Some(value.clone());
        }
        parent_ref = parent.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}
