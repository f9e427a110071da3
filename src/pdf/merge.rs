use std::collections::BTreeMap;

use lopdf::{dictionary, Document, Object, ObjectId};

use crate::pdf::{PdfError, PdfMerger, PdfResult};

/// Merges stored PDFs by renumbering each document's objects into one page tree
#[derive(Debug, Default, Clone)]
pub struct LopdfMerger;

impl LopdfMerger {
    pub fn new() -> Self {
        Self
    }
}

impl PdfMerger for LopdfMerger {
    #[tracing::instrument(name = "Merge PDFs", skip_all, fields(count = pdfs.len()))]
    fn merge(&self, pdfs: &[Vec<u8>]) -> PdfResult<Vec<u8>> {
        if pdfs.is_empty() {
            return Err(PdfError::NothingToMerge);
        }

        let mut max_id = 1;
        let mut page_ids: Vec<ObjectId> = Vec::new();
        let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

        // The same blob may appear twice; each copy is loaded and renumbered on its own
        for bytes in pdfs {
            let mut doc = Document::load_mem(bytes)?;
            let pages = doc.get_pages();
            if pages.is_empty() {
                return Err(PdfError::NoPages);
            }

            doc.renumber_objects_with(max_id);
            max_id = doc.max_id + 1;

            page_ids.extend(doc.get_pages().into_values());
            objects.extend(doc.objects);
        }

        let mut merged = Document::with_version("1.5");
        merged.objects.extend(objects);
        merged.max_id = max_id - 1;

        let pages_id = merged.new_object_id();
        let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
        merged.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => page_ids.len() as i64,
                "Kids" => kids,
            }),
        );

        let catalog_id = merged.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        merged.trailer.set("Root", catalog_id);

        for &page_id in &page_ids {
            if let Ok(Object::Dictionary(page)) = merged.get_object_mut(page_id) {
                page.set("Parent", pages_id);
            }
        }

        // Drops the source catalogs and page trees
        merged.prune_objects();
        merged.compress();

        let mut buffer = Vec::new();
        merged.save_to(&mut buffer)?;

        Ok(buffer)
    }
}
