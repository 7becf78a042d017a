//! Document merging: concatenate fetched PDFs into one, in input order.
//!
//! ## Algorithm
//!
//! 1. Load each buffer with `lopdf` and renumber its objects above the
//!    highest id already used, so no two sources collide.
//! 2. Collect its pages in the source's own page order. Attributes a page
//!    inherits from intermediate page-tree nodes (`Resources`, `MediaBox`,
//!    `CropBox`, `Rotate`) are copied onto the page itself, because those
//!    nodes are dropped in step 4.
//! 3. Move every other object (fonts, images, content streams) across.
//! 4. Build one fresh `Pages` root whose `Kids` are all collected pages, in
//!    input order, plus a new `Catalog`, then serialise.
//!
//! Any failure aborts the whole merge. There is no best-effort output.
//!
//! ## Why spawn_blocking?
//!
//! Parsing and serialising PDFs is CPU-bound and can take a while for large
//! scans; [`merge_pdfs`] moves it off the Tokio worker threads.

use crate::error::MergeError;
use crate::output::MergedDocument;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed, cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Merge `buffers` on the blocking thread pool.
pub async fn merge_pdfs(
    buffers: Vec<Vec<u8>>,
    compress: bool,
) -> Result<MergedDocument, MergeError> {
    tokio::task::spawn_blocking(move || merge_documents(&buffers, compress))
        .await
        .map_err(|e| MergeError::Aborted {
            detail: e.to_string(),
        })?
}

/// Blocking implementation of the merge.
pub fn merge_documents<B: AsRef<[u8]>>(
    buffers: &[B],
    compress: bool,
) -> Result<MergedDocument, MergeError> {
    if buffers.is_empty() {
        return Err(MergeError::NoDocuments);
    }

    let mut merged = Document::with_version("1.5");
    let mut kids: Vec<ObjectId> = Vec::new();
    let mut next_id: u32 = 1;

    for (index, buffer) in buffers.iter().enumerate() {
        let mut source = Document::load_mem(buffer.as_ref()).map_err(|e| MergeError::Load {
            index,
            detail: e.to_string(),
        })?;

        source.renumber_objects_with(next_id);
        next_id = source.max_id + 1;

        let pages = collect_pages(&source, index)?;
        debug!("Document {}: {} pages", index, pages.len());

        for (id, object) in source.objects {
            if !is_structural(&object) {
                merged.objects.insert(id, object);
            }
        }
        for (id, page) in pages {
            kids.push(id);
            merged.objects.insert(id, Object::Dictionary(page));
        }
    }

    merged.max_id = next_id - 1;
    let pages_id = merged.new_object_id();

    for kid in &kids {
        if let Ok(Object::Dictionary(page)) = merged.get_object_mut(*kid) {
            page.set("Parent", pages_id);
        }
    }

    let page_count = kids.len();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => Object::Integer(page_count as i64),
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    merged.renumber_objects();
    if compress {
        merged.compress();
    }

    let mut bytes = Vec::new();
    merged.save_to(&mut bytes).map_err(|e| MergeError::Save {
        detail: e.to_string(),
    })?;

    info!(
        "Merged {} documents into {} pages ({} bytes)",
        buffers.len(),
        page_count,
        bytes.len()
    );

    Ok(MergedDocument {
        bytes,
        page_count,
        source_count: buffers.len(),
    })
}

/// Pages of `source` in page order, with inherited attributes materialised.
fn collect_pages(
    source: &Document,
    index: usize,
) -> Result<Vec<(ObjectId, Dictionary)>, MergeError> {
    // `get_pages` is keyed by 1-based page number, so iteration is page order.
    source
        .get_pages()
        .into_values()
        .map(|page_id| {
            let mut page = source
                .get_dictionary(page_id)
                .map_err(|e| MergeError::CopyPages {
                    index,
                    detail: format!("page object {page_id:?}: {e}"),
                })?
                .clone();
            inherit_attributes(source, &mut page);
            Ok((page_id, page))
        })
        .collect()
}

/// Copy inheritable attributes from ancestor `Pages` nodes onto `page`.
fn inherit_attributes(source: &Document, page: &mut Dictionary) {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        let Ok(node) = source.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }
}

/// Objects rebuilt by the merger rather than copied.
fn is_structural(object: &Object) -> bool {
    matches!(
        object.type_name(),
        Ok(b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline")
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::Stream;

    /// A document with one page per label; each page draws its label.
    pub(crate) fn labelled_pdf(labels: &[&str]) -> Vec<u8> {
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

        let mut kids = Vec::new();
        for label in labels {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*label)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        // Resources and MediaBox live on the tree root, so pages inherit them.
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => Object::Integer(kids.len() as i64),
                "Kids" => kids,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// The label drawn on each page of `bytes`, in page order.
    pub(crate) fn page_labels(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| {
                let content = doc.get_page_content(id).unwrap();
                let text = String::from_utf8_lossy(&content).to_string();
                let start = text.find('(').unwrap() + 1;
                let end = text[start..].find(')').unwrap() + start;
                text[start..end].to_string()
            })
            .collect()
    }

    #[test]
    fn merges_in_input_order() {
        let a = labelled_pdf(&["A"]);
        let b = labelled_pdf(&["B"]);

        let ab = merge_documents(&[&a, &b], false).unwrap();
        assert_eq!(ab.page_count, 2);
        assert_eq!(ab.source_count, 2);
        assert_eq!(page_labels(&ab.bytes), ["A", "B"]);

        let ba = merge_documents(&[&b, &a], false).unwrap();
        assert_eq!(page_labels(&ba.bytes), ["B", "A"]);
    }

    #[test]
    fn keeps_page_order_within_each_source() {
        let first = labelled_pdf(&["1", "2", "3"]);
        let second = labelled_pdf(&["4", "5"]);

        let merged = merge_documents(&[first, second], false).unwrap();
        assert_eq!(page_labels(&merged.bytes), ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn single_document_round_trips_its_pages() {
        let only = labelled_pdf(&["x", "y"]);
        let merged = merge_documents(&[only], false).unwrap();
        assert_eq!(merged.page_count, 2);
        assert_eq!(page_labels(&merged.bytes), ["x", "y"]);
    }

    #[test]
    fn pages_inherit_tree_attributes() {
        let merged = merge_documents(&[labelled_pdf(&["A"])], false).unwrap();
        let doc = Document::load_mem(&merged.bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"Resources"));
        assert!(page.has(b"MediaBox"));
    }

    #[test]
    fn corrupt_buffer_fails_whole_merge() {
        let good = labelled_pdf(&["A"]);
        let err = merge_documents(&[good, b"<html>not a pdf</html>".to_vec()], false).unwrap_err();
        assert!(matches!(err, MergeError::Load { index: 1, .. }), "got {err:?}");
    }

    #[test]
    fn empty_input_is_rejected() {
        let none: [Vec<u8>; 0] = [];
        assert!(matches!(
            merge_documents(&none, false),
            Err(MergeError::NoDocuments)
        ));
    }

    #[tokio::test]
    async fn async_merge_runs_off_thread() {
        let merged = merge_pdfs(vec![labelled_pdf(&["A"]), labelled_pdf(&["B"])], true)
            .await
            .unwrap();
        assert_eq!(merged.page_count, 2);
    }
}
