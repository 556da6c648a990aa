//! [`PdfToolkit`] implementation over `lopdf`.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat, dictionary};

use crate::{Bookmark, PdfError, PdfToolkit};

/// Toolkit working on `lopdf` documents loaded from disk.
///
/// Merging deep-copies page objects from each source into the running
/// target, so only one batch of documents is ever resident; the crawl
/// engine relies on this when chaining batches.
#[derive(Debug, Default)]
pub struct LopdfToolkit;

impl LopdfToolkit {
    /// Create a toolkit.
    pub fn new() -> Self {
        Self
    }
}

impl PdfToolkit for LopdfToolkit {
    fn page_count(&self, path: &Path) -> Result<u32, PdfError> {
        let document = Document::load(path).map_err(|e| PdfError::document(path, e))?;
        Ok(u32::try_from(document.get_pages().len()).unwrap_or(u32::MAX))
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), PdfError> {
        let Some((first, rest)) = inputs.split_first() else {
            return Err(PdfError::NoInput);
        };
        tracing::debug!(files = inputs.len(), output = %output.display(), "merging documents");

        let mut target = Document::load(first).map_err(|e| PdfError::document(first, e))?;
        for path in rest {
            let source = Document::load(path).map_err(|e| PdfError::document(path, e))?;
            append_pages(&mut target, &source).map_err(|e| PdfError::document(path, e))?;
        }

        // Copied page trees from the sources are unreachable once every
        // page's Parent points at the target tree.
        target.prune_objects();
        target.compress();
        save(&mut target, output)
    }

    fn attach_bookmarks(
        &self,
        input: &Path,
        output: &Path,
        bookmarks: &[Bookmark],
    ) -> Result<(), PdfError> {
        if bookmarks.is_empty() {
            if input != output {
                std::fs::copy(input, output)?;
            }
            return Ok(());
        }

        let mut document = Document::load(input).map_err(|e| PdfError::document(input, e))?;
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(PdfError::NoPages(input.to_path_buf()));
        }
        tracing::debug!(
            entries = bookmarks.len(),
            output = %output.display(),
            "attaching outline"
        );

        let outline_id = document.new_object_id();
        let top = write_outline_level(&mut document, bookmarks, outline_id, &pages);
        if let (Some(&first), Some(&last)) = (top.first(), top.last()) {
            let outline = dictionary! {
                "Type" => "Outlines",
                "First" => first,
                "Last" => last,
                "Count" => signed_len(top.len()),
            };
            document.objects.insert(outline_id, Object::Dictionary(outline));

            let catalog_id = document
                .trailer
                .get(b"Root")
                .and_then(Object::as_reference)
                .map_err(|e| PdfError::document(input, e))?;
            let catalog = document
                .get_object_mut(catalog_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| PdfError::document(input, e))?;
            catalog.set("Outlines", Object::Reference(outline_id));
        }

        save(&mut document, output)
    }

    fn split_at(
        &self,
        input: &Path,
        output_dir: &Path,
        starts: &[u32],
    ) -> Result<Vec<PathBuf>, PdfError> {
        let ascending = starts.windows(2).all(|pair| pair[0] < pair[1]);
        if starts.is_empty() || starts[0] != 1 || !ascending {
            return Err(PdfError::InvalidBoundaries(format!("{starts:?}")));
        }

        let document = Document::load(input).map_err(|e| PdfError::document(input, e))?;
        let total = u32::try_from(document.get_pages().len()).unwrap_or(u32::MAX);
        if total == 0 {
            return Err(PdfError::NoPages(input.to_path_buf()));
        }
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".into());

        let mut produced = Vec::new();
        for (i, &from) in starts.iter().enumerate() {
            if from > total {
                break;
            }
            let to = starts.get(i + 1).map_or(total, |next| (next - 1).min(total));
            let mut part = document.clone();
            let drop_pages: Vec<u32> = (1..=total).filter(|p| *p < from || *p > to).collect();
            if !drop_pages.is_empty() {
                part.delete_pages(&drop_pages);
            }
            part.prune_objects();

            let path = output_dir.join(format!("{stem}_{from}-{to}.pdf"));
            tracing::debug!(from, to, path = %path.display(), "writing split part");
            save(&mut part, &path)?;
            produced.push(path);
        }
        Ok(produced)
    }
}

fn save(document: &mut Document, path: &Path) -> Result<(), PdfError> {
    let mut file = File::create(path)?;
    document
        .save_to(&mut file)
        .map_err(|e| PdfError::document(path, lopdf::Error::IO(e)))
}

fn signed_len(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

/// Append every page of `source` to `target` in page order.
///
/// Page objects and everything they reference are deep-copied with fresh
/// object ids; afterwards each copied page is reparented onto the target's
/// page tree and appended to its Kids.
fn append_pages(target: &mut Document, source: &Document) -> Result<(), lopdf::Error> {
    let source_pages = source.get_pages();
    if source_pages.is_empty() {
        return Ok(());
    }

    let mut copier = ObjectCopier::new(source, target);
    let mut copied = Vec::with_capacity(source_pages.len());
    for (_, page_id) in source_pages {
        copied.push(copier.copy_object(page_id)?);
    }

    let catalog_id = target.trailer.get(b"Root")?.as_reference()?;
    let pages_id = target
        .get_object(catalog_id)?
        .as_dict()?
        .get(b"Pages")?
        .as_reference()?;

    for &page_id in &copied {
        if let Ok(dict) = target.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    let pages_dict = target.get_object_mut(pages_id)?.as_dict_mut()?;
    let mut kids = pages_dict.get(b"Kids")?.as_array()?.clone();
    let count = pages_dict.get(b"Count")?.as_i64()?;
    kids.extend(copied.iter().map(|&id| Object::Reference(id)));
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Count", count + signed_len(copied.len()));
    Ok(())
}

/// Deep-copies objects between documents, remapping references.
struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    id_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            id_map: HashMap::new(),
        }
    }

    fn copy_object(&mut self, source_id: ObjectId) -> Result<ObjectId, lopdf::Error> {
        if let Some(&target_id) = self.id_map.get(&source_id) {
            return Ok(target_id);
        }

        // Map the id before recursing so reference cycles
        // (Page -> Parent -> Kids -> Page) terminate.
        let new_id = self.target.add_object(Object::Null);
        self.id_map.insert(source_id, new_id);

        let object = self.source.get_object(source_id)?.clone();
        let remapped = self.remap(object)?;
        if let Some(slot) = self.target.objects.get_mut(&new_id) {
            *slot = remapped;
        }
        Ok(new_id)
    }

    fn remap(&mut self, object: Object) -> Result<Object, lopdf::Error> {
        match object {
            Object::Reference(id) => Ok(Object::Reference(self.copy_object(id)?)),
            Object::Array(items) => Ok(Object::Array(
                items
                    .into_iter()
                    .map(|item| self.remap(item))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Object::Dictionary(mut dict) => {
                for (_, value) in dict.iter_mut() {
                    *value = self.remap(value.clone())?;
                }
                Ok(Object::Dictionary(dict))
            }
            Object::Stream(mut stream) => {
                for (_, value) in stream.dict.iter_mut() {
                    *value = self.remap(value.clone())?;
                }
                Ok(Object::Stream(stream))
            }
            other => Ok(other),
        }
    }
}

/// Insert outline item dictionaries for one level of the bookmark tree,
/// returning their ids in order.
fn write_outline_level(
    document: &mut Document,
    items: &[Bookmark],
    parent_id: ObjectId,
    pages: &[ObjectId],
) -> Vec<ObjectId> {
    let ids: Vec<ObjectId> = items.iter().map(|_| document.new_object_id()).collect();
    for (i, bookmark) in items.iter().enumerate() {
        let page_index = bookmark.page.clamp(1, u32::try_from(pages.len()).unwrap_or(u32::MAX)) - 1;
        let dest = vec![
            Object::Reference(pages[page_index as usize]),
            "Fit".into(),
        ];
        let mut dict: Dictionary = dictionary! {
            "Title" => title_text(&bookmark.title),
            "Parent" => parent_id,
            "Dest" => dest,
        };
        if i > 0 {
            dict.set("Prev", ids[i - 1]);
        }
        if i + 1 < ids.len() {
            dict.set("Next", ids[i + 1]);
        }
        if !bookmark.children.is_empty() {
            let child_ids = write_outline_level(document, &bookmark.children, ids[i], pages);
            if let (Some(&first), Some(&last)) = (child_ids.first(), child_ids.last()) {
                dict.set("First", first);
                dict.set("Last", last);
                // Negative count renders the branch collapsed.
                dict.set("Count", -signed_len(child_ids.len()));
            }
        }
        document.objects.insert(ids[i], Object::Dictionary(dict));
    }
    ids
}

/// Encode a title as a PDF text string, switching to UTF-16BE when it
/// contains non-ASCII characters.
fn title_text(title: &str) -> Object {
    if title.is_ascii() {
        Object::String(title.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in title.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir, name: &str, pages: u32, label: &str) -> PathBuf {
        let path = dir.path().join(name);
        fixtures::write_sample(&path, pages, label).expect("write fixture");
        path
    }

    #[test]
    fn page_count_reads_fixture() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_fixture(&dir, "three.pdf", 3, "p");

        let toolkit = LopdfToolkit::new();
        assert_eq!(toolkit.page_count(&path).expect("count"), 3);
    }

    #[test]
    fn page_count_rejects_garbage() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").expect("write");

        let toolkit = LopdfToolkit::new();
        assert!(toolkit.page_count(&path).is_err());
    }

    #[test]
    fn merge_preserves_input_order() {
        let dir = TempDir::new().expect("tempdir");
        let inputs = vec![
            write_fixture(&dir, "a.pdf", 2, "alpha"),
            write_fixture(&dir, "b.pdf", 1, "bravo"),
            write_fixture(&dir, "c.pdf", 3, "charlie"),
        ];
        let output = dir.path().join("merged.pdf");

        let toolkit = LopdfToolkit::new();
        toolkit.merge(&inputs, &output).expect("merge");

        let merged = Document::load(&output).expect("load");
        let texts = fixtures::page_texts(&merged);
        assert_eq!(
            texts,
            vec!["alpha 1", "alpha 2", "bravo 1", "charlie 1", "charlie 2", "charlie 3"]
        );
    }

    #[test]
    fn merge_rejects_empty_input() {
        let dir = TempDir::new().expect("tempdir");
        let toolkit = LopdfToolkit::new();
        let err = toolkit.merge(&[], &dir.path().join("out.pdf")).unwrap_err();
        assert!(matches!(err, PdfError::NoInput));
    }

    #[test]
    fn attach_bookmarks_writes_outline() {
        let dir = TempDir::new().expect("tempdir");
        let input = write_fixture(&dir, "doc.pdf", 6, "page");
        let output = dir.path().join("doc-bookmarked.pdf");

        let mut parent = Bookmark::new("Guide", 1);
        parent.children.push(Bookmark::new("Install", 3));
        let bookmarks = vec![parent, Bookmark::new("Reference", 6)];

        let toolkit = LopdfToolkit::new();
        toolkit
            .attach_bookmarks(&input, &output, &bookmarks)
            .expect("attach");

        let document = Document::load(&output).expect("load");
        let catalog_id = document
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .expect("root");
        let catalog = document
            .get_object(catalog_id)
            .and_then(Object::as_dict)
            .expect("catalog");
        let outline_id = catalog
            .get(b"Outlines")
            .and_then(Object::as_reference)
            .expect("outline ref");
        let outline = document
            .get_object(outline_id)
            .and_then(Object::as_dict)
            .expect("outline dict");
        assert_eq!(outline.get(b"Count").and_then(Object::as_i64).expect("count"), 2);

        // First top-level item points at page 1 and carries one child.
        let first_id = outline
            .get(b"First")
            .and_then(Object::as_reference)
            .expect("first ref");
        let first = document
            .get_object(first_id)
            .and_then(Object::as_dict)
            .expect("first dict");
        assert_eq!(
            first.get(b"Title").and_then(Object::as_str).expect("title"),
            b"Guide"
        );
        assert_eq!(first.get(b"Count").and_then(Object::as_i64).expect("kids"), -1);

        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        let dest = first.get(b"Dest").and_then(Object::as_array).expect("dest");
        assert_eq!(dest[0].as_reference().expect("dest page"), pages[0]);
    }

    #[test]
    fn attach_bookmarks_with_empty_tree_copies_input() {
        let dir = TempDir::new().expect("tempdir");
        let input = write_fixture(&dir, "doc.pdf", 2, "page");
        let output = dir.path().join("copy.pdf");

        let toolkit = LopdfToolkit::new();
        toolkit.attach_bookmarks(&input, &output, &[]).expect("copy");
        assert_eq!(toolkit.page_count(&output).expect("count"), 2);
    }

    #[test]
    fn split_produces_range_named_parts() {
        let dir = TempDir::new().expect("tempdir");
        let input = write_fixture(&dir, "big.pdf", 5, "page");

        let toolkit = LopdfToolkit::new();
        let parts = toolkit
            .split_at(&input, dir.path(), &[1, 3, 5])
            .expect("split");

        let names: Vec<String> = parts
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["big_1-2.pdf", "big_3-4.pdf", "big_5-5.pdf"]);

        let counts: Vec<u32> = parts
            .iter()
            .map(|p| toolkit.page_count(p).expect("count"))
            .collect();
        assert_eq!(counts, vec![2, 2, 1]);

        // Content of the middle part starts at original page 3.
        let middle = Document::load(&parts[1]).expect("load");
        assert_eq!(fixtures::page_texts(&middle), vec!["page 3", "page 4"]);
    }

    #[test]
    fn split_rejects_bad_boundaries() {
        let dir = TempDir::new().expect("tempdir");
        let input = write_fixture(&dir, "doc.pdf", 3, "page");

        let toolkit = LopdfToolkit::new();
        assert!(toolkit.split_at(&input, dir.path(), &[]).is_err());
        assert!(toolkit.split_at(&input, dir.path(), &[2, 3]).is_err());
        assert!(toolkit.split_at(&input, dir.path(), &[1, 3, 2]).is_err());
    }

    #[test]
    fn utf16_titles_round_trip_marker() {
        let encoded = title_text("指南");
        let Object::String(bytes, StringFormat::Hexadecimal) = encoded else {
            panic!("expected hex string");
        };
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
    }
}
