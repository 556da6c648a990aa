//! Incremental assembly of per-node PDFs into the final document.

use std::fs;
use std::path::{Path, PathBuf};

use docbind_pdf::{Bookmark, PdfToolkit};

use crate::CrawlError;

/// Merges artifacts in bounded batches, attaches the outline, and splits
/// oversized results into parts.
///
/// Merging everything in one call would hold every source document in
/// memory at once; instead each batch folds the running merge result in as
/// its first input, so at most `batch_size + 1` documents are open at a
/// time while the page order stays exactly the artifact order.
pub struct BatchAssembler<'a> {
    toolkit: &'a dyn PdfToolkit,
    batch_size: usize,
}

impl<'a> BatchAssembler<'a> {
    /// Batch sizes below 2 cannot make progress once the running result is
    /// folded in, so they are raised to 2.
    pub fn new(toolkit: &'a dyn PdfToolkit, batch_size: usize) -> Self {
        Self {
            toolkit,
            batch_size: batch_size.max(2),
        }
    }

    /// Assemble `files` into `{base}.pdf` with `bookmarks` as its outline,
    /// then split into `{base}_part{N}.pdf` parts when a page cap is set
    /// and exceeded. Returns the delivered paths.
    pub fn assemble(
        &self,
        files: &[PathBuf],
        bookmarks: &[Bookmark],
        base: &Path,
        max_pages: Option<u32>,
    ) -> Result<Vec<PathBuf>, CrawlError> {
        if files.is_empty() {
            return Err(CrawlError::NothingProduced);
        }
        let merged = self.merge_in_batches(files, base)?;
        self.toolkit.attach_bookmarks(&merged, &merged, bookmarks)?;
        Ok(self.split_if_oversized(merged, base, max_pages))
    }

    fn merge_in_batches(&self, files: &[PathBuf], base: &Path) -> Result<PathBuf, CrawlError> {
        let final_path = suffixed(base, ".pdf");
        let mut previous: Option<PathBuf> = None;
        let mut index = 0;
        while index < files.len() {
            let end = (index + self.batch_size).min(files.len());
            let mut batch = Vec::with_capacity(end - index + 1);
            batch.extend(previous.clone());
            batch.extend(files[index..end].iter().cloned());

            let output = if end == files.len() {
                final_path.clone()
            } else {
                suffixed(base, &format!(".{index}.temp.pdf"))
            };
            tracing::debug!(
                from = index,
                to = end,
                output = %output.display(),
                "merging batch"
            );
            self.toolkit.merge(&batch, &output)?;

            if let Some(temp) = previous.replace(output)
                && let Err(e) = fs::remove_file(&temp)
            {
                tracing::debug!(path = %temp.display(), error = %e, "stale merge temp not removed");
            }
            index = end;
        }
        Ok(final_path)
    }

    /// Split `merged` into parts of at most `max_pages` pages. Failures
    /// here are logged and the unsplit document delivered instead; a
    /// finished merge must not be lost to a sizing step.
    fn split_if_oversized(
        &self,
        merged: PathBuf,
        base: &Path,
        max_pages: Option<u32>,
    ) -> Vec<PathBuf> {
        let Some(max) = max_pages.filter(|max| *max > 0) else {
            return vec![merged];
        };
        let total = match self.toolkit.page_count(&merged) {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(error = %e, "merged document not measurable, delivering unsplit");
                return vec![merged];
            }
        };
        if total <= max {
            return vec![merged];
        }

        let starts: Vec<u32> = (0..total.div_ceil(max)).map(|i| i * max + 1).collect();
        let output_dir = merged.parent().unwrap_or(Path::new(".")).to_path_buf();
        tracing::info!(total, max, parts = starts.len(), "splitting merged document");
        let parts = match self.toolkit.split_at(&merged, &output_dir, &starts) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(error = %e, "split failed, delivering unsplit");
                return vec![merged];
            }
        };

        let delivered = parts
            .into_iter()
            .enumerate()
            .map(|(i, part)| {
                let numbered = suffixed(base, &format!("_part{}.pdf", i + 1));
                match fs::rename(&part, &numbered) {
                    Ok(()) => numbered,
                    Err(e) => {
                        tracing::warn!(
                            part = %part.display(),
                            error = %e,
                            "part rename failed, keeping range name"
                        );
                        part
                    }
                }
            })
            .collect();
        if let Err(e) = fs::remove_file(&merged) {
            tracing::debug!(path = %merged.display(), error = %e, "unsplit document not removed");
        }
        delivered
    }
}

fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{suffix}", base.display()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::mock::FakeToolkit;

    use super::*;

    fn seeded_files(toolkit: FakeToolkit, dir: &Path, names: &[(&str, u32)]) -> (FakeToolkit, Vec<PathBuf>) {
        let mut files = Vec::new();
        let mut toolkit = toolkit;
        for (name, pages) in names {
            let path = dir.join(name);
            toolkit = toolkit.with_count(&path, *pages);
            files.push(path);
        }
        (toolkit, files)
    }

    #[test]
    fn batches_fold_previous_result_and_write_final_name_last() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, files) = seeded_files(
            FakeToolkit::new(),
            dir.path(),
            &[("a.pdf", 1), ("b.pdf", 1), ("c.pdf", 1), ("d.pdf", 1), ("e.pdf", 1)],
        );
        let base = dir.path().join("book");
        let assembler = BatchAssembler::new(&toolkit, 2);

        let delivered = assembler.assemble(&files, &[], &base, None).unwrap();

        let final_path = dir.path().join("book.pdf");
        assert_eq!(delivered, vec![final_path.clone()]);

        let temp0 = dir.path().join("book.0.temp.pdf");
        let temp2 = dir.path().join("book.2.temp.pdf");
        let merges = toolkit.merges();
        assert_eq!(
            merges,
            vec![
                (vec![files[0].clone(), files[1].clone()], temp0.clone()),
                (
                    vec![temp0.clone(), files[2].clone(), files[3].clone()],
                    temp2.clone()
                ),
                (vec![temp2.clone(), files[4].clone()], final_path.clone()),
            ]
        );
        // Intermediate results are cleaned up as the chain advances.
        assert!(!temp0.exists());
        assert!(!temp2.exists());
        assert!(final_path.exists());
        assert_eq!(toolkit.page_count(&final_path).unwrap(), 5);
    }

    #[test]
    fn single_batch_merges_straight_into_the_final_name() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, files) =
            seeded_files(FakeToolkit::new(), dir.path(), &[("a.pdf", 2), ("b.pdf", 3)]);
        let base = dir.path().join("book");
        let assembler = BatchAssembler::new(&toolkit, 16);

        let delivered = assembler.assemble(&files, &[], &base, None).unwrap();

        assert_eq!(delivered, vec![dir.path().join("book.pdf")]);
        assert_eq!(toolkit.merges().len(), 1);
        // The outline pass always runs, even with nothing to attach.
        let attaches = toolkit.attaches();
        assert_eq!(attaches.len(), 1);
        assert_eq!(attaches[0].0, attaches[0].1);
        assert!(attaches[0].2.is_empty());
    }

    #[test]
    fn no_artifacts_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = FakeToolkit::new();
        let assembler = BatchAssembler::new(&toolkit, 8);

        let result = assembler.assemble(&[], &[], &dir.path().join("book"), None);

        assert!(matches!(result, Err(CrawlError::NothingProduced)));
    }

    #[test]
    fn undersized_batch_size_is_raised_to_two() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, files) = seeded_files(
            FakeToolkit::new(),
            dir.path(),
            &[("a.pdf", 1), ("b.pdf", 1), ("c.pdf", 1)],
        );
        let assembler = BatchAssembler::new(&toolkit, 0);

        assembler
            .assemble(&files, &[], &dir.path().join("book"), None)
            .unwrap();

        let merges = toolkit.merges();
        assert_eq!(merges.len(), 2);
        assert_eq!(merges[0].0.len(), 2);
    }

    #[test]
    fn oversized_document_is_split_into_numbered_parts() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, files) = seeded_files(
            FakeToolkit::new(),
            dir.path(),
            &[("a.pdf", 120), ("b.pdf", 130)],
        );
        let base = dir.path().join("book");
        let assembler = BatchAssembler::new(&toolkit, 8);

        let delivered = assembler
            .assemble(&files, &[], &base, Some(100))
            .unwrap();

        assert_eq!(
            delivered,
            vec![
                dir.path().join("book_part1.pdf"),
                dir.path().join("book_part2.pdf"),
                dir.path().join("book_part3.pdf"),
            ]
        );
        let splits = toolkit.splits();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].1, vec![1, 101, 201]);
        // Parts replace the oversized document.
        assert!(!dir.path().join("book.pdf").exists());
        assert!(delivered.iter().all(|part| part.exists()));
        assert_eq!(toolkit.page_count(&delivered[2]).unwrap(), 50);
    }

    #[test]
    fn document_within_the_cap_stays_whole() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, files) =
            seeded_files(FakeToolkit::new(), dir.path(), &[("a.pdf", 40), ("b.pdf", 60)]);
        let base = dir.path().join("book");
        let assembler = BatchAssembler::new(&toolkit, 8);

        let delivered = assembler
            .assemble(&files, &[], &base, Some(100))
            .unwrap();

        assert_eq!(delivered, vec![dir.path().join("book.pdf")]);
        assert!(toolkit.splits().is_empty());
    }

    #[test]
    fn unmeasurable_merge_is_delivered_unsplit() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, files) =
            seeded_files(FakeToolkit::new(), dir.path(), &[("a.pdf", 500)]);
        let base = dir.path().join("book");
        let final_path = dir.path().join("book.pdf");
        let toolkit = toolkit.failing_count(&final_path);
        let assembler = BatchAssembler::new(&toolkit, 8);

        let delivered = assembler
            .assemble(&files, &[], &base, Some(100))
            .unwrap();

        assert_eq!(delivered, vec![final_path.clone()]);
        assert!(final_path.exists());
        assert!(toolkit.splits().is_empty());
    }
}
