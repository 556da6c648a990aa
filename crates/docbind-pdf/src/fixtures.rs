//! Generated sample documents for tests.
//!
//! Enabled with the `fixtures` feature so downstream crates can build small
//! real PDFs in their own tests instead of checking in binary files.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};

/// Build an in-memory document with `pages` single-line text pages.
///
/// Page `n` renders the text `"{label} {n}"`, so a document's origin and
/// page order stay recoverable after merging; see [`page_texts`].
pub fn sample_document(pages: u32, label: &str) -> Document {
    let mut document = Document::with_version("1.7");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for n in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{label} {n}").into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = document.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode fixture content"),
        ));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::from(pages);
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);
    document
}

/// Write a sample document to `path`, creating parent directories.
pub fn write_sample(path: &Path, pages: u32, label: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut document = sample_document(pages, label);
    let mut file = std::fs::File::create(path)?;
    document
        .save_to(&mut file)
        .map_err(|e| std::io::Error::other(e.to_string()))
}

/// Extract the `Tj` text of every page in page order.
pub fn page_texts(document: &Document) -> Vec<String> {
    document
        .get_pages()
        .into_values()
        .map(|page_id| {
            let raw = document.get_page_content(page_id).unwrap_or_default();
            let content = Content::decode(&raw).unwrap_or(Content { operations: vec![] });
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| match op.operands.first() {
                    Some(Object::String(bytes, _)) => {
                        Some(String::from_utf8_lossy(bytes).into_owned())
                    }
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
