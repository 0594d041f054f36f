use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use pdfpress::pdf::optimizer::{compress_streams, dedup_streams, optimize};

/// Helper: 1ページ文書に任意のストリームを XObject として持たせる。
fn doc_with_streams(streams: Vec<Stream>) -> (Document, Vec<ObjectId>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let ids: Vec<ObjectId> = streams.into_iter().map(|s| doc.add_object(s)).collect();
    let mut xobjects = lopdf::Dictionary::new();
    for (i, id) in ids.iter().enumerate() {
        xobjects.set(format!("X{i}"), Object::Reference(*id));
    }

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
        "Resources" => dictionary! { "XObject" => xobjects },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    (doc, ids)
}

fn repetitive(len: usize) -> Vec<u8> {
    b"0 0 m 10 10 l S\n".iter().copied().cycle().take(len).collect()
}

#[test]
fn test_compress_streams_compresses_plain_streams() {
    let (mut doc, ids) = doc_with_streams(vec![Stream::new(dictionary! {}, repetitive(4096))]);
    compress_streams(&mut doc);

    let stream = doc.get_object(ids[0]).and_then(Object::as_stream).unwrap();
    assert_eq!(stream.dict.get(b"Filter").and_then(Object::as_name).unwrap(), b"FlateDecode");
    assert!(stream.content.len() < 4096);
    assert_eq!(stream.decompressed_content().unwrap(), repetitive(4096));
}

#[test]
fn test_compress_streams_skips_filtered_and_locked_streams() {
    let filtered = Stream::new(dictionary! { "Filter" => "DCTDecode" }, repetitive(2048));
    let mut locked = Stream::new(dictionary! {}, repetitive(2048));
    locked.allows_compression = false;
    let tiny = Stream::new(dictionary! {}, b"q Q".to_vec());
    let (mut doc, ids) = doc_with_streams(vec![filtered, locked, tiny]);

    compress_streams(&mut doc);

    for id in &ids {
        let stream = doc.get_object(*id).and_then(Object::as_stream).unwrap();
        assert_ne!(
            stream.dict.get(b"Filter").and_then(Object::as_name).ok(),
            Some(b"FlateDecode".as_slice())
        );
    }
    let first = doc.get_object(ids[0]).and_then(Object::as_stream).unwrap();
    assert_eq!(first.content, repetitive(2048));
}

#[test]
fn test_dedup_streams_merges_identical_streams() {
    let a = Stream::new(dictionary! { "Subtype" => "Form" }, b"0 0 1 1 re f".to_vec());
    let b = a.clone();
    let c = Stream::new(dictionary! { "Subtype" => "Form" }, b"0 0 2 2 re f".to_vec());
    let (mut doc, ids) = doc_with_streams(vec![a, b, c]);

    assert_eq!(dedup_streams(&mut doc), 1);
    assert!(doc.get_object(ids[1]).is_err(), "duplicate removed");

    let page_id = *doc.get_pages().get(&1).unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    let xobjects = page
        .get(b"Resources")
        .and_then(Object::as_dict)
        .and_then(|r| r.get(b"XObject"))
        .and_then(Object::as_dict)
        .unwrap();
    let target = |name: &[u8]| xobjects.get(name).and_then(Object::as_reference).unwrap();
    assert_eq!(target(b"X0"), target(b"X1"));
    assert_ne!(target(b"X0"), target(b"X2"));
}

#[test]
fn test_dedup_streams_without_duplicates_is_noop() {
    let (mut doc, _) = doc_with_streams(vec![
        Stream::new(dictionary! {}, b"a".to_vec()),
        Stream::new(dictionary! {}, b"b".to_vec()),
    ]);
    let before = doc.objects.len();
    assert_eq!(dedup_streams(&mut doc), 0);
    assert_eq!(doc.objects.len(), before);
}

#[test]
fn test_optimize_prunes_orphans_and_renumbers() {
    let (mut doc, _) = doc_with_streams(vec![Stream::new(dictionary! {}, repetitive(512))]);
    doc.add_object(dictionary! { "Orphan" => true });
    let before = doc.objects.len();

    optimize(&mut doc);

    assert_eq!(doc.objects.len(), before - 1);
    let max_id = doc.objects.keys().map(|(n, _)| *n).max().unwrap();
    assert_eq!(max_id as usize, doc.objects.len());
}
