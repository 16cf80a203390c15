use std::fs;
use tempfile::tempdir;
use trawl_core::persist::{load_index, IndexPaths};

#[test]
fn builds_from_mixed_corpus_directory() {
    let dir = tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir_all(docs.join("ft/ft911")).unwrap();
    fs::create_dir_all(docs.join("fbis")).unwrap();
    fs::create_dir_all(docs.join("extra")).unwrap();

    fs::write(
        docs.join("ft/ft911/ft911_1"),
        "<DOC>\n<DOCNO>FT911-1</DOCNO>\n<HEADLINE>Oil prices rise</HEADLINE>\n<TEXT>Crude oil rose sharply.</TEXT>\n</DOC>\n<DOC>\n<DOCNO></DOCNO>\n<TEXT>dropped</TEXT>\n</DOC>\n",
    )
    .unwrap();
    fs::write(docs.join("ft/readmeft.txt"), "<DOC><DOCNO>README</DOCNO></DOC>").unwrap();
    fs::write(docs.join("fbis/fb396001"), "<DOC><DOCNO>FBIS3-1</DOCNO><TI>Radio</TI><TEXT>Broadcast text</TEXT></DOC>").unwrap();
    fs::write(
        docs.join("extra/web.jsonl"),
        "{\"id\":\"W1\",\"title\":\"Web page\",\"body\":\"oil markets\"}\nnot json\n\n{\"docno\":\"W2\",\"text\":\"no title\"}\n",
    )
    .unwrap();

    let out = dir.path().join("index");
    let meta = indexer::build_from_dir(&docs, &out, "2024-01-01T00:00:00Z").unwrap();
    assert_eq!(meta.num_docs, 4);

    let index = load_index(&IndexPaths::new(&out)).unwrap();
    let docnos: Vec<&str> = index.docs.iter().map(|(_, d)| d.docno.as_str()).collect();
    assert!(docnos.contains(&"FT911-1"));
    assert!(docnos.contains(&"FBIS3-1"));
    assert!(docnos.contains(&"W1"));
    assert!(docnos.contains(&"W2"));
    assert!(!docnos.contains(&"README"));
    assert_eq!(index.inverted.df("oil"), 2);
}

#[test]
fn missing_corpus_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(indexer::build_from_dir(&dir.path().join("absent"), &dir.path().join("index"), "").is_err());
}
