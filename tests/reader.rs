use anyhow::Result;
use ironcorpus::testing::*;
use ironcorpus::{CorpusError, CorpusReader, FieldSchema, ShardSpec};
use tempfile::TempDir;

fn title_text() -> FieldSchema {
    FieldSchema::new(["title", "text"], "\n\n").unwrap()
}

#[test]
fn three_records_in_batches_of_two() -> Result<()> {
    let corpus = TempCorpus::with_lines(&sample_explicit_corpus())?;
    let reader = CorpusReader::open(corpus.path(), title_text())?;

    let sizes: Vec<usize> = reader.iterate(2, ShardSpec::whole())?.map(|b| b.len()).collect();
    assert_eq!(sizes, vec![2, 1]);

    let batch = reader.iterate(2, ShardSpec::whole())?.next().unwrap();
    assert_eq!(batch.ids(), ["doc1", "doc2"]);
    assert_eq!(batch.field("title").unwrap(), ["Vitamin D", "Sleep"]);
    assert_eq!(batch.contents(0), "Vitamin D\nVitamin D supports bone health.");
    Ok(())
}

#[test]
fn two_shards_concatenate_to_the_whole_corpus() -> Result<()> {
    let corpus = TempCorpus::with_lines(&sample_packed_corpus())?;
    let reader = CorpusReader::open(corpus.path(), title_text())?;

    let first = batch_ids(&reader, 2, ShardSpec::new(0, 2)?);
    let second = batch_ids(&reader, 2, ShardSpec::new(1, 2)?);
    assert_eq!(first, vec![vec!["doc1".to_string()]]);
    assert_eq!(second, vec![vec!["doc2".to_string(), "3".to_string()]]);

    let joined: Vec<String> = first.into_iter().chain(second).flatten().collect();
    assert_eq!(joined, reader.ids());
    Ok(())
}

#[test]
fn packed_and_explicit_layouts_agree() -> Result<()> {
    let packed = TempCorpus::with_lines(&sample_packed_corpus())?;
    let explicit = TempCorpus::with_lines(&sample_explicit_corpus())?;
    let a = CorpusReader::open(packed.path(), title_text())?;
    let b = CorpusReader::open(explicit.path(), title_text())?;

    assert_eq!(a.ids(), b.ids());
    assert_eq!(a.column("title"), b.column("title"));
    assert_eq!(a.column("text"), b.column("text"));
    Ok(())
}

#[test]
fn shards_partition_for_many_splits() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(23))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    for shard_count in 1..=7 {
        for batch_size in [1, 2, 5, 64] {
            assert_shards_partition(&reader, batch_size, shard_count);
        }
    }
    Ok(())
}

#[test]
fn more_shards_than_records_yields_empty_shards() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(2))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    assert_eq!(reader.iterate(4, ShardSpec::new(0, 5)?)?.count(), 0);
    assert_eq!(batch_ids(&reader, 4, ShardSpec::new(4, 5)?), vec![vec!["d0", "d1"]]);
    Ok(())
}

#[test]
fn iteration_is_repeatable() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(9))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    let shard = ShardSpec::new(1, 2)?;
    assert_eq!(batch_ids(&reader, 3, shard), batch_ids(&reader, 3, shard));

    let again = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    assert_eq!(batch_ids(&reader, 3, shard), batch_ids(&again, 3, shard));
    Ok(())
}

#[test]
fn zero_batch_size_is_rejected() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(1))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    let err = reader.iterate(0, ShardSpec::whole()).unwrap_err();
    assert!(matches!(err, CorpusError::InvalidConfig(_)));
    Ok(())
}

#[test]
fn directory_files_are_read_in_name_order() -> Result<()> {
    let dir = TempDir::new()?;
    write_corpus(dir.path().join("b.jsonl"), &[r#"{"id": "b1", "contents": "x"}"#])?;
    write_corpus(dir.path().join("a.jsonl"), &[r#"{"id": "a1", "contents": "y"}"#])?;
    write_corpus(dir.path().join(".hidden"), &["not json at all"])?;
    std::fs::create_dir(dir.path().join("nested"))?;

    let reader = CorpusReader::open(dir.path(), FieldSchema::default())?;
    assert_eq!(reader.ids(), ["a1", "b1"]);
    assert_eq!(reader.sources().len(), 2);
    assert_eq!(reader.sources()[1].records, 1..2);
    Ok(())
}

#[test]
fn glob_patterns_select_matching_files() -> Result<()> {
    let dir = TempDir::new()?;
    write_corpus(dir.path().join("part-1.jsonl"), &[r#"{"id": "p1", "contents": "x"}"#])?;
    write_corpus(dir.path().join("part-0.jsonl"), &[r#"{"id": "p0", "contents": "x"}"#])?;
    write_corpus(dir.path().join("notes.txt"), &["ignored"])?;

    let pattern = dir.path().join("part-*.jsonl");
    let reader = CorpusReader::open(pattern.to_str().unwrap(), FieldSchema::default())?;
    assert_eq!(reader.ids(), ["p0", "p1"]);
    Ok(())
}

#[test]
fn missing_corpus_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = CorpusReader::open(dir.path().join("absent.jsonl"), FieldSchema::default()).unwrap_err();
    assert!(matches!(err, CorpusError::CorpusNotFound { .. }), "{err}");
}

#[test]
fn blank_lines_are_skipped_but_counted() -> Result<()> {
    let corpus = TempCorpus::with_lines(&[
        r#"{"id": "a", "contents": "x"}"#,
        "",
        r#"{"id": "b", "contents": "y"}"#,
        "{broken",
    ])?;
    let err = CorpusReader::open(corpus.path(), FieldSchema::default()).unwrap_err();
    match err {
        CorpusError::MalformedRecord { location, .. } => assert_eq!(location.line, 4),
        other => panic!("unexpected error {other}"),
    }
    Ok(())
}

#[test]
fn duplicate_ids_abort_the_load() -> Result<()> {
    let corpus = TempCorpus::with_lines(&[
        r#"{"id": "a", "contents": "x"}"#,
        r#"{"docid": "a", "contents": "y"}"#,
    ])?;
    let err = CorpusReader::open(corpus.path(), FieldSchema::default()).unwrap_err();
    match err {
        CorpusError::DuplicateOrMissingId { id, location, .. } => {
            assert_eq!(id.as_deref(), Some("a"));
            assert_eq!(location.line, 2);
        }
        other => panic!("unexpected error {other}"),
    }
    Ok(())
}

#[test]
fn field_count_mismatch_aborts_the_load() -> Result<()> {
    let corpus = TempCorpus::with_lines(&[r#"{"id": "a", "contents": "T\n\nB\n\nExtra"}"#])?;
    let err = CorpusReader::open(corpus.path(), title_text()).unwrap_err();
    assert!(matches!(
        err,
        CorpusError::FieldCountMismatch {
            expected: 2,
            actual: 3,
            ..
        }
    ));
    Ok(())
}

#[test]
fn empty_corpus_has_no_batches() -> Result<()> {
    let corpus = TempCorpus::with_lines::<&str>(&[])?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    assert!(reader.is_empty());
    assert_eq!(reader.iterate(8, ShardSpec::whole())?.len(), 0);
    Ok(())
}

#[test]
fn batch_iterator_reports_exact_length() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(10))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    let mut batches = reader.iterate(4, ShardSpec::whole())?;
    assert_eq!(batches.len(), 3);
    batches.next();
    assert_eq!(batches.len(), 2);
    let last = batches.last().unwrap();
    assert_eq!(last.range(), 8..10);
    assert_eq!(last.records()[1].id, "d9");
    Ok(())
}
