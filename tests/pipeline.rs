use anyhow::Result;
use ironcorpus::encoder::BoxedEncoder;
use ironcorpus::testing::*;
use ironcorpus::*;

fn title_text() -> FieldSchema {
    FieldSchema::new(["title", "text"], "\n\n").unwrap()
}

#[test]
fn encodes_every_record_into_jsonl() -> Result<()> {
    let corpus = TempCorpus::with_lines(&sample_packed_corpus())?;
    let reader = CorpusReader::open(corpus.path(), title_text())?;
    let encoder = MockEncoder::dense(8);
    let out = corpus.dir().join("embeddings");

    let (summary, writer) = encode_corpus(&reader, &encoder, JsonlWriter::new(&out), 2, ShardSpec::whole())?;
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.records, 3);
    assert_eq!(encoder.calls(), 2);
    assert_eq!(writer.state(), WriterState::Closed);

    let records = read_embeddings(&out)?;
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["doc1", "doc2", "3"]);
    assert_eq!(records[1].contents, "Sleep\nAdults need seven hours of sleep.");
    assert_eq!(
        records[1].vector,
        Representation::Dense(MockEncoder::dense_vector(
            "Sleep Adults need seven hours of sleep.",
            8
        ))
    );
    Ok(())
}

#[test]
fn flat_index_rows_follow_corpus_order() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(7))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    let out = corpus.dir().join("flat");

    let writer = FlatIndexWriter::with_metric(&out, 4, Metric::L2);
    encode_corpus(&reader, &MockEncoder::dense(4), writer, 3, ShardSpec::whole())?;

    let docids = read_docids(&out)?;
    assert_eq!(docids, reader.ids());
    let index = FlatIndex::load(out.join(ironcorpus::writer::INDEX_FILE))?;
    assert_eq!(index.len(), 7);
    let expected = MockEncoder::dense_vector("document 5", 4);
    assert_eq!(index.row(5), Some(expected.as_slice()));
    let best = index.search(&expected, 1)?;
    assert_eq!(docids[best[0].row], "d5");
    Ok(())
}

#[test]
fn sharded_runs_cover_the_corpus_once() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(11))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;

    let mut ids = Vec::new();
    let mut total = 0;
    for shard in ShardSpec::all(3)? {
        let out = corpus.dir().join(format!("shard-{}", shard.id()));
        let (summary, _) = encode_corpus(&reader, &MockEncoder::sparse(), JsonlWriter::new(&out), 2, shard)?;
        total += summary.records;
        ids.extend(read_embeddings(&out)?.into_iter().map(|r| r.id));
    }
    assert_eq!(total, 11);
    assert_eq!(ids, reader.ids());
    Ok(())
}

#[test]
fn encoder_failure_aborts_but_keeps_written_batches() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(5))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    let out = corpus.dir().join("embeddings");
    let encoder = MockEncoder::dense(2).failing_on_call(1);

    let err = encode_corpus(&reader, &encoder, JsonlWriter::new(&out), 2, ShardSpec::whole()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("encode batch 1"), "{message}");
    assert!(message.contains("mock encoder failure on call 1"), "{message}");

    // the first batch was flushed and the writer closed on the way out
    let ids: Vec<String> = read_embeddings(&out)?.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, ["d0", "d1"]);
    Ok(())
}

#[test]
fn encoder_returning_too_few_vectors_is_an_error() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(3))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    let short = encoder_fn("short", |_request: &EncodeRequest<'_>| {
        Ok(vec![Representation::Dense(vec![1.0])])
    });

    let err = encode_corpus(&reader, &short, JsonlWriter::new(corpus.dir().join("o")), 3, ShardSpec::whole())
        .unwrap_err();
    let mismatch = err.downcast_ref::<CorpusError>();
    assert!(matches!(
        mismatch,
        Some(CorpusError::EncoderOutputMismatch {
            expected: 3,
            actual: 1
        })
    ));
    Ok(())
}

#[test]
fn sparse_output_cannot_go_into_a_flat_index() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(2))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;

    let err = encode_corpus(
        &reader,
        &MockEncoder::sparse(),
        FlatIndexWriter::new(corpus.dir().join("flat"), 4),
        2,
        ShardSpec::whole(),
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("cannot store a sparse representation"));
    Ok(())
}

#[test]
fn run_drives_a_config_end_to_end() -> Result<()> {
    let corpus = TempCorpus::with_lines(&sample_explicit_corpus())?;
    let out = corpus.dir().join("idx");
    let config = EncodeConfig {
        corpus: corpus.path().to_path_buf(),
        fields: vec!["title".into(), "text".into()],
        batch_size: 2,
        shard_id: 1,
        shard_count: 2,
        output: OutputConfig::Flat {
            dir: out.clone(),
            dimension: 16,
            metric: Metric::InnerProduct,
        },
        ..EncodeConfig::default()
    };

    let summary = run(&config, &MockEncoder::dense(16))?;
    assert_eq!(summary.shard, ShardSpec::new(1, 2)?);
    assert_eq!(summary.records, 2);
    assert_eq!(read_docids(&out)?, vec!["doc2", "3"]);
    Ok(())
}

#[test]
fn run_rejects_an_encoder_of_the_wrong_width() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(1))?;
    let config = EncodeConfig {
        corpus: corpus.path().to_path_buf(),
        output: OutputConfig::Flat {
            dir: corpus.dir().join("idx"),
            dimension: 8,
            metric: Metric::L2,
        },
        ..EncodeConfig::default()
    };
    let err = run(&config, &MockEncoder::dense(4)).unwrap_err();
    assert!(err.to_string().contains("4-dimensional"), "{err}");
    assert!(!corpus.dir().join("idx").exists());
    Ok(())
}

#[test]
fn run_reports_a_missing_corpus() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = EncodeConfig {
        corpus: dir.path().join("missing.jsonl"),
        ..EncodeConfig::default()
    };
    let err = run(&config, &MockEncoder::dense(2)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CorpusError>(),
        Some(CorpusError::CorpusNotFound { .. })
    ));
}

#[test]
fn run_with_registry_builds_the_configured_encoder() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(4))?;
    let out = corpus.dir().join("embeddings");
    let config = EncodeConfig {
        corpus: corpus.path().to_path_buf(),
        model: Some("naver/splade-cocondenser-ensembledistil".into()),
        output: OutputConfig::Jsonl { dir: out.clone() },
        ..EncodeConfig::default()
    };

    let mut registry = EncoderRegistry::new();
    registry.register(EncoderKind::Splade, |_spec| Ok(Box::new(MockEncoder::sparse()) as BoxedEncoder));

    let summary = run_with_registry(&config, &registry)?;
    assert_eq!(summary.records, 4);
    let records = read_embeddings(&out)?;
    assert_eq!(records[0].vector.kind(), "sparse");

    let unregistered = EncodeConfig {
        model: Some("facebook/contriever".into()),
        ..config.clone()
    };
    let err = run_with_registry(&unregistered, &registry).unwrap_err();
    assert!(err.to_string().contains("no encoder registered for kind contriever"));

    let no_model = EncodeConfig {
        model: None,
        ..config
    };
    assert!(run_with_registry(&no_model, &registry).is_err());
    Ok(())
}

#[test]
fn summary_serializes_for_run_logs() -> Result<()> {
    let corpus = TempCorpus::with_lines(&numbered_corpus(3))?;
    let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
    let (summary, _) = encode_corpus(
        &reader,
        &MockEncoder::dense(2),
        JsonlWriter::new(corpus.dir().join("e")),
        8,
        ShardSpec::whole(),
    )?;
    let json = serde_json::to_value(&summary)?;
    assert_eq!(json["shard"], serde_json::json!({"id": 0, "count": 1}));
    assert_eq!(json["batches"], 1);
    assert_eq!(json["records"], 3);
    Ok(())
}
