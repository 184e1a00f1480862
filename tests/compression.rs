#[cfg(any(
    feature = "compression-gzip",
    feature = "compression-zstd",
    feature = "compression-bzip2",
    feature = "compression-xz"
))]
mod compression_tests {
    use ironcorpus::io::Codec;
    use ironcorpus::testing::*;
    use ironcorpus::{CorpusReader, FieldSchema};
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn corpus_bytes() -> Vec<u8> {
        let mut raw = Vec::new();
        for line in sample_packed_corpus() {
            raw.extend_from_slice(line.as_bytes());
            raw.push(b'\n');
        }
        raw
    }

    fn title_text() -> FieldSchema {
        FieldSchema::new(["title", "text"], "\n\n").unwrap()
    }

    fn assert_same_as_plain(compressed: &Path, codec: Codec) -> anyhow::Result<()> {
        let plain = TempCorpus::with_lines(&sample_packed_corpus())?;
        let expected = CorpusReader::open(plain.path(), title_text())?;
        let actual = CorpusReader::open(compressed, title_text())?;

        assert_eq!(actual.ids(), expected.ids());
        assert_eq!(actual.column("text"), expected.column("text"));
        assert_eq!(actual.sources()[0].codec, codec);
        Ok(())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn gzip_corpus_reads_like_plain() -> anyhow::Result<()> {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let dir = TempDir::new()?;
        let path = dir.path().join("corpus.jsonl.gz");
        let mut enc = GzEncoder::new(std::fs::File::create(&path)?, Compression::default());
        enc.write_all(&corpus_bytes())?;
        enc.finish()?;

        assert_same_as_plain(&path, Codec::Gzip)
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn gzip_is_detected_without_extension() -> anyhow::Result<()> {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let dir = TempDir::new()?;
        let path = dir.path().join("corpus.jsonl");
        let mut enc = GzEncoder::new(std::fs::File::create(&path)?, Compression::fast());
        enc.write_all(&corpus_bytes())?;
        enc.finish()?;

        assert_same_as_plain(&path, Codec::Gzip)
    }

    #[cfg(feature = "compression-zstd")]
    #[test]
    fn zstd_corpus_reads_like_plain() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("corpus.jsonl.zst");
        let encoded = zstd::stream::encode_all(corpus_bytes().as_slice(), 3)?;
        std::fs::write(&path, encoded)?;

        assert_same_as_plain(&path, Codec::Zstd)
    }

    #[cfg(feature = "compression-bzip2")]
    #[test]
    fn bzip2_corpus_reads_like_plain() -> anyhow::Result<()> {
        use bzip2::Compression;
        use bzip2::write::BzEncoder;

        let dir = TempDir::new()?;
        let path = dir.path().join("corpus.jsonl.bz2");
        let mut enc = BzEncoder::new(std::fs::File::create(&path)?, Compression::default());
        enc.write_all(&corpus_bytes())?;
        enc.finish()?;

        assert_same_as_plain(&path, Codec::Bzip2)
    }

    #[cfg(feature = "compression-xz")]
    #[test]
    fn xz_corpus_reads_like_plain() -> anyhow::Result<()> {
        use xz2::write::XzEncoder;

        let dir = TempDir::new()?;
        let path = dir.path().join("corpus.jsonl.xz");
        let mut enc = XzEncoder::new(std::fs::File::create(&path)?, 6);
        enc.write_all(&corpus_bytes())?;
        enc.finish()?;

        assert_same_as_plain(&path, Codec::Xz)
    }

    #[test]
    fn plain_files_are_plain() -> anyhow::Result<()> {
        let plain = TempCorpus::with_lines(&numbered_corpus(3))?;
        let reader = CorpusReader::open(plain.path(), FieldSchema::default())?;
        assert_eq!(reader.sources()[0].codec, Codec::Plain);
        assert_eq!(reader.len(), 3);
        Ok(())
    }
}
