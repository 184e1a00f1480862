//! Transparent decompression of corpus files.
//!
//! Corpora are frequently shipped compressed (`corpus.jsonl.gz`,
//! `part-00.jsonl.zst`, ...). The codec is picked from the file extension
//! first and from the leading magic bytes otherwise, so a renamed file still
//! decodes. Each codec sits behind its own feature flag; a compressed file
//! whose codec is compiled out is reported as an error rather than parsed as
//! garbage JSON.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{CorpusError, CorpusResult};

/// Compression format of a corpus file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Plain,
    Gzip,
    Zstd,
    Bzip2,
    Xz,
}

const MAGIC: [(Codec, &[u8]); 4] = [
    (Codec::Gzip, &[0x1f, 0x8b]),
    (Codec::Zstd, &[0x28, 0xb5, 0x2f, 0xfd]),
    (Codec::Bzip2, b"BZh"),
    (Codec::Xz, &[0xfd, b'7', b'z', b'X', b'Z', 0x00]),
];

impl Codec {
    pub fn name(self) -> &'static str {
        match self {
            Codec::Plain => "plain",
            Codec::Gzip => "gzip",
            Codec::Zstd => "zstd",
            Codec::Bzip2 => "bzip2",
            Codec::Xz => "xz",
        }
    }

    /// Codec implied by the final extension, if it names one.
    pub fn from_extension(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gz" | "gzip" => Some(Codec::Gzip),
            "zst" | "zstd" => Some(Codec::Zstd),
            "bz2" => Some(Codec::Bzip2),
            "xz" => Some(Codec::Xz),
            _ => None,
        }
    }

    /// Codec whose signature starts `header`, or [`Codec::Plain`].
    pub fn from_magic(header: &[u8]) -> Self {
        MAGIC
            .iter()
            .find(|(_, magic)| header.starts_with(magic))
            .map_or(Codec::Plain, |(codec, _)| *codec)
    }

    pub fn is_enabled(self) -> bool {
        match self {
            Codec::Plain => true,
            Codec::Gzip => cfg!(feature = "compression-gzip"),
            Codec::Zstd => cfg!(feature = "compression-zstd"),
            Codec::Bzip2 => cfg!(feature = "compression-bzip2"),
            Codec::Xz => cfg!(feature = "compression-xz"),
        }
    }

    fn wrap<R: BufRead + 'static>(self, reader: R) -> io::Result<Box<dyn Read>> {
        match self {
            Codec::Plain => Ok(Box::new(reader)),
            #[cfg(feature = "compression-gzip")]
            Codec::Gzip => Ok(Box::new(flate2::bufread::MultiGzDecoder::new(reader))),
            #[cfg(feature = "compression-zstd")]
            Codec::Zstd => Ok(Box::new(zstd::stream::read::Decoder::with_buffer(reader)?)),
            #[cfg(feature = "compression-bzip2")]
            Codec::Bzip2 => Ok(Box::new(bzip2::bufread::MultiBzDecoder::new(reader))),
            #[cfg(feature = "compression-xz")]
            Codec::Xz => Ok(Box::new(xz2::bufread::XzDecoder::new_multi_decoder(reader))),
            #[allow(unreachable_patterns)]
            other => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} support is not compiled in", other.name()),
            )),
        }
    }
}

/// Detect the codec of an already-buffered stream without consuming input.
///
/// # Errors
/// Propagates read errors from filling the buffer.
pub fn detect<R: BufRead>(path: impl AsRef<Path>, reader: &mut R) -> io::Result<Codec> {
    if let Some(codec) = Codec::from_extension(path) {
        return Ok(codec);
    }
    let header = reader.fill_buf()?;
    Ok(Codec::from_magic(header))
}

/// Open a corpus file for line reading, decompressing when needed.
///
/// # Errors
/// [`CorpusError::Io`] if the file cannot be opened, or its codec is not
/// compiled in.
pub fn open_lines(path: impl AsRef<Path>) -> CorpusResult<(Codec, Box<dyn BufRead>)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CorpusError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let codec = detect(path, &mut reader).map_err(|e| CorpusError::io(path, e))?;
    let lines: Box<dyn BufRead> = match codec {
        Codec::Plain => Box::new(reader),
        _ => {
            let decoded = codec.wrap(reader).map_err(|e| CorpusError::io(path, e))?;
            Box::new(BufReader::new(decoded))
        }
    };
    Ok((codec, lines))
}
