use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// Extracts genome identifier from a given sequence file path by removing common file extensions.
pub fn genome_id_from_filename(seq_file: &Path) -> String {
    let mut genome_id = seq_file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    if let Some(stripped) = genome_id.strip_suffix(".gz") {
        genome_id = stripped.to_string();
    }

    for ext in [".fq", ".fna", ".fa", ".fasta", ".fastq"] {
        if let Some(stripped) = genome_id.strip_suffix(ext) {
            genome_id = stripped.to_string();
            break;
        }
    }

    genome_id
}

/// True if the path names a gzip-compressed file.
pub fn is_gz_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// True if the file starts with the zip local file header signature.
pub fn is_zip_file(path: &Path) -> Result<bool> {
    let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
    let mut header = Vec::with_capacity(ZIP_MAGIC.len());
    file.take(ZIP_MAGIC.len() as u64).read_to_end(&mut header)?;
    Ok(header == ZIP_MAGIC)
}

/// Open a file for reading, transparently decompressing gzip content.
///
/// Compression is detected from the leading magic bytes rather than the file name.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let is_gz = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gz {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Output file that is either plain or gzip-compressed.
///
/// Must be closed with `finish` so that buffered data and the gzip footer are
/// written and any error is reported.
pub enum OutputWriter {
    Plain(BufWriter<File>),
    Gz(GzEncoder<BufWriter<File>>),
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Plain(writer) => writer.write(buf),
            OutputWriter::Gz(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(writer) => writer.flush(),
            OutputWriter::Gz(encoder) => encoder.flush(),
        }
    }
}

impl OutputWriter {
    /// Write the gzip footer (if any) and flush everything to disk.
    pub fn finish(self) -> io::Result<()> {
        let mut writer = match self {
            OutputWriter::Plain(writer) => writer,
            OutputWriter::Gz(encoder) => encoder.finish()?,
        };
        writer.flush()
    }
}

/// Create a file for writing, gzip-compressing the output if the name ends in `.gz`.
pub fn create_writer(path: &Path) -> Result<OutputWriter> {
    let file = File::create(path).context(format!("Failed to create {}", path.display()))?;
    let writer = BufWriter::new(file);

    if is_gz_path(path) {
        Ok(OutputWriter::Gz(GzEncoder::new(writer, Compression::default())))
    } else {
        Ok(OutputWriter::Plain(writer))
    }
}

/// Decode bytes as text, decompressing them first if they are gzip-compressed.
pub fn decode_to_string(raw: &[u8]) -> io::Result<String> {
    let mut contents = String::new();
    if raw.starts_with(&GZIP_MAGIC) {
        MultiGzDecoder::new(raw).read_to_string(&mut contents)?;
    } else {
        contents = String::from_utf8(raw.to_vec())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    }
    Ok(contents)
}

/// Read an entire (possibly gzip-compressed) file into a string.
pub fn read_to_string(path: &Path) -> Result<String> {
    let mut contents = String::new();
    open_reader(path)?
        .read_to_string(&mut contents)
        .context(format!("Failed to read {}", path.display()))?;
    Ok(contents)
}
