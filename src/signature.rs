//! Reading and writing sourmash JSON signatures.
//!
//! A signature file holds a list of signatures, each of which carries one or more
//! sketches. Only scaled (FracMinHash) sketches are usable here; `num` sketches have a
//! `max_hash` of zero and are rejected at selection time.
//!
//! Zip collections as written by `sourmash sketch -o x.sig.zip` are read by loading
//! every `*.sig` / `*.sig.gz` entry in the archive.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::debug;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::HashannotError;
use crate::frac_min_hash::FracMinHash;
use crate::hashing::ItemHash;
use crate::io_utils::{create_writer, decode_to_string, is_zip_file, read_to_string};
use crate::sketch_params::{Molecule, SketchParams};

const HASH_FUNCTION: &str = "0.murmur64";
const SIGNATURE_VERSION: f64 = 0.4;

fn default_class() -> String {
    "sourmash_signature".to_string()
}

fn default_license() -> String {
    "CC0".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub hash_function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_license")]
    pub license: String,
    pub signatures: Vec<SketchRecord>,
    #[serde(default)]
    pub version: f64,
}

/// A single serialized sketch within a signature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SketchRecord {
    #[serde(default)]
    pub num: u32,
    pub ksize: u32,
    pub seed: u64,
    #[serde(default)]
    pub max_hash: u64,
    pub mins: Vec<ItemHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abundances: Option<Vec<u64>>,
    #[serde(default)]
    pub md5sum: String,
    pub molecule: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignatureFile {
    Many(Vec<Signature>),
    One(Signature),
}

/// The sketch chosen from a signature file, with the parameters needed to reproduce it.
#[derive(Clone, Debug)]
pub struct SelectedSketch {
    pub name: String,
    pub sketch: FracMinHash,
}

impl Signature {
    /// Wrap a DNA FracMinHash sketch as a signature.
    pub fn from_sketch(name: &str, filename: &str, sketch: &FracMinHash) -> Self {
        let params = sketch.params();
        let record = SketchRecord {
            num: 0,
            ksize: params.k() as u32,
            seed: params.seed(),
            max_hash: sketch.max_hash(),
            mins: sketch.hashes().iter().copied().collect(),
            abundances: None,
            md5sum: sketch.md5sum(),
            molecule: params.molecule().to_string(),
        };

        Signature {
            class: default_class(),
            email: String::new(),
            hash_function: HASH_FUNCTION.to_string(),
            filename: Some(filename.to_string()),
            name: Some(name.to_string()),
            license: default_license(),
            signatures: vec![record],
            version: SIGNATURE_VERSION,
        }
    }

    /// Display name, falling back to the filename as sourmash does.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| self.filename.clone())
            .unwrap_or_default()
    }
}

impl SketchRecord {
    fn matches(&self, ksize: u8, molecule: Molecule) -> bool {
        self.ksize == ksize as u32
            && self
                .molecule
                .parse::<Molecule>()
                .is_ok_and(|m| m == molecule)
    }

    /// Convert to an in-memory sketch using the record's own parameters.
    pub fn to_sketch(&self) -> Result<FracMinHash> {
        if self.max_hash == 0 {
            return Err(HashannotError::UnsupportedSketch(format!(
                "num = {} sketches are not FracMinHash sketches",
                self.num
            ))
            .into());
        }

        let kmer_length = u8::try_from(self.ksize).map_err(|_| {
            HashannotError::UnsupportedSketch(format!("k-mer length {} is too large", self.ksize))
        })?;
        let molecule: Molecule = self.molecule.parse()?;
        if molecule != Molecule::Dna {
            return Err(HashannotError::UnsupportedMolecule(molecule).into());
        }

        let params = SketchParams::from_max_hash(kmer_length, self.max_hash, self.seed);
        Ok(FracMinHash::from_hashes(params, self.mins.iter().copied()))
    }
}

fn parse_signatures(contents: &str) -> serde_json::Result<Vec<Signature>> {
    let signatures = match serde_json::from_str(contents)? {
        SignatureFile::Many(sigs) => sigs,
        SignatureFile::One(sig) => vec![sig],
    };
    Ok(signatures)
}

fn is_signature_entry(name: &str) -> bool {
    name.ends_with(".sig") || name.ends_with(".sig.gz")
}

/// Load the signatures of every `*.sig` / `*.sig.gz` entry in a zip collection.
fn load_zip_signatures(path: &Path) -> Result<Vec<Signature>> {
    let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .context(format!("Failed to read zip archive {}", path.display()))?;

    let mut signatures = Vec::new();
    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        let name = entry.name().to_string();
        if entry.is_dir() || !is_signature_entry(&name) {
            continue;
        }

        let mut raw = Vec::new();
        entry
            .read_to_end(&mut raw)
            .context(format!("Failed to read {} in {}", name, path.display()))?;
        let contents = decode_to_string(&raw)
            .context(format!("Failed to read {} in {}", name, path.display()))?;
        let sigs = parse_signatures(&contents)
            .context(format!("Failed to parse {} in {}", name, path.display()))?;
        debug!("Loaded {} signatures from {}", sigs.len(), name);
        signatures.extend(sigs);
    }

    Ok(signatures)
}

/// Load every signature in a (possibly gzip-compressed) JSON file or a zip collection.
pub fn load_signatures(path: &Path) -> Result<Vec<Signature>> {
    if is_zip_file(path)? {
        let signatures = load_zip_signatures(path)?;
        debug!("Loaded {} signatures from zip collection {}", signatures.len(), path.display());
        return Ok(signatures);
    }

    let contents = read_to_string(path)?;
    let signatures = parse_signatures(&contents)
        .context(format!("Failed to parse signature file {}", path.display()))?;
    debug!("Loaded {} signatures from {}", signatures.len(), path.display());

    Ok(signatures)
}

/// Select the single sketch matching the k-mer length and molecule type.
pub fn select_sketch(
    signatures: &[Signature],
    ksize: u8,
    molecule: Molecule,
    source: &Path,
) -> Result<SelectedSketch> {
    let matches: Vec<(&Signature, &SketchRecord)> = signatures
        .iter()
        .flat_map(|sig| sig.signatures.iter().map(move |record| (sig, record)))
        .filter(|(_, record)| record.matches(ksize, molecule))
        .collect();

    if matches.len() != 1 {
        return Err(HashannotError::Selection {
            source_path: source.display().to_string(),
            ksize,
            molecule,
            found: matches.len(),
        }
        .into());
    }

    let (sig, record) = matches[0];
    Ok(SelectedSketch {
        name: sig.display_name(),
        sketch: record.to_sketch()?,
    })
}

fn is_zip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "zip")
}

/// Write each signature as a gzip-compressed JSON entry of a zip collection.
fn save_zip_signatures(path: &Path, signatures: &[Signature]) -> Result<()> {
    let file = File::create(path).context(format!("Failed to create {}", path.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    for sig in signatures {
        let md5sum = sig
            .signatures
            .first()
            .map(|record| record.md5sum.clone())
            .unwrap_or_default();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        serde_json::to_writer(&mut encoder, &[sig])?;

        // entries are already gzip-compressed
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file(format!("signatures/{md5sum}.sig.gz"), options)?;
        zip.write_all(&encoder.finish()?)?;
    }

    zip.finish()?
        .flush()
        .context(format!("Failed to write signature file {}", path.display()))?;
    Ok(())
}

/// Write signatures as JSON, gzip-compressed if the path ends in `.gz`, or as a zip
/// collection if it ends in `.zip`.
pub fn save_signatures(path: &Path, signatures: &[Signature]) -> Result<()> {
    if is_zip_path(path) {
        return save_zip_signatures(path, signatures);
    }

    let mut writer = create_writer(path)?;
    serde_json::to_writer(&mut writer, signatures)
        .context(format!("Failed to write signature file {}", path.display()))?;
    writer
        .finish()
        .context(format!("Failed to write signature file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SIG_JSON: &str = r#"[{"class":"sourmash_signature","email":"","hash_function":"0.murmur64",
        "filename":"shew-47.fa","name":"shew-47","license":"CC0",
        "signatures":[
            {"num":0,"ksize":21,"seed":42,"max_hash":18446744073709552,"mins":[10,20],"md5sum":"x","molecule":"dna"},
            {"num":0,"ksize":31,"seed":42,"max_hash":18446744073709552,"mins":[5,15,25],"md5sum":"y","molecule":"DNA"},
            {"num":0,"ksize":10,"seed":42,"max_hash":18446744073709552,"mins":[1],"md5sum":"z","molecule":"protein"}
        ],
        "version":0.4}]"#;

    fn write_sig(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("query.sig");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_select_single_sketch() -> Result<()> {
        let (_dir, path) = write_sig(SIG_JSON);
        let sigs = load_signatures(&path)?;
        assert_eq!(sigs.len(), 1);

        let selected = select_sketch(&sigs, 31, Molecule::Dna, &path)?;
        assert_eq!(selected.name, "shew-47");
        assert_eq!(selected.sketch.len(), 3);
        assert_eq!(selected.sketch.params().k(), 31);
        assert_eq!(selected.sketch.params().scaled(), 1000);
        assert_eq!(selected.sketch.params().seed(), 42);

        Ok(())
    }

    #[test]
    fn test_selection_error() -> Result<()> {
        let (_dir, path) = write_sig(SIG_JSON);
        let sigs = load_signatures(&path)?;

        let err = select_sketch(&sigs, 51, Molecule::Dna, &path).unwrap_err();
        match err.downcast_ref::<HashannotError>() {
            Some(HashannotError::Selection { found, .. }) => assert_eq!(*found, 0),
            other => panic!("unexpected error: {other:?}"),
        }

        // two signatures with the same parameters are ambiguous
        let doubled = [sigs.clone(), sigs].concat();
        let err = select_sketch(&doubled, 31, Molecule::Dna, &path).unwrap_err();
        match err.downcast_ref::<HashannotError>() {
            Some(HashannotError::Selection { found, .. }) => assert_eq!(*found, 2),
            other => panic!("unexpected error: {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn test_protein_sketch_rejected() -> Result<()> {
        let (_dir, path) = write_sig(SIG_JSON);
        let sigs = load_signatures(&path)?;

        let err = select_sketch(&sigs, 10, Molecule::Protein, &path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HashannotError>(),
            Some(HashannotError::UnsupportedMolecule(Molecule::Protein))
        ));

        Ok(())
    }

    #[test]
    fn test_num_sketch_rejected() -> Result<()> {
        let json = r#"{"hash_function":"0.murmur64","signatures":[
            {"num":500,"ksize":31,"seed":42,"max_hash":0,"mins":[1,2],"molecule":"dna"}]}"#;
        let (_dir, path) = write_sig(json);
        let sigs = load_signatures(&path)?;

        let err = select_sketch(&sigs, 31, Molecule::Dna, &path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HashannotError>(),
            Some(HashannotError::UnsupportedSketch(_))
        ));

        Ok(())
    }

    #[test]
    fn test_save_and_reload_gz() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.sig.gz");

        let mut sketch = SketchParams::new(5, 1, 42).create_sketcher();
        sketch.add_sequence(b"ACGTTGCAAGGCTTAC");
        let sig = Signature::from_sketch("test", "test.fa", &sketch);
        save_signatures(&path, &[sig.clone()])?;

        let loaded = load_signatures(&path)?;
        assert_eq!(loaded, vec![sig]);

        let selected = select_sketch(&loaded, 5, Molecule::Dna, &path)?;
        assert_eq!(selected.sketch.hashes(), sketch.hashes());

        Ok(())
    }

    #[test]
    fn test_selected_sketch_keeps_max_hash() -> Result<()> {
        // scaled 93 does not survive a max_hash -> scaled -> max_hash round trip
        let params = SketchParams::new(5, 93, 42);
        let mut sketch = params.create_sketcher();
        sketch.add_sequence(b"ACGTTGCAAGGCTTACGGATCCATGCAAGT");
        let sig = Signature::from_sketch("test", "test.fa", &sketch);

        let selected = select_sketch(&[sig], 5, Molecule::Dna, Path::new("test.sig"))?;
        assert_eq!(selected.sketch.max_hash(), params.max_hash());
        assert!(selected.sketch.params().check_compatibility(&params)?);

        Ok(())
    }

    #[test]
    fn test_select_from_zip_collection() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("47.sig.zip");

        // a plain JSON entry next to a manifest that is not a signature
        let mut zip = ZipWriter::new(File::create(&path)?);
        zip.start_file("SOURMASH-MANIFEST.csv", SimpleFileOptions::default())?;
        zip.write_all(b"# SOURMASH-MANIFEST-VERSION: 1.0\n")?;
        zip.start_file("signatures/shew-47.sig", SimpleFileOptions::default())?;
        zip.write_all(SIG_JSON.as_bytes())?;
        zip.finish()?;

        let sigs = load_signatures(&path)?;
        assert_eq!(sigs.len(), 1);

        let selected = select_sketch(&sigs, 31, Molecule::Dna, &path)?;
        assert_eq!(selected.name, "shew-47");
        assert_eq!(selected.sketch.len(), 3);

        Ok(())
    }

    #[test]
    fn test_save_and_reload_zip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.sig.zip");

        let mut sketch = SketchParams::new(5, 1, 42).create_sketcher();
        sketch.add_sequence(b"ACGTTGCAAGGCTTAC");
        let sig = Signature::from_sketch("test", "test.fa", &sketch);
        save_signatures(&path, &[sig.clone()])?;

        let mut archive = ZipArchive::new(File::open(&path)?)?;
        assert_eq!(archive.len(), 1);
        let entry = archive.by_index(0)?;
        assert_eq!(entry.name(), format!("signatures/{}.sig.gz", sketch.md5sum()));
        drop(entry);

        assert_eq!(load_signatures(&path)?, vec![sig]);

        Ok(())
    }
}

