//! Decoding a whole `usagestats` directory.
//!
//! On device the artifacts live under `/data/system/usagestats/<user>/{daily,weekly,monthly,yearly}/`,
//! one file per interval, named after the interval's start time in epoch milliseconds.
use crate::err::{Result, UsageStatsError};
use crate::record::{DecodeOutcome, DecodedArtifact};
use crate::sink::RecordSink;
use crate::usagestats_parser::{ParserSettings, decode};

use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

#[cfg(feature = "multithreading")]
use rayon::prelude::*;

/// The interval bucket an artifact belongs to, taken from its parent directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(format!("`{other}` is not a usagestats frequency")),
        }
    }
}

/// A file that looks like a usagestats artifact and is waiting to be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCandidate {
    pub path: PathBuf,
    pub file_name: String,
    pub frequency: String,
}

/// Per-run counters, owned by the caller and threaded through [`decode_batch`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub files_found: usize,
    pub xml_files: usize,
    pub protobuf_files: usize,
    pub empty_files: usize,
    pub unrecognized_files: usize,
    /// Files that could not be read, or whose name is not a timestamp.
    pub failed_files: usize,
    pub records: usize,
}

impl BatchStats {
    pub fn record_outcome(&mut self, outcome: &DecodeOutcome, records: usize) {
        match outcome {
            DecodeOutcome::XmlOk => self.xml_files += 1,
            DecodeOutcome::ProtobufOk => self.protobuf_files += 1,
            DecodeOutcome::Empty => self.empty_files += 1,
            DecodeOutcome::Unrecognized { .. } => self.unrecognized_files += 1,
        }
        self.records += records;
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files found: {} xml, {} protobuf, {} empty, {} unrecognized, {} failed; {} records",
            self.files_found,
            self.xml_files,
            self.protobuf_files,
            self.empty_files,
            self.unrecognized_files,
            self.failed_files,
            self.records
        )
    }
}

/// Usagestats artifacts are named by their epoch-millisecond start time and nothing else.
pub fn is_artifact_name(file_name: &str) -> bool {
    !file_name.is_empty() && file_name.bytes().all(|b| b.is_ascii_digit())
}

/// Nearest ancestor directory of `path` that names a frequency bucket.
pub fn classify_frequency(path: &Path) -> Option<Frequency> {
    path.ancestors()
        .skip(1)
        .filter_map(|dir| dir.file_name()?.to_str())
        .find_map(|name| name.parse().ok())
}

/// Walks `root` and returns every artifact inside a frequency directory, sorted by path.
pub fn discover_artifacts(root: impl AsRef<Path>) -> Result<Vec<ArtifactCandidate>> {
    let root = root.as_ref();
    root.metadata()
        .map_err(|source| UsageStatsError::FailedToRead {
            path: root.to_path_buf(),
            source,
        })?;

    let mut candidates = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable directory entry: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_artifact_name(file_name) {
            continue;
        }

        match classify_frequency(entry.path()) {
            Some(frequency) => candidates.push(ArtifactCandidate {
                path: entry.path().to_path_buf(),
                file_name: file_name.to_owned(),
                frequency: frequency.as_str().to_owned(),
            }),
            None => debug!(
                "{}: not inside a frequency directory, skipping",
                entry.path().display()
            ),
        }
    }

    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    info!("found {} usagestats artifacts under {}", candidates.len(), root.display());

    Ok(candidates)
}

/// Reads and decodes a single candidate.
pub fn decode_candidate(candidate: &ArtifactCandidate) -> Result<DecodedArtifact> {
    let bytes = std::fs::read(&candidate.path).map_err(|source| UsageStatsError::FailedToRead {
        path: candidate.path.clone(),
        source,
    })?;

    decode(&candidate.file_name, &bytes, &candidate.frequency)
}

/// Decodes every candidate and feeds the records to `sink`, in candidate order.
///
/// A file that cannot be read or decoded is counted in `stats` and skipped. Only a failing
/// sink stops the batch.
pub fn decode_batch<S: RecordSink + ?Sized>(
    candidates: &[ArtifactCandidate],
    settings: &ParserSettings,
    sink: &mut S,
    stats: &mut BatchStats,
) -> Result<()> {
    stats.files_found += candidates.len();

    if settings.get_num_threads() == 1 {
        for candidate in candidates {
            emit(candidate, decode_candidate(candidate), sink, stats)?;
        }
        return Ok(());
    }

    let decoded = decode_parallel(candidates, settings.get_num_threads())?;
    for (candidate, result) in candidates.iter().zip(decoded) {
        emit(candidate, result, sink, stats)?;
    }

    Ok(())
}

/// Decodes on a dedicated rayon pool. Results come back in candidate order.
#[cfg(feature = "multithreading")]
fn decode_parallel(
    candidates: &[ArtifactCandidate],
    num_threads: usize,
) -> Result<Vec<Result<DecodedArtifact>>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|source| UsageStatsError::ThreadPool { source })?;

    Ok(pool.install(|| candidates.par_iter().map(decode_candidate).collect()))
}

#[cfg(not(feature = "multithreading"))]
fn decode_parallel(
    candidates: &[ArtifactCandidate],
    _num_threads: usize,
) -> Result<Vec<Result<DecodedArtifact>>> {
    Ok(candidates.iter().map(decode_candidate).collect())
}

fn emit<S: RecordSink + ?Sized>(
    candidate: &ArtifactCandidate,
    result: Result<DecodedArtifact>,
    sink: &mut S,
    stats: &mut BatchStats,
) -> Result<()> {
    let decoded = match result {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("{}: {e}", candidate.path.display());
            stats.failed_files += 1;
            return Ok(());
        }
    };

    stats.record_outcome(&decoded.outcome, decoded.records.len());

    match &decoded.outcome {
        DecodeOutcome::Unrecognized { .. } => {
            warn!(
                "{}: parse error, not an xml or protobuf usagestats file: {}",
                candidate.path.display(),
                decoded.outcome
            );
        }
        outcome => debug!(
            "{}: {outcome}, {} records",
            candidate.path.display(),
            decoded.records.len()
        ),
    }

    for record in decoded.records {
        sink.consume(record)?;
    }

    Ok(())
}
