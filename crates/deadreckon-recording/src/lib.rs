//! Loader for recorded IMU sessions.
//!
//! The recorder writes one `t,w,x,y,z,ax,ay,az` row per sample, where `t` is
//! either a wall-clock `HH:MM:SS.ffffff` stamp or a millisecond delta. This
//! crate turns those rows into a [`SampleBuffer`] for the pipeline.

pub mod parser;

pub use parser::{LoadStats, RecordingParser, TimeAccumulator, Timestamp};

use deadreckon_nav::SampleBuffer;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name prefix and extension used by the recorder.
const RECORDING_PREFIX: &str = "recording_";
const RECORDING_EXT: &str = ".csv";

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("Failed to open recording {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read recording: {0}")]
    Read(#[from] std::io::Error),
}

/// Parse a recording from any line source.
pub fn parse_recording(reader: impl BufRead) -> Result<(SampleBuffer, LoadStats), RecordingError> {
    let parser = reader.lines().enumerate().try_fold(
        RecordingParser::new(),
        |mut parser, (i, line)| -> Result<_, RecordingError> {
            parser.push_line(i + 1, &line?);
            Ok(parser)
        },
    )?;
    Ok(parser.finish())
}

/// Load a recording from disk.
pub fn load_recording(path: &Path) -> Result<(SampleBuffer, LoadStats), RecordingError> {
    let file = File::open(path).map_err(|source| RecordingError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let (buffer, stats) = parse_recording(BufReader::new(file))?;
    tracing::info!(
        ?path,
        rows = stats.rows,
        substituted = stats.substituted_fields,
        "Loaded recording"
    );
    Ok((buffer, stats))
}

/// Newest `recording_YYYYMMDD_HHMMSS.csv` in `dir`, if any.
///
/// The recorder's timestamped names sort chronologically, so the
/// lexicographically greatest name wins.
pub fn latest_recording(dir: &Path) -> Result<Option<PathBuf>, RecordingError> {
    let mut latest: Option<PathBuf> = None;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_recording = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(RECORDING_PREFIX) && name.ends_with(RECORDING_EXT));
        if is_recording && path.is_file() && latest.as_ref().map_or(true, |l| path > *l) {
            latest = Some(path);
        }
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("deadreckon-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parse_from_reader() {
        let text = "t,w,x,y,z,ax,ay,az\n0,1,0,0,0,0,0,1\n10,1,0,0,0,0,0,2\n";
        let (buffer, stats) = parse_recording(Cursor::new(text)).unwrap();
        assert_eq!(buffer.len(), 2);
        assert_eq!(stats.rows, 2);
        assert_eq!(buffer.quat_components().len(), 8);
        assert_eq!(buffer.accel_components().len(), 6);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let path = std::env::temp_dir().join("deadreckon-no-such-recording.csv");
        let err = load_recording(&path).unwrap_err();
        assert!(matches!(err, RecordingError::Open { .. }));
    }

    #[test]
    fn load_from_disk() {
        let dir = scratch_dir("load");
        let path = dir.join("recording_20250401_235146.csv");
        std::fs::write(&path, "t,w,x,y,z,ax,ay,az\n12:00:00.000000,1,0,0,0,0,0,1\n").unwrap();

        let (buffer, _) = load_recording(&path).unwrap();
        assert_eq!(buffer.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn latest_recording_picks_newest_timestamp() {
        let dir = scratch_dir("latest");
        for name in [
            "recording_20250401_235146.csv",
            "recording_20250402_080000.csv",
            "recording_20250315_120000.csv",
            "notes.txt",
            "zzz.csv",
        ] {
            std::fs::write(dir.join(name), "").unwrap();
        }

        let latest = latest_recording(&dir).unwrap().unwrap();
        assert_eq!(latest.file_name().unwrap(), "recording_20250402_080000.csv");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn latest_recording_in_empty_dir_is_none() {
        let dir = scratch_dir("empty");
        assert!(latest_recording(&dir).unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
