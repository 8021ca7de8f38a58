//! Crash marker persistence
//!
//! The in-memory flag is lost when a crash terminates the process. A crash
//! marker carries the signal across a restart: the watchdog (or a monitor that
//! saw the flag trip) writes it, and the next process reads and clears it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::signal::describe_signal;

pub const MARKER_FILE_NAME: &str = "crash_marker";

/// A recorded crash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashMarker {
    /// Fatal signal number
    pub signal: i32,
    /// PID of the process that crashed
    pub pid: u32,
    /// Seconds since the Unix epoch when the marker was written
    pub timestamp: u64,
}

impl CrashMarker {
    /// Create a marker stamped with the current time
    pub fn new(signal: i32, pid: u32) -> Self {
        Self {
            signal,
            pid,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Marker for a signal observed in this process
    pub fn for_current_process(signal: i32) -> Self {
        Self::new(signal, std::process::id())
    }

    fn encode(&self) -> String {
        format!("{}\n{}\n{}\n", self.signal, self.pid, self.timestamp)
    }

    fn decode(content: &str) -> Option<Self> {
        let mut lines = content.lines();
        let signal: i32 = lines.next()?.trim().parse().ok()?;
        let pid: u32 = lines.next()?.trim().parse().ok()?;
        let timestamp: u64 = lines.next()?.trim().parse().ok()?;
        Some(Self {
            signal,
            pid,
            timestamp,
        })
    }
}

impl std::fmt::Display for CrashMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PID {} crashed with {} at timestamp {}",
            self.pid,
            describe_signal(self.signal),
            self.timestamp
        )
    }
}

/// Get the cache directory for crashflag
fn cache_dir() -> PathBuf {
    ProjectDirs::from("com", "crashflag", "crashflag")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/crashflag"))
}

/// Default path of the crash marker file
pub fn crash_marker_path() -> PathBuf {
    cache_dir().join(MARKER_FILE_NAME)
}

fn is_symlink(path: &Path) -> io::Result<bool> {
    Ok(fs::symlink_metadata(path)?.is_symlink())
}

/// Write a crash marker, replacing any previous one
pub fn write_crash_marker(path: &Path, marker: &CrashMarker) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Write atomically using temp file + rename
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, marker.encode())?;

    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&temp_path, perms)?;
    }

    fs::rename(&temp_path, path)?;

    log::trace!("Wrote crash marker to {}: {}", path.display(), marker);

    Ok(())
}

/// Read the crash marker without removing it
///
/// Returns `Ok(None)` when there is no marker.
pub fn read_crash_marker(path: &Path) -> io::Result<Option<CrashMarker>> {
    if !path.exists() {
        return Ok(None);
    }

    // Check for symlink before reading
    if is_symlink(path)? {
        log::warn!("Crash marker path is a symlink, ignoring");
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let marker = CrashMarker::decode(&content).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "malformed crash marker")
    })?;

    log::info!("Read crash marker: {}", marker);

    Ok(Some(marker))
}

/// Remove the crash marker (called once the crash has been reported)
pub fn clear_crash_marker(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }

    // Check for symlink to prevent targeted file deletion
    if is_symlink(path)? {
        log::warn!("Crash marker path is a symlink, refusing to remove");
        return Ok(());
    }

    fs::remove_file(path)
}

/// Read and clear the crash marker
///
/// A malformed marker is removed and reported as absent.
pub fn take_crash_marker(path: &Path) -> io::Result<Option<CrashMarker>> {
    let marker = match read_crash_marker(path) {
        Ok(marker) => marker,
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            log::warn!("Discarding unreadable crash marker: {}", e);
            None
        }
        Err(e) => return Err(e),
    };
    clear_crash_marker(path)?;
    Ok(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MARKER_FILE_NAME);
        let marker = CrashMarker::new(11, 4242);

        write_crash_marker(&path, &marker).unwrap();
        assert_eq!(read_crash_marker(&path).unwrap(), Some(marker.clone()));
        // Reading does not consume
        assert_eq!(read_crash_marker(&path).unwrap(), Some(marker));
    }

    #[test]
    fn test_marker_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MARKER_FILE_NAME);
        write_crash_marker(&path, &CrashMarker::for_current_process(11)).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_take_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MARKER_FILE_NAME);
        write_crash_marker(&path, &CrashMarker::new(7, 1)).unwrap();

        let taken = take_crash_marker(&path).unwrap().unwrap();
        assert_eq!(taken.signal, 7);
        assert!(!path.exists());
        assert_eq!(take_crash_marker(&path).unwrap(), None);
    }

    #[test]
    fn test_missing_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MARKER_FILE_NAME);
        assert_eq!(read_crash_marker(&path).unwrap(), None);
        clear_crash_marker(&path).unwrap();
    }

    #[test]
    fn test_marker_without_timestamp_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MARKER_FILE_NAME);
        fs::write(&path, "11\n99").unwrap();

        let err = read_crash_marker(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_malformed_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MARKER_FILE_NAME);
        fs::write(&path, "not a signal").unwrap();

        let err = read_crash_marker(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        assert_eq!(take_crash_marker(&path).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_symlink_refused() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        write_crash_marker(&target, &CrashMarker::new(11, 1)).unwrap();

        let link = dir.path().join(MARKER_FILE_NAME);
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(read_crash_marker(&link).unwrap(), None);
        clear_crash_marker(&link).unwrap();
        assert!(target.exists());
    }

    #[test]
    fn test_display() {
        let marker = CrashMarker {
            signal: libc::SIGSEGV,
            pid: 12,
            timestamp: 34,
        };
        assert_eq!(
            marker.to_string(),
            "PID 12 crashed with SIGSEGV (segmentation fault) at timestamp 34"
        );
    }
}
