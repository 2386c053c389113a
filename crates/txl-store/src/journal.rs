use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryVersionedStore;
use crate::predicate::Predicate;
use crate::traits::{QueryHit, Revision, VersionedStore};

/// Flush/sync strategy for the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every write.
    EveryWrite,
    /// Hand writes to the OS and rely on page-cache write-back.
    #[default]
    OsDefault,
}

/// Configuration for a [`JournalStore`].
#[derive(Clone, Debug, Default)]
pub struct JournalConfig {
    pub sync_mode: SyncMode,
}

/// One journaled write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct JournalEntry {
    key: String,
    value: Vec<u8>,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Destination of framed appends.
trait FrameSink {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl FrameSink for File {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.write_all(frame)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

struct JournalWriter<F = File> {
    file: F,
    /// Current end of the journal file.
    offset: u64,
    /// A failed append could not be rolled back; the tail is unknown.
    damaged: bool,
}

impl<F: FrameSink> JournalWriter<F> {
    fn new(file: F, offset: u64) -> Self {
        Self {
            file,
            offset,
            damaged: false,
        }
    }

    /// Append one complete frame and return its offset.
    ///
    /// A failed write or sync cuts the file back to the previous end, so the
    /// rejected frame can never reach disk later.
    fn append_frame(&mut self, frame: &[u8], sync: bool) -> StoreResult<u64> {
        if self.damaged {
            return Err(StoreError::Corrupt {
                offset: self.offset,
                reason: "tail left unknown by an earlier failed write; reopen the store".into(),
            });
        }

        let start = self.offset;
        let written = self
            .file
            .write_frame(frame)
            .and_then(|()| if sync { self.file.sync() } else { Ok(()) });
        if let Err(e) = written {
            match self.file.truncate(start) {
                Ok(()) => warn!(offset = start, error = %e, "journal append failed; rolled back"),
                Err(rollback) => {
                    error!(offset = start, error = %rollback, "journal rollback failed");
                    self.damaged = true;
                }
            }
            return Err(e.into());
        }

        self.offset += frame.len() as u64;
        Ok(start)
    }
}

/// Serialize one entry into `[len][crc][payload]`.
fn encode_frame(key: &str, value: &[u8]) -> StoreResult<Vec<u8>> {
    let entry = JournalEntry {
        key: key.to_string(),
        value: value.to_vec(),
    };
    let payload =
        bincode::serialize(&entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization("journal entry exceeds 4 GiB".into()))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Append-only journal file with an in-memory revision index.
///
/// On-disk format, one frame per `put`:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized key + value)]
/// ```
///
/// Opening the store takes an exclusive lock on `<path>.lock` and holds it
/// until the store is dropped, so one process owns the journal at a time.
/// The journal is then replayed front to back. Frames failing the CRC check
/// are skipped. An incomplete final frame is a torn write and is truncated
/// so later appends stay reachable. A bad frame that is followed by intact
/// frames is corruption: `open` fails and leaves the file untouched.
pub struct JournalStore {
    path: PathBuf,
    writer: Mutex<JournalWriter>,
    index: InMemoryVersionedStore,
    config: JournalConfig,
    _lock: File,
}

impl JournalStore {
    /// Open (or create) the journal at `path` and replay it.
    pub fn open(path: &Path, config: JournalConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lock = acquire_lock(path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let (entries, valid_len) = replay(&bytes)?;
        let file_len = bytes.len() as u64;
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "discarding torn journal tail"
            );
            file.set_len(valid_len)?;
        }

        let index = InMemoryVersionedStore::new();
        for entry in &entries {
            index.put(&entry.key, &entry.value)?;
        }

        info!(
            path = %path.display(),
            keys = index.len(),
            entries = entries.len(),
            "journal store opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(JournalWriter::new(file, valid_len)),
            index,
            config,
            _lock: lock,
        })
    }

    /// Current end of the journal in bytes.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.lock_writer()?.offset)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn lock_writer(&self) -> StoreResult<MutexGuard<'_, JournalWriter>> {
        self.writer.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Frame and append one entry. The caller holds the writer lock.
    fn append(&self, w: &mut JournalWriter, key: &str, value: &[u8]) -> StoreResult<()> {
        let frame = encode_frame(key, value)?;
        let sync = self.config.sync_mode == SyncMode::EveryWrite;
        let entry_offset = w.append_frame(&frame, sync)?;
        debug!(offset = entry_offset, len = frame.len(), key, "journal append");
        Ok(())
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Take the sidecar lock for `path` without blocking.
fn acquire_lock(path: &Path) -> StoreResult<File> {
    let lock = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(path))?;
    if lock.try_lock_exclusive().is_err() {
        return Err(StoreError::Locked {
            path: path.to_path_buf(),
        });
    }
    Ok(lock)
}

/// Parse a frame header from the front of `buf`.
fn read_header(buf: &[u8]) -> Option<(usize, u32)> {
    let header = buf.get(..HEADER_SIZE)?;
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    Some((length as usize, crc))
}

/// End offset of the frame starting at `start`, if its length is usable.
fn frame_end(bytes: &[u8], start: usize, length: usize) -> Option<usize> {
    let end = start.checked_add(HEADER_SIZE)?.checked_add(length)?;
    (length > 0 && end <= bytes.len()).then_some(end)
}

/// First offset at or after `from` where a complete, CRC-valid, decodable
/// frame starts.
fn find_intact_frame(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len()).find(|&start| {
        let Some((length, crc)) = read_header(&bytes[start..]) else {
            return false;
        };
        let Some(end) = frame_end(bytes, start, length) else {
            return false;
        };
        let payload = &bytes[start + HEADER_SIZE..end];
        crc32fast::hash(payload) == crc && bincode::deserialize::<JournalEntry>(payload).is_ok()
    })
}

/// Read every intact entry and the byte length of the intact prefix.
///
/// Everything past the returned length is a torn tail: no complete frame
/// starts there.
fn replay(bytes: &[u8]) -> StoreResult<(Vec<JournalEntry>, u64)> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let Some((length, expected_crc)) = read_header(&bytes[offset..]) else {
            warn!(offset, remaining = bytes.len() - offset, "partial journal header; torn tail");
            break;
        };

        let Some(end) = frame_end(bytes, offset, length) else {
            if let Some(next) = find_intact_frame(bytes, offset + 1) {
                return Err(StoreError::Corrupt {
                    offset: offset as u64,
                    reason: format!(
                        "frame length {length} is invalid but an intact frame follows at offset {next}"
                    ),
                });
            }
            warn!(offset, length, file_len = bytes.len(), "incomplete journal frame; torn tail");
            break;
        };

        let payload = &bytes[offset + HEADER_SIZE..end];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "journal CRC mismatch; skipping frame"
            );
            offset = end;
            continue;
        }

        match bincode::deserialize::<JournalEntry>(payload) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(offset, error = %e, "undecodable journal frame; skipping");
            }
        }
        offset = end;
    }

    debug!(recovered = entries.len(), valid_len = offset, "journal replay complete");
    Ok((entries, offset as u64))
}

impl VersionedStore for JournalStore {
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let mut w = self.lock_writer()?;
        self.append(&mut w, key, value)?;
        self.index.put(key, value)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.index.get(key)
    }

    fn history_of(&self, key: &str) -> StoreResult<Vec<Revision>> {
        self.index.history_of(key)
    }

    fn query(&self, predicate: &Predicate) -> StoreResult<Vec<QueryHit>> {
        self.index.query(predicate)
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        // All writes hold the writer lock and the file lock excludes other
        // processes, so the check below cannot race.
        let mut w = self.lock_writer()?;
        if self.index.contains(key)? {
            return Ok(false);
        }
        self.append(&mut w, key, value)?;
        self.index.put(key, value)?;
        Ok(true)
    }
}

impl std::fmt::Debug for JournalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalStore")
            .field("path", &self.path)
            .field("key_count", &self.index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};
    use std::sync::Arc;
    use std::thread;

    fn open(path: &Path) -> JournalStore {
        JournalStore::open(path, JournalConfig::default()).unwrap()
    }

    #[test]
    fn reopen_recovers_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");

        {
            let store = open(&path);
            store.put("a", b"1").unwrap();
            store.put("a", b"2").unwrap();
            store.put("b", b"x").unwrap();
        }

        let store = open(&path);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").unwrap(), Some(b"2".to_vec()));
        let history: Vec<Vec<u8>> = store
            .history_of("a")
            .unwrap()
            .into_iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(history, vec![b"1".to_vec(), b"2".to_vec()]);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/ledger.journal");
        let store = open(&path);
        assert!(store.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn crc_mismatch_skips_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.journal");

        {
            let store = open(&path);
            store.put("first", b"1").unwrap();
            store.put("second", b"2").unwrap();
        }

        // Flip the first payload byte of the first frame.
        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            file.write_all(&buf).unwrap();
            file.sync_all().unwrap();
        }

        let store = open(&path);
        assert_eq!(store.get("first").unwrap(), None);
        assert_eq!(store.get("second").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn torn_tail_is_truncated_and_appends_stay_reachable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.journal");

        let total_len = {
            let store = open(&path);
            store.put("a", b"1").unwrap();
            store.put("b", b"2").unwrap();
            store.offset().unwrap()
        };

        {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(total_len - 3).unwrap();
        }

        {
            let store = open(&path);
            assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
            assert_eq!(store.get("b").unwrap(), None);
            store.put("c", b"3").unwrap();
        }

        let store = open(&path);
        assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get("c").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn put_if_absent_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cas.journal");

        {
            let store = open(&path);
            assert!(store.put_if_absent("k", b"first").unwrap());
        }

        let store = open(&path);
        assert!(!store.put_if_absent("k", b"second").unwrap());
        assert_eq!(store.get("k").unwrap(), Some(b"first".to_vec()));
        assert_eq!(store.history_of("k").unwrap().len(), 1);
    }

    #[test]
    fn concurrent_put_if_absent_has_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(open(&dir.path().join("race.journal")));

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.put_if_absent("same", &[i]).unwrap())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn query_reads_replayed_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.journal");
        {
            let store = open(&path);
            store.put("t1", br#"{"fromAccount":"A"}"#).unwrap();
            store.put("t2", br#"{"toAccount":"B"}"#).unwrap();
        }

        let store = open(&path);
        let hits = store.query(&Predicate::eq("toAccount", "B")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "t2");
    }

    #[test]
    fn every_write_sync_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig {
            sync_mode: SyncMode::EveryWrite,
        };
        let store = JournalStore::open(&dir.path().join("sync.journal"), config).unwrap();
        store.put("k", b"v").unwrap();
        assert!(store.offset().unwrap() > HEADER_SIZE as u64);
    }

    #[test]
    fn second_open_is_locked_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owned.journal");

        let first = open(&path);
        assert!(first.put_if_absent("tx1", b"first").unwrap());

        let err = JournalStore::open(&path, JournalConfig::default()).unwrap_err();
        assert!(matches!(err, StoreError::Locked { path: ref p } if *p == path));

        drop(first);
        let second = open(&path);
        assert!(!second.put_if_absent("tx1", b"second").unwrap());
        assert_eq!(second.history_of("tx1").unwrap().len(), 1);
    }

    #[test]
    fn bad_length_before_intact_frames_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midfile.journal");

        {
            let store = open(&path);
            store.put("a", b"1").unwrap();
            store.put("b", b"2").unwrap();
            store.put("c", b"3").unwrap();
        }
        let before = fs::read(&path).unwrap();

        // High byte of the first frame's length.
        let mut damaged = before.clone();
        damaged[3] ^= 0x7F;
        fs::write(&path, &damaged).unwrap();

        let err = JournalStore::open(&path, JournalConfig::default()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { offset: 0, .. }), "{err}");
        assert_eq!(fs::read(&path).unwrap(), damaged);
    }

    #[test]
    fn zero_length_tail_is_torn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zeros.journal");

        let valid = {
            let store = open(&path);
            store.put("a", b"1").unwrap();
            store.offset().unwrap()
        };
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0u8; 12]).unwrap();
        }

        let store = open(&path);
        assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.offset().unwrap(), valid);
        assert_eq!(fs::metadata(&path).unwrap().len(), valid);
    }

    /// In-memory sink whose next write stores half the frame then fails.
    #[derive(Default)]
    struct FlakySink {
        data: Vec<u8>,
        fail_next_write: bool,
        fail_truncate: bool,
    }

    impl FrameSink for FlakySink {
        fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
            if std::mem::take(&mut self.fail_next_write) {
                self.data.extend_from_slice(&frame[..frame.len() / 2]);
                return Err(io::Error::other("no space left on device"));
            }
            self.data.extend_from_slice(frame);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.fail_truncate {
                return Err(io::Error::other("read-only file system"));
            }
            self.data.truncate(len as usize);
            Ok(())
        }
    }

    #[test]
    fn failed_append_rolls_back_partial_frame() {
        let mut writer = JournalWriter::new(FlakySink::default(), 0);
        let first = encode_frame("a", b"1").unwrap();
        let rejected = encode_frame("b", b"2").unwrap();
        let next = encode_frame("c", b"3").unwrap();

        assert_eq!(writer.append_frame(&first, false).unwrap(), 0);

        writer.file.fail_next_write = true;
        assert!(matches!(
            writer.append_frame(&rejected, true),
            Err(StoreError::Io(_))
        ));
        assert_eq!(writer.file.data, first);
        assert_eq!(writer.offset, first.len() as u64);

        assert_eq!(writer.append_frame(&next, false).unwrap(), first.len() as u64);
        let (entries, valid_len) = replay(&writer.file.data).unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["a", "c"]);
        assert_eq!(valid_len, writer.offset);
    }

    #[test]
    fn unrecoverable_rollback_refuses_further_appends() {
        let mut writer = JournalWriter::new(FlakySink::default(), 0);
        writer.file.fail_next_write = true;
        writer.file.fail_truncate = true;

        let frame = encode_frame("a", b"1").unwrap();
        assert!(writer.append_frame(&frame, false).is_err());
        assert!(matches!(
            writer.append_frame(&frame, false),
            Err(StoreError::Corrupt { offset: 0, .. })
        ));
    }
}
