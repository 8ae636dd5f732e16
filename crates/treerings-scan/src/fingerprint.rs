//! Bounded content sampling.
//!
//! A fingerprint is the SHA-1 of a size prefix followed by at most
//! [`SAMPLE_MAX`] bytes of content: the head of the file, a window centered on
//! its midpoint, and its tail. Files no larger than [`SAMPLE_MAX`] are hashed
//! in full. Larger files are NOT fully covered: two files that differ only
//! outside the three windows get the same fingerprint.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use sha1::{Digest, Sha1};
use tracing::{debug, trace, warn};

use treerings_core::Fingerprint;

/// Bytes sampled from the start of the file.
pub const SAMPLE_HEAD: u64 = 16 * 1024;
/// Bytes sampled around the midpoint.
pub const SAMPLE_BODY: u64 = 1_015_808;
/// Bytes sampled from the end of the file.
pub const SAMPLE_TAIL: u64 = 16 * 1024;
/// Upper bound on content bytes fed to the digest.
pub const SAMPLE_MAX: u64 = SAMPLE_HEAD + SAMPLE_BODY + SAMPLE_TAIL;
/// Read granularity.
pub const PAGE_SIZE: usize = 4096;

/// Result of fingerprinting one file.
#[derive(Debug)]
pub struct FingerprintOutcome {
    /// Content digest, or the size-only fallback.
    pub fingerprint: Fingerprint,
    /// Content bytes fed to the digest.
    pub bytes_sampled: u64,
    /// Why the file could not be opened, if it couldn't.
    pub error: Option<io::Error>,
}

impl FingerprintOutcome {
    /// Whether the fingerprint is the size-only fallback.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Fingerprint the file at `path`, whose size is `size` bytes.
///
/// Never fails: a file that cannot be opened gets `size:<size>`.
pub fn fingerprint(path: &Path, size: u64) -> FingerprintOutcome {
    debug!("fingerprinting {} ...", path.display());

    match File::open(path) {
        Ok(mut file) => {
            let (fingerprint, bytes_sampled) = sample(&mut file, size);
            FingerprintOutcome {
                fingerprint,
                bytes_sampled,
                error: None,
            }
        }
        Err(err) => {
            warn!(
                "Unable to fingerprint file {}, using size instead: {err}",
                path.display()
            );
            FingerprintOutcome {
                fingerprint: Fingerprint::from_size(size),
                bytes_sampled: 0,
                error: Some(err),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Head,
    Body,
    Tail,
}

/// Hash the sampled windows of `reader`, positioned at its start.
///
/// Reads page by page, seeking forward to the body window once the head is
/// consumed and to the tail once the body is. A read or seek error ends
/// sampling where it stands. Returns the fingerprint and the number of
/// content bytes hashed.
pub fn sample<R: Read + Seek>(reader: &mut R, size: u64) -> (Fingerprint, u64) {
    let mut hasher = Sha1::new();
    hasher.update(format!("filesize:{size}\n").as_bytes());

    let body_start = (size / 2).saturating_sub(SAMPLE_BODY / 2);
    let mut page = [0u8; PAGE_SIZE];
    let mut total_read: u64 = 0;
    let mut zone = Zone::Head;

    while total_read < SAMPLE_MAX {
        let read = match read_page(reader, &mut page) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        total_read += read as u64;
        hasher.update(&page[..read]);

        match zone {
            Zone::Head if total_read >= SAMPLE_HEAD => {
                if body_start > total_read {
                    trace!("read {total_read}/{size}, seek to body {body_start}");
                    if reader.seek(SeekFrom::Start(body_start)).is_err() {
                        break;
                    }
                }
                zone = Zone::Body;
            }
            Zone::Body if total_read >= SAMPLE_HEAD + SAMPLE_BODY => {
                if size > SAMPLE_MAX {
                    let tail_start = size - SAMPLE_TAIL;
                    trace!("read {total_read}/{size}, seek to tail {tail_start}");
                    if reader.seek(SeekFrom::Start(tail_start)).is_err() {
                        break;
                    }
                }
                zone = Zone::Tail;
            }
            _ => {}
        }
    }

    (Fingerprint::from_digest(&hasher.finalize()), total_read)
}

/// Fill `page` unless end of file comes first.
fn read_page<R: Read>(reader: &mut R, page: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < page.len() {
        match reader.read(&mut page[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if filled == 0 => return Err(e),
            Err(_) => break,
        }
    }
    Ok(filled)
}
