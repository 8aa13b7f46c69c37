//! ZIP file extraction implementation.
//!
//! The archive is located through its End of Central Directory record, the
//! central directory is parsed once, and each entry is then read from its
//! local header. Stored and deflated entries are supported; ZIP64 is not.
//!
//! Extraction stops at the first failing entry. Entries written before the
//! failure are left in place.

use crate::error::{Error, Result};

use flate2::read::DeflateDecoder;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const EOCD_SIGNATURE: &[u8; 4] = b"\x50\x4b\x05\x06";
const CENTRAL_DIR_SIGNATURE: &[u8; 4] = b"\x50\x4b\x01\x02";
const LOCAL_HEADER_SIGNATURE: &[u8; 4] = b"\x50\x4b\x03\x04";

const COMPRESSION_STORED: u16 = 0;
const COMPRESSION_DEFLATE: u16 = 8;

const EOCD_MIN_SIZE: usize = 22;
const CENTRAL_DIR_ENTRY_MIN_SIZE: usize = 46;
const LOCAL_HEADER_MIN_SIZE: usize = 30;

// Fixed EOCD fields plus the longest possible archive comment.
const EOCD_SEARCH_SIZE: u64 = EOCD_MIN_SIZE as u64 + u16::MAX as u64;

const ZIP64_MARKER: u32 = 0xFFFF_FFFF;
const HOST_UNIX: u16 = 3;

const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Information about a file within a ZIP archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipFileInfo {
    /// Path of the entry inside the archive, `/`-separated.
    pub name: String,
    pub compression_method: u16,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
    /// Unix mode recorded by the archiver, when it ran on a Unix host.
    pub mode: Option<u32>,
}

impl ZipFileInfo {
    /// Whether the entry represents a directory.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// A ZIP archive opened from the local filesystem.
#[derive(Debug)]
pub struct ZipArchive {
    path: PathBuf,
    file: File,
    entries: Vec<ZipFileInfo>,
}

impl ZipArchive {
    /// Open the archive at `path` and read its central directory.
    pub fn open(path: &Path) -> Result<Self> {
        let open_error = |message: &str, source: Option<io::Error>| Error::ArchiveOpen {
            path: path.to_path_buf(),
            message: message.into(),
            source,
        };

        let mut file = File::open(path).map_err(|e| open_error("cannot open file", Some(e)))?;
        let zip_size = file
            .metadata()
            .map_err(|e| open_error("cannot stat file", Some(e)))?
            .len();
        if zip_size < EOCD_MIN_SIZE as u64 {
            return Err(open_error("file is too small to be a ZIP archive", None));
        }

        let eocd_size = std::cmp::min(EOCD_SEARCH_SIZE, zip_size);
        let mut eocd_data = vec![0u8; eocd_size as usize];
        file.seek(SeekFrom::Start(zip_size - eocd_size))
            .and_then(|_| file.read_exact(&mut eocd_data))
            .map_err(|e| open_error("failed to read EOCD", Some(e)))?;

        let eocd_offset = eocd_data
            .windows(4)
            .rposition(|window| window == EOCD_SIGNATURE)
            .ok_or_else(|| open_error("could not find End of Central Directory Record", None))?;

        let eocd = &eocd_data[eocd_offset..];
        if eocd.len() < EOCD_MIN_SIZE {
            return Err(open_error("invalid EOCD record", None));
        }

        let total_entries = read_u16(eocd, 10) as usize;
        let cd_size = read_u32(eocd, 12);
        let cd_offset = read_u32(eocd, 16);
        if cd_size == ZIP64_MARKER || cd_offset == ZIP64_MARKER {
            return Err(open_error("ZIP64 archives are not supported", None));
        }

        let (cd_size, cd_offset) = (cd_size as u64, cd_offset as u64);
        if cd_offset + cd_size > zip_size {
            return Err(open_error("central directory lies outside the file", None));
        }

        let mut cd_data = vec![0u8; cd_size as usize];
        file.seek(SeekFrom::Start(cd_offset))
            .and_then(|_| file.read_exact(&mut cd_data))
            .map_err(|e| open_error("failed to read central directory", Some(e)))?;

        let entries = parse_central_directory(&cd_data)
            .map_err(|message| open_error(&message, None))?;
        if entries.len() < total_entries {
            return Err(open_error("central directory is truncated", None));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            entries,
        })
    }

    /// Gets the path the archive was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the entries listed in the central directory, in archive order.
    pub fn entries(&self) -> &[ZipFileInfo] {
        &self.entries
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the top-level entries of the archive, deduplicated and sorted.
    ///
    /// A release archive wrapping everything in one directory yields a single
    /// name, which is the true root of the extracted tree.
    pub fn top_level_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|info| info.name.split('/').find(|s| !s.is_empty() && *s != "."))
            .map(String::from)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Read and decompress the full content of one entry.
    pub fn read_entry(&self, info: &ZipFileInfo) -> Result<Vec<u8>> {
        let read_error = |message: &str, source: Option<io::Error>| Error::EntryRead {
            name: info.name.clone(),
            message: message.into(),
            source,
        };

        // `&File` implements Read and Seek; the handle is shared, the cursor is not kept.
        let mut file = &self.file;

        let mut header_data = [0u8; LOCAL_HEADER_MIN_SIZE];
        file.seek(SeekFrom::Start(info.local_header_offset))
            .and_then(|_| file.read_exact(&mut header_data))
            .map_err(|e| read_error("failed to read local file header", Some(e)))?;
        if &header_data[0..4] != LOCAL_HEADER_SIGNATURE {
            return Err(read_error("invalid local file header", None));
        }

        let filename_length = read_u16(&header_data, 26) as u64;
        let extra_field_length = read_u16(&header_data, 28) as u64;
        let data_start = info.local_header_offset
            + LOCAL_HEADER_MIN_SIZE as u64
            + filename_length
            + extra_field_length;

        let mut compressed_data = vec![0u8; info.compressed_size as usize];
        file.seek(SeekFrom::Start(data_start))
            .and_then(|_| file.read_exact(&mut compressed_data))
            .map_err(|e| read_error("failed to read file data", Some(e)))?;

        let content = match info.compression_method {
            COMPRESSION_STORED => compressed_data,
            COMPRESSION_DEFLATE => {
                let mut decoder = DeflateDecoder::new(&compressed_data[..]);
                let mut decompressed = Vec::with_capacity(info.uncompressed_size as usize);
                decoder
                    .read_to_end(&mut decompressed)
                    .map_err(|e| read_error("deflate decompression failed", Some(e)))?;
                decompressed
            }
            method => {
                return Err(read_error(
                    &format!("unsupported compression method {}", method),
                    None,
                ))
            }
        };

        if content.len() as u64 != info.uncompressed_size {
            return Err(read_error(
                &format!(
                    "expected {} bytes, got {}",
                    info.uncompressed_size,
                    content.len()
                ),
                None,
            ));
        }

        Ok(content)
    }

    /// Expand every entry under `destination`.
    ///
    /// Returns the path of the last entry processed, or `destination` itself
    /// for an empty archive. The hint is weak: use [`top_level_names`] to find
    /// the real root of the extracted tree.
    ///
    /// [`top_level_names`]: ZipArchive::top_level_names
    pub fn extract_to(&self, destination: &Path) -> Result<PathBuf> {
        let mut unzipped = destination.to_path_buf();

        for info in &self.entries {
            let target = enclosed_path(destination, &info.name).ok_or_else(|| {
                Error::EntryWrite {
                    name: info.name.clone(),
                    path: destination.join(&info.name),
                    source: io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "entry path escapes the destination directory",
                    ),
                }
            })?;
            let write_error = |source: io::Error| Error::EntryWrite {
                name: info.name.clone(),
                path: target.clone(),
                source,
            };

            if info.is_dir() {
                fs::create_dir_all(&target).map_err(write_error)?;
                set_mode(&target, info.mode.unwrap_or(DEFAULT_DIR_MODE)).map_err(write_error)?;
            } else {
                let content = self.read_entry(info)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(write_error)?;
                }
                fs::write(&target, &content).map_err(write_error)?;
                set_mode(&target, info.mode.unwrap_or(DEFAULT_FILE_MODE)).map_err(write_error)?;
            }

            debug!("Extracted {:?} to {:?}", info.name, target);
            unzipped = target;
        }

        Ok(unzipped)
    }
}

/// Extract the ZIP archive at `src` into `dst`.
///
/// Nothing is written under `dst` when the archive cannot be opened.
///
/// ```rust,no_run
/// use std::path::Path;
///
/// # fn example() -> Result<(), dewy::Error> {
/// let last = dewy::archive::extract(Path::new("/tmp/dewy-abc/v1.zip"), Path::new("/srv/app/v1"))?;
/// println!("last extracted entry: {}", last.display());
/// # Ok(())
/// # }
/// ```
pub fn extract(src: &Path, dst: &Path) -> Result<PathBuf> {
    let archive = ZipArchive::open(src)?;
    debug!(
        "Extracting {} entries from {:?} into {:?}",
        archive.len(),
        src,
        dst
    );
    archive.extract_to(dst)
}

/// Parse central directory entries.
fn parse_central_directory(cd_data: &[u8]) -> std::result::Result<Vec<ZipFileInfo>, String> {
    let mut entries = Vec::new();
    let mut offset = 0;

    while offset + CENTRAL_DIR_ENTRY_MIN_SIZE <= cd_data.len() {
        if &cd_data[offset..offset + 4] != CENTRAL_DIR_SIGNATURE {
            return Err(format!("corrupt central directory entry at offset {}", offset));
        }

        let version_made_by = read_u16(cd_data, offset + 4);
        let compression_method = read_u16(cd_data, offset + 10);
        let compressed_size = read_u32(cd_data, offset + 20);
        let uncompressed_size = read_u32(cd_data, offset + 24);
        let filename_length = read_u16(cd_data, offset + 28) as usize;
        let extra_field_length = read_u16(cd_data, offset + 30) as usize;
        let comment_length = read_u16(cd_data, offset + 32) as usize;
        let external_attributes = read_u32(cd_data, offset + 38);
        let local_header_offset = read_u32(cd_data, offset + 42);

        if [compressed_size, uncompressed_size, local_header_offset].contains(&ZIP64_MARKER) {
            return Err("ZIP64 archives are not supported".into());
        }

        let filename_start = offset + CENTRAL_DIR_ENTRY_MIN_SIZE;
        if filename_start + filename_length > cd_data.len() {
            return Err("central directory entry name is truncated".into());
        }
        let name =
            String::from_utf8_lossy(&cd_data[filename_start..filename_start + filename_length])
                .into_owned();

        let unix_mode = external_attributes >> 16;
        let mode = (version_made_by >> 8 == HOST_UNIX && unix_mode != 0).then_some(unix_mode);

        entries.push(ZipFileInfo {
            name,
            compression_method,
            compressed_size: compressed_size as u64,
            uncompressed_size: uncompressed_size as u64,
            local_header_offset: local_header_offset as u64,
            mode,
        });

        offset = filename_start + filename_length + extra_field_length + comment_length;
    }

    Ok(entries)
}

/// Resolve an entry name under `root`, refusing names that escape it.
fn enclosed_path(root: &Path, name: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(path)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
