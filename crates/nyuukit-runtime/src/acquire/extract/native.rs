//! In-process extraction for zip and tar-family archives.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use async_trait::async_trait;
use nyuukit_core::ExtractionStrategyKind;

use super::{ExtractionStrategy, StrategyError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar(TarCompress),
    /// Recognised, but only extractable with an external tool.
    SevenZip,
}

/// Compression codec for tar archives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TarCompress {
    None,
    Gzip,
    Xz,
}

/// Identify an archive from its leading bytes.
pub fn detect_format(data: &[u8]) -> Option<ArchiveFormat> {
    match data {
        [0x50, 0x4B, 0x03, 0x04, ..] => Some(ArchiveFormat::Zip),
        [0x1F, 0x8B, ..] => Some(ArchiveFormat::Tar(TarCompress::Gzip)),
        [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => Some(ArchiveFormat::Tar(TarCompress::Xz)),
        [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C, ..] => Some(ArchiveFormat::SevenZip),
        // POSIX "ustar\0" and GNU "ustar " both start with "ustar".
        _ if data.len() >= 512 && data[257..262] == *b"ustar" => {
            Some(ArchiveFormat::Tar(TarCompress::None))
        }
        _ => None,
    }
}

/// Decodes archives with the `zip`, `tar`, `flate2` and `xz2` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeExtractor;

impl NativeExtractor {
    /// Synchronous extraction, for use from blocking contexts.
    pub fn extract_blocking(archive: &Path, target: &Path) -> Result<(), StrategyError> {
        let mut header = Vec::with_capacity(512);
        File::open(archive)?.take(512).read_to_end(&mut header)?;

        match detect_format(&header) {
            Some(ArchiveFormat::Zip) => extract_zip(archive, target),
            Some(ArchiveFormat::Tar(compress)) => extract_tar(archive, target, compress),
            Some(ArchiveFormat::SevenZip) => Err(StrategyError::Unsupported(
                "7z archives cannot be decoded in-process".to_string(),
            )),
            None => Err(StrategyError::Unsupported(format!(
                "unrecognised archive signature in {}",
                archive.display()
            ))),
        }
    }
}

#[async_trait]
impl ExtractionStrategy for NativeExtractor {
    fn kind(&self) -> ExtractionStrategyKind {
        ExtractionStrategyKind::NativeLibrary
    }

    async fn extract(&self, archive: &Path, target: &Path) -> Result<(), StrategyError> {
        let archive = archive.to_path_buf();
        let target = target.to_path_buf();
        tokio::task::spawn_blocking(move || Self::extract_blocking(&archive, &target))
            .await
            .map_err(|e| StrategyError::Failed(format!("extraction task panicked: {e}")))?
    }
}

fn extract_zip(archive: &Path, target: &Path) -> Result<(), StrategyError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| StrategyError::Failed(format!("failed to read zip archive: {e}")))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| StrategyError::Failed(format!("failed to read zip entry: {e}")))?;

        // Entries escaping the target directory are skipped.
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let dest = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest)?;
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dest, fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }

    Ok(())
}

fn extract_tar(archive: &Path, target: &Path, compress: TarCompress) -> Result<(), StrategyError> {
    let file = File::open(archive)?;
    let reader: Box<dyn Read> = match compress {
        TarCompress::None => Box::new(file),
        TarCompress::Gzip => Box::new(flate2::read::GzDecoder::new(file)),
        TarCompress::Xz => Box::new(xz2::read::XzDecoder::new(file)),
    };

    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.unpack(target)
        .map_err(|e| StrategyError::Failed(format!("failed to unpack tar archive: {e}")))
}
