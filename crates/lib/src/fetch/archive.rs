//! Archive packing and unpacking.
//!
//! Supports:
//! - `.tar`
//! - `.tar.gz` / `.tgz`
//! - `.zip`

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder};
use tracing::debug;

use super::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
  Tar,
  TarGz,
  Zip,
}

impl ArchiveKind {
  /// Map an HTTP content type to an archive kind. Parameters such as `charset` are ignored.
  pub fn from_content_type(content_type: &str) -> Option<Self> {
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match mime.as_str() {
      "application/x-tar" | "application/tar" => Some(Self::Tar),
      "application/gzip"
      | "application/x-gzip"
      | "application/x-gtar"
      | "application/x-compressed-tar"
      | "application/tar+gzip" => Some(Self::TarGz),
      "application/zip" | "application/x-zip-compressed" => Some(Self::Zip),
      _ => None,
    }
  }

  /// Guess the kind from a file name or URL, ignoring any query string.
  pub fn from_name(name: &str) -> Option<Self> {
    let name = name.split(['?', '#']).next().unwrap_or(name).to_ascii_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
      Some(Self::TarGz)
    } else if name.ends_with(".tar") {
      Some(Self::Tar)
    } else if name.ends_with(".zip") {
      Some(Self::Zip)
    } else {
      None
    }
  }

  /// Recognize an archive by its leading bytes.
  pub fn sniff(bytes: &[u8]) -> Option<Self> {
    if bytes.starts_with(&[0x1f, 0x8b]) {
      Some(Self::TarGz)
    } else if bytes.starts_with(b"PK\x03\x04") {
      Some(Self::Zip)
    } else if bytes.len() > 262 && &bytes[257..262] == b"ustar" {
      Some(Self::Tar)
    } else {
      None
    }
  }

  pub fn extension(self) -> &'static str {
    match self {
      Self::Tar => "tar",
      Self::TarGz => "tar.gz",
      Self::Zip => "zip",
    }
  }
}

/// Unpack an archive into `dest`, creating it if needed.
///
/// Entries keep their paths; entries that would escape `dest` are skipped.
pub fn unpack(archive_path: &Path, kind: ArchiveKind, dest: &Path) -> Result<(), FetchError> {
  fs::create_dir_all(dest).map_err(|source| FetchError::Io {
    path: dest.to_path_buf(),
    source,
  })?;

  let file = File::open(archive_path).map_err(|source| FetchError::Io {
    path: archive_path.to_path_buf(),
    source,
  })?;
  let reader = BufReader::new(file);

  let result = match kind {
    ArchiveKind::Tar => unpack_tar(reader, dest),
    ArchiveKind::TarGz => unpack_tar(GzDecoder::new(reader), dest),
    ArchiveKind::Zip => unpack_zip(reader, dest),
  };

  result.map_err(|e| FetchError::Extract {
    path: archive_path.to_path_buf(),
    message: e.to_string(),
  })?;

  debug!(archive = %archive_path.display(), dest = %dest.display(), "unpacked archive");
  Ok(())
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> io::Result<()> {
  let mut archive = Archive::new(reader);

  for entry in archive.entries()? {
    let mut entry = entry?;
    if !entry.unpack_in(dest)? {
      debug!(path = %entry.path()?.display(), "skipping entry outside destination");
    }
  }

  Ok(())
}

fn unpack_zip<R: Read + io::Seek>(reader: R, dest: &Path) -> io::Result<()> {
  let mut archive = zip::ZipArchive::new(reader).map_err(io::Error::other)?;

  for i in 0..archive.len() {
    let mut file = archive.by_index(i).map_err(io::Error::other)?;

    let Some(path) = file.enclosed_name() else {
      debug!(name = %file.name(), "skipping entry outside destination");
      continue;
    };
    let dest_path = dest.join(path);

    if file.is_dir() {
      fs::create_dir_all(&dest_path)?;
    } else {
      if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)?;
      }

      let mut outfile = File::create(&dest_path)?;
      io::copy(&mut file, &mut outfile)?;

      #[cfg(unix)]
      {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = file.unix_mode() {
          fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))?;
        }
      }
    }
  }

  Ok(())
}

/// Tar the contents of `dir`, with entry paths relative to `dir`.
pub fn pack_dir(dir: &Path) -> io::Result<Vec<u8>> {
  let mut builder = Builder::new(Vec::new());
  builder.follow_symlinks(false);
  builder.append_dir_all(".", dir)?;
  builder.into_inner()
}

/// Tar a single file as one entry named `name`.
pub fn pack_file(path: &Path, name: &str) -> io::Result<Vec<u8>> {
  let mut builder = Builder::new(Vec::new());
  builder.append_path_with_name(path, name)?;
  builder.into_inner()
}

/// Write a gzip-compressed tarball of the contents of `dir` to `out`.
pub fn pack_dir_gz(dir: &Path, out: &Path) -> io::Result<()> {
  let file = File::create(out)?;
  let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
  builder.follow_symlinks(false);
  builder.append_dir_all(".", dir)?;
  builder.into_inner()?.finish()?;
  Ok(())
}
