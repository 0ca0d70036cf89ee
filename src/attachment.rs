use std::path::{Path, PathBuf};

use base64::Engine as _;
use bytes::Bytes;
use eyre::Result;
use url::Url;

/// What the file picker itself lets through. Wider than [AllowList::images]: a PDF can be picked, but never validates.
pub const PICKER_ACCEPT: &str = "image/*,.pdf";

/// Media types a selected file must carry to count as valid.
///
/// Constructed once and handed to the widget; there is no way to mutate it afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowList(&'static [&'static str]);
impl AllowList {
	pub const fn new(media_types: &'static [&'static str]) -> Self {
		Self(media_types)
	}

	pub const fn images() -> Self {
		Self(&[
			"image/apng",
			"image/bmp",
			"image/gif",
			"image/jpeg",
			"image/pjpeg",
			"image/png",
			"image/svg+xml",
			"image/tiff",
			"image/webp",
			"image/x-icon",
			"image/vnd.microsoft.icon",
		])
	}

	/// Exact match on the declared media type. No extension fallback.
	pub fn validate(&self, file: &SelectedFile) -> bool {
		self.0.contains(&file.mime_type.as_str())
	}

	pub fn media_types(&self) -> &[&'static str] {
		self.0
	}
}
impl Default for AllowList {
	fn default() -> Self {
		Self::images()
	}
}

/// Mirrors [PICKER_ACCEPT]: any `image/*` type, or anything named `*.pdf`.
pub fn picker_accepts(mime_type: &str, name: &str) -> bool {
	mime_type.starts_with("image/") || name.to_lowercase().ends_with(".pdf")
}

/// Human-readable size, tiers at 1e3 and 1e6. Nothing above MB.
pub fn format_size(byte_size: u64) -> String {
	if byte_size < 1_000 {
		format!("{byte_size} bytes")
	} else if byte_size < 1_000_000 {
		format!("{:.1} KB", byte_size as f64 / 1e3)
	} else {
		format!("{:.1} MB", byte_size as f64 / 1e6)
	}
}

#[derive(Clone, Debug)]
pub enum FileData {
	Memory(Bytes),
	/// Bytes stay on disk until [encode] reads them.
	Path(PathBuf),
}

/// A file handle as produced by the picker: name, declared type and size, with the contents read lazily.
#[derive(Clone, Debug)]
pub struct SelectedFile {
	pub name: String,
	pub mime_type: String,
	pub size: u64,
	pub data: FileData,
}
impl SelectedFile {
	pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
		let data = data.into();
		Self {
			name: name.into(),
			mime_type: mime_type.into(),
			size: data.len() as u64,
			data: FileData::Memory(data),
		}
	}

	/// Only stats the file. Media type is guessed from the extension, the way a browser fills `File.type`.
	pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = std::fs::canonicalize(path.as_ref())?;
		let path = path.as_path();
		let metadata = std::fs::metadata(path)?;
		if !metadata.is_file() {
			eyre::bail!("{} is not a regular file", path.display());
		}
		let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string());
		let mime_type = mime_guess::from_path(path).first().map(|m| m.essence_str().to_owned()).unwrap_or_default();

		Ok(Self {
			name,
			mime_type,
			size: metadata.len(),
			data: FileData::Path(path.to_path_buf()),
		})
	}

	/// Local source for a preview image. Never leaves the machine.
	pub fn thumbnail_src(&self) -> String {
		match &self.data {
			FileData::Memory(bytes) => format!("data:{};base64,{}", self.mime_type, base64::engine::general_purpose::STANDARD.encode(bytes)),
			FileData::Path(path) => std::path::absolute(path).ok().and_then(|abs| Url::from_file_path(abs).ok()).map(String::from).unwrap_or_default(),
		}
	}
}

/// Base64 payload of an attachment, without any `data:` prefix.
#[derive(Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub struct EncodedAttachment(String);
impl EncodedAttachment {
	pub fn from_bytes(bytes: &[u8]) -> Self {
		Self(base64::engine::general_purpose::STANDARD.encode(bytes))
	}

	/// Takes everything after the first comma of a data URL; a bare payload is kept as is.
	pub fn from_data_url(data_url: &str) -> Self {
		match data_url.split_once(',') {
			Some((header, payload)) if header.starts_with("data:") => Self(payload.to_owned()),
			_ => Self(data_url.to_owned()),
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn decode(&self) -> Result<Vec<u8>> {
		Ok(base64::engine::general_purpose::STANDARD.decode(&self.0)?)
	}
}

/// Read the whole file and base64 it. Single await: either the full payload or the read error, nothing in between.
pub async fn encode(file: &SelectedFile) -> std::io::Result<EncodedAttachment> {
	let bytes = match &file.data {
		FileData::Memory(bytes) => bytes.clone(),
		FileData::Path(path) => Bytes::from(tokio::fs::read(path).await?),
	};
	tracing::debug!(name = %file.name, len = bytes.len(), "encoded attachment");
	Ok(EncodedAttachment::from_bytes(&bytes))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn size_boundaries() {
		assert_eq!(format_size(0), "0 bytes");
		assert_eq!(format_size(999), "999 bytes");
		assert_eq!(format_size(1000), "1.0 KB");
		assert_eq!(format_size(1550), "1.6 KB");
		assert_eq!(format_size(999_999), "1000.0 KB");
		assert_eq!(format_size(1_000_000), "1.0 MB");
		assert_eq!(format_size(2_500_000_000), "2500.0 MB");
	}

	#[test]
	fn allow_list_is_exact() {
		let allow = AllowList::images();
		for mime in ["image/png", "image/jpeg", "image/pjpeg", "image/svg+xml", "image/x-icon", "image/apng", "image/webp"] {
			assert!(allow.validate(&SelectedFile::from_bytes("f", mime, vec![1u8])), "{mime}");
		}
		for mime in ["image/PNG", "image/heic", "text/plain", ""] {
			assert!(!allow.validate(&SelectedFile::from_bytes("f.png", mime, vec![1u8])), "{mime}");
		}
	}

	#[test]
	fn pdf_is_pickable_but_invalid() {
		let pdf = SelectedFile::from_bytes("report.pdf", "application/pdf", b"%PDF-1.7".to_vec());
		assert!(picker_accepts(&pdf.mime_type, &pdf.name));
		assert!(!AllowList::images().validate(&pdf));
		assert!(!picker_accepts("text/plain", "notes.txt"));
	}

	#[test]
	fn data_url_prefix_is_stripped() {
		assert_eq!(EncodedAttachment::from_data_url("data:image/png;base64,iVBORw0K").as_str(), "iVBORw0K");
		assert_eq!(EncodedAttachment::from_data_url("iVBORw0K").as_str(), "iVBORw0K");
	}

	#[tokio::test]
	async fn encode_is_lossless() {
		let raw: Vec<u8> = (0..=255u8).cycle().take(4099).collect();
		let file = SelectedFile::from_bytes("noise.bin", "application/octet-stream", raw.clone());
		let encoded = encode(&file).await.unwrap();
		assert_eq!(encoded.decode().unwrap(), raw);

		let via_url = EncodedAttachment::from_data_url(&file.thumbnail_src());
		assert_eq!(via_url, encoded);
	}

	#[tokio::test]
	async fn encode_reads_from_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("pixel.png");
		std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

		let file = SelectedFile::from_path(&path).unwrap();
		assert_eq!(file.name, "pixel.png");
		assert_eq!(file.mime_type, "image/png");
		assert_eq!(file.size, 4);
		assert!(file.thumbnail_src().starts_with("file://"));
		assert_eq!(encode(&file).await.unwrap().decode().unwrap(), vec![0x89, b'P', b'N', b'G']);
	}

	#[test]
	fn file_thumbnails_are_absolute_urls() {
		let relative = SelectedFile {
			name: "x y.png".into(),
			mime_type: "image/png".into(),
			size: 0,
			data: FileData::Path(PathBuf::from("relative/x y.png")),
		};
		let src = relative.thumbnail_src();
		assert!(src.starts_with("file:///"), "{src}");
		assert!(src.ends_with("/relative/x%20y.png"), "{src}");

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("with space.png");
		std::fs::write(&path, b"x").unwrap();
		let file = SelectedFile::from_path(&path).unwrap();
		assert!(matches!(&file.data, FileData::Path(p) if p.is_absolute()));
		assert!(file.thumbnail_src().ends_with("/with%20space.png"));
	}

	#[tokio::test]
	async fn encode_surfaces_read_errors() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("gone.png");
		std::fs::write(&path, b"x").unwrap();
		let file = SelectedFile::from_path(&path).unwrap();
		std::fs::remove_file(&path).unwrap();

		let err = encode(&file).await.unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
	}
}
