use crate::AssetError;
use donutfield_common::{AssetId, MatcapId};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A decoded matcap texture in tightly packed RGBA8.
#[derive(Clone, PartialEq, Eq)]
pub struct MatcapTexture {
    pub matcap: MatcapId,
    pub asset: AssetId,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for MatcapTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcapTexture")
            .field("matcap", &self.matcap)
            .field("asset", &self.asset)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl MatcapTexture {
    /// Decode an encoded image (PNG or JPEG) into RGBA8.
    pub fn decode(matcap: MatcapId, bytes: &[u8]) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            matcap,
            asset: content_id(bytes),
            width,
            height,
            rgba: image.into_raw(),
        })
    }

    pub fn load(matcap: MatcapId, path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::decode(matcap, &bytes)
    }
}

/// Source of matcap textures keyed by selection.
pub trait TextureSource: Send + Sync + 'static {
    fn load(&self, matcap: MatcapId) -> Result<MatcapTexture, AssetError>;
}

/// Reads `textures/matcaps/<n>.png` beneath an assets root.
#[derive(Debug, Clone)]
pub struct FsTextureSource {
    root: PathBuf,
}

impl FsTextureSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, matcap: MatcapId) -> PathBuf {
        self.root.join(matcap.relative_path())
    }
}

impl TextureSource for FsTextureSource {
    fn load(&self, matcap: MatcapId) -> Result<MatcapTexture, AssetError> {
        let path = self.path_for(matcap);
        tracing::debug!(%matcap, path = %path.display(), "reading matcap");
        MatcapTexture::load(matcap, path)
    }
}

/// First 8 bytes of the SHA-256 of `bytes`.
pub fn content_id(bytes: &[u8]) -> AssetId {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    AssetId(u64::from_le_bytes(head))
}

#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let mut img = image::RgbaImage::new(width, height);
    for px in img.pixels_mut() {
        *px = image::Rgba(rgba);
    }
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
