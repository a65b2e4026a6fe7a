//! Asset services: matcap textures, typeface fonts, and procedural geometry.
//!
//! Textures are identified by the hash of their source bytes, so reloading an
//! unchanged file yields an equal [`AssetId`](donutfield_common::AssetId).
//! Geometry is produced as plain [`MeshData`]; GPU upload happens elsewhere.

pub mod font;
mod mesh;
pub mod text;
mod texture;
mod torus;

use std::path::PathBuf;

pub use font::{GlyphContours, TypefaceFont};
pub use mesh::{Bounds, MeshData};
pub use text::{TextParams, text_mesh};
pub use texture::{FsTextureSource, MatcapTexture, TextureSource, content_id};
pub use torus::{TorusParams, torus_mesh};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid font: {0}")]
    InvalidFont(String),
    #[error("malformed outline for glyph {glyph:?}: {reason}")]
    Outline { glyph: char, reason: String },
    #[error("no glyph for {0:?} and no fallback glyph")]
    MissingGlyph(char),
    #[error("triangulation failed: {0}")]
    Triangulation(String),
}

/// Lay out `text` in `font`, extrude it and center the result on the origin.
pub fn centered_text_mesh(
    font: &TypefaceFont,
    text: &str,
    params: &TextParams,
) -> Result<MeshData, AssetError> {
    let mut mesh = text_mesh(font, text, params)?;
    mesh.center();
    Ok(mesh)
}
