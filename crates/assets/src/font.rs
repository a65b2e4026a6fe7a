//! Typeface JSON fonts: glyph outlines stored as compact path command strings.
//!
//! Each glyph carries an advance (`ha`) and an outline string `o` made of
//! `m x y`, `l x y`, `q x y cx cy` and `b x y c1x c1y c2x c2y` commands, where
//! curve commands list their end point before the control points.

use crate::AssetError;
use glam::Vec2;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct TypefaceJson {
    glyphs: HashMap<String, GlyphJson>,
    #[serde(rename = "familyName", default)]
    family_name: String,
    resolution: f32,
    #[serde(rename = "boundingBox")]
    bounding_box: BoundingBoxJson,
    #[serde(rename = "underlineThickness", default)]
    underline_thickness: f32,
}

#[derive(Debug, Deserialize)]
struct GlyphJson {
    ha: f32,
    #[serde(default)]
    o: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BoundingBoxJson {
    #[serde(rename = "yMin")]
    y_min: f32,
    #[serde(rename = "yMax")]
    y_max: f32,
}

/// One drawing command of a glyph outline, in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    QuadTo { ctrl: Vec2, to: Vec2 },
    CubicTo { ctrl1: Vec2, ctrl2: Vec2, to: Vec2 },
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Horizontal advance in font units.
    pub advance: f32,
    pub commands: Vec<PathCommand>,
}

/// Closed polylines of one laid-out glyph, in scene units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphContours {
    pub character: char,
    pub contours: Vec<Vec<Vec2>>,
}

/// A parsed typeface font.
#[derive(Debug, Clone)]
pub struct TypefaceFont {
    pub family: String,
    pub resolution: f32,
    line_height_units: f32,
    glyphs: HashMap<char, Glyph>,
}

const FALLBACK_GLYPH: char = '?';

impl TypefaceFont {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        let raw: TypefaceJson = serde_json::from_str(json)?;
        if raw.resolution <= 0.0 {
            return Err(AssetError::InvalidFont(format!(
                "resolution must be positive, got {}",
                raw.resolution
            )));
        }

        let mut glyphs = HashMap::with_capacity(raw.glyphs.len());
        for (key, glyph) in raw.glyphs {
            let mut chars = key.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                tracing::trace!(key = %key, "skipping multi-character glyph key");
                continue;
            };
            let commands = match glyph.o.as_deref() {
                Some(outline) => parse_outline(ch, outline)?,
                None => Vec::new(),
            };
            glyphs.insert(
                ch,
                Glyph {
                    advance: glyph.ha,
                    commands,
                },
            );
        }

        Ok(Self {
            family: raw.family_name,
            resolution: raw.resolution,
            line_height_units: raw.bounding_box.y_max - raw.bounding_box.y_min
                + raw.underline_thickness,
            glyphs,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = Self::from_json(&json)?;
        tracing::debug!(family = %font.family, glyphs = font.glyph_count(), "loaded typeface");
        Ok(font)
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Lay out `text` at `size` scene units per em and flatten every curve
    /// into `curve_segments` straight pieces.
    pub fn layout(
        &self,
        text: &str,
        size: f32,
        curve_segments: u32,
    ) -> Result<Vec<GlyphContours>, AssetError> {
        let scale = size / self.resolution;
        let line_height = self.line_height_units * scale;
        let divisions = curve_segments.max(1);
        let mut offset = Vec2::ZERO;
        let mut laid_out = Vec::new();

        for ch in text.chars() {
            if ch == '\n' {
                offset.x = 0.0;
                offset.y -= line_height;
                continue;
            }
            let glyph = self
                .glyphs
                .get(&ch)
                .or_else(|| self.glyphs.get(&FALLBACK_GLYPH))
                .ok_or(AssetError::MissingGlyph(ch))?;

            let contours = flatten(&glyph.commands, scale, offset, divisions);
            if !contours.is_empty() {
                laid_out.push(GlyphContours {
                    character: ch,
                    contours,
                });
            }
            offset.x += glyph.advance * scale;
        }

        Ok(laid_out)
    }
}

fn parse_outline(ch: char, outline: &str) -> Result<Vec<PathCommand>, AssetError> {
    let mut tokens = outline.split_whitespace();
    let mut commands = Vec::new();

    while let Some(action) = tokens.next() {
        let command = match action {
            "m" => PathCommand::MoveTo(next_point(ch, &mut tokens)?),
            "l" => PathCommand::LineTo(next_point(ch, &mut tokens)?),
            "q" => {
                let to = next_point(ch, &mut tokens)?;
                let ctrl = next_point(ch, &mut tokens)?;
                PathCommand::QuadTo { ctrl, to }
            }
            "b" => {
                let to = next_point(ch, &mut tokens)?;
                let ctrl1 = next_point(ch, &mut tokens)?;
                let ctrl2 = next_point(ch, &mut tokens)?;
                PathCommand::CubicTo { ctrl1, ctrl2, to }
            }
            "z" => PathCommand::Close,
            other => {
                return Err(AssetError::Outline {
                    glyph: ch,
                    reason: format!("unknown command {other:?}"),
                });
            }
        };
        commands.push(command);
    }

    Ok(commands)
}

fn next_point(ch: char, tokens: &mut std::str::SplitWhitespace<'_>) -> Result<Vec2, AssetError> {
    let mut coord = || -> Result<f32, AssetError> {
        let token = tokens.next().ok_or_else(|| AssetError::Outline {
            glyph: ch,
            reason: "unexpected end of outline".into(),
        })?;
        token.parse::<f32>().map_err(|e| AssetError::Outline {
            glyph: ch,
            reason: format!("bad coordinate {token:?}: {e}"),
        })
    };
    let x = coord()?;
    let y = coord()?;
    Ok(Vec2::new(x, y))
}

fn flatten(commands: &[PathCommand], scale: f32, offset: Vec2, divisions: u32) -> Vec<Vec<Vec2>> {
    let place = |p: Vec2| p * scale + offset;
    let mut contours = Vec::new();
    let mut current: Vec<Vec2> = Vec::new();
    let mut cursor = Vec2::ZERO;

    for command in commands {
        match *command {
            PathCommand::MoveTo(p) => {
                finish_contour(&mut current, &mut contours);
                cursor = place(p);
                current.push(cursor);
            }
            PathCommand::LineTo(p) => {
                cursor = place(p);
                current.push(cursor);
            }
            PathCommand::QuadTo { ctrl, to } => {
                let (c, end) = (place(ctrl), place(to));
                for k in 1..=divisions {
                    let t = k as f32 / divisions as f32;
                    let u = 1.0 - t;
                    current.push(cursor * (u * u) + c * (2.0 * u * t) + end * (t * t));
                }
                cursor = end;
            }
            PathCommand::CubicTo { ctrl1, ctrl2, to } => {
                let (c1, c2, end) = (place(ctrl1), place(ctrl2), place(to));
                for k in 1..=divisions {
                    let t = k as f32 / divisions as f32;
                    let u = 1.0 - t;
                    current.push(
                        cursor * (u * u * u)
                            + c1 * (3.0 * u * u * t)
                            + c2 * (3.0 * u * t * t)
                            + end * (t * t * t),
                    );
                }
                cursor = end;
            }
            PathCommand::Close => finish_contour(&mut current, &mut contours),
        }
    }
    finish_contour(&mut current, &mut contours);
    contours
}

fn finish_contour(current: &mut Vec<Vec2>, contours: &mut Vec<Vec<Vec2>>) {
    let mut points = std::mem::take(current);
    points.dedup_by(|a, b| a.distance_squared(*b) < 1e-12);
    while points.len() > 1 && points[0].distance_squared(points[points.len() - 1]) < 1e-12 {
        points.pop();
    }
    if points.len() >= 3 {
        contours.push(points);
    }
}

#[cfg(test)]
pub(crate) const TEST_FONT: &str = r#"{
    "familyName": "Test Sans",
    "resolution": 1000,
    "boundingBox": { "yMin": -200, "xMin": 0, "yMax": 800, "xMax": 1000 },
    "underlineThickness": 50,
    "glyphs": {
        "I": { "ha": 400, "x_min": 0, "x_max": 300, "o": "m 0 0 l 300 0 l 300 700 l 0 700 z" },
        "O": { "ha": 900, "x_min": 0, "x_max": 800,
               "o": "m 0 0 l 800 0 l 800 700 l 0 700 z m 200 200 l 200 500 l 600 500 l 600 200 z" },
        "D": { "ha": 800, "x_min": 0, "x_max": 700,
               "o": "m 0 0 l 400 0 q 700 350 700 0 q 400 700 700 700 l 0 700 z" },
        "?": { "ha": 500, "o": "m 0 0 l 400 0 l 200 600" },
        " ": { "ha": 250 }
    }
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_glyphs() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        assert_eq!(font.family, "Test Sans");
        assert_eq!(font.glyph_count(), 5);
        let o = font.glyph('O').unwrap();
        assert_eq!(o.advance, 900.0);
        assert_eq!(o.commands[0], PathCommand::MoveTo(Vec2::new(0.0, 0.0)));
        assert!(font.glyph(' ').unwrap().commands.is_empty());
    }

    #[test]
    fn quad_end_point_precedes_control() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        let d = font.glyph('D').unwrap();
        assert_eq!(
            d.commands[2],
            PathCommand::QuadTo {
                ctrl: Vec2::new(700.0, 0.0),
                to: Vec2::new(700.0, 350.0),
            }
        );
    }

    #[test]
    fn layout_advances_and_scales() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        let glyphs = font.layout("II", 1.0, 4).unwrap();
        assert_eq!(glyphs.len(), 2);
        let second = &glyphs[1].contours[0];
        // Second glyph starts one advance (400 units = 0.4) to the right.
        assert!((second[0].x - 0.4).abs() < 1e-6);
        assert!(second.iter().all(|p| p.y <= 0.7 + 1e-6));
    }

    #[test]
    fn layout_flattens_curves() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        let glyphs = font.layout("D", 1.0, 5).unwrap();
        // move + line, 5 points for each of the 2 curves, closing line
        assert_eq!(glyphs[0].contours[0].len(), 2 + 5 + 5 + 1);
    }

    #[test]
    fn newline_moves_down_one_line() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        let glyphs = font.layout("I\nI", 1.0, 1).unwrap();
        let line_height = (800.0 + 200.0 + 50.0) / 1000.0;
        let y0 = glyphs[1].contours[0][0].y;
        assert!((y0 + line_height).abs() < 1e-6);
        assert_eq!(glyphs[1].contours[0][0].x, 0.0);
    }

    #[test]
    fn unknown_character_uses_fallback() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        let glyphs = font.layout("Z", 1.0, 1).unwrap();
        assert_eq!(glyphs.len(), 1);
        assert_eq!(glyphs[0].character, 'Z');
        assert_eq!(glyphs[0].contours[0].len(), 3);
    }

    #[test]
    fn missing_fallback_is_an_error() {
        let json = r#"{"resolution": 1000, "boundingBox": {"yMin": 0, "yMax": 1000}, "glyphs": {}}"#;
        let font = TypefaceFont::from_json(json).unwrap();
        let err = font.layout("A", 1.0, 1).unwrap_err();
        assert!(matches!(err, AssetError::MissingGlyph('A')));
    }

    #[test]
    fn malformed_outline_is_rejected() {
        let json = r#"{"resolution": 1000, "boundingBox": {"yMin": 0, "yMax": 1000},
                       "glyphs": {"A": {"ha": 500, "o": "m 0 0 l 10"}}}"#;
        let err = TypefaceFont::from_json(json).unwrap_err();
        assert!(matches!(err, AssetError::Outline { glyph: 'A', .. }));
    }

    #[test]
    fn space_produces_no_contours() {
        let font = TypefaceFont::from_json(TEST_FONT).unwrap();
        let glyphs = font.layout("I I", 1.0, 1).unwrap();
        assert_eq!(glyphs.len(), 2);
        assert!((glyphs[1].contours[0][0].x - (0.4 + 0.25)).abs() < 1e-6);
    }
}
