//! Font loading, text measurement and line wrapping.
//!
//! A [`FontFace`] measures and wraps text with rusttype metrics. The
//! [`FontResolver`] maps a `fontFamily` + bold request onto a font file,
//! falling back to the configured default font when the family is missing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rusttype::{point, Font, Scale};

use crate::config::FontConfig;
use crate::error::{Result, SubburnError};
use crate::subtitle::layout::{TextMeasurer, TextMetrics};

/// Font files considered when scanning directories.
const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// How deep font directories are scanned.
const MAX_SCAN_DEPTH: usize = 5;

/// File stems tried, in order, when the default font is requested and none is configured.
const DEFAULT_REGULAR: &[&str] = &[
    "DejaVuSans",
    "LiberationSans-Regular",
    "NotoSans-Regular",
    "Arial",
    "Helvetica",
    "Roboto-Regular",
    "FreeSans",
];
const DEFAULT_BOLD: &[&str] = &[
    "DejaVuSans-Bold",
    "LiberationSans-Bold",
    "NotoSans-Bold",
    "Arial Bold",
    "Arial-Bold",
    "Roboto-Bold",
    "FreeSansBold",
];

/// A loaded font.
pub struct FontFace {
    font: Font<'static>,
    path: PathBuf,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace").field("path", &self.path).finish()
    }
}

impl FontFace {
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| {
            SubburnError::Composition(format!("unreadable font file {}", path.display()))
        })?;
        Ok(Self {
            font,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn font(&self) -> &Font<'static> {
        &self.font
    }

    /// Distance from the top of a line box to its baseline.
    pub fn ascent(&self, px: f64) -> f64 {
        self.font.v_metrics(Scale::uniform(px as f32)).ascent as f64
    }

    /// Height of one line including the font's leading.
    pub fn line_height(&self, px: f64) -> f64 {
        let v = self.font.v_metrics(Scale::uniform(px as f32));
        (v.ascent - v.descent + v.line_gap) as f64
    }

    /// Advance width of a single line, kerning included.
    pub fn line_width(&self, line: &str, px: f64) -> f64 {
        self.font
            .layout(line, Scale::uniform(px as f32), point(0.0, 0.0))
            .last()
            .map(|g| (g.position().x + g.unpositioned().h_metrics().advance_width) as f64)
            .unwrap_or(0.0)
    }

    /// Greedy word wrap. `\n` always breaks; a word wider than `max_width` on
    /// its own is split between characters.
    pub fn wrap(&self, text: &str, px: f64, max_width: f64) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let paragraph = paragraph.trim_end_matches('\r');
            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{} {}", current, word)
                };
                if self.line_width(&candidate, px) <= max_width {
                    current = candidate;
                    continue;
                }
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                if self.line_width(word, px) <= max_width {
                    current = word.to_string();
                } else {
                    let mut pieces = self.split_word(word, px, max_width);
                    current = pieces.pop().unwrap_or_default();
                    lines.extend(pieces);
                }
            }
            lines.push(current);
        }
        lines
    }

    fn split_word(&self, word: &str, px: f64, max_width: f64) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        for ch in word.chars() {
            current.push(ch);
            if current.chars().count() > 1 && self.line_width(&current, px) > max_width {
                current.pop();
                pieces.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
        pieces.push(current);
        pieces
    }
}

impl TextMeasurer for FontFace {
    fn measure(&self, text: &str, font_size: f64, max_width: f64) -> TextMetrics {
        let lines = self.wrap(text, font_size, max_width);
        let width = lines
            .iter()
            .map(|l| self.line_width(l, font_size))
            .fold(0.0, f64::max);
        TextMetrics {
            width,
            height: lines.len() as f64 * self.line_height(font_size),
        }
    }
}

/// Finds and caches font files by family name.
pub struct FontResolver {
    config: FontConfig,
    index: OnceLock<HashMap<String, PathBuf>>,
    loaded: Mutex<HashMap<PathBuf, Arc<FontFace>>>,
}

impl FontResolver {
    pub fn new(config: FontConfig) -> Self {
        Self {
            config,
            index: OnceLock::new(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Font for `family`, or the default font when `family` is
    /// "System Default" or can't be found.
    pub fn resolve(&self, family: &str, bold: bool) -> Result<Arc<FontFace>> {
        if !family.is_empty() && family != crate::subtitle::style::SYSTEM_DEFAULT_FAMILY {
            let candidates: Vec<String> = if bold {
                vec![
                    format!("{} Bold", family),
                    format!("{}-Bold", family),
                    format!("{}Bold", family),
                    format!("{}_Bold", family),
                ]
            } else {
                vec![
                    family.to_string(),
                    format!("{}-Regular", family),
                    format!("{} Regular", family),
                ]
            };
            if let Some(path) = self.find(&candidates) {
                return self.load(&path);
            }
            tracing::warn!(family, bold, "font family not found, using default font");
        }
        self.resolve_default(bold)
    }

    fn resolve_default(&self, bold: bool) -> Result<Arc<FontFace>> {
        let configured = if bold {
            self.config
                .default_bold_font
                .as_ref()
                .or(self.config.default_font.as_ref())
        } else {
            self.config.default_font.as_ref()
        };
        if let Some(path) = configured {
            return self.load(path);
        }

        let stems: Vec<String> = if bold {
            DEFAULT_BOLD.iter().chain(DEFAULT_REGULAR).map(|s| s.to_string()).collect()
        } else {
            DEFAULT_REGULAR.iter().map(|s| s.to_string()).collect()
        };
        match self.find(&stems) {
            Some(path) => self.load(&path),
            None => Err(SubburnError::Composition(
                "no usable font found; set fonts.default_font".to_string(),
            )),
        }
    }

    fn find(&self, stems: &[String]) -> Option<PathBuf> {
        let index = self.index.get_or_init(|| scan_font_dirs(&self.config.search_dirs));
        stems
            .iter()
            .find_map(|stem| index.get(&stem.to_lowercase()).cloned())
    }

    fn load(&self, path: &Path) -> Result<Arc<FontFace>> {
        let mut loaded = self.loaded.lock();
        if let Some(face) = loaded.get(path) {
            return Ok(face.clone());
        }
        let face = Arc::new(FontFace::from_file(path)?);
        tracing::debug!(path = %path.display(), "loaded font");
        loaded.insert(path.to_path_buf(), face.clone());
        Ok(face)
    }
}

/// Map lowercase file stem → path for every font file under `dirs`.
/// The first directory listed wins on duplicate stems.
fn scan_font_dirs(dirs: &[PathBuf]) -> HashMap<String, PathBuf> {
    let mut index = HashMap::new();
    for dir in dirs {
        scan_dir(dir, 0, &mut index);
    }
    tracing::debug!(fonts = index.len(), "indexed font directories");
    index
}

fn scan_dir(dir: &Path, depth: usize, index: &mut HashMap<String, PathBuf>) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            scan_dir(&path, depth + 1, index);
            continue;
        }
        let is_font = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_font {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            index.entry(stem.to_lowercase()).or_insert(path.clone());
        }
    }
}
