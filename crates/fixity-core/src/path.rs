//! Normalized path keys.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt::{self, Write as _};
use std::path::{Component, Path};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Root-relative, `/`-separated file path used as the identity of a file.
///
/// Two spellings of the same location (`a\b.txt`, `./a/b.txt`, a decomposed
/// Unicode form) normalize to the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilePath(CompactString);

impl FilePath {
    /// Normalize a stored path string.
    pub fn new(raw: &str) -> Self {
        Self::normalize(raw, false)
    }

    /// Normalize a stored path string, optionally folding case.
    pub fn normalize(raw: &str, case_insensitive: bool) -> Self {
        let unified = raw.replace('\\', "/");
        let joined = unified
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self::finish(&joined, case_insensitive)
    }

    /// Build a key from a path relative to the audit root.
    ///
    /// Returns `None` for paths that escape the root or name the root itself.
    pub fn from_relative(relative: &Path, case_insensitive: bool) -> Option<Self> {
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(encode_component(part)),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if parts.is_empty() {
            return None;
        }
        Some(Self::normalize(&parts.join("/"), case_insensitive))
    }

    /// Build a key from a path string read back from a snapshot.
    ///
    /// Returns `None` for empty paths, absolute paths, paths with a drive
    /// prefix and paths that climb out of the root through `..`.
    pub fn from_stored(raw: &str, case_insensitive: bool) -> Option<Self> {
        let unified = raw.replace('\\', "/");
        if unified.starts_with('/') || has_drive_prefix(&unified) {
            return None;
        }
        if unified.split('/').any(|part| part == "..") {
            return None;
        }
        let key = Self::normalize(&unified, case_insensitive);
        (!key.0.is_empty()).then_some(key)
    }

    fn finish(joined: &str, case_insensitive: bool) -> Self {
        let composed: String = joined.nfc().collect();
        if case_insensitive {
            Self(CompactString::from(composed.to_lowercase()))
        } else {
            Self(CompactString::from(composed))
        }
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Folder containing this file.
    pub fn parent(&self) -> FolderPath {
        match self.0.rsplit_once('/') {
            Some((dir, _)) => FolderPath(CompactString::from(dir)),
            None => FolderPath::root(),
        }
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FilePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Render one path component as UTF-8 without losing information.
///
/// Bytes that are not valid UTF-8 are written as `%XX`. A `%` that would
/// otherwise read as such an escape becomes `%25`, and `\` becomes `%5C` so
/// it is never taken for a separator. Everything else is kept as is.
pub fn encode_component(name: &OsStr) -> Cow<'_, str> {
    if let Some(text) = name.to_str() {
        if !needs_escape(text) {
            return Cow::Borrowed(text);
        }
    }
    let mut out = String::new();
    for chunk in name.as_encoded_bytes().utf8_chunks() {
        escape_text(chunk.valid(), &mut out);
        for byte in chunk.invalid() {
            push_escaped(&mut out, *byte);
        }
    }
    Cow::Owned(out)
}

fn needs_escape(text: &str) -> bool {
    text.char_indices()
        .any(|(i, c)| c == '\\' || (c == '%' && reads_as_escape(&text[i + 1..])))
}

fn reads_as_escape(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_hexdigit() && bytes[1].is_ascii_hexdigit()
}

fn escape_text(text: &str, out: &mut String) {
    for (i, c) in text.char_indices() {
        match c {
            '\\' => push_escaped(out, b'\\'),
            '%' if reads_as_escape(&text[i + 1..]) => push_escaped(out, b'%'),
            _ => out.push(c),
        }
    }
}

fn push_escaped(out: &mut String, byte: u8) {
    let _ = write!(out, "%{byte:02X}");
}

/// `C:` or `C:/...`
fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/')
}

/// Root-relative folder path. The root folder itself is `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderPath(CompactString);

impl FolderPath {
    /// The audit root.
    pub fn root() -> Self {
        Self(CompactString::new("."))
    }

    /// Check if this is the audit root.
    pub fn is_root(&self) -> bool {
        self.0 == "."
    }

    /// The folder as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
