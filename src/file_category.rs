/// Built-in extension table used when no custom rules are configured.
///
/// This module maps file extensions to a small fixed set of categories
/// (e.g., "images", "documents", "archives"). Lookups are case-insensitive and
/// anything unrecognized lands in [`DEFAULT_CATEGORY`].
///
/// # Examples
///
/// ```
/// use taxon::file_category::{Category, ExtensionTable};
///
/// let table = ExtensionTable::default();
/// assert_eq!(table.categorize("photo.JPG"), Category::Images);
/// assert_eq!(table.categorize("setup.exe"), Category::Executables);
/// assert_eq!(table.categorize("README"), Category::Others);
/// ```
use std::collections::HashMap;
use std::path::Path;

/// Folder name used when nothing classifies a file.
pub const DEFAULT_CATEGORY: &str = "others";

/// A built-in file category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Image files (JPG, PNG, GIF, etc.)
    Images,
    /// Document files (PDF, DOCX, TXT, etc.)
    Documents,
    /// Archive files (ZIP, RAR, 7Z, etc.)
    Archives,
    /// Audio files (MP3, WAV, FLAC, etc.)
    Audio,
    /// Video files (MP4, MKV, AVI, etc.)
    Video,
    /// Source code files
    Code,
    /// Installers and executables
    Executables,
    /// Unknown or uncategorized files
    Others,
}

impl Category {
    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use taxon::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "images");
    /// assert_eq!(Category::Video.dir_name(), "video");
    /// assert_eq!(Category::Others.dir_name(), "others");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Documents => "documents",
            Category::Archives => "archives",
            Category::Audio => "audio",
            Category::Video => "video",
            Category::Code => "code",
            Category::Executables => "executables",
            Category::Others => DEFAULT_CATEGORY,
        }
    }
}

/// Splits a file name into `(base, extension)` at its last dot.
///
/// The extension keeps its leading dot. Only the final suffix is split off, so
/// `"report.tar.gz"` yields `("report.tar", ".gz")`; multi-part extensions are
/// deliberately not recognized. The split point is the one
/// [`Path::file_stem`] uses, so a lone leading dot (`".profile"`) is part of
/// the base, and raw `OsStr` names split the same way in
/// [`unique_file_name`](crate::file_organizer::unique_file_name).
///
/// # Examples
///
/// ```
/// use taxon::file_category::split_extension;
///
/// assert_eq!(split_extension("photo.jpg"), ("photo", ".jpg"));
/// assert_eq!(split_extension("report.tar.gz"), ("report.tar", ".gz"));
/// assert_eq!(split_extension("Makefile"), ("Makefile", ""));
/// ```
pub fn split_extension(file_name: &str) -> (&str, &str) {
    let stem_len = Path::new(file_name)
        .file_stem()
        .map_or(file_name.len(), |stem| stem.len());
    file_name.split_at(stem_len)
}

/// Maps file extensions to categories.
///
/// Keys are stored lower-cased with their leading dot, matching the output of
/// [`split_extension`].
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    extension_map: HashMap<String, Category>,
}

impl ExtensionTable {
    /// Creates a new `ExtensionTable` with the standard mappings.
    pub fn new() -> Self {
        let mut table = Self {
            extension_map: HashMap::new(),
        };
        table.populate_standard_mappings();
        table
    }

    fn populate_standard_mappings(&mut self) {
        const STANDARD: &[(Category, &[&str])] = &[
            (
                Category::Images,
                &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp"],
            ),
            (
                Category::Documents,
                &[".pdf", ".doc", ".docx", ".txt", ".rtf", ".md"],
            ),
            (Category::Archives, &[".zip", ".rar", ".7z", ".tar", ".gz"]),
            (Category::Audio, &[".mp3", ".wav", ".flac", ".aac"]),
            (Category::Video, &[".mp4", ".avi", ".mov", ".mkv", ".wmv"]),
            (
                Category::Code,
                &[".py", ".js", ".html", ".css", ".java", ".cpp"],
            ),
            (
                Category::Executables,
                &[".exe", ".msi", ".dmg", ".pkg", ".deb"],
            ),
        ];

        for (category, extensions) in STANDARD {
            for ext in *extensions {
                self.add_extension_mapping(ext, *category);
            }
        }
    }

    /// Adds an extension to category mapping. The dot is added if missing.
    fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        let ext = ext.to_lowercase();
        let key = if ext.starts_with('.') {
            ext
        } else {
            format!(".{}", ext)
        };
        self.extension_map.insert(key, category);
    }

    /// Maps an extension (with its leading dot) to a category.
    ///
    /// Returns [`Category::Others`] for unknown or empty extensions.
    pub fn category_for_extension(&self, ext: &str) -> Category {
        self.extension_map
            .get(&ext.to_lowercase())
            .copied()
            .unwrap_or(Category::Others)
    }

    /// Classifies a file name by its last extension.
    pub fn categorize(&self, file_name: &str) -> Category {
        let (_, ext) = split_extension(file_name);
        self.category_for_extension(ext)
    }
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self::new()
    }
}
