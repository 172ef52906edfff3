use std::env;
use std::path::PathBuf;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub batch: BatchConfig,
    pub ocr: OcrConfig,
    pub office: OfficeConfig,
    pub server: ServerConfig,
}

/// Directory layout and naming for batch runs.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Sub-directory of `output_dir` that receives per-document image folders.
    pub images_dir_name: String,
    pub extract_images: bool,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract language codes, `+`-joined (e.g. `eng+deu`).
    pub languages: String,
    pub tessdata_path: Option<String>,
    pub dpi: u32,
    /// Executable used to render a single PDF page to PNG.
    pub rasterizer: String,
}

#[derive(Debug, Clone)]
pub struct OfficeConfig {
    pub include_metadata: bool,
    pub include_empty_rows: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

pub const DEFAULT_OCR_DPI: u32 = 300;

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "eng".to_string(),
            tessdata_path: None,
            dpi: DEFAULT_OCR_DPI,
            rasterizer: "pdftoppm".to_string(),
        }
    }
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            include_metadata: true,
            include_empty_rows: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch: BatchConfig {
                input_dir: env::var("DOCTEXT_INPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("uploads")),
                output_dir: env::var("DOCTEXT_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("extracted_texts")),
                images_dir_name: env::var("DOCTEXT_IMAGES_DIR")
                    .unwrap_or_else(|_| "majd_zarai_extracted_images_from_pdf".to_string()),
                extract_images: parse_env_or("DOCTEXT_EXTRACT_IMAGES", true),
            },
            ocr: OcrConfig {
                languages: env::var("OCR_LANGUAGES").unwrap_or_else(|_| "eng".to_string()),
                tessdata_path: env::var("OCR_TESSDATA_PATH").ok(),
                dpi: parse_env_or("OCR_DPI", DEFAULT_OCR_DPI),
                rasterizer: env::var("OCR_RASTERIZER").unwrap_or_else(|_| "pdftoppm".to_string()),
            },
            office: OfficeConfig {
                include_metadata: parse_env_or("DOCX_INCLUDE_METADATA", true),
                include_empty_rows: parse_env_or("XLSX_INCLUDE_EMPTY_ROWS", false),
            },
            server: ServerConfig {
                host: env::var("DOCTEXT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: parse_env_or("DOCTEXT_PORT", 8501),
                max_upload_bytes: parse_env_or("DOCTEXT_MAX_UPLOAD_BYTES", 50 * 1024 * 1024),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

impl BatchConfig {
    /// Root folder for extracted PDF images.
    pub fn images_root(&self) -> PathBuf {
        self.output_dir.join(&self.images_dir_name)
    }
}
