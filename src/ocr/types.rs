//! OCR Types
//!
//! Options forwarded to the external engine, its exit codes, and the
//! error type shared by every engine and recognizer.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use serde::{Deserialize, Serialize};

/// Default recognition language (German + English)
pub const DEFAULT_LANGUAGE: &str = "deu+eng";

/// Highest optimization level the engine understands
pub const MAX_OPTIMIZE_LEVEL: u8 = 3;

/// How the engine treats pages that already carry text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrMode {
    /// Fail on pages that already have text
    #[default]
    Normal,
    /// Rasterize and OCR every page, discarding existing text
    Force,
    /// Leave pages with text untouched
    Skip,
    /// Replace an existing OCR layer
    Redo,
}

impl OcrMode {
    /// Parse a form value. Anything unrecognized behaves as `Normal`.
    pub fn from_form(value: &str) -> Self {
        match value {
            "force" => Self::Force,
            "skip" => Self::Skip,
            "redo" => Self::Redo,
            _ => Self::Normal,
        }
    }

    fn flag(self) -> Option<&'static str> {
        match self {
            Self::Normal => None,
            Self::Force => Some("--force-ocr"),
            Self::Skip => Some("--skip-text"),
            Self::Redo => Some("--redo-ocr"),
        }
    }
}

/// Parameters forwarded to the OCR engine for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOptions {
    pub mode: OcrMode,
    pub language: String,
    pub deskew: bool,
    pub rotate_pages: bool,
    pub remove_background: bool,
    pub clean: bool,
    /// Optimization level (0-3)
    pub optimize: u8,
    /// Page range such as `1-3,7`; empty means all pages
    pub pages: String,
    /// Engine worker count
    pub jobs: usize,
    /// Write recognized text to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<PathBuf>,
    pub progress_bar: bool,
    pub keep_temporary_files: bool,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            mode: OcrMode::Normal,
            language: DEFAULT_LANGUAGE.to_string(),
            deskew: true,
            rotate_pages: false,
            remove_background: false,
            clean: false,
            optimize: 1,
            pages: String::new(),
            jobs: 1,
            sidecar: None,
            progress_bar: false,
            keep_temporary_files: false,
        }
    }
}

impl OcrOptions {
    /// Options for adding a text layer in batch runs: forced OCR, no
    /// optimization, no deskew, text written to `sidecar`.
    pub fn text_layer(language: &str, mode: OcrMode, sidecar: PathBuf) -> Self {
        Self {
            mode,
            language: language.to_string(),
            deskew: false,
            optimize: 0,
            sidecar: Some(sidecar),
            ..Self::default()
        }
    }

    /// Check values the engine would otherwise reject late
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.optimize > MAX_OPTIMIZE_LEVEL {
            return Err(OcrError::InvalidOption(format!(
                "optimize must be between 0 and {}, got {}",
                MAX_OPTIMIZE_LEVEL, self.optimize
            )));
        }
        if self.language.trim().is_empty() {
            return Err(OcrError::InvalidOption("language must not be empty".to_string()));
        }
        if self.jobs == 0 {
            return Err(OcrError::InvalidOption("jobs must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Build the `ocrmypdf` argument list: flags first, then input and output.
    pub fn to_args(&self, input: &Path, output: &Path) -> Result<Vec<OsString>, OcrError> {
        self.validate()?;

        let mut args: Vec<OsString> = vec![
            "--language".into(),
            self.language.as_str().into(),
            "--optimize".into(),
            self.optimize.to_string().into(),
            "--jobs".into(),
            self.jobs.to_string().into(),
        ];

        if let Some(flag) = self.mode.flag() {
            args.push(flag.into());
        }

        let switches = [
            (self.deskew, "--deskew"),
            (self.rotate_pages, "--rotate-pages"),
            (self.remove_background, "--remove-background"),
            (self.clean, "--clean"),
            (self.keep_temporary_files, "--keep-temporary-files"),
            (!self.progress_bar, "--no-progress-bar"),
        ];
        args.extend(
            switches
                .iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, flag)| OsString::from(*flag)),
        );

        let pages = self.pages.trim();
        if !pages.is_empty() {
            args.push("--pages".into());
            args.push(pages.into());
        }

        if let Some(sidecar) = &self.sidecar {
            args.push("--sidecar".into());
            args.push(sidecar.as_os_str().to_owned());
        }

        args.push(input.as_os_str().to_owned());
        args.push(output.as_os_str().to_owned());
        Ok(args)
    }
}

/// Exit codes reported by `ocrmypdf`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExitCode {
    Ok,
    BadArgs,
    InputFile,
    MissingDependency,
    InvalidOutputPdf,
    FileAccessError,
    AlreadyDoneOcr,
    ChildProcessError,
    EncryptedPdf,
    InvalidConfig,
    PdfaConversionFailed,
    OtherError,
    CtrlC,
    /// Terminated by a signal, no exit code
    Killed,
    Unknown(i32),
}

impl EngineExitCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::BadArgs,
            2 => Self::InputFile,
            3 => Self::MissingDependency,
            4 => Self::InvalidOutputPdf,
            5 => Self::FileAccessError,
            6 => Self::AlreadyDoneOcr,
            7 => Self::ChildProcessError,
            8 => Self::EncryptedPdf,
            9 => Self::InvalidConfig,
            10 => Self::PdfaConversionFailed,
            15 => Self::OtherError,
            130 => Self::CtrlC,
            other => Self::Unknown(other),
        }
    }

    pub fn from_status(status: ExitStatus) -> Self {
        status.code().map(Self::from_code).unwrap_or(Self::Killed)
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::BadArgs => "bad_args",
            Self::InputFile => "input_file",
            Self::MissingDependency => "missing_dependency",
            Self::InvalidOutputPdf => "invalid_output_pdf",
            Self::FileAccessError => "file_access_error",
            Self::AlreadyDoneOcr => "already_done_ocr",
            Self::ChildProcessError => "child_process_error",
            Self::EncryptedPdf => "encrypted_pdf",
            Self::InvalidConfig => "invalid_config",
            Self::PdfaConversionFailed => "pdfa_conversion_failed",
            Self::OtherError => "other_error",
            Self::CtrlC => "ctrl_c",
            Self::Killed => "killed",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for EngineExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown ({})", code),
            other => f.write_str(other.as_str()),
        }
    }
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR tool not available: {0}")]
    ToolNotAvailable(String),

    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR engine failed ({code}): {stderr}")]
    Engine { code: EngineExitCode, stderr: String },

    #[error("Text recognition failed: {0}")]
    Recognition(String),

    #[error("Invalid OCR option: {0}")]
    InvalidOption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Keep the last `max_lines` non-empty lines of tool output
pub(crate) fn tail_lines(output: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(output);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_as_strings(options: &OcrOptions) -> Vec<String> {
        options
            .to_args(Path::new("in.pdf"), Path::new("out.pdf"))
            .unwrap()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_default_args() {
        let args = args_as_strings(&OcrOptions::default());
        assert_eq!(
            args,
            vec![
                "--language", "deu+eng", "--optimize", "1", "--jobs", "1", "--deskew",
                "--no-progress-bar", "in.pdf", "out.pdf"
            ]
        );
    }

    #[test]
    fn test_mode_flags() {
        for (mode, flag) in [
            (OcrMode::Force, "--force-ocr"),
            (OcrMode::Skip, "--skip-text"),
            (OcrMode::Redo, "--redo-ocr"),
        ] {
            let options = OcrOptions { mode, ..OcrOptions::default() };
            assert!(args_as_strings(&options).contains(&flag.to_string()));
        }

        let normal = args_as_strings(&OcrOptions::default());
        assert!(!normal.iter().any(|a| a == "--force-ocr" || a == "--skip-text" || a == "--redo-ocr"));
    }

    #[test]
    fn test_unknown_mode_is_normal() {
        assert_eq!(OcrMode::from_form("force"), OcrMode::Force);
        assert_eq!(OcrMode::from_form("bogus"), OcrMode::Normal);
        assert_eq!(OcrMode::from_form(""), OcrMode::Normal);
    }

    #[test]
    fn test_pages_only_when_non_empty() {
        let blank = OcrOptions { pages: "   ".to_string(), ..OcrOptions::default() };
        assert!(!args_as_strings(&blank).contains(&"--pages".to_string()));

        let ranged = OcrOptions { pages: " 1-3 ".to_string(), ..OcrOptions::default() };
        let args = args_as_strings(&ranged);
        let pos = args.iter().position(|a| a == "--pages").unwrap();
        assert_eq!(args[pos + 1], "1-3");
    }

    #[test]
    fn test_text_layer_options() {
        let options = OcrOptions::text_layer("deu+eng", OcrMode::Force, PathBuf::from("doc.txt"));
        let args = args_as_strings(&options);
        assert!(args.contains(&"--force-ocr".to_string()));
        assert!(!args.contains(&"--deskew".to_string()));
        let pos = args.iter().position(|a| a == "--sidecar").unwrap();
        assert_eq!(args[pos + 1], "doc.txt");
        let pos = args.iter().position(|a| a == "--optimize").unwrap();
        assert_eq!(args[pos + 1], "0");
        assert_eq!(args.last().unwrap(), "out.pdf");
    }

    #[test]
    fn test_invalid_optimize_rejected() {
        let options = OcrOptions { optimize: 4, ..OcrOptions::default() };
        let result = options.to_args(Path::new("a.pdf"), Path::new("b.pdf"));
        assert!(matches!(result, Err(OcrError::InvalidOption(_))));
    }

    #[test]
    fn test_exit_code_mapping() {
        assert!(EngineExitCode::from_code(0).is_ok());
        assert_eq!(EngineExitCode::from_code(6), EngineExitCode::AlreadyDoneOcr);
        assert_eq!(EngineExitCode::from_code(8).as_str(), "encrypted_pdf");
        assert_eq!(EngineExitCode::from_code(130), EngineExitCode::CtrlC);
        assert_eq!(EngineExitCode::from_code(42).to_string(), "unknown (42)");
    }

    #[test]
    fn test_tail_lines() {
        let out = b"one\n\ntwo\nthree\n  \nfour\n";
        assert_eq!(tail_lines(out, 2), "three\nfour");
        assert_eq!(tail_lines(b"", 3), "");
    }
}
