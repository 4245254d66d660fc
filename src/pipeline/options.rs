//! Output options for the per-page print step
//!
//! Callers may send an options object alongside the markup. Recognised keys
//! are applied verbatim over the print defaults (A4, zero margins, background
//! graphics on, no header/footer); everything else is ignored.

use serde::Deserialize;

/// Options object as sent by the client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfOptions {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub margin: Option<MarginOptions>,
    #[serde(default)]
    pub print_background: Option<bool>,
    #[serde(default)]
    pub display_header_footer: Option<bool>,
    #[serde(default)]
    pub landscape: Option<bool>,
}

/// Margins as CSS lengths (`"0mm"`, `"12px"`) or bare numbers in pixels
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarginOptions {
    pub top: Option<Length>,
    pub right: Option<Length>,
    pub bottom: Option<Length>,
    pub left: Option<Length>,
}

/// A single margin value as sent by the client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Length {
    Px(f64),
    Css(String),
}

impl Length {
    /// Length in inches
    pub fn to_inches(&self) -> Result<f64, OptionsError> {
        match self {
            Length::Px(px) if px.is_finite() && *px >= 0.0 => Ok(px / 96.0),
            Length::Px(px) => Err(OptionsError::InvalidLength(px.to_string())),
            Length::Css(raw) => parse_css_length(raw),
        }
    }
}

/// Paper sizes understood by the `format` option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperFormat {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PaperFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "a3" => Some(Self::A3),
            "a4" => Some(Self::A4),
            "a5" => Some(Self::A5),
            "letter" => Some(Self::Letter),
            "legal" => Some(Self::Legal),
            "tabloid" => Some(Self::Tabloid),
            _ => None,
        }
    }

    /// Width and height in inches
    pub fn size_inches(self) -> (f64, f64) {
        match self {
            Self::A3 => (11.7, 16.54),
            Self::A4 => (8.27, 11.7),
            Self::A5 => (5.83, 8.27),
            Self::Letter => (8.5, 11.0),
            Self::Legal => (8.5, 14.0),
            Self::Tabloid => (11.0, 17.0),
        }
    }
}

/// Margins in inches
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Fully resolved settings handed to the engine's print call
#[derive(Debug, Clone, PartialEq)]
pub struct PrintSettings {
    pub paper_width: f64,
    pub paper_height: f64,
    pub margins: Margins,
    pub print_background: bool,
    pub display_header_footer: bool,
    pub landscape: bool,
    /// Always false: the explicit paper size wins over `@page` rules
    pub prefer_css_page_size: bool,
}

impl Default for PrintSettings {
    fn default() -> Self {
        let (paper_width, paper_height) = PaperFormat::A4.size_inches();
        Self {
            paper_width,
            paper_height,
            margins: Margins::default(),
            print_background: true,
            display_header_footer: false,
            landscape: false,
            prefer_css_page_size: false,
        }
    }
}

/// Rejected option values
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OptionsError {
    #[error("Unknown paper format: {0}")]
    UnknownFormat(String),

    #[error("Invalid margin length: {0}")]
    InvalidLength(String),
}

impl PdfOptions {
    /// Apply the client's options over the print defaults
    pub fn resolve(&self) -> Result<PrintSettings, OptionsError> {
        let mut settings = PrintSettings::default();

        if let Some(name) = &self.format {
            let format =
                PaperFormat::parse(name).ok_or_else(|| OptionsError::UnknownFormat(name.clone()))?;
            let (width, height) = format.size_inches();
            settings.paper_width = width;
            settings.paper_height = height;
        }

        if let Some(margin) = &self.margin {
            let side = |value: &Option<Length>| -> Result<f64, OptionsError> {
                value.as_ref().map(Length::to_inches).transpose().map(|v| v.unwrap_or(0.0))
            };
            settings.margins = Margins {
                top: side(&margin.top)?,
                right: side(&margin.right)?,
                bottom: side(&margin.bottom)?,
                left: side(&margin.left)?,
            };
        }

        if let Some(background) = self.print_background {
            settings.print_background = background;
        }
        if let Some(header_footer) = self.display_header_footer {
            settings.display_header_footer = header_footer;
        }
        if let Some(landscape) = self.landscape {
            settings.landscape = landscape;
        }

        Ok(settings)
    }
}

/// Convert a CSS length to inches; unitless values are pixels
pub fn parse_css_length(raw: &str) -> Result<f64, OptionsError> {
    let value = raw.trim().to_lowercase();
    let split = value
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let number: f64 = number
        .trim()
        .parse()
        .map_err(|_| OptionsError::InvalidLength(raw.to_string()))?;
    if !number.is_finite() || number < 0.0 {
        return Err(OptionsError::InvalidLength(raw.to_string()));
    }

    let inches = match unit {
        "" | "px" => number / 96.0,
        "in" => number,
        "cm" => number / 2.54,
        "mm" => number / 25.4,
        "pt" => number / 72.0,
        _ => return Err(OptionsError::InvalidLength(raw.to_string())),
    };
    Ok(inches)
}
