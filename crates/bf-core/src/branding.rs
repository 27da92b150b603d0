//! Per-event branding applied to captured photos.
//!
//! Every field has a blank/false default, so a spec deserialized from `{}` is
//! valid and renders nothing. Text fields are untrusted input: use
//! [`escape_markup`] before placing them into any markup-based overlay.

use serde::{Deserialize, Serialize};

/// Branding configuration for an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingSpec {
    /// Text shown in a band across the top of the photo.
    pub overlay_text: String,
    /// Text shown in the footer band.
    pub footer_text: String,
    /// Whether the footer band carries the current date.
    pub show_date: bool,
    /// Primary color as `#rrggbb`.
    pub primary_color: Option<String>,
    /// Secondary color as `#rrggbb`.
    pub secondary_color: Option<String>,
    /// Optional logo image URL, stamped into the top-right corner.
    pub logo_url: Option<String>,
}

/// Which branding bands a photo needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibleBranding {
    pub overlay: bool,
    pub footer: bool,
}

impl VisibleBranding {
    /// True when neither band is drawn.
    pub fn is_empty(&self) -> bool {
        !self.overlay && !self.footer
    }
}

impl BrandingSpec {
    /// Decide which bands are visible.
    ///
    /// The footer appears only for non-blank footer text or an explicit date
    /// flag; the top overlay only for non-blank overlay text.
    pub fn visible_branding(&self) -> VisibleBranding {
        VisibleBranding {
            overlay: !self.overlay_text.trim().is_empty(),
            footer: !self.footer_text.trim().is_empty() || self.show_date,
        }
    }

    /// The logo URL to fetch, if one is set and not blank.
    pub fn logo_source(&self) -> Option<&str> {
        self.logo_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Compose the footer line from footer text and the formatted date.
    ///
    /// Returns `None` when the footer band is not visible.
    pub fn footer_line(&self, date: &str) -> Option<String> {
        let text = self.footer_text.trim();
        match (text.is_empty(), self.show_date) {
            (true, false) => None,
            (false, false) => Some(text.to_string()),
            (true, true) => Some(date.to_string()),
            (false, true) => Some(format!("{text} \u{2022} {date}")),
        }
    }
}

/// Escape text for embedding in XML/SVG character data or attribute values.
pub fn escape_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters are invalid in XML 1.0.
            c if c.is_control() && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}
