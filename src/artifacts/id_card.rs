// ID card artifacts
//
// The team-member step attaches a rendered card to each member. Rendering is a host
// capability behind `ArtifactRenderer`; the built-in renderer produces an SVG card with
// the member id printed and encoded as a QR code.

use crate::error::WizardError;
use crate::models::field::SubRecord;
use crate::utils::encoding;
use async_trait::async_trait;
use qrcode::{Color, QrCode};
use serde::{Deserialize, Serialize};

/// Organisation details printed on every card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branding {
    pub organisation: String,
    pub tagline: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            organisation: "MineOps".to_string(),
            tagline: "Mining Operations Registry".to_string(),
        }
    }
}

/// What goes on a card, pulled out of a list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCardSubject {
    pub heading: String,
    pub member_id: String,
    pub full_name: String,
    pub id_number: String,
    pub position: String,
}

impl IdCardSubject {
    pub fn from_item(item: &SubRecord, heading: &str) -> Self {
        let full_name = match item.non_empty("fullName") {
            Some(n) => n,
            None => [item.non_empty("name"), item.non_empty("surname")]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" "),
        };
        Self {
            heading: heading.to_string(),
            member_id: item.id.clone(),
            full_name,
            id_number: item.get("idNumber").trim().to_string(),
            position: item.get("position").trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl RenderedArtifact {
    pub fn to_data_url(&self) -> String {
        encoding::to_data_url(self.mime, &self.bytes)
    }
}

#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(
        &self,
        subject: &IdCardSubject,
        branding: &Branding,
    ) -> Result<RenderedArtifact, WizardError>;
}

/// Deterministic SVG card; identical input yields identical bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgCardRenderer;

const CARD_WIDTH: u32 = 340;
const CARD_HEIGHT: u32 = 214;
const QR_SIZE: u32 = 88;
const QR_QUIET_ZONE: usize = 2;

#[async_trait]
impl ArtifactRenderer for SvgCardRenderer {
    async fn render(
        &self,
        subject: &IdCardSubject,
        branding: &Branding,
    ) -> Result<RenderedArtifact, WizardError> {
        if subject.member_id.trim().is_empty() {
            return Err(WizardError::Unexpected(
                "cannot render an ID card without a member id".to_string(),
            ));
        }
        let qr = qr_svg(&subject.member_id, CARD_WIDTH - QR_SIZE - 16, 60)?;
        let svg = render_svg(subject, branding, &qr);
        log::debug!(
            "[PHASE: artifacts] [STEP: id_card] rendered card for {} ({} bytes)",
            subject.member_id,
            svg.len()
        );
        Ok(RenderedArtifact {
            mime: "image/svg+xml",
            bytes: svg.into_bytes(),
        })
    }
}

/// Nested SVG holding the QR code for `payload`, one unit per module.
fn qr_svg(payload: &str, x: u32, y: u32) -> Result<String, WizardError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| WizardError::Unexpected(format!("QR encoding failed: {}", e)))?;
    let width = code.width();
    let span = width + 2 * QR_QUIET_ZONE;

    let mut out = format!(
        "  <svg x=\"{x}\" y=\"{y}\" width=\"{s}\" height=\"{s}\" viewBox=\"-{q} -{q} {span} {span}\" shape-rendering=\"crispEdges\" data-qr=\"{payload}\">\n",
        x = x,
        y = y,
        s = QR_SIZE,
        q = QR_QUIET_ZONE,
        span = span,
        payload = escape_xml(payload)
    );
    out.push_str(&format!(
        "    <rect x=\"-{q}\" y=\"-{q}\" width=\"{span}\" height=\"{span}\" fill=\"#ffffff\"/>\n",
        q = QR_QUIET_ZONE,
        span = span
    ));
    out.push_str("    <path fill=\"#000000\" d=\"");
    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color == Color::Dark {
            out.push_str(&format!("M{} {}h1v1h-1z", i % width, i / width));
        }
    }
    out.push_str("\"/>\n  </svg>\n");
    Ok(out)
}

fn render_svg(subject: &IdCardSubject, branding: &Branding, qr: &str) -> String {
    let rows = [
        ("Name", subject.full_name.as_str()),
        ("ID No.", subject.id_number.as_str()),
        ("Position", subject.position.as_str()),
        ("Member", subject.member_id.as_str()),
    ];

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
        w = CARD_WIDTH,
        h = CARD_HEIGHT
    );
    svg.push_str(&format!(
        "  <rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" rx=\"12\" fill=\"#ffffff\" stroke=\"#1f2937\"/>\n",
        CARD_WIDTH, CARD_HEIGHT
    ));
    svg.push_str(&format!(
        "  <rect x=\"0\" y=\"0\" width=\"{}\" height=\"48\" rx=\"12\" fill=\"#b45309\"/>\n",
        CARD_WIDTH
    ));
    svg.push_str(&format!(
        "  <text x=\"16\" y=\"22\" font-family=\"sans-serif\" font-size=\"15\" font-weight=\"bold\" fill=\"#ffffff\">{}</text>\n",
        escape_xml(&branding.organisation)
    ));
    svg.push_str(&format!(
        "  <text x=\"16\" y=\"40\" font-family=\"sans-serif\" font-size=\"10\" fill=\"#fde68a\">{}</text>\n",
        escape_xml(&branding.tagline)
    ));
    svg.push_str(&format!(
        "  <text x=\"16\" y=\"72\" font-family=\"sans-serif\" font-size=\"12\" font-weight=\"bold\" fill=\"#1f2937\">{}</text>\n",
        escape_xml(&subject.heading)
    ));
    for (i, (label, value)) in rows.iter().enumerate() {
        let y = 100 + i as u32 * 26;
        svg.push_str(&format!(
            "  <text x=\"16\" y=\"{}\" font-family=\"sans-serif\" font-size=\"11\" fill=\"#6b7280\">{}</text>\n",
            y,
            escape_xml(label)
        ));
        svg.push_str(&format!(
            "  <text x=\"96\" y=\"{}\" font-family=\"monospace\" font-size=\"12\" fill=\"#111827\">{}</text>\n",
            y,
            escape_xml(value)
        ));
    }
    svg.push_str(qr);
    svg.push_str("</svg>\n");
    svg
}

fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
