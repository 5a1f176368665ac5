//! Document assembly: original document + one evidence page.
//!
//! Assembly is expressed as a declarative `EvidenceDocument` (typed blocks)
//! that a `DocumentRenderer` turns into bytes. The layout step wraps every
//! value to the configured width, so long names, user agents and hashes are
//! never truncated, and pads every signer block to one common height.
//!
//! The whole artifact is built in memory before anything is written to the
//! final path, so concurrent or repeated runs can only ever overwrite a
//! complete file with another complete file.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use osign_config::{AssemblyConfig, StorageConfig};
use osign_contracts::{
    error::{OsignError, OsignResult},
    order::{FinalArtifact, Order},
    signer::{Signer, SignerStatus},
};

use crate::{identity::format_national_id, integrity::hash_bytes, traits::DocumentRenderer};

/// Separates the original bytes from the evidence page.
const PAGE_BREAK: &[u8] = b"\x0c\n";

/// A label/value line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceField {
    pub label: String,
    pub value: String,
}

impl EvidenceField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into() }
    }
}

/// One typed block of the evidence page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceBlock {
    Heading(String),
    Field(EvidenceField),
    Paragraph(String),
    /// A fixed-height group describing one signer.
    Signer { title: String, fields: Vec<EvidenceField> },
    Rule,
}

/// The evidence page model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceDocument {
    pub blocks: Vec<EvidenceBlock>,
}

impl EvidenceDocument {
    /// Build the evidence page for a completed order.
    ///
    /// `signed` must already be filtered to signers with evidence and sorted
    /// by `order_index`.
    pub fn for_order(
        order: &Order,
        signed: &[&Signer],
        completed_at: DateTime<Utc>,
        config: &AssemblyConfig,
    ) -> Self {
        let mut blocks = vec![
            EvidenceBlock::Heading("Termo de Assinatura Eletrônica".to_string()),
            EvidenceBlock::Field(EvidenceField::new("Emitido por", &config.issuer_name)),
            EvidenceBlock::Field(EvidenceField::new("Ordem de serviço", &order.os_number)),
            EvidenceBlock::Field(EvidenceField::new("Título", &order.title)),
            EvidenceBlock::Field(EvidenceField::new("Documento", &order.file_name)),
            EvidenceBlock::Field(EvidenceField::new("Concluído em", timestamp(completed_at))),
            EvidenceBlock::Field(EvidenceField::new("SHA-256 do original", &order.file_hash)),
            EvidenceBlock::Rule,
            EvidenceBlock::Heading("Signatários".to_string()),
        ];

        for (position, signer) in signed.iter().enumerate() {
            blocks.push(signer_block(position + 1, signer));
        }

        blocks.push(EvidenceBlock::Rule);
        blocks.push(EvidenceBlock::Paragraph(format!(
            "Este termo integra o documento {} e registra as assinaturas eletrônicas \
             coletadas. A integridade do original é comprovada pelo hash SHA-256 \
             acima, que cada signatário confirmou no momento da assinatura.",
            order.file_name
        )));

        Self { blocks }
    }
}

fn signer_block(position: usize, signer: &Signer) -> EvidenceBlock {
    let evidence = signer.signature_data.as_ref();
    let name = evidence
        .map(|e| e.full_name.clone())
        .unwrap_or_else(|| signer.name.clone());
    let national_id = evidence
        .map(|e| format_national_id(&e.national_id))
        .unwrap_or_default();
    let signed_at = signer.signed_at.map(timestamp).unwrap_or_default();

    EvidenceBlock::Signer {
        title: format!("{}. {}", position, name),
        fields: vec![
            EvidenceField::new("Nome", name),
            EvidenceField::new("CPF", national_id),
            EvidenceField::new("Papel", &signer.role),
            EvidenceField::new("Assinado em", signed_at),
            EvidenceField::new("Endereço IP", signer.ip_address.clone().unwrap_or_default()),
            EvidenceField::new("Navegador", signer.user_agent.clone().unwrap_or_default()),
            EvidenceField::new(
                "Hash da assinatura",
                signer.signature_hash.clone().unwrap_or_default(),
            ),
        ],
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ── Layout ────────────────────────────────────────────────────────────────────

/// Greedy word wrap. Words longer than a line are split across lines.
///
/// `first` is the width of the first line and `rest` of every later line.
pub fn wrap_with(text: &str, first: usize, rest: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let width_for = |line_no: usize| if line_no == 0 { first.max(1) } else { rest.max(1) };

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        loop {
            let width = width_for(lines.len());
            let sep = usize::from(current_len > 0);
            if current_len + sep + chars.len() <= width {
                if sep == 1 {
                    current.push(' ');
                }
                current.extend(chars.iter());
                current_len += sep + chars.len();
                break;
            }
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }
            // A word that only fits a continuation line starts there.
            if lines.is_empty() && first < rest && chars.len() > width {
                lines.push(String::new());
                continue;
            }
            // Word alone is wider than the line.
            let head: String = chars.drain(..width).collect();
            lines.push(head);
            if chars.is_empty() {
                break;
            }
        }
    }
    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrap `text` to `width` columns.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    wrap_with(text, width, width)
}

/// `label: value` with a hanging indent on continuation lines.
fn layout_field(field: &EvidenceField, width: usize) -> Vec<String> {
    const INDENT: usize = 4;
    let prefix = format!("{}: ", field.label);
    let prefix_len = prefix.chars().count();
    let indent = INDENT.min(width / 2);
    let wrapped = wrap_with(&field.value, width.saturating_sub(prefix_len), width - indent);

    wrapped
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{}{}", prefix, line).trim_end().to_string()
            } else {
                format!("{}{}", " ".repeat(indent), line)
            }
        })
        .collect()
}

fn layout_signer(title: &str, fields: &[EvidenceField], width: usize) -> Vec<String> {
    let mut lines = wrap_text(title, width);
    for field in fields {
        lines.extend(layout_field(field, width));
    }
    lines
}

/// Lay the document out as lines of at most `width` characters.
pub fn layout(document: &EvidenceDocument, width: usize) -> Vec<String> {
    let block_height = document
        .blocks
        .iter()
        .filter_map(|block| match block {
            EvidenceBlock::Signer { title, fields } => Some(layout_signer(title, fields, width).len()),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let mut lines = Vec::new();
    for block in &document.blocks {
        match block {
            EvidenceBlock::Heading(text) => {
                let heading = wrap_text(text, width);
                let underline = heading.iter().map(|l| l.chars().count()).max().unwrap_or(0);
                lines.extend(heading);
                lines.push("=".repeat(underline));
            }
            EvidenceBlock::Field(field) => lines.extend(layout_field(field, width)),
            EvidenceBlock::Paragraph(text) => {
                lines.extend(wrap_text(text, width));
                lines.push(String::new());
            }
            EvidenceBlock::Signer { title, fields } => {
                let mut block = layout_signer(title, fields, width);
                block.resize(block_height, String::new());
                lines.extend(block);
                lines.push(String::new());
            }
            EvidenceBlock::Rule => lines.push("-".repeat(width)),
        }
    }
    lines
}

// ── Renderer ──────────────────────────────────────────────────────────────────

/// Appends the laid-out evidence page, as UTF-8 text after a page break, to
/// the original bytes.
#[derive(Debug, Clone)]
pub struct TextPageRenderer {
    line_width: usize,
}

impl TextPageRenderer {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self { line_width: config.line_width }
    }
}

impl DocumentRenderer for TextPageRenderer {
    fn render(&self, original: &[u8], evidence: &EvidenceDocument) -> OsignResult<Vec<u8>> {
        let page = layout(evidence, self.line_width).join("\n");
        let mut out = Vec::with_capacity(original.len() + PAGE_BREAK.len() + page.len() + 1);
        out.extend_from_slice(original);
        out.extend_from_slice(PAGE_BREAK);
        out.extend_from_slice(page.as_bytes());
        out.push(b'\n');
        Ok(out)
    }
}

// ── Assembly ──────────────────────────────────────────────────────────────────

/// `<file_path><suffix>`, e.g. `orders/1/contrato.pdf.final.pdf`.
pub fn final_artifact_path(file_path: &str, storage: &StorageConfig) -> String {
    format!("{}{}", file_path, storage.final_suffix)
}

/// `contrato.pdf` → `contrato-assinado.pdf`; names without a `.pdf`
/// extension get the suffix appended.
pub fn final_artifact_name(file_name: &str, storage: &StorageConfig) -> String {
    let stem = if file_name.to_ascii_lowercase().ends_with(".pdf") {
        &file_name[..file_name.len() - 4]
    } else {
        file_name
    };
    format!("{}{}", stem, storage.signed_name_suffix)
}

/// A fully built final artifact, not yet persisted.
#[derive(Debug, Clone)]
pub struct AssembledArtifact {
    pub bytes: Vec<u8>,
    pub artifact: FinalArtifact,
}

/// Build the final artifact for a completed order in memory.
///
/// Deterministic: equal order data, signer evidence and original bytes give
/// byte-identical output. Fails with `AssemblyFailed` if the order has no
/// completion time or no signer with evidence.
pub fn assemble(
    order: &Order,
    signers: &[Signer],
    original: &[u8],
    renderer: &dyn DocumentRenderer,
    assembly: &AssemblyConfig,
    storage: &StorageConfig,
) -> OsignResult<AssembledArtifact> {
    let completed_at = order.completed_at.ok_or_else(|| OsignError::AssemblyFailed {
        reason: format!("order {} has no completion time", order.id),
    })?;

    let mut signed: Vec<&Signer> = signers
        .iter()
        .filter(|s| s.status == SignerStatus::Signed && s.signature_data.is_some())
        .collect();
    if signed.is_empty() {
        return Err(OsignError::AssemblyFailed {
            reason: format!("order {} has no signer evidence", order.id),
        });
    }
    signed.sort_by_key(|s| s.order_index);

    let evidence = EvidenceDocument::for_order(order, &signed, completed_at, assembly);
    let bytes = renderer.render(original, &evidence)?;
    let artifact = FinalArtifact {
        path: final_artifact_path(&order.file_path, storage),
        file_name: final_artifact_name(&order.file_name, storage),
        hash: hash_bytes(&bytes),
    };
    Ok(AssembledArtifact { bytes, artifact })
}
