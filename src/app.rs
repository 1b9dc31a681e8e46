//! Scan orchestration
//!
//! Wires the CLI commands to the remote collaborators and the pure
//! analysis and vision cores. All network suspension points live here;
//! by the time a core function runs, its inputs are fully in memory.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{self, ComplianceSummary, ExtractedFields, RuleResult};
use crate::config::{AppConfig, ScanSettings};
use crate::remote::{
    self, catalog::cross_verify, AnnotationClient, CachedCatalog, CatalogClient,
    CollaboratorError, FieldMatch, ImageAnnotator, LookupCache, OcrClient, ProductInfo,
    RemoteSummary, TextRecognizer,
};
use crate::vision::{self, ahash, palette, SimilarityReport, StrategyKind};

/// Everything one scan produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Identifier of this scan run
    pub scan_id: Uuid,
    /// Fields recognized on the label
    pub fields: ExtractedFields,
    /// Per-rule outcomes in evaluation order
    pub rule_results: Vec<RuleResult>,
    /// Local compliance summary
    pub summary: ComplianceSummary,
    /// Catalog enrichment, when a barcode was given and resolvable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
    /// Authoritative rule-engine summary, when requested and reachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_summary: Option<RemoteSummary>,
}

/// Catalog record plus the label-vs-catalog field comparison.
#[derive(Debug, Clone, Serialize)]
pub struct Enrichment {
    pub product: ProductInfo,
    pub field_matches: Vec<FieldMatch>,
}

/// Outcome of an image comparison, tagged with the strategy that
/// produced it. The flag set differs per strategy.
#[derive(Debug, Clone, Serialize)]
pub struct CompareOutcome {
    pub strategy: StrategyKind,
    pub report: SimilarityReport,
}

/// Orchestrates scans against the configured collaborators.
pub struct ScanPipeline {
    ocr: Option<Box<dyn TextRecognizer>>,
    annotator: Option<Box<dyn ImageAnnotator>>,
    catalog: Option<CachedCatalog>,
    http: reqwest::Client,
    settings: ScanSettings,
}

impl ScanPipeline {
    /// Build a pipeline from explicit components.
    pub fn new(
        ocr: Option<Box<dyn TextRecognizer>>,
        annotator: Option<Box<dyn ImageAnnotator>>,
        catalog: Option<CachedCatalog>,
        settings: ScanSettings,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            ocr,
            annotator,
            catalog,
            http: remote::http_client(timeout).context("failed to build HTTP client")?,
            settings,
        })
    }

    /// Build a pipeline with clients for every configured endpoint.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.services.timeout_secs);

        let ocr: Option<Box<dyn TextRecognizer>> = match &config.services.ocr_url {
            Some(url) => Some(Box::new(OcrClient::new(
                url.clone(),
                config.services.ocr_language.clone(),
                timeout,
            )?)),
            None => None,
        };

        let annotator: Option<Box<dyn ImageAnnotator>> = match &config.services.annotate_url {
            Some(url) => Some(Box::new(AnnotationClient::new(url.clone(), timeout)?)),
            None => None,
        };

        let catalog = match &config.services.backend_url {
            Some(url) => Some(CachedCatalog::new(
                CatalogClient::new(url.clone(), timeout)?,
                LookupCache::new(
                    Duration::from_secs(config.cache.lookup_ttl_secs),
                    config.cache.max_entries,
                ),
            )),
            None => None,
        };

        Self::new(ocr, annotator, catalog, config.scan.clone(), timeout)
    }

    /// Scan a label image: OCR, field extraction, rule evaluation, and
    /// the optional catalog / rule-engine cross-checks.
    pub async fn scan(
        &self,
        image_path: &Path,
        barcode: Option<&str>,
        remote_validation: bool,
    ) -> Result<ScanReport> {
        let ocr = self
            .ocr
            .as_ref()
            .ok_or(CollaboratorError::NotConfigured("ocr"))?;

        let image = std::fs::read(image_path)
            .with_context(|| format!("failed to read image {}", image_path.display()))?;

        let raw_text = ocr
            .recognize(&image)
            .await
            .context("text recognition failed")?;
        info!(chars = raw_text.len(), "label text recognized");

        let mut report = report_for_text(&raw_text);

        if let (Some(catalog), Some(code)) = (&self.catalog, barcode) {
            if self.settings.auto_enrich {
                match catalog.lookup(code).await {
                    Ok(product) => {
                        let field_matches = cross_verify(&report.fields, &product);
                        report.enrichment = Some(Enrichment {
                            product,
                            field_matches,
                        });
                    }
                    Err(err) => warn!(barcode = code, error = %err, "catalog enrichment skipped"),
                }
            }
        }

        if remote_validation {
            if let Some(catalog) = &self.catalog {
                match catalog.validate(&report.fields).await {
                    Ok(summary) => report.remote_summary = Some(summary),
                    Err(err) => {
                        warn!(error = %err, "authoritative validation unavailable, local summary stands")
                    }
                }
            }
        }

        Ok(report)
    }

    /// Compare a reference product image against a captured one.
    ///
    /// Strategies are tried in order: the label/color heuristic when the
    /// annotation service is configured, then the local average hash.
    /// Collaborator failures trigger the fallback; an unreadable image is
    /// terminal.
    pub async fn compare(&self, reference: &str, candidate: &Path) -> Result<CompareOutcome> {
        let reference_bytes = self.load_input(reference).await?;
        let candidate_bytes = std::fs::read(candidate)
            .with_context(|| format!("failed to read image {}", candidate.display()))?;

        if let Some(annotator) = &self.annotator {
            match label_color_compare(annotator.as_ref(), &reference_bytes, &candidate_bytes).await
            {
                Ok(report) => {
                    return Ok(CompareOutcome {
                        strategy: StrategyKind::LabelColor,
                        report,
                    })
                }
                Err(err) => {
                    warn!(error = %err, "label/color strategy failed, falling back to average hash")
                }
            }
        }

        let reference_img = vision::decode_image(&reference_bytes)?;
        let candidate_img = vision::decode_image(&candidate_bytes)?;

        Ok(CompareOutcome {
            strategy: StrategyKind::AverageHash,
            report: ahash::compare(&reference_img, &candidate_img),
        })
    }

    /// Look a product up by barcode.
    pub async fn lookup(&self, barcode: &str) -> Result<ProductInfo> {
        let catalog = self
            .catalog
            .as_ref()
            .ok_or(CollaboratorError::NotConfigured("catalog"))?;
        Ok(catalog.lookup(barcode).await?)
    }

    /// Read comparison input from a URL or a local path.
    async fn load_input(&self, source: &str) -> Result<Vec<u8>> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Ok(remote::fetch_image(&self.http, source)
                .await
                .with_context(|| format!("failed to fetch reference image {source}"))?)
        } else {
            std::fs::read(source).with_context(|| format!("failed to read image {source}"))
        }
    }
}

/// Annotate both images, then run the pure label/color comparison.
/// Both annotations are in hand before any scoring happens.
async fn label_color_compare(
    annotator: &dyn ImageAnnotator,
    reference: &[u8],
    candidate: &[u8],
) -> Result<SimilarityReport, CollaboratorError> {
    let (reference_ann, candidate_ann) =
        tokio::try_join!(annotator.annotate(reference), annotator.annotate(candidate))?;
    Ok(palette::compare(&reference_ann, &candidate_ann))
}

/// Analyze already-recognized label text into a full report.
pub fn report_for_text(raw_text: &str) -> ScanReport {
    let (fields, rule_results, summary) = analysis::analyze(raw_text);
    ScanReport {
        scan_id: Uuid::new_v4(),
        fields,
        rule_results,
        summary,
        enrichment: None,
        remote_summary: None,
    }
}
