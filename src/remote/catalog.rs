//! Product catalog backend client
//!
//! Barcode enrichment and the authoritative rule engine live behind one
//! backend API. Lookups go through an explicit TTL cache so repeated
//! scans of the same product do not hammer the service; the cache is an
//! owned object with explicit invalidation, never module state.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{http_client, CollaboratorError};
use crate::analysis::ExtractedFields;

/// A field pair "matches" at or above this normalized similarity.
const FIELD_MATCH_THRESHOLD: f64 = 0.8;

/// Catalog record for a product, keyed by barcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub barcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Summary returned by the remote rule engine. Rule keys arrive as plain
/// strings: the server's rule set may be ahead of this client's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSummary {
    pub compliant: bool,
    #[serde(default)]
    pub violations: Vec<String>,
}

/// One extracted field checked against its catalog counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field_name: String,
    pub expected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<String>,
    pub matches: bool,
    pub similarity_score: f64,
}

/// HTTP client for the catalog backend.
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Create a client for the given backend base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CollaboratorError> {
        let base_url = base_url.into();
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the catalog record for a barcode.
    pub async fn lookup(&self, barcode: &str) -> Result<ProductInfo, CollaboratorError> {
        let url = format!("{}/products/{barcode}", self.base_url);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status { url, status });
        }

        Ok(response.json().await?)
    }

    /// Submit extracted fields to the authoritative rule engine and return
    /// its summary. Local evaluation remains the client-side
    /// approximation; this cross-check is additive.
    pub async fn validate(
        &self,
        fields: &ExtractedFields,
    ) -> Result<RemoteSummary, CollaboratorError> {
        let url = format!("{}/validate", self.base_url);
        let response = self.http.post(&url).json(fields).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status { url, status });
        }

        Ok(response.json().await?)
    }
}

/// TTL cache over catalog lookups.
pub struct LookupCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

struct CacheEntry {
    product: ProductInfo,
    stored_at: Instant,
}

impl LookupCache {
    /// Create a cache holding at most `capacity` products for `ttl` each.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    /// Fetch a cached product, dropping it if its TTL has elapsed.
    pub fn get(&self, barcode: &str) -> Option<ProductInfo> {
        {
            let entries = self.entries.read();
            let entry = entries.get(barcode)?;
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.product.clone());
            }
        }

        self.entries.write().remove(barcode);
        None
    }

    /// Store a product, evicting the oldest entry at capacity.
    pub fn insert(&self, product: ProductInfo) {
        let mut entries = self.entries.write();

        if entries.len() >= self.capacity && !entries.contains_key(&product.barcode) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(barcode, _)| barcode.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            product.barcode.clone(),
            CacheEntry {
                product,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop one barcode from the cache.
    pub fn invalidate(&self, barcode: &str) {
        self.entries.write().remove(barcode);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of entries currently held (including not-yet-expired ones).
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Catalog client with a cache in front of it.
pub struct CachedCatalog {
    client: CatalogClient,
    cache: LookupCache,
}

impl CachedCatalog {
    pub fn new(client: CatalogClient, cache: LookupCache) -> Self {
        Self { client, cache }
    }

    /// Look a barcode up, serving from cache when possible.
    pub async fn lookup(&self, barcode: &str) -> Result<ProductInfo, CollaboratorError> {
        if let Some(product) = self.cache.get(barcode) {
            debug!(barcode, "catalog cache hit");
            return Ok(product);
        }

        let product = self.client.lookup(barcode).await?;
        self.cache.insert(product.clone());
        Ok(product)
    }

    /// Forward to the authoritative rule engine (never cached).
    pub async fn validate(
        &self,
        fields: &ExtractedFields,
    ) -> Result<RemoteSummary, CollaboratorError> {
        self.client.validate(fields).await
    }

    /// Drop a stale cache entry, e.g. after the catalog was corrected.
    pub fn invalidate(&self, barcode: &str) {
        warn!(barcode, "invalidating catalog cache entry");
        self.cache.invalidate(barcode);
    }
}

/// Check extracted label fields against their catalog counterparts.
///
/// Emits one record per field the catalog has an expectation for, scored
/// by normalized edit distance over lower-cased values. MRP values are
/// reduced to their digits first so currency markers do not skew the
/// score.
pub fn cross_verify(fields: &ExtractedFields, product: &ProductInfo) -> Vec<FieldMatch> {
    let pairs: [(&str, Option<&String>, Option<&String>, bool); 4] = [
        ("generic_name", product.name.as_ref(), fields.generic_name.as_ref(), false),
        ("mrp", product.mrp.as_ref(), fields.mrp.as_ref(), true),
        ("net_quantity", product.net_quantity.as_ref(), fields.net_quantity.as_ref(), false),
        ("unit", product.unit.as_ref(), fields.unit.as_ref(), false),
    ];

    pairs
        .into_iter()
        .filter_map(|(field_name, expected, extracted, numeric)| {
            let expected = expected?;
            let score = match extracted {
                Some(value) => field_similarity(expected, value, numeric),
                None => 0.0,
            };
            Some(FieldMatch {
                field_name: field_name.to_string(),
                expected: expected.clone(),
                extracted: extracted.cloned(),
                matches: score >= FIELD_MATCH_THRESHOLD,
                similarity_score: score,
            })
        })
        .collect()
}

fn field_similarity(expected: &str, extracted: &str, numeric: bool) -> f64 {
    let (a, b) = if numeric {
        (digits(expected), digits(extracted))
    } else {
        (expected.to_lowercase(), extracted.to_lowercase())
    };

    if a.is_empty() && b.is_empty() {
        return 0.0;
    }

    strsim::normalized_levenshtein(&a, &b)
}

fn digits(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extract;

    fn product() -> ProductInfo {
        ProductInfo {
            barcode: "8901234567890".to_string(),
            name: Some("Instant Coffee".to_string()),
            brand: Some("Morning Brew".to_string()),
            mrp: Some("199.00".to_string()),
            net_quantity: Some("250".to_string()),
            unit: Some("g".to_string()),
        }
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let cache = LookupCache::new(Duration::from_secs(600), 16);
        cache.insert(product());
        assert_eq!(cache.get("8901234567890"), Some(product()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_expires_after_ttl() {
        let cache = LookupCache::new(Duration::ZERO, 16);
        cache.insert(product());
        assert_eq!(cache.get("8901234567890"), None);
        // the expired entry was dropped on read
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_explicit_invalidation() {
        let cache = LookupCache::new(Duration::from_secs(600), 16);
        cache.insert(product());
        cache.invalidate("8901234567890");
        assert_eq!(cache.get("8901234567890"), None);
    }

    #[test]
    fn test_cache_clear() {
        let cache = LookupCache::new(Duration::from_secs(600), 16);
        cache.insert(product());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cached_catalog_invalidate_drops_entry() {
        let client = CatalogClient::new("https://backend.example.com", Duration::from_secs(5)).unwrap();
        let catalog = CachedCatalog::new(client, LookupCache::new(Duration::from_secs(600), 16));

        catalog.cache.insert(product());
        catalog.invalidate("8901234567890");
        assert!(catalog.cache.is_empty());
    }

    #[test]
    fn test_cache_capacity_evicts_oldest() {
        let cache = LookupCache::new(Duration::from_secs(600), 2);
        for barcode in ["111", "222", "333"] {
            let mut p = product();
            p.barcode = barcode.to_string();
            cache.insert(p);
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("111"), None);
        assert!(cache.get("333").is_some());
    }

    #[test]
    fn test_cross_verify_exact_label() {
        let fields = extract(
            "Name: Instant Coffee\nMRP ₹199.00\nNet Qty: 250 g\nMfg by: Acme Foods Ltd",
        );
        let matches = cross_verify(&fields, &product());

        assert_eq!(matches.len(), 4);
        for m in &matches {
            assert!(m.matches, "{} should match, score {}", m.field_name, m.similarity_score);
        }
        // currency marker must not affect the mrp score
        let mrp = matches.iter().find(|m| m.field_name == "mrp").unwrap();
        assert_eq!(mrp.similarity_score, 1.0);
    }

    #[test]
    fn test_cross_verify_disjoint_label() {
        let fields = extract("Name: Dish Soap\nMRP ₹45\nNet Qty: 500 ml");
        let matches = cross_verify(&fields, &product());

        let name = matches.iter().find(|m| m.field_name == "generic_name").unwrap();
        assert!(!name.matches);
        assert!(name.similarity_score < FIELD_MATCH_THRESHOLD);

        let unit = matches.iter().find(|m| m.field_name == "unit").unwrap();
        assert!(!unit.matches);
    }

    #[test]
    fn test_cross_verify_skips_fields_without_expectation() {
        let mut p = product();
        p.name = None;
        p.unit = None;
        let fields = extract("MRP ₹199.00 Net Qty: 250 g");
        let matches = cross_verify(&fields, &p);
        let names: Vec<&str> = matches.iter().map(|m| m.field_name.as_str()).collect();
        assert_eq!(names, vec!["mrp", "net_quantity"]);
    }

    #[test]
    fn test_cross_verify_missing_extraction_scores_zero() {
        let fields = extract("no label content at all");
        let matches = cross_verify(&fields, &product());
        assert!(matches.iter().all(|m| !m.matches));
        assert!(matches.iter().all(|m| m.similarity_score == 0.0));
    }
}
