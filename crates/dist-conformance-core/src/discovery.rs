// crates/dist-conformance-core/src/discovery.rs
// ============================================================================
// Module: Discovery Verifier
// Description: Tag listing truncation and cursor continuation checks.
// Purpose: Validate the opaque `n`/`last` pagination contract.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The verifier is a small state machine over three listings:
//!
//! 1. an unpaginated baseline listing of `R` tags;
//! 2. a page of `n = floor(R/2)` tags, which must be exactly that long;
//! 3. a continuation page with the same `n` and `last` set to the final tag
//!    of page 2, which must hold at most `n` tags, must not repeat the
//!    cursor, and must include `baseline[n]`, the element immediately after
//!    the cursor boundary.
//!
//! `n` is computed once when the baseline is recorded and reused for every
//! request and assertion. Tag order is whatever the server returns; the
//! verifier never sorts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::outcome::StepError;
use crate::outcome::ensure;
use crate::outcome::expect_eq;
use crate::probe::Method;
use crate::probe::Probe;
use crate::probe::ProbeRequest;
use crate::probe::TAGS_LIST_PATH;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Decoded tag listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagList {
    /// Repository name.
    pub name: String,
    /// Tags in server order.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Optional pagination parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// Page size (`n`).
    pub n: Option<usize>,
    /// Cursor (`last`).
    pub last: Option<String>,
}

/// Lists tags in the default namespace.
///
/// # Errors
///
/// Returns [`StepError::Failed`] when the exchange fails, the status is not
/// 200, or the body is not a tag list.
pub fn list_tags(probe: &Probe, page: &PageQuery) -> Result<TagList, StepError> {
    let mut request = ProbeRequest::new(Method::Get, TAGS_LIST_PATH);
    if let Some(n) = page.n {
        request = request.query("n", n.to_string());
    }
    if let Some(last) = &page.last {
        request = request.query("last", last.clone());
    }
    let response = probe.send(&request)?;
    response.expect_status(&[200])?;
    response.json()
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Pagination state carried between discovery checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryVerifier {
    /// Unpaginated listing.
    baseline: Option<TagList>,
    /// `floor(R/2)`, fixed when the baseline is recorded.
    page_size: Option<usize>,
    /// Truncated first page.
    first_page: Option<TagList>,
}

impl DiscoveryVerifier {
    /// Creates a verifier with no recorded listings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded baseline listing.
    #[must_use]
    pub const fn baseline(&self) -> Option<&TagList> {
        self.baseline.as_ref()
    }

    /// Returns the page size derived from the baseline.
    #[must_use]
    pub const fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    /// Step 1: records the unpaginated listing and derives the page size.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] when the listing cannot be fetched.
    pub fn record_baseline(&mut self, probe: &Probe) -> Result<&TagList, StepError> {
        let listing = list_tags(probe, &PageQuery::default())?;
        self.page_size = Some(listing.tags.len() / 2);
        self.first_page = None;
        Ok(self.baseline.insert(listing))
    }

    /// Step 2: asserts that `n` truncates the listing exactly.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] when no baseline exists, the baseline is
    /// too short to paginate, or the page length differs from `n`.
    pub fn verify_truncation(&mut self, probe: &Probe) -> Result<(), StepError> {
        let n = self.paginated_size()?;
        let page = list_tags(probe, &PageQuery {
            n: Some(n),
            last: None,
        })?;
        expect_eq("tag count with n", &n, &page.tags.len())?;
        self.first_page = Some(page);
        Ok(())
    }

    /// Step 3: asserts that `last` resumes strictly after the boundary.
    ///
    /// Uses the page recorded by [`Self::verify_truncation`], fetching it
    /// again when that step did not record one.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] when the continuation page is longer
    /// than `n` or misses the element following the boundary.
    pub fn verify_cursor(&mut self, probe: &Probe) -> Result<(), StepError> {
        let n = self.paginated_size()?;
        let first_page = match &self.first_page {
            Some(page) => page.clone(),
            None => list_tags(probe, &PageQuery {
                n: Some(n),
                last: None,
            })?,
        };
        let cursor = first_page
            .tags
            .last()
            .cloned()
            .ok_or_else(|| StepError::failed("truncated page is empty; no cursor to resume from"))?;
        let boundary = self
            .baseline
            .as_ref()
            .and_then(|baseline| baseline.tags.get(n))
            .cloned()
            .ok_or_else(|| StepError::failed(format!("baseline has no tag at index {n}")))?;
        let continuation = list_tags(probe, &PageQuery {
            n: Some(n),
            last: Some(cursor.clone()),
        })?;
        ensure(continuation.tags.len() <= n, || {
            format!(
                "tag count with n and last: expected at most {n}, got {}",
                continuation.tags.len()
            )
        })?;
        ensure(!continuation.tags.contains(&cursor), || {
            format!(
                "continuation after {cursor:?}: expected to exclude the cursor, got {:?}",
                continuation.tags
            )
        })?;
        ensure(continuation.tags.contains(&boundary), || {
            format!(
                "continuation after {cursor:?}: expected to contain {boundary:?}, got {:?}",
                continuation.tags
            )
        })
    }

    /// Asserts that the baseline holds every expected tag.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] naming the missing tags.
    pub fn verify_contains(&self, expected: &[String]) -> Result<(), StepError> {
        let baseline = self.require_baseline()?;
        let missing: Vec<&String> =
            expected.iter().filter(|tag| !baseline.tags.contains(tag)).collect();
        ensure(missing.is_empty(), || {
            format!("tag list: expected to contain {missing:?}, got {:?}", baseline.tags)
        })
    }

    /// Returns the baseline or fails.
    fn require_baseline(&self) -> Result<&TagList, StepError> {
        self.baseline.as_ref().ok_or_else(|| StepError::failed("no baseline tag listing recorded"))
    }

    /// Returns the page size, requiring a baseline of at least two tags.
    fn paginated_size(&self) -> Result<usize, StepError> {
        let baseline = self.require_baseline()?;
        match self.page_size {
            Some(n) if n > 0 => Ok(n),
            _ => Err(StepError::Failed(format!(
                "baseline listing returned {} tags; pagination needs at least 2",
                baseline.tags.len()
            ))),
        }
    }
}
