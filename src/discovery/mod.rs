//! Competitor discovery orchestration.
//!
//! Discovery runs an explicit, ordered chain of strategies over one
//! [`DiscoverySession`]. The session is the single owner of the growing
//! competitor set and the seen-domain set, so the dedup, budget and
//! self-domain invariants are enforced in exactly one place
//! ([`DiscoverySession::admit_domain`]) no matter which strategy is asking.
//! Nothing in here is shared across discovery runs.

pub mod ai_filtered;
pub mod deterministic;

pub use ai_filtered::AiFilteredStrategy;
pub use deterministic::DeterministicStrategy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::gateway::{CompletionGateway, PageAnalysis, PageGateway, SearchGateway};
use crate::identifier::{is_same_identifier, normalize_identifier};
use crate::reviews::{search_reviews, ReviewRecord};
use crate::share_table::ShareRecord;

/// How a competitor candidate entered the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateSource {
    /// Identifier from a pasted competitor table
    Table,
    /// Identifier from an impression-share table row
    ImpressionShare,
    /// Service name picked by the completion gateway
    AiSuggested,
    /// Hit found through a generated search keyword
    GeneratedKeyword,
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CandidateSource::Table => "table",
            CandidateSource::ImpressionShare => "impression-share",
            CandidateSource::AiSuggested => "ai-suggested",
            CandidateSource::GeneratedKeyword => "generated-keyword",
        };
        write!(f, "{}", s)
    }
}

/// One analyzed competitor landing page.
///
/// Created when a candidate is successfully fetched and analyzed. The only
/// later mutation is the share back-fill performed at admission; a failed
/// fetch/analysis drops the candidate without retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorRecord {
    pub url: String,
    pub canonical_domain: String,
    pub title: String,
    pub analysis_text: String,
    pub meta_data: BTreeMap<String, String>,
    /// Observed market share matched from the seed table, when available
    pub share_value: Option<f64>,
    pub source: CandidateSource,
    /// The identifier or keyword that led to this record
    pub search_term: String,
}

/// Final output of one discovery run. Zero competitors is a valid outcome
/// ("no competitors found"), not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub competitors: Vec<CompetitorRecord>,
    pub review_records: Vec<ReviewRecord>,
    pub seed_share_table: Vec<ShareRecord>,
}

/// Tunables for one discovery run. Defaults mirror the config template.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Hard cap on competitor records
    pub max_competitors: usize,
    /// Below this count a later strategy tops the result up
    pub min_before_supplement: usize,
    /// Pause after each search/fetch call
    pub request_delay: Duration,
    /// Candidate terms searched for AI-filter evidence
    pub max_evidence_terms: usize,
    /// Search hits scanned per generated keyword
    pub hits_per_keyword: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_competitors: 7,
            min_before_supplement: 3,
            request_delay: Duration::from_millis(1000),
            max_evidence_terms: 10,
            hits_per_keyword: 5,
        }
    }
}

/// The external capabilities a run consumes. The completion gateway is
/// optional; without it the AI-filtered strategy is skipped entirely.
pub struct DiscoveryDeps<'a> {
    pub search: &'a dyn SearchGateway,
    pub page: &'a dyn PageGateway,
    pub completion: Option<&'a dyn CompletionGateway>,
}

/// Mutable state of one discovery run: seed context, the seen-domain set
/// and the growing result list. Strategies receive it by mutable reference;
/// no session state outlives the run.
pub struct DiscoverySession<'a> {
    pub seed_url: &'a str,
    pub seed_domain: String,
    pub seed_analysis: &'a PageAnalysis,
    pub seed_share_table: &'a [ShareRecord],
    pub extra_identifiers: &'a [String],
    pub settings: &'a DiscoverySettings,
    seen_domains: Vec<String>,
    competitors: Vec<CompetitorRecord>,
}

impl<'a> DiscoverySession<'a> {
    pub fn new(
        seed_url: &'a str,
        seed_analysis: &'a PageAnalysis,
        seed_share_table: &'a [ShareRecord],
        extra_identifiers: &'a [String],
        settings: &'a DiscoverySettings,
    ) -> Self {
        Self {
            seed_url,
            seed_domain: normalize_identifier(seed_url),
            seed_analysis,
            seed_share_table,
            extra_identifiers,
            settings,
            seen_domains: Vec::new(),
            competitors: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.competitors.len() >= self.settings.max_competitors
    }

    pub fn len(&self) -> usize {
        self.competitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.competitors.is_empty()
    }

    /// Gatekeeper for every candidate domain. Returns false when the budget
    /// is exhausted, the domain is the seed's own, or it duplicates an
    /// already-seen domain (substring-loose comparison, see
    /// `identifier::is_same_identifier`). On admission the domain is
    /// recorded immediately, so a later fetch failure is not retried within
    /// this run.
    pub fn admit_domain(&mut self, domain: &str) -> bool {
        if self.is_full() {
            return false;
        }
        let normalized = normalize_identifier(domain);
        if normalized.is_empty() {
            return false;
        }
        if is_same_identifier(&normalized, &self.seed_domain) {
            info!(domain = %normalized, "skipping seed's own domain");
            return false;
        }
        if self
            .seen_domains
            .iter()
            .any(|seen| is_same_identifier(seen, &normalized))
        {
            info!(domain = %normalized, "skipping already-seen domain");
            return false;
        }
        self.seen_domains.push(normalized);
        true
    }

    /// Append an analyzed competitor, back-filling its share from the seed
    /// table (bidirectional substring match on normalized identifiers).
    pub fn push_record(&mut self, mut record: CompetitorRecord) {
        if record.share_value.is_none() {
            record.share_value = self.lookup_share(&record.canonical_domain);
        }
        info!(
            domain = %record.canonical_domain,
            source = %record.source,
            count = self.competitors.len() + 1,
            budget = self.settings.max_competitors,
            "competitor added"
        );
        self.competitors.push(record);
    }

    fn lookup_share(&self, domain: &str) -> Option<f64> {
        self.seed_share_table
            .iter()
            .find(|r| is_same_identifier(&r.identifier, domain))
            .map(|r| r.share_value)
    }

    /// Fixed cooldown between consecutive external calls. A sequential
    /// wait, not a scheduling primitive.
    pub async fn pace(&self) {
        tokio::time::sleep(self.settings.request_delay).await;
    }

    fn into_result(self, review_records: Vec<ReviewRecord>) -> DiscoveryResult {
        DiscoveryResult {
            competitors: self.competitors,
            review_records,
            seed_share_table: self.seed_share_table.to_vec(),
        }
    }
}

/// One discovery approach in the strategy chain. Strategies contribute
/// candidates through the session until the budget is exhausted; an error
/// means the whole strategy is unusable and the chain moves on.
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        deps: &DiscoveryDeps<'_>,
        session: &mut DiscoverySession<'_>,
    ) -> Result<(), GatewayError>;
}

/// Fetch and analyze an admitted candidate URL and append it to the
/// session. A fetch/analysis failure is logged and drops just this
/// candidate; the admitted domain stays recorded, so it is not retried
/// within the run.
pub(crate) async fn fetch_into_session(
    deps: &DiscoveryDeps<'_>,
    session: &mut DiscoverySession<'_>,
    url: &str,
    source: CandidateSource,
    search_term: &str,
) {
    match deps.page.fetch_and_analyze(url).await {
        Ok(analysis) => {
            session.push_record(CompetitorRecord {
                url: url.to_string(),
                canonical_domain: normalize_identifier(url),
                title: analysis.title,
                analysis_text: analysis.analysis_text,
                meta_data: analysis.meta_data,
                share_value: None,
                source,
                search_term: search_term.to_string(),
            });
        }
        Err(e) => {
            warn!(url, error = %e, "candidate fetch/analysis failed, dropping candidate");
        }
    }
}

/// Discover up to the configured budget of distinct competitor landing
/// pages for the seed.
///
/// The strategy chain is a fixed priority list: AI-filtered discovery when
/// a completion gateway is available, then the deterministic table/keyword
/// strategy. A strategy error falls through to the next strategy; a
/// successful strategy that yields fewer than the supplement threshold is
/// topped up by the next one. An exhausted chain with zero records returns
/// an empty result, never an error.
pub async fn discover_competitors(
    deps: &DiscoveryDeps<'_>,
    seed_url: &str,
    seed_analysis: &PageAnalysis,
    seed_share_table: &[ShareRecord],
    extra_identifiers: &[String],
    settings: &DiscoverySettings,
) -> DiscoveryResult {
    let mut session = DiscoverySession::new(
        seed_url,
        seed_analysis,
        seed_share_table,
        extra_identifiers,
        settings,
    );

    let mut strategies: Vec<Box<dyn DiscoveryStrategy>> = Vec::new();
    if deps.completion.is_some() {
        strategies.push(Box::new(AiFilteredStrategy));
    }
    strategies.push(Box::new(DeterministicStrategy));

    for strategy in &strategies {
        if session.is_full() {
            break;
        }
        info!(strategy = strategy.name(), "running discovery strategy");
        match strategy.run(deps, &mut session).await {
            Ok(()) => {
                if session.len() >= settings.min_before_supplement {
                    break;
                }
                info!(
                    strategy = strategy.name(),
                    count = session.len(),
                    threshold = settings.min_before_supplement,
                    "strategy yielded fewer records than the supplement threshold, topping up"
                );
            }
            Err(e) => {
                warn!(
                    strategy = strategy.name(),
                    error = %e,
                    "strategy failed, falling back"
                );
            }
        }
    }

    if session.is_empty() {
        info!(seed = %seed_url, "no competitors found");
    } else {
        info!(seed = %seed_url, count = session.len(), "discovery complete");
    }

    let review_records = search_reviews(deps.search, deps.page, seed_url, settings).await;

    session.into_result(review_records)
}
