//! Deterministic discovery: the fallback and base strategy.
//!
//! Phase one resolves each seed-table identifier through one search,
//! keeping the first hit whose domain actually matches the identifier.
//! Phase two sweeps generated keywords, admitting every distinct domain in
//! the first few hits of each. No completion gateway is required: when
//! keyword generation is impossible or fails, the seed's own domain serves
//! as the sole keyword.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{
    fetch_into_session, CandidateSource, DiscoveryDeps, DiscoverySession, DiscoveryStrategy,
};
use crate::error::GatewayError;
use crate::identifier::{is_own_row, is_same_identifier, normalize_identifier};
use crate::keywords::generate_search_keywords;

pub struct DeterministicStrategy;

#[async_trait]
impl DiscoveryStrategy for DeterministicStrategy {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    async fn run(
        &self,
        deps: &DiscoveryDeps<'_>,
        session: &mut DiscoverySession<'_>,
    ) -> Result<(), GatewayError> {
        // Phase 1: one search per seed-table identifier, first matching
        // domain wins. Pasted-table identifiers first, then the
        // impression-share rows.
        let identifiers: Vec<(String, CandidateSource)> = session
            .extra_identifiers
            .iter()
            .map(|id| (id.clone(), CandidateSource::Table))
            .chain(
                session
                    .seed_share_table
                    .iter()
                    .map(|r| (r.identifier.clone(), CandidateSource::ImpressionShare)),
            )
            .collect();

        for (identifier, source) in identifiers {
            if session.is_full() {
                break;
            }
            if is_own_row(&identifier) {
                debug!(identifier = %identifier, "skipping own-row identifier");
                continue;
            }

            let hits = match deps.search.search(&identifier).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "identifier search failed");
                    continue;
                }
            };
            session.pace().await;

            let mut found = false;
            for hit in &hits {
                let hit_domain = normalize_identifier(&hit.url);
                // Only take hits that really belong to this identifier
                if !is_same_identifier(&hit_domain, &identifier) {
                    continue;
                }
                if !session.admit_domain(&hit_domain) {
                    continue;
                }
                fetch_into_session(deps, session, &hit.url, source, &identifier).await;
                found = true;
                break;
            }
            if !found {
                info!(identifier = %identifier, "no usable landing page for identifier");
            }
        }

        if session.is_full() {
            return Ok(());
        }

        // Phase 2: keyword sweep over the first few hits per keyword,
        // admitting every distinct non-self domain.
        let keywords = match deps.completion {
            Some(completion) => {
                match generate_search_keywords(completion, session.seed_analysis).await {
                    Ok(keywords) if !keywords.is_empty() => keywords,
                    Ok(_) => vec![session.seed_domain.clone()],
                    Err(e) => {
                        warn!(error = %e, "keyword generation failed, using seed domain");
                        vec![session.seed_domain.clone()]
                    }
                }
            }
            None => vec![session.seed_domain.clone()],
        };

        for keyword in &keywords {
            if session.is_full() {
                break;
            }

            let hits = match deps.search.search(keyword).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "keyword search failed");
                    continue;
                }
            };
            session.pace().await;

            for hit in hits.iter().take(session.settings.hits_per_keyword) {
                if session.is_full() {
                    break;
                }
                let hit_domain = normalize_identifier(&hit.url);
                if !session.admit_domain(&hit_domain) {
                    continue;
                }
                fetch_into_session(
                    deps,
                    session,
                    &hit.url,
                    CandidateSource::GeneratedKeyword,
                    keyword,
                )
                .await;
            }
        }

        Ok(())
    }
}
