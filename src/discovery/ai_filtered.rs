//! AI-filtered discovery: the default, highest-priority strategy.
//!
//! Collects search evidence for every known candidate term, asks the
//! completion gateway to name the direct competitors (excluding comparison
//! and ranking aggregator sites), then resolves each name to its official
//! site. Any failure at the filtering step - gateway error, malformed
//! reply, zero evidence - surfaces as an error so the chain falls through
//! to the deterministic strategy without AI involvement.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{
    fetch_into_session, CandidateSource, DiscoveryDeps, DiscoverySession, DiscoveryStrategy,
};
use crate::error::GatewayError;
use crate::gateway::SearchHit;
use crate::identifier::{is_own_row, normalize_identifier};
use crate::keywords::{generate_search_keywords, parse_string_array, truncate};

/// Competitor service names requested from the completion gateway.
const SERVICE_NAME_COUNT: usize = 7;
/// Search hits included per evidence batch and per URL-selection prompt.
const HITS_PER_BATCH: usize = 10;

pub struct AiFilteredStrategy;

struct EvidenceBatch {
    keyword: String,
    hits: Vec<SearchHit>,
}

#[async_trait]
impl DiscoveryStrategy for AiFilteredStrategy {
    fn name(&self) -> &'static str {
        "ai-filtered"
    }

    async fn run(
        &self,
        deps: &DiscoveryDeps<'_>,
        session: &mut DiscoverySession<'_>,
    ) -> Result<(), GatewayError> {
        let completion = deps.completion.ok_or(GatewayError::Unavailable {
            reason: "no completion gateway configured".to_string(),
        })?;

        // Step 1: combined candidate term list - pasted-table identifiers,
        // impression-share identifiers, then generated keywords. First
        // occurrence wins.
        let mut terms: Vec<String> = Vec::new();
        let push_term = |term: &str, terms: &mut Vec<String>| {
            let term = term.trim();
            if !term.is_empty() && !is_own_row(term) && !terms.iter().any(|t| t == term) {
                terms.push(term.to_string());
            }
        };

        for identifier in session.extra_identifiers {
            push_term(identifier, &mut terms);
        }
        for record in session.seed_share_table {
            push_term(&record.identifier, &mut terms);
        }
        match generate_search_keywords(completion, session.seed_analysis).await {
            Ok(keywords) => {
                for keyword in &keywords {
                    push_term(keyword, &mut terms);
                }
            }
            Err(e) => {
                // Keyword generation failing does not kill the strategy;
                // the seed's own domain still makes a usable search term.
                warn!(error = %e, "keyword generation failed, using seed domain as term");
                let seed_domain = session.seed_domain.clone();
                push_term(&seed_domain, &mut terms);
            }
        }
        debug!(count = terms.len(), "collected candidate search terms");

        // Step 2: evidence collection, first N terms only.
        let mut batches: Vec<EvidenceBatch> = Vec::new();
        for term in terms.iter().take(session.settings.max_evidence_terms) {
            match deps.search.search(term).await {
                Ok(hits) if !hits.is_empty() => {
                    debug!(term = %term, hits = hits.len(), "evidence collected");
                    batches.push(EvidenceBatch {
                        keyword: term.clone(),
                        hits: hits.into_iter().take(HITS_PER_BATCH).collect(),
                    });
                    session.pace().await;
                }
                Ok(_) => debug!(term = %term, "no evidence for term"),
                Err(e) => warn!(term = %term, error = %e, "evidence search failed for term"),
            }
        }

        if batches.is_empty() {
            return Err(GatewayError::NoCandidate {
                term: "evidence collection".to_string(),
            });
        }

        // Step 3: one completion call picks the direct competitors.
        let service_names = select_service_names(completion, session, &batches).await?;
        info!(?service_names, "completion gateway selected competitor services");

        // Step 4: resolve each service name to its official site.
        for service_name in &service_names {
            if session.is_full() {
                break;
            }

            let hits = match deps.search.search(service_name).await {
                Ok(hits) if !hits.is_empty() => hits,
                Ok(_) => {
                    debug!(service = %service_name, "no search results for service");
                    continue;
                }
                Err(e) => {
                    warn!(service = %service_name, error = %e, "service search failed");
                    continue;
                }
            };

            let best_url = select_best_url(completion, service_name, &hits).await;
            let domain = normalize_identifier(&best_url);
            if !session.admit_domain(&domain) {
                continue;
            }

            fetch_into_session(
                deps,
                session,
                &best_url,
                CandidateSource::AiSuggested,
                service_name,
            )
            .await;
            session.pace().await;
        }

        Ok(())
    }
}

/// Ask the completion gateway for exactly [`SERVICE_NAME_COUNT`] direct
/// competitor service names given the collected evidence. A malformed
/// (non-array) reply is a strategy-level parse failure.
async fn select_service_names(
    completion: &dyn crate::gateway::CompletionGateway,
    session: &DiscoverySession<'_>,
    batches: &[EvidenceBatch],
) -> Result<Vec<String>, GatewayError> {
    let evidence: Vec<serde_json::Value> = batches
        .iter()
        .map(|b| {
            json!({
                "keyword": b.keyword,
                "results": b.hits.iter().map(|h| json!({
                    "title": h.title,
                    "url": h.url,
                    "snippet": h.snippet,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    let evidence_text = serde_json::to_string(&evidence).unwrap_or_default();

    let prompt = format!(
        "You are a marketing analyst. From the search results below, identify \
         the {count} services that are direct competitors of the given page.\n\
         \n\
         Original service URL: {seed}\n\
         Original service analysis:\n{analysis}\n\
         \n\
         Search result data:\n{evidence}\n\
         \n\
         Important:\n\
         - Exclude comparison, ranking and aggregator sites\n\
         - Only pick services that actually offer a competing product\n\
         - Name concrete services in the same field as the original\n\
         - Prefer well-known, representative services\n\
         \n\
         Output exactly {count} service names as a JSON array and nothing \
         else:\n[\"service 1\", \"service 2\", \"service 3\", \"service 4\", \
         \"service 5\", \"service 6\", \"service 7\"]",
        count = SERVICE_NAME_COUNT,
        seed = session.seed_url,
        analysis = truncate(&session.seed_analysis.analysis_text, 2000),
        evidence = truncate(&evidence_text, 5000),
    );

    let reply = completion.complete(&prompt).await?;

    let mut names = parse_string_array(&reply).ok_or(GatewayError::Parse {
        what: "competitor service name array".to_string(),
    })?;
    names.truncate(SERVICE_NAME_COUNT);
    Ok(names)
}

/// Ask the completion gateway for the official-site URL among the top hits.
/// Falls back to the first hit whenever the reply is not a well-formed
/// http(s) URL or the gateway errors - URL selection is best-effort.
async fn select_best_url(
    completion: &dyn crate::gateway::CompletionGateway,
    service_name: &str,
    hits: &[SearchHit],
) -> String {
    let listing = hits
        .iter()
        .take(HITS_PER_BATCH)
        .map(|h| format!("- {} ({}): {}", h.title, h.url, h.snippet))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Pick the single official site (or most relevant URL) for the \
         service \"{service}\" from the search results below. Prefer the \
         provider's own site over comparison or review sites.\n\
         \n\
         Search results:\n{listing}\n\
         \n\
         Reply with the URL only, nothing else:",
        service = service_name,
        listing = listing,
    );

    match completion.complete(&prompt).await {
        Ok(reply) => {
            let candidate = reply.trim();
            if candidate.starts_with("http://") || candidate.starts_with("https://") {
                candidate.to_string()
            } else {
                warn!(
                    service = %service_name,
                    reply = %truncate(candidate, 120),
                    "URL selection reply not a well-formed URL, using first hit"
                );
                hits[0].url.clone()
            }
        }
        Err(e) => {
            warn!(service = %service_name, error = %e, "URL selection failed, using first hit");
            hits[0].url.clone()
        }
    }
}
