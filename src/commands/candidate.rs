//! Allocation candidate commands
//!
//! Candidates appeared in microversion 1.10. The response pairs allocation
//! requests, each of which could be claimed as-is with an allocation set,
//! with provider summaries carrying used/capacity per inventory class. The
//! allocation request wire format changed at 1.12 from a list of entries to
//! a map keyed by provider uuid; both forms render to the same table.

use crate::client::PlacementClient;
use crate::error::{Error, Result};
use crate::format::TabularResult;
use crate::request::{parse_resource_filter, Operation};
use crate::version::{check_operation, Microversion};
use clap::Subcommand;
use serde_json::Value;
use std::collections::BTreeMap;

const BASE_URL: &str = "/allocation_candidates";
const FIELDS: &[&str] = &["#", "allocation", "resource provider", "inventory used/capacity"];

const CANDIDATE_MIN: Microversion = Microversion::new(1, 10);
const KEYED_REQUESTS_MIN: Microversion = Microversion::new(1, 12);

/// Allocation candidate subcommands
#[derive(Subcommand, Debug)]
pub enum CandidateCommands {
    /// List allocation candidates.
    ///
    /// Each numbered group of rows is one allocation request the listed
    /// providers could collectively serve; pick one and claim it with an
    /// allocation set. Requires at least version 1.10
    List {
        /// A <resource_class>=<amount> pair the candidates must have the
        /// capacity and availability to serve. May be repeated; at least
        /// one is required
        #[arg(long)]
        resource: Vec<String>,
    },
}

pub async fn handle(
    client: &PlacementClient,
    cmd: CandidateCommands,
) -> Result<Option<TabularResult>> {
    match cmd {
        CandidateCommands::List { resource } => list(client, resource).await,
    }
}

async fn list(client: &PlacementClient, resource: Vec<String>) -> Result<Option<TabularResult>> {
    let negotiated = client.api_version();
    check_operation("allocation candidate list", CANDIDATE_MIN, negotiated)?;
    if resource.is_empty() {
        return Err(Error::MissingArgument(
            "at least one --resource must be specified".to_string(),
        ));
    }

    let resources: Vec<String> = resource
        .iter()
        .map(|r| parse_resource_filter(r).map(|(class, amount)| format!("{class}:{amount}")))
        .collect::<Result<_>>()?;
    let query = vec![("resources".to_string(), resources.join(","))];

    let response = client
        .request(Operation::List.method(), BASE_URL, &query, None)
        .await?;
    Ok(Some(format_candidates(&response, negotiated)?))
}

fn format_candidates(response: &Value, negotiated: Microversion) -> Result<TabularResult> {
    let summaries = provider_summaries(response)?;
    let requests = response
        .get("allocation_requests")
        .and_then(|r| r.as_array())
        .ok_or_else(|| Error::malformed("response is missing \"allocation_requests\""))?;

    let mut result = TabularResult::new(FIELDS.iter().map(|f| f.to_string()).collect());
    for (i, request) in requests.iter().enumerate() {
        let allocations = request
            .get("allocations")
            .ok_or_else(|| Error::malformed("allocation request is missing \"allocations\""))?;

        if negotiated >= KEYED_REQUESTS_MIN {
            let per_provider = allocations
                .as_object()
                .ok_or_else(|| Error::malformed("expected allocations keyed by provider"))?;
            let sorted: BTreeMap<&String, &Value> = per_provider.iter().collect();
            for (rp, entry) in sorted {
                push_candidate(&mut result, i, rp, entry.get("resources"), &summaries)?;
            }
        } else {
            let entries = allocations
                .as_array()
                .ok_or_else(|| Error::malformed("expected a list of allocations"))?;
            for entry in entries {
                let rp = entry
                    .pointer("/resource_provider/uuid")
                    .and_then(|u| u.as_str())
                    .ok_or_else(|| {
                        Error::malformed("allocation is missing \"resource_provider\"")
                    })?;
                push_candidate(&mut result, i, rp, entry.get("resources"), &summaries)?;
            }
        }
    }
    Ok(result)
}

fn push_candidate(
    result: &mut TabularResult,
    index: usize,
    rp: &str,
    resources: Option<&Value>,
    summaries: &BTreeMap<String, String>,
) -> Result<()> {
    let resources = resources
        .and_then(|r| r.as_object())
        .ok_or_else(|| Error::malformed("allocation is missing \"resources\""))?;
    let request: Vec<String> = resources
        .iter()
        .map(|(class, amount)| format!("{class}={amount}"))
        .collect();
    let inventory = summaries
        .get(rp)
        .cloned()
        .ok_or_else(|| Error::malformed(format!("no provider summary for {rp}")))?;
    result.push_row(vec![
        (index + 1).to_string(),
        request.join(","),
        rp.to_string(),
        inventory,
    ]);
    Ok(())
}

/// Collapse each provider summary into a "CLASS=used/capacity,..." string.
fn provider_summaries(response: &Value) -> Result<BTreeMap<String, String>> {
    let summaries = response
        .get("provider_summaries")
        .and_then(|s| s.as_object())
        .ok_or_else(|| Error::malformed("response is missing \"provider_summaries\""))?;

    let mut collapsed = BTreeMap::new();
    for (rp, summary) in summaries {
        let resources = summary
            .get("resources")
            .and_then(|r| r.as_object())
            .ok_or_else(|| Error::malformed("provider summary is missing \"resources\""))?;
        let parts: Vec<String> = resources
            .iter()
            .map(|(class, usage)| {
                let used = usage.get("used").map(Value::to_string).unwrap_or_default();
                let capacity = usage
                    .get("capacity")
                    .map(Value::to_string)
                    .unwrap_or_default();
                format!("{class}={used}/{capacity}")
            })
            .collect();
        collapsed.insert(rp.clone(), parts.join(","));
    }
    Ok(collapsed)
}
