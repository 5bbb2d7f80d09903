//! ID resolver module
//!
//! Lets users name a pipeline by a short, unambiguous prefix of its UUID.

use anyhow::{Context, Result, anyhow};
use uuid::Uuid;
use weir_client::OrchestratorClient;

/// Resolve a pipeline ID or prefix to a full UUID
///
/// A full UUID is returned as is; anything else is matched against the
/// listed pipelines.
pub async fn resolve_pipeline_id(client: &OrchestratorClient, input: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(input) {
        return Ok(uuid);
    }

    let pipelines = client
        .list_pipelines()
        .await
        .context("Failed to fetch pipelines for ID resolution")?;

    match_prefix(pipelines.iter().map(|p| p.id), input)
}

fn match_prefix(ids: impl Iterator<Item = Uuid>, input: &str) -> Result<Uuid> {
    let prefix = input.to_lowercase();
    let matches: Vec<Uuid> = ids
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No pipeline found with ID starting with '{}'",
            prefix
        )),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|id| id.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple pipelines: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<Uuid> {
        vec![
            Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000001").unwrap(),
            Uuid::parse_str("a1b2ffff-0000-0000-0000-000000000002").unwrap(),
        ]
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let id = match_prefix(ids().into_iter(), "A1B2C").unwrap();
        assert_eq!(id, ids()[0]);
    }

    #[test]
    fn test_ambiguous_prefix_lists_candidates() {
        let err = match_prefix(ids().into_iter(), "a1b2").unwrap_err();
        assert!(err.to_string().contains("Ambiguous"));
        assert!(err.to_string().contains("a1b2ffff"));
    }

    #[test]
    fn test_unknown_prefix_fails() {
        assert!(match_prefix(ids().into_iter(), "ff").is_err());
    }
}
