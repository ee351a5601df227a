use crate::types::{BuildingBlocks, TestPlan};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a test plan: partition → class → signature → { display, rows }.
pub fn parse_plan(json: &str) -> Result<TestPlan, ParseError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse building blocks: class → { sequences, imports, segments }.
pub fn parse_building_blocks(json: &str) -> Result<BuildingBlocks, ParseError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a targeted-operation list (a JSON array of signatures).
pub fn parse_targets(json: &str) -> Result<std::collections::BTreeSet<String>, ParseError> {
    Ok(serde_json::from_str(json)?)
}
