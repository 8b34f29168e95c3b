//! Value parsers for clap arguments

use coachbench_core::model::ModelDescriptor;

/// Parse `provider:model` or a bare model id
pub fn parse_model(s: &str) -> Result<ModelDescriptor, String> {
    s.parse::<ModelDescriptor>().map_err(|e| e.to_string())
}
