//! Harvest configuration

use std::path::PathBuf;

use crate::error::HarvestError;

/// Default OAI-PMH endpoint (Finna, the Finnish national discovery service)
pub const DEFAULT_ENDPOINT: &str = "https://api.finna.fi/OAI/Server";

/// Everything one harvest run needs. Owned by the driver for the process
/// lifetime; there is no ambient configuration state anywhere else.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// OAI-PMH endpoint URL
    pub endpoint: String,
    /// Metadata prefix to request
    pub metadata_prefix: String,
    /// Optional set filter
    pub set: Option<String>,
    /// Checkpoint file for resuming an interrupted harvest
    pub checkpoint_path: PathBuf,
    /// TSV metadata table (`.gz` for transparent compression)
    pub metadata_output: Option<PathBuf>,
    /// Raw record stream, one record per line (`.gz` for compression)
    pub record_output: Option<PathBuf>,
    /// Strip XML namespaces from record output
    pub strip_xml: bool,
    /// Write the full `<record>` element instead of only its metadata
    /// payload
    pub full_record: bool,
}

impl HarvestConfig {
    /// A harvest with no sink would write nothing at all.
    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.metadata_output.is_none() && self.record_output.is_none() {
            return Err(HarvestError::Config(
                "neither metadata nor record output configured, harvest would write nothing"
                    .to_string(),
            ));
        }
        if self.metadata_prefix.is_empty() {
            return Err(HarvestError::Config(
                "metadata prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HarvestConfig {
        HarvestConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            metadata_prefix: "oai_dc".to_string(),
            set: None,
            checkpoint_path: PathBuf::from("status"),
            metadata_output: Some(PathBuf::from("meta.tsv")),
            record_output: None,
            strip_xml: true,
            full_record: false,
        }
    }

    #[test]
    fn one_sink_is_enough() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn no_sinks_is_config_error() {
        let mut cfg = config();
        cfg.metadata_output = None;
        assert!(matches!(cfg.validate(), Err(HarvestError::Config(_))));
    }

    #[test]
    fn empty_prefix_is_config_error() {
        let mut cfg = config();
        cfg.metadata_prefix = String::new();
        assert!(matches!(cfg.validate(), Err(HarvestError::Config(_))));
    }
}
