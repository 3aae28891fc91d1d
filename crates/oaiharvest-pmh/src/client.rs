//! OAI-PMH transport client.
//!
//! Thin wrapper over the shared HTTP layer: builds verb requests, lets the
//! retry policy in `oaiharvest_core::http` absorb transient failures, and
//! parses the response. Errors reaching the caller are final for the
//! request.

use oaiharvest_core::get_with_retry;

use crate::error::HarvestError;
use crate::parser::{self, RecordPage, SetInfo};

pub struct OaiClient {
    endpoint: String,
}

impl OaiClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn get(&self, params: &[(&str, &str)]) -> Result<String, HarvestError> {
        Ok(get_with_retry(&self.endpoint, params)?)
    }

    /// Metadata prefixes the repository advertises.
    pub fn list_metadata_formats(&self) -> Result<Vec<String>, HarvestError> {
        let body = self.get(&[("verb", "ListMetadataFormats")])?;
        parser::parse_metadata_formats(&body)
    }

    /// All sets the repository advertises, following set-listing pagination.
    pub fn list_sets(&self) -> Result<Vec<SetInfo>, HarvestError> {
        let body = self.get(&[("verb", "ListSets")])?;
        let (mut sets, mut token) = parser::parse_sets(&body)?;
        while let Some(text) = token {
            let body = self.get(&[("verb", "ListSets"), ("resumptionToken", &text)])?;
            let (more, next) = parser::parse_sets(&body)?;
            sets.extend(more);
            token = next;
        }
        Ok(sets)
    }

    /// Initial `ListRecords` page for a fresh listing.
    pub fn list_records(
        &self,
        metadata_prefix: &str,
        set: Option<&str>,
    ) -> Result<RecordPage, HarvestError> {
        let mut params = vec![
            ("verb", "ListRecords"),
            ("metadataPrefix", metadata_prefix),
        ];
        if let Some(set) = set {
            params.push(("set", set));
        }
        let body = self.get(&params)?;
        parser::parse_list_records(&body)
    }

    /// Continuation page for an ongoing listing. The token is passed
    /// through verbatim.
    pub fn resume(&self, token: &str) -> Result<RecordPage, HarvestError> {
        let body = self.get(&[("verb", "ListRecords"), ("resumptionToken", token)])?;
        parser::parse_list_records(&body)
    }
}
