//! Shutdown handling gets its own test binary: the shutdown flag is
//! process-global and can only be set, so it must not leak into the
//! other integration tests.

use tempfile::TempDir;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use oaiharvest_core::{ProgressContext, request_shutdown};
use oaiharvest_pmh::{HarvestConfig, run};

fn record_xml(id: &str, title: &str) -> String {
    format!(
        "<record><header><identifier>{id}</identifier>\
         <datestamp>2026-01-01T00:00:00Z</datestamp></header>\
         <metadata><oai_dc:dc \
         xmlns:oai_dc=\"http://www.openarchives.org/OAI/2.0/oai_dc/\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
         <dc:title>{title}</dc:title></oai_dc:dc></metadata></record>"
    )
}

fn list_records_body(records: &[String], token: Option<(&str, u64, u64)>) -> String {
    let token_xml = match token {
        Some((text, cursor, size)) => format!(
            "<resumptionToken cursor=\"{cursor}\" completeListSize=\"{size}\">{text}</resumptionToken>"
        ),
        None => String::new(),
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <OAI-PMH xmlns=\"http://www.openarchives.org/OAI/2.0/\">\
         <responseDate>2026-08-24T12:00:00Z</responseDate>\
         <ListRecords>{}{token_xml}</ListRecords></OAI-PMH>",
        records.concat()
    )
}

#[test]
fn shutdown_stops_between_items_and_keeps_checkpoint() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("failed to build test runtime");
    let server = rt.block_on(MockServer::start());
    let dir = TempDir::new().unwrap();

    let cfg = HarvestConfig {
        endpoint: server.uri(),
        metadata_prefix: "oai_dc".to_string(),
        set: None,
        checkpoint_path: dir.path().join("harvest.status"),
        metadata_output: Some(dir.path().join("metadata.tsv")),
        record_output: Some(dir.path().join("records.xml")),
        strip_xml: true,
        full_record: false,
    };

    // A prior run committed two records and left the continuation token
    std::fs::write(&cfg.checkpoint_path, "t1/2/4/").unwrap();

    let fresh_initial = list_records_body(
        &[record_xml("oai:t:1", "One")],
        Some(("t-fresh", 0, 4)),
    );
    let resumed = list_records_body(
        &[record_xml("oai:t:3", "Three"), record_xml("oai:t:4", "Four")],
        None,
    );
    rt.block_on(
        Mock::given(method("GET"))
            .and(query_param("verb", "ListRecords"))
            .and(query_param("metadataPrefix", "oai_dc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fresh_initial))
            .mount(&server),
    );
    rt.block_on(
        Mock::given(method("GET"))
            .and(query_param("verb", "ListRecords"))
            .and(query_param("resumptionToken", "t1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(resumed))
            .mount(&server),
    );

    // The flag is polled between items, so the resumed page arrives but
    // none of its records may be committed
    request_shutdown();

    let summary = run(&cfg, &ProgressContext::new()).unwrap();
    assert!(summary.interrupted);
    assert!(!summary.aborted);
    assert_eq!(summary.written, 0);

    // Checkpoint untouched for the next run
    assert_eq!(
        std::fs::read_to_string(&cfg.checkpoint_path).unwrap(),
        "t1/2/4/"
    );

    // Header was created, but no rows and no record payloads followed
    let metadata = std::fs::read_to_string(cfg.metadata_output.as_ref().unwrap()).unwrap();
    assert_eq!(metadata.lines().count(), 1);
    assert!(metadata.starts_with("id\ttimestamp"));
    let records = std::fs::read_to_string(cfg.record_output.as_ref().unwrap()).unwrap();
    assert!(records.is_empty());
}
