//! Fatal failures, degenerate inputs and lost batches

use super::*;
use crate::app::services::pipeline::Pipeline;

#[tokio::test]
async fn test_schema_too_narrow_fails_before_any_lookup() {
    let fixture = Fixture::new("Name,Address\nHolmes,221B Baker St\n");
    let config = fixture.config().with_address_column(2);

    let pipeline = Pipeline::new(&config, numbered_geocoder(1));
    let result = pipeline.run().await;

    assert!(matches!(
        result,
        Err(Error::SchemaTooNarrow {
            columns: 2,
            address_column: 2
        })
    ));
    assert!(pipeline.geocoder().calls().is_empty());

    let output = read_lines(&fixture.output);
    assert_eq!(output[0], "Error");
    assert!(output[1].contains("at least 3 columns"));
    assert!(!fixture.log_dir.exists());
}

#[tokio::test]
async fn test_schema_failure_keeps_existing_output() {
    let fixture = Fixture::new("Address\naddr-1\n");
    fs::write(&fixture.output, "Address,Latitude,Longitude\naddr-1,1,-1\n").unwrap();
    let config = fixture.config().with_address_column(5);

    let result = Pipeline::new(&config, numbered_geocoder(1)).run().await;

    assert!(result.is_err());
    assert_eq!(
        read_lines(&fixture.output),
        vec!["Address,Latitude,Longitude", "addr-1,1,-1"]
    );
}

#[tokio::test]
async fn test_corrected_rerun_replaces_failure_notice() {
    let fixture = Fixture::new("Address\naddr-1\naddr-2\n");
    let wrong_column = fixture.config().with_address_column(3);
    assert!(Pipeline::new(&wrong_column, numbered_geocoder(2))
        .run()
        .await
        .is_err());
    assert_eq!(read_lines(&fixture.output)[0], "Error");

    let config = fixture.config();
    let pipeline = Pipeline::new(&config, numbered_geocoder(2));
    assert!(!pipeline.plan().unwrap().appends_to_existing);
    let summary = pipeline.run().await.unwrap();

    assert!(!summary.appended_to_existing);
    assert_eq!(
        read_lines(&fixture.output),
        vec!["Address,Latitude,Longitude", "addr-1,1,-1", "addr-2,2,-2"]
    );
}

#[tokio::test]
async fn test_missing_input_is_fatal_ingest() {
    let fixture = Fixture::new("");
    let config = RunConfig::new(fixture.path("missing.csv"), &fixture.output)
        .with_delay_ms(0)
        .with_log_dir(&fixture.log_dir);

    let result = Pipeline::new(&config, ScriptedGeocoder::new()).run().await;

    let error = result.unwrap_err();
    assert!(matches!(error, Error::Ingest { .. }));
    assert!(error.is_fatal());

    let output = read_lines(&fixture.output);
    assert_eq!(output[0], "Error");
    assert!(output[1].contains("cannot open input file"));
}

#[tokio::test]
async fn test_undecodable_row_flushes_then_fails() {
    let fixture = Fixture::new("");
    fs::write(&fixture.input, b"Address\naddr-1\naddr-2\n\xff\xfe\naddr-4\n").unwrap();
    let config = fixture.config();

    let pipeline = Pipeline::new(&config, numbered_geocoder(4));
    let error = pipeline.run().await.unwrap_err();

    assert!(matches!(error, Error::Ingest { .. }));
    assert!(error.to_string().contains("cannot read row 3"));
    assert_eq!(pipeline.geocoder().calls(), vec!["addr-1", "addr-2"]);

    // Rows already processed are durable and the notice does not clobber them
    assert_eq!(
        read_lines(&fixture.output),
        vec!["Address,Latitude,Longitude", "addr-1,1,-1", "addr-2,2,-2"]
    );
}

#[tokio::test]
async fn test_empty_input_writes_placeholder_output() {
    let fixture = Fixture::new("");
    let config = fixture.config();

    let summary = Pipeline::new(&config, ScriptedGeocoder::new())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.records_read, 0);
    assert_eq!(summary.records_written, 0);
    assert_eq!(read_lines(&fixture.output), vec!["Latitude,Longitude"]);

    let log = log_lines(&summary);
    assert_eq!(log.len(), 1);
    assert!(log[0].contains("WARN: Input"));
}

#[tokio::test]
async fn test_empty_input_leaves_resumed_output_alone() {
    let fixture = Fixture::new("");
    let config = fixture.config().with_from_row(3);
    let resumed = config.effective_output_path();
    fs::write(&resumed, "Address,Latitude,Longitude\naddr-3,3,-3\n").unwrap();

    Pipeline::new(&config, ScriptedGeocoder::new())
        .run()
        .await
        .unwrap();

    assert_eq!(read_lines(&resumed).len(), 2);
}

#[tokio::test]
async fn test_header_only_input_writes_header_only_output() {
    let fixture = Fixture::new("Address,Name\n");
    let config = fixture.config();

    let summary = Pipeline::new(&config, ScriptedGeocoder::new())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.records_written, 0);
    assert_eq!(summary.batches_flushed, 1);
    assert_eq!(
        read_lines(&fixture.output),
        vec!["Address,Name,Latitude,Longitude"]
    );
    assert!(summary.log_path.is_none());
}

#[tokio::test]
async fn test_header_only_input_still_validates_schema() {
    let fixture = Fixture::new("Address\n");
    let config = fixture.config().with_address_column(1);

    let result = Pipeline::new(&config, ScriptedGeocoder::new()).run().await;

    assert!(matches!(result, Err(Error::SchemaTooNarrow { .. })));
}

#[tokio::test]
async fn test_lost_batches_do_not_stop_run() {
    let fixture = Fixture::new(&numbered_input(4));
    // A directory where the output file should be makes every flush fail
    fs::create_dir(&fixture.output).unwrap();
    let config = fixture.config().with_batch_size(2);

    let pipeline = Pipeline::new(&config, numbered_geocoder(4));
    let summary = pipeline.run().await.unwrap();

    assert_eq!(pipeline.geocoder().calls().len(), 4);
    assert_eq!(summary.batches_lost, 2);
    assert_eq!(summary.batches_flushed, 0);
    assert_eq!(summary.records_written, 0);
    assert_eq!(summary.last_flushed_ordinal, None);

    let log = log_lines(&summary);
    assert!(log[0].contains("ERROR: Failed to write rows 1-2"));
    assert!(log[0].contains("--from-row 1"));
    assert!(log[1].contains("ERROR: Failed to write rows 3-4"));
    assert!(log[2].contains("ERROR: Failed to write output header"));
}
