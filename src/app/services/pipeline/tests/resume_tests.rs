//! Resume semantics: starting ordinals, suffixed outputs and appends

use super::*;
use crate::app::services::pipeline::Pipeline;

#[tokio::test]
async fn test_from_row_writes_suffixed_output() {
    let fixture = Fixture::new(&numbered_input(6));
    let config = fixture.config().with_from_row(4);

    let pipeline = Pipeline::new(&config, numbered_geocoder(6));
    let summary = pipeline.run().await.unwrap();

    let resumed = fixture.path("geocoded-from-row-4.csv");
    assert_eq!(summary.output_path, resumed);
    assert_eq!(summary.records_skipped_before_start, 3);
    assert_eq!(summary.records_written, 3);
    assert!(!fixture.output.exists());
    assert_eq!(
        pipeline.geocoder().calls(),
        vec!["addr-4", "addr-5", "addr-6"]
    );
    assert_eq!(
        read_lines(&resumed),
        vec!["Address,Latitude,Longitude", "addr-4,4,-4", "addr-5,5,-5", "addr-6,6,-6"]
    );
}

#[tokio::test]
async fn test_from_row_one_processes_everything() {
    let fixture = Fixture::new(&numbered_input(2));
    let config = fixture.config().with_from_row(1);

    let summary = Pipeline::new(&config, numbered_geocoder(2))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.output_path, fixture.path("geocoded-from-row-1.csv"));
    assert_eq!(summary.records_skipped_before_start, 0);
    assert_eq!(summary.records_written, 2);
}

#[tokio::test]
async fn test_from_row_past_end_writes_header_only() {
    let fixture = Fixture::new(&numbered_input(2));
    let config = fixture.config().with_from_row(10);

    let summary = Pipeline::new(&config, numbered_geocoder(2))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.records_written, 0);
    assert_eq!(summary.records_skipped_before_start, 2);
    assert_eq!(
        read_lines(&summary.output_path),
        vec!["Address,Latitude,Longitude"]
    );
}

#[tokio::test]
async fn test_existing_output_is_appended_without_header() {
    let fixture = Fixture::new(&numbered_input(5));
    let resumed = fixture.path("geocoded-from-row-3.csv");
    fs::write(&resumed, "Address,Latitude,Longitude\naddr-3,3,-3\n").unwrap();

    let config = fixture.config().with_from_row(4);
    let prior = fixture.path("geocoded-from-row-4.csv");
    fs::write(&prior, "Address,Latitude,Longitude\naddr-4,4,-4\n").unwrap();

    let summary = Pipeline::new(&config, numbered_geocoder(5))
        .run()
        .await
        .unwrap();

    assert!(summary.appended_to_existing);
    assert_eq!(
        read_lines(&prior),
        vec![
            "Address,Latitude,Longitude",
            "addr-4,4,-4",
            "addr-4,4,-4",
            "addr-5,5,-5",
        ]
    );
    // Other resume files are untouched
    assert_eq!(read_lines(&resumed).len(), 2);
}

#[tokio::test]
async fn test_interrupted_run_concatenates_with_resume() {
    let fixture = Fixture::new(&numbered_input(8));

    // First run stops at the ceiling after five records
    let first_config = fixture.config().with_batch_size(2).with_max_records(5);
    let first = Pipeline::new(&first_config, numbered_geocoder(8))
        .run()
        .await
        .unwrap();
    assert_eq!(first.records_written, 5);
    let next = first.next_from_row().unwrap();
    assert_eq!(next, 6);

    let second_config = fixture.config().with_batch_size(2).with_from_row(next);
    let second = Pipeline::new(&second_config, numbered_geocoder(8))
        .run()
        .await
        .unwrap();
    assert_eq!(second.records_written, 3);

    // Dropping the second header, the two outputs form one complete dataset
    let mut combined = read_lines(&first.output_path);
    combined.extend(read_lines(&second.output_path).into_iter().skip(1));

    let complete = fixture.path("complete.csv");
    let complete_config = RunConfig::new(&fixture.input, &complete)
        .with_delay_ms(0)
        .with_log_dir(&fixture.log_dir);
    Pipeline::new(&complete_config, numbered_geocoder(8))
        .run()
        .await
        .unwrap();

    assert_eq!(combined, read_lines(&complete));
}
