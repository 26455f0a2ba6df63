use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};
use wisata_forecast::data::{CsvRepository, DatasetStore, Record, SeriesRepository};
use wisata_forecast::error::ForecastError;
use wisata_forecast::period::YearMonth;

fn ym(s: &str) -> YearMonth {
    YearMonth::parse(s).unwrap()
}

// Helper: the three-month dataset used across scenarios
fn create_sample_dataset() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Jumlah").unwrap();
    writeln!(file, "2023-01,100").unwrap();
    writeln!(file, "2023-02,110").unwrap();
    writeln!(file, "2023-03,105").unwrap();
    file
}

#[test]
fn test_add_appends_grouped_value() {
    let file = create_sample_dataset();
    let store = DatasetStore::open(file.path());

    let series = store.add("2023-04", "1.200").unwrap();

    assert_eq!(series.len(), 4);
    assert_eq!(series.records()[3], Record::new(ym("2023-04"), 1200));
    assert_eq!(store.load().unwrap(), series);
}

#[test]
fn test_duplicate_add_is_conflict_and_file_unchanged() {
    let file = create_sample_dataset();
    let before = fs::read_to_string(file.path()).unwrap();
    let store = DatasetStore::open(file.path());

    let err = store.add("2023-02", "50").unwrap_err();

    assert!(matches!(err, ForecastError::Conflict { ref period } if period == "2023-02"));
    assert_eq!(fs::read_to_string(file.path()).unwrap(), before);
}

#[test]
fn test_delete_second_position() {
    let file = create_sample_dataset();
    let store = DatasetStore::open(file.path());
    store.add("2023-04", "1.200").unwrap();

    let series = store.delete_at("2").unwrap();

    let periods: Vec<String> = series.periods().iter().map(|p| p.to_string()).collect();
    assert_eq!(periods, vec!["2023-01", "2023-03", "2023-04"]);
    assert_eq!(store.load().unwrap().len(), 3);
}

#[test]
fn test_delete_out_of_range() {
    let file = create_sample_dataset();
    let store = DatasetStore::open(file.path());

    for position in ["0", "4", "-1"] {
        let err = store.delete_at(position).unwrap_err();
        assert!(matches!(err, ForecastError::Range { len: 3, .. }));
    }
    assert!(matches!(
        store.delete_at("two"),
        Err(ForecastError::Validation(_))
    ));
}

#[test]
fn test_add_validation_errors() {
    let file = create_sample_dataset();
    let store = DatasetStore::open(file.path());

    for (period, value) in [
        ("", "10"),
        ("2023-05", "  "),
        ("2023/05", "10"),
        ("2023-13", "10"),
        ("2023-05", "ten"),
        ("2023-05", "-4"),
    ] {
        let err = store.add(period, value).unwrap_err();
        assert!(
            matches!(err, ForecastError::Validation(_)),
            "({period}, {value}) gave {err:?}"
        );
    }
    assert_eq!(store.load().unwrap().len(), 3);
}

#[test]
fn test_missing_file_behaviour() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("wisatawan.csv");
    let store = DatasetStore::open(&path);

    assert!(store.load().unwrap().is_empty());
    assert!(matches!(
        store.load_required(),
        Err(ForecastError::NotFound(_))
    ));
    assert!(matches!(
        store.delete_at("1"),
        Err(ForecastError::Range { position: 1, len: 0 })
    ));

    // First add creates the file and its directory
    store.add("2024-01", "7").unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "Date,Jumlah\n2024-01,7\n");
}

#[test]
fn test_reader_sorts_and_trims() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Jumlah").unwrap();
    writeln!(file, " 2023-03 , 30").unwrap();
    writeln!(file, "2023-01,10 ").unwrap();

    let series = CsvRepository::new(file.path()).read().unwrap().unwrap();
    assert_eq!(series.first_period(), Some(ym("2023-01")));
    assert_eq!(series.values(), vec![10.0, 30.0]);
}

#[test]
fn test_reader_reports_bad_line() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Jumlah").unwrap();
    writeln!(file, "2023-01,10").unwrap();
    writeln!(file, "January,20").unwrap();

    let err = CsvRepository::new(file.path()).read().unwrap_err();
    assert!(matches!(err, ForecastError::Validation(ref msg) if msg.contains("line 3")));
}

#[test]
fn test_written_file_is_sorted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.csv");
    let store = DatasetStore::open(&path);

    store.add("2023-03", "3").unwrap();
    store.add("2023-01", "1").unwrap();
    store.add("2023-02", "2").unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "Date,Jumlah\n2023-01,1\n2023-02,2\n2023-03,3\n");
    // No temp files left beside the dataset
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_concurrent_adds_are_serialized() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    const WRITERS: u32 = 8;
    let dir = tempdir().unwrap();
    let store = DatasetStore::open(dir.path().join("data.csv"));
    let done = AtomicBool::new(false);

    let snapshots = thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut seen = Vec::new();
            while !done.load(Ordering::Acquire) {
                seen.push(store.load());
            }
            seen
        });

        let writers: Vec<_> = (1..=WRITERS)
            .map(|month| {
                let store = &store;
                scope.spawn(move || {
                    store
                        .add(&format!("2023-{:02}", month), &(month * 10).to_string())
                        .unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);
        reader.join().unwrap()
    });

    let series = store.load().unwrap();
    assert_eq!(series.len(), WRITERS as usize);
    series.check_invariant().unwrap();
    assert_eq!(series.first_period(), Some(ym("2023-01")));
    assert_eq!(series.last_period(), Some(ym("2023-08")));

    // Every snapshot a reader saw is a whole, sorted dataset
    let mut previous = 0;
    for snapshot in snapshots {
        let snapshot = snapshot.unwrap();
        snapshot.check_invariant().unwrap();
        assert!(snapshot.len() >= previous);
        assert!(snapshot.len() <= WRITERS as usize);
        previous = snapshot.len();
    }
}
