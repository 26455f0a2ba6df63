use std::io;
use wisata_forecast::error::{ErrorKind, ForecastError};
use wisata_forecast::upload::UploadedTable;
use wisata_forecast::DatasetStore;
use wisata_math::MathError;

#[test]
fn test_error_conversion() {
    let forecast_error = ForecastError::from(io::Error::new(io::ErrorKind::NotFound, "file not found"));
    assert!(matches!(forecast_error, ForecastError::Io(_)));

    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let forecast_error = ForecastError::from(json_error);
    assert_eq!(forecast_error.kind(), ErrorKind::Validation);

    let forecast_error = ForecastError::from(MathError::CalculationError("singular".to_string()));
    assert_eq!(forecast_error.kind(), ErrorKind::Internal);
}

#[test]
fn test_error_display() {
    let error = ForecastError::Fit("did not converge".to_string());
    assert_eq!(error.to_string(), "Fit error: did not converge");

    let error = ForecastError::MissingColumn("Jumlah".to_string());
    assert_eq!(error.to_string(), "Missing column: Jumlah");
}

#[test]
fn test_statuses_for_user_errors() {
    let store = DatasetStore::new(wisata_forecast::MemoryRepository::new());
    let not_found = store.load_required().unwrap_err();
    assert_eq!(not_found.kind(), ErrorKind::NotFound);
    assert_eq!(not_found.kind().status_code(), 404);

    let missing = UploadedTable::from_bytes(b"Date\n2023-01\n").unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::MissingColumn);
    assert_eq!(missing.kind().status_code(), 400);

    assert_eq!(ErrorKind::Fit.status_code(), 500);
    assert_eq!(ErrorKind::Internal.exit_code(), 1);
}
