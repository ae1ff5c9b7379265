use sift_core::errors::*;

#[test]
fn http_auth_failures_are_configuration_errors() {
    for status in [401u16, 403] {
        let err = EmbeddingError::HttpStatus {
            provider: "openai".into(),
            status,
            body: "denied".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}

#[test]
fn throttling_and_server_errors_are_transient() {
    for status in [429u16, 500, 503] {
        let err = EmbeddingError::HttpStatus {
            provider: "gemini".into(),
            status,
            body: String::new(),
        };
        assert_eq!(err.kind(), ErrorKind::Transient);
    }
}

#[test]
fn shape_errors_are_contract_violations() {
    let err = EmbeddingError::BatchLengthMismatch {
        expected: 4,
        actual: 3,
    };
    assert_eq!(err.kind(), ErrorKind::Contract);
    assert!(err.to_string().contains("sent 4 inputs, got 3"));
}

#[test]
fn subsystem_errors_convert_into_sift_error() {
    let err: SiftError = StorageError::SqliteError {
        message: "disk full".into(),
    }
    .into();
    assert!(matches!(err, SiftError::Storage(_)));
    assert_eq!(err.to_string(), "SQLite error: disk full");

    let err: SiftError = EmbeddingError::MissingCredential {
        backend: "openai".into(),
    }
    .into();
    assert!(matches!(err, SiftError::Embedding(ref e) if e.is_configuration()));
}
