//! Property: exit code contract
//!
//! Every `PageCheckError` maps to 1 or 2. Problems reaching the input or the
//! configuration exit 2; inputs that were checked and failed exit 1.

use pagecheck::{ConfigError, ElfError};
use pagecheck_cli::error::PageCheckError;
use proptest::prelude::*;
use std::path::PathBuf;

fn arb_error() -> impl Strategy<Value = (PageCheckError, u8)> {
    let arb_string = "[a-zA-Z0-9_ /\\-\\.]{0,64}";

    (0..=9u8, arb_string, 0..1000usize, any::<u64>()).prop_map(|(tag, s, count, n)| match tag {
        0 => (PageCheckError::InputNotFound { path: PathBuf::from(&s) }, 2),
        1 => (PageCheckError::InvalidExtension { path: PathBuf::from(&s) }, 2),
        2 => (PageCheckError::ConfigParseError(s), 2),
        3 => (PageCheckError::Config(ConfigError::InvalidPageSize(n)), 2),
        4 => (
            PageCheckError::NotCompliant {
                failing: count,
                total: count + 1,
            },
            1,
        ),
        5 => (PageCheckError::UnreadableArchive { reason: s }, 1),
        6 => (PageCheckError::ExternalCheckFailed { tool: s }, 1),
        7 => (PageCheckError::InvalidLibrary(ElfError::UnsupportedClass(n as u8)), 1),
        8 => (
            PageCheckError::MisalignedLibrary {
                path: PathBuf::from(&s),
                failing: count,
            },
            1,
        ),
        _ => (PageCheckError::Config(ConfigError::InvalidWorkerCount), 2),
    })
}

proptest! {
    #[test]
    fn exit_code_matches_category((err, expected) in arb_error()) {
        prop_assert_eq!(err.exit_code_num(), expected);
    }
}

#[test]
fn io_and_json_errors_are_infrastructure() {
    let io = PageCheckError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
    assert_eq!(io.exit_code_num(), 2);

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert_eq!(PageCheckError::Json(json_err).exit_code_num(), 2);
}
