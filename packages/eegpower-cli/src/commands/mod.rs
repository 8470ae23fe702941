pub mod bands;
pub mod info;
pub mod run;
pub mod validate;

use crate::exit_codes;
use eegpower_rs::EegError;

/// Report `err` on stderr and map it to an exit code.
pub fn fail(err: &EegError) -> i32 {
    eprintln!("Error: {}", err);
    match err {
        EegError::FileNotFound(_)
        | EegError::UnsupportedFormat(_)
        | EegError::InvalidParameter(_)
        | EegError::ConfigError(_) => exit_codes::INPUT_ERROR,
        _ => exit_codes::EXECUTION_ERROR,
    }
}
