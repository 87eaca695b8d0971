//! Process exit status mapping
//!
//! Internal codes are OS errnos or sysexits values. Only `1..128` survives as an
//! exit status: zero would read as success and anything from 128 up looks like a
//! signal termination to the shell.

use super::constants::{EXIT_GENERIC_FAILURE, EXIT_SIGNAL_BASE};

/// Clamp an internal failure code into a process exit status.
pub fn exit_code(code: i32) -> u8 {
    match u8::try_from(code) {
        Ok(status) if code > 0 && code < EXIT_SIGNAL_BASE => status,
        _ => EXIT_GENERIC_FAILURE,
    }
}
