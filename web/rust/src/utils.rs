// The panic hook set-up is derived from
// https://github.com/rustwasm/wasm-pack-template/blob/a3acfd295f0a10f2ddb6eebf6db10e057369df6a/src/utils.rs

use conv::{ConvUtil, RoundToZero};
use tracing::Level;

pub(crate) fn set_panic_hook() {
    // With the `console_error_panic_hook` feature, panics are reported
    // with `console.error` instead of as an opaque "unreachable".
    //
    // For more details see
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

pub(crate) fn try_log_level_from_str(log_level: &str) -> Result<Level, String> {
    match log_level {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        invalid => Err(format!("invalid log level '{invalid}'")),
    }
}

/// Converts a timestamp supplied by JavaScript (which has only
/// doubles) to a whole number.  Negative and non-finite values
/// become zero.
pub(crate) fn whole_units_from_js(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    value
        .approx_as_by::<u64, RoundToZero>()
        .unwrap_or(u64::MAX)
}

#[test]
fn test_log_levels() {
    assert_eq!(try_log_level_from_str("warn"), Ok(Level::WARN));
    assert_eq!(try_log_level_from_str("trace"), Ok(Level::TRACE));
    assert!(try_log_level_from_str("loud").is_err());
}

#[test]
fn test_whole_units_from_js() {
    assert_eq!(whole_units_from_js(16.9), 16);
    assert_eq!(whole_units_from_js(-3.0), 0);
    assert_eq!(whole_units_from_js(f64::NAN), 0);
    assert_eq!(whole_units_from_js(f64::INFINITY), u64::MAX);
    assert_eq!(whole_units_from_js(1_700_000_000.5), 1_700_000_000);
}
