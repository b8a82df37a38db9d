#![allow(missing_docs)]

use shared::{Failure, test::init_test_logger};

#[test]
fn ok_passes_through() {
    let _logger = init_test_logger();

    let value = Ok::<_, String>(7).or_log_and_panic("Could not read config");
    assert_eq!(value, 7);
}

#[test]
#[should_panic(expected = "Could not write config: disk full")]
fn error_panics_with_message() {
    let _logger = init_test_logger();

    Err::<(), _>("disk full").or_log_and_panic("Could not write config");
}
