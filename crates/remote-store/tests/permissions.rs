//! Tests for permissions
//!

use remote_store::{Permissions, PermissionsError};

#[test]
fn symbolic_directory() {
    let permissions: Permissions = "drwxr-xr-x".parse().unwrap();

    assert!(permissions.is_dir());
    assert_eq!(permissions.mode(), 0o40755);
    assert_eq!(permissions.to_octal(), "0o40755");
    assert_eq!(permissions.to_string(), "drwxr-xr-x");
}

#[test]
fn symbolic_file() {
    let permissions: Permissions = "-rw-r-----".parse().unwrap();

    assert!(permissions.is_file());
    assert!(permissions.user_has_read_access());
    assert!(permissions.user_has_write_access());
    assert!(!permissions.user_has_exec_access());
    assert!(permissions.group_has_read_access());
    assert!(!permissions.group_has_write_access());
    assert!(!permissions.other_has_read_access());
    assert_eq!(permissions.mode(), 0o640);
}

#[test]
fn decimal() {
    let permissions: Permissions = "493".parse().unwrap();
    assert_eq!(permissions.mode(), 0o755);
}

#[test]
fn octal() {
    let with_zero: Permissions = "0o755".parse().unwrap();
    let without_zero: Permissions = "o644".parse().unwrap();

    assert_eq!(with_zero.mode(), 0o755);
    assert_eq!(without_zero.mode(), 0o644);
}

#[test]
fn hexadecimal() {
    let permissions: Permissions = "0x1ed".parse().unwrap();
    assert_eq!(permissions.mode(), 0o755);
}

#[test]
fn octal_round_trips_to_symbolic() {
    let symbolic: Permissions = "drwxr-xr-x".parse().unwrap();
    let octal: Permissions = symbolic.to_octal().parse().unwrap();

    assert_eq!(octal, symbolic);
    assert_eq!(octal.to_string(), "drwxr-xr-x");
}

#[test]
fn every_bit_set() {
    let permissions = Permissions::from_mode(0o777);

    assert!(permissions.other_has_write_access());
    assert!(permissions.other_has_exec_access());
    assert!(permissions.group_has_exec_access());
    assert_eq!(permissions.to_string(), "-rwxrwxrwx");
}

#[test]
fn unknown_bits_are_discarded() {
    let permissions = Permissions::from_mode(0o104_755);
    assert_eq!(permissions.mode(), 0o755);
}

#[test]
fn unrecognised() {
    let error = "rwx".parse::<Permissions>().unwrap_err();
    assert_eq!(error, PermissionsError::Unrecognised("rwx".to_string()));

    assert!("lrwxrwxrwx".parse::<Permissions>().is_err());
    assert!("0o789".parse::<Permissions>().is_err());
}

#[test]
fn out_of_range() {
    let error = "99999999999".parse::<Permissions>().unwrap_err();
    assert!(matches!(error, PermissionsError::OutOfRange(_)));
}
