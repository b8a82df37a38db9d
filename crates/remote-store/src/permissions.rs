//! Permission bits of a remote entry.
//!

use core::{fmt, str::FromStr};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Is a directory.
pub const MODE_DIRECTORY: u32 = 0o040_000;

/// Read permission for the owner.
pub const MODE_USER_READ: u32 = 0o400;
/// Write permission for the owner.
pub const MODE_USER_WRITE: u32 = 0o200;
/// Execute permission for the owner.
pub const MODE_USER_EXECUTE: u32 = 0o100;

/// Read permission for the group.
pub const MODE_GROUP_READ: u32 = 0o040;
/// Write permission for the group.
pub const MODE_GROUP_WRITE: u32 = 0o020;
/// Execute permission for the group.
pub const MODE_GROUP_EXECUTE: u32 = 0o010;

/// Read permission for others.
pub const MODE_OTHER_READ: u32 = 0o004;
/// Write permission for others.
pub const MODE_OTHER_WRITE: u32 = 0o002;
/// Execute permission for others.
pub const MODE_OTHER_EXECUTE: u32 = 0o001;

const MODE_MASK: u32 = MODE_DIRECTORY | 0o777;

// Symbolic positions after the type character, in `rwxrwxrwx` order.
const SYMBOLIC_BITS: [(u32, char); 9] = [
    (MODE_USER_READ, 'r'),
    (MODE_USER_WRITE, 'w'),
    (MODE_USER_EXECUTE, 'x'),
    (MODE_GROUP_READ, 'r'),
    (MODE_GROUP_WRITE, 'w'),
    (MODE_GROUP_EXECUTE, 'x'),
    (MODE_OTHER_READ, 'r'),
    (MODE_OTHER_WRITE, 'w'),
    (MODE_OTHER_EXECUTE, 'x'),
];

static SYMBOLIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([-d])([-r][-w][-x])([-r][-w][-x])([-r][-w][-x])\s*$")
        .expect("symbolic permission pattern is valid")
});
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*$").expect("decimal pattern is valid"));
static OCTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*0?o([0-7]+)\s*$").expect("octal pattern is valid"));
static HEXADECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*0?x([0-9a-f]+)\s*$").expect("hexadecimal pattern is valid")
});

/// The permission bits and directory flag of a remote entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Permissions {
    mode: u32,
}

impl Permissions {
    /// Creates permissions from raw mode bits. Bits other than the directory flag and
    /// `rwxrwxrwx` are discarded.
    pub fn from_mode(mode: u32) -> Self {
        Self {
            mode: mode & MODE_MASK,
        }
    }

    /// The mode bits.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// The mode bits rendered in octal, e.g. `0o40755`.
    pub fn to_octal(&self) -> String {
        format!("{:#o}", self.mode)
    }

    /// If the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.access(MODE_DIRECTORY)
    }

    /// If the entry is not a directory.
    pub fn is_file(&self) -> bool {
        !self.is_dir()
    }

    /// If any of the bits in `mode` are set.
    pub fn access(&self, mode: u32) -> bool {
        self.mode & mode != 0
    }

    #[allow(missing_docs)]
    pub fn user_has_read_access(&self) -> bool {
        self.access(MODE_USER_READ)
    }

    #[allow(missing_docs)]
    pub fn user_has_write_access(&self) -> bool {
        self.access(MODE_USER_WRITE)
    }

    #[allow(missing_docs)]
    pub fn user_has_exec_access(&self) -> bool {
        self.access(MODE_USER_EXECUTE)
    }

    #[allow(missing_docs)]
    pub fn group_has_read_access(&self) -> bool {
        self.access(MODE_GROUP_READ)
    }

    #[allow(missing_docs)]
    pub fn group_has_write_access(&self) -> bool {
        self.access(MODE_GROUP_WRITE)
    }

    #[allow(missing_docs)]
    pub fn group_has_exec_access(&self) -> bool {
        self.access(MODE_GROUP_EXECUTE)
    }

    #[allow(missing_docs)]
    pub fn other_has_read_access(&self) -> bool {
        self.access(MODE_OTHER_READ)
    }

    #[allow(missing_docs)]
    pub fn other_has_write_access(&self) -> bool {
        self.access(MODE_OTHER_WRITE)
    }

    #[allow(missing_docs)]
    pub fn other_has_exec_access(&self) -> bool {
        self.access(MODE_OTHER_EXECUTE)
    }

    fn parse_symbolic(value: &str) -> Option<u32> {
        let captures = SYMBOLIC.captures(value)?;

        let mut mode = 0;
        if captures.get(1).is_some_and(|kind| kind.as_str() != "-") {
            mode |= MODE_DIRECTORY;
        }

        let flags = (2..=4)
            .filter_map(|group| captures.get(group))
            .flat_map(|triple| triple.as_str().chars());
        for (flag, (bit, _)) in flags.zip(SYMBOLIC_BITS) {
            if flag != '-' {
                mode |= bit;
            }
        }

        Some(mode)
    }

    fn parse_radix(pattern: &Regex, value: &str, radix: u32) -> Option<Result<u32, PermissionsError>> {
        let digits = pattern.captures(value)?.get(1)?.as_str();

        Some(
            u32::from_str_radix(digits, radix)
                .map_err(|_| PermissionsError::OutOfRange(value.to_string())),
        )
    }
}

impl FromStr for Permissions {
    type Err = PermissionsError;

    /// Parses symbolic (`drwxr-xr-x`), decimal, octal (`0o755`, `o755`) or hexadecimal
    /// (`0x1ed`) permissions. The first encoding that matches wins, in that order.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(mode) = Self::parse_symbolic(value) {
            return Ok(Self::from_mode(mode));
        }

        let numeric = [(&*DECIMAL, 10), (&*OCTAL, 8), (&*HEXADECIMAL, 16)];
        for (pattern, radix) in numeric {
            if let Some(mode) = Self::parse_radix(pattern, value, radix) {
                return mode.map(Self::from_mode);
            }
        }

        Err(PermissionsError::Unrecognised(value.to_string()))
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() { 'd' } else { '-' };
        write!(f, "{kind}")?;

        for (bit, flag) in SYMBOLIC_BITS {
            let flag = if self.access(bit) { flag } else { '-' };
            write!(f, "{flag}")?;
        }

        Ok(())
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionsError {
    #[error("Invalid permission '{0}'")]
    Unrecognised(String),

    #[error("Permission '{0}' does not fit in 32 bits")]
    OutOfRange(String),
}
