use crate::fs::FileType;
use clap::{
    Arg, Command, Error,
    builder::{PossibleValue, TypedValueParser},
    error::{ContextKind, ContextValue, ErrorKind},
};
use core::ops::BitOr;
use std::ffi::OsStr;

/**
 Which kinds of entries a search yields.

 Filtering only decides what is yielded: directories are still descended when
 `DIRECTORIES` is not requested.

 ```
 use recls::EntryTypes;
 let both = EntryTypes::FILES | EntryTypes::DIRECTORIES;
 assert_eq!(both, EntryTypes::BOTH);
 assert!(both.contains(EntryTypes::FILES));
 assert!(!both.contains(EntryTypes::LINKS));
 ```
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryTypes(u8);

impl EntryTypes {
    /// Regular files
    pub const FILES: Self = Self(1);
    pub const DIRECTORIES: Self = Self(1 << 1);
    /// Symlinks, reported as links rather than as their targets
    pub const LINKS: Self = Self(1 << 2);
    /// Devices, pipes, sockets and anything the platform cannot classify
    pub const SPECIAL: Self = Self(1 << 3);
    pub const BOTH: Self = Self(Self::FILES.0 | Self::DIRECTORIES.0);
    pub const ALL: Self = Self(Self::BOTH.0 | Self::LINKS.0 | Self::SPECIAL.0);

    #[must_use]
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether an entry of this type should be yielded
    #[must_use]
    #[inline]
    pub const fn matches(self, file_type: FileType) -> bool {
        let wanted = match file_type {
            FileType::RegularFile => Self::FILES,
            FileType::Directory => Self::DIRECTORIES,
            FileType::Symlink => Self::LINKS,
            FileType::BlockDevice
            | FileType::CharDevice
            | FileType::Pipe
            | FileType::Socket
            | FileType::Unknown => Self::SPECIAL,
        };
        self.contains(wanted)
    }

    /**
     Parses a single type letter: `f`, `d`, `l`, `s` or `a` (all).

     # Errors
     Returns a message naming the character if it is not one of those.

     ```
     use recls::EntryTypes;
     assert_eq!(EntryTypes::from_char('d'), Ok(EntryTypes::DIRECTORIES));
     assert!(EntryTypes::from_char('z').is_err());
     ```
    */
    pub fn from_char(c: char) -> core::result::Result<Self, String> {
        match c {
            'f' => Ok(Self::FILES),
            'd' => Ok(Self::DIRECTORIES),
            'l' => Ok(Self::LINKS),
            's' => Ok(Self::SPECIAL),
            'a' => Ok(Self::ALL),
            _ => Err(format!(
                "Invalid entry type: '{c}'. See --help for valid types."
            )),
        }
    }
}

impl Default for EntryTypes {
    #[inline]
    fn default() -> Self {
        Self::FILES
    }
}

impl BitOr for EntryTypes {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Parses `--type` values on the command line, with completions
#[derive(Clone, Debug)]
pub struct EntryTypesParser;

impl TypedValueParser for EntryTypesParser {
    type Value = EntryTypes;

    fn parse_ref(
        &self,
        cmd: &Command,
        _arg: Option<&Arg>,
        value: &OsStr,
    ) -> Result<Self::Value, Error> {
        let value_str = value
            .to_str()
            .ok_or_else(|| Error::new(ErrorKind::InvalidUtf8).with_cmd(cmd))?;

        match value_str.to_lowercase().as_str() {
            "f" | "file" | "files" => Ok(EntryTypes::FILES),
            "d" | "dir" | "directory" | "directories" => Ok(EntryTypes::DIRECTORIES),
            "l" | "link" | "symlink" => Ok(EntryTypes::LINKS),
            "s" | "special" | "device" => Ok(EntryTypes::SPECIAL),
            "a" | "all" => Ok(EntryTypes::ALL),
            _ => {
                let mut error = Error::new(ErrorKind::InvalidValue).with_cmd(cmd);
                error.insert(
                    ContextKind::InvalidValue,
                    ContextValue::String(format!("invalid entry type: '{value_str}'")),
                );
                error.insert(
                    ContextKind::ValidValue,
                    ContextValue::Strings(vec![
                        "f, file".into(),
                        "d, dir, directory".into(),
                        "l, link, symlink".into(),
                        "s, special, device".into(),
                        "a, all".into(),
                    ]),
                );
                Err(error)
            }
        }
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue> + '_>> {
        Some(Box::new(
            [
                PossibleValue::new("f")
                    .aliases(["file", "files"])
                    .help("Regular file"),
                PossibleValue::new("d")
                    .aliases(["dir", "directory", "directories"])
                    .help("Directory"),
                PossibleValue::new("l")
                    .aliases(["link", "symlink"])
                    .help("Symbolic link"),
                PossibleValue::new("s")
                    .aliases(["special", "device"])
                    .help("Device, pipe or socket"),
                PossibleValue::new("a").aliases(["all"]).help("Everything"),
            ]
            .into_iter(),
        ))
    }
}
