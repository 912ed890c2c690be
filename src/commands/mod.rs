//! # CLI Subcommands
//!
//! Contains modules that run the subcommands.

pub mod stat;
pub mod get;
pub mod optical;
pub mod completions;

use std::str::FromStr;
use crate::img::{SectorTag,MediaTag};
use crate::fs::lisa::MountOptions;

#[derive(thiserror::Error,Debug)]
pub enum CommandError {
    #[error("Item type is not yet supported")]
    UnsupportedItemType,
    #[error("Item type is unknown")]
    UnknownItemType,
    #[error("Command could not be interpreted")]
    InvalidCommand,
    #[error("One of the parameters was out of range")]
    OutOfRange,
    #[error("Input source is not supported")]
    UnsupportedFormat,
    #[error("Input source could not be interpreted")]
    UnknownFormat
}

/// Types of items that can be extracted with `get`
#[derive(PartialEq,Clone,Copy,Debug)]
pub enum ItemType {
    File,
    Xattr,
    /// user data of a sector
    Sector,
    /// full 2352 byte optical sector
    LongSector,
    SectorTag(SectorTag),
    MediaTag(MediaTag)
}

impl FromStr for ItemType {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "xattr" => Ok(Self::Xattr),
            "sec" => Ok(Self::Sector),
            "long" => Ok(Self::LongSector),
            _ => {
                if let Ok(tag) = SectorTag::from_str(s) {
                    return Ok(Self::SectorTag(tag));
                }
                if let Ok(tag) = MediaTag::from_str(s) {
                    return Ok(Self::MediaTag(tag));
                }
                Err(CommandError::UnknownItemType)
            }
        }
    }
}

/// Mount options from the `--sys` flag, if the subcommand has it
pub fn mount_options(cmd: &clap::ArgMatches) -> MountOptions {
    let expose_system_files = match cmd.try_get_one::<bool>("sys") {
        Ok(Some(flag)) => *flag,
        _ => false
    };
    MountOptions { expose_system_files }
}

/// Is the path an optical descriptor, judging by the extension
pub fn is_optical(path: &str) -> bool {
    let ext = match std::path::Path::new(path).extension() {
        Some(x) => x.to_string_lossy().to_lowercase(),
        None => return false
    };
    crate::img::cdrdao::file_extensions().contains(&ext) || crate::img::clonecd::file_extensions().contains(&ext)
}

#[test]
fn item_types() {
    assert_eq!(ItemType::from_str("edc").expect("bad type"),ItemType::SectorTag(SectorTag::Edc));
    assert_eq!(ItemType::from_str("fulltoc").expect("bad type"),ItemType::MediaTag(MediaTag::FullToc));
    assert_eq!(ItemType::from_str("long").expect("bad type"),ItemType::LongSector);
    assert!(ItemType::from_str("atok").is_err());
}
