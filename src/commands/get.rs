use clap;
use std::io::Write;
use std::str::FromStr;
use log::error;
use super::{ItemType,CommandError};
use crate::img::{SectorTag,OpticalImage};
use crate::{STDRESULT,DYNERR};

fn output_get(start_addr: u64,object: &[u8]) -> STDRESULT {
    if atty::is(atty::Stream::Stdout) {
        crate::display_block(start_addr,object);
    } else {
        std::io::stdout().write_all(object)?;
    }
    Ok(())
}

fn parse_addr(s: &str) -> Result<u64,DYNERR> {
    match u64::from_str(s) {
        Ok(a) => Ok(a),
        Err(_) => {
            error!("address should be a decimal number");
            Err(Box::new(CommandError::OutOfRange))
        }
    }
}

fn get_optical(img_path: &str,typ: ItemType,item: &str) -> Result<(u64,Vec<u8>),DYNERR> {
    let mut disc = crate::create_optical_from_file(img_path)?;
    match typ {
        ItemType::Sector => {
            let addr = parse_addr(item)?;
            Ok((0,disc.read_sector(addr)?))
        },
        ItemType::LongSector => {
            let addr = parse_addr(item)?;
            Ok((0,disc.read_sector_long(addr)?))
        },
        ItemType::SectorTag(tag) => {
            let addr = parse_addr(item)?;
            Ok((0,disc.read_sector_tag(addr,tag)?))
        },
        ItemType::MediaTag(tag) => Ok((0,disc.read_media_tag(tag)?)),
        _ => {
            error!("optical images have no files");
            Err(Box::new(CommandError::UnsupportedItemType))
        }
    }
}

pub fn get(cmd: &clap::ArgMatches) -> STDRESULT {
    let item = cmd.get_one::<String>("file").expect("required by clap");
    let typ = ItemType::from_str(cmd.get_one::<String>("type").expect("required by clap"))?;
    let img_path = cmd.get_one::<String>("dimg").expect("required by clap");

    if super::is_optical(img_path) {
        let (start,object) = get_optical(img_path,typ,item)?;
        return output_get(start,&object);
    }

    match typ {
        ItemType::File => {
            let mut disk = crate::create_fs_from_file(img_path,super::mount_options(cmd))?;
            let dat = disk.read_file(item)?;
            output_get(0,&dat)
        },
        ItemType::Xattr => {
            let name = match cmd.get_one::<String>("xattr") {
                Some(n) => n,
                None => {
                    error!("xattr type requires --xattr");
                    return Err(Box::new(CommandError::InvalidCommand));
                }
            };
            let mut disk = crate::create_fs_from_file(img_path,super::mount_options(cmd))?;
            let dat = disk.get_xattr(item,name)?;
            output_get(0,&dat)
        },
        ItemType::Sector => {
            let addr = parse_addr(item)?;
            let mut img = crate::create_img_from_file(img_path)?;
            let dat = img.read_sector(addr)?;
            output_get(0,&dat)
        },
        ItemType::SectorTag(SectorTag::Apple) => {
            let addr = parse_addr(item)?;
            let mut img = crate::create_img_from_file(img_path)?;
            let dat = img.read_sector_tag(addr,SectorTag::Apple)?;
            output_get(0,&dat)
        },
        _ => {
            error!("item type requires an optical image");
            Err(Box::new(CommandError::UnsupportedItemType))
        }
    }
}
