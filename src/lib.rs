//! # `arckit` main library
//!
//! This library reads disk images from archives of Apple Lisa software and of optical discs.
//! Manipulations can be done at a level as low as the raw sector with its sync, header, and
//! error correction fields, or as high as the files of a Lisa volume.
//!
//! ## Architecture
//!
//! Disk image operations are built around three trait objects:
//! * `img::DiskImage` is a tagged-sector device, does not try to interpret a file system
//! * `img::OpticalImage` is a disc described by a cue sheet, with tracks, sessions, and tags
//! * `fs::DiskFS` imposes a (read-only) file system on a `DiskImage`
//!
//! When a `DiskFS` object is created it takes ownership of some `DiskImage`.
//! Optical images can be copied into a `img::WritableOpticalImage`, which is how conversion
//! between descriptor formats works.
//!
//! ## File Systems
//!
//! * Lisa Office System file system, versions 1, 2, and 3
//!
//! ## Disk Images
//!
//! * DiskCopy 4.2 (Lisa and Macintosh floppies, hard disk dumps with tags)
//! * CDRDAO TOC descriptor with `.bin` data files
//! * CloneCD descriptor with `.img` and `.sub` files

pub mod fs;
pub mod img;
pub mod commands;

use std::fmt::Write;
use std::path::Path;
use log::{debug,info,error};
use img::{DiskImage,OpticalImage,WritableOpticalImage,MediaType};
use fs::DiskFS;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const KNOWN_FILE_EXTENSIONS: &str = "dc42,image,dsk,toc,ccd";

fn extension(path: &str) -> String {
    match Path::new(path).extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => "".to_string()
    }
}

/// Given a bytestream return a tagged-sector image, or Err if the bytestream cannot be interpreted.
/// Optional `maybe_ext` restricts the image types that will be tried based on file extension.
pub fn create_img_from_bytestream(disk_img_data: &[u8],maybe_ext: Option<&str>) -> Result<Box<dyn DiskImage>,DYNERR> {
    let ext = match maybe_ext {
        Some(x) => x.to_lowercase(),
        None => "".to_string()
    };
    if img::dc42::file_extensions().contains(&ext) || ext=="" {
        if img::dc42::Dc42::test_img(disk_img_data) {
            info!("identified DiskCopy 4.2 image");
            return Ok(Box::new(img::dc42::Dc42::from_bytes(disk_img_data)?));
        }
    }
    error!("cannot match any image format among {}",KNOWN_FILE_EXTENSIONS);
    Err(Box::new(img::Error::ImageTypeMismatch))
}

/// Calls `create_img_from_bytestream` getting the bytes from a file.
/// The pathname must already be in the right format for the file system.
pub fn create_img_from_file(img_path: &str) -> Result<Box<dyn DiskImage>,DYNERR> {
    let buf = std::fs::read(img_path)?;
    let ext = extension(img_path);
    match create_img_from_bytestream(&buf,Some(&ext)) {
        Ok(img) => Ok(img),
        // extension may be misleading, try everything
        Err(_) => create_img_from_bytestream(&buf,None)
    }
}

/// Return the mounted file system on a disk image, or Err if one cannot be found.
/// If found, the file system takes ownership of the disk image.
pub fn create_fs_from_img(mut img: Box<dyn DiskImage>,opt: fs::lisa::MountOptions) -> Result<Box<dyn DiskFS>,DYNERR> {
    if fs::lisa::Disk::test_img(&mut img) {
        info!("identified Lisa file system");
        let mut disk = fs::lisa::Disk::from_img(img,opt);
        disk.mount()?;
        return Ok(Box::new(disk));
    }
    error!("cannot find a file system");
    Err(Box::new(img::Error::ImageTypeMismatch))
}

/// Calls `create_fs_from_img` with the image from `create_img_from_file`
pub fn create_fs_from_file(img_path: &str,opt: fs::lisa::MountOptions) -> Result<Box<dyn DiskFS>,DYNERR> {
    let img = create_img_from_file(img_path)?;
    create_fs_from_img(img,opt)
}

/// Open an optical image from its descriptor, the data files are sought in the same directory.
/// The extension is tried first, then the descriptor content.
pub fn create_optical_from_file(img_path: &str) -> Result<Box<dyn OpticalImage>,DYNERR> {
    let ext = extension(img_path);
    if img::cdrdao::file_extensions().contains(&ext) {
        return Ok(Box::new(img::cdrdao::CdrdaoImage::open_file(img_path)?));
    }
    if img::clonecd::file_extensions().contains(&ext) {
        return Ok(Box::new(img::clonecd::CloneCdImage::open_file(img_path)?));
    }
    let buf = std::fs::read(img_path)?;
    if img::cdrdao::parse::identify(&buf) {
        info!("identified CDRDAO descriptor");
        return Ok(Box::new(img::cdrdao::CdrdaoImage::open_file(img_path)?));
    }
    if img::clonecd::parse::identify(&buf) {
        info!("identified CloneCD descriptor");
        return Ok(Box::new(img::clonecd::CloneCdImage::open_file(img_path)?));
    }
    error!("cannot match any optical descriptor among {}",KNOWN_FILE_EXTENSIONS);
    Err(Box::new(img::Error::ImageTypeMismatch))
}

/// Create a writer for a new optical image, `typ` is `toc` or `ccd`
pub fn create_optical_writer(img_path: &str,typ: &str,media: MediaType,separate_tracks: bool) -> Result<Box<dyn WritableOpticalImage>,DYNERR> {
    debug!("creating {} writer for {}",typ,img_path);
    match typ {
        "toc" => Ok(Box::new(img::cdrdao::Writer::create(img_path,media,separate_tracks)?)),
        "ccd" => Ok(Box::new(img::clonecd::Writer::create(img_path)?)),
        _ => Err(Box::new(img::Error::NotSupported))
    }
}

/// Display binary to stdout in columns of hex and ascii
pub fn display_block(start_addr: u64,block: &[u8]) {
    let mut slice_start = 0;
    loop {
        let row_label = start_addr as usize + slice_start;
        let mut slice_end = slice_start + 16;
        if slice_end > block.len() {
            slice_end = block.len();
        }
        let slice = &block[slice_start..slice_end];
        let txt: Vec<u8> = slice.iter().map(|c| match *c {
            x if x<32 => '.' as u8,
            x if x<127 => x,
            _ => '.' as u8
        }).collect();
        print!("{:06X} : ",row_label);
        for byte in slice {
            print!("{:02X} ",byte);
        }
        for _blank in slice_end..slice_start+16 {
            print!("   ");
        }
        println!("| {}",String::from_utf8_lossy(&txt));
        slice_start += 16;
        if slice_end>=block.len() {
            break;
        }
    }
}

/// This takes any bytes and makes an ascii friendly string
/// by using hex escapes, e.g., `\xFF`.
/// if `escape_cc` is true, ascii control characters are also escaped.
/// This is intended for names found in directories and headers.
pub fn escaped_ascii_from_bytes(bytes: &[u8],escape_cc: bool) -> String {
    let mut result = String::new();
    let (lb,ub) = match escape_cc {
        true => (0x20,0x7e),
        false => (0x00,0x7f)
    };
    for b in bytes {
        if *b>=lb && *b<=ub {
            result.push(*b as char);
        } else {
            // writing to a String cannot fail
            let _ = write!(&mut result,"\\x{:02X}",b);
        }
    }
    result
}

#[test]
fn escapes() {
    assert_eq!(escaped_ascii_from_bytes(b"AB\x01\xff",true),"AB\\x01\\xFF");
    assert_eq!(escaped_ascii_from_bytes(b"AB\x01",false),"AB\x01");
}
