//! # Disk Image Module
//!
//! Disk images are represented by objects implementing one of two traits.
//!
//! * `DiskImage` is a tagged-sector device, i.e., fixed size sectors that may carry
//!   out-of-band tag bytes.  This is what the Lisa file system runs on.  The only
//!   implementation is the DiskCopy 4.2 image in `dc42`.
//! * `OpticalImage` is a disc described by a cue sheet, with tracks of heterogeneous
//!   sector formats.  Implementations are in `cdrdao` and `clonecd`, sharing the
//!   machinery in `cd`.  Writable images also implement `WritableOpticalImage`.
//!
//! ## Addressing
//!
//! Optical sector addresses are absolute (LBA 0 is the first sector after the 2 second
//! lead-in).  Every read has a global form and an `_in_track` form.  The global form
//! finds the owning track using the offset map and passes along a track relative address.
//!
//! ## Tags
//!
//! A sector tag is a sub-region of a sector or its out-of-band data, e.g., the EDC or
//! the subchannel.  `TrackFlags` and `TrackIsrc` are per track, their address is
//! interpreted as a track number.

pub mod dc42;
pub mod cd;
pub mod cdrdao;
pub mod clonecd;

use std::fmt;
use std::str::FromStr;
use log::debug;
use crate::{STDRESULT,DYNERR};
use cd::layout::DiscLayout;

/// Enumerates disk image errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("item not found")]
    NotFound,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("not supported by this image or mode")]
    NotSupported,
    #[error("access denied")]
    AccessDenied,
    #[error("address or length out of range")]
    OutOfRange,
    #[error("no data available")]
    NoData,
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("line {line}: {msg}")]
    Parse { line: usize, msg: String },
    #[error("tracks are out of order")]
    UnorderedTracks,
    #[error("image is not open for writing")]
    NotWritable,
    #[error("image type not compatible with request")]
    ImageTypeMismatch,
    #[error("unexpected I/O failure: {0}")]
    Unexpected(#[from] std::io::Error)
}

/// Sector sub-regions or out-of-band data that can be requested separately
#[derive(PartialEq,Eq,Clone,Copy,Debug,Hash)]
pub enum SectorTag {
    /// Lisa/Macintosh tag bytes (12, 20, or 24 bytes)
    Apple,
    Sync,
    Header,
    SubHeader,
    /// P and Q parity together
    Ecc,
    EccP,
    EccQ,
    Edc,
    /// 96 bytes interleaved
    Subchannel,
    /// control nibble of the track, one byte
    TrackFlags,
    TrackIsrc
}

/// Items that belong to the medium as a whole
#[derive(PartialEq,Eq,Clone,Copy,Debug,Hash)]
pub enum MediaTag {
    /// media catalog number (UPC/EAN)
    Mcn,
    /// binary full TOC as returned by READ TOC format 2
    FullToc,
    /// raw CD-Text packs
    CdText
}

#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum MediaType {
    Unknown,
    AppleSony400,
    AppleSony800,
    AppleFileWare,
    AppleProfile,
    AppleWidget,
    Cd,
    CdDa,
    CdRom,
    CdRomXa,
    CdI
}

#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum DiskImageType {
    DC42,
    CDRDAO,
    CloneCD
}

/// Summary of an opened image
#[derive(Clone,Debug)]
pub struct ImageInfo {
    pub image_type: DiskImageType,
    pub media_type: MediaType,
    pub sectors: u64,
    pub sector_size: usize,
    pub image_size: u64,
    pub application: Option<String>,
    pub comments: Option<String>,
    pub created: Option<chrono::NaiveDateTime>,
    pub modified: Option<chrono::NaiveDateTime>,
    pub readable_sector_tags: Vec<SectorTag>,
    pub readable_media_tags: Vec<MediaTag>
}

impl fmt::Display for SectorTag {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apple => write!(f,"tag"),
            Self::Sync => write!(f,"sync"),
            Self::Header => write!(f,"header"),
            Self::SubHeader => write!(f,"subheader"),
            Self::Ecc => write!(f,"ecc"),
            Self::EccP => write!(f,"eccp"),
            Self::EccQ => write!(f,"eccq"),
            Self::Edc => write!(f,"edc"),
            Self::Subchannel => write!(f,"sub"),
            Self::TrackFlags => write!(f,"flags"),
            Self::TrackIsrc => write!(f,"isrc")
        }
    }
}

impl FromStr for SectorTag {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "tag" => Ok(Self::Apple),
            "sync" => Ok(Self::Sync),
            "header" => Ok(Self::Header),
            "subheader" => Ok(Self::SubHeader),
            "ecc" => Ok(Self::Ecc),
            "eccp" => Ok(Self::EccP),
            "eccq" => Ok(Self::EccQ),
            "edc" => Ok(Self::Edc),
            "sub" => Ok(Self::Subchannel),
            "flags" => Ok(Self::TrackFlags),
            "isrc" => Ok(Self::TrackIsrc),
            _ => Err(Error::InvalidArgument)
        }
    }
}

impl FromStr for MediaTag {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "mcn" => Ok(Self::Mcn),
            "fulltoc" => Ok(Self::FullToc),
            "cdtext" => Ok(Self::CdText),
            _ => Err(Error::InvalidArgument)
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f,"unknown"),
            Self::AppleSony400 => write!(f,"Apple 3.5 inch 400K"),
            Self::AppleSony800 => write!(f,"Apple 3.5 inch 800K"),
            Self::AppleFileWare => write!(f,"Apple FileWare (Twiggy)"),
            Self::AppleProfile => write!(f,"Apple ProFile"),
            Self::AppleWidget => write!(f,"Apple Widget"),
            Self::Cd => write!(f,"CD"),
            Self::CdDa => write!(f,"CD-DA"),
            Self::CdRom => write!(f,"CD-ROM"),
            Self::CdRomXa => write!(f,"CD-ROM XA"),
            Self::CdI => write!(f,"CD-i")
        }
    }
}

impl fmt::Display for DiskImageType {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DC42 => write!(f,"dc42"),
            Self::CDRDAO => write!(f,"toc"),
            Self::CloneCD => write!(f,"ccd")
        }
    }
}

/// Tagged-sector device, the storage for `fs::DiskFS`.
/// Reading can mutate the object because the image may be keeping
/// track of stream positions or caches.
pub trait DiskImage {
    fn what_am_i(&self) -> DiskImageType;
    fn file_extensions(&self) -> Vec<String>;
    fn media_type(&self) -> MediaType;
    fn sector_count(&self) -> u64;
    /// size of the user data in one sector
    fn sector_size(&self) -> usize;
    fn readable_sector_tags(&self) -> Vec<SectorTag>;
    fn read_sector(&mut self,addr: u64) -> Result<Vec<u8>,DYNERR> {
        self.read_sectors(addr,1)
    }
    fn read_sectors(&mut self,addr: u64,count: u32) -> Result<Vec<u8>,DYNERR>;
    fn read_sector_tag(&mut self,addr: u64,tag: SectorTag) -> Result<Vec<u8>,DYNERR> {
        self.read_sectors_tag(addr,1,tag)
    }
    fn read_sectors_tag(&mut self,addr: u64,count: u32,tag: SectorTag) -> Result<Vec<u8>,DYNERR>;
    /// Serialize the image exactly as it would be stored
    fn to_bytes(&mut self) -> Vec<u8>;
}

/// Read access to a cue sheet driven optical image.
/// Implementations supply the layout and the per-track readers, the
/// global forms are provided.
pub trait OpticalImage {
    fn info(&self) -> &ImageInfo;
    fn layout(&self) -> &DiscLayout;
    fn read_media_tag(&mut self,tag: MediaTag) -> Result<Vec<u8>,DYNERR>;
    /// user data of `count` sectors starting at `addr` relative to the track
    fn read_sectors_in_track(&mut self,addr: u64,count: u32,track: u32) -> Result<Vec<u8>,DYNERR>;
    fn read_sectors_tag_in_track(&mut self,addr: u64,count: u32,track: u32,tag: SectorTag) -> Result<Vec<u8>,DYNERR>;
    /// full 2352 byte sectors
    fn read_sectors_long_in_track(&mut self,addr: u64,count: u32,track: u32) -> Result<Vec<u8>,DYNERR>;

    fn tracks(&self) -> &[cd::Track] {
        self.layout().tracks()
    }
    fn sessions(&self) -> &[cd::Session] {
        self.layout().sessions()
    }
    fn partitions(&self) -> &[cd::Partition] {
        self.layout().partitions()
    }
    fn read_sector(&mut self,addr: u64) -> Result<Vec<u8>,DYNERR> {
        self.read_sectors(addr,1)
    }
    fn read_sectors(&mut self,addr: u64,count: u32) -> Result<Vec<u8>,DYNERR> {
        let (track,rel) = self.layout().locate(addr)?;
        self.read_sectors_in_track(rel,count,track)
    }
    fn read_sector_tag(&mut self,addr: u64,tag: SectorTag) -> Result<Vec<u8>,DYNERR> {
        self.read_sectors_tag(addr,1,tag)
    }
    fn read_sectors_tag(&mut self,addr: u64,count: u32,tag: SectorTag) -> Result<Vec<u8>,DYNERR> {
        if tag==SectorTag::TrackFlags || tag==SectorTag::TrackIsrc {
            let track = u32::try_from(addr).map_err(|_| Error::NotFound)?;
            return self.read_sectors_tag_in_track(0,1,track,tag);
        }
        let (track,rel) = self.layout().locate(addr)?;
        self.read_sectors_tag_in_track(rel,count,track,tag)
    }
    fn read_sector_long(&mut self,addr: u64) -> Result<Vec<u8>,DYNERR> {
        self.read_sectors_long(addr,1)
    }
    fn read_sectors_long(&mut self,addr: u64,count: u32) -> Result<Vec<u8>,DYNERR> {
        let (track,rel) = self.layout().locate(addr)?;
        self.read_sectors_long_in_track(rel,count,track)
    }
}

/// Write access to an optical image.  `set_tracks` has to come before any sector write,
/// nothing is permanent until `close`.
pub trait WritableOpticalImage {
    fn set_tracks(&mut self,tracks: Vec<cd::Track>) -> STDRESULT;
    fn write_media_tag(&mut self,dat: &[u8],tag: MediaTag) -> STDRESULT;
    fn write_sectors(&mut self,dat: &[u8],addr: u64,count: u32) -> STDRESULT;
    fn write_sectors_long(&mut self,dat: &[u8],addr: u64,count: u32) -> STDRESULT;
    /// for `TrackFlags` and `TrackIsrc` the address is the track number
    fn write_sector_tag(&mut self,dat: &[u8],addr: u64,tag: SectorTag) -> STDRESULT;
    fn close(&mut self) -> STDRESULT;
    fn write_sector(&mut self,dat: &[u8],addr: u64) -> STDRESULT {
        self.write_sectors(dat,addr,1)
    }
    fn write_sector_long(&mut self,dat: &[u8],addr: u64) -> STDRESULT {
        self.write_sectors_long(dat,addr,1)
    }
}

/// Copy every track, sector, and tag of an opened image into a writable one.
/// The writer is closed on success.
pub fn copy_optical(src: &mut dyn OpticalImage,dst: &mut dyn WritableOpticalImage) -> STDRESULT {
    // tag reads deliver interleaved subchannel whatever the source stores
    let tracks: Vec<cd::Track> = src.tracks().iter().map(|t| {
        let mut ans = t.clone();
        if ans.subchannel==cd::SubchannelMode::Packed {
            ans.subchannel = cd::SubchannelMode::Raw;
        }
        ans
    }).collect();
    dst.set_tracks(tracks.clone())?;
    for tag in src.info().readable_media_tags.clone() {
        match src.read_media_tag(tag) {
            Ok(dat) => match dst.write_media_tag(&dat,tag) {
                Ok(()) => {},
                Err(e) => debug!("media tag {:?} not copied: {}",tag,e)
            },
            Err(e) => debug!("media tag {:?} not available: {}",tag,e)
        }
    }
    for trk in &tracks {
        for tag in [SectorTag::TrackFlags,SectorTag::TrackIsrc] {
            if let Ok(dat) = src.read_sector_tag(trk.sequence as u64,tag) {
                dst.write_sector_tag(&dat,trk.sequence as u64,tag)?;
            }
        }
        for addr in trk.start_sector..=trk.end_sector {
            let sector = src.read_sector_long(addr)?;
            dst.write_sector_long(&sector,addr)?;
            if trk.subchannel != cd::SubchannelMode::None {
                let sub = src.read_sector_tag(addr,SectorTag::Subchannel)?;
                dst.write_sector_tag(&sub,addr,SectorTag::Subchannel)?;
            }
        }
    }
    dst.close()
}
