//! ## Support for DiskCopy 4.2 images
//!
//! This is the usual container for Lisa and early Macintosh disks.  A big endian header is
//! followed by the sector data, and then by the tag bytes of every sector, 12 per sector for
//! the Sony drives.  Both regions carry a checksum in the header.

use std::io::Cursor;
use binrw::{BinRead,BinWrite};
use log::{warn,debug,error};
use crate::img;
use crate::img::{Error,MediaType,SectorTag,DiskImageType,DiskImage};
use crate::DYNERR;

pub const HEADER_SIZE: usize = 0x54;
pub const SECTOR_SIZE: usize = 512;
pub const SONY_TAG_SIZE: usize = 12;

pub fn file_extensions() -> Vec<String> {
    vec!["dc42".to_string(),"image".to_string(),"dsk".to_string()]
}

#[derive(BinRead,BinWrite,Debug,Clone)]
#[brw(big)]
#[br(assert(private == 0x0100, "DiskCopy private word is {:04X}", private))]
pub struct Header {
    /// pascal string
    name: [u8;64],
    data_size: u32,
    tag_size: u32,
    data_checksum: u32,
    tag_checksum: u32,
    /// 0=400K, 1=800K, 2=720K, 3=1440K
    disk_format: u8,
    format_byte: u8,
    private: u16
}

/// DiskCopy checksum: add each big endian word, rotate right.
pub fn checksum(dat: &[u8]) -> u32 {
    let mut sum: u32 = 0;
    for pair in dat.chunks(2) {
        let word = match pair.len() {
            2 => u16::from_be_bytes([pair[0],pair[1]]),
            _ => (pair[0] as u16) << 8
        };
        sum = sum.wrapping_add(word as u32).rotate_right(1);
    }
    sum
}

/// checksum of the tag region, which famously leaves out the first sector's tag
fn tag_checksum(tags: &[u8]) -> u32 {
    match tags.len() > SONY_TAG_SIZE {
        true => checksum(&tags[SONY_TAG_SIZE..]),
        false => 0
    }
}

fn media_for(sectors: usize) -> MediaType {
    match sectors {
        800 => MediaType::AppleSony400,
        1600 => MediaType::AppleSony800,
        1702 => MediaType::AppleFileWare,
        9728 => MediaType::AppleProfile,
        19456 => MediaType::AppleWidget,
        _ => MediaType::Unknown
    }
}

pub struct Dc42 {
    header: Header,
    data: Vec<u8>,
    tags: Vec<u8>
}

impl Dc42 {
    /// Blank image with `sectors` sectors, each with tag bytes of `tag_size` (0 for none)
    pub fn create(name: &str,sectors: usize,tag_size: usize) -> Self {
        let mut pname = [0u8;64];
        let bytes = name.as_bytes();
        let n = bytes.len().min(63);
        pname[0] = n as u8;
        pname[1..n+1].copy_from_slice(&bytes[0..n]);
        let data = vec![0;sectors * SECTOR_SIZE];
        let tags = vec![0;sectors * tag_size];
        Self {
            header: Header {
                name: pname,
                data_size: data.len() as u32,
                tag_size: tags.len() as u32,
                data_checksum: 0,
                tag_checksum: 0,
                disk_format: match sectors {
                    1600 => 1,
                    _ => 0
                },
                format_byte: match sectors {
                    1600 => 0x22,
                    _ => 0x02
                },
                private: 0x0100
            },
            data,
            tags
        }
    }
    /// Quick check that the buffer could be a DiskCopy 4.2 image
    pub fn test_img(buf: &[u8]) -> bool {
        if buf.len() < HEADER_SIZE {
            return false;
        }
        let hdr = match Header::read(&mut Cursor::new(&buf[0..HEADER_SIZE])) {
            Ok(h) => h,
            Err(_) => {
                debug!("not a DiskCopy 4.2 header");
                return false;
            }
        };
        let expected = HEADER_SIZE + hdr.data_size as usize + hdr.tag_size as usize;
        if hdr.name[0] > 63 || hdr.data_size as usize % SECTOR_SIZE != 0 || buf.len() < expected {
            debug!("DiskCopy 4.2 sizes do not fit");
            return false;
        }
        true
    }
    pub fn from_bytes(buf: &[u8]) -> Result<Self,DYNERR> {
        if !Self::test_img(buf) {
            return Err(Box::new(Error::ImageTypeMismatch));
        }
        let header = match Header::read(&mut Cursor::new(&buf[0..HEADER_SIZE])) {
            Ok(h) => h,
            Err(e) => {
                error!("{}",e);
                return Err(Box::new(Error::InvalidArgument));
            }
        };
        let data_end = HEADER_SIZE + header.data_size as usize;
        let data = buf[HEADER_SIZE..data_end].to_vec();
        let tags = buf[data_end..data_end + header.tag_size as usize].to_vec();
        let sectors = data.len() / SECTOR_SIZE;
        if sectors > 0 && tags.len() % sectors != 0 {
            error!("{} tag bytes do not divide among {} sectors",tags.len(),sectors);
            return Err(Box::new(Error::InvalidArgument));
        }
        if checksum(&data) != header.data_checksum {
            warn!("data checksum mismatch");
        }
        if tag_checksum(&tags) != header.tag_checksum {
            warn!("tag checksum mismatch");
        }
        Ok(Self { header, data, tags })
    }
    pub fn name(&self) -> String {
        let n = (self.header.name[0] as usize).min(63);
        crate::escaped_ascii_from_bytes(&self.header.name[1..n+1],false)
    }
    /// bytes of tag per sector
    pub fn tag_size(&self) -> usize {
        match self.sector_count() {
            0 => 0,
            n => self.tags.len() / n as usize
        }
    }
    fn check_range(&self,addr: u64,count: u32) -> Result<(usize,usize),DYNERR> {
        let end = addr + count as u64;
        if end > self.sector_count() {
            debug!("sectors {}..{} are out of range",addr,end);
            return Err(Box::new(Error::OutOfRange));
        }
        Ok((addr as usize,end as usize))
    }
    pub fn write_sector(&mut self,addr: u64,dat: &[u8]) -> Result<(),DYNERR> {
        let (beg,_) = self.check_range(addr,1)?;
        if dat.len() != SECTOR_SIZE {
            return Err(Box::new(Error::InvalidArgument));
        }
        self.data[beg*SECTOR_SIZE..(beg+1)*SECTOR_SIZE].copy_from_slice(dat);
        Ok(())
    }
    pub fn write_sector_tag(&mut self,addr: u64,tag: &[u8]) -> Result<(),DYNERR> {
        let (beg,_) = self.check_range(addr,1)?;
        let n = self.tag_size();
        if n==0 {
            return Err(Box::new(Error::NotSupported));
        }
        if tag.len() != n {
            return Err(Box::new(Error::InvalidArgument));
        }
        self.tags[beg*n..(beg+1)*n].copy_from_slice(tag);
        Ok(())
    }
}

impl img::DiskImage for Dc42 {
    fn what_am_i(&self) -> DiskImageType {
        DiskImageType::DC42
    }
    fn file_extensions(&self) -> Vec<String> {
        file_extensions()
    }
    fn media_type(&self) -> MediaType {
        media_for(self.sector_count() as usize)
    }
    fn sector_count(&self) -> u64 {
        (self.data.len() / SECTOR_SIZE) as u64
    }
    fn sector_size(&self) -> usize {
        SECTOR_SIZE
    }
    fn readable_sector_tags(&self) -> Vec<SectorTag> {
        match self.tags.is_empty() {
            true => vec![],
            false => vec![SectorTag::Apple]
        }
    }
    fn read_sectors(&mut self,addr: u64,count: u32) -> Result<Vec<u8>,DYNERR> {
        let (beg,end) = self.check_range(addr,count)?;
        Ok(self.data[beg*SECTOR_SIZE..end*SECTOR_SIZE].to_vec())
    }
    fn read_sectors_tag(&mut self,addr: u64,count: u32,tag: SectorTag) -> Result<Vec<u8>,DYNERR> {
        if tag != SectorTag::Apple {
            return Err(Box::new(Error::NotSupported));
        }
        let n = self.tag_size();
        if n==0 {
            return Err(Box::new(Error::NoData));
        }
        let (beg,end) = self.check_range(addr,count)?;
        Ok(self.tags[beg*n..end*n].to_vec())
    }
    fn to_bytes(&mut self) -> Vec<u8> {
        self.header.data_size = self.data.len() as u32;
        self.header.tag_size = self.tags.len() as u32;
        self.header.data_checksum = checksum(&self.data);
        self.header.tag_checksum = tag_checksum(&self.tags);
        let mut ans = Cursor::new(Vec::new());
        if let Err(e) = self.header.write(&mut ans) {
            // writing to a vector cannot fail
            error!("{}",e);
        }
        let mut ans = ans.into_inner();
        ans.extend_from_slice(&self.data);
        ans.extend_from_slice(&self.tags);
        ans
    }
}

#[test]
fn checksum_rotates() {
    assert_eq!(checksum(&[0x00,0x01]),0x8000_0000);
    assert_eq!(checksum(&[0x00,0x01,0x00,0x01]),0x4000_0000 + 0x8000_0000);
    assert_eq!(checksum(&[]),0);
}

#[test]
fn image_round_trip() {
    let mut disk = Dc42::create("lisa",800,SONY_TAG_SIZE);
    disk.write_sector(3,&[0xaa;512]).expect("write failed");
    disk.write_sector_tag(3,&[1,2,3,4,5,6,7,8,9,10,11,12]).expect("write failed");
    let bytes = disk.to_bytes();
    assert_eq!(bytes.len(),HEADER_SIZE + 800*512 + 800*12);
    assert!(Dc42::test_img(&bytes));
    let mut copy = Dc42::from_bytes(&bytes).expect("read failed");
    assert_eq!(copy.name(),"lisa");
    assert_eq!(copy.media_type(),MediaType::AppleSony400);
    assert_eq!(copy.read_sector(3).expect("read failed"),vec![0xaa;512]);
    assert_eq!(copy.read_sector_tag(3,SectorTag::Apple).expect("read failed")[11],12);
    assert!(copy.read_sector(800).is_err());
}
