//! ### Lisa file system types
//!
//! On-disk records are big endian and decoded with `binrw`.  Offsets noted in the field
//! comments are from the start of the containing sector or block.

use std::fmt;
use std::io::SeekFrom;
use binrw::BinRead;
use num_derive::FromPrimitive;
use thiserror::Error;

pub const SECTOR_SIZE: usize = 512;
/// sectors in the smallest device the Lisa will format
pub const MIN_SECTORS: u64 = 800;
/// sectors searched for boot, loader, and MDDF tags
pub const TAG_SEARCH: u64 = 100;
/// longest file name
pub const E_NAME: usize = 32;
pub const SREC_SIZE: usize = 14;
pub const CATALOG_BLOCK_SECTORS: u32 = 4;
pub const MAX_EXTENTS: usize = 41;

pub const FILEID_FREE: i16 = 0;
pub const FILEID_MDDF: i16 = 1;
pub const FILEID_BITMAP: i16 = 2;
pub const FILEID_SRECORD: i16 = 3;
pub const FILEID_CATALOG: i16 = 4;
/// tag 0xAAAA
pub const FILEID_BOOT: i16 = -21846;
/// tag 0xBBBB
pub const FILEID_LOADER: i16 = -17477;
pub const FILEID_ERASED: i16 = 0x7fff;
pub const FILEID_MAX: i16 = FILEID_ERASED;
pub const DIRID_ROOT: i16 = 0;

pub const LISA_V1: u16 = 0x0e;
pub const LISA_V2: u16 = 0x0f;
pub const LISA_V3: u16 = 0x11;

/// Sentinel for the end of a chain of blocks
pub const NO_BLOCK: u32 = 0xffffffff;

/// Names of the debugging entries that reveal the system files, with their file ID
pub const SYSTEM_NAMES: [(&str,i16);6] = [
    ("$MDDF",FILEID_MDDF),
    ("$Boot",FILEID_BOOT),
    ("$Loader",FILEID_LOADER),
    ("$Bitmap",FILEID_BITMAP),
    ("$S-Record",FILEID_SRECORD),
    ("$",DIRID_ROOT)
];

pub const XATTR_PASSWORD: &str = "com.apple.lisa.password";
pub const XATTR_SERIAL: &str = "com.apple.lisa.serial";
pub const XATTR_LABEL: &str = "com.apple.lisa.label";
pub const XATTR_TAGS: &str = "com.apple.lisa.tags";

/// Enumerates file system errors.  The `Display` trait will print equivalent long message.
#[derive(Error,Debug)]
pub enum Error {
    #[error("file not found")]
    NotFound,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("not supported")]
    NotSupported,
    #[error("access denied")]
    AccessDenied,
    #[error("out of range")]
    OutOfRange,
    #[error("no data")]
    NoData,
    #[error("not a directory")]
    NotDirectory,
    #[error("no such extended attribute")]
    NoSuchXattr,
    #[error("unexpected I/O failure: {0}")]
    Unexpected(#[from] std::io::Error)
}

#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum LisaVersion {
    V1,
    V2,
    V3
}

impl LisaVersion {
    pub fn from_fsversion(v: u16) -> Option<Self> {
        match v {
            LISA_V1 => Some(Self::V1),
            LISA_V2 => Some(Self::V2),
            LISA_V3 => Some(Self::V3),
            _ => None
        }
    }
}

impl fmt::Display for LisaVersion {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f,"v1"),
            Self::V2 => write!(f,"v2"),
            Self::V3 => write!(f,"v3")
        }
    }
}

/// Lisa file types, available conversions are:
/// * Type to u8: `as u8`
/// * u8 to Type: `FromPrimitive::from_u8`
#[derive(FromPrimitive,PartialEq,Eq,Clone,Copy,Debug)]
pub enum FileType {
    Undefined = 0,
    MddFile = 1,
    RootCat = 2,
    FreeList = 3,
    BadBlocks = 4,
    SysData = 5,
    Spool = 6,
    Exec = 7,
    UserCat = 8,
    Pipe = 9,
    BootFile = 10,
    SwapData = 11,
    SwapCode = 12,
    RamAp = 13,
    UserFile = 14,
    KilledObject = 15
}

/// Seconds since 1901-01-01, 0 means never
pub fn lisa_time(secs: u32) -> Option<chrono::NaiveDateTime> {
    if secs==0 {
        return None;
    }
    let epoch = chrono::NaiveDate::from_ymd_opt(1901,1,1)?.and_hms_opt(0,0,0)?;
    epoch.checked_add_signed(chrono::TimeDelta::seconds(secs as i64))
}

/// Display form of a fixed name field, which can be NUL padded
pub fn name_from_bytes(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b==0).unwrap_or(bytes.len());
    crate::escaped_ascii_from_bytes(&bytes[0..end],true)
}

/// Sector tag decoded from any of the three sizes, fields that a format
/// lacks are 0.
#[derive(Clone,Debug,Default,PartialEq)]
pub struct Tag {
    pub version: u16,
    pub kind: u8,
    pub reserved: u8,
    pub volume: u8,
    pub file_id: i16,
    /// only ProFile and Priam
    pub used_bytes: u16,
    /// only ProFile and Priam
    pub abs_page: u32,
    /// only ProFile and Priam
    pub checksum: u8,
    pub rel_page: u16,
    pub next_block: u32,
    pub prev_block: u32,
    pub is_first: bool,
    pub is_last: bool
}

fn be16(buf: &[u8],i: usize) -> u16 {
    u16::from_be_bytes([buf[i],buf[i+1]])
}

fn be24(buf: &[u8],i: usize) -> u32 {
    u32::from_be_bytes([0,buf[i],buf[i+1],buf[i+2]])
}

impl Tag {
    /// Decode by length: 12 bytes for Sony, 20 for ProFile, 24 for Priam.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        let mut ans = Self::default();
        match buf.len() {
            12 | 20 | 24 => {
                ans.version = be16(buf,0);
                ans.kind = (buf[2] & 0xc0) >> 6;
                ans.reserved = buf[2] & 0x3f;
                ans.volume = buf[3];
                ans.file_id = be16(buf,4) as i16;
            },
            _ => return None
        }
        if buf.len()==12 {
            ans.rel_page = be16(buf,6);
            let next = be16(buf,8);
            let prev = be16(buf,10);
            ans.is_last = next & 0x8000 > 0;
            ans.is_first = prev & 0x8000 > 0;
            ans.next_block = (next & 0x7ff) as u32;
            ans.prev_block = (prev & 0x7ff) as u32;
        } else {
            ans.used_bytes = be16(buf,6);
            ans.abs_page = be24(buf,8);
            ans.checksum = buf[11];
            ans.rel_page = be16(buf,12);
            ans.next_block = be24(buf,14);
            ans.prev_block = be24(buf,17);
            ans.is_last = ans.next_block==0xffffff;
            ans.is_first = ans.prev_block==0xffffff;
        }
        Some(ans)
    }
}

/// Master directory descriptor
#[derive(BinRead,Debug,Clone)]
#[br(big)]
pub struct Mddf {
    pub fsversion: u16,
    pub volid: u64,
    pub volnum: u16,
    /// 0x0C, pascal string
    pub volname: [u8;33],
    pub unknown1: u8,
    /// 0x2E, pascal string
    pub password: [u8;33],
    pub unknown2: u8,
    pub machine_id: u32,
    pub master_copy_id: u32,
    /// 0x58 volume created
    pub dtvc: u32,
    /// catalog created
    pub dtcc: u32,
    /// volume backed up
    pub dtvb: u32,
    /// volume scavenged
    pub dtvs: u32,
    pub unknown3: u32,
    /// 0x6C
    pub mddf_block: u32,
    pub volsize_minus_one: u32,
    pub volsize_minus_mddf_minus_one: u32,
    pub vol_size: u32,
    pub blocksize: u16,
    pub datasize: u16,
    pub unknown4: u16,
    pub unknown5: u32,
    pub unknown6: u32,
    /// 0x8A
    pub clustersize: u16,
    pub fs_size: u32,
    pub unknown7: u32,
    /// 0x94
    pub srec_ptr: u32,
    pub unknown9: u16,
    pub srec_len: u16,
    /// 0xB0
    #[br(pad_before = 20)]
    pub filecount: u16,
    /// 0xBA
    #[br(pad_before = 8)]
    pub freecount: u32,
    /// 0xC4
    #[br(pad_before = 6)]
    pub overmount_stamp: u64,
    pub serialization: u32,
    /// 0x138
    #[br(pad_before = 0x68)]
    pub vol_left_mounted: u8
}

impl Mddf {
    pub fn from_bytes(buf: &[u8]) -> Result<Self,binrw::Error> {
        Self::read(&mut std::io::Cursor::new(buf))
    }
    fn pascal(field: &[u8;33]) -> String {
        let n = (field[0] as usize).min(32);
        crate::escaped_ascii_from_bytes(&field[1..n+1],true)
    }
    pub fn name(&self) -> String {
        Self::pascal(&self.volname)
    }
    /// Volume password, empty if the field holds garbage
    pub fn password(&self) -> String {
        match self.password[0] {
            n if n as usize <= E_NAME => Self::pascal(&self.password),
            _ => String::new()
        }
    }
}

/// Entry in the S-Records file
#[derive(BinRead,Debug,Clone,Copy,Default)]
#[br(big)]
pub struct SRecord {
    /// block of the extents file relative to the MDDF
    pub extent_ptr: u32,
    pub unknown: u32,
    /// bytes
    pub filesize: u32,
    pub flags: u16
}

impl SRecord {
    pub fn table_from_bytes(buf: &[u8]) -> Result<Vec<Self>,binrw::Error> {
        let mut cursor = std::io::Cursor::new(buf);
        let mut ans = Vec::new();
        for _i in 0..buf.len()/SREC_SIZE {
            ans.push(Self::read(&mut cursor)?);
        }
        Ok(ans)
    }
}

#[derive(BinRead,Debug,Clone,Copy)]
#[br(big)]
pub struct Extent {
    /// block relative to the MDDF
    pub start: u32,
    /// blocks
    pub length: u16
}

/// Per-file metadata and allocation.  V1 keeps the allocation in a second sector.
#[derive(BinRead,Debug,Clone)]
#[br(big, import(v1: bool))]
pub struct ExtentsFile {
    pub name_len: u8,
    pub name: [u8;31],
    pub unknown1: u16,
    pub file_uid: u64,
    pub unknown2: u8,
    pub etype: u8,
    /// 0x2C
    pub ftype: u8,
    /// 0x30
    #[br(pad_before = 3)]
    pub dtc: u32,
    pub dta: u32,
    pub dtm: u32,
    pub dtb: u32,
    pub dts: u32,
    /// 0x44
    pub serial: u32,
    pub unknown4: u8,
    /// 0x49
    pub locked: u8,
    pub protect: u8,
    pub master: u8,
    pub scavenged: u8,
    pub closed: u8,
    pub open: u8,
    /// 0x64
    #[br(pad_before = 21)]
    pub password_valid: u8,
    pub password: [u8;8],
    /// blocks
    #[br(seek_before = SeekFrom::Start(if v1 { 0x200 } else { 0x80 }))]
    pub length: u32,
    pub unknown9: u32,
    #[br(count = MAX_EXTENTS, map = |v: Vec<Extent>| v.into_iter().take_while(|e| e.length > 0).collect())]
    pub extents: Vec<Extent>,
    /// 0x180, the LisaInfo label
    #[br(seek_before = SeekFrom::Start(0x180))]
    pub label: [u8;128]
}

impl ExtentsFile {
    pub fn from_bytes(buf: &[u8],v1: bool) -> Result<Self,binrw::Error> {
        Self::read_args(&mut std::io::Cursor::new(buf),(v1,))
    }
    pub fn name(&self) -> String {
        let n = (self.name_len as usize).min(31);
        crate::escaped_ascii_from_bytes(&self.name[0..n],true)
    }
    pub fn file_type(&self) -> FileType {
        num_traits::FromPrimitive::from_u8(self.ftype).unwrap_or(FileType::Undefined)
    }
    pub fn has_label(&self) -> bool {
        self.label.iter().any(|b| *b!=0)
    }
}

/// Catalog entry of the flat V1/V2 catalog, 54 bytes
#[derive(BinRead,Debug,Clone)]
#[br(big)]
pub struct CatalogEntryV2 {
    pub name_len: u8,
    pub name: [u8;E_NAME],
    pub unknown1: u8,
    pub file_type: u8,
    pub unknown2: u8,
    /// 0x24
    pub file_id: i16,
    pub unknown3: [u8;16]
}

pub const V2_ENTRY_SIZE: usize = 54;

/// Entry marker at offset 0x24 of a V3 catalog record
pub const CAT_HEADER: u8 = 0x08;
pub const CAT_FILLER: u8 = 0x7c;
pub const CAT_END: u8 = 0xff;
pub const CAT_FILE: u8 = 0x03;
pub const CAT_DIR: u8 = 0x01;
/// first byte of an entry
pub const CAT_ENTRY_MARK: u8 = 0x24;
pub const CAT_HEADER_SIZE: usize = 78;
pub const CAT_FILLER_SIZE: usize = 50;
pub const CAT_FILE_SIZE: usize = 64;
pub const CAT_DIR_SIZE: usize = 48;
/// pointers in a 4 sector catalog block, relative to the MDDF
pub const CAT_PREV_PTR: usize = 0x7f6;
pub const CAT_NEXT_PTR: usize = 0x7fa;

/// File or subdirectory record of the V3 catalog, the tail of a file record is left out
#[derive(BinRead,Debug,Clone)]
#[br(big)]
pub struct CatalogEntryV3 {
    pub marker: u8,
    pub parent_id: i16,
    pub name: [u8;E_NAME],
    pub terminator: u8,
    /// 0x24
    pub file_type: u8,
    pub unknown: u8,
    pub file_id: i16,
    pub dtc: u32,
    pub dtm: u32,
    /// 0x30, only files
    pub length: u32,
    pub wasted: u32
}

/// Catalog entry in the shape shared by all versions
#[derive(Clone,Debug,PartialEq)]
pub struct CatalogEntry {
    pub parent_id: i16,
    pub name: String,
    pub file_id: i16,
    pub is_dir: bool,
    pub dtc: u32,
    pub dtm: u32,
    pub length: u32
}

#[test]
fn sony_tag() {
    let tag = Tag::decode(&[0,1,0x40,7,0xff,0xfc,0,2,0x80,0x05,0,0x03]).expect("decode failed");
    assert_eq!(tag.version,1);
    assert_eq!(tag.kind,1);
    assert_eq!(tag.volume,7);
    assert_eq!(tag.file_id,-4);
    assert_eq!(tag.rel_page,2);
    assert_eq!(tag.next_block,5);
    assert!(tag.is_last);
    assert!(!tag.is_first);
    assert_eq!(tag.prev_block,3);
    assert!(Tag::decode(&[0;11]).is_none());
}

#[test]
fn profile_tag() {
    let mut buf = [0u8;20];
    buf[4..6].copy_from_slice(&FILEID_CATALOG.to_be_bytes());
    buf[8..11].copy_from_slice(&[0,1,2]);
    buf[14..17].copy_from_slice(&[0xff,0xff,0xff]);
    buf[17..20].copy_from_slice(&[0,0,9]);
    let tag = Tag::decode(&buf).expect("decode failed");
    assert_eq!(tag.file_id,FILEID_CATALOG);
    assert_eq!(tag.abs_page,0x102);
    assert!(tag.is_last);
    assert_eq!(tag.prev_block,9);
}

#[test]
fn times() {
    assert_eq!(lisa_time(0),None);
    let t = lisa_time(86400*365).expect("bad time");
    assert_eq!(t.format("%Y-%m-%d").to_string(),"1902-01-01");
}

#[test]
fn mddf_offsets() {
    let mut buf = vec![0u8;512];
    buf[0x00..0x02].copy_from_slice(&LISA_V3.to_be_bytes());
    buf[0x0c] = 3;
    buf[0x0d..0x10].copy_from_slice(b"VOL");
    buf[0x6c..0x70].copy_from_slice(&46u32.to_be_bytes());
    buf[0x94..0x98].copy_from_slice(&12u32.to_be_bytes());
    buf[0x9a..0x9c].copy_from_slice(&3u16.to_be_bytes());
    buf[0xb0..0xb2].copy_from_slice(&9u16.to_be_bytes());
    buf[0xba..0xbe].copy_from_slice(&700u32.to_be_bytes());
    buf[0x138] = 1;
    let mddf = Mddf::from_bytes(&buf).expect("decode failed");
    assert_eq!(mddf.fsversion,LISA_V3);
    assert_eq!(mddf.name(),"VOL");
    assert_eq!(mddf.mddf_block,46);
    assert_eq!(mddf.srec_ptr,12);
    assert_eq!(mddf.srec_len,3);
    assert_eq!(mddf.filecount,9);
    assert_eq!(mddf.freecount,700);
    assert_eq!(mddf.vol_left_mounted,1);
}

#[test]
fn extents_offsets() {
    for v1 in [true,false] {
        let mut buf = vec![0u8;1024];
        buf[0] = 4;
        buf[1..5].copy_from_slice(b"Test");
        buf[0x2c] = FileType::UserFile as u8;
        buf[0x30..0x34].copy_from_slice(&1000u32.to_be_bytes());
        buf[0x44..0x48].copy_from_slice(&77u32.to_be_bytes());
        buf[0x49] = 1;
        buf[0x64] = 1;
        let (len,ext) = match v1 { true => (0x200,0x208), false => (0x80,0x88) };
        buf[len..len+4].copy_from_slice(&3u32.to_be_bytes());
        buf[ext..ext+4].copy_from_slice(&20u32.to_be_bytes());
        buf[ext+4..ext+6].copy_from_slice(&2u16.to_be_bytes());
        buf[ext+6..ext+10].copy_from_slice(&30u32.to_be_bytes());
        buf[ext+10..ext+12].copy_from_slice(&1u16.to_be_bytes());
        buf[0x180] = b'L';
        let file = ExtentsFile::from_bytes(&buf,v1).expect("decode failed");
        assert_eq!(file.name(),"Test");
        assert_eq!(file.file_type(),FileType::UserFile);
        assert_eq!(file.dtc,1000);
        assert_eq!(file.serial,77);
        assert_eq!(file.locked,1);
        assert_eq!(file.password_valid,1);
        assert_eq!(file.length,3);
        assert_eq!(file.extents.len(),2);
        assert_eq!(file.extents[1].start,30);
        assert!(file.has_label());
    }
}
