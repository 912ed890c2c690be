//! # Optical disc layer
//!
//! Structures shared by the cue-sheet driven image formats (`cdrdao`, `clonecd`).
//! The formats parse their descriptors into `Track` records, then hand them to
//! `layout::DiscLayout`, which resolves sessions, partitions, and the offset map
//! that dispatches a global sector address to the owning track.
//!
//! * `sector` converts between raw and cooked sectors, rebuilds ECC/EDC
//! * `subchannel` interleaves and deinterleaves the P-W channels
//! * `toc` encodes and decodes the binary full TOC
//! * `source` abstracts the files that back an image

pub mod sector;
pub mod subchannel;
pub mod toc;
pub mod source;
pub mod layout;

use std::collections::BTreeMap;
use std::fmt;

/// pre-emphasis, audio only
pub const FLAG_PRE_EMPHASIS: u8 = 0x01;
pub const FLAG_COPY_PERMITTED: u8 = 0x02;
pub const FLAG_DATA: u8 = 0x04;
/// four channel audio, audio only
pub const FLAG_FOUR_CHANNEL: u8 = 0x08;

#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum TrackType {
    Audio,
    /// data of unknown mode
    Data,
    CdMode1,
    CdMode2Formless,
    CdMode2Form1,
    CdMode2Form2
}

impl TrackType {
    pub fn is_audio(&self) -> bool {
        *self == Self::Audio
    }
    pub fn is_mode2(&self) -> bool {
        matches!(self,Self::CdMode2Formless | Self::CdMode2Form1 | Self::CdMode2Form2)
    }
    /// user data bytes in one sector of this type
    pub fn cooked_size(&self) -> usize {
        match self {
            Self::Audio => 2352,
            Self::CdMode2Formless => 2336,
            Self::CdMode2Form2 => 2324,
            _ => 2048
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f,"audio"),
            Self::Data => write!(f,"data"),
            Self::CdMode1 => write!(f,"mode1"),
            Self::CdMode2Formless => write!(f,"mode2"),
            Self::CdMode2Form1 => write!(f,"mode2-form1"),
            Self::CdMode2Form2 => write!(f,"mode2-form2")
        }
    }
}

/// How the 96 subchannel bytes are stored after each sector
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum SubchannelMode {
    None,
    /// deinterleaved P-W channels
    Packed,
    /// interleaved, as the drive delivers them
    Raw
}

/// CD-Text strings that the descriptors can carry, either for the disc or a track
#[derive(Clone,Debug,Default,PartialEq)]
pub struct CdText {
    pub title: Option<String>,
    pub performer: Option<String>,
    pub songwriter: Option<String>,
    pub composer: Option<String>,
    pub arranger: Option<String>,
    pub message: Option<String>,
    pub disc_id: Option<String>,
    pub genre: Option<String>,
    pub upc_ean: Option<String>
}

impl CdText {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
    /// (keyword,value) pairs in the order CDRDAO writes them
    pub fn fields(&self) -> Vec<(&'static str,&str)> {
        let mut ans = Vec::new();
        let all = [
            ("TITLE",&self.title),
            ("PERFORMER",&self.performer),
            ("SONGWRITER",&self.songwriter),
            ("COMPOSER",&self.composer),
            ("ARRANGER",&self.arranger),
            ("MESSAGE",&self.message),
            ("DISC_ID",&self.disc_id),
            ("GENRE",&self.genre),
            ("UPC_EAN",&self.upc_ean)
        ];
        for (k,v) in all {
            if let Some(s) = v {
                ans.push((k,s.as_str()));
            }
        }
        ans
    }
    pub fn set(&mut self,key: &str,val: &str) {
        let slot = match key {
            "TITLE" => &mut self.title,
            "PERFORMER" => &mut self.performer,
            "SONGWRITER" => &mut self.songwriter,
            "COMPOSER" => &mut self.composer,
            "ARRANGER" => &mut self.arranger,
            "MESSAGE" => &mut self.message,
            "DISC_ID" => &mut self.disc_id,
            "GENRE" => &mut self.genre,
            "UPC_EAN" => &mut self.upc_ean,
            _ => return
        };
        *slot = Some(val.to_string());
    }
}

/// One track in absolute sector addressing.
/// `start_sector..=end_sector` is the range that belongs to the track, which may or may not
/// include the pregap depending on the image format.
#[derive(Clone,Debug,PartialEq)]
pub struct Track {
    pub sequence: u32,
    pub session: u16,
    pub track_type: TrackType,
    pub start_sector: u64,
    pub end_sector: u64,
    pub pregap: u64,
    /// index number to absolute sector, index 0 may be negative on track 1
    pub indexes: BTreeMap<u16,i64>,
    /// user data bytes per sector
    pub bytes_per_sector: usize,
    /// bytes per sector stored in the image, not counting subchannel
    pub raw_bytes_per_sector: usize,
    pub file: String,
    pub file_offset: u64,
    pub subchannel: SubchannelMode,
    pub subchannel_file: Option<String>,
    pub subchannel_offset: u64
}

impl Track {
    pub fn new(sequence: u32,track_type: TrackType,start_sector: u64,end_sector: u64) -> Self {
        let cooked = track_type.cooked_size();
        let raw = match track_type {
            TrackType::CdMode1 | TrackType::CdMode2Form1 | TrackType::CdMode2Form2 | TrackType::CdMode2Formless => sector::RAW_SECTOR_SIZE,
            _ => cooked
        };
        let mut indexes = BTreeMap::new();
        indexes.insert(1,start_sector as i64);
        Self {
            sequence,
            session: 1,
            track_type,
            start_sector,
            end_sector,
            pregap: 0,
            indexes,
            bytes_per_sector: cooked,
            raw_bytes_per_sector: raw,
            file: String::new(),
            file_offset: 0,
            subchannel: SubchannelMode::None,
            subchannel_file: None,
            subchannel_offset: 0
        }
    }
    pub fn sectors(&self) -> u64 {
        (self.end_sector + 1).saturating_sub(self.start_sector)
    }
    /// bytes in the image for each sector, including subchannel if present
    pub fn stride(&self) -> usize {
        match self.subchannel {
            SubchannelMode::None => self.raw_bytes_per_sector,
            _ => self.raw_bytes_per_sector + sector::SUBCHANNEL_SIZE
        }
    }
    pub fn contains(&self,addr: u64) -> bool {
        addr >= self.start_sector && addr <= self.end_sector
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct Session {
    pub sequence: u16,
    pub start_track: u32,
    pub end_track: u32,
    pub start_sector: u64,
    pub end_sector: u64
}

/// One partition per track, sizes are in sectors and in image bytes
#[derive(Clone,Debug,PartialEq)]
pub struct Partition {
    pub sequence: u32,
    pub name: String,
    pub kind: String,
    pub start: u64,
    pub length: u64,
    pub offset: u64,
    pub size: u64
}

/// Reject buffers that cannot be a cue sheet: control bytes other than CR, LF, NUL,
/// or two NULs in a row, within the first 512 bytes.
pub fn text_safe(buf: &[u8]) -> bool {
    let mut prev_nul = false;
    for b in buf.iter().take(512) {
        if *b==0 {
            if prev_nul {
                return false;
            }
            prev_nul = true;
            continue;
        }
        prev_nul = false;
        if *b < 0x20 && *b != 0x0a && *b != 0x0d {
            return false;
        }
    }
    true
}

#[test]
fn binary_safety() {
    assert!(text_safe(b"CD_DA\r\n// comment\n"));
    assert!(!text_safe(b"CD_DA\x00\x00"));
    assert!(!text_safe(b"CD_DA\x07"));
    let mut long = vec![b'a';600];
    long[550] = 1;
    assert!(text_safe(&long));
}

#[test]
fn cd_text_fields() {
    let mut txt = CdText::default();
    assert!(txt.is_empty());
    txt.set("PERFORMER","Someone");
    txt.set("TITLE","Something");
    txt.set("BOGUS","ignored");
    assert_eq!(txt.fields(),vec![("TITLE","Something"),("PERFORMER","Someone")]);
}
