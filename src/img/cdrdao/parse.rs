//! ## CDRDAO TOC grammar
//!
//! The TOC file is line oriented.  Each line is matched against an ordered list of patterns,
//! track state accumulates until the next `TRACK` or the end of the text flushes it.
//! Lengths of data files that do not declare one are taken from the `ByteSource`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use regex::Regex;
use log::{debug,trace,warn,error};
use crate::img::Error;
use crate::img::cd::{CdText,SubchannelMode,TrackType,text_safe};
use crate::img::cd::source::ByteSource;
use crate::img::cd::sector::SUBCHANNEL_SIZE;
use crate::DYNERR;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*//(?P<comment>.*)$").expect("regex parsing error"));
static DISC_TYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?P<type>CD_DA|CD_ROM_XA|CD_ROM|CD_I)\s*$").expect("regex parsing error"));
static CATALOG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^\s*CATALOG\s*"(?P<catalog>[\x21-\x7f]{13})"\s*$"#).expect("regex parsing error"));
static TRACK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*TRACK\s+(?P<type>\w+)(?:\s+(?P<subchan>\w+))?\s*$").expect("regex parsing error"));
static COPY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?P<no>NO\s+)?COPY\s*$").expect("regex parsing error"));
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?P<no>NO\s+)?PRE_EMPHASIS\s*$").expect("regex parsing error"));
static CHANNELS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?P<num>TWO|FOUR)_CHANNEL_AUDIO\s*$").expect("regex parsing error"));
static ISRC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^\s*ISRC\s*"(?P<isrc>[A-Z0-9]{5}[0-9]{7})"\s*$"#).expect("regex parsing error"));
static INDEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*INDEX\s+(?P<address>\d+:\d+:\d+)\s*$").expect("regex parsing error"));
static START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*START(?:\s+(?P<address>\d+:\d+:\d+))?\s*$").expect("regex parsing error"));
static PREGAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*PREGAP\s+(?P<length>\d+:\d+:\d+)\s*$").expect("regex parsing error"));
static ZERO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?P<kind>SILENCE|ZERO)\s+(?:(?P<mode>[A-Z][A-Z0-9_]*)\s+)?(?:(?P<subchan>RW_RAW|RW)\s+)?(?P<length>\d+:\d+:\d+|\d+)\s*$").expect("regex parsing error"));
static AUDIO_FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^\s*(?:AUDIO)?FILE\s+"(?P<filename>[^"]+)"\s+(?:#(?P<base_offset>\d+)\s+)?(?:(?P<bare_offset>\d+)\s+)??(?:(?P<start>\d+:\d+:\d+)|(?P<start_num>\d+))(?:\s+(?P<length>\d+:\d+:\d+|\d+))?\s*(?://.*)?$"#).expect("regex parsing error"));
static DATA_FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^\s*DATAFILE\s+"(?P<filename>[^"]+)"(?:\s+#(?P<base_offset>\d+))?(?:\s+(?P<length>\d+:\d+:\d+|\d+))?\s*(?://.*)?$"#).expect("regex parsing error"));
static CD_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^\s*(?P<key>TITLE|PERFORMER|SONGWRITER|COMPOSER|ARRANGER|MESSAGE|DISC_ID|GENRE|UPC_EAN)\s+"(?P<value>(?:[^"\\]|\\.)*)"\s*$"#).expect("regex parsing error"));
static CD_TEXT_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?:CD_TEXT\s*\{|LANGUAGE_MAP\s*\{|LANGUAGE\s+\d+\s*\{|\d+\s*:\s*\w+|\}|\{)\s*$").expect("regex parsing error"));

/// Track modes of the TOC grammar
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum TrackMode {
    Audio,
    Mode1,
    Mode1Raw,
    Mode2,
    Mode2Form1,
    Mode2Form2,
    Mode2FormMix,
    Mode2Raw
}

impl FromStr for TrackMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "AUDIO" => Ok(Self::Audio),
            "MODE1" => Ok(Self::Mode1),
            "MODE1_RAW" => Ok(Self::Mode1Raw),
            "MODE2" => Ok(Self::Mode2),
            "MODE2_FORM1" => Ok(Self::Mode2Form1),
            "MODE2_FORM2" => Ok(Self::Mode2Form2),
            "MODE2_FORM_MIX" => Ok(Self::Mode2FormMix),
            "MODE2_RAW" => Ok(Self::Mode2Raw),
            _ => Err(Error::InvalidArgument)
        }
    }
}

impl fmt::Display for TrackMode {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Audio => "AUDIO",
            Self::Mode1 => "MODE1",
            Self::Mode1Raw => "MODE1_RAW",
            Self::Mode2 => "MODE2",
            Self::Mode2Form1 => "MODE2_FORM1",
            Self::Mode2Form2 => "MODE2_FORM2",
            Self::Mode2FormMix => "MODE2_FORM_MIX",
            Self::Mode2Raw => "MODE2_RAW"
        };
        write!(f,"{}",s)
    }
}

impl TrackMode {
    /// bytes of each sector that are in the data file, not counting subchannel
    pub fn stored_size(&self) -> usize {
        match self {
            Self::Audio | Self::Mode1Raw | Self::Mode2Raw => 2352,
            Self::Mode1 | Self::Mode2Form1 => 2048,
            Self::Mode2Form2 => 2324,
            Self::Mode2 | Self::Mode2FormMix => 2336
        }
    }
    pub fn track_type(&self) -> TrackType {
        match self {
            Self::Audio => TrackType::Audio,
            Self::Mode1 | Self::Mode1Raw => TrackType::CdMode1,
            Self::Mode2Form1 => TrackType::CdMode2Form1,
            Self::Mode2Form2 => TrackType::CdMode2Form2,
            Self::Mode2 | Self::Mode2FormMix | Self::Mode2Raw => TrackType::CdMode2Formless
        }
    }
    /// Mode a writer uses to store a track of the given type, keeping sectors raw if they came in raw
    pub fn for_track(track_type: TrackType,raw_bytes_per_sector: usize) -> Self {
        let raw = raw_bytes_per_sector==2352;
        match (track_type,raw) {
            (TrackType::Audio,_) => Self::Audio,
            (TrackType::CdMode1,true) => Self::Mode1Raw,
            (TrackType::CdMode1,false) => Self::Mode1,
            (TrackType::CdMode2Formless,false) => Self::Mode2,
            (TrackType::CdMode2Form1,false) => Self::Mode2Form1,
            (TrackType::CdMode2Form2,false) => Self::Mode2Form2,
            (TrackType::CdMode2Formless | TrackType::CdMode2Form1 | TrackType::CdMode2Form2,true) => Self::Mode2Raw,
            (TrackType::Data,_) => Self::Mode1
        }
    }
}

#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum DiscType {
    CdDa,
    CdRom,
    CdRomXa,
    CdI
}

impl FromStr for DiscType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "CD_DA" => Ok(Self::CdDa),
            "CD_ROM" => Ok(Self::CdRom),
            "CD_ROM_XA" => Ok(Self::CdRomXa),
            "CD_I" => Ok(Self::CdI),
            _ => Err(Error::InvalidArgument)
        }
    }
}

impl fmt::Display for DiscType {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CdDa => write!(f,"CD_DA"),
            Self::CdRom => write!(f,"CD_ROM"),
            Self::CdRomXa => write!(f,"CD_ROM_XA"),
            Self::CdI => write!(f,"CD_I")
        }
    }
}

/// A track as the TOC describes it, addresses are absolute sectors
#[derive(Clone,Debug,PartialEq)]
pub struct TocTrack {
    pub sequence: u32,
    pub mode: TrackMode,
    pub subchannel: SubchannelMode,
    pub copy: bool,
    pub pre_emphasis: bool,
    pub four_channel: bool,
    pub isrc: Option<String>,
    pub cdtext: CdText,
    /// data file, empty if the track is all silence
    pub file: String,
    /// byte offset of the first stored sector
    pub file_offset: u64,
    pub start_sector: u64,
    /// all sectors of the track including pregap
    pub sectors: u64,
    pub pregap: u64,
    /// leading sectors that are not in any file and read as zeros
    pub zero_pregap: u64,
    pub indexes: BTreeMap<u16,u64>
}

impl TocTrack {
    fn new(sequence: u32,mode: TrackMode,subchannel: SubchannelMode,start_sector: u64) -> Self {
        Self {
            sequence,
            mode,
            subchannel,
            copy: false,
            pre_emphasis: false,
            four_channel: false,
            isrc: None,
            cdtext: CdText::default(),
            file: String::new(),
            file_offset: 0,
            start_sector,
            sectors: 0,
            pregap: 0,
            zero_pregap: 0,
            indexes: BTreeMap::new()
        }
    }
    /// bytes of one sector in the data file, including subchannel
    pub fn stride(&self) -> usize {
        match self.subchannel {
            SubchannelMode::None => self.mode.stored_size(),
            _ => self.mode.stored_size() + SUBCHANNEL_SIZE
        }
    }
    /// control nibble as it would appear in the Q channel
    pub fn flags(&self) -> u8 {
        let mut ans = 0;
        if self.mode != TrackMode::Audio {
            ans |= crate::img::cd::FLAG_DATA;
        }
        if self.copy {
            ans |= crate::img::cd::FLAG_COPY_PERMITTED;
        }
        if self.pre_emphasis {
            ans |= crate::img::cd::FLAG_PRE_EMPHASIS;
        }
        if self.four_channel {
            ans |= crate::img::cd::FLAG_FOUR_CHANNEL;
        }
        ans
    }
}

/// Everything a TOC file says about the disc
#[derive(Clone,Debug,PartialEq)]
pub struct TocDisc {
    pub disc_type: DiscType,
    pub mcn: Option<String>,
    pub comment: String,
    pub cdtext: CdText,
    pub tracks: Vec<TocTrack>
}

/// Parse `mm:ss:ff` as a count of sectors
pub fn parse_msf(s: &str) -> Option<u64> {
    let v: Vec<u64> = s.split(':').filter_map(|x| x.parse::<u64>().ok()).collect();
    if v.len()!=3 || v[1] > 59 || v[2] > 74 {
        return None;
    }
    Some(v[0] * 4500 + v[1] * 75 + v[2])
}

/// Format a count of sectors as `mm:ss:ff`
pub fn format_msf(sectors: u64) -> String {
    format!("{:02}:{:02}:{:02}",sectors / 4500,(sectors / 75) % 60,sectors % 75)
}

/// Would this buffer be the start of a TOC file
pub fn identify(buf: &[u8]) -> bool {
    if !text_safe(buf) {
        debug!("TOC rejected, binary data");
        return false;
    }
    let txt = String::from_utf8_lossy(buf);
    for line in txt.lines() {
        let line = line.trim_matches(char::from(0));
        if line.trim().is_empty() || COMMENT.is_match(line) {
            continue;
        }
        return DISC_TYPE.is_match(line);
    }
    false
}

struct Parser<'a> {
    src: &'a dyn ByteSource,
    line_num: usize,
    disc_type: Option<DiscType>,
    mcn: Option<String>,
    comments: Vec<String>,
    cdtext: CdText,
    tracks: Vec<TocTrack>,
    current: Option<TocTrack>,
    next_sector: u64,
    next_index: u16
}

impl<'a> Parser<'a> {
    fn new(src: &'a dyn ByteSource) -> Self {
        Self {
            src,
            line_num: 0,
            disc_type: None,
            mcn: None,
            comments: Vec::new(),
            cdtext: CdText::default(),
            tracks: Vec::new(),
            current: None,
            next_sector: 0,
            next_index: 2
        }
    }
    fn err(&self,msg: &str) -> DYNERR {
        error!("line {}: {}",self.line_num,msg);
        Box::new(Error::Parse { line: self.line_num, msg: msg.to_string() })
    }
    fn msf(&self,s: &str) -> Result<u64,DYNERR> {
        parse_msf(s).ok_or_else(|| self.err(&format!("bad address {}",s)))
    }
    fn num(&self,s: &str) -> Result<u64,DYNERR> {
        s.parse::<u64>().map_err(|_| self.err(&format!("bad number {}",s)))
    }
    fn track(&mut self) -> Result<&mut TocTrack,DYNERR> {
        let line = self.line_num;
        match self.current.as_mut() {
            Some(t) => Ok(t),
            None => {
                error!("line {}: track statement outside of a track",line);
                Err(Box::new(Error::Parse { line, msg: "statement outside of a track".to_string() }))
            }
        }
    }
    fn push_track(&mut self) {
        if let Some(mut trk) = self.current.take() {
            if !trk.indexes.contains_key(&1) && trk.pregap != trk.sectors {
                trk.indexes.insert(1,trk.start_sector + trk.pregap);
            }
            if trk.pregap > 0 && !trk.indexes.contains_key(&0) {
                trk.indexes.insert(0,trk.start_sector);
            }
            trace!("track {} at {} with {} sectors",trk.sequence,trk.start_sector,trk.sectors);
            self.next_sector = trk.start_sector + trk.sectors;
            self.tracks.push(trk);
        }
        self.next_index = 2;
    }
    fn parse(mut self,txt: &str) -> Result<TocDisc,DYNERR> {
        for line in txt.lines() {
            self.line_num += 1;
            let line = line.trim_matches(char::from(0));
            if line.trim().is_empty() {
                continue;
            }
            self.parse_line(line)?;
        }
        self.push_track();
        let disc_type = match self.disc_type {
            Some(t) => t,
            None => return Err(self.err("missing disc type"))
        };
        if self.tracks.is_empty() {
            return Err(self.err("no tracks"));
        }
        Ok(TocDisc {
            disc_type,
            mcn: self.mcn,
            comment: self.comments.join("\n"),
            cdtext: self.cdtext,
            tracks: self.tracks
        })
    }
    fn parse_line(&mut self,line: &str) -> Result<(),DYNERR> {
        if let Some(caps) = COMMENT.captures(line) {
            let c = &caps["comment"];
            if !c.starts_with(" Track ") && !c.starts_with(" length in bytes") {
                self.comments.push(c.trim().to_string());
            }
        } else if let Some(caps) = DISC_TYPE.captures(line) {
            self.disc_type = Some(DiscType::from_str(&caps["type"])?);
        } else if let Some(caps) = CATALOG.captures(line) {
            self.mcn = Some(caps["catalog"].to_string());
        } else if let Some(caps) = TRACK.captures(line) {
            self.parse_track(&caps["type"],caps.name("subchan").map(|m| m.as_str()))?;
        } else if let Some(caps) = COPY.captures(line) {
            self.track()?.copy = caps.name("no").is_none();
        } else if let Some(caps) = EMPHASIS.captures(line) {
            self.track()?.pre_emphasis = caps.name("no").is_none();
        } else if let Some(caps) = CHANNELS.captures(line) {
            self.track()?.four_channel = &caps["num"]=="FOUR";
        } else if let Some(caps) = ISRC.captures(line) {
            self.track()?.isrc = Some(caps["isrc"].to_string());
        } else if let Some(caps) = INDEX.captures(line) {
            let rel = self.msf(&caps["address"])?;
            let idx = self.next_index;
            let trk = self.track()?;
            let base = trk.start_sector + trk.pregap;
            trk.indexes.insert(idx,base + rel);
            self.next_index += 1;
        } else if let Some(caps) = START.captures(line) {
            let addr = match caps.name("address") {
                Some(m) => Some(self.msf(m.as_str())?),
                None => None
            };
            let trk = self.track()?;
            trk.pregap = match addr {
                Some(a) => a,
                None => trk.sectors
            };
            trk.indexes.insert(0,trk.start_sector);
        } else if let Some(caps) = PREGAP.captures(line) {
            let len = self.msf(&caps["length"])?;
            let trk = self.track()?;
            trk.zero_pregap += len;
            trk.sectors += len;
            trk.pregap = len;
            trk.indexes.insert(0,trk.start_sector);
        } else if let Some(caps) = ZERO.captures(line) {
            let len = match caps["length"].contains(':') {
                true => self.msf(&caps["length"])?,
                false => self.num(&caps["length"])? / 588
            };
            let kind = caps["kind"].to_string();
            let trk = self.track()?;
            if trk.file.is_empty() {
                trk.zero_pregap += len;
                trk.sectors += len;
            } else {
                warn!("{} following file data is not supported, ignoring",kind);
            }
        } else if let Some(caps) = AUDIO_FILE.captures(line) {
            let base = match caps.name("base_offset") {
                Some(m) => self.num(m.as_str())?,
                None => 0
            };
            let bare = match caps.name("bare_offset") {
                Some(m) => self.num(m.as_str())?,
                None => 0
            };
            let stride = self.track()?.stride() as u64;
            let start = match (caps.name("start"),caps.name("start_num")) {
                (Some(m),_) => self.msf(m.as_str())? * stride,
                (None,Some(m)) => self.num(m.as_str())? * 4,
                _ => 0
            };
            let len = match caps.name("length") {
                Some(m) if m.as_str().contains(':') => Some(self.msf(m.as_str())?),
                Some(m) => Some(self.num(m.as_str())? * 4 / stride),
                None => None
            };
            self.add_file(&caps["filename"],base + bare + start,len)?;
        } else if let Some(caps) = DATA_FILE.captures(line) {
            let base = match caps.name("base_offset") {
                Some(m) => self.num(m.as_str())?,
                None => 0
            };
            let stride = self.track()?.stride() as u64;
            let len = match caps.name("length") {
                Some(m) if m.as_str().contains(':') => Some(self.msf(m.as_str())?),
                Some(m) => Some(self.num(m.as_str())? / stride),
                None => None
            };
            self.add_file(&caps["filename"],base,len)?;
        } else if let Some(caps) = CD_TEXT.captures(line) {
            let val = caps["value"].replace("\\\"","\"");
            match self.current.as_mut() {
                Some(trk) => trk.cdtext.set(&caps["key"],&val),
                None => self.cdtext.set(&caps["key"],&val)
            }
        } else if CD_TEXT_BLOCK.is_match(line) {
            trace!("line {}: CD-Text structure",self.line_num);
        } else {
            debug!("line {}: ignoring `{}`",self.line_num,line.trim());
        }
        Ok(())
    }
    fn parse_track(&mut self,mode: &str,subchan: Option<&str>) -> Result<(),DYNERR> {
        let mode = match TrackMode::from_str(mode) {
            Ok(m) => m,
            Err(_) => return Err(self.err(&format!("unknown track mode {}",mode)))
        };
        let subchannel = match subchan {
            None => SubchannelMode::None,
            Some("RW") => SubchannelMode::Packed,
            Some("RW_RAW") => SubchannelMode::Raw,
            Some(s) => return Err(self.err(&format!("unknown subchannel mode {}",s)))
        };
        self.push_track();
        let sequence = self.tracks.len() as u32 + 1;
        self.current = Some(TocTrack::new(sequence,mode,subchannel,self.next_sector));
        Ok(())
    }
    fn add_file(&mut self,name: &str,offset: u64,len: Option<u64>) -> Result<(),DYNERR> {
        if !self.track()?.file.is_empty() {
            warn!("line {}: more than one file in a track is not supported, ignoring",self.line_num);
            return Ok(());
        }
        let stride = self.track()?.stride() as u64;
        let sectors = match len {
            Some(l) => l,
            None => match self.src.len(name) {
                Ok(flen) => flen.saturating_sub(offset) / stride,
                Err(_) => return Err(self.err(&format!("cannot find length of {}",name)))
            }
        };
        let trk = self.track()?;
        trk.file = name.to_string();
        trk.file_offset = offset;
        trk.sectors += sectors;
        Ok(())
    }
}

/// Parse TOC text, data files are consulted only when a length has to be inferred
pub fn parse(txt: &str,src: &dyn ByteSource) -> Result<TocDisc,DYNERR> {
    Parser::new(src).parse(txt)
}

#[cfg(test)]
use crate::img::cd::source::MemSource;

#[test]
fn audio_file_forms() {
    let src = MemSource::new();
    let disc = parse("CD_DA\nTRACK AUDIO\nAUDIOFILE \"a.wav\" 0 00:00:00 00:02:00\nTRACK AUDIO\nFILE \"a.wav\" #1000 00:02:00 00:01:00\n",&src).expect("parse failed");
    assert_eq!(disc.disc_type,DiscType::CdDa);
    assert_eq!(disc.tracks.len(),2);
    assert_eq!(disc.tracks[0].sectors,150);
    assert_eq!(disc.tracks[0].file_offset,0);
    assert_eq!(disc.tracks[1].start_sector,150);
    assert_eq!(disc.tracks[1].file_offset,1000 + 150*2352);
    assert_eq!(disc.tracks[1].sectors,75);
    assert_eq!(disc.tracks[1].indexes.get(&1),Some(&150));
}

#[test]
fn length_from_file() {
    let mut src = MemSource::new();
    src.add("d.bin",vec![0;2048*10]);
    let disc = parse("CD_ROM\n// made by hand\nTRACK MODE1\nDATAFILE \"d.bin\"\n",&src).expect("parse failed");
    assert_eq!(disc.tracks[0].sectors,10);
    assert_eq!(disc.comment,"made by hand");
}

#[test]
fn pregaps_and_indexes() {
    let src = MemSource::new();
    let toc = "CD_ROM\nTRACK MODE1\nDATAFILE \"d.bin\" 00:10:00\nTRACK AUDIO RW_RAW\nCOPY\nISRC \"USABC1234567\"\nPREGAP 00:01:00\nFILE \"a.bin\" 0 00:20:00\nINDEX 00:05:00\nTRACK AUDIO\nFILE \"a.bin\" 00:20:00 00:10:00\nSTART 00:02:00\n";
    let disc = parse(toc,&src).expect("parse failed");
    let t2 = &disc.tracks[1];
    assert_eq!(t2.start_sector,750);
    assert_eq!(t2.zero_pregap,75);
    assert_eq!(t2.sectors,75 + 1500);
    assert_eq!(t2.indexes.get(&0),Some(&750));
    assert_eq!(t2.indexes.get(&1),Some(&825));
    assert_eq!(t2.indexes.get(&2),Some(&(825 + 375)));
    assert_eq!(t2.flags(),crate::img::cd::FLAG_COPY_PERMITTED);
    assert_eq!(t2.stride(),2448);
    let t3 = &disc.tracks[2];
    assert_eq!(t3.file_offset,1500*2352);
    assert_eq!(t3.pregap,150);
    assert_eq!(t3.indexes.get(&1),Some(&(t3.start_sector + 150)));
}

#[test]
fn bad_mode() {
    let src = MemSource::new();
    match parse("CD_ROM\n\nTRACK MODE3\n",&src) {
        Err(e) => match e.downcast_ref::<Error>() {
            Some(Error::Parse { line, msg: _ }) => assert_eq!(*line,3),
            _ => panic!("wrong error")
        },
        Ok(_) => panic!("bad mode accepted")
    }
}

#[test]
fn cd_text_scope() {
    let src = MemSource::new();
    let toc = "CD_DA\nCD_TEXT {\n  LANGUAGE_MAP {\n    0 : EN\n  }\n  LANGUAGE 0 {\n    TITLE \"Album\"\n  }\n}\nTRACK AUDIO\nCD_TEXT {\n  LANGUAGE 0 {\n    TITLE \"Song\"\n  }\n}\nSILENCE 00:01:00\n";
    let disc = parse(toc,&src).expect("parse failed");
    assert_eq!(disc.cdtext.title,Some("Album".to_string()));
    assert_eq!(disc.tracks[0].cdtext.title,Some("Song".to_string()));
    assert_eq!(disc.tracks[0].zero_pregap,75);
}

#[test]
fn identification() {
    assert!(identify(b"// comment\n\nCD_ROM_XA\n"));
    assert!(!identify(b"[CloneCD]\nVersion=3\n"));
    assert!(!identify(b"CD_DA\x00\x00"));
}
