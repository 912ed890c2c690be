//! ## CloneCD CCD grammar
//!
//! The CCD file is INI style.  The `[Entry N]` sections are the descriptors of the full TOC,
//! everything about the tracks is derived from them, with `[TRACK N]` sections possibly
//! overriding the mode and indexes.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use regex::Regex;
use log::{debug,trace,warn,error};
use crate::img::Error;
use crate::img::cd::text_safe;
use crate::img::cd::toc::{FullToc,TocDescriptor,DESCRIPTOR_SIZE};
use crate::DYNERR;

static SECTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\[(?P<name>[A-Za-z]+)(?:\s+(?P<num>\d+))?\]\s*$").expect("regex parsing error"));
static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?P<key>[A-Za-z][A-Za-z0-9]*(?:\s+\d+)?)\s*=\s*(?P<value>.*?)\s*$").expect("regex parsing error"));
static INDEXED_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?P<key>[A-Za-z]+)\s+(?P<num>\d+)$").expect("regex parsing error"));

/// Versions of the CCD layout we have seen in the wild
pub const KNOWN_VERSIONS: [u32;2] = [2,3];
/// as many descriptors as the 16 bit length of a full TOC allows
pub const MAX_ENTRIES: i64 = ((u16::MAX as usize - 2) / DESCRIPTOR_SIZE) as i64;
/// highest session, track, or index number on a CD
pub const MAX_NUMBER: i64 = 99;

/// Everything a CCD file says about the disc
#[derive(Clone,Debug,Default,PartialEq)]
pub struct CcdDisc {
    pub version: u32,
    pub toc_entries: usize,
    pub sessions: u16,
    pub scrambled: bool,
    pub cdtext_length: usize,
    pub mcn: Option<String>,
    /// session to `PreGapMode`
    pub pregap_modes: BTreeMap<u16,u8>,
    /// session to `PreGapSubC`
    pub pregap_subc: BTreeMap<u16,u8>,
    pub entries: Vec<TocDescriptor>,
    /// raw CD-Text packs, 18 bytes each
    pub cdtext: Vec<u8>,
    /// track to `MODE` override
    pub track_modes: BTreeMap<u32,u8>,
    /// track to `INDEX n` overrides
    pub track_indexes: BTreeMap<u32,BTreeMap<u16,i64>>
}

#[derive(Clone,Copy,PartialEq,Debug)]
enum Section {
    Start,
    CloneCd,
    Disc,
    Session(u16),
    Entry(usize),
    Track(u32),
    CdText,
    Unknown
}

/// Would this buffer be the start of a CCD file
pub fn identify(buf: &[u8]) -> bool {
    if !text_safe(buf) {
        debug!("CCD rejected, binary data");
        return false;
    }
    let txt = String::from_utf8_lossy(buf);
    match txt.lines().map(|l| l.trim_matches(char::from(0)).trim()).find(|l| !l.is_empty()) {
        Some(first) => first=="[CloneCD]",
        None => false
    }
}

/// Parse a number as it appears in CCD values, hex needs the `0x` prefix
fn parse_num(s: &str) -> Option<i64> {
    let (neg,body) = match s.strip_prefix('-') {
        Some(b) => (true,b),
        None => (false,s)
    };
    let val = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex,16).ok()?,
        None => body.parse::<i64>().ok()?
    };
    Some(if neg { -val } else { val })
}

struct Parser {
    line_num: usize,
    section: Section,
    disc: CcdDisc
}

impl Parser {
    fn err(&self,msg: &str) -> DYNERR {
        error!("line {}: {}",self.line_num,msg);
        Box::new(Error::Parse { line: self.line_num, msg: msg.to_string() })
    }
    fn num(&self,val: &str) -> Result<i64,DYNERR> {
        parse_num(val).ok_or_else(|| self.err(&format!("bad number {}",val)))
    }
    fn byte(&self,val: &str) -> Result<u8,DYNERR> {
        u8::try_from(self.num(val)?).map_err(|_| self.err(&format!("{} does not fit in a byte",val)))
    }
    /// section or key number `n` checked against `lo..=hi`
    fn bounded(&self,n: i64,lo: i64,hi: i64,what: &str) -> Result<i64,DYNERR> {
        match n>=lo && n<=hi {
            true => Ok(n),
            false => Err(self.err(&format!("{} {} is out of range",what,n)))
        }
    }
    fn entry(&mut self,n: usize) -> &mut TocDescriptor {
        if self.disc.entries.len() <= n {
            self.disc.entries.resize(n + 1,TocDescriptor::default());
        }
        &mut self.disc.entries[n]
    }
    fn parse(mut self,txt: &str) -> Result<CcdDisc,DYNERR> {
        for line in txt.lines() {
            self.line_num += 1;
            let line = line.trim_matches(char::from(0));
            if line.trim().is_empty() {
                continue;
            }
            if let Some(caps) = SECTION.captures(line) {
                let num = match caps.name("num") {
                    Some(m) => Some(self.num(m.as_str())?),
                    None => None
                };
                self.section = match (&caps["name"].to_lowercase()[..],num) {
                    ("clonecd",None) => {
                        if self.section != Section::Start {
                            return Err(self.err("[CloneCD] must come first"));
                        }
                        Section::CloneCd
                    },
                    ("disc",None) => Section::Disc,
                    ("session",Some(n)) => Section::Session(self.bounded(n,1,MAX_NUMBER,"session")? as u16),
                    ("entry",Some(n)) => Section::Entry(self.bounded(n,0,MAX_ENTRIES-1,"entry")? as usize),
                    ("track",Some(n)) => Section::Track(self.bounded(n,1,MAX_NUMBER,"track")? as u32),
                    ("cdtext",None) => Section::CdText,
                    _ => {
                        warn!("line {}: unknown section {}",self.line_num,line.trim());
                        Section::Unknown
                    }
                };
                continue;
            }
            match KEY_VALUE.captures(line) {
                Some(caps) => self.parse_key(&caps["key"],&caps["value"])?,
                None => debug!("line {}: ignoring `{}`",self.line_num,line.trim())
            }
        }
        if self.section==Section::Start {
            return Err(self.err("missing [CloneCD]"));
        }
        if !KNOWN_VERSIONS.contains(&self.disc.version) {
            warn!("CCD version {} is unknown",self.disc.version);
        }
        if self.disc.toc_entries != self.disc.entries.len() {
            warn!("TocEntries is {} but there are {} entries",self.disc.toc_entries,self.disc.entries.len());
        }
        Ok(self.disc)
    }
    fn parse_key(&mut self,key: &str,val: &str) -> Result<(),DYNERR> {
        let (base,idx) = match INDEXED_KEY.captures(key) {
            Some(caps) => (caps["key"].to_string(),Some(self.num(&caps["num"])?)),
            None => (key.to_string(),None)
        };
        match (self.section,&base[..],idx) {
            (Section::CloneCd,"Version",None) => self.disc.version = self.num(val)? as u32,
            (Section::Disc,"TocEntries",None) => self.disc.toc_entries = self.num(val)? as usize,
            (Section::Disc,"Sessions",None) => self.disc.sessions = self.num(val)? as u16,
            (Section::Disc,"DataTracksScrambled",None) => self.disc.scrambled = self.num(val)? != 0,
            (Section::Disc,"CDTextLength",None) => self.disc.cdtext_length = self.num(val)? as usize,
            (Section::Disc,"CATALOG",None) => self.disc.mcn = Some(val.to_string()),
            (Section::Session(s),"PreGapMode",None) => {
                let v = self.byte(val)?;
                self.disc.pregap_modes.insert(s,v);
            },
            (Section::Session(s),"PreGapSubC",None) => {
                let v = self.byte(val)?;
                self.disc.pregap_subc.insert(s,v);
            },
            (Section::Entry(n),field,None) => {
                let v = self.num(val)?;
                let b = v as u8;
                if !["ALBA","PLBA"].contains(&field) && u8::try_from(v).is_err() {
                    return Err(self.err(&format!("{} does not fit in a byte",val)));
                }
                let d = self.entry(n);
                match field {
                    "Session" => d.session = b,
                    "Point" => d.point = b,
                    "ADR" => d.adr = b,
                    "Control" => d.control = b,
                    "TrackNo" => d.tno = b,
                    "AMin" => d.min = b,
                    "ASec" => d.sec = b,
                    "AFrame" => d.frame = b,
                    "Zero" => d.zero = b,
                    "PMin" => d.pmin = b,
                    "PSec" => d.psec = b,
                    "PFrame" => d.pframe = b,
                    "ALBA" | "PLBA" => trace!("{} is implied by the MSF",field),
                    _ => debug!("unknown entry key {}",field)
                }
            },
            (Section::CdText,"Entries",None) => trace!("{} CD-Text packs",val),
            (Section::CdText,"Entry",Some(_)) => {
                for hex in val.split_whitespace() {
                    match u8::from_str_radix(hex,16) {
                        Ok(b) => self.disc.cdtext.push(b),
                        Err(_) => return Err(self.err(&format!("bad CD-Text byte {}",hex)))
                    }
                }
            },
            (Section::Track(t),"MODE",None) => {
                let v = self.byte(val)?;
                self.disc.track_modes.insert(t,v);
            },
            (Section::Track(t),"INDEX",Some(i)) => {
                let i = self.bounded(i,0,MAX_NUMBER,"index")?;
                let v = self.num(val)?;
                self.disc.track_indexes.entry(t).or_default().insert(i as u16,v);
            },
            (Section::Start,_,_) => return Err(self.err("key before [CloneCD]")),
            _ => debug!("line {}: ignoring key {}",self.line_num,key)
        }
        Ok(())
    }
}

/// Parse CCD text.  If `toc` is given it is a binary full TOC whose descriptors replace
/// the `[Entry]` sections.
pub fn parse(txt: &str,toc: Option<&[u8]>) -> Result<CcdDisc,DYNERR> {
    let parser = Parser {
        line_num: 0,
        section: Section::Start,
        disc: CcdDisc::default()
    };
    let mut disc = parser.parse(txt)?;
    if let Some(blob) = toc {
        let full = FullToc::from_bytes(blob)?;
        debug!("using {} descriptors from the binary TOC",full.descriptors.len());
        disc.entries = full.descriptors;
        disc.toc_entries = disc.entries.len();
    }
    Ok(disc)
}

/// Render the CCD text for a disc
pub fn ccd_text(disc: &CcdDisc) -> String {
    let mut ans = format!("[CloneCD]\nVersion={}\n",disc.version);
    ans += "[Disc]\n";
    ans += &format!("TocEntries={}\n",disc.entries.len());
    ans += &format!("Sessions={}\n",disc.sessions);
    ans += &format!("DataTracksScrambled={}\n",disc.scrambled as u8);
    ans += &format!("CDTextLength={}\n",disc.cdtext.len());
    if let Some(mcn) = &disc.mcn {
        ans += &format!("CATALOG={}\n",mcn);
    }
    if !disc.cdtext.is_empty() {
        ans += "[CDText]\n";
        ans += &format!("Entries={}\n",disc.cdtext.len() / 18);
        for (i,pack) in disc.cdtext.chunks(18).enumerate() {
            let bytes: Vec<String> = pack.iter().map(|b| format!("{:02x}",b)).collect();
            ans += &format!("Entry {}={}\n",i,bytes.join(" "));
        }
    }
    for s in 1..=disc.sessions {
        ans += &format!("[Session {}]\n",s);
        ans += &format!("PreGapMode={}\n",disc.pregap_modes.get(&s).unwrap_or(&0));
        ans += &format!("PreGapSubC={}\n",disc.pregap_subc.get(&s).unwrap_or(&0));
    }
    for (i,d) in disc.entries.iter().enumerate() {
        ans += &format!("[Entry {}]\n",i);
        ans += &format!("Session={}\n",d.session);
        ans += &format!("Point=0x{:02x}\n",d.point);
        ans += &format!("ADR=0x{:02x}\n",d.adr);
        ans += &format!("Control=0x{:02x}\n",d.control);
        ans += &format!("TrackNo={}\n",d.tno);
        ans += &format!("AMin={}\nASec={}\nAFrame={}\n",d.min,d.sec,d.frame);
        ans += &format!("ALBA={}\n",d.a_lba());
        ans += &format!("Zero={}\n",d.zero);
        ans += &format!("PMin={}\nPSec={}\nPFrame={}\n",d.pmin,d.psec,d.pframe);
        ans += &format!("PLBA={}\n",d.p_lba());
    }
    for (t,mode) in &disc.track_modes {
        ans += &format!("[TRACK {}]\n",t);
        ans += &format!("MODE={}\n",mode);
        if let Some(indexes) = disc.track_indexes.get(t) {
            for (i,lba) in indexes {
                ans += &format!("INDEX {}={}\n",i,lba);
            }
        }
    }
    ans
}

#[cfg(test)]
const SAMPLE: &str = "[CloneCD]
Version=3
[Disc]
TocEntries=4
Sessions=1
DataTracksScrambled=0
CDTextLength=0
CATALOG=0123456789012
[Session 1]
PreGapMode=1
PreGapSubC=0
[Entry 0]
Session=1
Point=0xa0
ADR=0x01
Control=0x04
TrackNo=0
AMin=0
ASec=0
AFrame=0
ALBA=-150
Zero=0
PMin=1
PSec=0
PFrame=0
PLBA=4350
[Entry 1]
Session=1
Point=0xa1
ADR=0x01
Control=0x04
TrackNo=0
AMin=0
ASec=0
AFrame=0
ALBA=-150
Zero=0
PMin=1
PSec=0
PFrame=0
PLBA=4350
[Entry 2]
Session=1
Point=0xa2
ADR=0x01
Control=0x04
TrackNo=0
AMin=0
ASec=0
AFrame=0
ALBA=-150
Zero=0
PMin=0
PSec=3
PFrame=0
PLBA=75
[Entry 3]
Session=1
Point=0x01
ADR=0x01
Control=0x04
TrackNo=0
AMin=0
ASec=0
AFrame=0
ALBA=-150
Zero=0
PMin=0
PSec=2
PFrame=0
PLBA=0
[TRACK 1]
MODE=1
INDEX 1=0
";

#[test]
fn sample_ccd() {
    let disc = parse(SAMPLE,None).expect("parse failed");
    assert_eq!(disc.version,3);
    assert_eq!(disc.entries.len(),4);
    assert_eq!(disc.entries[2].p_lba(),75);
    assert_eq!(disc.entries[3].control,4);
    assert_eq!(disc.mcn,Some("0123456789012".to_string()));
    assert_eq!(disc.track_modes.get(&1),Some(&1));
    assert_eq!(disc.track_indexes.get(&1).and_then(|m| m.get(&1)),Some(&0));
}

#[test]
fn render_and_reparse() {
    let disc = parse(SAMPLE,None).expect("parse failed");
    let again = parse(&ccd_text(&disc),None).expect("reparse failed");
    assert_eq!(disc,again);
}

#[test]
fn misplaced_header() {
    match parse("[Disc]\nSessions=1\n[CloneCD]\nVersion=3\n",None) {
        Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::Parse { line: 3, msg: _ }))),
        Ok(_) => panic!("late [CloneCD] accepted")
    }
}

#[test]
fn numbers() {
    assert_eq!(parse_num("0xA2"),Some(0xa2));
    assert_eq!(parse_num("-150"),Some(-150));
    assert_eq!(parse_num("x"),None);
    assert!(identify(b"\r\n[CloneCD]\r\nVersion=3\r\n"));
    assert!(!identify(b"CD_ROM\n"));
}

#[test]
fn section_numbers_bounded() {
    for txt in [
        "[CloneCD]\nVersion=3\n[Entry 9000000000000000000]\nPoint=0xa0\n",
        "[CloneCD]\nVersion=3\n[Entry 1000000000]\nPoint=0xa0\n",
        "[CloneCD]\nVersion=3\n[Session 65537]\nPreGapMode=1\n",
        "[CloneCD]\nVersion=3\n[TRACK 0]\nMODE=1\n",
        "[CloneCD]\n[TRACK 1]\nINDEX 70000=0\n"
    ] {
        match parse(txt,None) {
            Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::Parse { line: 3, msg: _ }))),
            Ok(_) => panic!("out of range number accepted")
        }
    }
    let disc = parse("[CloneCD]\nVersion=3\n[Entry 5]\nPoint=0xa0\n",None).expect("parse failed");
    assert_eq!(disc.entries.len(),6);
}
