//! # CloneCD images
//!
//! Three files share a stem: the `.ccd` descriptor, the `.img` with every sector in raw
//! 2352 byte form, and an optional `.sub` with 96 bytes of deinterleaved subchannel per sector.
//! Tracks are laid end to end in `.img`, starting from the index 1 of each track.  The pregap of
//! a track is stored at the end of the track before it, the pregap of track 1 is not stored.
//!
//! Data tracks can be stored scrambled, as the drive delivered them, which is undone on reading.

pub mod parse;

use std::collections::{BTreeMap,HashMap};
use std::io::{Read,Seek,SeekFrom,Write};
use std::path::{Path,PathBuf};
use log::{debug,trace,info,warn,error};
use parse::CcdDisc;
use super::{Error,ImageInfo,DiskImageType,MediaType,MediaTag,SectorTag,OpticalImage,WritableOpticalImage};
use super::cd::{Track,TrackType,SubchannelMode,sector,subchannel};
use super::cd::layout::DiscLayout;
use super::cd::source::{ByteSource,DirSource,ReadSeek};
use super::cd::toc::{self,FullToc,TocDescriptor};
use crate::{STDRESULT,DYNERR};

/// range of sectors examined when the mode of a data track has to be guessed
const PROBE_START: u64 = 225;
const PROBE_END: u64 = 750;
const RAW: u64 = sector::RAW_SECTOR_SIZE as u64;
const SUB: u64 = sector::SUBCHANNEL_SIZE as u64;

pub fn file_extensions() -> Vec<String> {
    vec!["ccd".to_string()]
}

/// Decode the media catalog number carried in an ADR 2 descriptor, 13 BCD digits
fn mcn_from_descriptor(d: &TocDescriptor) -> String {
    let mut ans = String::new();
    for b in [d.min,d.sec,d.frame,d.zero,d.pmin,d.psec,d.pframe] {
        ans += &format!("{:02x}",b);
    }
    ans.truncate(13);
    ans
}

fn mode_from_byte(m: u8) -> Option<TrackType> {
    match m {
        0 => Some(TrackType::Audio),
        1 => Some(TrackType::CdMode1),
        2 => Some(TrackType::CdMode2Formless),
        _ => None
    }
}

fn mode_to_byte(t: TrackType) -> u8 {
    match t {
        TrackType::Audio => 0,
        TrackType::Data | TrackType::CdMode1 => 1,
        _ => 2
    }
}

/// (offset,size) of user data or a tag in the raw sector
fn sector_layout(track_type: TrackType,tag: Option<SectorTag>) -> Result<(usize,usize),DYNERR> {
    use TrackType::*;
    match (track_type,tag) {
        (Audio,None) => Ok((0,2352)),
        (Audio,Some(_)) => Err(Box::new(Error::NotSupported)),
        (_,Some(SectorTag::Sync)) => Ok((0,12)),
        (_,Some(SectorTag::Header)) => Ok((12,4)),
        (Data | CdMode1,None) => Ok((16,2048)),
        (Data | CdMode1,Some(SectorTag::Ecc)) => Ok((2076,276)),
        (Data | CdMode1,Some(SectorTag::EccP)) => Ok((2076,172)),
        (Data | CdMode1,Some(SectorTag::EccQ)) => Ok((2248,104)),
        (Data | CdMode1,Some(SectorTag::Edc)) => Ok((2064,4)),
        (CdMode2Form1 | CdMode2Form2 | CdMode2Formless,Some(SectorTag::SubHeader)) => Ok((16,8)),
        (CdMode2Form1,None) => Ok((24,2048)),
        (CdMode2Form1,Some(SectorTag::Ecc)) => Ok((2076,276)),
        (CdMode2Form1,Some(SectorTag::EccP)) => Ok((2076,172)),
        (CdMode2Form1,Some(SectorTag::EccQ)) => Ok((2248,104)),
        (CdMode2Form1,Some(SectorTag::Edc)) => Ok((2072,4)),
        (CdMode2Form2,None) => Ok((24,2324)),
        (CdMode2Form2,Some(SectorTag::Edc)) => Ok((2348,4)),
        (CdMode2Formless,None) => Ok((16,2336)),
        _ => Err(Box::new(Error::NotSupported))
    }
}

/// Opened CloneCD image, read only
pub struct CloneCdImage {
    src: Box<dyn ByteSource>,
    ccd: CcdDisc,
    img_name: String,
    sub_name: Option<String>,
    layout: DiscLayout,
    info: ImageInfo,
    flags: BTreeMap<u32,u8>,
    mcn: Option<String>,
    streams: HashMap<String,Box<dyn ReadSeek>>
}

impl CloneCdImage {
    /// Open the CCD file `ccd_name` found in `src`.  If `toc` is given it is a binary
    /// full TOC that takes the place of the `[Entry]` sections.
    pub fn open(src: Box<dyn ByteSource>,ccd_name: &str,toc: Option<&[u8]>) -> Result<Self,DYNERR> {
        let buf = src.read_all(ccd_name)?;
        if !parse::identify(&buf) {
            debug!("{} is not a CloneCD descriptor",ccd_name);
            return Err(Box::new(Error::ImageTypeMismatch));
        }
        let ccd = parse::parse(&String::from_utf8_lossy(&buf),toc)?;
        let stem = match Path::new(ccd_name).file_stem() {
            Some(s) => s.to_string_lossy().to_string(),
            None => return Err(Box::new(Error::InvalidArgument))
        };
        let img_name = format!("{}.img",stem);
        let sub_name = match src.exists(&format!("{}.sub",stem)) {
            true => Some(format!("{}.sub",stem)),
            false => None
        };
        let img_len = src.len(&img_name)?;
        let mut ans = Self {
            src,
            ccd,
            img_name,
            sub_name,
            layout: DiscLayout::default(),
            info: ImageInfo {
                image_type: DiskImageType::CloneCD,
                media_type: MediaType::Cd,
                sectors: 0,
                sector_size: 2048,
                image_size: img_len,
                application: Some("CloneCD".to_string()),
                comments: None,
                created: None,
                modified: None,
                readable_sector_tags: Vec::new(),
                readable_media_tags: Vec::new()
            },
            flags: BTreeMap::new(),
            mcn: None,
            streams: HashMap::new()
        };
        let tracks = ans.reduce(img_len / RAW)?;
        ans.layout = DiscLayout::resolve(tracks)?;
        ans.finish_info(ccd_name);
        info!("CloneCD image with {} tracks and {} sectors",ans.layout.tracks().len(),ans.info.sectors);
        Ok(ans)
    }
    /// Open a CCD file on the host, `.img` and `.sub` are sought in the same directory
    pub fn open_file(path: &str) -> Result<Self,DYNERR> {
        let (src,name) = DirSource::for_file(path)?;
        Self::open(Box::new(src),&name,None)
    }
    pub fn ccd(&self) -> &CcdDisc {
        &self.ccd
    }
    /// Release the file streams, they will be reopened if there is another read
    pub fn close(&mut self) {
        self.streams.clear();
    }
    /// Turn the TOC descriptors into tracks, `img_sectors` bounds a session without a lead-out
    fn reduce(&mut self,img_sectors: u64) -> Result<Vec<Track>,DYNERR> {
        let mut tracks: Vec<Track> = Vec::new();
        let mut lead_outs: BTreeMap<u16,u64> = BTreeMap::new();
        for d in &self.ccd.entries {
            match d.adr {
                1 | 4 => match d.point {
                    toc::POINT_FIRST_TRACK => trace!("session {} disc type {:02x}",d.session,d.psec),
                    toc::POINT_LAST_TRACK => trace!("session {} last track {}",d.session,d.pmin),
                    toc::POINT_LEAD_OUT => {
                        lead_outs.insert(d.session as u16,d.p_lba().max(0) as u64);
                    },
                    1..=0x63 => {
                        let start = d.p_lba().max(0) as u64;
                        let track_type = match d.control & super::cd::FLAG_DATA {
                            0 => TrackType::Audio,
                            _ => TrackType::Data
                        };
                        let mut trk = Track::new(d.point as u32,track_type,start,start);
                        trk.session = d.session as u16;
                        self.flags.insert(trk.sequence,d.control);
                        tracks.push(trk);
                    },
                    p => debug!("skipping descriptor with point {:02x}",p)
                },
                2 => self.mcn = Some(mcn_from_descriptor(d)),
                5 => trace!("skipping mode 5 descriptor {:02x}",d.point),
                a => debug!("skipping descriptor with ADR {}",a)
            }
        }
        if let Some(mcn) = &self.ccd.mcn {
            self.mcn = Some(mcn.clone());
        }
        if tracks.is_empty() {
            error!("descriptor has no tracks");
            return Err(Box::new(Error::InvalidArgument));
        }
        // ends come from the next track in the session or the lead-out
        let mut file_sectors: u64 = 0;
        for i in 0..tracks.len() {
            let next_start = match tracks.get(i+1) {
                Some(next) if next.session==tracks[i].session => Some(next.start_sector),
                _ => lead_outs.get(&tracks[i].session).copied()
            };
            let start = match tracks[i].sequence {
                1 => 0,
                _ => tracks[i].start_sector
            };
            let end = match next_start {
                Some(n) if n > start => n - 1,
                Some(_) => start,
                None => {
                    warn!("session {} has no lead-out, using image length",tracks[i].session);
                    (start + img_sectors.saturating_sub(file_sectors)).saturating_sub(1).max(start)
                }
            };
            let trk = &mut tracks[i];
            if trk.sequence==1 {
                let index1 = trk.start_sector as i64;
                trk.start_sector = 0;
                trk.pregap = index1 as u64 + 150;
                trk.indexes.insert(0,-150);
                trk.indexes.insert(1,index1);
            }
            trk.end_sector = end;
            trk.raw_bytes_per_sector = sector::RAW_SECTOR_SIZE;
            trk.file = self.img_name.clone();
            trk.file_offset = file_sectors * RAW;
            if let Some(sub) = &self.sub_name {
                trk.subchannel = SubchannelMode::Packed;
                trk.subchannel_file = Some(sub.clone());
                trk.subchannel_offset = file_sectors * SUB;
            }
            file_sectors += trk.sectors();
        }
        if file_sectors > img_sectors {
            warn!("tracks need {} sectors but image has {}",file_sectors,img_sectors);
        }
        for trk in tracks.iter_mut() {
            if let Some(indexes) = self.ccd.track_indexes.get(&trk.sequence) {
                for (k,v) in indexes {
                    trk.indexes.insert(*k,*v);
                }
                if let Some(i0) = indexes.get(&0) {
                    if let Some(i1) = trk.indexes.get(&1) {
                        trk.pregap = (i1 - i0).max(0) as u64;
                    }
                }
            }
        }
        for i in 0..tracks.len() {
            let overridden = self.ccd.track_modes.get(&tracks[i].sequence).and_then(|m| mode_from_byte(*m));
            let track_type = match overridden {
                Some(t) => t,
                None if tracks[i].track_type==TrackType::Data => self.probe(&tracks[i])?,
                None => tracks[i].track_type
            };
            tracks[i].track_type = track_type;
            tracks[i].bytes_per_sector = track_type.cooked_size();
        }
        Ok(tracks)
    }
    /// Guess the mode of a data track from sync, mode byte, and subheader
    fn probe(&mut self,trk: &Track) -> Result<TrackType,DYNERR> {
        let n = trk.sectors();
        let range = match n > PROBE_START {
            true => PROBE_START..n.min(PROBE_END),
            false => 0..n
        };
        let (mut form1,mut form2,mut formless) = (false,false,false);
        for rel in range {
            let raw = self.read_raw(trk,rel,1)?;
            if !sector::sync_ok(&raw) {
                continue;
            }
            match raw[15] {
                1 => return Ok(TrackType::CdMode1),
                2 => match sector::mode2_form(&raw) {
                    TrackType::CdMode2Form1 => form1 = true,
                    TrackType::CdMode2Form2 => form2 = true,
                    _ => formless = true
                },
                m => trace!("sector {} has mode {}",rel,m)
            }
        }
        let ans = match (form1,form2,formless) {
            (true,false,false) => TrackType::CdMode2Form1,
            (false,true,false) => TrackType::CdMode2Form2,
            (false,false,false) => TrackType::CdMode1,
            _ => TrackType::CdMode2Formless
        };
        debug!("track {} probed as {}",trk.sequence,ans);
        Ok(ans)
    }
    fn finish_info(&mut self,ccd_name: &str) {
        let meta = self.src.metadata(ccd_name).ok();
        let tracks = self.layout.tracks();
        let mut tags = vec![SectorTag::TrackFlags];
        for t in tracks {
            let more = match t.track_type {
                TrackType::Audio => vec![],
                TrackType::Data | TrackType::CdMode1 | TrackType::CdMode2Form1 => vec![SectorTag::Sync,SectorTag::Header,SectorTag::Ecc,SectorTag::EccP,SectorTag::EccQ,SectorTag::Edc],
                _ => vec![SectorTag::Sync,SectorTag::Header,SectorTag::SubHeader]
            };
            for tag in more {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            if t.track_type==TrackType::CdMode2Form1 && !tags.contains(&SectorTag::SubHeader) {
                tags.push(SectorTag::SubHeader);
            }
        }
        if self.sub_name.is_some() {
            tags.push(SectorTag::Subchannel);
        }
        let mut media_tags = vec![MediaTag::FullToc];
        if self.mcn.is_some() {
            media_tags.push(MediaTag::Mcn);
        }
        if !self.ccd.cdtext.is_empty() {
            media_tags.push(MediaTag::CdText);
        }
        self.info.media_type = match tracks.iter().any(|t| t.track_type.is_mode2()) && self.ccd.entries.iter().any(|d| d.point==toc::POINT_FIRST_TRACK && d.psec==0x10) {
            true => MediaType::CdI,
            false => self.layout.media_type()
        };
        self.info.sectors = self.layout.sector_count();
        self.info.sector_size = tracks.iter().map(|t| t.bytes_per_sector).max().unwrap_or(2048);
        self.info.created = meta.as_ref().and_then(|m| m.created);
        self.info.modified = meta.as_ref().and_then(|m| m.modified);
        self.info.readable_sector_tags = tags;
        self.info.readable_media_tags = media_tags;
    }
    fn stream(&mut self,name: &str) -> Result<&mut Box<dyn ReadSeek>,DYNERR> {
        if !self.streams.contains_key(name) {
            let s = self.src.open(name)?;
            self.streams.insert(name.to_string(),s);
        }
        match self.streams.get_mut(name) {
            Some(s) => Ok(s),
            None => Err(Box::new(Error::NotFound))
        }
    }
    /// Raw sectors of a track, descrambled if need be
    fn read_raw(&mut self,trk: &Track,rel: u64,count: u32) -> Result<Vec<u8>,DYNERR> {
        if rel + count as u64 > trk.sectors() {
            debug!("read of {} sectors at {} exceeds track {}",count,rel,trk.sequence);
            return Err(Box::new(Error::OutOfRange));
        }
        let pos = trk.file_offset + rel * RAW;
        let scrambled = self.ccd.scrambled && !trk.track_type.is_audio();
        let file = trk.file.clone();
        let stream = self.stream(&file)?;
        let mut ans = vec![0;count as usize * sector::RAW_SECTOR_SIZE];
        stream.seek(SeekFrom::Start(pos)).map_err(Error::Unexpected)?;
        stream.read_exact(&mut ans).map_err(Error::Unexpected)?;
        if scrambled {
            for raw in ans.chunks_exact_mut(sector::RAW_SECTOR_SIZE) {
                sector::scramble(raw);
            }
        }
        Ok(ans)
    }
    fn track(&self,seq: u32) -> Result<Track,DYNERR> {
        match self.layout.track(seq) {
            Some(t) => Ok(t.clone()),
            None => {
                debug!("no track {}",seq);
                Err(Box::new(Error::NotFound))
            }
        }
    }
}

impl OpticalImage for CloneCdImage {
    fn info(&self) -> &ImageInfo {
        &self.info
    }
    fn layout(&self) -> &DiscLayout {
        &self.layout
    }
    fn read_media_tag(&mut self,tag: MediaTag) -> Result<Vec<u8>,DYNERR> {
        match tag {
            MediaTag::Mcn => match &self.mcn {
                Some(mcn) => Ok(mcn.as_bytes().to_vec()),
                None => Err(Box::new(Error::NoData))
            },
            MediaTag::FullToc => {
                let sessions: Vec<u8> = self.ccd.entries.iter().map(|d| d.session).collect();
                let full = FullToc {
                    first_session: sessions.iter().copied().min().unwrap_or(1),
                    last_session: sessions.iter().copied().max().unwrap_or(1),
                    descriptors: self.ccd.entries.clone()
                };
                Ok(full.to_bytes())
            },
            MediaTag::CdText => match self.ccd.cdtext.is_empty() {
                true => Err(Box::new(Error::NoData)),
                false => Ok(self.ccd.cdtext.clone())
            }
        }
    }
    fn read_sectors_in_track(&mut self,addr: u64,count: u32,track: u32) -> Result<Vec<u8>,DYNERR> {
        let trk = self.track(track)?;
        let raw = self.read_raw(&trk,addr,count)?;
        let mut ans = Vec::new();
        for rec in raw.chunks_exact(sector::RAW_SECTOR_SIZE) {
            if trk.track_type==TrackType::CdMode2Formless {
                ans.append(&mut sector::extract_mode2_user_data(rec));
            } else {
                let (offset,size) = sector_layout(trk.track_type,None)?;
                ans.extend_from_slice(&rec[offset..offset+size]);
            }
        }
        Ok(ans)
    }
    fn read_sectors_tag_in_track(&mut self,addr: u64,count: u32,track: u32,tag: SectorTag) -> Result<Vec<u8>,DYNERR> {
        let trk = self.track(track)?;
        match tag {
            SectorTag::TrackFlags => match self.flags.get(&track) {
                Some(f) => Ok(vec![*f]),
                None => Ok(vec![0])
            },
            SectorTag::TrackIsrc => Err(Box::new(Error::NoData)),
            SectorTag::Apple => Err(Box::new(Error::NotSupported)),
            SectorTag::Subchannel => {
                let name = match &trk.subchannel_file {
                    Some(n) => n.clone(),
                    None => return Err(Box::new(Error::NoData))
                };
                if addr + count as u64 > trk.sectors() {
                    return Err(Box::new(Error::OutOfRange));
                }
                let stream = self.stream(&name)?;
                let mut buf = vec![0;count as usize * sector::SUBCHANNEL_SIZE];
                stream.seek(SeekFrom::Start(trk.subchannel_offset + addr * SUB)).map_err(Error::Unexpected)?;
                stream.read_exact(&mut buf).map_err(Error::Unexpected)?;
                Ok(subchannel::interleave(&buf))
            },
            _ => {
                let (offset,size) = sector_layout(trk.track_type,Some(tag))?;
                let raw = self.read_raw(&trk,addr,count)?;
                let mut ans = Vec::new();
                for rec in raw.chunks_exact(sector::RAW_SECTOR_SIZE) {
                    ans.extend_from_slice(&rec[offset..offset+size]);
                }
                Ok(ans)
            }
        }
    }
    fn read_sectors_long_in_track(&mut self,addr: u64,count: u32,track: u32) -> Result<Vec<u8>,DYNERR> {
        let trk = self.track(track)?;
        self.read_raw(&trk,addr,count)
    }
}

/// Writes the `.img`, `.sub`, and `.ccd` triplet, the descriptor is only written on `close`.
/// All sector data has to come in raw.
pub struct Writer {
    dir: PathBuf,
    stem: String,
    /// value of `Version` in the descriptor
    pub ccd_version: u32,
    layout: Option<DiscLayout>,
    img: Option<std::fs::File>,
    sub: Option<std::fs::File>,
    flags: BTreeMap<u32,u8>,
    mcn: Option<String>,
    full_toc: Option<FullToc>,
    cdtext: Vec<u8>,
    closed: bool
}

impl Writer {
    /// Prepare to write `path`, which should end in `.ccd`
    pub fn create(path: &str) -> Result<Self,DYNERR> {
        let p = Path::new(path);
        let stem = match p.file_stem() {
            Some(s) => s.to_string_lossy().to_string(),
            None => return Err(Box::new(Error::InvalidArgument))
        };
        let dir = match p.parent() {
            Some(d) => d.to_path_buf(),
            None => PathBuf::from(".")
        };
        Ok(Self {
            dir,
            stem,
            ccd_version: 3,
            layout: None,
            img: None,
            sub: None,
            flags: BTreeMap::new(),
            mcn: None,
            full_toc: None,
            cdtext: Vec::new(),
            closed: false
        })
    }
    fn check_open(&self) -> STDRESULT {
        match self.closed {
            true => Err(Box::new(Error::NotWritable)),
            false => Ok(())
        }
    }
    fn locate(&self,addr: u64,count: u32) -> Result<Track,DYNERR> {
        self.check_open()?;
        let layout = match &self.layout {
            Some(l) => l,
            None => {
                error!("tracks have not been set");
                return Err(Box::new(Error::NotWritable));
            }
        };
        let trk = match layout.track_for(addr).and_then(|seq| layout.track(seq)) {
            Some(t) => t,
            None => {
                error!("no track contains sector {}",addr);
                return Err(Box::new(Error::NotFound));
            }
        };
        if addr + count as u64 > trk.end_sector + 1 {
            error!("writing {} sectors at {} would cross the end of track {}",count,addr,trk.sequence);
            return Err(Box::new(Error::OutOfRange));
        }
        Ok(trk.clone())
    }
    fn put_raw(&mut self,trk: &Track,addr: u64,dat: &[u8]) -> STDRESULT {
        let pos = trk.file_offset + (addr - trk.start_sector) * RAW;
        let img = match self.img.as_mut() {
            Some(f) => f,
            None => return Err(Box::new(Error::NotWritable))
        };
        img.seek(SeekFrom::Start(pos)).map_err(Error::Unexpected)?;
        img.write_all(dat).map_err(Error::Unexpected)?;
        Ok(())
    }
}

impl WritableOpticalImage for Writer {
    fn set_tracks(&mut self,mut tracks: Vec<Track>) -> STDRESULT {
        self.check_open()?;
        if tracks.is_empty() {
            return Err(Box::new(Error::InvalidArgument));
        }
        tracks.sort_by_key(|t| t.sequence);
        let mut file_sectors = 0;
        let with_sub = tracks.iter().any(|t| t.subchannel != SubchannelMode::None);
        for t in tracks.iter_mut() {
            t.raw_bytes_per_sector = sector::RAW_SECTOR_SIZE;
            t.file = format!("{}.img",self.stem);
            t.file_offset = file_sectors * RAW;
            if with_sub {
                t.subchannel = SubchannelMode::Packed;
                t.subchannel_file = Some(format!("{}.sub",self.stem));
                t.subchannel_offset = file_sectors * SUB;
            } else {
                t.subchannel = SubchannelMode::None;
                t.subchannel_file = None;
            }
            file_sectors += t.sectors();
        }
        self.layout = Some(DiscLayout::resolve(tracks)?);
        self.img = Some(std::fs::File::create(self.dir.join(format!("{}.img",self.stem))).map_err(Error::Unexpected)?);
        self.sub = match with_sub {
            true => Some(std::fs::File::create(self.dir.join(format!("{}.sub",self.stem))).map_err(Error::Unexpected)?),
            false => None
        };
        Ok(())
    }
    fn write_media_tag(&mut self,dat: &[u8],tag: MediaTag) -> STDRESULT {
        self.check_open()?;
        match tag {
            MediaTag::Mcn => self.mcn = Some(String::from_utf8_lossy(dat).trim_end_matches('\0').to_string()),
            MediaTag::FullToc => self.full_toc = Some(FullToc::from_bytes(dat)?),
            MediaTag::CdText => {
                if dat.len() % 18 != 0 {
                    error!("CD-Text of {} bytes is not whole packs",dat.len());
                    return Err(Box::new(Error::InvalidArgument));
                }
                self.cdtext = dat.to_vec();
            }
        }
        Ok(())
    }
    fn write_sectors(&mut self,dat: &[u8],addr: u64,count: u32) -> STDRESULT {
        let trk = self.locate(addr,count)?;
        if !trk.track_type.is_audio() {
            error!("CloneCD needs raw sectors, cooked data would need ECC generation");
            return Err(Box::new(Error::NotImplemented("ECC generation".to_string())));
        }
        self.write_sectors_long(dat,addr,count)
    }
    fn write_sectors_long(&mut self,dat: &[u8],addr: u64,count: u32) -> STDRESULT {
        let trk = self.locate(addr,count)?;
        if dat.len() != count as usize * sector::RAW_SECTOR_SIZE {
            error!("expected {} bytes, got {}",count as usize * sector::RAW_SECTOR_SIZE,dat.len());
            return Err(Box::new(Error::InvalidArgument));
        }
        self.put_raw(&trk,addr,dat)
    }
    fn write_sector_tag(&mut self,dat: &[u8],addr: u64,tag: SectorTag) -> STDRESULT {
        self.check_open()?;
        match tag {
            SectorTag::TrackFlags => {
                if dat.len() != 1 {
                    return Err(Box::new(Error::InvalidArgument));
                }
                let seq = u32::try_from(addr).map_err(|_| Error::NotFound)?;
                match self.layout.as_ref().and_then(|l| l.track(seq)) {
                    Some(_) => {
                        self.flags.insert(seq,dat[0]);
                        Ok(())
                    },
                    None => Err(Box::new(Error::NotFound))
                }
            },
            SectorTag::Subchannel => {
                let trk = self.locate(addr,1)?;
                if dat.len() != sector::SUBCHANNEL_SIZE {
                    return Err(Box::new(Error::InvalidArgument));
                }
                let sub = match self.sub.as_mut() {
                    Some(f) => f,
                    None => {
                        error!("tracks were set without subchannel");
                        return Err(Box::new(Error::NotSupported));
                    }
                };
                sub.seek(SeekFrom::Start(trk.subchannel_offset + (addr - trk.start_sector) * SUB)).map_err(Error::Unexpected)?;
                sub.write_all(&subchannel::deinterleave(dat)).map_err(Error::Unexpected)?;
                Ok(())
            },
            _ => {
                debug!("CloneCD does not keep sector tag {}",tag);
                Err(Box::new(Error::NotSupported))
            }
        }
    }
    fn close(&mut self) -> STDRESULT {
        self.check_open()?;
        let layout = match self.layout.take() {
            Some(l) => l,
            None => return Err(Box::new(Error::NotWritable))
        };
        for f in [self.img.as_mut(),self.sub.as_mut()].into_iter().flatten() {
            f.flush().map_err(Error::Unexpected)?;
        }
        self.img = None;
        self.sub = None;
        let full = match self.full_toc.take() {
            Some(t) => t,
            None => FullToc::create(layout.tracks(),&self.flags,false)
        };
        let mut ccd = CcdDisc {
            version: self.ccd_version,
            toc_entries: full.descriptors.len(),
            sessions: full.last_session as u16,
            scrambled: false,
            cdtext_length: self.cdtext.len(),
            mcn: self.mcn.clone(),
            entries: full.descriptors,
            cdtext: self.cdtext.clone(),
            ..Default::default()
        };
        for s in layout.sessions() {
            if let Some(first) = layout.track(s.start_track) {
                ccd.pregap_modes.insert(s.sequence,mode_to_byte(first.track_type));
                ccd.pregap_subc.insert(s.sequence,0);
            }
        }
        for t in layout.tracks() {
            ccd.track_modes.insert(t.sequence,mode_to_byte(t.track_type));
            let indexes: BTreeMap<u16,i64> = t.indexes.iter().filter(|(_,v)| **v >= 0).map(|(k,v)| (*k,*v)).collect();
            ccd.track_indexes.insert(t.sequence,indexes);
        }
        std::fs::write(self.dir.join(format!("{}.ccd",self.stem)),parse::ccd_text(&ccd)).map_err(Error::Unexpected)?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
use super::cd::source::MemSource;

#[cfg(test)]
fn mode1_sector(lba: i64,fill: u8) -> Vec<u8> {
    let mut raw = vec![fill;sector::RAW_SECTOR_SIZE];
    sector::reconstruct_prefix(&mut raw,TrackType::CdMode1,lba);
    sector::reconstruct_ecc(&mut raw,TrackType::CdMode1);
    raw
}

#[cfg(test)]
fn sample_source(scrambled: bool) -> MemSource {
    let mut img = Vec::new();
    for lba in 0..75 {
        let mut raw = mode1_sector(lba,lba as u8);
        if scrambled {
            sector::scramble(&mut raw);
        }
        img.append(&mut raw);
    }
    let mut ccd = "[CloneCD]\nVersion=3\n[Disc]\nTocEntries=2\nSessions=1\n".to_string();
    ccd += &format!("DataTracksScrambled={}\n",scrambled as u8);
    ccd += "[Entry 0]\nSession=1\nPoint=0xa2\nADR=0x01\nControl=0x04\nPMin=0\nPSec=3\nPFrame=0\n";
    ccd += "[Entry 1]\nSession=1\nPoint=0x01\nADR=0x01\nControl=0x04\nPMin=0\nPSec=2\nPFrame=0\n";
    let mut src = MemSource::new();
    src.add("disc.ccd",ccd.into_bytes());
    src.add("disc.img",img);
    src.add("disc.sub",vec![0xff;75*96]);
    src
}

#[test]
fn probe_and_read() {
    let mut img = CloneCdImage::open(Box::new(sample_source(false)),"disc.ccd",None).expect("open failed");
    assert_eq!(img.tracks().len(),1);
    assert_eq!(img.tracks()[0].track_type,TrackType::CdMode1);
    assert_eq!(img.tracks()[0].end_sector,74);
    assert_eq!(img.tracks()[0].pregap,150);
    assert_eq!(img.read_sector(5).expect("read failed"),vec![5;2048]);
    assert_eq!(img.read_sector_long(5).expect("read failed"),mode1_sector(5,5));
    assert_eq!(img.read_sector_tag(5,SectorTag::Header).expect("no header"),vec![0,2,0x05,1]);
    assert_eq!(img.read_sector_tag(5,SectorTag::Subchannel).expect("no subchannel"),vec![0xff;96]);
    assert_eq!(img.read_sector_tag(1,SectorTag::TrackFlags).expect("no flags"),vec![4]);
}

#[test]
fn descramble() {
    let mut img = CloneCdImage::open(Box::new(sample_source(true)),"disc.ccd",None).expect("open failed");
    assert_eq!(img.tracks()[0].track_type,TrackType::CdMode1);
    assert_eq!(img.read_sector_long(9).expect("read failed"),mode1_sector(9,9));
}
