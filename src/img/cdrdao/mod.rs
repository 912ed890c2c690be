//! # CDRDAO images
//!
//! A text TOC file names one or more data files holding the sectors.  Pregaps declared with
//! `START` are in the data, pregaps declared with `PREGAP` or `SILENCE` are not, and read as zeros.
//! Audio is stored big endian, it is swapped on the way in and out.
//!
//! Cooked tracks (`MODE1`, `MODE2_FORM1`, ...) keep only user data.  Long reads of these rebuild
//! the sync, header, and ECC from the absolute sector number.

pub mod parse;

use std::collections::{BTreeMap,HashMap};
use std::io::{Read,Seek,SeekFrom,Write};
use std::path::{Path,PathBuf};
use log::{debug,info,warn,error};
use parse::{TrackMode,TocDisc,TocTrack,DiscType};
use super::{Error,ImageInfo,DiskImageType,MediaType,MediaTag,SectorTag,OpticalImage,WritableOpticalImage};
use super::cd::{Track,SubchannelMode,CdText,sector,subchannel};
use super::cd::layout::DiscLayout;
use super::cd::source::{ByteSource,DirSource,ReadSeek};
use super::cd::toc::FullToc;
use crate::{STDRESULT,DYNERR};

pub fn file_extensions() -> Vec<String> {
    vec!["toc".to_string()]
}

/// Convert a parsed track into the shared track record
fn to_track(t: &TocTrack) -> Track {
    let mut ans = Track::new(t.sequence,t.mode.track_type(),t.start_sector,(t.start_sector + t.sectors).saturating_sub(1));
    ans.pregap = t.pregap;
    ans.indexes = t.indexes.iter().map(|(k,v)| (*k,*v as i64)).collect();
    if !ans.indexes.contains_key(&1) {
        ans.indexes.insert(1,(t.start_sector + t.pregap) as i64);
    }
    ans.bytes_per_sector = t.mode.track_type().cooked_size();
    ans.raw_bytes_per_sector = t.mode.stored_size();
    ans.file = t.file.clone();
    ans.file_offset = t.file_offset;
    ans.subchannel = t.subchannel;
    ans
}

/// (offset,size) of a tag within the stored record
fn tag_layout(mode: TrackMode,tag: SectorTag) -> Result<(usize,usize),DYNERR> {
    match (mode,tag) {
        (_,SectorTag::Apple) => Err(Box::new(Error::NotSupported)),
        (TrackMode::Audio,_) => Err(Box::new(Error::NotSupported)),
        (TrackMode::Mode1Raw,SectorTag::Sync) => Ok((0,12)),
        (TrackMode::Mode1Raw,SectorTag::Header) => Ok((12,4)),
        (TrackMode::Mode1Raw,SectorTag::SubHeader) => Err(Box::new(Error::NotSupported)),
        (TrackMode::Mode1Raw,SectorTag::Ecc) => Ok((2076,276)),
        (TrackMode::Mode1Raw,SectorTag::EccP) => Ok((2076,172)),
        (TrackMode::Mode1Raw,SectorTag::EccQ) => Ok((2248,104)),
        (TrackMode::Mode1Raw,SectorTag::Edc) => Ok((2064,4)),
        (TrackMode::Mode2Raw,SectorTag::Sync) => Ok((0,12)),
        (TrackMode::Mode2Raw,SectorTag::Header) => Ok((12,4)),
        (TrackMode::Mode2Raw,SectorTag::SubHeader) => Ok((16,8)),
        (TrackMode::Mode2Raw,_) => Err(Box::new(Error::NotSupported)),
        (TrackMode::Mode2 | TrackMode::Mode2FormMix,SectorTag::SubHeader) => Ok((0,8)),
        _ => Err(Box::new(Error::NoData))
    }
}

/// Opened CDRDAO image, read only.
/// CD-Text strings from the TOC are available through `disc`, binary CD-Text packs are
/// not synthesized, so `MediaTag::CdText` gives `NoData`.
pub struct CdrdaoImage {
    src: Box<dyn ByteSource>,
    disc: TocDisc,
    layout: DiscLayout,
    info: ImageInfo,
    streams: HashMap<String,Box<dyn ReadSeek>>
}

impl CdrdaoImage {
    /// Open the TOC file `toc_name` found in `src`, data files are opened as needed
    pub fn open(src: Box<dyn ByteSource>,toc_name: &str) -> Result<Self,DYNERR> {
        let buf = src.read_all(toc_name)?;
        if !parse::identify(&buf) {
            debug!("{} is not a CDRDAO TOC",toc_name);
            return Err(Box::new(Error::ImageTypeMismatch));
        }
        let disc = parse::parse(&String::from_utf8_lossy(&buf),src.as_ref())?;
        let layout = DiscLayout::resolve(disc.tracks.iter().map(to_track).collect())?;
        let meta = src.metadata(toc_name).ok();
        let mut readable_sector_tags = vec![SectorTag::TrackFlags];
        for t in &disc.tracks {
            let mut tags = match t.mode {
                TrackMode::Mode1Raw => vec![SectorTag::Sync,SectorTag::Header,SectorTag::Ecc,SectorTag::EccP,SectorTag::EccQ,SectorTag::Edc],
                TrackMode::Mode2Raw => vec![SectorTag::Sync,SectorTag::Header,SectorTag::SubHeader],
                TrackMode::Mode2 | TrackMode::Mode2FormMix => vec![SectorTag::SubHeader],
                _ => vec![]
            };
            if t.isrc.is_some() {
                tags.push(SectorTag::TrackIsrc);
            }
            if t.subchannel != SubchannelMode::None {
                tags.push(SectorTag::Subchannel);
            }
            for tag in tags {
                if !readable_sector_tags.contains(&tag) {
                    readable_sector_tags.push(tag);
                }
            }
        }
        let mut readable_media_tags = vec![MediaTag::FullToc];
        if disc.mcn.is_some() {
            readable_media_tags.push(MediaTag::Mcn);
        }
        let info = ImageInfo {
            image_type: DiskImageType::CDRDAO,
            media_type: match disc.disc_type {
                DiscType::CdDa => MediaType::CdDa,
                DiscType::CdRom => MediaType::CdRom,
                DiscType::CdRomXa => MediaType::CdRomXa,
                DiscType::CdI => MediaType::CdI
            },
            sectors: layout.sector_count(),
            sector_size: layout.tracks().iter().map(|t| t.bytes_per_sector).max().unwrap_or(2048),
            image_size: disc.tracks.iter().map(|t| (t.sectors - t.zero_pregap) * t.stride() as u64).sum(),
            application: Some("CDRDAO".to_string()),
            comments: match disc.comment.is_empty() {
                true => None,
                false => Some(disc.comment.clone())
            },
            created: meta.as_ref().and_then(|m| m.created),
            modified: meta.as_ref().and_then(|m| m.modified),
            readable_sector_tags,
            readable_media_tags
        };
        info!("CDRDAO image with {} tracks and {} sectors",disc.tracks.len(),info.sectors);
        Ok(Self {
            src,
            disc,
            layout,
            info,
            streams: HashMap::new()
        })
    }
    /// Open a TOC file on the host, data files are sought in the same directory
    pub fn open_file(path: &str) -> Result<Self,DYNERR> {
        let (src,name) = DirSource::for_file(path)?;
        Self::open(Box::new(src),&name)
    }
    /// The TOC as parsed, including CD-Text strings
    pub fn disc(&self) -> &TocDisc {
        &self.disc
    }
    /// Release the data file streams, they will be reopened if there is another read
    pub fn close(&mut self) {
        self.streams.clear();
    }
    fn track_index(&self,seq: u32) -> Result<usize,DYNERR> {
        match self.disc.tracks.iter().position(|t| t.sequence==seq) {
            Some(i) => Ok(i),
            None => {
                debug!("no track {}",seq);
                Err(Box::new(Error::NotFound))
            }
        }
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
    /// Stored records of `count` sectors starting at `rel`, each one stride long
    fn read_stored(&mut self,idx: usize,rel: u64,count: u32) -> Result<Vec<u8>,DYNERR> {
        let trk = &self.disc.tracks[idx];
        if rel + count as u64 > trk.sectors {
            debug!("read of {} sectors at {} exceeds track {}",count,rel,trk.sequence);
            return Err(Box::new(Error::OutOfRange));
        }
        let stride = trk.stride();
        let zeros = trk.zero_pregap.saturating_sub(rel).min(count as u64);
        let stored = count as u64 - zeros;
        let file = trk.file.clone();
        let mut ans = vec![0;zeros as usize * stride];
        if stored > 0 {
            // a read that begins in the zero pregap reaches the file at its first record
            let pos = trk.file_offset + (rel + zeros).saturating_sub(trk.zero_pregap) * stride as u64;
            let stream = self.stream(&file)?;
            let mut buf = vec![0;stored as usize * stride];
            stream.seek(SeekFrom::Start(pos)).map_err(Error::Unexpected)?;
            stream.read_exact(&mut buf).map_err(Error::Unexpected)?;
            ans.append(&mut buf);
        }
        Ok(ans)
    }
}

impl OpticalImage for CdrdaoImage {
    fn info(&self) -> &ImageInfo {
        &self.info
    }
    fn layout(&self) -> &DiscLayout {
        &self.layout
    }
    fn read_media_tag(&mut self,tag: MediaTag) -> Result<Vec<u8>,DYNERR> {
        match tag {
            MediaTag::Mcn => match &self.disc.mcn {
                Some(mcn) => Ok(mcn.as_bytes().to_vec()),
                None => Err(Box::new(Error::NoData))
            },
            MediaTag::FullToc => {
                let flags: BTreeMap<u32,u8> = self.disc.tracks.iter().map(|t| (t.sequence,t.flags())).collect();
                Ok(FullToc::create(self.layout.tracks(),&flags,false).to_bytes())
            },
            MediaTag::CdText => Err(Box::new(Error::NoData))
        }
    }
    fn read_sectors_in_track(&mut self,addr: u64,count: u32,track: u32) -> Result<Vec<u8>,DYNERR> {
        let idx = self.track_index(track)?;
        let mode = self.disc.tracks[idx].mode;
        let stride = self.disc.tracks[idx].stride();
        let buf = self.read_stored(idx,addr,count)?;
        let mut ans = Vec::new();
        for rec in buf.chunks_exact(stride) {
            match mode {
                TrackMode::Audio => {
                    let mut samples = rec[0..2352].to_vec();
                    sector::swap_audio(&mut samples);
                    ans.append(&mut samples);
                },
                TrackMode::Mode1 | TrackMode::Mode2Form1 => ans.extend_from_slice(&rec[0..2048]),
                TrackMode::Mode2Form2 => ans.extend_from_slice(&rec[0..2324]),
                TrackMode::Mode2 | TrackMode::Mode2FormMix => ans.append(&mut sector::extract_mode2_user_data(&rec[0..2336])),
                TrackMode::Mode1Raw => ans.extend_from_slice(&rec[16..2064]),
                TrackMode::Mode2Raw => ans.append(&mut sector::extract_mode2_user_data(&rec[0..2352]))
            }
        }
        Ok(ans)
    }
    fn read_sectors_tag_in_track(&mut self,addr: u64,count: u32,track: u32,tag: SectorTag) -> Result<Vec<u8>,DYNERR> {
        let idx = self.track_index(track)?;
        let trk = &self.disc.tracks[idx];
        let (mode,stride,sub) = (trk.mode,trk.stride(),trk.subchannel);
        match tag {
            SectorTag::TrackFlags => Ok(vec![trk.flags()]),
            SectorTag::TrackIsrc => match &trk.isrc {
                Some(isrc) => Ok(isrc.as_bytes().to_vec()),
                None => Err(Box::new(Error::NoData))
            },
            SectorTag::Subchannel => {
                if sub==SubchannelMode::None {
                    return Err(Box::new(Error::NoData));
                }
                let size = mode.stored_size();
                let buf = self.read_stored(idx,addr,count)?;
                let mut ans = Vec::new();
                for rec in buf.chunks_exact(stride) {
                    match sub {
                        SubchannelMode::Packed => ans.append(&mut subchannel::interleave(&rec[size..size+sector::SUBCHANNEL_SIZE])),
                        _ => ans.extend_from_slice(&rec[size..size+sector::SUBCHANNEL_SIZE])
                    }
                }
                Ok(ans)
            },
            _ => {
                let (offset,size) = tag_layout(mode,tag)?;
                let buf = self.read_stored(idx,addr,count)?;
                let mut ans = Vec::new();
                for rec in buf.chunks_exact(stride) {
                    ans.extend_from_slice(&rec[offset..offset+size]);
                }
                Ok(ans)
            }
        }
    }
    fn read_sectors_long_in_track(&mut self,addr: u64,count: u32,track: u32) -> Result<Vec<u8>,DYNERR> {
        let idx = self.track_index(track)?;
        let mode = self.disc.tracks[idx].mode;
        let stride = self.disc.tracks[idx].stride();
        let first_lba = match self.layout.offset_map().get(&track) {
            Some(start) => (start + addr) as i64,
            None => return Err(Box::new(Error::NotFound))
        };
        let buf = self.read_stored(idx,addr,count)?;
        let mut ans = Vec::new();
        for (i,rec) in buf.chunks_exact(stride).enumerate() {
            let lba = first_lba + i as i64;
            let mut raw = vec![0;sector::RAW_SECTOR_SIZE];
            match mode {
                TrackMode::Audio => {
                    raw.copy_from_slice(&rec[0..2352]);
                    sector::swap_audio(&mut raw);
                },
                TrackMode::Mode1Raw | TrackMode::Mode2Raw => raw.copy_from_slice(&rec[0..2352]),
                TrackMode::Mode1 => {
                    raw[16..2064].copy_from_slice(&rec[0..2048]);
                    sector::reconstruct_prefix(&mut raw,mode.track_type(),lba);
                    sector::reconstruct_ecc(&mut raw,mode.track_type());
                },
                TrackMode::Mode2Form1 => {
                    raw[24..2072].copy_from_slice(&rec[0..2048]);
                    sector::reconstruct_prefix(&mut raw,mode.track_type(),lba);
                    sector::reconstruct_ecc(&mut raw,mode.track_type());
                },
                TrackMode::Mode2Form2 => {
                    raw[24..2348].copy_from_slice(&rec[0..2324]);
                    sector::reconstruct_prefix(&mut raw,mode.track_type(),lba);
                    sector::reconstruct_ecc(&mut raw,mode.track_type());
                },
                TrackMode::Mode2 | TrackMode::Mode2FormMix => {
                    // subheader, EDC, and ECC are already in the 2336 bytes
                    raw[16..2352].copy_from_slice(&rec[0..2336]);
                    sector::reconstruct_prefix(&mut raw,mode.track_type(),lba);
                }
            }
            ans.append(&mut raw);
        }
        Ok(ans)
    }
}

/// Render the TOC text for a disc
pub fn toc_text(disc: &TocDisc) -> String {
    let mut ans = format!("{}\n\n",disc.disc_type);
    if !disc.comment.is_empty() {
        for line in disc.comment.lines() {
            ans += &format!("// {}\n",line);
        }
        ans += "\n";
    }
    if let Some(mcn) = &disc.mcn {
        ans += &format!("CATALOG \"{}\"\n\n",mcn);
    }
    let cdtext_block = |txt: &CdText,indent: &str,with_map: bool| -> String {
        let mut s = format!("{}CD_TEXT {{\n",indent);
        if with_map {
            s += &format!("{}  LANGUAGE_MAP {{\n{}    0 : EN\n{}  }}\n",indent,indent,indent);
        }
        s += &format!("{}  LANGUAGE 0 {{\n",indent);
        for (k,v) in txt.fields() {
            s += &format!("{}    {} \"{}\"\n",indent,k,v.replace('"',"\\\""));
        }
        s += &format!("{}  }}\n{}}}\n",indent,indent);
        s
    };
    if !disc.cdtext.is_empty() {
        ans += &cdtext_block(&disc.cdtext,"",true);
        ans += "\n";
    }
    for trk in &disc.tracks {
        ans += &format!("\n// Track {}\n",trk.sequence);
        ans += &format!("TRACK {}",trk.mode);
        match trk.subchannel {
            SubchannelMode::Raw => ans += " RW_RAW\n",
            SubchannelMode::Packed => ans += " RW\n",
            SubchannelMode::None => ans += "\n"
        }
        ans += match trk.copy {
            true => "COPY\n",
            false => "NO COPY\n"
        };
        if trk.mode==TrackMode::Audio {
            ans += match trk.pre_emphasis {
                true => "PRE_EMPHASIS\n",
                false => "NO PRE_EMPHASIS\n"
            };
            ans += match trk.four_channel {
                true => "FOUR_CHANNEL_AUDIO\n",
                false => "TWO_CHANNEL_AUDIO\n"
            };
        }
        if let Some(isrc) = &trk.isrc {
            ans += &format!("ISRC \"{}\"\n",isrc);
        }
        if !trk.cdtext.is_empty() {
            ans += &cdtext_block(&trk.cdtext,"",false);
        }
        let stored = trk.sectors - trk.zero_pregap;
        if trk.zero_pregap > 0 {
            ans += &format!("PREGAP {}\n",parse::format_msf(trk.zero_pregap));
        }
        if stored > 0 {
            match trk.mode {
                TrackMode::Audio => ans += &format!("AUDIOFILE \"{}\" #{} 0 {}\n",trk.file,trk.file_offset,parse::format_msf(stored)),
                _ => ans += &format!("DATAFILE \"{}\" #{} {} // length in bytes: {}\n",trk.file,trk.file_offset,
                    parse::format_msf(stored),stored * trk.stride() as u64)
            }
        }
        if trk.pregap > trk.zero_pregap {
            ans += &format!("START {}\n",parse::format_msf(trk.pregap - trk.zero_pregap));
        }
        for (_,abs) in trk.indexes.range(2..) {
            ans += &format!("INDEX {}\n",parse::format_msf(abs.saturating_sub(trk.start_sector + trk.pregap)));
        }
    }
    ans
}

/// Writes a TOC file and its data files, the TOC is only written on `close`
pub struct Writer {
    dir: PathBuf,
    toc_name: String,
    stem: String,
    separate_tracks: bool,
    media: MediaType,
    tracks: Vec<TocTrack>,
    layout: Option<DiscLayout>,
    streams: HashMap<String,std::fs::File>,
    mcn: Option<String>,
    comment: String,
    closed: bool
}

impl Writer {
    /// Prepare to write `path`, which should end in `.toc`.  Data goes in `<stem>.bin`, or
    /// in `<stem>_NN.bin` for each track if `separate_tracks` is set.
    pub fn create(path: &str,media: MediaType,separate_tracks: bool) -> Result<Self,DYNERR> {
        match media {
            MediaType::Cd | MediaType::CdDa | MediaType::CdRom | MediaType::CdRomXa | MediaType::CdI | MediaType::Unknown => {},
            m => {
                error!("CDRDAO cannot hold {}",m);
                return Err(Box::new(Error::NotSupported));
            }
        }
        let p = Path::new(path);
        let toc_name = match p.file_name() {
            Some(n) => n.to_string_lossy().to_string(),
            None => return Err(Box::new(Error::InvalidArgument))
        };
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
            toc_name,
            stem,
            separate_tracks,
            media,
            tracks: Vec::new(),
            layout: None,
            streams: HashMap::new(),
            mcn: None,
            comment: String::new(),
            closed: false
        })
    }
    pub fn set_comments(&mut self,comments: &str) {
        self.comment = comments.to_string();
    }
    fn check_open(&self) -> STDRESULT {
        match self.closed {
            true => Err(Box::new(Error::NotWritable)),
            false => Ok(())
        }
    }
    /// index of the track that holds `count` sectors at `addr`, and the relative address
    fn locate(&self,addr: u64,count: u32) -> Result<(usize,u64),DYNERR> {
        self.check_open()?;
        let layout = match &self.layout {
            Some(l) => l,
            None => {
                error!("tracks have not been set");
                return Err(Box::new(Error::NotWritable));
            }
        };
        let seq = match layout.track_for(addr) {
            Some(s) => s,
            None => {
                error!("no track contains sector {}",addr);
                return Err(Box::new(Error::NotFound));
            }
        };
        let idx = match self.tracks.iter().position(|t| t.sequence==seq) {
            Some(i) => i,
            None => return Err(Box::new(Error::NotFound))
        };
        let rel = addr - self.tracks[idx].start_sector;
        if rel + count as u64 > self.tracks[idx].sectors {
            error!("writing {} sectors at {} would cross the end of track {}",count,addr,seq);
            return Err(Box::new(Error::OutOfRange));
        }
        Ok((idx,rel))
    }
    /// Write records of `size` bytes, one per sector, skipping over any subchannel
    fn put(&mut self,idx: usize,rel: u64,dat: &[u8],size: usize) -> STDRESULT {
        let trk = &self.tracks[idx];
        let stride = trk.stride();
        let pos = trk.file_offset + rel * stride as u64;
        let stream = match self.streams.get_mut(&trk.file) {
            Some(s) => s,
            None => return Err(Box::new(Error::NotWritable))
        };
        if stride==size {
            stream.seek(SeekFrom::Start(pos)).map_err(Error::Unexpected)?;
            stream.write_all(dat).map_err(Error::Unexpected)?;
            return Ok(());
        }
        for (i,rec) in dat.chunks_exact(size).enumerate() {
            stream.seek(SeekFrom::Start(pos + (i * stride) as u64)).map_err(Error::Unexpected)?;
            stream.write_all(rec).map_err(Error::Unexpected)?;
        }
        Ok(())
    }
    fn disc_type(&self) -> DiscType {
        if self.media==MediaType::CdI {
            DiscType::CdI
        } else if self.tracks.iter().any(|t| t.mode.track_type().is_mode2()) {
            DiscType::CdRomXa
        } else if self.tracks.iter().any(|t| t.mode != TrackMode::Audio) {
            DiscType::CdRom
        } else {
            DiscType::CdDa
        }
    }
}

impl WritableOpticalImage for Writer {
    fn set_tracks(&mut self,mut tracks: Vec<Track>) -> STDRESULT {
        self.check_open()?;
        if tracks.is_empty() {
            return Err(Box::new(Error::InvalidArgument));
        }
        if tracks.iter().any(|t| t.subchannel==SubchannelMode::Packed) {
            error!("CDRDAO writer does not take packed subchannel");
            return Err(Box::new(Error::NotSupported));
        }
        tracks.sort_by_key(|t| t.sequence);
        let mut file_ends: HashMap<String,u64> = HashMap::new();
        let mut toc_tracks = Vec::new();
        for t in tracks.iter_mut() {
            let mode = TrackMode::for_track(t.track_type,t.raw_bytes_per_sector);
            let file = match self.separate_tracks {
                true => format!("{}_{:02}.bin",self.stem,t.sequence),
                false => format!("{}.bin",self.stem)
            };
            let mut trk = TocTrack {
                sequence: t.sequence,
                mode,
                subchannel: t.subchannel,
                copy: false,
                pre_emphasis: false,
                four_channel: false,
                isrc: None,
                cdtext: CdText::default(),
                file: file.clone(),
                file_offset: *file_ends.get(&file).unwrap_or(&0),
                start_sector: t.start_sector,
                sectors: t.sectors(),
                pregap: 0,
                zero_pregap: 0,
                indexes: BTreeMap::new()
            };
            let index1 = match t.indexes.get(&1) {
                Some(i) => *i,
                None => t.start_sector as i64
            };
            if index1 > t.start_sector as i64 {
                trk.pregap = index1 as u64 - t.start_sector;
            }
            for (k,v) in &t.indexes {
                if *v >= t.start_sector as i64 {
                    trk.indexes.insert(*k,*v as u64);
                }
            }
            file_ends.insert(file.clone(),trk.file_offset + trk.sectors * trk.stride() as u64);
            t.raw_bytes_per_sector = mode.stored_size();
            t.bytes_per_sector = mode.track_type().cooked_size();
            t.file = file;
            t.file_offset = trk.file_offset;
            toc_tracks.push(trk);
        }
        self.layout = Some(DiscLayout::resolve(tracks)?);
        self.streams.clear();
        for name in file_ends.keys() {
            let f = std::fs::File::create(self.dir.join(name)).map_err(Error::Unexpected)?;
            self.streams.insert(name.to_string(),f);
        }
        self.tracks = toc_tracks;
        Ok(())
    }
    fn write_media_tag(&mut self,dat: &[u8],tag: MediaTag) -> STDRESULT {
        self.check_open()?;
        match tag {
            MediaTag::Mcn => {
                self.mcn = Some(String::from_utf8_lossy(dat).trim_end_matches('\0').to_string());
                Ok(())
            },
            _ => {
                debug!("CDRDAO does not keep media tag {:?}",tag);
                Err(Box::new(Error::NotSupported))
            }
        }
    }
    fn write_sectors(&mut self,dat: &[u8],addr: u64,count: u32) -> STDRESULT {
        let (idx,rel) = self.locate(addr,count)?;
        let mode = self.tracks[idx].mode;
        let size = mode.stored_size();
        if mode.track_type().cooked_size() != size {
            error!("track {} is stored raw, use long writes",self.tracks[idx].sequence);
            return Err(Box::new(Error::NotSupported));
        }
        if dat.len() != count as usize * size {
            error!("expected {} bytes, got {}",count as usize * size,dat.len());
            return Err(Box::new(Error::InvalidArgument));
        }
        let mut buf = dat.to_vec();
        if mode==TrackMode::Audio {
            sector::swap_audio(&mut buf);
        }
        self.put(idx,rel,&buf,size)
    }
    fn write_sectors_long(&mut self,dat: &[u8],addr: u64,count: u32) -> STDRESULT {
        let (idx,rel) = self.locate(addr,count)?;
        let mode = self.tracks[idx].mode;
        if dat.len() != count as usize * sector::RAW_SECTOR_SIZE {
            error!("expected {} bytes, got {}",count as usize * sector::RAW_SECTOR_SIZE,dat.len());
            return Err(Box::new(Error::InvalidArgument));
        }
        let range = match mode {
            TrackMode::Audio | TrackMode::Mode1Raw | TrackMode::Mode2Raw => 0..2352,
            TrackMode::Mode1 => 16..2064,
            TrackMode::Mode2Form1 => 24..2072,
            TrackMode::Mode2Form2 => 24..2348,
            TrackMode::Mode2 | TrackMode::Mode2FormMix => 16..2352
        };
        let mut buf = Vec::with_capacity(count as usize * range.len());
        for rec in dat.chunks_exact(sector::RAW_SECTOR_SIZE) {
            buf.extend_from_slice(&rec[range.clone()]);
        }
        if mode==TrackMode::Audio {
            sector::swap_audio(&mut buf);
        }
        self.put(idx,rel,&buf,range.len())
    }
    fn write_sector_tag(&mut self,dat: &[u8],addr: u64,tag: SectorTag) -> STDRESULT {
        self.check_open()?;
        match tag {
            SectorTag::TrackFlags | SectorTag::TrackIsrc => {
                let trk = match self.tracks.iter_mut().find(|t| t.sequence as u64==addr) {
                    Some(t) => t,
                    None => {
                        error!("no track {}",addr);
                        return Err(Box::new(Error::NotFound));
                    }
                };
                if tag==SectorTag::TrackFlags {
                    if dat.len() != 1 {
                        return Err(Box::new(Error::InvalidArgument));
                    }
                    trk.copy = dat[0] & super::cd::FLAG_COPY_PERMITTED > 0;
                    trk.pre_emphasis = dat[0] & super::cd::FLAG_PRE_EMPHASIS > 0;
                    trk.four_channel = dat[0] & super::cd::FLAG_FOUR_CHANNEL > 0;
                } else {
                    let isrc = String::from_utf8_lossy(dat).trim_end_matches('\0').to_string();
                    trk.isrc = match isrc.is_empty() {
                        true => None,
                        false => Some(isrc)
                    };
                }
                Ok(())
            },
            SectorTag::Subchannel => {
                let (idx,rel) = self.locate(addr,1)?;
                if self.tracks[idx].subchannel != SubchannelMode::Raw {
                    error!("track {} has no subchannel",self.tracks[idx].sequence);
                    return Err(Box::new(Error::NotSupported));
                }
                if dat.len() != sector::SUBCHANNEL_SIZE {
                    return Err(Box::new(Error::InvalidArgument));
                }
                let trk = &self.tracks[idx];
                let pos = trk.file_offset + rel * trk.stride() as u64 + trk.mode.stored_size() as u64;
                let stream = match self.streams.get_mut(&trk.file) {
                    Some(s) => s,
                    None => return Err(Box::new(Error::NotWritable))
                };
                stream.seek(SeekFrom::Start(pos)).map_err(Error::Unexpected)?;
                stream.write_all(dat).map_err(Error::Unexpected)?;
                Ok(())
            },
            _ => {
                debug!("CDRDAO does not keep sector tag {}",tag);
                Err(Box::new(Error::NotSupported))
            }
        }
    }
    fn close(&mut self) -> STDRESULT {
        self.check_open()?;
        for (name,stream) in self.streams.iter_mut() {
            if let Err(e) = stream.flush() {
                warn!("could not flush {}",name);
                return Err(Box::new(Error::Unexpected(e)));
            }
        }
        self.streams.clear();
        let disc = TocDisc {
            disc_type: self.disc_type(),
            mcn: self.mcn.clone(),
            comment: self.comment.clone(),
            cdtext: CdText::default(),
            tracks: self.tracks.clone()
        };
        std::fs::write(self.dir.join(&self.toc_name),toc_text(&disc)).map_err(Error::Unexpected)?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
use super::cd::source::MemSource;

#[cfg(test)]
fn mixed_image() -> CdrdaoImage {
    let mut audio = vec![0u8;150*2352];
    for (i,b) in audio.iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    let mut data = vec![0u8;100*2048];
    for (i,b) in data.iter_mut().enumerate() {
        *b = (i % 253) as u8;
    }
    let mut src = MemSource::new();
    src.add("a.bin",audio);
    src.add("d.bin",data);
    src.add("t.toc","CD_ROM\nCATALOG \"0123456789012\"\nTRACK AUDIO\nFILE \"a.bin\" 0 00:02:00\nTRACK MODE1\nDATAFILE \"d.bin\"\n".as_bytes().to_vec());
    CdrdaoImage::open(Box::new(src),"t.toc").expect("open failed")
}

#[test]
fn audio_is_swapped() {
    let mut img = mixed_image();
    let dat = img.read_sector(0).expect("read failed");
    assert_eq!(dat.len(),2352);
    assert_eq!(dat[0..4],[1,0,3,2]);
    let long = img.read_sector_long(0).expect("read failed");
    assert_eq!(dat,long);
}

#[test]
fn cooked_mode1_long_read() {
    let mut img = mixed_image();
    assert_eq!(img.tracks()[1].start_sector,150);
    let cooked = img.read_sector(151).expect("read failed");
    assert_eq!(cooked[0],(2048 % 253) as u8);
    let long = img.read_sector_long(151).expect("read failed");
    assert_eq!(long[0..12],sector::SYNC);
    assert_eq!(long[12..16],[0x00,0x04,0x01,0x01]);
    assert_eq!(long[16..2064],cooked[..]);
    assert!(sector::edc_ok(&long,crate::img::cd::TrackType::CdMode1));
    match img.read_sector_tag(151,SectorTag::Edc) {
        Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::NoData))),
        Ok(_) => panic!("cooked track produced an EDC")
    }
}

#[test]
fn tags_and_bounds() {
    let mut img = mixed_image();
    assert_eq!(img.read_sector_tag(1,SectorTag::TrackFlags).expect("no flags"),vec![0]);
    assert_eq!(img.read_sector_tag(2,SectorTag::TrackFlags).expect("no flags"),vec![4]);
    assert_eq!(img.read_media_tag(MediaTag::Mcn).expect("no mcn"),b"0123456789012".to_vec());
    assert!(img.read_sectors(149,2).is_err());
    match img.read_sector(250) {
        Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::NotFound))),
        Ok(_) => panic!("read past the end")
    }
    assert_eq!(img.tracks()[0].indexes.get(&1),Some(&0));
    assert_eq!(img.info().sectors,250);
}
