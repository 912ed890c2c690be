//! ## Full TOC
//!
//! The binary TOC as returned by READ TOC/PMA/ATIP format 2: a big endian data length,
//! first and last session, then 11 byte descriptors.  CloneCD stores the same descriptors
//! as `[Entry N]` sections.

use std::collections::BTreeMap;
use log::debug;
use super::{Track,sector};
use crate::img::Error;
use crate::DYNERR;

pub const POINT_FIRST_TRACK: u8 = 0xa0;
pub const POINT_LAST_TRACK: u8 = 0xa1;
pub const POINT_LEAD_OUT: u8 = 0xa2;
pub const POINT_NEXT_SESSION: u8 = 0xb0;
pub const POINT_LEAD_IN: u8 = 0xc0;
pub const DESCRIPTOR_SIZE: usize = 11;

#[derive(Clone,Copy,Debug,PartialEq,Eq,Default)]
pub struct TocDescriptor {
    pub session: u8,
    pub adr: u8,
    pub control: u8,
    pub tno: u8,
    pub point: u8,
    pub min: u8,
    pub sec: u8,
    pub frame: u8,
    pub zero: u8,
    pub pmin: u8,
    pub psec: u8,
    pub pframe: u8
}

impl TocDescriptor {
    fn from_bytes(b: &[u8]) -> Self {
        Self {
            session: b[0],
            adr: b[1] >> 4,
            control: b[1] & 0x0f,
            tno: b[2],
            point: b[3],
            min: b[4],
            sec: b[5],
            frame: b[6],
            zero: b[7],
            pmin: b[8],
            psec: b[9],
            pframe: b[10]
        }
    }
    fn to_bytes(&self) -> [u8;DESCRIPTOR_SIZE] {
        [self.session,(self.adr << 4) | (self.control & 0x0f),self.tno,self.point,
            self.min,self.sec,self.frame,self.zero,self.pmin,self.psec,self.pframe]
    }
    /// absolute sector of the P address, hours in the zero byte are honored
    pub fn p_lba(&self) -> i64 {
        (self.zero & 0x0f) as i64 * 270000 + sector::msf_to_lba(self.pmin,self.psec,self.pframe)
    }
    /// absolute sector of the running address
    pub fn a_lba(&self) -> i64 {
        ((self.zero & 0xf0) >> 4) as i64 * 270000 + sector::msf_to_lba(self.min,self.sec,self.frame)
    }
    pub fn set_p_lba(&mut self,lba: i64) {
        (self.pmin,self.psec,self.pframe) = sector::lba_to_msf(lba);
    }
}

#[derive(Clone,Debug,PartialEq,Default)]
pub struct FullToc {
    pub first_session: u8,
    pub last_session: u8,
    pub descriptors: Vec<TocDescriptor>
}

impl FullToc {
    pub fn from_bytes(buf: &[u8]) -> Result<Self,DYNERR> {
        if buf.len() < 4 {
            debug!("full TOC of {} bytes is too short",buf.len());
            return Err(Box::new(Error::InvalidArgument));
        }
        let data_len = u16::from_be_bytes([buf[0],buf[1]]) as usize;
        if data_len + 2 > buf.len() || data_len < 2 || (data_len - 2) % DESCRIPTOR_SIZE != 0 {
            debug!("full TOC length field {} does not fit buffer of {}",data_len,buf.len());
            return Err(Box::new(Error::InvalidArgument));
        }
        let descriptors = buf[4..data_len+2].chunks_exact(DESCRIPTOR_SIZE).map(TocDescriptor::from_bytes).collect();
        Ok(Self {
            first_session: buf[2],
            last_session: buf[3],
            descriptors
        })
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        let data_len = (self.descriptors.len() * DESCRIPTOR_SIZE + 2) as u16;
        let mut ans = u16::to_be_bytes(data_len).to_vec();
        ans.push(self.first_session);
        ans.push(self.last_session);
        for d in &self.descriptors {
            ans.extend_from_slice(&d.to_bytes());
        }
        ans
    }
    /// Synthesize a TOC from resolved tracks.  Control nibbles come from `flags` keyed by
    /// track number, tracks without an entry get the data flag if they are not audio.
    /// If `with_lead_in` is set a multi-session disc also gets a C0 descriptor.
    pub fn create(tracks: &[Track],flags: &BTreeMap<u32,u8>,with_lead_in: bool) -> Self {
        let control = |t: &Track| -> u8 {
            match flags.get(&t.sequence) {
                Some(f) => *f & 0x0f,
                None if t.track_type.is_audio() => 0,
                None => super::FLAG_DATA
            }
        };
        let disc_type = match tracks.iter().any(|t| t.track_type.is_mode2()) {
            true => 0x20,
            false => 0x00
        };
        let mut sessions: BTreeMap<u16,Vec<&Track>> = BTreeMap::new();
        for t in tracks {
            sessions.entry(t.session).or_default().push(t);
        }
        let first_session = sessions.keys().next().copied().unwrap_or(1) as u8;
        let last_session = sessions.keys().last().copied().unwrap_or(1) as u8;
        let mut descriptors = Vec::new();
        let session_list: Vec<(u16,Vec<&Track>)> = sessions.into_iter().collect();
        for (i,(snum,trks)) in session_list.iter().enumerate() {
            let (first,last) = match (trks.first(),trks.last()) {
                (Some(f),Some(l)) => (*f,*l),
                _ => continue
            };
            let session = *snum as u8;
            let mut d = TocDescriptor { session, adr: 1, ..Default::default() };
            d.point = POINT_FIRST_TRACK;
            d.control = control(first);
            d.pmin = first.sequence as u8;
            d.psec = disc_type;
            descriptors.push(d);
            d.point = POINT_LAST_TRACK;
            d.control = control(last);
            d.pmin = last.sequence as u8;
            d.psec = 0;
            descriptors.push(d);
            d.point = POINT_LEAD_OUT;
            d.set_p_lba(last.end_sector as i64 + 1);
            descriptors.push(d);
            if i + 1 < session_list.len() {
                let mut b0 = TocDescriptor { session, adr: 5, point: POINT_NEXT_SESSION, ..Default::default() };
                if let Some(next) = session_list[i+1].1.first() {
                    (b0.min,b0.sec,b0.frame) = sector::lba_to_msf(next.start_sector as i64);
                }
                b0.zero = (session_list.len() - i - 1) as u8;
                (b0.pmin,b0.psec,b0.pframe) = (79,59,74);
                descriptors.push(b0);
                if i==0 && with_lead_in {
                    let mut c0 = TocDescriptor { session, adr: 5, point: POINT_LEAD_IN, ..Default::default() };
                    c0.pmin = 95;
                    descriptors.push(c0);
                }
            }
            for t in trks {
                let mut d = TocDescriptor { session, adr: 1, control: control(t), point: t.sequence as u8, ..Default::default() };
                let start = match t.indexes.get(&1) {
                    Some(i1) => *i1,
                    None => t.start_sector as i64
                };
                d.set_p_lba(start);
                descriptors.push(d);
            }
        }
        Self {
            first_session,
            last_session,
            descriptors
        }
    }
}

#[test]
fn encode_decode() {
    let mut d = TocDescriptor { session: 1, adr: 1, control: 4, point: 1, ..Default::default() };
    d.set_p_lba(0);
    let toc = FullToc { first_session: 1, last_session: 1, descriptors: vec![d] };
    let bytes = toc.to_bytes();
    assert_eq!(bytes,vec![0,13,1,1,1,0x14,0,1,0,0,0,0,0,2,0]);
    assert_eq!(FullToc::from_bytes(&bytes).expect("decode failed"),toc);
    assert!(FullToc::from_bytes(&bytes[0..10]).is_err());
}

#[test]
fn synthesized_toc() {
    let mut t1 = Track::new(1,super::TrackType::Audio,0,299);
    t1.indexes.insert(0,-150);
    let mut t2 = Track::new(2,super::TrackType::CdMode1,300,999);
    t2.session = 2;
    let toc = FullToc::create(&[t1,t2],&BTreeMap::new(),true);
    assert_eq!(toc.last_session,2);
    let points: Vec<u8> = toc.descriptors.iter().map(|d| d.point).collect();
    assert_eq!(points,vec![0xa0,0xa1,0xa2,0xb0,0xc0,1,0xa0,0xa1,0xa2,2]);
    assert_eq!(toc.descriptors[2].p_lba(),300);
    assert_eq!(toc.descriptors[9].control,4);
    assert_eq!(toc.descriptors[9].p_lba(),300);
}
