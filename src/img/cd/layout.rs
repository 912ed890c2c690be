//! ## Track/offset resolver
//!
//! Turns the tracks produced by a descriptor parser into session-aware absolute addressing.
//! The resolved layout is immutable, writers build a new one each time tracks are set.

use std::collections::BTreeMap;
use log::{warn,error,trace};
use super::{Track,Session,Partition,TrackType};
use crate::img::Error;
use crate::DYNERR;

/// canonical pregap of the first track, 2 seconds
pub const FIRST_PREGAP: u64 = 150;

#[derive(Clone,Debug,Default)]
pub struct DiscLayout {
    tracks: Vec<Track>,
    sessions: Vec<Session>,
    partitions: Vec<Partition>,
    offset_map: BTreeMap<u32,u64>
}

impl DiscLayout {
    /// Resolve the tracks as given, in descriptor order.
    /// A track 1 anywhere but first is an error, lesser disorder is corrected with a warning.
    pub fn resolve(mut tracks: Vec<Track>) -> Result<Self,DYNERR> {
        for (i,trk) in tracks.iter().enumerate() {
            if trk.sequence==1 && i>0 {
                error!("track 1 appears at position {}",i);
                return Err(Box::new(Error::UnorderedTracks));
            }
        }
        if let Some(first) = tracks.first_mut() {
            if first.sequence==1 && first.pregap==0 && !first.indexes.contains_key(&0) {
                first.pregap = FIRST_PREGAP;
                first.indexes.insert(0,-(FIRST_PREGAP as i64));
            }
        }
        let mut offset_map: BTreeMap<u32,u64> = BTreeMap::new();
        for trk in &tracks {
            match offset_map.get(&trk.sequence) {
                None => {
                    offset_map.insert(trk.sequence,trk.start_sector);
                },
                Some(old) if trk.start_sector < *old => {
                    warn!("track {} appears twice, correcting start from {} to {}",trk.sequence,old,trk.start_sector);
                    offset_map.insert(trk.sequence,trk.start_sector);
                },
                Some(old) => {
                    warn!("track {} appears twice, keeping start {}",trk.sequence,old);
                }
            }
        }
        for pair in tracks.windows(2) {
            if pair[1].start_sector <= pair[0].end_sector && pair[1].sectors() > 0 {
                warn!("track {} overlaps track {}",pair[1].sequence,pair[0].sequence);
            }
        }
        let mut sessions: Vec<Session> = Vec::new();
        for trk in &tracks {
            match sessions.iter_mut().find(|s| s.sequence==trk.session) {
                Some(sess) => {
                    sess.start_track = sess.start_track.min(trk.sequence);
                    sess.end_track = sess.end_track.max(trk.sequence);
                    sess.start_sector = sess.start_sector.min(trk.start_sector);
                    sess.end_sector = sess.end_sector.max(trk.end_sector);
                },
                None => sessions.push(Session {
                    sequence: trk.session,
                    start_track: trk.sequence,
                    end_track: trk.sequence,
                    start_sector: trk.start_sector,
                    end_sector: trk.end_sector
                })
            }
        }
        sessions.sort_by_key(|s| s.sequence);
        let mut partitions = Vec::new();
        let mut offset: u64 = 0;
        for trk in &tracks {
            let length = trk.sectors();
            let size = length * trk.raw_bytes_per_sector as u64;
            trace!("track {} partition at {} with {} sectors",trk.sequence,trk.start_sector,length);
            partitions.push(Partition {
                sequence: trk.sequence,
                name: format!("Track {}",trk.sequence),
                kind: trk.track_type.to_string(),
                start: trk.start_sector,
                length,
                offset,
                size
            });
            offset += size;
        }
        Ok(Self {
            tracks,
            sessions,
            partitions,
            offset_map
        })
    }
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }
    pub fn offset_map(&self) -> &BTreeMap<u32,u64> {
        &self.offset_map
    }
    pub fn track(&self,sequence: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.sequence==sequence)
    }
    /// total sectors, up to the end of the last track
    pub fn sector_count(&self) -> u64 {
        match self.tracks.iter().map(|t| t.end_sector + 1).max() {
            Some(n) => n,
            None => 0
        }
    }
    /// Sequence number of the track owning the absolute address
    pub fn track_for(&self,addr: u64) -> Option<u32> {
        for trk in &self.tracks {
            if trk.contains(addr) {
                return Some(trk.sequence);
            }
        }
        None
    }
    /// (track sequence, address relative to the track's offset map entry)
    pub fn locate(&self,addr: u64) -> Result<(u32,u64),DYNERR> {
        if let Some(seq) = self.track_for(addr) {
            if let Some(start) = self.offset_map.get(&seq) {
                return Ok((seq,addr - start));
            }
        }
        Err(Box::new(Error::NotFound))
    }
    /// Media type from the mix of track types
    pub fn media_type(&self) -> crate::img::MediaType {
        if self.tracks.iter().any(|t| t.track_type.is_mode2()) {
            crate::img::MediaType::CdRomXa
        } else if self.tracks.iter().any(|t| t.track_type != TrackType::Audio) {
            crate::img::MediaType::CdRom
        } else if self.tracks.len() > 0 {
            crate::img::MediaType::CdDa
        } else {
            crate::img::MediaType::Cd
        }
    }
}

#[cfg(test)]
fn three_tracks() -> Vec<Track> {
    let mut ans = vec![
        Track::new(1,TrackType::Audio,0,299),
        Track::new(2,TrackType::Audio,300,449),
        Track::new(3,TrackType::CdMode1,450,999)
    ];
    ans[2].session = 2;
    ans
}

#[test]
fn offset_map_coverage() {
    let layout = DiscLayout::resolve(three_tracks()).expect("resolve failed");
    assert_eq!(layout.offset_map().len(),3);
    for trk in layout.tracks() {
        for addr in trk.start_sector..=trk.end_sector {
            assert_eq!(layout.track_for(addr),Some(trk.sequence));
        }
    }
    assert_eq!(layout.track_for(1000),None);
    assert_eq!(layout.locate(301).expect("locate failed"),(2,1));
    assert_eq!(layout.sector_count(),1000);
}

#[test]
fn first_track_pregap() {
    let layout = DiscLayout::resolve(three_tracks()).expect("resolve failed");
    assert_eq!(layout.tracks()[0].pregap,150);
    assert_eq!(layout.tracks()[0].indexes.get(&0),Some(&-150));
    assert_eq!(layout.tracks()[1].pregap,0);
}

#[test]
fn sessions_and_partitions() {
    let layout = DiscLayout::resolve(three_tracks()).expect("resolve failed");
    assert_eq!(layout.sessions().len(),2);
    assert_eq!(layout.sessions()[0].end_track,2);
    assert_eq!(layout.sessions()[0].end_sector,449);
    assert_eq!(layout.sessions()[1].start_sector,450);
    assert_eq!(layout.partitions()[1].size,150*2352);
    assert_eq!(layout.partitions()[2].offset,450*2352);
    assert_eq!(layout.media_type(),crate::img::MediaType::CdRom);
}

#[test]
fn misplaced_first_track() {
    let mut tracks = three_tracks();
    tracks.swap(0,1);
    match DiscLayout::resolve(tracks) {
        Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::UnorderedTracks))),
        Ok(_) => panic!("track 1 out of place was accepted")
    }
}

#[test]
fn duplicate_track_keeps_lower_start() {
    let mut tracks = three_tracks();
    let mut dup = Track::new(2,TrackType::Audio,250,260);
    dup.session = 1;
    tracks.push(dup);
    let layout = DiscLayout::resolve(tracks).expect("resolve failed");
    assert_eq!(layout.offset_map().get(&2),Some(&250));
}
