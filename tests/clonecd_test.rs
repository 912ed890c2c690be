// test of CloneCD reading and writing
use arckit::img::{self,OpticalImage,WritableOpticalImage,SectorTag,MediaTag,MediaType};
use arckit::img::cd::{sector,TrackType};
use arckit::img::cd::source::MemSource;
use arckit::img::clonecd::{CloneCdImage,Writer};
use arckit::img::cdrdao::CdrdaoImage;

fn mode1_sector(lba: i64,fill: u8) -> Vec<u8> {
    let mut raw = vec![fill;sector::RAW_SECTOR_SIZE];
    sector::reconstruct_prefix(&mut raw,TrackType::CdMode1,lba);
    sector::reconstruct_ecc(&mut raw,TrackType::CdMode1);
    raw
}

/// data track of 75 sectors followed by an audio track of 75 sectors
fn two_track_source() -> MemSource {
    let mut img = Vec::new();
    for lba in 0..75 {
        img.append(&mut mode1_sector(lba,lba as u8));
    }
    img.append(&mut vec![0x5a;75*2352]);
    let ccd = concat!(
        "[CloneCD]\nVersion=3\n",
        "[Disc]\nTocEntries=5\nSessions=1\nDataTracksScrambled=0\nCATALOG=0123456789012\n",
        "[Session 1]\nPreGapMode=1\nPreGapSubC=0\n",
        "[Entry 0]\nSession=1\nPoint=0xa0\nADR=0x01\nControl=0x04\nPMin=1\nPSec=0\nPFrame=0\n",
        "[Entry 1]\nSession=1\nPoint=0xa1\nADR=0x01\nControl=0x00\nPMin=2\nPSec=0\nPFrame=0\n",
        "[Entry 2]\nSession=1\nPoint=0xa2\nADR=0x01\nControl=0x00\nPMin=0\nPSec=4\nPFrame=0\n",
        "[Entry 3]\nSession=1\nPoint=0x01\nADR=0x01\nControl=0x04\nPMin=0\nPSec=2\nPFrame=0\n",
        "[Entry 4]\nSession=1\nPoint=0x02\nADR=0x01\nControl=0x00\nPMin=0\nPSec=3\nPFrame=0\n",
        "[TRACK 1]\nMODE=1\nINDEX 1=0\n",
        "[TRACK 2]\nMODE=0\nINDEX 1=75\n"
    );
    let mut src = MemSource::new();
    src.add("disc.ccd",ccd.as_bytes().to_vec());
    src.add("disc.img",img);
    src
}

#[test]
fn parse_and_read() {
    let mut img = CloneCdImage::open(Box::new(two_track_source()),"disc.ccd",None).expect("open failed");
    assert_eq!(img.tracks().len(),2);
    assert_eq!(img.tracks()[0].track_type,TrackType::CdMode1);
    assert_eq!(img.tracks()[1].track_type,TrackType::Audio);
    assert_eq!(img.tracks()[1].start_sector,75);
    assert_eq!(img.tracks()[1].end_sector,149);
    assert_eq!(img.read_sector(3).expect("read failed"),vec![3;2048]);
    assert_eq!(img.read_sector(100).expect("read failed"),vec![0x5a;2352]);
    assert_eq!(img.read_media_tag(MediaTag::Mcn).expect("no mcn"),b"0123456789012".to_vec());
    assert_eq!(img.read_sector_tag(2,SectorTag::TrackFlags).expect("no flags"),vec![0]);
    assert_eq!(img.read_sector_tag(3,SectorTag::Sync).expect("no sync"),sector::SYNC.to_vec());
    assert_eq!(img.read_sector_tag(3,SectorTag::Edc).expect("no edc").len(),4);
    assert_eq!(img.read_sector_tag(3,SectorTag::Ecc).expect("no ecc").len(),276);
    let err = img.read_sector_tag(3,SectorTag::Subchannel).expect_err("no sub file");
    assert!(err.downcast_ref::<img::Error>().is_some());
    let toc = img.read_media_tag(MediaTag::FullToc).expect("no full toc");
    assert_eq!(toc.len(),4 + 5*11);
}

#[test]
fn cooked_write_not_implemented() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let out = dir.path().join("new.ccd");
    let src = CloneCdImage::open(Box::new(two_track_source()),"disc.ccd",None).expect("open failed");
    let mut dst = Writer::create(out.to_str().expect("bad path")).expect("create failed");
    dst.set_tracks(src.tracks().to_vec()).expect("tracks refused");
    let err = dst.write_sector(&vec![0;2048],0).expect_err("cooked data track write");
    assert!(matches!(err.downcast_ref::<img::Error>(),Some(img::Error::NotImplemented(_))));
    // audio is raw anyway
    dst.write_sector(&vec![0;2352],80).expect("audio write failed");
}

#[test]
fn ccd_round_trip() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let out = dir.path().join("copy.ccd");
    let out_str = out.to_str().expect("bad path");
    let mut src = CloneCdImage::open(Box::new(two_track_source()),"disc.ccd",None).expect("open failed");
    let mut dst = Writer::create(out_str).expect("create failed");
    img::copy_optical(&mut src,&mut dst).expect("copy failed");
    let mut copy = CloneCdImage::open_file(out_str).expect("reopen failed");
    assert_eq!(copy.tracks().len(),2);
    assert_eq!(copy.read_media_tag(MediaTag::Mcn).expect("no mcn"),b"0123456789012".to_vec());
    for addr in [0,74,75,149] {
        assert_eq!(copy.read_sector_long(addr).expect("read failed"),src.read_sector_long(addr).expect("read failed"));
    }
}

#[test]
fn convert_to_cdrdao() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let out = dir.path().join("conv.toc");
    let out_str = out.to_str().expect("bad path");
    let mut src = CloneCdImage::open(Box::new(two_track_source()),"disc.ccd",None).expect("open failed");
    let mut dst = arckit::create_optical_writer(out_str,"toc",MediaType::CdRom,false).expect("create failed");
    img::copy_optical(&mut src,dst.as_mut()).expect("copy failed");
    let mut copy = CdrdaoImage::open_file(out_str).expect("reopen failed");
    assert_eq!(copy.tracks().len(),2);
    assert_eq!(copy.tracks()[0].track_type,TrackType::CdMode1);
    assert_eq!(copy.read_sector(10).expect("read failed"),vec![10;2048]);
    assert_eq!(copy.read_sector_long(10).expect("read failed"),mode1_sector(10,10));
    assert_eq!(copy.read_sector(120).expect("read failed"),vec![0x5a;2352]);
}
