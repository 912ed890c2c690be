// test of CDRDAO reading and writing
use arckit::img::{self,OpticalImage,SectorTag,MediaTag,MediaType};
use arckit::img::cd::{sector,TrackType};
use arckit::img::cd::source::MemSource;
use arckit::img::cdrdao::{CdrdaoImage,Writer};

fn mixed_source() -> MemSource {
    let audio: Vec<u8> = (0..150*2352).map(|i| (i % 251) as u8).collect();
    let data: Vec<u8> = (0..100*2048).map(|i| (i % 253) as u8).collect();
    let mut src = MemSource::new();
    src.add("a.bin",audio);
    src.add("d.bin",data);
    src.add("t.toc",concat!(
        "CD_ROM\n",
        "// archived disc\n",
        "CATALOG \"0123456789012\"\n",
        "TRACK AUDIO\n",
        "COPY\n",
        "FILE \"a.bin\" 0 00:02:00\n",
        "TRACK MODE1\n",
        "DATAFILE \"d.bin\"\n"
    ).as_bytes().to_vec());
    src
}

// audio track with a silent pregap, then a data track with a two second pregap
fn pregap_source() -> MemSource {
    let audio: Vec<u8> = (0..150*2352).map(|i| (i % 251) as u8).collect();
    let data: Vec<u8> = (0..75*2048).map(|i| (i % 253) as u8).collect();
    let mut src = MemSource::new();
    src.add("a.bin",audio);
    src.add("d.bin",data);
    src.add("t.toc",concat!(
        "CD_ROM\n",
        "TRACK AUDIO\n",
        "FILE \"a.bin\" 0 00:02:00\n",
        "TRACK AUDIO\n",
        "PREGAP 00:01:00\n",
        "FILE \"a.bin\" 00:01:00 00:01:00\n",
        "TRACK MODE1\n",
        "PREGAP 00:02:00\n",
        "DATAFILE \"d.bin\"\n"
    ).as_bytes().to_vec());
    src
}

#[test]
fn audio_file_example() {
    let mut src = MemSource::new();
    src.add("test.bin",vec![0;150*2352]);
    src.add("test.toc",b"CD_DA\nTRACK AUDIO\nAUDIOFILE \"test.bin\" 0 00:00:00 00:02:00\n".to_vec());
    let img = CdrdaoImage::open(Box::new(src),"test.toc").expect("open failed");
    assert_eq!(img.tracks().len(),1);
    assert_eq!(img.tracks()[0].sectors(),150);
    assert_eq!(img.tracks()[0].bytes_per_sector,2352);
    assert_eq!(img.partitions()[0].size,150*2352);
    assert_eq!(img.info().media_type,MediaType::CdDa);
}

#[test]
fn read_mixed() {
    let mut img = CdrdaoImage::open(Box::new(mixed_source()),"t.toc").expect("open failed");
    assert_eq!(img.info().sectors,250);
    assert_eq!(img.tracks()[1].track_type,TrackType::CdMode1);
    assert_eq!(img.read_sector_tag(1,SectorTag::TrackFlags).expect("no flags"),vec![2]);
    assert_eq!(img.read_sectors(150,2).expect("read failed").len(),4096);
    let toc = img.read_media_tag(MediaTag::FullToc).expect("no full toc");
    assert!(toc.len() > 4);
    let err = img.read_sector_tag(1,SectorTag::TrackIsrc).expect_err("no isrc");
    assert!(err.downcast_ref::<img::Error>().is_some());
}

#[test]
fn write_then_parse() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let out = dir.path().join("copy.toc");
    let out_str = out.to_str().expect("bad path");
    let mut src = CdrdaoImage::open(Box::new(mixed_source()),"t.toc").expect("open failed");
    let mut dst = Writer::create(out_str,MediaType::CdRom,false).expect("create failed");
    img::copy_optical(&mut src,&mut dst).expect("copy failed");

    let mut copy = CdrdaoImage::open_file(out_str).expect("reopen failed");
    assert_eq!(copy.tracks().len(),2);
    for (a,b) in src.tracks().iter().zip(copy.tracks().iter()) {
        assert_eq!(a.sequence,b.sequence);
        assert_eq!(a.track_type,b.track_type);
        assert_eq!(a.start_sector,b.start_sector);
        assert_eq!(a.end_sector,b.end_sector);
    }
    assert_eq!(copy.read_media_tag(MediaTag::Mcn).expect("no mcn"),b"0123456789012".to_vec());
    assert_eq!(copy.read_sector_tag(1,SectorTag::TrackFlags).expect("no flags"),vec![2]);
    for addr in [0,75,149,150,200,249] {
        assert_eq!(copy.read_sector_long(addr).expect("read failed"),src.read_sector_long(addr).expect("read failed"));
    }
    assert_eq!(copy.read_sector(151).expect("read failed"),src.read_sector(151).expect("read failed"));
    assert!(dir.path().join("copy.bin").exists());
}

#[test]
fn read_pregap_sectors() {
    let mut img = CdrdaoImage::open(Box::new(pregap_source()),"t.toc").expect("open failed");
    assert_eq!(img.info().sectors,525);
    assert_eq!(img.tracks()[1].start_sector,150);
    assert_eq!(img.tracks()[1].indexes.get(&1),Some(&225));
    assert_eq!(img.tracks()[2].start_sector,300);
    assert_eq!(img.read_sector(150).expect("read failed"),vec![0;2352]);
    let first = img.read_sector(75).expect("read failed");
    assert_eq!(img.read_sector(225).expect("read failed"),first);
    // straddles the end of the pregap
    let span = img.read_sectors(220,10).expect("read failed");
    assert_eq!(span.len(),10*2352);
    assert!(span[0..5*2352].iter().all(|b| *b==0));
    assert_eq!(span[5*2352..].to_vec(),img.read_sectors(75,5).expect("read failed"));
    let long = img.read_sector_long(300).expect("read failed");
    assert_eq!(long[0..12],sector::SYNC);
    assert_eq!(long[12..16],[0x00,0x06,0x00,0x01]);
    assert!(long[16..2064].iter().all(|b| *b==0));
    assert!(sector::edc_ok(&long,TrackType::CdMode1));
    let data: Vec<u8> = (0..2048).map(|i| (i % 253) as u8).collect();
    assert_eq!(img.read_sector(450).expect("read failed"),data);
    assert_eq!(img.read_sectors(448,3).expect("read failed")[4096..].to_vec(),data);
}

#[test]
fn pregap_write_then_parse() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let out = dir.path().join("gaps.toc");
    let out_str = out.to_str().expect("bad path");
    let mut src = CdrdaoImage::open(Box::new(pregap_source()),"t.toc").expect("open failed");
    let mut dst = Writer::create(out_str,MediaType::CdRom,false).expect("create failed");
    img::copy_optical(&mut src,&mut dst).expect("copy failed");

    let mut copy = CdrdaoImage::open_file(out_str).expect("reopen failed");
    assert_eq!(copy.tracks().len(),3);
    for (a,b) in src.tracks().iter().zip(copy.tracks().iter()) {
        assert_eq!(a.sequence,b.sequence);
        assert_eq!(a.track_type,b.track_type);
        assert_eq!(a.start_sector,b.start_sector);
        assert_eq!(a.end_sector,b.end_sector);
    }
    assert_eq!(copy.tracks()[1].indexes.get(&1),Some(&225));
    assert_eq!(copy.tracks()[2].indexes.get(&1),Some(&450));
    for addr in [150,224,225,299,300,449,450,524] {
        assert_eq!(copy.read_sector_long(addr).expect("read failed"),src.read_sector_long(addr).expect("read failed"));
    }
}

#[test]
fn cd_text_strings_only() {
    let mut src = MemSource::new();
    src.add("a.bin",vec![0;75*2352]);
    src.add("t.toc",concat!(
        "CD_DA\n",
        "CD_TEXT {\n  LANGUAGE_MAP {\n    0 : EN\n  }\n  LANGUAGE 0 {\n    TITLE \"Album\"\n  }\n}\n",
        "TRACK AUDIO\n",
        "AUDIOFILE \"a.bin\" 0 00:01:00\n"
    ).as_bytes().to_vec());
    let mut img = CdrdaoImage::open(Box::new(src),"t.toc").expect("open failed");
    assert_eq!(img.disc().cdtext.title,Some("Album".to_string()));
    let err = img.read_media_tag(MediaTag::CdText).expect_err("packs are not synthesized");
    assert!(matches!(err.downcast_ref::<img::Error>(),Some(img::Error::NoData)));
}

#[test]
fn separate_track_files() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let out = dir.path().join("split.toc");
    let out_str = out.to_str().expect("bad path");
    let mut src = CdrdaoImage::open(Box::new(mixed_source()),"t.toc").expect("open failed");
    let mut dst = arckit::create_optical_writer(out_str,"toc",MediaType::CdRom,true).expect("create failed");
    img::copy_optical(&mut src,dst.as_mut()).expect("copy failed");
    assert!(dir.path().join("split_01.bin").exists());
    assert!(dir.path().join("split_02.bin").exists());
    let mut copy = arckit::create_optical_from_file(out_str).expect("reopen failed");
    assert_eq!(copy.read_sector(0).expect("read failed"),src.read_sector(0).expect("read failed"));
    assert_eq!(copy.tracks()[1].file,"split_02.bin");
}

#[test]
fn writer_rejects_lisa_media() {
    assert!(Writer::create("x.toc",MediaType::AppleProfile,false).is_err());
}
