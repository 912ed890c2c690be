// test of the Lisa file system on synthetic DiskCopy images
mod builders;

use arckit::fs::{DiskFS,FileAttributes};
use arckit::fs::lisa::{self,MountOptions};
use arckit::fs::lisa::types::{Error,LisaVersion};
use arckit::img::DiskImage;
use builders::*;

fn mount(version: u16,expose: bool) -> lisa::Disk {
    let img = LisaBuilder::standard(version).finish();
    let mut disk = lisa::Disk::from_img(Box::new(img),MountOptions { expose_system_files: expose });
    disk.mount().expect("mount failed");
    disk
}

fn fs_err(e: &Box<dyn std::error::Error>) -> &Error {
    e.downcast_ref::<Error>().expect("not a file system error")
}

#[test]
fn identify_all_versions() {
    for (v,expected) in [(V1,LisaVersion::V1),(V2,LisaVersion::V2),(V3,LisaVersion::V3)] {
        let mut img: Box<dyn DiskImage> = Box::new(LisaBuilder::standard(v).finish());
        assert!(lisa::Disk::test_img(&mut img));
        let mut disk = lisa::Disk::from_img(img,MountOptions::default());
        assert!(!disk.is_mounted());
        disk.mount().expect("mount failed");
        assert_eq!(disk.version(),Some(expected));
    }
}

#[test]
fn bad_mddf() {
    let mut b = LisaBuilder::standard(V2);
    let mut mddf = b.mddf(3);
    // volume size less one no longer agrees
    mddf[0x70..0x74].copy_from_slice(&123u32.to_be_bytes());
    b.sector(MDDF_ABS,&mddf);
    let mut img: Box<dyn DiskImage> = Box::new(b.finish());
    assert!(!lisa::Disk::test_img(&mut img));
    let mut disk = lisa::Disk::from_img(img,MountOptions::default());
    let err = disk.mount().expect_err("mount should fail");
    assert!(matches!(fs_err(&err),Error::InvalidArgument));
    assert!(!disk.is_mounted());
}

#[test]
fn too_small() {
    let img: Box<dyn DiskImage> = Box::new(arckit::img::dc42::Dc42::create("small",400,12));
    let mut disk = lisa::Disk::from_img(img,MountOptions::default());
    let err = disk.mount().expect_err("mount should fail");
    assert!(matches!(fs_err(&err),Error::InvalidArgument));
}

#[test]
fn unknown_version() {
    let mut b = LisaBuilder::standard(V2);
    b.version = 0x12;
    let mddf = b.mddf(3);
    b.sector(MDDF_ABS,&mddf);
    let mut disk = lisa::Disk::from_img(Box::new(b.finish()),MountOptions::default());
    let err = disk.mount().expect_err("mount should fail");
    assert!(matches!(fs_err(&err),Error::NotSupported));
}

#[test]
fn flat_catalog() {
    for v in [V1,V2] {
        let mut disk = mount(v,false);
        assert_eq!(disk.read_dir("/").expect("read_dir failed"),vec!["Hello","Notes-Draft"]);
        assert_eq!(disk.read_file("/HELLO").expect("read failed"),hello_data());
        assert_eq!(disk.read_file("Notes-Draft").expect("read failed"),vec![b'N';100]);
        let err = disk.stat("Stray").expect_err("stray entry should be skipped");
        assert!(matches!(fs_err(&err),Error::NotFound));
    }
}

#[test]
fn no_subdirectories_before_v3() {
    for v in [V1,V2] {
        let mut disk = mount(v,false);
        let err = disk.stat("a/b").expect_err("should not resolve");
        assert!(matches!(fs_err(&err),Error::NotSupported));
    }
}

#[test]
fn subdirectories() {
    let mut disk = mount(V3,false);
    assert_eq!(disk.read_dir("").expect("read_dir failed"),vec!["Hello","Notes-Draft","Projects"]);
    assert_eq!(disk.read_dir("/projects").expect("read_dir failed"),vec!["Plan"]);
    assert_eq!(disk.read_file("/Projects/Plan").expect("read failed"),b"plan text\n".to_vec());
    let stat = disk.stat("Projects").expect("stat failed");
    assert!(stat.attributes.contains(FileAttributes::DIRECTORY));
    assert_eq!(stat.created.expect("no date").format("%Y").to_string(),"1902");
    let err = disk.read_dir("Hello/x").expect_err("file is not a directory");
    assert!(matches!(fs_err(&err),Error::NotDirectory));
    let err = disk.read_file("Projects").expect_err("directory is not a file");
    assert!(matches!(fs_err(&err),Error::InvalidArgument));
    let tree = json::parse(&disk.tree(true,None).expect("tree failed")).expect("bad json");
    assert_eq!(tree["files"]["Projects"]["files"]["Plan"]["meta"]["eof"],10);
}

#[test]
fn catalog_corruption_tolerated() {
    let mut disk = mount(V3,false);
    let names = disk.read_dir("/").expect("read_dir failed");
    assert!(!names.contains(&"Ghost".to_string()));
    assert!(!names.contains(&"Loop".to_string()));
    // unknown marker ends the first block early, the second block still counts
    let mut b = LisaBuilder::standard(V3);
    let mut sec = vec![0u8;512];
    sec[0x24] = 0x08;
    sec[78+0x24] = 0x55;
    b.sector(CAT3_ABS,&sec);
    let mut disk = lisa::Disk::from_img(Box::new(b.finish()),MountOptions::default());
    disk.mount().expect("mount failed");
    assert!(disk.read_dir("/").expect("read_dir failed").len()==0);
    let err = disk.stat("Hello").expect_err("entry should be gone");
    assert!(matches!(fs_err(&err),Error::NotFound));
}

#[test]
fn stat_and_read() {
    let mut disk = mount(V3,false);
    let stat = disk.stat("Hello").expect("stat failed");
    assert_eq!(stat.length,HELLO_LEN as u64);
    assert_eq!(stat.blocks,2);
    assert_eq!(stat.inode,5);
    assert!(stat.attributes.contains(FileAttributes::FILE));
    assert!(stat.attributes.contains(FileAttributes::READ_ONLY));
    assert!(stat.attributes.contains(FileAttributes::PASSWORD));
    assert_eq!(stat.modified.expect("no date").format("%Y").to_string(),"1903");
    assert_eq!(disk.read("Hello",590,100).expect("read failed"),hello_data()[590..].to_vec());
    assert_eq!(disk.read("Hello",600,1).expect("read failed").len(),0);
    let err = disk.read("Hello",601,1).expect_err("offset past end");
    assert!(matches!(fs_err(&err),Error::InvalidArgument));
    let info = disk.stat_fs().expect("stat_fs failed");
    assert_eq!(info.fs_type,"LisaFS v3");
    assert_eq!(info.files,3);
    assert_eq!(info.free_files,0x7fff-3);
    assert_eq!(info.filename_length,32);
    assert_eq!(info.id,0x0123456789abcdef);
    let vol = json::parse(&disk.volume_info(None).expect("info failed")).expect("bad json");
    assert_eq!(vol["name"],"Archive");
    assert_eq!(vol["catalog_entries"],4);
}

#[test]
fn extents_length_bounds_read() {
    let mut b = LisaBuilder::standard(V2);
    // Hello extents at 30 claim one block of the two in its extent
    let mut ext = b.img.read_sector(30).expect("read failed");
    ext[0x80..0x84].copy_from_slice(&1u32.to_be_bytes());
    b.sector(30,&ext);
    // first data block carries another file's tag, still read
    b.tag(31,6,0);
    let mut disk = lisa::Disk::from_img(Box::new(b.finish()),MountOptions::default());
    disk.mount().expect("mount failed");
    assert_eq!(disk.read("Hello",0,600).expect("read failed"),hello_data()[0..512].to_vec());
    assert_eq!(disk.read_file("Notes-Draft").expect("read failed"),vec![b'N';100]);
}

#[test]
fn xattrs() {
    let mut disk = mount(V2,false);
    let names = disk.list_xattr("Hello").expect("list failed");
    assert_eq!(names,vec!["com.apple.lisa.password","com.apple.lisa.serial","com.apple.lisa.label"]);
    assert_eq!(disk.get_xattr("Hello","com.apple.lisa.serial").expect("get failed"),b"1234".to_vec());
    assert_eq!(&disk.get_xattr("Hello","com.apple.lisa.password").expect("get failed")[0..6],b"SECRET");
    let label = disk.get_xattr("Hello","com.apple.lisa.label").expect("get failed");
    assert_eq!(label.len(),128);
    assert_eq!(&label[0..9],b"LisaWrite");
    assert_eq!(disk.list_xattr("Notes-Draft").expect("list failed").len(),0);
    let err = disk.get_xattr("Notes-Draft","com.apple.lisa.serial").expect_err("no serial");
    assert!(matches!(fs_err(&err),Error::NoSuchXattr));
    let err = disk.get_xattr("Hello","com.apple.lisa.tags").expect_err("tags are hidden");
    assert!(matches!(fs_err(&err),Error::NoSuchXattr));
}

#[test]
fn system_files() {
    let mut disk = mount(V2,false);
    let err = disk.stat("$MDDF").expect_err("hidden without option");
    assert!(matches!(fs_err(&err),Error::NotFound));

    let mut disk = mount(V2,true);
    let names = disk.read_dir("/").expect("read_dir failed");
    for sys in ["$","$Bitmap","$Boot","$Loader","$MDDF","$S-Record"] {
        assert!(names.contains(&sys.to_string()));
    }
    let stat = disk.stat("$MDDF").expect("stat failed");
    assert!(stat.attributes.contains(FileAttributes::SYSTEM));
    assert!(stat.attributes.contains(FileAttributes::HIDDEN));
    assert_eq!(stat.length,512);
    let mddf = disk.read_file("$MDDF").expect("read failed");
    assert_eq!(&mddf[0x0d..0x14],b"Archive");
    let loader = disk.read_file("$Loader").expect("read failed");
    assert_eq!(loader.len(),1024);
    assert_eq!(&loader[0..13],b"LOADER PAGE 1");
    assert_eq!(&loader[512..525],b"LOADER PAGE 2");
    assert_eq!(&disk.read_file("$Boot").expect("read failed")[0..4],b"BOOT");
    assert_eq!(disk.read_file("$S-Record").expect("read failed").len(),512);
    assert_eq!(disk.get_xattr("$MDDF","com.apple.lisa.password").expect("get failed"),b"PASS".to_vec());
    let tags = disk.get_xattr("Hello","com.apple.lisa.tags").expect("get failed");
    assert_eq!(tags.len(),24);
    assert_eq!(&tags[4..6],&5i16.to_be_bytes());
    assert!(disk.stat("$").expect("stat failed").attributes.contains(FileAttributes::DIRECTORY));
}

#[test]
fn unmount_denies_access() {
    let mut disk = mount(V3,false);
    disk.unmount().expect("unmount failed");
    assert!(!disk.is_mounted());
    let err = disk.read_dir("/").expect_err("unmounted");
    assert!(matches!(fs_err(&err),Error::AccessDenied));
    let err = disk.stat_fs().expect_err("unmounted");
    assert!(matches!(fs_err(&err),Error::AccessDenied));
    disk.mount().expect("remount failed");
    assert_eq!(disk.read_file("Hello").expect("read failed"),hello_data());
}

#[test]
fn through_image_bytes() {
    let mut img = LisaBuilder::standard(V3).finish();
    let buf = img.to_bytes();
    let mut disk = arckit::create_fs_from_img(
        arckit::create_img_from_bytestream(&buf,Some("dc42")).expect("image not recognized"),
        MountOptions::default()
    ).expect("no file system");
    assert_eq!(disk.read_file("Projects/Plan").expect("read failed"),b"plan text\n".to_vec());
}
