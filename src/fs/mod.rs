//! # File System Module
//!
//! File system modules handle interactions with directories and files.  There is a sub-module for
//! each supported file system, at present only the Lisa Office System file system.
//!
//! File systems are represented by the `DiskFS` trait.  The trait object takes ownership of
//! some tagged-sector disk image, which it uses as storage.  Access is read-only.
//! A file system starts out unmounted, `mount` reads the volume structures, and every other
//! operation fails with an access error until that succeeds.
//!
//! Paths use `/` as the separator.  An empty path, or a path with only separators, is the root.

pub mod lisa;

use std::fmt;
use std::ops::{BitOr,BitOrAssign};
use chrono::NaiveDateTime;
use crate::img;
use crate::{STDRESULT,DYNERR};

/// Attribute flags of a file or directory, combine with `|`.
#[derive(PartialEq,Eq,Clone,Copy,Default)]
pub struct FileAttributes(u32);

impl FileAttributes {
    pub const NONE: Self = Self(0);
    pub const FILE: Self = Self(1);
    pub const DIRECTORY: Self = Self(1 << 1);
    pub const SYSTEM: Self = Self(1 << 2);
    pub const HIDDEN: Self = Self(1 << 3);
    pub const READ_ONLY: Self = Self(1 << 4);
    pub const IMMUTABLE: Self = Self(1 << 5);
    pub const PASSWORD: Self = Self(1 << 6);
    pub const CHAR_DEVICE: Self = Self(1 << 7);
    pub const PIPE: Self = Self(1 << 8);
    pub fn contains(&self,other: Self) -> bool {
        self.0 & other.0 == other.0
    }
    pub fn bits(&self) -> u32 {
        self.0
    }
    /// names of the flags that are set
    pub fn names(&self) -> Vec<&'static str> {
        let table = [
            (Self::FILE,"file"),
            (Self::DIRECTORY,"directory"),
            (Self::SYSTEM,"system"),
            (Self::HIDDEN,"hidden"),
            (Self::READ_ONLY,"read-only"),
            (Self::IMMUTABLE,"immutable"),
            (Self::PASSWORD,"password"),
            (Self::CHAR_DEVICE,"char-device"),
            (Self::PIPE,"pipe")
        ];
        table.iter().filter(|(flag,_)| self.contains(*flag) && flag.0 != 0).map(|(_,name)| *name).collect()
    }
}

impl BitOr for FileAttributes {
    type Output = Self;
    fn bitor(self,rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FileAttributes {
    fn bitor_assign(&mut self,rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for FileAttributes {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{}",self.names().join("|"))
    }
}

impl fmt::Display for FileAttributes {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{}",self.names().join(","))
    }
}

/// Information about one file or directory
#[derive(Clone,Debug,Default)]
pub struct Stat {
    pub attributes: FileAttributes,
    pub inode: i64,
    pub links: u32,
    /// bytes
    pub length: u64,
    pub block_size: usize,
    pub blocks: u64,
    pub created: Option<NaiveDateTime>,
    pub accessed: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub backup: Option<NaiveDateTime>
}

/// Information about the mounted volume
#[derive(Clone,Debug)]
pub struct FsInfo {
    pub fs_type: String,
    pub blocks: u64,
    pub free_blocks: u64,
    pub files: u64,
    pub free_files: u64,
    pub filename_length: usize,
    pub id: u64
}

/// Abstract read-only file system interface.  Presumed to own an underlying DiskImage.
pub trait DiskFS {
    /// Read the volume structures, must succeed before anything else will work
    fn mount(&mut self) -> STDRESULT;
    /// Drop all the cached structures, the image stays owned
    fn unmount(&mut self) -> STDRESULT;
    fn stat_fs(&mut self) -> Result<FsInfo,DYNERR>;
    /// Sorted names in a directory
    fn read_dir(&mut self,path: &str) -> Result<Vec<String>,DYNERR>;
    fn stat(&mut self,path: &str) -> Result<Stat,DYNERR>;
    /// Read up to `size` bytes starting at `offset`, clamped to the file length
    fn read(&mut self,path: &str,offset: u64,size: u64) -> Result<Vec<u8>,DYNERR>;
    /// Read the whole file
    fn read_file(&mut self,path: &str) -> Result<Vec<u8>,DYNERR> {
        let stat = self.stat(path)?;
        self.read(path,0,stat.length)
    }
    fn list_xattr(&mut self,path: &str) -> Result<Vec<String>,DYNERR>;
    fn get_xattr(&mut self,path: &str,name: &str) -> Result<Vec<u8>,DYNERR>;
    /// List the files in a directory to standard output
    fn catalog_to_stdout(&mut self,path: &str) -> STDRESULT;
    /// Directory tree as a JSON string, pretty printed if `indent` is given
    fn tree(&mut self,include_meta: bool,indent: Option<u16>) -> Result<String,DYNERR>;
    /// Volume description as a JSON string
    fn volume_info(&mut self,indent: Option<u16>) -> Result<String,DYNERR>;
    /// Mutably borrow the underlying disk image
    fn get_img(&mut self) -> &mut Box<dyn img::DiskImage>;
}

#[test]
fn attribute_flags() {
    let mut attr = FileAttributes::SYSTEM | FileAttributes::HIDDEN;
    attr |= FileAttributes::FILE;
    assert!(attr.contains(FileAttributes::HIDDEN));
    assert!(!attr.contains(FileAttributes::DIRECTORY));
    assert_eq!(attr.to_string(),"file,system,hidden");
    assert_eq!(FileAttributes::NONE.names().len(),0);
}
