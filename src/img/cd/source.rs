//! ## Byte sources
//!
//! A cue sheet names sibling files.  The image formats open them through `ByteSource`,
//! so the same reader works on a host directory or on buffers held in memory.

use std::collections::HashMap;
use std::io::{Read,Seek,Cursor};
use std::path::{Path,PathBuf};
use chrono::{DateTime,Local,NaiveDateTime};
use crate::img::Error;
use crate::DYNERR;

pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

#[derive(Clone,Debug,Default)]
pub struct SourceMetadata {
    pub len: u64,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>
}

pub trait ByteSource {
    /// Open the named stream, names are relative to wherever the descriptor lives
    fn open(&self,name: &str) -> Result<Box<dyn ReadSeek>,DYNERR>;
    fn metadata(&self,name: &str) -> Result<SourceMetadata,DYNERR>;
    fn exists(&self,name: &str) -> bool;
    fn len(&self,name: &str) -> Result<u64,DYNERR> {
        Ok(self.metadata(name)?.len)
    }
    fn read_all(&self,name: &str) -> Result<Vec<u8>,DYNERR> {
        let mut ans = Vec::new();
        self.open(name)?.read_to_end(&mut ans).map_err(Error::Unexpected)?;
        Ok(ans)
    }
}

/// Files in a host directory
pub struct DirSource {
    root: PathBuf
}

impl DirSource {
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }
    /// Source rooted at the directory holding `path`, along with the file name
    pub fn for_file(path: &str) -> Result<(Self,String),DYNERR> {
        let p = Path::new(path);
        let name = match p.file_name() {
            Some(n) => n.to_string_lossy().to_string(),
            None => return Err(Box::new(Error::InvalidArgument))
        };
        let root = match p.parent() {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from(".")
        };
        Ok((Self::new(&root),name))
    }
    fn resolve(&self,name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn naive(t: std::io::Result<std::time::SystemTime>) -> Option<NaiveDateTime> {
    match t {
        Ok(st) => Some(DateTime::<Local>::from(st).naive_local()),
        Err(_) => None
    }
}

impl ByteSource for DirSource {
    fn open(&self,name: &str) -> Result<Box<dyn ReadSeek>,DYNERR> {
        match std::fs::File::open(self.resolve(name)) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) if e.kind()==std::io::ErrorKind::NotFound => {
                log::error!("{} not found in {}",name,self.root.display());
                Err(Box::new(Error::NotFound))
            },
            Err(e) => Err(Box::new(Error::Unexpected(e)))
        }
    }
    fn metadata(&self,name: &str) -> Result<SourceMetadata,DYNERR> {
        let meta = std::fs::metadata(self.resolve(name)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound,
            _ => Error::Unexpected(e)
        })?;
        Ok(SourceMetadata {
            len: meta.len(),
            created: naive(meta.created()),
            modified: naive(meta.modified())
        })
    }
    fn exists(&self,name: &str) -> bool {
        self.resolve(name).is_file()
    }
}

/// Named buffers, for images that never touch the host file system
#[derive(Default)]
pub struct MemSource {
    files: HashMap<String,Vec<u8>>
}

impl MemSource {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self,name: &str,dat: Vec<u8>) {
        self.files.insert(name.to_string(),dat);
    }
}

impl ByteSource for MemSource {
    fn open(&self,name: &str) -> Result<Box<dyn ReadSeek>,DYNERR> {
        match self.files.get(name) {
            Some(dat) => Ok(Box::new(Cursor::new(dat.clone()))),
            None => Err(Box::new(Error::NotFound))
        }
    }
    fn metadata(&self,name: &str) -> Result<SourceMetadata,DYNERR> {
        match self.files.get(name) {
            Some(dat) => Ok(SourceMetadata { len: dat.len() as u64, created: None, modified: None }),
            None => Err(Box::new(Error::NotFound))
        }
    }
    fn exists(&self,name: &str) -> bool {
        self.files.contains_key(name)
    }
}

#[test]
fn memory_source() {
    let mut src = MemSource::new();
    src.add("a.bin",vec![1,2,3]);
    assert!(src.exists("a.bin"));
    assert_eq!(src.len("a.bin").expect("no length"),3);
    assert_eq!(src.read_all("a.bin").expect("no data"),vec![1,2,3]);
    assert!(src.open("b.bin").is_err());
}

#[cfg(test)]
struct FailingStream;

#[cfg(test)]
impl Read for FailingStream {
    fn read(&mut self,_buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other,"medium error"))
    }
}

#[cfg(test)]
impl Seek for FailingStream {
    fn seek(&mut self,_pos: std::io::SeekFrom) -> std::io::Result<u64> {
        Ok(0)
    }
}

#[cfg(test)]
struct FailingSource;

#[cfg(test)]
impl ByteSource for FailingSource {
    fn open(&self,_name: &str) -> Result<Box<dyn ReadSeek>,DYNERR> {
        Ok(Box::new(FailingStream))
    }
    fn metadata(&self,_name: &str) -> Result<SourceMetadata,DYNERR> {
        Ok(SourceMetadata::default())
    }
    fn exists(&self,_name: &str) -> bool {
        true
    }
}

#[test]
fn read_fault_is_unexpected() {
    match FailingSource.read_all("a.bin") {
        Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::Unexpected(_)))),
        Ok(_) => panic!("read fault went unnoticed")
    }
}
