//! ### Lisa catalogs
//!
//! V1 and V2 keep a flat catalog in file 4, a plain sequence of 54 byte records.
//! V3 keeps a doubly linked list of 4 sector catalog blocks, each holding a
//! sequence of variable length records identified by a marker byte.
//! Either way the catalog is flattened into `CatalogEntry` records at mount, and an index
//! from parent to children is built once.

use std::io::Cursor;
use binrw::BinRead;
use log::{trace,debug,warn};
use super::types::*;
use super::{Volume,tag_at,be32};
use crate::img;
use crate::DYNERR;

impl Volume {
    pub(super) fn read_catalog(&mut self,img: &mut Box<dyn img::DiskImage>) -> Result<(),DYNERR> {
        self.catalog = Vec::new();
        match self.version {
            LisaVersion::V3 => self.read_catalog_v3(img),
            _ => self.read_catalog_v2(img)
        }
    }
    fn read_catalog_v2(&mut self,img: &mut Box<dyn img::DiskImage>) -> Result<(),DYNERR> {
        let buf = self.read_file(img,FILEID_CATALOG,false)?;
        let mut candidates = Vec::new();
        let mut offset = 0;
        while offset + V2_ENTRY_SIZE <= buf.len() {
            let entry = match CatalogEntryV2::read(&mut Cursor::new(&buf[offset..offset+V2_ENTRY_SIZE])) {
                Ok(e) => e,
                Err(e) => {
                    debug!("{}",e);
                    return Err(Box::new(Error::InvalidArgument));
                }
            };
            offset += V2_ENTRY_SIZE;
            if entry.name_len==0 || entry.name_len as usize > E_NAME || entry.file_type==0 || entry.file_id <= 0 {
                continue;
            }
            candidates.push(entry);
        }
        for entry in candidates {
            let srec = match self.srecords.get(entry.file_id as usize) {
                Some(s) => *s,
                None => {
                    warn!("catalog entry for file {} is beyond the S-Records, skipping",entry.file_id);
                    continue;
                }
            };
            let ext = match self.read_extents(img,entry.file_id) {
                Ok(x) => x,
                Err(e) => {
                    warn!("catalog entry for file {} has no extents ({}), skipping",entry.file_id,e);
                    continue;
                }
            };
            let name_len = entry.name_len as usize;
            self.catalog.push(CatalogEntry {
                parent_id: DIRID_ROOT,
                name: name_from_bytes(&entry.name[0..name_len]),
                file_id: entry.file_id,
                is_dir: false,
                dtc: ext.dtc,
                dtm: ext.dtm,
                length: srec.filesize
            });
        }
        debug!("{} files in the catalog",self.catalog.len());
        Ok(())
    }
    /// Read one catalog block, the tag of its first sector has to be the catalog's
    fn read_catalog_block(&self,img: &mut Box<dyn img::DiskImage>,ptr: u32) -> Result<Vec<u8>,DYNERR> {
        let addr = self.abs(ptr)?;
        if tag_at(img,addr)?.file_id != FILEID_CATALOG {
            debug!("catalog pointer {} leads to a sector that is not tagged as catalog",ptr);
            return Err(Box::new(Error::InvalidArgument));
        }
        let buf = img.read_sectors(addr,CATALOG_BLOCK_SECTORS)?;
        if buf.len() < CAT_NEXT_PTR + 4 {
            return Err(Box::new(Error::InvalidArgument));
        }
        Ok(buf)
    }
    fn read_catalog_v3(&mut self,img: &mut Box<dyn img::DiskImage>) -> Result<(),DYNERR> {
        let sectors = img.sector_count();
        let mut maybe_first = None;
        for i in 0..sectors {
            if let Ok(tag) = tag_at(img,i) {
                if tag.file_id==FILEID_CATALOG && tag.rel_page==0 {
                    maybe_first = Some(i);
                    break;
                }
            }
        }
        let first = match maybe_first {
            Some(a) => a,
            None => {
                debug!("no catalog tag on the device");
                return Err(Box::new(Error::NotFound));
            }
        };
        let mut block = img.read_sectors(first,CATALOG_BLOCK_SECTORS)?;
        if block.len() < CAT_NEXT_PTR + 4 {
            return Err(Box::new(Error::InvalidArgument));
        }
        // walk back to the head, then forward, with a bound in case the links form a loop
        let mut prev = be32(&block,CAT_PREV_PTR);
        let mut steps = 0;
        while prev != NO_BLOCK {
            trace!("catalog block back to {}",prev);
            block = self.read_catalog_block(img,prev)?;
            prev = be32(&block,CAT_PREV_PTR);
            steps += 1;
            if steps > sectors {
                debug!("catalog links do not terminate");
                return Err(Box::new(Error::InvalidArgument));
            }
        }
        let mut next = be32(&block,CAT_NEXT_PTR);
        let mut blocks = vec![block];
        while next != NO_BLOCK {
            trace!("catalog block forward to {}",next);
            let block = self.read_catalog_block(img,next)?;
            next = be32(&block,CAT_NEXT_PTR);
            blocks.push(block);
            if blocks.len() as u64 > sectors {
                debug!("catalog links do not terminate");
                return Err(Box::new(Error::InvalidArgument));
            }
        }
        for buf in blocks {
            self.parse_catalog_block(img,&buf)?;
        }
        debug!("{} entries in the catalog",self.catalog.len());
        Ok(())
    }
    fn parse_catalog_block(&mut self,img: &mut Box<dyn img::DiskImage>,buf: &[u8]) -> Result<(),DYNERR> {
        let mut offset = 0;
        while offset + CAT_FILE_SIZE <= buf.len() {
            let is_entry = buf[offset]==CAT_ENTRY_MARK;
            match buf[offset+0x24] {
                CAT_HEADER => offset += CAT_HEADER_SIZE,
                CAT_FILLER => offset += CAT_FILLER_SIZE,
                CAT_END => break,
                CAT_FILE | CAT_DIR if is_entry => {
                    let entry = match CatalogEntryV3::read(&mut Cursor::new(&buf[offset..offset+CAT_FILE_SIZE])) {
                        Ok(e) => e,
                        Err(e) => {
                            debug!("{}",e);
                            return Err(Box::new(Error::InvalidArgument));
                        }
                    };
                    let is_dir = entry.file_type==CAT_DIR;
                    let name = name_from_bytes(&entry.name);
                    if is_dir {
                        offset += CAT_DIR_SIZE;
                        if entry.file_id <= DIRID_ROOT || entry.file_id==entry.parent_id {
                            warn!("dropping directory {} with ID {}",name,entry.file_id);
                            continue;
                        }
                        self.dir_dtc.entry(entry.file_id).or_insert(entry.dtc);
                    } else {
                        offset += CAT_FILE_SIZE;
                        if let Err(e) = self.read_extents(img,entry.file_id) {
                            warn!("dropping catalog entry {} for file {}: {}",name,entry.file_id,e);
                            continue;
                        }
                        if self.file_sizes.contains_key(&entry.file_id) {
                            continue;
                        }
                        self.file_sizes.insert(entry.file_id,entry.length);
                    }
                    self.catalog.push(CatalogEntry {
                        parent_id: entry.parent_id,
                        name,
                        file_id: entry.file_id,
                        is_dir,
                        dtc: entry.dtc,
                        dtm: entry.dtm,
                        length: match is_dir {
                            true => 0,
                            false => entry.length
                        }
                    });
                },
                _ => break
            }
        }
        Ok(())
    }
    pub(super) fn build_index(&mut self) {
        self.children.clear();
        for (i,entry) in self.catalog.iter().enumerate() {
            self.children.entry(entry.parent_id).or_default().push(i);
        }
    }
    /// Resolve a path to (file ID, is directory)
    pub(super) fn lookup(&self,path: &str) -> Result<(i16,bool),DYNERR> {
        let segs: Vec<&str> = path.split('/').filter(|s| s.len() > 0).collect();
        if segs.len()==0 {
            return Ok((DIRID_ROOT,true));
        }
        if segs.len() > 1 && self.version != LisaVersion::V3 {
            debug!("subdirectories require V3");
            return Err(Box::new(Error::NotSupported));
        }
        if self.expose && segs.len()==1 {
            for (name,id) in SYSTEM_NAMES {
                if segs[0].eq_ignore_ascii_case(name) {
                    return Ok((id,id==DIRID_ROOT));
                }
            }
        }
        let mut parent = DIRID_ROOT;
        for (lvl,seg) in segs.iter().enumerate() {
            let wanted = seg.replace('-',"/");
            let found = match self.children.get(&parent) {
                Some(list) => list.iter().map(|i| &self.catalog[*i]).find(|e| e.name.eq_ignore_ascii_case(&wanted)),
                None => None
            };
            let entry = match found {
                Some(e) => e,
                None => return Err(Box::new(Error::NotFound))
            };
            if lvl==segs.len()-1 {
                return Ok((entry.file_id,entry.is_dir));
            }
            if !entry.is_dir {
                return Err(Box::new(Error::NotDirectory));
            }
            parent = entry.file_id;
        }
        Err(Box::new(Error::NotFound))
    }
    pub(super) fn read_dir(&self,path: &str) -> Result<Vec<String>,DYNERR> {
        let (id,is_dir) = self.lookup(path)?;
        if !is_dir {
            return Err(Box::new(Error::NotDirectory));
        }
        let mut ans: Vec<String> = match self.children.get(&id) {
            Some(list) => list.iter().map(|i| self.catalog[*i].name.replace('/',"-")).collect(),
            None => Vec::new()
        };
        if self.expose && id==DIRID_ROOT {
            for (name,_) in SYSTEM_NAMES {
                ans.push(name.to_string());
            }
        }
        ans.sort();
        Ok(ans)
    }
}
