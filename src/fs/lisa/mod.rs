//! ## Lisa file system module
//!
//! Read-only access to the Lisa Office System file system, versions 1, 2, and 3.
//! The device has to carry the Apple sector tags, which the file system relies on to find
//! its structures.  The boot and loader blocks, when present, sit before the volume,
//! and all block pointers stored on disk are relative to the master directory (MDDF).
//!
//! * V1 and V2 have a single flat catalog, stored as an ordinary file
//! * V3 has a linked list of catalog blocks, with subdirectories
//!
//! Mounting reads the MDDF, the S-Records, and the whole catalog.  Everything else is
//! loaded on demand and cached until `unmount`.

pub mod types;
mod directory;

use std::collections::{BTreeMap,HashMap};
use colored::*;
use log::{trace,debug,info,warn,error};
use types::*;
use super::{DiskFS,Stat,FsInfo,FileAttributes};
use crate::img;
use crate::img::SectorTag;
use crate::{DYNERR,STDRESULT};

pub const FS_NAME: &str = "lisa";

/// Options applied when the volume is mounted
#[derive(Clone,Copy,Debug,Default)]
pub struct MountOptions {
    /// make the boot blocks, loader, MDDF, bitmap, and S-Records visible as `$` files
    pub expose_system_files: bool
}

/// Everything known about a mounted volume
struct Volume {
    version: LisaVersion,
    mddf: Mddf,
    /// sectors before the volume, can be -1 when the loader starts at sector 0
    prefix: i64,
    tag_size: usize,
    sector_size: usize,
    expose: bool,
    srecords: Vec<SRecord>,
    catalog: Vec<CatalogEntry>,
    /// parent ID to catalog indices
    children: BTreeMap<i16,Vec<usize>>,
    extents: HashMap<i16,ExtentsFile>,
    system_files: HashMap<i16,Vec<u8>>,
    files: HashMap<i16,Vec<u8>>,
    file_sizes: HashMap<i16,u32>,
    dir_dtc: HashMap<i16,u32>
}

enum State {
    Unmounted,
    Mounted(Volume)
}

fn tag_at(img: &mut Box<dyn img::DiskImage>,addr: u64) -> Result<Tag,DYNERR> {
    let raw = img.read_sector_tag(addr,SectorTag::Apple)?;
    match Tag::decode(&raw) {
        Some(tag) => Ok(tag),
        None => {
            debug!("tag of {} bytes is not a Lisa tag",raw.len());
            Err(Box::new(Error::NotSupported))
        }
    }
}

fn be32(buf: &[u8],i: usize) -> u32 {
    u32::from_be_bytes([buf[i],buf[i+1],buf[i+2],buf[i+3]])
}

/// Find and check the MDDF, returns (MDDF, volume prefix, tag size)
fn find_mddf(img: &mut Box<dyn img::DiskImage>) -> Result<(Mddf,i64,usize),DYNERR> {
    let sectors = img.sector_count();
    if sectors < MIN_SECTORS {
        debug!("device has only {} sectors",sectors);
        return Err(Box::new(Error::InvalidArgument));
    }
    if !img.readable_sector_tags().contains(&SectorTag::Apple) {
        debug!("device has no Apple tags");
        return Err(Box::new(Error::NotSupported));
    }
    let mut maybe_prefix: Option<i64> = None;
    for i in 0..TAG_SEARCH {
        let raw = img.read_sector_tag(i,SectorTag::Apple)?;
        let tag = match Tag::decode(&raw) {
            Some(t) => t,
            None => return Err(Box::new(Error::NotSupported))
        };
        if maybe_prefix.is_none() && tag.file_id==FILEID_LOADER {
            maybe_prefix = Some(i as i64 - 1);
        }
        if tag.file_id!=FILEID_MDDF {
            continue;
        }
        let prefix = maybe_prefix.unwrap_or(0);
        trace!("MDDF candidate at {}, volume prefix {}",i,prefix);
        let buf = img.read_sector(i)?;
        let mddf = match Mddf::from_bytes(&buf) {
            Ok(m) => m,
            Err(e) => {
                debug!("{}",e);
                return Err(Box::new(Error::InvalidArgument));
            }
        };
        let vol_size = mddf.vol_size as i64;
        let checks = [
            (mddf.mddf_block as i64 == i as i64 - prefix,"MDDF block"),
            (mddf.vol_size as u64 <= sectors,"volume size"),
            (vol_size - 1 == mddf.volsize_minus_one as i64,"volume size less one"),
            (vol_size - i as i64 - 1 == mddf.volsize_minus_mddf_minus_one as i64 - prefix,"volume size less MDDF"),
            (mddf.datasize <= mddf.blocksize,"data size"),
            (mddf.blocksize as usize >= img.sector_size(),"block size"),
            (mddf.datasize as usize == img.sector_size(),"sector size")
        ];
        for (ok,what) in checks {
            if !ok {
                debug!("MDDF check failed: {}",what);
                return Err(Box::new(Error::InvalidArgument));
            }
        }
        return Ok((mddf,prefix,raw.len()));
    }
    debug!("no MDDF tag in the first {} sectors",TAG_SEARCH);
    Err(Box::new(Error::InvalidArgument))
}

impl Volume {
    /// absolute sector of a block pointer stored on disk
    fn abs(&self,ptr: u32) -> Result<u64,DYNERR> {
        match u64::try_from(ptr as i64 + self.mddf.mddf_block as i64 + self.prefix) {
            Ok(addr) => Ok(addr),
            Err(_) => Err(Box::new(Error::OutOfRange))
        }
    }
    fn is_system_id(id: i16) -> bool {
        id <= FILEID_CATALOG && id != DIRID_ROOT
    }
    fn read_extents(&mut self,img: &mut Box<dyn img::DiskImage>,id: i16) -> Result<ExtentsFile,DYNERR> {
        if id < FILEID_CATALOG || (id==FILEID_CATALOG && self.version==LisaVersion::V3) {
            return Err(Box::new(Error::InvalidArgument));
        }
        if let Some(ext) = self.extents.get(&id) {
            return Ok(ext.clone());
        }
        let srec = match self.srecords.get(id as usize) {
            Some(s) => *s,
            None => {
                debug!("file {} is beyond the S-Records",id);
                return Err(Box::new(Error::InvalidArgument));
            }
        };
        if srec.extent_ptr==0 || srec.extent_ptr==NO_BLOCK {
            return Err(Box::new(Error::NotFound));
        }
        let mut addr = self.abs(srec.extent_ptr)?;
        if addr >= img.sector_count() {
            // pointer is bad, look for the tag instead
            debug!("extents of file {} are off the device, searching tags",id);
            let mut found = None;
            for i in 0..img.sector_count() {
                if let Ok(tag) = tag_at(img,i) {
                    if tag.file_id == -id {
                        found = Some(i);
                        break;
                    }
                }
            }
            addr = match found {
                Some(a) => a,
                None => return Err(Box::new(Error::InvalidArgument))
            };
        }
        if tag_at(img,addr)?.file_id != -id {
            debug!("sector {} is not tagged as the extents of file {}",addr,id);
            return Err(Box::new(Error::NotFound));
        }
        let count = match self.version {
            LisaVersion::V1 => 2,
            _ => 1
        };
        let buf = img.read_sectors(addr,count)?;
        if buf[0]==0 || buf[0] as usize >= E_NAME {
            debug!("extents of file {} has name length {}",id,buf[0]);
            return Err(Box::new(Error::InvalidArgument));
        }
        let ext = match ExtentsFile::from_bytes(&buf,self.version==LisaVersion::V1) {
            Ok(e) => e,
            Err(e) => {
                debug!("{}",e);
                return Err(Box::new(Error::InvalidArgument));
            }
        };
        self.extents.insert(id,ext.clone());
        Ok(ext)
    }
    /// Read the data or tags of an ordinary file by following its extents
    fn read_file(&mut self,img: &mut Box<dyn img::DiskImage>,id: i16,tags: bool) -> Result<Vec<u8>,DYNERR> {
        if id < FILEID_CATALOG || (id==FILEID_CATALOG && self.version==LisaVersion::V3) {
            return Err(Box::new(Error::InvalidArgument));
        }
        if !tags {
            if let Some(buf) = self.files.get(&id) {
                return Ok(buf.clone());
            }
        }
        let ext = self.read_extents(img,id)?;
        let mut ans = Vec::new();
        // the extents file length, in blocks, bounds the read
        let mut remaining = ext.length as u64;
        for extent in &ext.extents {
            if remaining==0 {
                break;
            }
            let count = u64::min(extent.length as u64,remaining);
            let addr = self.abs(extent.start)?;
            for i in addr..addr+count {
                match tag_at(img,i) {
                    Ok(tag) if tag.file_id != id => warn!("sector {} of file {} is tagged for file {}",i,id,tag.file_id),
                    Ok(_) => {},
                    Err(_) => debug!("sector {} of file {} has no tag",i,id)
                }
            }
            let mut dat = match tags {
                true => img.read_sectors_tag(addr,count as u32,SectorTag::Apple)?,
                false => img.read_sectors(addr,count as u32)?
            };
            ans.append(&mut dat);
            remaining -= count;
        }
        if remaining > 0 {
            debug!("extents of file {} cover {} fewer blocks than its length",id,remaining);
        }
        if !tags {
            if let Some(real) = self.file_sizes.get(&id) {
                if *real as usize > ans.len() {
                    warn!("file {} is truncated, {} bytes of {}",id,ans.len(),real);
                }
            }
            self.files.insert(id,ans.clone());
        }
        Ok(ans)
    }
    /// Read the boot, loader, MDDF, bitmap, S-Records, or catalog as a file
    fn read_system_file(&mut self,img: &mut Box<dyn img::DiskImage>,id: i16,tags: bool) -> Result<Vec<u8>,DYNERR> {
        if !self.expose {
            return Err(Box::new(Error::AccessDenied));
        }
        if !Self::is_system_id(id) || (id<0 && id!=FILEID_BOOT && id!=FILEID_LOADER) {
            return Err(Box::new(Error::InvalidArgument));
        }
        if !tags {
            if let Some(buf) = self.system_files.get(&id) {
                return Ok(buf.clone());
            }
        }
        if id==FILEID_SRECORD {
            let addr = self.abs(self.mddf.srec_ptr)?;
            let count = self.mddf.srec_len as u32;
            return match tags {
                true => img.read_sectors_tag(addr,count,SectorTag::Apple),
                false => {
                    let buf = img.read_sectors(addr,count)?;
                    self.system_files.insert(id,buf.clone());
                    Ok(buf)
                }
            };
        }
        let mut pages: Vec<(u64,usize)> = Vec::new();
        for i in 0..TAG_SEARCH {
            let tag = tag_at(img,i)?;
            if tag.file_id != id {
                continue;
            }
            // loader pages count from the boot block
            let rel = match id {
                FILEID_LOADER => (tag.rel_page as usize).checked_sub(1),
                _ => Some(tag.rel_page as usize)
            };
            match rel {
                Some(r) => pages.push((i,r)),
                None => warn!("loader sector {} has relative page 0",i)
            }
        }
        if pages.len()==0 {
            return Err(Box::new(Error::NotFound));
        }
        let unit = match tags {
            true => self.tag_size,
            false => self.sector_size
        };
        let mut ans = vec![0;pages.len()*unit];
        for (addr,rel) in pages {
            if (rel+1)*unit > ans.len() {
                warn!("sector {} of system file {} has relative page {} out of sequence",addr,id,rel);
                continue;
            }
            let dat = match tags {
                true => img.read_sector_tag(addr,SectorTag::Apple)?,
                false => img.read_sector(addr)?
            };
            ans[rel*unit..(rel+1)*unit].copy_from_slice(&dat[0..unit]);
        }
        if !tags {
            self.system_files.insert(id,ans.clone());
        }
        Ok(ans)
    }
    fn attributes(&mut self,img: &mut Box<dyn img::DiskImage>,id: i16) -> Result<FileAttributes,DYNERR> {
        let ext = self.read_extents(img,id)?;
        let mut ans = match ext.file_type() {
            FileType::Spool => FileAttributes::CHAR_DEVICE,
            FileType::UserCat | FileType::RootCat => FileAttributes::DIRECTORY,
            FileType::Pipe => FileAttributes::PIPE,
            FileType::Undefined => FileAttributes::NONE,
            _ => FileAttributes::FILE
        };
        if ext.protect > 0 {
            ans |= FileAttributes::IMMUTABLE;
        }
        if ext.locked > 0 {
            ans |= FileAttributes::READ_ONLY;
        }
        if ext.password_valid > 0 {
            ans |= FileAttributes::PASSWORD;
        }
        Ok(ans)
    }
    fn stat_id(&mut self,img: &mut Box<dyn img::DiskImage>,id: i16,is_dir: bool) -> Result<Stat,DYNERR> {
        let mut ans = Stat {
            inode: id as i64,
            links: 1,
            block_size: self.mddf.datasize as usize,
            ..Default::default()
        };
        if is_dir {
            ans.attributes = FileAttributes::DIRECTORY;
            ans.created = match id {
                DIRID_ROOT => lisa_time(self.mddf.dtvc),
                _ => self.dir_dtc.get(&id).and_then(|t| lisa_time(*t))
            };
            return Ok(ans);
        }
        if Self::is_system_id(id) {
            if !self.expose {
                return Err(Box::new(Error::NotFound));
            }
            ans.attributes = FileAttributes::SYSTEM | FileAttributes::HIDDEN | FileAttributes::FILE;
            ans.created = match id {
                FILEID_CATALOG => lisa_time(self.mddf.dtcc),
                _ => lisa_time(self.mddf.dtvc)
            };
            ans.backup = lisa_time(self.mddf.dtvb);
            ans.length = self.read_system_file(img,id,false)?.len() as u64;
            ans.blocks = ans.length / self.sector_size as u64;
            return Ok(ans);
        }
        ans.attributes = self.attributes(img,id)?;
        let ext = self.read_extents(img,id)?;
        ans.created = lisa_time(ext.dtc);
        ans.accessed = lisa_time(ext.dta);
        ans.modified = lisa_time(ext.dtm);
        ans.backup = lisa_time(ext.dtb);
        ans.length = match self.file_sizes.get(&id) {
            Some(len) => *len as u64,
            None => self.srecords.get(id as usize).map(|s| s.filesize as u64).unwrap_or(0)
        };
        ans.blocks = ext.length as u64;
        Ok(ans)
    }
    fn list_xattr(&mut self,img: &mut Box<dyn img::DiskImage>,id: i16,is_dir: bool) -> Result<Vec<String>,DYNERR> {
        let mut ans = Vec::new();
        if is_dir {
            return Ok(ans);
        }
        if Self::is_system_id(id) {
            if !self.expose {
                return Err(Box::new(Error::NotFound));
            }
            if id==FILEID_MDDF && self.mddf.password().len() > 0 {
                ans.push(XATTR_PASSWORD.to_string());
            }
            ans.push(XATTR_TAGS.to_string());
            return Ok(ans);
        }
        let ext = self.read_extents(img,id)?;
        if ext.password_valid > 0 {
            ans.push(XATTR_PASSWORD.to_string());
        }
        if ext.serial > 0 {
            ans.push(XATTR_SERIAL.to_string());
        }
        if ext.has_label() {
            ans.push(XATTR_LABEL.to_string());
        }
        if self.expose {
            ans.push(XATTR_TAGS.to_string());
        }
        Ok(ans)
    }
    fn get_xattr(&mut self,img: &mut Box<dyn img::DiskImage>,id: i16,is_dir: bool,name: &str) -> Result<Vec<u8>,DYNERR> {
        if is_dir {
            return Err(Box::new(Error::NoSuchXattr));
        }
        if Self::is_system_id(id) {
            if !self.expose {
                return Err(Box::new(Error::NotFound));
            }
            let password = self.mddf.password();
            return match name {
                XATTR_PASSWORD if id==FILEID_MDDF && password.len() > 0 => Ok(password.into_bytes()),
                XATTR_TAGS => self.read_system_file(img,id,true),
                _ => Err(Box::new(Error::NoSuchXattr))
            };
        }
        let ext = self.read_extents(img,id)?;
        match name {
            XATTR_PASSWORD if ext.password_valid > 0 => Ok(ext.password.to_vec()),
            XATTR_SERIAL if ext.serial > 0 => Ok(ext.serial.to_string().into_bytes()),
            XATTR_LABEL if ext.has_label() => Ok(ext.label.to_vec()),
            XATTR_TAGS if self.expose => self.read_file(img,id,true),
            _ => Err(Box::new(Error::NoSuchXattr))
        }
    }
}

/// The primary interface for Lisa volumes.
pub struct Disk {
    img: Box<dyn img::DiskImage>,
    opt: MountOptions,
    state: State
}

impl Disk {
    /// Use the given image as storage.  The DiskFS takes ownership of the image.
    /// The volume still has to be mounted.
    pub fn from_img(img: Box<dyn img::DiskImage>,opt: MountOptions) -> Self {
        Self {
            img,
            opt,
            state: State::Unmounted
        }
    }
    /// Test an image for the Lisa file system.
    pub fn test_img(img: &mut Box<dyn img::DiskImage>) -> bool {
        match find_mddf(img) {
            Ok((mddf,_,_)) => {
                debug!("found Lisa volume {}",mddf.name());
                true
            },
            Err(_) => false
        }
    }
    pub fn is_mounted(&self) -> bool {
        matches!(self.state,State::Mounted(_))
    }
    pub fn version(&self) -> Option<LisaVersion> {
        match &self.state {
            State::Mounted(vol) => Some(vol.version),
            State::Unmounted => None
        }
    }
    /// Single entry point for everything that needs a mounted volume
    fn mounted(&mut self) -> Result<(&mut Box<dyn img::DiskImage>,&mut Volume),DYNERR> {
        match &mut self.state {
            State::Mounted(vol) => Ok((&mut self.img,vol)),
            State::Unmounted => Err(Box::new(Error::AccessDenied))
        }
    }
    /// Resolve a path to (file ID, is directory)
    pub fn lookup_file_id(&mut self,path: &str) -> Result<(i16,bool),DYNERR> {
        let (_,vol) = self.mounted()?;
        vol.lookup(path)
    }
    fn mount_volume(img: &mut Box<dyn img::DiskImage>,opt: &MountOptions) -> Result<Volume,DYNERR> {
        let (mddf,prefix,tag_size) = find_mddf(img)?;
        let version = match LisaVersion::from_fsversion(mddf.fsversion) {
            Some(v) => v,
            None => {
                error!("unknown Lisa file system version {:02X}",mddf.fsversion);
                return Err(Box::new(Error::NotSupported));
            }
        };
        info!("Lisa file system {} on volume {}",version,mddf.name());
        let mut vol = Volume {
            version,
            mddf,
            prefix,
            tag_size,
            sector_size: img.sector_size(),
            expose: opt.expose_system_files,
            srecords: Vec::new(),
            catalog: Vec::new(),
            children: BTreeMap::new(),
            extents: HashMap::new(),
            system_files: HashMap::new(),
            files: HashMap::new(),
            file_sizes: HashMap::new(),
            dir_dtc: HashMap::new()
        };
        let srec_addr = vol.abs(vol.mddf.srec_ptr)?;
        let buf = img.read_sectors(srec_addr,vol.mddf.srec_len as u32)?;
        vol.srecords = match SRecord::table_from_bytes(&buf) {
            Ok(s) => s,
            Err(e) => {
                error!("{}",e);
                return Err(Box::new(Error::InvalidArgument));
            }
        };
        debug!("{} S-Records at sector {}",vol.srecords.len(),srec_addr);
        vol.read_catalog(img)?;
        vol.build_index();
        Ok(vol)
    }
    fn tree_node(&mut self,path: &str,include_meta: bool) -> Result<json::JsonValue,DYNERR> {
        const TIME_FMT: &str = "%Y/%m/%d %H:%M";
        let mut files = json::JsonValue::new_object();
        for name in self.read_dir(path)? {
            let full = [path,"/",&name].concat();
            let stat = self.stat(&full)?;
            files[&name] = json::JsonValue::new_object();
            if stat.attributes.contains(FileAttributes::DIRECTORY) && name!="$" {
                trace!("descend into directory {}",full);
                files[&name]["files"] = self.tree_node(&full,include_meta)?;
            }
            if include_meta {
                files[&name]["meta"] = json::JsonValue::new_object();
                let meta = &mut files[&name]["meta"];
                meta["attributes"] = json::JsonValue::String(stat.attributes.to_string());
                meta["eof"] = json::JsonValue::Number(stat.length.into());
                meta["blocks"] = json::JsonValue::Number(stat.blocks.into());
                if let Some(t) = stat.created {
                    meta["time_created"] = json::JsonValue::String(t.format(TIME_FMT).to_string());
                }
                if let Some(t) = stat.modified {
                    meta["time_modified"] = json::JsonValue::String(t.format(TIME_FMT).to_string());
                }
            }
        }
        Ok(files)
    }
}

impl DiskFS for Disk {
    fn mount(&mut self) -> STDRESULT {
        if self.is_mounted() {
            return Ok(());
        }
        let vol = Self::mount_volume(&mut self.img,&self.opt)?;
        self.state = State::Mounted(vol);
        Ok(())
    }
    fn unmount(&mut self) -> STDRESULT {
        self.state = State::Unmounted;
        Ok(())
    }
    fn stat_fs(&mut self) -> Result<FsInfo,DYNERR> {
        let (_,vol) = self.mounted()?;
        let files = vol.mddf.filecount as u64;
        Ok(FsInfo {
            fs_type: format!("LisaFS {}",vol.version),
            blocks: vol.mddf.vol_size as u64,
            free_blocks: vol.mddf.freecount as u64,
            files,
            free_files: (FILEID_MAX as u64).saturating_sub(files),
            filename_length: E_NAME,
            id: vol.mddf.volid
        })
    }
    fn read_dir(&mut self,path: &str) -> Result<Vec<String>,DYNERR> {
        let (_,vol) = self.mounted()?;
        vol.read_dir(path)
    }
    fn stat(&mut self,path: &str) -> Result<Stat,DYNERR> {
        let (img,vol) = self.mounted()?;
        let (id,is_dir) = vol.lookup(path)?;
        vol.stat_id(img,id,is_dir)
    }
    fn read(&mut self,path: &str,offset: u64,size: u64) -> Result<Vec<u8>,DYNERR> {
        let (img,vol) = self.mounted()?;
        let (id,is_dir) = vol.lookup(path)?;
        if is_dir {
            debug!("{} is a directory",path);
            return Err(Box::new(Error::InvalidArgument));
        }
        let stat = vol.stat_id(img,id,false)?;
        let dat = match Volume::is_system_id(id) {
            true => vol.read_system_file(img,id,false)?,
            false => vol.read_file(img,id,false)?
        };
        let len = usize::min(stat.length as usize,dat.len());
        let offset = offset as usize;
        if offset > len {
            return Err(Box::new(Error::InvalidArgument));
        }
        let end = usize::min(len,offset.saturating_add(size as usize));
        Ok(dat[offset..end].to_vec())
    }
    fn list_xattr(&mut self,path: &str) -> Result<Vec<String>,DYNERR> {
        let (img,vol) = self.mounted()?;
        let (id,is_dir) = vol.lookup(path)?;
        vol.list_xattr(img,id,is_dir)
    }
    fn get_xattr(&mut self,path: &str,name: &str) -> Result<Vec<u8>,DYNERR> {
        let (img,vol) = self.mounted()?;
        let (id,is_dir) = vol.lookup(path)?;
        vol.get_xattr(img,id,is_dir,name)
    }
    fn catalog_to_stdout(&mut self,path: &str) -> STDRESULT {
        let names = self.read_dir(path)?;
        let label = {
            let (_,vol) = self.mounted()?;
            vol.mddf.name()
        };
        println!();
        println!("{}{}","/".bright_blue().bold(),label.bright_blue().bold());
        println!();
        println!(" {:32} {:10} {:8} {:16} {:16}",
            "NAME".bold(),"BYTES".bold(),"BLOCKS".bold(),"MODIFIED".bold(),"CREATED".bold());
        println!();
        for name in names {
            let stat = self.stat(&[path,"/",&name].concat())?;
            let fmt = |t: Option<chrono::NaiveDateTime>| match t {
                Some(t) => t.format("%Y/%m/%d %H:%M").to_string(),
                None => "".to_string()
            };
            let display = match stat.attributes.contains(FileAttributes::DIRECTORY) {
                true => format!("{:32}",name).bright_blue().bold().to_string(),
                false => format!("{:32}",name)
            };
            println!(" {} {:10} {:8} {:16} {:16}",display,stat.length,stat.blocks,fmt(stat.modified),fmt(stat.created));
        }
        println!();
        let info = self.stat_fs()?;
        println!("{}  BLOCKS FREE: {}  TOTAL BLOCKS: {}  FILES: {}",info.fs_type,info.free_blocks,info.blocks,info.files);
        println!();
        Ok(())
    }
    fn tree(&mut self,include_meta: bool,indent: Option<u16>) -> Result<String,DYNERR> {
        let label = {
            let (_,vol) = self.mounted()?;
            vol.mddf.name()
        };
        let mut tree = json::JsonValue::new_object();
        tree["file_system"] = json::JsonValue::String(FS_NAME.to_string());
        tree["files"] = self.tree_node("",include_meta)?;
        tree["label"] = json::JsonValue::new_object();
        tree["label"]["name"] = json::JsonValue::String(label);
        if let Some(spaces) = indent {
            Ok(json::stringify_pretty(tree,spaces))
        } else {
            Ok(json::stringify(tree))
        }
    }
    fn volume_info(&mut self,indent: Option<u16>) -> Result<String,DYNERR> {
        let (_,vol) = self.mounted()?;
        let m = &vol.mddf;
        let time = |t: u32| match lisa_time(t) {
            Some(t) => json::JsonValue::String(t.format("%Y/%m/%d %H:%M:%S").to_string()),
            None => json::JsonValue::Null
        };
        let mut ans = json::JsonValue::new_object();
        ans["file_system"] = json::JsonValue::String(FS_NAME.to_string());
        ans["version"] = json::JsonValue::String(vol.version.to_string());
        ans["name"] = json::JsonValue::String(m.name());
        ans["volume_id"] = json::JsonValue::String(format!("{:016X}",m.volid));
        ans["volume_number"] = json::JsonValue::Number(m.volnum.into());
        ans["machine_id"] = json::JsonValue::Number(m.machine_id.into());
        ans["master_copy_id"] = json::JsonValue::Number(m.master_copy_id.into());
        ans["serialization"] = json::JsonValue::Number(m.serialization.into());
        ans["time_volume_created"] = time(m.dtvc);
        ans["time_catalog_created"] = time(m.dtcc);
        ans["time_backed_up"] = time(m.dtvb);
        ans["time_scavenged"] = time(m.dtvs);
        ans["mddf_block"] = json::JsonValue::Number(m.mddf_block.into());
        ans["volume_prefix"] = json::JsonValue::Number(vol.prefix.into());
        ans["volume_size"] = json::JsonValue::Number(m.vol_size.into());
        ans["fs_size"] = json::JsonValue::Number(m.fs_size.into());
        ans["block_size"] = json::JsonValue::Number(m.blocksize.into());
        ans["data_size"] = json::JsonValue::Number(m.datasize.into());
        ans["cluster_size"] = json::JsonValue::Number(m.clustersize.into());
        ans["tag_size"] = json::JsonValue::Number(vol.tag_size.into());
        ans["srec_ptr"] = json::JsonValue::Number(m.srec_ptr.into());
        ans["srec_len"] = json::JsonValue::Number(m.srec_len.into());
        ans["files"] = json::JsonValue::Number(m.filecount.into());
        ans["free_blocks"] = json::JsonValue::Number(m.freecount.into());
        ans["catalog_entries"] = json::JsonValue::Number(vol.catalog.len().into());
        ans["left_mounted"] = json::JsonValue::Boolean(m.vol_left_mounted > 0);
        if let Some(spaces) = indent {
            Ok(json::stringify_pretty(ans,spaces))
        } else {
            Ok(json::stringify(ans))
        }
    }
    fn get_img(&mut self) -> &mut Box<dyn img::DiskImage> {
        &mut self.img
    }
}
