// Synthetic Lisa volumes on DiskCopy 4.2 images, built sector by sector.
// Layout (absolute sectors, pointers on disk are relative to the MDDF at 4):
// 0 boot, 1-2 loader, 4 MDDF, 5 bitmap, 6 S-Records,
// 10-17 V3 catalog (two linked blocks), 20-21 V1/V2 catalog file,
// 30.. extents of file 5, 40.. file 6, 50.. file 8.
#![allow(dead_code)]

use arckit::img::dc42::Dc42;

pub const SECTORS: usize = 800;
pub const MDDF_ABS: u64 = 4;
pub const SREC_ABS: u64 = 6;
pub const CAT3_ABS: u64 = 10;
pub const CAT3_NEXT_ABS: u64 = 14;
pub const CAT2_EXT_ABS: u64 = 20;
pub const HELLO_LEN: usize = 600;
pub const HELLO_SERIAL: u32 = 1234;
pub const ONE_YEAR: u32 = 86400*365;

pub const V1: u16 = 0x0e;
pub const V2: u16 = 0x0f;
pub const V3: u16 = 0x11;

fn rel(abs: u64) -> u32 {
    (abs - MDDF_ABS) as u32
}

pub fn hello_data() -> Vec<u8> {
    (0..HELLO_LEN).map(|i| (i % 251) as u8).collect()
}

pub struct LisaBuilder {
    pub img: Dc42,
    pub version: u16,
    srec: Vec<u8>
}

impl LisaBuilder {
    pub fn new(version: u16) -> Self {
        Self {
            img: Dc42::create("lisa test",SECTORS,12),
            version,
            srec: vec![0;512]
        }
    }
    pub fn tag(&mut self,abs: u64,file_id: i16,rel_page: u16) {
        let mut tag = [0u8;12];
        tag[4..6].copy_from_slice(&file_id.to_be_bytes());
        tag[6..8].copy_from_slice(&rel_page.to_be_bytes());
        self.img.write_sector_tag(abs,&tag).expect("tag write failed");
    }
    pub fn sector(&mut self,abs: u64,dat: &[u8]) {
        let mut buf = vec![0u8;512];
        buf[0..dat.len()].copy_from_slice(dat);
        self.img.write_sector(abs,&buf).expect("sector write failed");
    }
    fn extents_sectors(&self) -> u64 {
        match self.version {
            V1 => 2,
            _ => 1
        }
    }
    /// Extents file at `abs`, data follows right after it
    pub fn file(&mut self,id: i16,name: &str,abs: u64,dat: &[u8],decorate: bool) {
        let ext_count = self.extents_sectors();
        let data_abs = abs + ext_count;
        let blocks = (dat.len() + 511) / 512;
        let mut ext = vec![0u8;1024];
        ext[0] = name.len() as u8;
        ext[1..1+name.len()].copy_from_slice(name.as_bytes());
        ext[0x2c] = 14;
        ext[0x30..0x34].copy_from_slice(&ONE_YEAR.to_be_bytes());
        ext[0x38..0x3c].copy_from_slice(&(2*ONE_YEAR).to_be_bytes());
        if decorate {
            ext[0x44..0x48].copy_from_slice(&HELLO_SERIAL.to_be_bytes());
            ext[0x49] = 1;
            ext[0x64] = 1;
            ext[0x65..0x6b].copy_from_slice(b"SECRET");
            ext[0x180..0x189].copy_from_slice(b"LisaWrite");
        }
        let (len_off,ext_off) = match self.version {
            V1 => (0x200,0x208),
            _ => (0x80,0x88)
        };
        ext[len_off..len_off+4].copy_from_slice(&(blocks as u32).to_be_bytes());
        ext[ext_off..ext_off+4].copy_from_slice(&rel(data_abs).to_be_bytes());
        ext[ext_off+4..ext_off+6].copy_from_slice(&(blocks as u16).to_be_bytes());
        for i in 0..ext_count {
            let start = i as usize * 512;
            self.sector(abs+i,&ext[start..start+512]);
        }
        self.tag(abs,-id,0);
        for b in 0..blocks {
            let end = usize::min(dat.len(),(b+1)*512);
            self.sector(data_abs + b as u64,&dat[b*512..end]);
            self.tag(data_abs + b as u64,id,b as u16);
        }
        self.srec_entry(id,rel(abs),dat.len() as u32);
    }
    pub fn srec_entry(&mut self,id: i16,extent_ptr: u32,size: u32) {
        let off = id as usize * 14;
        self.srec[off..off+4].copy_from_slice(&extent_ptr.to_be_bytes());
        self.srec[off+8..off+12].copy_from_slice(&size.to_be_bytes());
    }
    fn system_area(&mut self) {
        self.sector(0,b"BOOT");
        self.tag(0,-21846,0);
        self.sector(1,b"LOADER PAGE 1");
        self.tag(1,-17477,1);
        self.sector(2,b"LOADER PAGE 2");
        self.tag(2,-17477,2);
        self.sector(5,&[0xff;8]);
        self.tag(5,2,0);
    }
    pub fn mddf(&mut self,files: u16) -> Vec<u8> {
        let mut m = vec![0u8;512];
        m[0..2].copy_from_slice(&self.version.to_be_bytes());
        m[2..10].copy_from_slice(&0x0123456789abcdefu64.to_be_bytes());
        m[0x0c] = 7;
        m[0x0d..0x14].copy_from_slice(b"Archive");
        m[0x2e] = 4;
        m[0x2f..0x33].copy_from_slice(b"PASS");
        m[0x58..0x5c].copy_from_slice(&ONE_YEAR.to_be_bytes());
        m[0x6c..0x70].copy_from_slice(&(MDDF_ABS as u32).to_be_bytes());
        m[0x70..0x74].copy_from_slice(&(SECTORS as u32 - 1).to_be_bytes());
        m[0x74..0x78].copy_from_slice(&(SECTORS as u32 - MDDF_ABS as u32 - 1).to_be_bytes());
        m[0x78..0x7c].copy_from_slice(&(SECTORS as u32).to_be_bytes());
        m[0x7c..0x7e].copy_from_slice(&512u16.to_be_bytes());
        m[0x7e..0x80].copy_from_slice(&512u16.to_be_bytes());
        m[0x94..0x98].copy_from_slice(&rel(SREC_ABS).to_be_bytes());
        m[0x9a..0x9c].copy_from_slice(&1u16.to_be_bytes());
        m[0xb0..0xb2].copy_from_slice(&files.to_be_bytes());
        m[0xba..0xbe].copy_from_slice(&700u32.to_be_bytes());
        m
    }
    fn v2_entry(name: &str,id: i16) -> Vec<u8> {
        let mut e = vec![0u8;54];
        e[0] = name.len() as u8;
        e[1..1+name.len()].copy_from_slice(name.as_bytes());
        e[34] = 3;
        e[36..38].copy_from_slice(&id.to_be_bytes());
        e
    }
    fn v3_entry(parent: i16,name: &str,id: i16,is_dir: bool,len: u32) -> Vec<u8> {
        let mut e = vec![0u8;64];
        e[0] = 0x24;
        e[1..3].copy_from_slice(&parent.to_be_bytes());
        e[3..3+name.len()].copy_from_slice(name.as_bytes());
        e[0x24] = match is_dir { true => 0x01, false => 0x03 };
        e[0x26..0x28].copy_from_slice(&id.to_be_bytes());
        e[0x28..0x2c].copy_from_slice(&ONE_YEAR.to_be_bytes());
        e[0x30..0x34].copy_from_slice(&len.to_be_bytes());
        match is_dir {
            true => e[0..48].to_vec(),
            false => e
        }
    }
    fn catalog_block(&mut self,abs: u64,first_page: u16,entries: &[Vec<u8>],prev: u32,next: u32) {
        let mut block = vec![0u8;2048];
        let mut header = vec![0u8;78];
        header[0x24] = 0x08;
        let mut off = 0;
        for e in std::iter::once(&header).chain(entries.iter()) {
            block[off..off+e.len()].copy_from_slice(e);
            off += e.len();
        }
        block[off+0x24] = 0xff;
        block[0x7f6..0x7fa].copy_from_slice(&prev.to_be_bytes());
        block[0x7fa..0x7fe].copy_from_slice(&next.to_be_bytes());
        for i in 0..4 {
            self.sector(abs+i,&block[i as usize*512..(i as usize+1)*512]);
            self.tag(abs+i,4,first_page + i as u16);
        }
    }
    /// A complete volume with files `Hello`, `Notes/Draft`, and on V3 `Projects/Plan`
    pub fn standard(version: u16) -> Self {
        let mut b = Self::new(version);
        b.system_area();
        b.file(5,"Hello",30,&hello_data(),true);
        b.file(6,"Notes/Draft",40,&[b'N';100],false);
        if version==V3 {
            b.file(8,"Plan",50,b"plan text\n",false);
            let block1 = vec![
                Self::v3_entry(0,"Projects",7,true,0),
                Self::v3_entry(0,"Hello",5,false,HELLO_LEN as u32),
                Self::v3_entry(0,"Notes/Draft",6,false,100)
            ];
            let block2 = vec![
                Self::v3_entry(7,"Plan",8,false,10),
                // directory that is its own parent
                Self::v3_entry(9,"Loop",9,true,0),
                // file without extents
                Self::v3_entry(0,"Ghost",10,false,55)
            ];
            b.catalog_block(CAT3_ABS,0,&block1,0xffffffff,rel(CAT3_NEXT_ABS));
            b.catalog_block(CAT3_NEXT_ABS,4,&block2,rel(CAT3_ABS),0xffffffff);
        } else {
            let mut cat = Vec::new();
            cat.append(&mut Self::v2_entry("Hello",5));
            cat.append(&mut Self::v2_entry("Notes/Draft",6));
            // beyond the S-Records
            cat.append(&mut Self::v2_entry("Stray",40));
            // erased
            cat.append(&mut vec![0u8;54]);
            let mut ext = vec![0u8;1024];
            ext[0] = 7;
            ext[1..8].copy_from_slice(b"Catalog");
            let (len_off,ext_off) = match version {
                V1 => (0x200,0x208),
                _ => (0x80,0x88)
            };
            let cat_abs = CAT2_EXT_ABS + b.extents_sectors();
            ext[len_off..len_off+4].copy_from_slice(&1u32.to_be_bytes());
            ext[ext_off..ext_off+4].copy_from_slice(&rel(cat_abs).to_be_bytes());
            ext[ext_off+4..ext_off+6].copy_from_slice(&1u16.to_be_bytes());
            for i in 0..b.extents_sectors() {
                let start = i as usize * 512;
                b.sector(CAT2_EXT_ABS+i,&ext[start..start+512]);
            }
            b.tag(CAT2_EXT_ABS,-4,0);
            b.sector(cat_abs,&cat);
            b.tag(cat_abs,4,0);
            b.srec_entry(4,rel(CAT2_EXT_ABS),512);
        }
        let mddf = b.mddf(3);
        b.sector(MDDF_ABS,&mddf);
        b.tag(MDDF_ABS,1,0);
        let srec = b.srec.clone();
        b.sector(SREC_ABS,&srec);
        b.tag(SREC_ABS,3,0);
        b
    }
    pub fn finish(self) -> Dc42 {
        self.img
    }
}
