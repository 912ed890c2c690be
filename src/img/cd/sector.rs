//! ## CD sector codec
//!
//! Stateless conversions between the raw 2352 byte sector and the cooked forms
//! that image files are allowed to store.  Layer 2 fields (sync, header, subheader,
//! EDC, P and Q parity) are rebuilt here using the Yellow Book rules.
//!
//! Buffer lengths are preconditions.  Passing the wrong size is a programming error
//! and will panic.

use crc::Crc;
use super::TrackType;

pub const RAW_SECTOR_SIZE: usize = 2352;
pub const SUBCHANNEL_SIZE: usize = 96;
pub const MODE2_SIZE: usize = 2336;
/// sectors in the lead-in before LBA 0, baked into every MSF address
pub const PREGAP_OFFSET: i64 = 150;
pub const SYNC: [u8;12] = [0x00,0xff,0xff,0xff,0xff,0xff,0xff,0xff,0xff,0xff,0xff,0x00];

const CD_ROM_EDC: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_CD_ROM_EDC);

const fn ecc_tables() -> ([u8;256],[u8;256]) {
    let mut f = [0u8;256];
    let mut b = [0u8;256];
    let mut i = 0;
    while i < 256 {
        let j = if i & 0x80 != 0 { (i << 1) ^ 0x11d } else { i << 1 };
        f[i] = j as u8;
        b[i ^ j] = i as u8;
        i += 1;
    }
    (f,b)
}

const fn scramble_table() -> [u8;RAW_SECTOR_SIZE-12] {
    let mut ans = [0u8;RAW_SECTOR_SIZE-12];
    let mut shift: u16 = 1;
    let mut i = 0;
    while i < RAW_SECTOR_SIZE-12 {
        let mut b: u8 = 0;
        let mut bit = 0;
        while bit < 8 {
            b |= ((shift & 1) as u8) << bit;
            let carry = (shift & 1) ^ ((shift >> 1) & 1);
            shift = (carry << 14) | (shift >> 1);
            bit += 1;
        }
        ans[i] = b;
        i += 1;
    }
    ans
}

const ECC_TABLES: ([u8;256],[u8;256]) = ecc_tables();
const SCRAMBLE_TABLE: [u8;RAW_SECTOR_SIZE-12] = scramble_table();

/// Size of the user data for a CDRDAO mode keyword, 0 if the keyword is unknown
pub fn cooked_size(mode: &str) -> usize {
    match mode {
        "MODE1" | "MODE1_RAW" | "MODE2_FORM1" => 2048,
        "MODE2_FORM2" => 2324,
        "MODE2" | "MODE2_FORM_MIX" | "MODE2_RAW" => 2336,
        "AUDIO" => 2352,
        _ => 0
    }
}

pub fn to_bcd(val: u8) -> u8 {
    ((val / 10) << 4) | (val % 10)
}

pub fn from_bcd(val: u8) -> u8 {
    (val >> 4) * 10 + (val & 0x0f)
}

/// Absolute sector to (minute,second,frame), the 150 sector lead-in is added.
/// Addresses inside the lead-in wrap the way the TOC stores them.
pub fn lba_to_msf(lba: i64) -> (u8,u8,u8) {
    let mut pos = lba + PREGAP_OFFSET;
    if pos < 0 {
        pos += 450000;
    }
    ((pos / 75 / 60) as u8, ((pos / 75) % 60) as u8, (pos % 75) as u8)
}

pub fn msf_to_lba(m: u8,s: u8,f: u8) -> i64 {
    m as i64 * 4500 + s as i64 * 75 + f as i64 - PREGAP_OFFSET
}

pub fn sync_ok(sector: &[u8]) -> bool {
    sector.len() >= 12 && sector[0..12] == SYNC
}

pub fn edc(dat: &[u8]) -> u32 {
    CD_ROM_EDC.checksum(dat)
}

/// Pick the form of a 2352 byte Mode 2 sector from its subheader.
/// Disagreeing subheader copies mean there is no form.
pub fn mode2_form(sector: &[u8]) -> TrackType {
    assert_eq!(sector.len(),RAW_SECTOR_SIZE);
    if sector[16..20] != sector[20..24] {
        return TrackType::CdMode2Formless;
    }
    match sector[18] & 0x20 {
        0 => TrackType::CdMode2Form1,
        _ => TrackType::CdMode2Form2
    }
}

/// Strip everything but the user data from a Mode 2 sector.
/// Accepts a full 2352 byte sector or the 2336 bytes that follow the header.
pub fn extract_mode2_user_data(sector: &[u8]) -> Vec<u8> {
    let full = match sector.len() {
        RAW_SECTOR_SIZE => sector.to_vec(),
        MODE2_SIZE => {
            let mut ans = vec![0;16];
            ans[0..12].copy_from_slice(&SYNC);
            ans[15] = 2;
            ans.extend_from_slice(sector);
            ans
        },
        n => panic!("mode 2 sector cannot have {} bytes",n)
    };
    if !sync_ok(&full) || full[15] != 2 {
        return full[16..].to_vec();
    }
    match mode2_form(&full) {
        TrackType::CdMode2Form1 => full[24..24+2048].to_vec(),
        TrackType::CdMode2Form2 => full[24..24+2324].to_vec(),
        _ => full[16..].to_vec()
    }
}

/// Write sync and header for the given mode and absolute sector.
/// For Mode 2 forms both subheader copies are aligned to the second copy
/// with the form bit forced.
pub fn reconstruct_prefix(sector: &mut [u8],track_type: TrackType,lba: i64) {
    assert_eq!(sector.len(),RAW_SECTOR_SIZE);
    let mode = match track_type {
        TrackType::CdMode1 => 1,
        TrackType::CdMode2Form1 | TrackType::CdMode2Form2 | TrackType::CdMode2Formless => 2,
        _ => return
    };
    sector[0..12].copy_from_slice(&SYNC);
    let (m,s,f) = lba_to_msf(lba);
    sector[12] = to_bcd(m);
    sector[13] = to_bcd(s);
    sector[14] = to_bcd(f);
    sector[15] = mode;
    match track_type {
        TrackType::CdMode2Form1 => {
            sector[0x16] &= 0xdf;
            sector.copy_within(0x14..0x18,0x10);
        },
        TrackType::CdMode2Form2 => {
            sector[0x16] |= 0x20;
            sector.copy_within(0x14..0x18,0x10);
        },
        _ => {}
    }
}

fn ecc_block(src: &[u8],major_count: usize,minor_count: usize,major_mult: usize,minor_inc: usize,dest: &mut [u8]) {
    let (ecc_f,ecc_b) = &ECC_TABLES;
    let size = major_count * minor_count;
    for major in 0..major_count {
        let mut index = (major >> 1) * major_mult + (major & 1);
        let mut a: u8 = 0;
        let mut b: u8 = 0;
        for _minor in 0..minor_count {
            let temp = src[index];
            index += minor_inc;
            if index >= size {
                index -= size;
            }
            a ^= temp;
            b ^= temp;
            a = ecc_f[a as usize];
        }
        a = ecc_b[(ecc_f[a as usize] ^ b) as usize];
        dest[major] = a;
        dest[major + major_count] = a ^ b;
    }
}

/// P and Q parity, Form 1 computes them as if the header were zero
fn write_parity(sector: &mut [u8],zero_address: bool) {
    let mut header = [0u8;4];
    header.copy_from_slice(&sector[12..16]);
    if zero_address {
        sector[12..16].fill(0);
    }
    let mut p = [0u8;172];
    ecc_block(&sector[12..],86,24,2,86,&mut p);
    sector[0x81c..0x8c8].copy_from_slice(&p);
    let mut q = [0u8;104];
    ecc_block(&sector[12..],52,43,86,88,&mut q);
    sector[0x8c8..0x930].copy_from_slice(&q);
    if zero_address {
        sector[12..16].copy_from_slice(&header);
    }
}

/// Fill in the EDC and the P/Q parity for the mode.  Audio and formless sectors are untouched.
pub fn reconstruct_ecc(sector: &mut [u8],track_type: TrackType) {
    assert_eq!(sector.len(),RAW_SECTOR_SIZE);
    match track_type {
        TrackType::CdMode1 => {
            let sum = edc(&sector[0..0x810]);
            sector[0x810..0x814].copy_from_slice(&u32::to_le_bytes(sum));
            sector[0x814..0x81c].fill(0);
            write_parity(sector,false);
        },
        TrackType::CdMode2Form1 => {
            let sum = edc(&sector[0x10..0x818]);
            sector[0x818..0x81c].copy_from_slice(&u32::to_le_bytes(sum));
            write_parity(sector,true);
        },
        TrackType::CdMode2Form2 => {
            let sum = edc(&sector[0x10..0x92c]);
            sector[0x92c..0x930].copy_from_slice(&u32::to_le_bytes(sum));
        },
        _ => {}
    }
}

/// Check the stored EDC against the data, modes without an EDC pass trivially
pub fn edc_ok(sector: &[u8],track_type: TrackType) -> bool {
    assert_eq!(sector.len(),RAW_SECTOR_SIZE);
    let (range,loc) = match track_type {
        TrackType::CdMode1 => (0..0x810,0x810),
        TrackType::CdMode2Form1 => (0x10..0x818,0x818),
        TrackType::CdMode2Form2 => (0x10..0x92c,0x92c),
        _ => return true
    };
    let stored = u32::from_le_bytes([sector[loc],sector[loc+1],sector[loc+2],sector[loc+3]]);
    // form 2 allows a zero EDC to mean not computed
    if track_type==TrackType::CdMode2Form2 && stored==0 {
        return true;
    }
    edc(&sector[range])==stored
}

/// ECMA-130 scrambler, applied to everything after the sync.  Running it twice restores the sector.
pub fn scramble(sector: &mut [u8]) {
    assert_eq!(sector.len(),RAW_SECTOR_SIZE);
    for (b,s) in sector[12..].iter_mut().zip(SCRAMBLE_TABLE.iter()) {
        *b ^= *s;
    }
}

/// Byte swap of 16 bit samples, done in place
pub fn swap_audio(buf: &mut [u8]) {
    for pair in buf.chunks_exact_mut(2) {
        pair.swap(0,1);
    }
}

#[cfg(test)]
fn make_sector(track_type: TrackType,lba: i64,user: &[u8]) -> Vec<u8> {
    let mut sector = vec![0;RAW_SECTOR_SIZE];
    match track_type {
        TrackType::CdMode1 => sector[16..16+user.len()].copy_from_slice(user),
        TrackType::CdMode2Form2 => {
            sector[0x16] = 0x20;
            sector[24..24+user.len()].copy_from_slice(user)
        },
        _ => sector[24..24+user.len()].copy_from_slice(user)
    }
    reconstruct_prefix(&mut sector,track_type,lba);
    reconstruct_ecc(&mut sector,track_type);
    sector
}

#[test]
fn msf_round_trip() {
    for lba in 0..450000 {
        let (m,s,f) = lba_to_msf(lba);
        assert_eq!(msf_to_lba(m,s,f),lba);
    }
    assert_eq!(lba_to_msf(0),(0,2,0));
    assert_eq!(lba_to_msf(-150),(0,0,0));
}

#[test]
fn bcd_conversion() {
    assert_eq!(to_bcd(59),0x59);
    assert_eq!(from_bcd(0x74),74);
}

#[test]
fn edc_check_value() {
    assert_eq!(edc(b"123456789"),0x6ec2edc4);
}

#[test]
fn mode1_layer2() {
    let user: Vec<u8> = (0..2048).map(|i| (i & 0xff) as u8).collect();
    let sector = make_sector(TrackType::CdMode1,16,&user);
    assert_eq!(sector[12..16],hex::decode("00021601").unwrap());
    assert_eq!(sector[0x810..0x814],hex::decode("5e935192").unwrap());
    assert_eq!(sector[0x81c..0x824],hex::decode("421328942172d586").unwrap());
    assert_eq!(sector[0x8c8..0x8d0],hex::decode("46e94486f12ae20b").unwrap());
    assert_eq!(sector[0x928..0x930],hex::decode("d9d2987d897c8e23").unwrap());
    assert!(edc_ok(&sector,TrackType::CdMode1));
    let mut bad = sector.clone();
    bad[100] ^= 1;
    assert!(!edc_ok(&bad,TrackType::CdMode1));
}

#[test]
fn mode2_extraction_idempotent() {
    let user1: Vec<u8> = (0..2048).map(|i| (i*7 & 0xff) as u8).collect();
    let user2: Vec<u8> = (0..2324).map(|i| (i*3 & 0xff) as u8).collect();
    let form1 = make_sector(TrackType::CdMode2Form1,1000,&user1);
    let form2 = make_sector(TrackType::CdMode2Form2,1001,&user2);
    assert_eq!(extract_mode2_user_data(&form1),user1);
    assert_eq!(extract_mode2_user_data(&form2),user2);
    assert_eq!(extract_mode2_user_data(&form1[16..]),user1);
    assert!(edc_ok(&form1,TrackType::CdMode2Form1));
    assert!(edc_ok(&form2,TrackType::CdMode2Form2));
    // no sync means no form
    let mut formless = form1.clone();
    formless[0] = 0x55;
    assert_eq!(extract_mode2_user_data(&formless).len(),MODE2_SIZE);
}

#[test]
fn scramble_involution() {
    let user: Vec<u8> = (0..2048).map(|i| (i % 251) as u8).collect();
    let sector = make_sector(TrackType::CdMode1,200,&user);
    let mut scrambled = sector.clone();
    scramble(&mut scrambled);
    assert_eq!(scrambled[0..12],SYNC);
    assert_eq!(scrambled[12..16],[sector[12]^0x01,sector[13]^0x80,sector[14],sector[15]^0x60]);
    scramble(&mut scrambled);
    assert_eq!(scrambled,sector);
}

#[test]
fn audio_swap_involution() {
    let orig: Vec<u8> = (0..64).collect();
    let mut buf = orig.clone();
    swap_audio(&mut buf);
    assert_eq!(buf[0..4],[1,0,3,2]);
    swap_audio(&mut buf);
    assert_eq!(buf,orig);
}

#[test]
fn cooked_sizes() {
    assert_eq!(cooked_size("MODE1_RAW"),2048);
    assert_eq!(cooked_size("MODE2_FORM2"),2324);
    assert_eq!(cooked_size("MODE2_FORM_MIX"),2336);
    assert_eq!(cooked_size("AUDIO"),2352);
    assert_eq!(cooked_size("CDG"),0);
}
