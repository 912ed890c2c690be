//! ## Subchannel packing
//!
//! A sector carries 96 subchannel bytes.  Drives deliver them interleaved, i.e., each byte holds
//! one bit of each channel P (bit 7) through W (bit 0).  Images often store them deinterleaved,
//! as eight consecutive 12 byte channels.  Both functions accept any multiple of 96 bytes.

use super::sector::SUBCHANNEL_SIZE;

/// Eight 12 byte channels in, 96 interleaved bytes out
pub fn interleave(deint: &[u8]) -> Vec<u8> {
    assert_eq!(deint.len() % SUBCHANNEL_SIZE,0);
    let mut ans = vec![0;deint.len()];
    for (src,dst) in deint.chunks_exact(SUBCHANNEL_SIZE).zip(ans.chunks_exact_mut(SUBCHANNEL_SIZE)) {
        for i in 0..SUBCHANNEL_SIZE {
            let mut b = 0;
            for ch in 0..8 {
                let bit = (src[ch*12 + i/8] >> (7 - i%8)) & 1;
                b |= bit << (7 - ch);
            }
            dst[i] = b;
        }
    }
    ans
}

/// Inverse of `interleave`
pub fn deinterleave(int: &[u8]) -> Vec<u8> {
    assert_eq!(int.len() % SUBCHANNEL_SIZE,0);
    let mut ans = vec![0;int.len()];
    for (src,dst) in int.chunks_exact(SUBCHANNEL_SIZE).zip(ans.chunks_exact_mut(SUBCHANNEL_SIZE)) {
        for i in 0..SUBCHANNEL_SIZE {
            for ch in 0..8 {
                let bit = (src[i] >> (7 - ch)) & 1;
                dst[ch*12 + i/8] |= bit << (7 - i%8);
            }
        }
    }
    ans
}

#[test]
fn p_channel_lands_in_msb() {
    let mut deint = vec![0;96];
    deint[0] = 0x80; // first P bit
    deint[12] = 0x01; // eighth Q bit
    let int = interleave(&deint);
    assert_eq!(int[0],0x80);
    assert_eq!(int[7],0x40);
    assert_eq!(int[1..7],[0;6]);
}

#[test]
fn interleave_round_trip() {
    let mut x: u32 = 12345;
    let buf: Vec<u8> = (0..96*3).map(|_| {
        x = x.wrapping_mul(1103515245).wrapping_add(12345);
        (x >> 16) as u8
    }).collect();
    assert_eq!(deinterleave(&interleave(&buf)),buf);
    assert_eq!(interleave(&deinterleave(&buf)),buf);
}
