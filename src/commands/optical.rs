//! Subcommands that work on optical images as a whole

use clap;
use log::{info,error};
use super::CommandError;
use crate::img::{self,SectorTag,OpticalImage};
use crate::STDRESULT;

fn track_json(disc: &mut Box<dyn OpticalImage>,idx: usize) -> Result<json::JsonValue,Box<dyn std::error::Error>> {
    let trk = disc.tracks()[idx].clone();
    let mut ans = json::JsonValue::new_object();
    ans["sequence"] = json::JsonValue::Number(trk.sequence.into());
    ans["session"] = json::JsonValue::Number(trk.session.into());
    ans["type"] = json::JsonValue::String(trk.track_type.to_string());
    ans["start"] = json::JsonValue::Number(trk.start_sector.into());
    ans["end"] = json::JsonValue::Number(trk.end_sector.into());
    ans["pregap"] = json::JsonValue::Number(trk.pregap.into());
    let mut indexes = json::JsonValue::new_object();
    for (i,lba) in &trk.indexes {
        indexes[i.to_string()] = json::JsonValue::Number((*lba).into());
    }
    ans["indexes"] = indexes;
    ans["bytes_per_sector"] = json::JsonValue::Number(trk.bytes_per_sector.into());
    ans["raw_bytes_per_sector"] = json::JsonValue::Number(trk.raw_bytes_per_sector.into());
    ans["file"] = json::JsonValue::String(trk.file.clone());
    ans["file_offset"] = json::JsonValue::Number(trk.file_offset.into());
    ans["subchannel"] = json::JsonValue::String(format!("{:?}",trk.subchannel).to_lowercase());
    ans["flags"] = match disc.read_sector_tag(trk.sequence as u64,SectorTag::TrackFlags) {
        Ok(f) => json::JsonValue::String(hex::encode(f)),
        Err(_) => json::JsonValue::Null
    };
    ans["isrc"] = match disc.read_sector_tag(trk.sequence as u64,SectorTag::TrackIsrc) {
        Ok(isrc) => json::JsonValue::String(String::from_utf8_lossy(&isrc).to_string()),
        Err(_) => json::JsonValue::Null
    };
    Ok(ans)
}

/// Print image info, sessions, and tracks as JSON
pub fn tracks(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect("required by clap");
    let mut disc = crate::create_optical_from_file(img_path)?;
    let info = disc.info().clone();
    let mut ans = json::JsonValue::new_object();
    ans["image_type"] = json::JsonValue::String(info.image_type.to_string());
    ans["media_type"] = json::JsonValue::String(info.media_type.to_string());
    ans["sectors"] = json::JsonValue::Number(info.sectors.into());
    ans["image_size"] = json::JsonValue::Number(info.image_size.into());
    if let Some(c) = info.comments {
        ans["comments"] = json::JsonValue::String(c);
    }
    ans["mcn"] = match disc.read_media_tag(img::MediaTag::Mcn) {
        Ok(mcn) => json::JsonValue::String(String::from_utf8_lossy(&mcn).to_string()),
        Err(_) => json::JsonValue::Null
    };
    let mut sessions = json::JsonValue::new_array();
    for s in disc.sessions() {
        let mut obj = json::JsonValue::new_object();
        obj["sequence"] = json::JsonValue::Number(s.sequence.into());
        obj["start_track"] = json::JsonValue::Number(s.start_track.into());
        obj["end_track"] = json::JsonValue::Number(s.end_track.into());
        obj["start"] = json::JsonValue::Number(s.start_sector.into());
        obj["end"] = json::JsonValue::Number(s.end_sector.into());
        sessions.push(obj)?;
    }
    ans["sessions"] = sessions;
    let mut tracks = json::JsonValue::new_array();
    for i in 0..disc.tracks().len() {
        tracks.push(track_json(&mut disc,i)?)?;
    }
    ans["tracks"] = tracks;
    let s = match cmd.get_one::<u16>("indent") {
        Some(spaces) => json::stringify_pretty(ans,*spaces),
        None => json::stringify(ans)
    };
    println!("{}",s);
    Ok(())
}

/// Copy an optical image into a new descriptor format
pub fn convert(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect("required by clap");
    let out_path = cmd.get_one::<String>("output").expect("required by clap");
    let typ = cmd.get_one::<String>("type").expect("required by clap");
    if img_path==out_path {
        error!("output would overwrite the source");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let mut src = crate::create_optical_from_file(img_path)?;
    let media = src.info().media_type;
    let mut dst = crate::create_optical_writer(out_path,typ,media,cmd.get_flag("separate"))?;
    img::copy_optical(src.as_mut(),dst.as_mut())?;
    info!("wrote {} tracks to {}",src.tracks().len(),out_path);
    Ok(())
}
