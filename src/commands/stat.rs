use clap;
use crate::STDRESULT;

const DATE_FMT: &str = "%Y/%m/%d %H:%M:%S";

fn time_json(t: Option<chrono::NaiveDateTime>) -> json::JsonValue {
    match t {
        Some(t) => json::JsonValue::String(t.format(DATE_FMT).to_string()),
        None => json::JsonValue::Null
    }
}

fn print_json(obj: json::JsonValue,indent: Option<&u16>) {
    let s = match indent {
        Some(spaces) => json::stringify_pretty(obj,*spaces),
        None => json::stringify(obj)
    };
    println!("{}",s);
}

/// With a path, print the file's stat, otherwise the volume's
pub fn stat(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect("required by clap");
    let mut disk = crate::create_fs_from_file(img_path,super::mount_options(cmd))?;
    let indent = cmd.get_one::<u16>("indent");
    match cmd.get_one::<String>("file") {
        Some(path) => {
            let stat = disk.stat(path)?;
            let mut ans = json::JsonValue::new_object();
            ans["path"] = json::JsonValue::String(path.to_string());
            ans["attributes"] = json::JsonValue::String(stat.attributes.to_string());
            ans["inode"] = json::JsonValue::Number(stat.inode.into());
            ans["links"] = json::JsonValue::Number(stat.links.into());
            ans["length"] = json::JsonValue::Number(stat.length.into());
            ans["block_size"] = json::JsonValue::Number(stat.block_size.into());
            ans["blocks"] = json::JsonValue::Number(stat.blocks.into());
            ans["time_created"] = time_json(stat.created);
            ans["time_accessed"] = time_json(stat.accessed);
            ans["time_modified"] = time_json(stat.modified);
            ans["time_backed_up"] = time_json(stat.backup);
            let mut xattrs = json::JsonValue::new_array();
            for name in disk.list_xattr(path)? {
                xattrs.push(name)?;
            }
            ans["xattrs"] = xattrs;
            print_json(ans,indent);
        },
        None => {
            let info = disk.stat_fs()?;
            let mut ans = json::parse(&disk.volume_info(None)?)?;
            ans["fs_type"] = json::JsonValue::String(info.fs_type);
            ans["free_files"] = json::JsonValue::Number(info.free_files.into());
            ans["filename_length"] = json::JsonValue::Number(info.filename_length.into());
            print_json(ans,indent);
        }
    }
    Ok(())
}

pub fn catalog(cmd: &clap::ArgMatches) -> STDRESULT {
    let default_path = "/".to_string();
    let path_in_img = cmd.get_one::<String>("file").unwrap_or(&default_path);
    let img_path = cmd.get_one::<String>("dimg").expect("required by clap");
    let mut disk = crate::create_fs_from_file(img_path,super::mount_options(cmd))?;
    if atty::is(atty::Stream::Stdout) {
        disk.catalog_to_stdout(path_in_img)
    } else {
        for name in disk.read_dir(path_in_img)? {
            println!("{}",name);
        }
        Ok(())
    }
}

pub fn tree(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect("required by clap");
    let mut disk = crate::create_fs_from_file(img_path,super::mount_options(cmd))?;
    println!("{}",disk.tree(cmd.get_flag("meta"),cmd.get_one::<u16>("indent").copied())?);
    Ok(())
}
