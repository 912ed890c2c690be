use clap::{value_parser, crate_version, Arg, ArgAction, Command, ValueHint};

const F_LONG_HELP: &str = "interpretation depends on type, for files this is
a path inside the Lisa volume (use `-` where the Lisa name has `/`),
for sectors it is a decimal address, for `flags` and `isrc` it is a track number";
const T_LONG_HELP: &str = "Types are broadly separated into file, sector, and tag categories.
`sec` is user data, `long` is the full 2352 byte optical sector.
Sector tags: tag, sync, header, subheader, ecc, eccp, eccq, edc, sub, flags, isrc.
Media tags (address ignored): mcn, fulltoc, cdtext.";
const SYS_HELP: &str = "expose the MDDF, bitmap, S-Records, and boot blocks as files";

fn file_arg(help: &'static str, req: bool, shell_hint: bool) -> Arg {
    let ans = Arg::new("file").short('f').long("file").value_name("PATH").required(req).help(help);
    if shell_hint {
        ans.value_hint(ValueHint::FilePath)
    } else {
        ans
    }
}

fn indent_arg() -> Arg {
    Arg::new("indent").long("indent").help("JSON indentation, omit to minify")
        .value_name("SPACES")
        .value_parser(value_parser!(u16).range(0..16))
        .required(false)
}

fn dimg_arg(req: bool) -> Arg {
    Arg::new("dimg").short('d').long("dimg").help("path to disk image itself")
        .value_name("PATH")
        .value_hint(ValueHint::FilePath)
        .required(req)
}

fn sys_arg() -> Arg {
    Arg::new("sys").long("sys").help("show system files").long_help(SYS_HELP).action(ArgAction::SetTrue)
}

pub fn build_cli() -> Command {
    let long_help = "arckit is always invoked with exactly one of several subcommands.
Lisa volumes are read from DiskCopy 4.2 images.
Optical images are opened through their CDRDAO (.toc) or CloneCD (.ccd) descriptor.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
list Lisa files:       `arckit catalog -d office.dc42`
extract a Lisa file:   `arckit get -t file -f LisaWrite-Doc -d office.dc42 > doc.bin`
show the Lisa tree:    `arckit tree --meta --indent 2 -d office.dc42`
optical track list:    `arckit tracks --indent 2 -d game.toc`
raw sector:            `arckit get -t long -f 16 -d game.ccd`
convert descriptor:    `arckit convert -d game.ccd -o game.toc -t toc`";

    let get_types = [
        "file", "xattr", "sec", "long", "tag", "sync", "header", "subheader", "ecc", "eccp", "eccq",
        "edc", "sub", "flags", "isrc", "mcn", "fulltoc", "cdtext",
    ];

    let mut main_cmd = Command::new("arckit")
        .about("Reads archived Apple Lisa volumes and optical disc images.")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(
        Command::new("catalog")
            .arg(file_arg("path of directory inside disk image",false,false))
            .arg(dimg_arg(true))
            .arg(sys_arg())
            .visible_alias("cat")
            .visible_alias("dir")
            .visible_alias("ls")
            .about("write disk image catalog to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("tree")
            .arg(dimg_arg(true))
            .arg(Arg::new("meta").long("meta").help("include metadata").action(ArgAction::SetTrue))
            .arg(sys_arg())
            .arg(indent_arg())
            .about("write directory tree as a JSON string to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("stat")
            .arg(file_arg("path inside disk image, omit for the volume",false,false))
            .arg(dimg_arg(true))
            .arg(sys_arg())
            .arg(indent_arg())
            .about("write file or volume statistics as a JSON string to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("get")
            .arg(file_arg("path or address inside disk image",true,false).long_help(F_LONG_HELP))
            .arg(Arg::new("type").long("type").short('t').help("type of the item")
                .value_name("TYPE").required(true).value_parser(get_types).long_help(T_LONG_HELP)
            )
            .arg(dimg_arg(true))
            .arg(Arg::new("xattr").long("xattr").help("name of the extended attribute").value_name("NAME").required(false))
            .arg(sys_arg())
            .about("read item from disk image, write to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("tracks")
            .arg(dimg_arg(true))
            .arg(indent_arg())
            .about("write optical image sessions and tracks as a JSON string to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("convert")
            .arg(dimg_arg(true))
            .arg(Arg::new("output").short('o').long("output").help("path of the descriptor to create")
                .value_name("PATH")
                .value_hint(ValueHint::FilePath)
                .required(true)
            )
            .arg(Arg::new("type").long("type").short('t').help("type of optical image to create")
                .value_name("TYPE").required(true).value_parser(["toc","ccd"])
            )
            .arg(Arg::new("separate").long("separate").help("one data file per track (toc only)").action(ArgAction::SetTrue))
            .about("copy an optical image into another descriptor format"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("completions")
            .arg(
                Arg::new("shell").short('s').long("shell").help("shell target").value_name("NAME")
                    .required(true)
                    .value_parser(["bash","elv","fish","ps1","zsh"])
            )
            .about("write completions script to stdout for the specified shell"),
    );
    return main_cmd;
}
