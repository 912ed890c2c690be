use clap::ValueEnum;

include!("src/cli.rs");

const CATALOG_ALIASES: [&str;3] = ["(ls)","(dir)","(cat)"];

/// clap_complete only emits the zsh case for the primary name of a subcommand,
/// duplicate the `catalog` case for each alias, and allow `--opt+` style option values.
fn refine_zsh(script: &str) -> String {
    let eq_patt = regex::RegexBuilder::new(r"^'--(\w+)=\[").multi_line(true).build().expect("regex parsing error");
    let intermediate = eq_patt.replace_all(script, "'--$1+[");
    let mut new_script = String::new();
    let mut accum = String::new();
    for line in intermediate.lines() {
        if line=="(catalog)" {
            accum = line.to_string() + "\n";
        } else if accum.len() > 0 {
            accum += line;
            accum += "\n";
            if line==";;" {
                new_script += &accum;
                for alias in CATALOG_ALIASES {
                    new_script += &accum.replace("(catalog)",alias);
                }
                accum = String::new();
            }
        } else {
            new_script += line;
            new_script += "\n";
        }
    }
    new_script
}

fn main() -> Result<(), std::io::Error> {
    if std::env::var("DOCS_RS").is_err() {
        let outdir = match std::env::var_os("CARGO_MANIFEST_DIR") {
            None => return Ok(()),
            Some(root) => std::path::Path::new(&root).join("completions"),
        };
        std::fs::create_dir_all(&outdir)?;

        let mut cmd = build_cli();

        for &shell in clap_complete::Shell::value_variants() {
            clap_complete::generate_to(shell, &mut cmd, "arckit", &outdir)?;
            if shell==clap_complete::Shell::Zsh {
                let script = String::from_utf8_lossy(&std::fs::read(outdir.join("_arckit"))?).to_string();
                std::fs::write(outdir.join("_arckit"),refine_zsh(&script))?;
            }
        }
    }

    Ok(())
}
