use clap_complete::shells;
use log::error;
use super::CommandError;
use crate::STDRESULT;

pub fn generate(mut main_cmd: clap::Command,cmd: &clap::ArgMatches) -> STDRESULT {
    let shell = cmd.get_one::<String>("shell").expect("required by clap");
    let mut out = std::io::stdout();
    match shell.as_str() {
        "bash" => clap_complete::generate(shells::Bash,&mut main_cmd,"arckit",&mut out),
        "elv" => clap_complete::generate(shells::Elvish,&mut main_cmd,"arckit",&mut out),
        "fish" => clap_complete::generate(shells::Fish,&mut main_cmd,"arckit",&mut out),
        "ps1" => clap_complete::generate(shells::PowerShell,&mut main_cmd,"arckit",&mut out),
        "zsh" => clap_complete::generate(shells::Zsh,&mut main_cmd,"arckit",&mut out),
        _ => {
            error!("unexpected shell {}",shell);
            return Err(Box::new(CommandError::InvalidCommand));
        }
    }
    Ok(())
}
