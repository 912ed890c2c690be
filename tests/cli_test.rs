use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use std::process::Command; // Run programs
use std::path::{Path,PathBuf};
use arckit::img::DiskImage;

mod builders;

fn lisa_image(dir: &Path) -> PathBuf {
    let mut img = builders::LisaBuilder::standard(builders::V3).finish();
    let path = dir.join("vol.dc42");
    std::fs::write(&path,img.to_bytes()).expect("could not write image");
    path
}

fn audio_toc(dir: &Path) -> PathBuf {
    std::fs::write(dir.join("test.bin"),vec![0;150*2352]).expect("could not write data");
    let path = dir.join("test.toc");
    std::fs::write(&path,"CD_DA\nCATALOG \"0123456789012\"\nTRACK AUDIO\nAUDIOFILE \"test.bin\" 0 00:00:00 00:02:00\n").expect("could not write toc");
    path
}

#[test]
fn catalog_lisa() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let img = lisa_image(dir.path());
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("catalog")
        .arg("-d").arg(&img)
        .assert()
        .success()
        .stdout("Hello\nNotes-Draft\nProjects\n");
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("ls")
        .arg("-d").arg(&img)
        .arg("-f").arg("Projects")
        .assert()
        .success()
        .stdout("Plan\n");
    Ok(())
}

#[test]
fn catalog_with_system_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let img = lisa_image(dir.path());
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("catalog")
        .arg("-d").arg(&img)
        .arg("--sys")
        .assert()
        .success()
        .stdout(predicate::str::contains("$MDDF\n"));
    Ok(())
}

#[test]
fn stat_lisa() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let img = lisa_image(dir.path());
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("stat")
        .arg("-d").arg(&img)
        .arg("-f").arg("Hello")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"length\":600"))
        .stdout(predicate::str::contains("com.apple.lisa.serial"));
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("stat")
        .arg("-d").arg(&img)
        .arg("--indent").arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"fs_type\": \"LisaFS v3\""));
    Ok(())
}

#[test]
fn get_lisa_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let img = lisa_image(dir.path());
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("get")
        .arg("-d").arg(&img)
        .arg("-t").arg("file")
        .arg("-f").arg("/Projects/Plan")
        .assert()
        .success()
        .stdout("plan text\n");
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("get")
        .arg("-d").arg(&img)
        .arg("-t").arg("xattr")
        .arg("--xattr").arg("com.apple.lisa.serial")
        .arg("-f").arg("Hello")
        .assert()
        .success()
        .stdout("1234");
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("get")
        .arg("-d").arg(&img)
        .arg("-t").arg("file")
        .arg("-f").arg("Missing")
        .assert()
        .failure();
    Ok(())
}

#[test]
fn tree_lisa() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let img = lisa_image(dir.path());
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("tree")
        .arg("-d").arg(&img)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Projects\":{\"files\":{\"Plan\":{}}}"));
    Ok(())
}

#[test]
fn tracks_cdrdao() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toc = audio_toc(dir.path());
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("tracks")
        .arg("-d").arg(&toc)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"media_type\":\"CD-DA\""))
        .stdout(predicate::str::contains("\"mcn\":\"0123456789012\""))
        .stdout(predicate::str::contains("\"end\":149"))
        .stdout(predicate::str::contains("\"flags\":\"00\""));
    Ok(())
}

#[test]
fn get_optical_sector() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toc = audio_toc(dir.path());
    let mut cmd = Command::cargo_bin("arckit")?;
    let out = cmd.arg("get")
        .arg("-d").arg(&toc)
        .arg("-t").arg("sec")
        .arg("-f").arg("10")
        .output()?;
    assert!(out.status.success());
    assert_eq!(out.stdout,vec![0;2352]);
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("get")
        .arg("-d").arg(&toc)
        .arg("-t").arg("file")
        .arg("-f").arg("10")
        .assert()
        .failure();
    Ok(())
}

#[test]
fn convert_cdrdao_to_clonecd() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toc = audio_toc(dir.path());
    let ccd = dir.path().join("out.ccd");
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("convert")
        .arg("-d").arg(&toc)
        .arg("-o").arg(&ccd)
        .arg("-t").arg("ccd")
        .assert()
        .success();
    assert!(dir.path().join("out.img").exists());
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("tracks")
        .arg("-d").arg(&ccd)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"image_type\":\"ccd\""));
    Ok(())
}

#[test]
fn invalid_item_type() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("get")
        .arg("-d").arg("nothing.dc42")
        .arg("-t").arg("atok")
        .arg("-f").arg("x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("atok"));
    Ok(())
}

#[test]
fn completions() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("arckit")?;
    cmd.arg("completions")
        .arg("-s").arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("arckit"));
    Ok(())
}
