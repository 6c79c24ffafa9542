//! End-to-end checks that the process runner composes with the glue
//! helpers the way the library is meant to be used.

use anyhow::Result;
use netline::{encoding, fs as nfs, run_command, strings};

#[test]
fn shell_rot13_agrees_with_the_local_helper() -> Result<()> {
    let input = "Attack at dawn";
    let out = run_command("tr 'A-Za-z' 'N-ZA-Mn-za-m'", input.as_bytes(), None)?;
    assert_eq!(out.status, 0);
    assert_eq!(out.stdout_text(), strings::str_rot13(input));
    Ok(())
}

#[test]
fn shell_base64_agrees_with_the_local_helper() -> Result<()> {
    let out = run_command("base64", b"netline", None)?;
    assert_eq!(out.status, 0);
    assert_eq!(
        strings::trim_ws(&out.stdout_text()),
        encoding::base64_encode(b"netline")
    );
    Ok(())
}

#[test]
fn redirected_output_survives_where_captured_output_is_best_effort() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("out.txt");
    let out = run_command(
        &format!("cat > {}", path.display()),
        b"written through the shell",
        None,
    )?;
    assert_eq!(out.status, 0);
    assert_eq!(nfs::file_get_contents(&path), "written through the shell");
    assert!(nfs::unlink(&path));
    Ok(())
}
