use std::io;
use std::path::Path;
use std::process::Command;

/// Reveal a file in the platform's file browser. Fire-and-forget: the
/// command is spawned and never waited on.
#[cfg(target_os = "windows")]
pub fn reveal_in_file_browser(path: &Path) -> io::Result<()> {
    Command::new("explorer")
        .arg("/select,")
        .arg(path)
        .spawn()
        .map(|_| ())
}

#[cfg(target_os = "macos")]
pub fn reveal_in_file_browser(path: &Path) -> io::Result<()> {
    Command::new("open").arg("-R").arg(path).spawn().map(|_| ())
}

#[cfg(target_os = "linux")]
pub fn reveal_in_file_browser(path: &Path) -> io::Result<()> {
    Command::new("nautilus")
        .arg("--select")
        .arg(path)
        .spawn()
        .map(|_| ())
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
pub fn reveal_in_file_browser(_path: &Path) -> io::Result<()> {
    Ok(())
}
