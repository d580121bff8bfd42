use std::io::Write;

use crate::error::AppResult;

pub fn run(out: &mut impl Write) -> AppResult<()> {
    writeln!(out, "gs-write version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        out,
        "OS/Arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    )?;
    Ok(())
}
