use std::{
    fs::{self, File},
    io::{BufWriter, Write as _},
    path::Path,
};

use anyhow::Context;
use serde::Serialize;

/// Writes `value` to `path` as pretty-printed JSON followed by a newline.
pub fn save_json<T>(value: &T, path: &Path) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
{
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
    writeln!(writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("Failed to flush output to {}", path.display()))?;
    tracing::debug!(path = %path.display(), "output written");
    Ok(())
}

pub fn write_text_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    fs::write(path, contents)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "output written");
    Ok(())
}
