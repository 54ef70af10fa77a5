use std::{
    fs::{create_dir_all, File},
    path::Path,
};

use anyhow::Context as _;
use serde::Serialize;

pub mod log_events;

/// Serializes `value` as pretty JSON at `path`, creating parent directories
/// as needed. Used for trace and result dumps.
pub fn dump_json<T>(path: impl AsRef<Path>, value: &T) -> anyhow::Result<()>
where
    T: ?Sized + Serialize,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("cannot serialize to {}", path.display()))?;
    Ok(())
}
