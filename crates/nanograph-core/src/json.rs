//! JSON file helpers.
//!
//! Files are written pretty-printed with two-space indentation and non-ASCII
//! text kept as UTF-8. A missing file reads as `None` so first runs against an
//! empty working directory need no special casing.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::GraphResult;

pub fn write_json<T>(value: &T, path: impl AsRef<Path>) -> GraphResult<()>
where
    T: Serialize + ?Sized,
{
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    tracing::debug!(path = %path.display(), "JSON file written");
    Ok(())
}

pub fn load_json<T>(path: impl AsRef<Path>) -> GraphResult<Option<T>>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "JSON file not found");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(value))
}
