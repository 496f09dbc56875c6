use log::error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{self, Deserializer};
use std::fs::File;
use std::io::{self, BufWriter, Error, Write};
use std::path::Path;

fn skip_ws(bytes: &[u8], pos: &mut usize) -> Option<u8> {
    while bytes.get(*pos).is_some_and(u8::is_ascii_whitespace) {
        *pos += 1;
    }
    bytes.get(*pos).copied()
}

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn premature_eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "premature EOF")
}

fn yield_next_obj<T: DeserializeOwned>(bytes: &[u8], pos: &mut usize, at_start: &mut bool) -> io::Result<Option<T>> {
    if *at_start {
        match skip_ws(bytes, pos) {
            Some(b',') => *pos += 1,
            Some(b']') => return Ok(None),
            Some(_) => return Err(invalid_data("`,` or `]` not found")),
            None => return Err(premature_eof()),
        }
    } else {
        *at_start = true;
        match skip_ws(bytes, pos) {
            Some(b'[') => *pos += 1,
            Some(_) => return Err(invalid_data("`[` not found")),
            None => return Err(premature_eof()),
        }
        if skip_ws(bytes, pos) == Some(b']') {
            return Ok(None);
        }
    }
    // the slice reader only peeks the delimiter after a scalar, byte_offset points at it
    let mut stream = Deserializer::from_slice(&bytes[*pos..]).into_iter::<T>();
    match stream.next() {
        Some(Ok(value)) => {
            *pos += stream.byte_offset();
            Ok(Some(value))
        }
        Some(Err(err)) => Err(err.into()),
        None => Err(premature_eof()),
    }
}

/// Iterates the elements of a json array, stops after the closing bracket or the first error.
pub(crate) fn json_iter_array<T: DeserializeOwned>(bytes: &[u8]) -> impl Iterator<Item=Result<T, io::Error>> + '_ {
    let mut pos = 0;
    let mut at_start = false;
    let mut finished = false;
    std::iter::from_fn(move || {
        if finished {
            return None;
        }
        let next = yield_next_obj(bytes, &mut pos, &mut at_start);
        if !matches!(next, Ok(Some(_))) {
            finished = true;
        }
        next.transpose()
    })
}

/// Reads a json array file. A missing or empty file yields an empty list,
/// a broken file yields the records before the first unreadable one.
pub(crate) fn json_read_array<T: DeserializeOwned>(file_path: &Path) -> Vec<T> {
    let Ok(bytes) = std::fs::read(file_path) else {
        return vec![];
    };
    let mut documents = vec![];
    for entry in json_iter_array::<T>(&bytes) {
        match entry {
            Ok(doc) => documents.push(doc),
            Err(err) => {
                if err.kind() != io::ErrorKind::UnexpectedEof || !documents.is_empty() {
                    error!("Failed to read {}: {err}", file_path.display());
                }
                break;
            }
        }
    }
    documents
}

/// Writes into a sibling temp file and renames it over the target.
pub(crate) fn json_write_documents_to_file<T>(file: &Path, value: &T) -> Result<(), Error>
    where
        T: ?Sized + Serialize {
    let tmp_file = file.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp_file)?);
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }
    std::fs::rename(&tmp_file, file)
}
