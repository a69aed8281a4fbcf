//! A minimal reader for uncompressed IDL SAVE files, covering just what the
//! WIND/WAVES daily products use: named numeric arrays.
//!
//! The format is big-endian: a four-byte signature, then a chain of records
//! each carrying its absolute end offset. Only VARIABLE (2) and END (6)
//! records are interpreted; everything else is skipped via the offset.

use std::{collections::HashMap, path::Path};

use log::debug;

use crate::error::Error;

const RECTYPE_VARIABLE: i32 = 2;
const RECTYPE_END: i32 = 6;
const VARSTART: i32 = 7;

/// A numeric array variable. `dims` is in row-major order (IDL's
/// fastest-varying dimension last), `values` matches it.
#[derive(Debug)]
pub(crate) struct SavArray {
    pub(crate) dims: Vec<usize>,
    pub(crate) values: Vec<f64>,
}

/// Variables keyed by their lower-cased names.
#[derive(Debug)]
pub(crate) struct SavFile {
    pub(crate) variables: HashMap<String, SavArray>,
}

struct Cursor<'a> {
    path: &'a Path,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn error(&self, details: impl Into<String>) -> Error {
        Error::Decode {
            path: self.path.to_path_buf(),
            details: details.into(),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(self.error("unexpected end of file")),
        }
    }

    fn read_i32(&mut self) -> Result<i32, Error> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn align4(&mut self) {
        self.pos = (self.pos + 3) & !3;
    }

    /// A length-prefixed string padded out to a four-byte boundary.
    fn read_string(&mut self) -> Result<String, Error> {
        let length = self.read_i32()?;
        if length <= 0 {
            return Ok(String::new());
        }
        let raw = self.take(length as usize)?;
        let s = std::str::from_utf8(raw)
            .map_err(|_| self.error("variable name is not UTF-8"))?
            .to_string();
        self.align4();
        Ok(s)
    }
}

fn read_variable(cursor: &mut Cursor) -> Result<(String, SavArray), Error> {
    let name = cursor.read_string()?.to_lowercase();
    let typecode = cursor.read_i32()?;
    let varflags = cursor.read_i32()?;
    if varflags & 2 == 2 {
        return Err(cursor.error(format!("variable {name:?} is a system variable")));
    }

    let mut dims = vec![];
    let mut nelements = 1usize;
    if varflags & 4 == 4 {
        let arrstart = cursor.read_i32()?;
        if arrstart != 8 {
            return Err(cursor.error(format!("unsupported array descriptor {arrstart}")));
        }
        cursor.take(4)?;
        let _nbytes = cursor.read_i32()?;
        nelements = cursor.read_i32()? as usize;
        let ndims = cursor.read_i32()? as usize;
        cursor.take(8)?;
        let nmax = cursor.read_i32()? as usize;
        let mut all_dims = vec![];
        for _ in 0..nmax {
            all_dims.push(cursor.read_i32()? as usize);
        }
        dims = all_dims.into_iter().take(ndims).collect();
        // IDL stores the fastest-varying dimension first.
        dims.reverse();
    }

    let marker = cursor.read_i32()?;
    if marker != VARSTART {
        return Err(cursor.error(format!(
            "expected the variable-data marker before {name:?}, found {marker}"
        )));
    }

    let mut values = Vec::with_capacity(nelements);
    match typecode {
        // IDL LONG
        3 => {
            for _ in 0..nelements {
                values.push(f64::from(cursor.read_i32()?));
            }
        }
        // IDL FLOAT
        4 => {
            for _ in 0..nelements {
                let b = cursor.take(4)?;
                values.push(f64::from(f32::from_be_bytes([b[0], b[1], b[2], b[3]])));
            }
        }
        // IDL DOUBLE
        5 => {
            for _ in 0..nelements {
                let b = cursor.take(8)?;
                values.push(f64::from_be_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ]));
            }
        }
        other => {
            return Err(cursor.error(format!(
                "variable {name:?} has unsupported type code {other}"
            )))
        }
    }

    if dims.is_empty() {
        dims = vec![nelements];
    }
    Ok((name, SavArray { dims, values }))
}

pub(crate) fn read_sav(path: &Path) -> Result<SavFile, Error> {
    let bytes = std::fs::read(path)?;
    let mut cursor = Cursor {
        path,
        bytes: &bytes,
        pos: 0,
    };

    let signature = cursor.take(4)?;
    match signature {
        b"SR\x00\x04" => {}
        b"SR\x00\x06" => {
            return Err(cursor.error("compressed SAVE files are not supported"));
        }
        _ => return Err(cursor.error("not an IDL SAVE file")),
    }

    let mut variables = HashMap::new();
    loop {
        let record_start = cursor.pos;
        let rectype = cursor.read_i32()?;
        let next_lo = cursor.read_u32()?;
        let next_hi = cursor.read_u32()?;
        let next = (next_lo as u64 + ((next_hi as u64) << 32)) as usize;
        cursor.take(4)?;

        match rectype {
            RECTYPE_END => break,
            RECTYPE_VARIABLE => {
                let (name, array) = read_variable(&mut cursor)?;
                debug!(
                    "{}: SAVE variable {name:?} with dims {:?}",
                    path.display(),
                    array.dims
                );
                variables.insert(name, array);
            }
            _ => {}
        }
        // A bogus offset would loop forever or run off the file.
        if next > bytes.len() {
            return Err(cursor.error("record offset beyond the end of the file"));
        }
        if next <= record_start {
            return Err(cursor.error("record offset does not advance"));
        }
        cursor.pos = next;
    }

    Ok(SavFile { variables })
}
