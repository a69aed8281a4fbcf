//! Thin wrappers around `fitsio` that attach the file path and keyword to
//! errors, and a raw-header dump that the higher layers keep as metadata.

use std::{ffi::CStr, fmt::Display, path::Path};

use fitsio::{hdu::*, FitsFile};

use crate::error::Error;

fn keyword_error(path: &Path, keyword: &str) -> Error {
    Error::FitsKeyword {
        path: path.to_path_buf(),
        keyword: keyword.to_string(),
    }
}

pub(crate) fn fits_open(path: &Path) -> Result<FitsFile, Error> {
    Ok(FitsFile::open(path)?)
}

pub(crate) fn fits_open_hdu<T: DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    path: &Path,
    hdu_description: T,
) -> Result<FitsHdu, Error> {
    fits_fptr.hdu(hdu_description).map_err(|_| Error::Decode {
        path: path.to_path_buf(),
        details: format!("no HDU {hdu_description}"),
    })
}

/// Pull out the value of a keyword that may or may not exist, parsing it into
/// the desired type. cfitsio statuses 202 and 204 mean the keyword is absent.
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    path: &Path,
    keyword: &str,
) -> Result<Option<T>, Error> {
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(key_value) => key_value,
        Err(fitsio::errors::Error::Fits(fe)) if matches!(fe.status, 202 | 204) => return Ok(None),
        Err(_) => return Err(keyword_error(path, keyword)),
    };

    match unparsed_value.trim().parse() {
        Ok(parsed_value) => Ok(Some(parsed_value)),
        Err(_) => Err(keyword_error(path, keyword)),
    }
}

/// Pull out the value of a keyword, parsing it into the desired type.
pub(crate) fn fits_get_required_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    path: &Path,
    keyword: &str,
) -> Result<T, Error> {
    fits_get_optional_key(fits_fptr, hdu, path, keyword)?
        .ok_or_else(|| keyword_error(path, keyword))
}

/// Get a column from a fits file's HDU.
pub(crate) fn fits_get_col<T: fitsio::tables::ReadsCol>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    path: &Path,
    col: &str,
) -> Result<Vec<T>, Error> {
    hdu.read_col(fits_fptr, col).map_err(|_| Error::Decode {
        path: path.to_path_buf(),
        details: format!("could not read table column {col:?}"),
    })
}

/// The shape of an image HDU, slowest-varying axis first (i.e. `shape[0]` is
/// NAXIS2 for a 2D image).
pub(crate) fn fits_get_image_size<'a>(
    hdu: &'a FitsHdu,
    path: &Path,
) -> Result<&'a Vec<usize>, Error> {
    match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => Ok(shape),
        _ => Err(Error::Decode {
            path: path.to_path_buf(),
            details: "expected an image HDU".to_string(),
        }),
    }
}

/// Read the image associated with a HDU.
pub(crate) fn fits_get_image<T: fitsio::images::ReadImage>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    path: &Path,
) -> Result<T, Error> {
    match &hdu.info {
        HduInfo::ImageInfo { .. } => Ok(hdu.read_image(fits_fptr)?),
        _ => Err(Error::Decode {
            path: path.to_path_buf(),
            details: "expected an image HDU".to_string(),
        }),
    }
}

/// Dump every card of the current HDU as (keyword, value) pairs via the low
/// level header-record functions. COMMENT and HISTORY cards are skipped;
/// valueless cards get `None`.
pub(crate) fn fits_read_header_cards(
    fits_fptr: &mut FitsFile,
    path: &Path,
) -> Result<Vec<(String, Option<String>)>, Error> {
    let not_utf8 = |i: i32| Error::Decode {
        path: path.to_path_buf(),
        details: format!("header card {i} is not UTF-8"),
    };
    let mut cards = vec![];
    unsafe {
        let mut status = 0;
        let mut nkeys = 0;
        let mut more = 0;
        // ffghsp = fits_get_hdrspace
        fitsio_sys::ffghsp(fits_fptr.as_raw(), &mut nkeys, &mut more, &mut status);
        fitsio::errors::check_status(status)?;

        for i in 1..=nkeys {
            let mut keyname = [0 as std::os::raw::c_char; 81];
            let mut value = [0 as std::os::raw::c_char; 81];
            let mut comment = [0 as std::os::raw::c_char; 81];
            // ffgkyn = fits_read_keyn
            fitsio_sys::ffgkyn(
                fits_fptr.as_raw(),
                i,
                keyname.as_mut_ptr(),
                value.as_mut_ptr(),
                comment.as_mut_ptr(),
                &mut status,
            );
            fitsio::errors::check_status(status)?;

            let keyname = CStr::from_ptr(keyname.as_ptr())
                .to_str()
                .map_err(|_| not_utf8(i))?
                .to_string();
            if keyname.is_empty() || keyname == "COMMENT" || keyname == "HISTORY" {
                continue;
            }
            let value = CStr::from_ptr(value.as_ptr())
                .to_str()
                .map_err(|_| not_utf8(i))?
                .trim()
                .trim_matches('\'')
                .trim()
                .to_string();
            let value = if value.is_empty() { None } else { Some(value) };
            cards.push((keyname, value));
        }
    }
    Ok(cards)
}
