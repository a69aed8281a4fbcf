//! Turning heterogeneous inputs (files, directories, globs, URLs, in-memory
//! arrays) into spectrograms.

mod cdf;
mod fits;
mod sav;
mod srs;
mod swaves;
mod tagged;
mod waves;

use std::path::{Path, PathBuf};

use log::{debug, warn};
use ndarray::Array2;
use vec1::Vec1;

pub use cdf::{CdfArchive, CdfReader, CdfVariable};

use crate::{error::Error, meta::Metadata, registry::Registry, spectrogram::Spectrogram};

/// One thing to load.
pub enum Input {
    /// An in-memory data/metadata pair, resolved through the registry like
    /// any decoded file.
    Data { data: Array2<f64>, meta: Metadata },
    /// An already-built spectrogram, passed through untouched.
    Spectrogram(Spectrogram),
    /// A file or directory on disk.
    Path(PathBuf),
    /// A glob pattern.
    Glob(String),
    /// A remote file, fetched through the loader's [`RemoteCache`].
    Url(String),
}

impl Input {
    /// Classify a command-line style string as URL, glob or path.
    pub fn parse(s: &str) -> Input {
        if s.starts_with("http://") || s.starts_with("https://") || s.starts_with("ftp://") {
            Input::Url(s.to_string())
        } else if s.contains(['*', '?', '[']) {
            Input::Glob(s.to_string())
        } else {
            Input::Path(PathBuf::from(s))
        }
    }
}

impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Input {
        Input::Path(path)
    }
}

impl From<&Path> for Input {
    fn from(path: &Path) -> Input {
        Input::Path(path.to_path_buf())
    }
}

/// Fetches remote files into a local cache. The crate ships no HTTP client;
/// applications provide one.
pub trait RemoteCache: Send + Sync {
    /// Download `url` and return the path of the cached copy.
    fn download(&self, url: &str) -> Result<PathBuf, Error>;
}

/// Loads spectrograms from any [`Input`].
pub struct Loader {
    registry: Registry,
    lenient: bool,
    remote_cache: Option<Box<dyn RemoteCache>>,
    cdf_reader: CdfReader,
}

impl Default for Loader {
    fn default() -> Loader {
        Loader::new()
    }
}

impl Loader {
    pub fn new() -> Loader {
        Loader::with_registry(Registry::builtin())
    }

    pub fn with_registry(registry: Registry) -> Loader {
        Loader {
            registry,
            lenient: false,
            remote_cache: None,
            cdf_reader: Box::new(cdf::no_backend),
        }
    }

    /// In lenient mode, inputs that fail to decode are logged and skipped
    /// instead of failing the whole batch. A batch where everything failed
    /// still errors.
    pub fn lenient(mut self, lenient: bool) -> Loader {
        self.lenient = lenient;
        self
    }

    pub fn with_remote_cache(mut self, cache: Box<dyn RemoteCache>) -> Loader {
        self.remote_cache = Some(cache);
        self
    }

    pub fn with_cdf_reader(mut self, reader: CdfReader) -> Loader {
        self.cdf_reader = reader;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Load every input, in input order (directory and glob expansions are
    /// lexicographic).
    pub fn load(&self, inputs: Vec<Input>) -> Result<Vec1<Spectrogram>, Error> {
        let mut results = vec![];
        for input in inputs {
            match self.load_input(input) {
                Ok(mut specs) => results.append(&mut specs),
                Err(e) if self.lenient => warn!("skipping input: {e}"),
                Err(e) => return Err(e),
            }
        }
        Vec1::try_from_vec(results).map_err(|_| Error::NoRecords)
    }

    fn load_input(&self, input: Input) -> Result<Vec<Spectrogram>, Error> {
        match input {
            Input::Spectrogram(s) => Ok(vec![s]),
            Input::Data { data, meta } => Ok(vec![self.registry.construct(data, meta)?]),
            Input::Path(path) => self.load_path(&path),
            Input::Glob(pattern) => self.load_glob(&pattern),
            Input::Url(url) => {
                let cache = self
                    .remote_cache
                    .as_ref()
                    .ok_or_else(|| Error::NoRemoteCache(url.clone()))?;
                let path = cache.download(&url)?;
                self.load_file(&path)
            }
        }
    }

    /// Load a file, or every file directly inside a directory.
    pub fn load_path(&self, path: &Path) -> Result<Vec<Spectrogram>, Error> {
        if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|entry| entry.path())
                .filter(|p| p.is_file())
                .collect();
            files.sort();
            let mut results = vec![];
            for file in files {
                match self.load_file(&file) {
                    Ok(mut specs) => results.append(&mut specs),
                    Err(e) if self.lenient => warn!("skipping {}: {e}", file.display()),
                    Err(e) => return Err(e),
                }
            }
            Ok(results)
        } else if path.is_file() {
            self.load_file(path)
        } else {
            Err(Error::NotFound {
                path: path.to_path_buf(),
            })
        }
    }

    fn load_glob(&self, pattern: &str) -> Result<Vec<Spectrogram>, Error> {
        // glob yields paths in lexicographic order.
        let mut results = vec![];
        let mut matched = false;
        for entry in glob::glob(pattern)? {
            let path = entry.map_err(|e| e.into_error())?;
            if !path.is_file() {
                continue;
            }
            matched = true;
            match self.load_file(&path) {
                Ok(mut specs) => results.append(&mut specs),
                Err(e) if self.lenient => warn!("skipping {}: {e}", path.display()),
                Err(e) => return Err(e),
            }
        }
        if !matched {
            return Err(Error::NotFound {
                path: PathBuf::from(pattern),
            });
        }
        Ok(results)
    }

    /// Decode one file and resolve each decoded record through the registry.
    pub fn load_file(&self, path: &Path) -> Result<Vec<Spectrogram>, Error> {
        debug!("loading {}", path.display());
        let records = match first_extension(path).as_deref() {
            Some("dat") => vec![swaves::read(path)?],
            Some("r1" | "r2") => vec![waves::read(path)?],
            Some("cdf") => {
                let archive = (self.cdf_reader)(path)?;
                cdf::decode(path, &archive)?
            }
            Some("srs") => vec![srs::read(path)?],
            Some("fits" | "fit" | "fts") => vec![tagged::read(path)?],
            other => {
                return Err(Error::UnsupportedExtension {
                    path: path.to_path_buf(),
                    extension: other.map(|e| format!(".{e}")).unwrap_or_default(),
                })
            }
        };
        records
            .into_iter()
            .map(|(data, meta)| self.registry.construct(data, meta))
            .collect()
    }
}

/// The first dot-delimited suffix of the file name, lower-cased, so that
/// `x.srs.gz` dispatches on `srs`.
fn first_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let mut parts = name.trim_start_matches('.').split('.');
    parts.next()?;
    parts.next().map(str::to_lowercase)
}
