use crate::endpoint::Source;
use crate::error::{PipelineError, Result};
use crate::word::{decode, Word};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

struct FileCursor {
    file: File,
    scratch: Vec<u8>,
}

/// Reads words sequentially from a file.
///
/// In looping mode (the default) the file is rewound whenever its end is
/// reached, so the source never runs dry. A request that finds the file
/// already at its end is served from the beginning, while a request that
/// runs into the end part way through returns the short count and the next
/// request starts over. One-shot sources return zero at end-of-file.
pub struct FileSource<W: Word> {
    path: PathBuf,
    looping: bool,
    cursor: Mutex<FileCursor>,
    _word: PhantomData<fn() -> W>,
}

impl<W: Word> FileSource<W> {
    /// Open a looping file source
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_mode(path.as_ref(), true)
    }

    /// Open a source that ends once the file has been read through
    pub fn open_once(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_mode(path.as_ref(), false)
    }

    fn with_mode(path: &Path, looping: bool) -> Result<Self> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| PipelineError::io(path, e))?
            .len();

        if len == 0 || len % W::WIDTH as u64 != 0 {
            return Err(PipelineError::ConfigError(format!(
                "{} holds {} bytes, expected a non-empty multiple of the {}-byte word",
                path.display(),
                len,
                W::WIDTH
            )));
        }

        debug!(
            path = %path.display(),
            words = len / W::WIDTH as u64,
            looping,
            "opened file source"
        );

        Ok(Self {
            path: path.to_path_buf(),
            looping,
            cursor: Mutex::new(FileCursor {
                file,
                scratch: Vec::new(),
            }),
            _word: PhantomData,
        })
    }

    /// Get the path of the input file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the source rewinds at end of file
    pub fn is_looping(&self) -> bool {
        self.looping
    }
}

impl<W: Word> Source<W> for FileSource<W> {
    fn produce(&self, dst: &mut [W]) -> Result<usize> {
        let mut cursor = self.cursor.lock();
        let FileCursor { file, scratch } = &mut *cursor;
        scratch.resize(dst.len() * W::WIDTH, 0);

        let mut filled = 0;
        let mut rewound = false;
        while filled < scratch.len() {
            match file.read(&mut scratch[filled..]) {
                Ok(0) => {
                    if !self.looping {
                        break;
                    }
                    file.seek(SeekFrom::Start(0))
                        .map_err(|e| PipelineError::io(&self.path, e))?;
                    // Hand back what we have; the next request starts over
                    if filled > 0 || rewound {
                        break;
                    }
                    rewound = true;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(PipelineError::io(&self.path, e)),
            }
        }

        Ok(decode(&scratch[..filled], dst))
    }
}

/// Serves one precomputed buffer of pseudo-random words over and over.
///
/// The pattern is generated once at construction; every request is filled by
/// tiling it from its first word. This measures the pipe, not the generator.
pub struct RepeatingRandomSource<W: Word> {
    pattern: Box<[W]>,
}

impl<W: Word> RepeatingRandomSource<W> {
    /// Generate a `len`-word pattern. A fixed `seed` makes the stream
    /// reproducible across runs.
    pub fn new(len: usize, seed: Option<u64>) -> Result<Self> {
        if len == 0 {
            return Err(PipelineError::ConfigError(
                "repeating source needs a pattern of at least 1 word".into(),
            ));
        }

        let mut rng = seeded_rng(seed);
        let pattern: Box<[W]> = (0..len).map(|_| W::from_bits(rng.next_u64())).collect();
        debug!(words = len, ?seed, "generated repeating source pattern");

        Ok(Self { pattern })
    }

    /// Get the precomputed pattern
    pub fn pattern(&self) -> &[W] {
        &self.pattern
    }
}

impl<W: Word> Source<W> for RepeatingRandomSource<W> {
    fn produce(&self, dst: &mut [W]) -> Result<usize> {
        for chunk in dst.chunks_mut(self.pattern.len()) {
            chunk.copy_from_slice(&self.pattern[..chunk.len()]);
        }
        Ok(dst.len())
    }
}

/// Generates fresh pseudo-random words for every request.
pub struct RandomSource<W: Word> {
    rng: Mutex<StdRng>,
    _word: PhantomData<fn() -> W>,
}

impl<W: Word> RandomSource<W> {
    /// Create a source, seeded for reproducible output when `seed` is set
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Mutex::new(seeded_rng(seed)),
            _word: PhantomData,
        }
    }
}

impl<W: Word> Source<W> for RandomSource<W> {
    fn produce(&self, dst: &mut [W]) -> Result<usize> {
        let mut rng = self.rng.lock();
        for word in dst.iter_mut() {
            *word = W::from_bits(rng.next_u64());
        }
        Ok(dst.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn word_file(words: &[u16]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for word in words {
            file.write_all(&word.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_file_source_loops() {
        let words: Vec<u16> = (1..=6).collect();
        let file = word_file(&words);
        let source = FileSource::<u16>::open(file.path()).unwrap();

        let mut out = [0u16; 6];
        assert_eq!(source.produce(&mut out).unwrap(), 6);
        assert_eq!(out.to_vec(), words);

        out = [0; 6];
        assert_eq!(source.produce(&mut out).unwrap(), 6);
        assert_eq!(out.to_vec(), words);
    }

    #[test]
    fn test_file_source_short_read_at_end() {
        let file = word_file(&[1, 2, 3]);
        let source = FileSource::<u16>::open(file.path()).unwrap();

        let mut out = [0u16; 2];
        assert_eq!(source.produce(&mut out).unwrap(), 2);
        assert_eq!(source.produce(&mut out).unwrap(), 1);
        assert_eq!(out[0], 3);
        assert_eq!(source.produce(&mut out).unwrap(), 2);
        assert_eq!(out, [1, 2]);
    }

    #[test]
    fn test_file_source_once_ends() {
        let file = word_file(&[7, 8]);
        let source = FileSource::<u16>::open_once(file.path()).unwrap();
        assert!(!source.is_looping());

        let mut out = [0u16; 4];
        assert_eq!(source.produce(&mut out).unwrap(), 2);
        assert_eq!(source.produce(&mut out).unwrap(), 0);
        assert_eq!(source.produce(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_file_source_rejects_ragged_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
        file.flush().unwrap();

        let result = FileSource::<u16>::open(file.path());
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSource::<u8>::open(dir.path().join("missing.dat"));
        assert!(matches!(result, Err(PipelineError::Io { .. })));
    }

    #[test]
    fn test_repeating_source_tiles_pattern() {
        let source = RepeatingRandomSource::<u8>::new(5, Some(42)).unwrap();
        let pattern = source.pattern().to_vec();

        let mut out = [0u8; 12];
        assert_eq!(source.produce(&mut out).unwrap(), 12);
        assert_eq!(&out[..5], &pattern[..]);
        assert_eq!(&out[5..10], &pattern[..]);
        assert_eq!(&out[10..], &pattern[..2]);
    }

    #[test]
    fn test_repeating_source_is_deterministic() {
        let a = RepeatingRandomSource::<u64>::new(16, Some(7)).unwrap();
        let b = RepeatingRandomSource::<u64>::new(16, Some(7)).unwrap();
        assert_eq!(a.pattern(), b.pattern());
    }

    #[test]
    fn test_repeating_source_empty_pattern() {
        assert!(RepeatingRandomSource::<u8>::new(0, None).is_err());
    }

    #[test]
    fn test_random_source_fills_request() {
        let source = RandomSource::<u32>::new(Some(1));
        let mut first = [0u32; 64];
        let mut second = [0u32; 64];
        assert_eq!(source.produce(&mut first).unwrap(), 64);
        assert_eq!(source.produce(&mut second).unwrap(), 64);
        assert_ne!(first, second);
    }
}
