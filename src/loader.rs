//! Image loader registry
//!
//! Decoders live outside the engine. The application owns a
//! [`LoaderRegistry`], registers the decoders it links in, and asks the
//! registry to turn bytes or files into a [`MemBitmap`]. Loaders are tried
//! in registration order.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::bitmap::MemBitmap;
use crate::error::{Error, Result};

/// An image decoder
pub trait ImageLoader {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Lowercase file extensions without the dot, e.g. `["png"]`
    fn extensions(&self) -> &[&str];

    /// Decode `bytes` into a new bitmap; `Err` carries the reason
    fn decode(&self, bytes: &[u8]) -> std::result::Result<MemBitmap, String>;

    /// Whether this loader should be tried for a file called `name`
    fn accepts(&self, name: &str) -> bool {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return false;
        };
        self.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Handle returned by [`LoaderRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId(u64);

/// Ordered set of image loaders
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: Vec<(LoaderId, Box<dyn ImageLoader>)>,
    next_id: u64,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a loader; it is tried after every loader registered before it
    pub fn register(&mut self, loader: impl ImageLoader + 'static) -> LoaderId {
        let id = LoaderId(self.next_id);
        self.next_id += 1;
        debug!("registered image loader {} ({:?})", loader.name(), loader.extensions());
        self.loaders.push((id, Box::new(loader)));
        id
    }

    /// Remove a loader, returning it. Unknown ids are ignored.
    pub fn unregister(&mut self, id: LoaderId) -> Option<Box<dyn ImageLoader>> {
        let pos = self.loaders.iter().position(|(i, _)| *i == id)?;
        let (_, loader) = self.loaders.remove(pos);
        debug!("unregistered image loader {}", loader.name());
        Some(loader)
    }

    /// Loaders in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn ImageLoader> {
        self.loaders.iter().map(|(_, l)| l.as_ref())
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Decode `bytes` named `name` with the first accepting loader that
    /// succeeds.
    ///
    /// A failing loader passes the bytes on to the next accepting one; if
    /// all of them fail, the last failure is returned.
    pub fn load_bytes(&self, name: &str, bytes: &[u8]) -> Result<MemBitmap> {
        let mut last_err = None;
        for loader in self.iter().filter(|l| l.accepts(name)) {
            match loader.decode(bytes) {
                Ok(bm) => return Ok(bm),
                Err(reason) => {
                    warn!("{} could not decode {}: {}", loader.name(), name, reason);
                    last_err = Some(Error::Decode {
                        loader: loader.name().to_string(),
                        name: name.to_string(),
                        reason,
                    });
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::NoLoader(name.to_string())))
    }

    /// Read and decode an image file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<MemBitmap> {
        let path = path.as_ref();
        let name = path.to_string_lossy();
        if !self.iter().any(|l| l.accepts(&name)) {
            return Err(Error::NoLoader(name.into_owned()));
        }
        let bytes = fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_bytes(&name, &bytes)
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter().map(|l| l.name())).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;

    /// `w`, `h` as single bytes, then one byte per pixel (gray)
    struct Gray;

    impl ImageLoader for Gray {
        fn name(&self) -> &str {
            "gray"
        }
        fn extensions(&self) -> &[&str] {
            &["gray", "g8"]
        }
        fn decode(&self, bytes: &[u8]) -> std::result::Result<MemBitmap, String> {
            let [w, h, data @ ..] = bytes else {
                return Err("missing header".into());
            };
            let (w, h) = (i32::from(*w), i32::from(*h));
            if data.len() != (w * h) as usize {
                return Err(format!("expected {} pixels, got {}", w * h, data.len()));
            }
            let mut bm = MemBitmap::new(w, h);
            for (i, &v) in data.iter().enumerate() {
                let i = i as i32;
                bm.set_pixel(i % w, i / w, crate::pixel::rgba(v, v, v, 255));
            }
            Ok(bm)
        }
    }

    struct Broken(&'static str);

    impl ImageLoader for Broken {
        fn name(&self) -> &str {
            self.0
        }
        fn extensions(&self) -> &[&str] {
            &["gray"]
        }
        fn decode(&self, _bytes: &[u8]) -> std::result::Result<MemBitmap, String> {
            Err("always fails".into())
        }
    }

    #[test]
    fn test_load_bytes_by_extension() {
        let mut reg = LoaderRegistry::new();
        reg.register(Gray);
        let bm = reg.load_bytes("tile.GRAY", &[2, 1, 10, 20]).unwrap();
        assert_eq!((bm.width(), bm.height()), (2, 1));
        assert_eq!(bm.pixel(1, 0), Some(crate::pixel::rgba(20, 20, 20, 255)));

        assert!(matches!(reg.load_bytes("tile.png", &[]), Err(Error::NoLoader(_))));
        assert!(matches!(reg.load_bytes("noext", &[]), Err(Error::NoLoader(_))));
    }

    #[test]
    fn test_falls_through_failing_loaders() {
        let mut reg = LoaderRegistry::new();
        reg.register(Broken("first"));
        reg.register(Gray);
        assert!(reg.load_bytes("a.gray", &[1, 1, 5]).is_ok());

        let err = reg.load_bytes("a.gray", &[9]).unwrap_err();
        match err {
            Error::Decode { loader, .. } => assert_eq!(loader, "gray"),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_registration_order_and_unregister() {
        let mut reg = LoaderRegistry::new();
        let a = reg.register(Broken("a"));
        let b = reg.register(Broken("b"));
        reg.register(Broken("c"));
        let names: Vec<&str> = reg.iter().map(|l| l.name()).collect();
        assert_eq!(names, ["a", "b", "c"]);

        assert_eq!(reg.unregister(b).map(|l| l.name().to_string()), Some("b".into()));
        assert!(reg.unregister(b).is_none());
        let names: Vec<&str> = reg.iter().map(|l| l.name()).collect();
        assert_eq!(names, ["a", "c"]);

        // Ids stay unique after removal
        let d = reg.register(Broken("d"));
        assert_ne!(d, a);
        assert_ne!(d, b);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_load_file_errors() {
        let mut reg = LoaderRegistry::new();
        assert!(matches!(reg.load_file("missing.gray"), Err(Error::NoLoader(_))));
        reg.register(Gray);
        assert!(matches!(
            reg.load_file("/nonexistent/dir/missing.gray"),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_load_file_roundtrip() {
        let mut reg = LoaderRegistry::new();
        reg.register(Gray);
        let path = std::env::temp_dir().join(format!("pixblit-loader-{}.gray", std::process::id()));
        fs::write(&path, [1u8, 2, 7, 9]).unwrap();
        let bm = reg.load_file(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(bm.pixel(0, 1), Some(crate::pixel::rgba(9, 9, 9, 255)));
    }
}
