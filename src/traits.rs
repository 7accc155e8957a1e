//! The filter contract shared by every format.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read, Write},
    path::Path,
};

use crate::{error::Error, options::FilterOptions, types::Bundle};

/// Converts between one resource file and one [`Bundle`].
///
/// Implementations are stateless, so one instance may serve many threads.
///
/// # Example
///
/// ```rust
/// use resfilter::{builder::BundleBuilder, default_registry};
///
/// let filter = default_registry().get_single_filter("java").unwrap();
/// let base = b"# greeting\ngreeting = Hello\n";
///
/// let mut builder = BundleBuilder::new(true);
/// builder.add("greeting", "Bonjour");
/// let merged = filter.merge_bytes(base, &builder.build(), None)?;
/// assert_eq!(merged, b"# greeting\ngreeting = Bonjour\n");
/// # Ok::<(), resfilter::Error>(())
/// ```
pub trait ResourceFilter: Send + Sync {
    /// Parses a whole resource file.
    fn parse(&self, input: &mut dyn Read, options: Option<&FilterOptions>) -> Result<Bundle, Error>;

    /// Writes the bundle as a complete resource file.
    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error>;

    /// Re-injects the bundle's values into `base`, leaving everything else untouched.
    ///
    /// Formats without a structure-preserving merge regenerate the file instead.
    fn merge(
        &self,
        base: &mut dyn Read,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let _ = base;
        self.write(output, bundle, options)
    }

    /// Parse from bytes.
    fn parse_bytes(&self, bytes: &[u8], options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        self.parse(&mut Cursor::new(bytes), options)
    }

    /// Write into a fresh buffer.
    fn write_bytes(&self, bundle: &Bundle, options: Option<&FilterOptions>) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.write(&mut out, bundle, options)?;
        Ok(out)
    }

    /// Merge into a fresh buffer.
    fn merge_bytes(
        &self,
        base: &[u8],
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.merge(&mut Cursor::new(base), &mut out, bundle, options)?;
        Ok(out)
    }

    /// Parse from file path.
    fn parse_file(&self, path: &Path, options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let mut reader = BufReader::new(File::open(path)?);
        self.parse(&mut reader, options)
    }

    /// Write to file path.
    fn write_file(
        &self,
        path: &Path,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer, bundle, options)?;
        writer.flush()?;
        Ok(())
    }
}

/// Converts between one resource file and several bundles keyed by bundle id.
pub trait MultiBundleResourceFilter: Send + Sync {
    fn parse(
        &self,
        input: &mut dyn Read,
        options: Option<&FilterOptions>,
    ) -> Result<BTreeMap<String, Bundle>, Error>;

    fn write(
        &self,
        output: &mut dyn Write,
        bundles: &BTreeMap<String, Bundle>,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error>;

    fn merge(
        &self,
        base: &mut dyn Read,
        output: &mut dyn Write,
        bundles: &BTreeMap<String, Bundle>,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let _ = base;
        self.write(output, bundles, options)
    }

    fn parse_bytes(
        &self,
        bytes: &[u8],
        options: Option<&FilterOptions>,
    ) -> Result<BTreeMap<String, Bundle>, Error> {
        self.parse(&mut Cursor::new(bytes), options)
    }

    fn write_bytes(
        &self,
        bundles: &BTreeMap<String, Bundle>,
        options: Option<&FilterOptions>,
    ) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.write(&mut out, bundles, options)?;
        Ok(out)
    }

    fn merge_bytes(
        &self,
        base: &[u8],
        bundles: &BTreeMap<String, Bundle>,
        options: Option<&FilterOptions>,
    ) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.merge(&mut Cursor::new(base), &mut out, bundles, options)?;
        Ok(out)
    }
}
