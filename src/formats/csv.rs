//! CSV filters. Only keys and values are carried; notes and sequence numbers are not stored.

use std::{
    collections::{BTreeMap, HashMap},
    io::{Read, Write},
    sync::Arc,
};

use log::debug;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    builder::BundleBuilder,
    error::Error,
    options::{FilterOptions, unknown_sequence_first},
    registry::{FilterInfo, FilterKind, FilterProvider},
    text::{Fallback, read_text},
    traits::{MultiBundleResourceFilter, ResourceFilter},
    types::Bundle,
};

pub const CSV_ID: &str = "CSV";
pub const CSV_MULTI_ID: &str = "CSV-MULTI";

#[derive(Debug, Deserialize, Serialize)]
pub struct CsvRecord {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ModuleRecord {
    pub module: String,
    pub key: String,
    pub value: String,
}

/// Filter for `CSV`: a `key,value` header followed by one row per entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFilter;

impl ResourceFilter for CsvFilter {
    fn parse(&self, input: &mut dyn Read, _options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let mut builder = BundleBuilder::new(true);
        for record in read_records::<CsvRecord>(input)? {
            builder.add(record.key, record.value);
        }
        let bundle = builder.build();
        debug!("CSV: parsed {} resource strings", bundle.len());
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let records = bundle
            .sorted_resource_strings_with(unknown_sequence_first(options)?)
            .into_iter()
            .map(|rs| CsvRecord {
                key: rs.key.clone(),
                value: rs.value.clone(),
            });
        write_records(output, &["key", "value"], records)?;
        debug!("CSV: wrote {} resource strings", bundle.len());
        Ok(())
    }

    /// Rewrites every base row, replacing the values of keys in the bundle.
    /// Rows for unknown keys are kept and new keys are not added.
    fn merge(
        &self,
        base: &mut dyn Read,
        output: &mut dyn Write,
        bundle: &Bundle,
        _options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let values = bundle.value_map();
        let records = read_records::<CsvRecord>(base)?.into_iter().map(|mut record| {
            if let Some(value) = values.get(record.key.as_str()) {
                record.value = value.to_string();
            }
            record
        });
        write_records(output, &["key", "value"], records)
    }
}

/// Filter for `CSV-MULTI`: `module,key,value` rows, one bundle per module.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiBundleCsvFilter;

impl MultiBundleResourceFilter for MultiBundleCsvFilter {
    fn parse(
        &self,
        input: &mut dyn Read,
        _options: Option<&FilterOptions>,
    ) -> Result<BTreeMap<String, Bundle>, Error> {
        let mut builders: BTreeMap<String, BundleBuilder> = BTreeMap::new();
        for record in read_records::<ModuleRecord>(input)? {
            builders
                .entry(record.module)
                .or_insert_with(|| BundleBuilder::new(true))
                .add(record.key, record.value);
        }
        let bundles: BTreeMap<String, Bundle> = builders
            .into_iter()
            .map(|(module, builder)| (module, builder.build()))
            .collect();
        debug!("CSV-MULTI: parsed {} bundles", bundles.len());
        Ok(bundles)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundles: &BTreeMap<String, Bundle>,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let unknown_first = unknown_sequence_first(options)?;
        let records = bundles.iter().flat_map(|(module, bundle)| {
            bundle
                .sorted_resource_strings_with(unknown_first)
                .into_iter()
                .map(move |rs| ModuleRecord {
                    module: module.clone(),
                    key: rs.key.clone(),
                    value: rs.value.clone(),
                })
        });
        write_records(output, &["module", "key", "value"], records)?;
        debug!("CSV-MULTI: wrote {} bundles", bundles.len());
        Ok(())
    }

    fn merge(
        &self,
        base: &mut dyn Read,
        output: &mut dyn Write,
        bundles: &BTreeMap<String, Bundle>,
        _options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let values: HashMap<&str, HashMap<&str, &str>> = bundles
            .iter()
            .map(|(module, bundle)| (module.as_str(), bundle.value_map()))
            .collect();
        let records = read_records::<ModuleRecord>(base)?.into_iter().map(|mut record| {
            if let Some(value) = values
                .get(record.module.as_str())
                .and_then(|module| module.get(record.key.as_str()))
            {
                record.value = value.to_string();
            }
            record
        });
        write_records(output, &["module", "key", "value"], records)
    }
}

/// Provides `CSV` and `CSV-MULTI`. Not part of the default registry.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use resfilter::{formats::CsvFilterProvider, registry::FilterRegistry};
///
/// let registry = FilterRegistry::with_providers([Arc::new(CsvFilterProvider) as _]);
/// assert!(registry.get_single_filter("csv").is_some());
/// assert!(registry.get_multi_filter("CSV-MULTI").is_some());
/// assert!(registry.get_single_filter("json").is_some());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFilterProvider;

impl FilterProvider for CsvFilterProvider {
    fn available_filters(&self) -> Vec<FilterInfo> {
        vec![
            FilterInfo::new(CSV_ID, FilterKind::Single),
            FilterInfo::new(CSV_MULTI_ID, FilterKind::Multi),
        ]
    }

    fn single_filter(&self, id: &str) -> Option<Arc<dyn ResourceFilter>> {
        id.eq_ignore_ascii_case(CSV_ID)
            .then(|| Arc::new(CsvFilter) as Arc<dyn ResourceFilter>)
    }

    fn multi_filter(&self, id: &str) -> Option<Arc<dyn MultiBundleResourceFilter>> {
        id.eq_ignore_ascii_case(CSV_MULTI_ID)
            .then(|| Arc::new(MultiBundleCsvFilter) as Arc<dyn MultiBundleResourceFilter>)
    }
}

/// Reads every row after the header, by position.
fn read_records<T: DeserializeOwned>(input: &mut dyn Read) -> Result<Vec<T>, Error> {
    let text = read_text(input, Fallback::Utf8)?.text;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let mut records = Vec::new();
    for result in rdr.records() {
        records.push(result?.deserialize(None)?);
    }
    Ok(records)
}

/// Writes the header and the records as RFC 4180 CSV.
fn write_records<T, I>(output: &mut dyn Write, header: &[&str], records: I) -> Result<(), Error>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(output);
    wtr.write_record(header)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
