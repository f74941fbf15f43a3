//! Writing correlation functions and their analysis as text tables.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::Error;
use crate::correlators::ObservableInfo;
use crate::result::{Analysis, AnalysisValue, CorrelationResult};

/// An `Output` is a sink for named text tables
pub trait Output {
    /// Open the table with the given name for writing, replacing any
    /// previous content
    fn open(&mut self, name: &str) -> Result<Box<dyn Write + '_>, Error>;
}

/// Keep all tables in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    tables: BTreeMap<String, Vec<u8>>,
}

impl MemoryOutput {
    /// Create an empty `MemoryOutput`
    pub fn new() -> MemoryOutput {
        MemoryOutput::default()
    }

    /// Get the content of the table with the given name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tables.get(name).and_then(|table| std::str::from_utf8(table).ok())
    }

    /// Get the names of all tables
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tables.keys().map(|name| name.as_str())
    }
}

impl Output for MemoryOutput {
    fn open(&mut self, name: &str) -> Result<Box<dyn Write + '_>, Error> {
        let table = self.tables.entry(name.to_owned()).or_default();
        table.clear();
        return Ok(Box::new(table));
    }
}

/// Write each table in a separate file, named `<base>.<table name>`
#[derive(Debug, Clone)]
pub struct FileOutput {
    base: PathBuf,
}

impl FileOutput {
    /// Create a `FileOutput` using `base` as prefix of all file names
    pub fn new(base: impl Into<PathBuf>) -> FileOutput {
        FileOutput { base: base.into() }
    }

    /// Get the path of the file containing the table with the given name
    pub fn path(&self, name: &str) -> PathBuf {
        let mut path = self.base.clone().into_os_string();
        path.push(".");
        path.push(name);
        return path.into();
    }
}

impl Output for FileOutput {
    fn open(&mut self, name: &str) -> Result<Box<dyn Write + '_>, Error> {
        let file = File::create(self.path(name))?;
        return Ok(Box::new(BufWriter::new(file)));
    }
}

/// Get the name of a table from the symbol of an observable, and optional
/// tag and suffix
pub fn table_name(symbol: &str, tag: Option<&str>, suffix: Option<&str>) -> String {
    let mut name = symbol.to_owned();
    for part in [tag, suffix].into_iter().flatten() {
        name.push('.');
        name.push_str(part);
    }
    return name;
}

/// Format a number like the `%g` conversion of C `printf`: 6 significant
/// digits, scientific notation for very small or very large numbers, and no
/// trailing zeros.
pub fn format_g(value: f64) -> String {
    const PRECISION: i32 = 6;

    if value.is_nan() {
        return "nan".into();
    } else if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    } else if value == 0.0 {
        return if value.is_sign_negative() { "-0".into() } else { "0".into() };
    }

    // rounding to the requested precision can change the exponent, e.g. for
    // 999999.5, so get it from the formatted value
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", strip_zeros(mantissa), sign, exponent.abs());
    }

    let decimals = (PRECISION - 1 - exponent) as usize;
    return strip_zeros(&format!("{:.*}", decimals, value)).to_owned();
}

fn strip_zeros(value: &str) -> &str {
    if value.contains('.') {
        value.trim_end_matches('0').trim_end_matches('.')
    } else {
        value
    }
}

/// Write a correlation function as a text table.
///
/// The table starts with comment lines containing the title, names of the
/// columns, tag and scalar results of the analysis. Results with two axes
/// are written one row per point, with a blank line between different
/// values on the first axis.
pub(crate) fn write_correlation(
    writer: &mut dyn Write,
    info: &ObservableInfo,
    tag: Option<&str>,
    result: &CorrelationResult,
    analysis: &Analysis,
) -> Result<(), Error> {
    writeln!(writer, "# title: {} {}", info.long_name, info.short_name)?;

    let mut columns = info.axes.to_vec();
    columns.push(info.symbol);
    writeln!(writer, "# columns: {}", columns.join(", "))?;

    if let Some(tag) = tag {
        writeln!(writer, "# tag: {}", tag)?;
    }

    for (key, value) in analysis {
        if let AnalysisValue::Scalar(value) = value {
            writeln!(writer, "# {}: {}", key, format_g(*value))?;
        }
    }

    if let Some(value) = result.as_1d() {
        for (x, y) in result.grid[0].iter().zip(value) {
            writeln!(writer, "{} {}", format_g(*x), format_g(*y))?;
        }
    } else if let Some(value) = result.as_2d() {
        for (i, (x, row)) in result.grid[0].iter().zip(value.outer_iter()).enumerate() {
            if i != 0 {
                writeln!(writer)?;
            }
            for (y, z) in result.grid[1].iter().zip(row) {
                writeln!(writer, "{} {} {}", format_g(*x), format_g(*y), format_g(*z))?;
            }
        }
    } else {
        return Err(Error::Internal(format!(
            "can not write a correlation with {} dimensions", result.value.ndim()
        )));
    }

    writer.flush()?;
    return Ok(());
}

/// Write the relaxation times `tau(k)` of an intermediate scattering
/// function. Wave-vectors where `tau` is undefined are written alone.
pub(crate) fn write_relaxation_times(writer: &mut dyn Write, taus: &[(f64, Option<f64>)]) -> Result<(), Error> {
    writeln!(writer, "# title: relaxation times tau(k) as a function of k")?;
    writeln!(writer, "# columns: k, tau(k)")?;
    writeln!(writer, "# note: tau is the time at which the correlation function has decayed to 1/e")?;
    for &(k, tau) in taus {
        match tau {
            Some(tau) => writeln!(writer, "{} {}", format_g(k), format_g(tau))?,
            None => writeln!(writer, "{}", format_g(k))?,
        }
    }

    writer.flush()?;
    return Ok(());
}
