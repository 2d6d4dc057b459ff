//! Conversion between application values and the fixed-width numeric rows a
//! network consumes.
//!
//! Every encoder produces exactly `len()` values per item. Decoding reads
//! from a `Cursor` so that encoders can be chained: a `RecordEncoder`
//! concatenates the encodings of a record's fields and hands each field
//! decoder the cursor in turn.

use crate::error::{Error, Result};
use crate::stats::{CategoryStatistics, ScalarStatistics};

use std::collections::BTreeMap;
use std::fmt::Debug;

/// A read position inside an encoded vector.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    values: &'a [f64],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(values: &'a [f64]) -> Self {
        Cursor {
            values,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.values.len() - self.position
    }

    /// Consumes the next `n` values.
    pub fn take(&mut self, n: usize) -> Result<&'a [f64]> {
        if n > self.remaining() {
            return Err(Error::EncodingOverrun {
                needed: n,
                available: self.remaining(),
            });
        }
        let values = self.values;
        let taken = &values[self.position..self.position + n];
        self.position += n;
        Ok(taken)
    }
}

pub trait Encoder {
    /// The application type this encoder handles.
    type Value;

    /// Number of numeric values produced per item.
    fn len(&self) -> usize;

    /// Appends the encoding of `value` to `out`.
    fn encode_into(&self, value: &Self::Value, out: &mut Vec<f64>) -> Result<()>;

    /// Reads `len()` values from `cursor` and rebuilds the item.
    fn decode_from(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value>;

    fn encode(&self, value: &Self::Value) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(self.len());
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    fn decode(&self, values: &[f64]) -> Result<Self::Value> {
        self.decode_from(&mut Cursor::new(values))
    }
}

/// Passes a single `f64` through unchanged.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityEncoder;

impl Encoder for IdentityEncoder {
    type Value = f64;

    fn len(&self) -> usize {
        1
    }

    fn encode_into(&self, value: &f64, out: &mut Vec<f64>) -> Result<()> {
        out.push(*value);
        Ok(())
    }

    fn decode_from(&self, cursor: &mut Cursor<'_>) -> Result<f64> {
        Ok(cursor.take(1)?[0])
    }
}

/// Maps `[in_min, in_max]` linearly onto `[out_min, out_max]`.
#[derive(Copy, Clone, Debug)]
pub struct ScaleEncoder {
    in_min: f64,
    in_max: f64,
    out_min: f64,
    out_max: f64,
}

impl ScaleEncoder {
    pub fn new(in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> Result<Self> {
        if in_min == in_max || out_min == out_max {
            return Err(Error::InvalidParameter(format!(
                "cannot scale [{}, {}] onto [{}, {}]",
                in_min, in_max, out_min, out_max
            )));
        }
        Ok(ScaleEncoder {
            in_min,
            in_max,
            out_min,
            out_max,
        })
    }

    /// Scales the observed range of `stats` onto `[out_min, out_max]`.
    pub fn from_statistics(stats: &ScalarStatistics, out_min: f64, out_max: f64) -> Result<Self> {
        ScaleEncoder::new(stats.min()?, stats.max()?, out_min, out_max)
    }
}

impl Encoder for ScaleEncoder {
    type Value = f64;

    fn len(&self) -> usize {
        1
    }

    fn encode_into(&self, value: &f64, out: &mut Vec<f64>) -> Result<()> {
        let t = (value - self.in_min) / (self.in_max - self.in_min);
        out.push(self.out_min + (self.out_max - self.out_min) * t);
        Ok(())
    }

    fn decode_from(&self, cursor: &mut Cursor<'_>) -> Result<f64> {
        let y = cursor.take(1)?[0];
        let t = (y - self.out_min) / (self.out_max - self.out_min);
        Ok(self.in_min + (self.in_max - self.in_min) * t)
    }
}

/// Standardizes a value to `(x - mean) / std_dev`.
#[derive(Copy, Clone, Debug)]
pub struct NormalizeEncoder {
    mean: f64,
    std_dev: f64,
}

impl NormalizeEncoder {
    pub fn new(mean: f64, std_dev: f64) -> Result<Self> {
        if !(std_dev > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "standard deviation must be positive, got {}",
                std_dev
            )));
        }
        Ok(NormalizeEncoder { mean, std_dev })
    }

    pub fn from_statistics(stats: &ScalarStatistics) -> Result<Self> {
        NormalizeEncoder::new(stats.mean()?, stats.std_dev()?)
    }
}

impl Encoder for NormalizeEncoder {
    type Value = f64;

    fn len(&self) -> usize {
        1
    }

    fn encode_into(&self, value: &f64, out: &mut Vec<f64>) -> Result<()> {
        out.push((value - self.mean) / self.std_dev);
        Ok(())
    }

    fn decode_from(&self, cursor: &mut Cursor<'_>) -> Result<f64> {
        Ok(cursor.take(1)?[0] * self.std_dev + self.mean)
    }
}

/// Number of integers in `[min, max]`.
fn check_range(min: i64, max: i64) -> Result<u64> {
    if max < min {
        return Err(Error::InvalidParameter(format!(
            "empty integer range [{}, {}]",
            min, max
        )));
    }
    max.checked_sub(min)
        .and_then(|width| width.checked_add(1))
        .map(|count| count as u64)
        .ok_or_else(|| {
            Error::InvalidParameter(format!("integer range [{}, {}] is too wide", min, max))
        })
}

fn out_of_range(value: i64, min: i64, max: i64) -> Error {
    Error::UnknownCategory(format!("{} is outside [{}, {}]", value, min, max))
}

/// One output per integer in `[min, max]`; the unit for the value is set to
/// `on`, the rest to `off`. Decoding picks the largest output.
#[derive(Copy, Clone, Debug)]
pub struct OneHotEncoder {
    min: i64,
    max: i64,
    on: f64,
    off: f64,
}

impl OneHotEncoder {
    pub fn new(min: i64, max: i64) -> Result<Self> {
        OneHotEncoder::with_levels(min, max, 1.0, 0.0)
    }

    pub fn with_levels(min: i64, max: i64, on: f64, off: f64) -> Result<Self> {
        check_range(min, max)?;
        Ok(OneHotEncoder { min, max, on, off })
    }
}

impl Encoder for OneHotEncoder {
    type Value = i64;

    fn len(&self) -> usize {
        (self.max - self.min + 1) as usize
    }

    fn encode_into(&self, value: &i64, out: &mut Vec<f64>) -> Result<()> {
        if *value < self.min || *value > self.max {
            return Err(out_of_range(*value, self.min, self.max));
        }
        let hot = (*value - self.min) as usize;
        out.extend((0..self.len()).map(|i| if i == hot { self.on } else { self.off }));
        Ok(())
    }

    fn decode_from(&self, cursor: &mut Cursor<'_>) -> Result<i64> {
        let values = cursor.take(self.len())?;
        let mut best = 0;
        for (i, &v) in values.iter().enumerate() {
            if v > values[best] {
                best = i;
            }
        }
        Ok(self.min + best as i64)
    }
}

/// Encodes `value - min` in binary, least significant bit first, using as
/// few bits as cover `[min, max]`. Decoding thresholds each output halfway
/// between `off` and `on`.
#[derive(Copy, Clone, Debug)]
pub struct BinaryEncoder {
    min: i64,
    max: i64,
    on: f64,
    off: f64,
    bits: usize,
}

impl BinaryEncoder {
    pub fn new(min: i64, max: i64) -> Result<Self> {
        BinaryEncoder::with_levels(min, max, 1.0, 0.0)
    }

    pub fn with_levels(min: i64, max: i64, on: f64, off: f64) -> Result<Self> {
        let count = check_range(min, max)?;
        Ok(BinaryEncoder {
            min,
            max,
            on,
            off,
            bits: bits_for(count),
        })
    }
}

/// Bits needed to tell `count` values apart, at least one.
fn bits_for(count: u64) -> usize {
    let mut bits = 1;
    while bits < 64 && (1u64 << bits) < count {
        bits += 1;
    }
    bits
}

impl Encoder for BinaryEncoder {
    type Value = i64;

    fn len(&self) -> usize {
        self.bits
    }

    fn encode_into(&self, value: &i64, out: &mut Vec<f64>) -> Result<()> {
        if *value < self.min || *value > self.max {
            return Err(out_of_range(*value, self.min, self.max));
        }
        let offset = (*value - self.min) as u64;
        out.extend((0..self.bits).map(|bit| {
            if (offset >> bit) & 1 == 1 {
                self.on
            } else {
                self.off
            }
        }));
        Ok(())
    }

    fn decode_from(&self, cursor: &mut Cursor<'_>) -> Result<i64> {
        let mid = (self.on + self.off) / 2.0;
        let high_is_on = self.on > self.off;
        let mut offset = 0i64;
        for (bit, &v) in cursor.take(self.bits)?.iter().enumerate() {
            if (v > mid) == high_is_on {
                offset |= 1 << bit;
            }
        }
        match self.min.checked_add(offset) {
            Some(value) if value <= self.max => Ok(value),
            Some(value) => Err(out_of_range(value, self.min, self.max)),
            None => Err(Error::UnknownCategory(format!(
                "offset {} past {} is outside [{}, {}]",
                offset, self.min, self.min, self.max
            ))),
        }
    }
}

/// How a `CategoryEncoder` lays out category ids.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CategoryCoding {
    OneHot,
    Binary,
}

/// Encodes values from a fixed vocabulary of categories. Values outside the
/// vocabulary are rejected with `Error::UnknownCategory`.
#[derive(Clone, Debug)]
pub struct CategoryEncoder<C> {
    coding: CategoryCoding,
    on: f64,
    off: f64,
    ids: BTreeMap<C, usize>,
    categories: Vec<C>,
}

impl<C> CategoryEncoder<C>
where
    C: Ord + Clone + Debug,
{
    pub fn new(coding: CategoryCoding) -> Self {
        CategoryEncoder::with_levels(coding, 1.0, 0.0)
    }

    pub fn with_levels(coding: CategoryCoding, on: f64, off: f64) -> Self {
        CategoryEncoder {
            coding,
            on,
            off,
            ids: BTreeMap::new(),
            categories: Vec::new(),
        }
    }

    /// Creates an encoder over `categories`; ids follow the given order.
    pub fn from_categories<I>(coding: CategoryCoding, categories: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let mut encoder = CategoryEncoder::new(coding);
        for category in categories {
            encoder.add_category(category);
        }
        encoder
    }

    /// Uses every category seen by `stats`, in first-seen order.
    pub fn from_statistics(coding: CategoryCoding, stats: &CategoryStatistics<C>) -> Self {
        CategoryEncoder::from_categories(coding, stats.categories())
    }

    /// Adds a category to the vocabulary and returns its id. Adding a known
    /// category returns the existing id.
    pub fn add_category(&mut self, category: C) -> usize {
        if let Some(&id) = self.ids.get(&category) {
            return id;
        }
        let id = self.categories.len();
        self.ids.insert(category.clone(), id);
        self.categories.push(category);
        id
    }

    pub fn categories(&self) -> &[C] {
        &self.categories
    }

    /// The integer encoder for the current vocabulary, if it is not empty.
    fn ids_encoder(&self) -> Option<IdEncoder> {
        let max = self.categories.len() as i64 - 1;
        if max < 0 {
            return None;
        }
        // 0..=max is never empty here, so construction cannot fail
        Some(match self.coding {
            CategoryCoding::OneHot => IdEncoder::OneHot(OneHotEncoder {
                min: 0,
                max,
                on: self.on,
                off: self.off,
            }),
            CategoryCoding::Binary => IdEncoder::Binary(BinaryEncoder {
                min: 0,
                max,
                on: self.on,
                off: self.off,
                bits: bits_for(max as u64 + 1),
            }),
        })
    }
}

enum IdEncoder {
    OneHot(OneHotEncoder),
    Binary(BinaryEncoder),
}

impl IdEncoder {
    fn as_encoder(&self) -> &dyn Encoder<Value = i64> {
        match self {
            IdEncoder::OneHot(e) => e,
            IdEncoder::Binary(e) => e,
        }
    }
}

impl<C> Encoder for CategoryEncoder<C>
where
    C: Ord + Clone + Debug,
{
    type Value = C;

    fn len(&self) -> usize {
        self.ids_encoder()
            .map_or(0, |e| e.as_encoder().len())
    }

    fn encode_into(&self, value: &C, out: &mut Vec<f64>) -> Result<()> {
        let id = self
            .ids
            .get(value)
            .ok_or_else(|| Error::UnknownCategory(format!("{:?}", value)))?;
        let encoder = self
            .ids_encoder()
            .ok_or_else(|| Error::UnknownCategory(format!("{:?}", value)))?;
        encoder.as_encoder().encode_into(&(*id as i64), out)
    }

    fn decode_from(&self, cursor: &mut Cursor<'_>) -> Result<C> {
        let encoder = self
            .ids_encoder()
            .ok_or_else(|| Error::UnknownCategory("empty vocabulary".into()))?;
        let id = encoder.as_encoder().decode_from(cursor)?;
        self.categories
            .get(id as usize)
            .cloned()
            .ok_or_else(|| Error::UnknownCategory(format!("category id {}", id)))
    }
}

/// One field of a record, type-erased so fields of different types can share
/// a list.
trait FieldCodec<R> {
    fn len(&self) -> usize;
    fn encode_into(&self, record: &R, out: &mut Vec<f64>) -> Result<()>;
    fn decode_into(&self, cursor: &mut Cursor<'_>, record: &mut R) -> Result<()>;
}

struct FieldBinding<E, G, S> {
    encoder: E,
    get: G,
    set: S,
}

impl<R, E, G, S> FieldCodec<R> for FieldBinding<E, G, S>
where
    E: Encoder,
    G: Fn(&R) -> &E::Value,
    S: Fn(&mut R, E::Value),
{
    fn len(&self) -> usize {
        self.encoder.len()
    }

    fn encode_into(&self, record: &R, out: &mut Vec<f64>) -> Result<()> {
        self.encoder.encode_into((self.get)(record), out)
    }

    fn decode_into(&self, cursor: &mut Cursor<'_>, record: &mut R) -> Result<()> {
        let value = self.encoder.decode_from(cursor)?;
        (self.set)(record, value);
        Ok(())
    }
}

struct Field<R> {
    name: String,
    codec: Box<dyn FieldCodec<R>>,
}

/// Encodes a structured record by applying a sub-encoder to each named
/// field, in the order the fields were added, and concatenating the results.
///
/// ```
/// use nnet::encoder::*;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Flower {
///     petal_length: f64,
///     species: String,
/// }
///
/// let mut encoder = RecordEncoder::new();
/// encoder
///     .add_field(
///         "petal_length",
///         ScaleEncoder::new(1.0, 7.0, -1.0, 1.0).unwrap(),
///         |f: &Flower| &f.petal_length,
///         |f: &mut Flower, v| f.petal_length = v,
///     )
///     .unwrap();
/// encoder
///     .add_field(
///         "species",
///         CategoryEncoder::from_categories(
///             CategoryCoding::OneHot,
///             vec!["setosa".to_string(), "virginica".to_string()],
///         ),
///         |f: &Flower| &f.species,
///         |f: &mut Flower, v| f.species = v,
///     )
///     .unwrap();
///
/// let flower = Flower { petal_length: 4.0, species: "virginica".into() };
/// let encoded = encoder.encode(&flower).unwrap();
/// assert_eq!(encoded, vec![0.0, 0.0, 1.0]);
/// assert_eq!(encoder.decode(&encoded).unwrap(), flower);
/// ```
pub struct RecordEncoder<R> {
    fields: Vec<Field<R>>,
}

impl<R> Default for RecordEncoder<R> {
    fn default() -> Self {
        RecordEncoder { fields: Vec::new() }
    }
}

impl<R> RecordEncoder<R> {
    pub fn new() -> Self {
        RecordEncoder::default()
    }

    /// Appends a field. `get` borrows the field from a record and `set`
    /// stores a decoded value back. Field names must be unique.
    pub fn add_field<E, G, S>(&mut self, name: &str, encoder: E, get: G, set: S) -> Result<()>
    where
        E: Encoder + 'static,
        G: Fn(&R) -> &E::Value + 'static,
        S: Fn(&mut R, E::Value) + 'static,
    {
        if self.fields.iter().any(|f| f.name == name) {
            return Err(Error::InvalidParameter(format!(
                "duplicate field name {:?}",
                name
            )));
        }
        self.fields.push(Field {
            name: name.to_string(),
            codec: Box::new(FieldBinding { encoder, get, set }),
        });
        Ok(())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Decodes `values` into an existing record, overwriting every field.
    pub fn decode_into(&self, values: &[f64], record: &mut R) -> Result<()> {
        let mut cursor = Cursor::new(values);
        self.decode_fields(&mut cursor, record)
    }

    fn decode_fields(&self, cursor: &mut Cursor<'_>, record: &mut R) -> Result<()> {
        for field in &self.fields {
            field.codec.decode_into(cursor, record)?;
        }
        Ok(())
    }
}

impl<R> Encoder for RecordEncoder<R>
where
    R: Default,
{
    type Value = R;

    fn len(&self) -> usize {
        self.fields.iter().map(|f| f.codec.len()).sum()
    }

    fn encode_into(&self, record: &R, out: &mut Vec<f64>) -> Result<()> {
        for field in &self.fields {
            field.codec.encode_into(record, out)?;
        }
        Ok(())
    }

    fn decode_from(&self, cursor: &mut Cursor<'_>) -> Result<R> {
        let mut record = R::default();
        self.decode_fields(cursor, &mut record)?;
        Ok(record)
    }
}
