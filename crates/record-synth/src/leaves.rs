//! Ready-made leaf producers.
//!
//! These cover the common shapes of synthetic person data: fixed values,
//! gender flags, labels drawn from weighted tables, tables chosen by an
//! earlier field, optional fields, identifiers, and locale-aware fake text.

use std::sync::Arc;

use fake::Fake;
use fake::faker::address::raw::{CityName, StreetName};
use fake::faker::internet::raw::SafeEmail;
use fake::faker::name::raw::{FirstName, LastName};
use fake::locales::EN;
use rand::Rng;
use serde::Deserialize;
use uuid::Builder;

use crate::context::GenerationContext;
use crate::element::{Element, Producer};
use crate::error::{CompositionError, GenerationError};
use crate::table::WeightedTable;
use crate::value::Value;

fn check_probability(value: f64) -> Result<f64, CompositionError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(CompositionError::InvalidProbability { value })
    }
}

/// Always yields the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    value: Value,
}

impl Constant {
    /// Creates a constant producer.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Producer for Constant {
    fn produce(&self, _ctx: &mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError> {
        Ok(Some(self.value.clone()))
    }
}

/// Yields `"M"` or `"F"`.
///
/// A uniform draw `u` yields `"M"` when `u <= pct_male`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenderLeaf {
    pct_male: f64,
}

impl GenderLeaf {
    /// Label produced for male draws.
    pub const MALE: &'static str = "M";
    /// Label produced for female draws.
    pub const FEMALE: &'static str = "F";

    /// Creates a gender leaf with the given probability of `"M"`.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::InvalidProbability`] if `pct_male` is
    /// outside `[0, 1]`.
    pub fn new(pct_male: f64) -> Result<Self, CompositionError> {
        check_probability(pct_male).map(|pct| Self { pct_male: pct })
    }

    /// Probability of producing `"M"`.
    #[must_use]
    pub const fn pct_male(&self) -> f64 {
        self.pct_male
    }

    /// Maps a uniform draw to a gender label.
    #[must_use]
    pub const fn label_for(&self, u: f64) -> &'static str {
        if u <= self.pct_male {
            Self::MALE
        } else {
            Self::FEMALE
        }
    }
}

impl Producer for GenderLeaf {
    fn produce(&self, ctx: &mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError> {
        let u = ctx.rng().random::<f64>();
        Ok(Some(Value::from(self.label_for(u))))
    }
}

/// Draws a label from one weighted table.
///
/// Entries without a label yield an absent value.
#[derive(Debug, Clone)]
pub struct TableLeaf {
    table: Arc<WeightedTable>,
}

impl TableLeaf {
    /// Creates a leaf sampling `table`.
    #[must_use]
    pub const fn new(table: Arc<WeightedTable>) -> Self {
        Self { table }
    }
}

impl Producer for TableLeaf {
    fn produce(&self, ctx: &mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError> {
        let label = self.table.sample_with(ctx.rng())?;
        Ok(label.map(Value::from))
    }
}

/// How a [`KeyedTableLeaf`] behaves when its selector path is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorFallback {
    /// Fail generation with the resolution error.
    #[default]
    Fail,
    /// Pick one of the tables uniformly at random.
    Uniform,
}

/// Draws from one of several tables, chosen by the value at a selector path.
///
/// Keys match the selected value ignoring ASCII case, and a single-letter
/// key matches any value starting with that letter, so `"M"` selects the
/// table registered as `"male"` and vice versa.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use record_synth::{Element, GenderLeaf, KeyedTableLeaf, RecordComposer, WeightedTable};
///
/// let male = WeightedTable::from_entries([("JAMES", 1.0)], false).expect("table");
/// let female = WeightedTable::from_entries([("MARY", 1.0)], false).expect("table");
/// let names = KeyedTableLeaf::new(
///     "/gender",
///     [("M", Arc::new(male)), ("F", Arc::new(female))],
/// )
/// .expect("tables present");
///
/// let mut composer = RecordComposer::new(3);
/// composer
///     .add_field("gender", Element::leaf(GenderLeaf::new(1.0).expect("probability")))
///     .expect("label");
/// composer.add_field("name", Element::leaf(names)).expect("label");
///
/// let record = composer.generate().expect("generate");
/// assert_eq!(record.get("name").and_then(|v| v.as_text()), Some("JAMES"));
/// ```
#[derive(Debug, Clone)]
pub struct KeyedTableLeaf {
    selector: String,
    tables: Vec<(String, Arc<WeightedTable>)>,
    fallback: SelectorFallback,
}

impl KeyedTableLeaf {
    /// Creates a leaf choosing among `tables` by the text at `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::NoKeyedTables`] if `tables` is empty.
    pub fn new<I, K>(selector: impl Into<String>, tables: I) -> Result<Self, CompositionError>
    where
        I: IntoIterator<Item = (K, Arc<WeightedTable>)>,
        K: Into<String>,
    {
        let keyed: Vec<_> = tables
            .into_iter()
            .map(|(key, table)| (key.into(), table))
            .collect();
        if keyed.is_empty() {
            return Err(CompositionError::NoKeyedTables);
        }
        Ok(Self {
            selector: selector.into(),
            tables: keyed,
            fallback: SelectorFallback::default(),
        })
    }

    /// Sets the behaviour for a missing selector path.
    #[must_use]
    pub const fn with_fallback(mut self, fallback: SelectorFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// The path whose value selects a table.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    fn table_for(&self, key: &str) -> Option<&WeightedTable> {
        self.tables
            .iter()
            .find(|(candidate, _)| key_matches(candidate, key))
            .map(|(_, table)| table.as_ref())
    }

    fn pick_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&WeightedTable> {
        let index = rng.random_range(0..self.tables.len());
        self.tables.get(index).map(|(_, table)| table.as_ref())
    }
}

fn key_matches(configured: &str, observed: &str) -> bool {
    if configured.eq_ignore_ascii_case(observed) {
        return true;
    }
    let single_letter = configured.chars().count() == 1 || observed.chars().count() == 1;
    match (configured.chars().next(), observed.chars().next()) {
        (Some(left), Some(right)) => single_letter && left.eq_ignore_ascii_case(&right),
        _ => false,
    }
}

impl Producer for KeyedTableLeaf {
    fn produce(&self, ctx: &mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError> {
        let key = match ctx.resolve_text(&self.selector) {
            Ok(text) => Some(text),
            Err(GenerationError::PathNotFound { .. })
                if self.fallback == SelectorFallback::Uniform =>
            {
                None
            }
            Err(err) => return Err(err),
        };
        let table = key
            .as_deref()
            .map_or_else(|| self.pick_uniform(ctx.rng()), |selected| self.table_for(selected))
            .ok_or_else(|| GenerationError::Producer {
                message: format!(
                    "no table registered for '{}' at '{}'",
                    key.as_deref().unwrap_or_default(),
                    self.selector
                ),
            })?;
        let label = table.sample_with(ctx.rng())?;
        Ok(label.map(Value::from))
    }
}

/// Produces its inner element with a fixed probability.
///
/// When the draw fails the field is left out of the enclosing record rather
/// than stored as null.
#[derive(Debug)]
pub struct OptionalLeaf {
    inner: Box<Element>,
    probability: f64,
}

impl OptionalLeaf {
    /// Wraps `inner`, producing it with the given probability.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::InvalidProbability`] if `probability` is
    /// outside `[0, 1]`.
    pub fn new(inner: Element, probability: f64) -> Result<Self, CompositionError> {
        Ok(Self {
            inner: Box::new(inner),
            probability: check_probability(probability)?,
        })
    }
}

impl Producer for OptionalLeaf {
    fn produce(&self, ctx: &mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError> {
        if ctx.rng().random::<f64>() < self.probability {
            self.inner.produce(ctx)
        } else {
            Ok(None)
        }
    }

    fn omit_when_absent(&self) -> bool {
        true
    }
}

/// Yields a random version 4 UUID drawn from the generation rng.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UuidLeaf;

impl Producer for UuidLeaf {
    fn produce(&self, ctx: &mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError> {
        let bytes: [u8; 16] = ctx.rng().random();
        let id = Builder::from_random_bytes(bytes).into_uuid();
        Ok(Some(Value::Text(id.to_string())))
    }
}

/// Locale-aware fake text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FakerLeaf {
    /// A given name.
    FirstName,
    /// A family name.
    LastName,
    /// A city name.
    CityName,
    /// A street name.
    StreetName,
    /// An email address on a reserved example domain.
    SafeEmail,
}

impl Producer for FakerLeaf {
    fn produce(&self, ctx: &mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError> {
        let rng = ctx.rng();
        let text: String = match self {
            Self::FirstName => FirstName(EN).fake_with_rng(rng),
            Self::LastName => LastName(EN).fake_with_rng(rng),
            Self::CityName => CityName(EN).fake_with_rng(rng),
            Self::StreetName => StreetName(EN).fake_with_rng(rng),
            Self::SafeEmail => SafeEmail(EN).fake_with_rng(rng),
        };
        Ok(Some(Value::Text(text)))
    }
}
