//! Composition plans loaded from JSON.
//!
//! A plan names the reference tables a generator needs and describes the
//! record shape as a tree of typed elements. Loading validates the document;
//! building reads the tables from disk and assembles a [`RecordComposer`].

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::info;

use crate::composer::RecordComposer;
use crate::count::CountPolicy;
use crate::element::{Element, MapElement};
use crate::error::{CompositionError, PlanError};
use crate::leaves::{
    FakerLeaf, GenderLeaf, KeyedTableLeaf, OptionalLeaf, SelectorFallback, TableLeaf, UuidLeaf,
};
use crate::table::{Delimiter, TableOptions, WeightedTable};
use crate::value::Value;

/// Current supported plan version.
const SUPPORTED_VERSION: u32 = 1;

/// A validated composition plan.
///
/// # Example
///
/// ```
/// use record_synth::CompositionPlan;
///
/// let json = r#"{
///     "version": 1,
///     "seed": 7,
///     "fields": [
///         {"label": "id", "element": {"type": "uuid"}},
///         {"label": "gender", "element": {"type": "gender", "pctMale": 0.5}}
///     ]
/// }"#;
///
/// let plan = CompositionPlan::from_json(json).expect("valid plan");
/// let mut built = plan.build(camino::Utf8Path::new(".")).expect("build");
/// let record = built.composer_mut().generate().expect("generate");
/// assert_eq!(record.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    seed: u64,
    tables: Vec<TableSpec>,
    fields: Vec<FieldSpec>,
}

impl CompositionPlan {
    /// Parses a plan from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if:
    /// - The JSON is malformed or a required field is missing
    /// - The version is unsupported
    /// - Two tables share a name
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        let raw: RawPlan = serde_json::from_str(json).map_err(|e| PlanError::ParseError {
            message: e.to_string(),
        })?;

        Self::from_raw(raw)
    }

    /// Loads a plan from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Utf8Path) -> Result<Self, PlanError> {
        let contents = fs::read_to_string(path).map_err(|e| PlanError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_json(&contents)
    }

    fn from_raw(raw: RawPlan) -> Result<Self, PlanError> {
        if raw.version != SUPPORTED_VERSION {
            return Err(PlanError::UnsupportedVersion {
                expected: SUPPORTED_VERSION,
                actual: raw.version,
            });
        }

        let mut tables: Vec<TableSpec> = Vec::with_capacity(raw.tables.len());
        for table in raw.tables {
            if tables.iter().any(|existing| existing.name == table.name) {
                return Err(PlanError::DuplicateTable { name: table.name });
            }
            tables.push(TableSpec::from(table));
        }

        Ok(Self {
            seed: raw.seed,
            tables,
            fields: raw.fields,
        })
    }

    /// Replaces the seed recorded in the plan.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the seed recorded in the plan.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the declared tables.
    #[must_use]
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Returns the top-level fields in evaluation order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Loads every table and assembles the composer.
    ///
    /// Relative table paths are resolved against `base_dir`, normally the
    /// directory holding the plan file.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Table`] if a table fails to load,
    /// [`PlanError::UnknownTable`] if an element names an undeclared table,
    /// and [`PlanError::Composition`] for an invalid element tree.
    pub fn build(&self, base_dir: &Utf8Path) -> Result<BuiltPlan, PlanError> {
        let mut loaded = LoadedTables::default();
        for spec in &self.tables {
            let path = spec.resolve_path(base_dir);
            let table = WeightedTable::from_file(path.as_std_path(), &spec.options).map_err(
                |source| PlanError::Table {
                    name: spec.name.clone(),
                    source,
                },
            )?;
            loaded.skipped_rows += table.skipped_rows();
            loaded.tables.insert(spec.name.clone(), Arc::new(table));
        }

        let root = build_fields(&self.fields, &loaded)?;
        info!(
            tables = loaded.tables.len(),
            fields = root.len(),
            skipped_rows = loaded.skipped_rows,
            "built composition plan"
        );

        Ok(BuiltPlan {
            composer: RecordComposer::from_root(root, self.seed),
            skipped_rows: loaded.skipped_rows,
        })
    }
}

/// A composer assembled from a plan, with load statistics.
#[derive(Debug)]
pub struct BuiltPlan {
    composer: RecordComposer,
    skipped_rows: usize,
}

impl BuiltPlan {
    /// Returns the composer for generating records.
    pub const fn composer_mut(&mut self) -> &mut RecordComposer {
        &mut self.composer
    }

    /// Consumes the plan, returning its composer.
    #[must_use]
    pub fn into_composer(self) -> RecordComposer {
        self.composer
    }

    /// Total malformed rows skipped across every loaded table.
    #[must_use]
    pub const fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

/// A reference table declared by a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    name: String,
    path: Utf8PathBuf,
    options: TableOptions,
}

impl TableSpec {
    /// Returns the name elements use to refer to the table.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table path as written in the plan.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the parsing options.
    #[must_use]
    pub const fn options(&self) -> &TableOptions {
        &self.options
    }

    fn resolve_path(&self, base_dir: &Utf8Path) -> Utf8PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            base_dir.join(&self.path)
        }
    }
}

impl From<RawTable> for TableSpec {
    fn from(raw: RawTable) -> Self {
        Self {
            name: raw.name,
            path: raw.path,
            options: TableOptions {
                delimiter: raw.delimiter.map_or(Delimiter::Whitespace, Delimiter::Char),
                label_column: raw.label_column,
                weight_column: raw.weight_column,
                cumulative: raw.cumulative,
                skip_header: raw.skip_header,
                expected_columns: raw.expected_columns,
            },
        }
    }
}

/// A labelled element in a plan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Key under which the element's value is stored.
    pub label: String,
    /// Description of the value.
    pub element: ElementSpec,
}

/// Description of one element, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ElementSpec {
    /// A fixed JSON value.
    Constant {
        /// The value to emit.
        value: serde_json::Value,
    },
    /// `"M"` or `"F"`.
    Gender {
        /// Probability of `"M"`.
        pct_male: f64,
    },
    /// A label drawn from a named table.
    Table {
        /// Table name.
        table: String,
    },
    /// A label drawn from a table selected by an earlier field.
    KeyedTable {
        /// Path (or literal) whose value selects the table.
        selector: String,
        /// Selector key to table name.
        tables: IndexMap<String, String>,
        /// Behaviour when the selector path is missing.
        #[serde(default)]
        fallback: SelectorFallback,
    },
    /// An element present with a given probability.
    Optional {
        /// Probability that the element is produced.
        probability: f64,
        /// The wrapped element.
        element: Box<ElementSpec>,
    },
    /// A random version 4 UUID.
    Uuid,
    /// Locale-aware fake text.
    Faker {
        /// Which kind of text to produce.
        kind: FakerLeaf,
    },
    /// A repeated element.
    List {
        /// How many items to produce.
        count: CountSpec,
        /// The repeated element.
        element: Box<ElementSpec>,
    },
    /// A nested record.
    Map {
        /// Nested fields in evaluation order.
        fields: Vec<FieldSpec>,
    },
}

/// Description of a list count policy, tagged by `policy`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "policy", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CountSpec {
    /// Always the same count.
    Constant {
        /// The count.
        value: u32,
    },
    /// Uniform over `min..max`.
    UniformRange {
        /// Inclusive lower bound.
        min: u32,
        /// Exclusive upper bound.
        max: u32,
    },
    /// Normally distributed.
    Normal {
        /// Mean count.
        mean: f64,
        /// Standard deviation.
        stdev: f64,
        /// Truncate draws toward zero.
        #[serde(default)]
        truncate: bool,
    },
}

impl CountSpec {
    /// Converts the description into a count policy.
    ///
    /// # Errors
    ///
    /// Returns the validation errors of the [`CountPolicy`] constructors.
    pub fn to_policy(self) -> Result<CountPolicy, CompositionError> {
        match self {
            Self::Constant { value } => Ok(CountPolicy::constant(value)),
            Self::UniformRange { min, max } => CountPolicy::uniform_range(min, max),
            Self::Normal {
                mean,
                stdev,
                truncate,
            } => CountPolicy::normal(mean, stdev, truncate),
        }
    }
}

#[derive(Default)]
struct LoadedTables {
    tables: HashMap<String, Arc<WeightedTable>>,
    skipped_rows: usize,
}

impl LoadedTables {
    fn get(&self, name: &str) -> Result<Arc<WeightedTable>, PlanError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| PlanError::UnknownTable {
                name: name.to_owned(),
            })
    }
}

fn build_fields(fields: &[FieldSpec], loaded: &LoadedTables) -> Result<MapElement, PlanError> {
    let mut map = MapElement::new();
    for field in fields {
        map.add_field(field.label.clone(), build_element(&field.element, loaded)?)?;
    }
    Ok(map)
}

fn build_element(spec: &ElementSpec, loaded: &LoadedTables) -> Result<Element, PlanError> {
    let element = match spec {
        ElementSpec::Constant { value } => Element::constant(Value::from(value.clone())),
        ElementSpec::Gender { pct_male } => Element::leaf(GenderLeaf::new(*pct_male)?),
        ElementSpec::Table { table } => Element::leaf(TableLeaf::new(loaded.get(table)?)),
        ElementSpec::KeyedTable {
            selector,
            tables,
            fallback,
        } => {
            let keyed = tables
                .iter()
                .map(|(key, name)| loaded.get(name).map(|table| (key.clone(), table)))
                .collect::<Result<Vec<_>, _>>()?;
            Element::leaf(KeyedTableLeaf::new(selector.clone(), keyed)?.with_fallback(*fallback))
        }
        ElementSpec::Optional {
            probability,
            element,
        } => Element::leaf(OptionalLeaf::new(
            build_element(element, loaded)?,
            *probability,
        )?),
        ElementSpec::Uuid => Element::leaf(UuidLeaf),
        ElementSpec::Faker { kind } => Element::leaf(*kind),
        ElementSpec::List { count, element } => {
            Element::list(build_element(element, loaded)?, count.to_policy()?)
        }
        ElementSpec::Map { fields } => Element::Map(build_fields(fields, loaded)?),
    };
    Ok(element)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    version: u32,
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    tables: Vec<RawTable>,
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTable {
    name: String,
    path: Utf8PathBuf,
    #[serde(default)]
    delimiter: Option<char>,
    #[serde(default)]
    label_column: usize,
    #[serde(default = "default_weight_column")]
    weight_column: usize,
    #[serde(default)]
    cumulative: bool,
    #[serde(default)]
    skip_header: bool,
    #[serde(default)]
    expected_columns: Option<usize>,
}

const fn default_weight_column() -> usize {
    1
}
