//! Generation context and path resolution.
//!
//! A [`GenerationContext`] lives for exactly one top-level generation call. It
//! owns the document under construction and borrows the random source used by
//! every producer in the tree, so draws happen in a single, reproducible order.
//!
//! The document is kept as a stack of open scopes, one per record or list that
//! is currently being produced. Path resolution reads the stack as though each
//! open container had already been written into its parent when production of
//! it started: a record field in progress is visible under its label, and a
//! list element in progress is the list's last element.

use rand_chacha::ChaCha8Rng;

use crate::error::GenerationError;
use crate::value::{Record, Value};

/// Random source threaded through every producer of a generation call.
pub type SynthRng = ChaCha8Rng;

/// Character that starts a path and separates its segments.
pub const PATH_SEPARATOR: char = '/';

enum Partial {
    Record(Record),
    List(Vec<Value>),
}

enum Pending {
    Key(String),
    Element,
}

struct Scope {
    partial: Partial,
    pending: Option<Pending>,
}

impl Scope {
    fn into_value(self) -> Value {
        match self.partial {
            Partial::Record(record) => Value::Record(record),
            Partial::List(items) => Value::List(items),
        }
    }
}

#[derive(Clone, Copy)]
enum Cursor<'c> {
    Scope(usize),
    Value(&'c Value),
}

/// Per-call state shared by all producers of one generated document.
///
/// # Example
///
/// ```
/// use record_synth::{Element, GenerationContext, RecordComposer, Value};
///
/// let mut composer = RecordComposer::new(1);
/// composer
///     .add_field("gender", Element::constant(Value::from("F")))
///     .expect("unique label");
/// composer
///     .add_field(
///         "greeting",
///         Element::leaf_fn(|ctx: &mut GenerationContext<'_>| {
///             let gender = ctx.resolve_text("/gender")?;
///             Ok(Some(Value::from(format!("hello {gender}"))))
///         }),
///     )
///     .expect("unique label");
///
/// let record = composer.generate().expect("generation succeeds");
/// assert_eq!(record.get("greeting"), Some(&Value::from("hello F")));
/// ```
pub struct GenerationContext<'a> {
    scopes: Vec<Scope>,
    rng: &'a mut SynthRng,
}

impl<'a> GenerationContext<'a> {
    /// Creates an empty context drawing from `rng`.
    #[must_use]
    pub const fn new(rng: &'a mut SynthRng) -> Self {
        Self {
            scopes: Vec::new(),
            rng,
        }
    }

    /// Returns the random source for this generation call.
    pub const fn rng(&mut self) -> &mut SynthRng {
        self.rng
    }

    /// Resolves `path` against the document under construction.
    ///
    /// A path starts with [`PATH_SEPARATOR`]; each following segment names a
    /// key to descend through. Whenever traversal lands on a list, including
    /// at the end of the path, the most recently appended element is taken.
    /// A string that does not start with the separator is a literal and is
    /// returned unchanged as text.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::PathNotFound`] if a segment names a key that
    /// has not been produced yet, descends into a scalar, or lands on an empty
    /// list.
    pub fn resolve(&self, path: &str) -> Result<Value, GenerationError> {
        let Some(segments) = path.strip_prefix(PATH_SEPARATOR) else {
            return Ok(Value::Text(path.to_owned()));
        };
        let not_found = |segment: &str| GenerationError::PathNotFound {
            path: path.to_owned(),
            segment: segment.to_owned(),
        };

        let mut cursor = Cursor::Scope(0);
        let mut last_segment = segments;
        for segment in segments.split(PATH_SEPARATOR) {
            cursor = self
                .child(cursor, segment)
                .ok_or_else(|| not_found(segment))?;
            last_segment = segment;
        }
        let target = self
            .last_element(cursor)
            .ok_or_else(|| not_found(last_segment))?;

        Ok(self.materialise(target))
    }

    /// Resolves `path` and requires the result to be text.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::PathNotFound`] as [`Self::resolve`] does, or
    /// [`GenerationError::UnexpectedValue`] if the value is not text.
    pub fn resolve_text(&self, path: &str) -> Result<String, GenerationError> {
        match self.resolve(path)? {
            Value::Text(text) => Ok(text),
            _ => Err(GenerationError::UnexpectedValue {
                path: path.to_owned(),
                expected: "text",
            }),
        }
    }

    /// Returns a snapshot of the whole document as built so far.
    #[must_use]
    pub fn document(&self) -> Value {
        self.snapshot_from(0)
    }

    pub(crate) fn open_record(&mut self) {
        self.scopes.push(Scope {
            partial: Partial::Record(Record::new()),
            pending: None,
        });
    }

    pub(crate) fn open_list(&mut self, capacity: usize) {
        self.scopes.push(Scope {
            partial: Partial::List(Vec::with_capacity(capacity)),
            pending: None,
        });
    }

    /// Marks `label` as the field now being produced in the innermost record.
    pub(crate) fn begin_field(&mut self, label: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.pending = Some(Pending::Key(label.to_owned()));
        }
    }

    /// Marks a new element as being produced in the innermost list.
    pub(crate) fn begin_element(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.pending = Some(Pending::Element);
        }
    }

    /// Stores the outcome of the pending field or element.
    ///
    /// `None` leaves a record untouched and appends [`Value::Null`] to a list,
    /// so a list always holds one entry per produced element.
    pub(crate) fn commit(&mut self, produced: Option<Value>) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        let pending = scope.pending.take();
        match (&mut scope.partial, pending, produced) {
            (Partial::Record(record), Some(Pending::Key(label)), Some(value)) => {
                record.insert(label, value);
            }
            (Partial::List(items), _, value) => items.push(value.unwrap_or_default()),
            (Partial::Record(_), _, _) => {}
        }
    }

    /// Closes the innermost scope and returns its contents.
    pub(crate) fn close(&mut self) -> Value {
        self.scopes.pop().map(Scope::into_value).unwrap_or_default()
    }

    pub(crate) fn close_record(&mut self) -> Record {
        match self.close() {
            Value::Record(record) => record,
            _ => Record::new(),
        }
    }

    fn has_scope_above(&self, index: usize) -> bool {
        index + 1 < self.scopes.len()
    }

    /// Applies the last-element rule until the cursor is not on a list.
    fn last_element<'s>(&'s self, cursor: Cursor<'s>) -> Option<Cursor<'s>> {
        let mut current = cursor;
        loop {
            current = match current {
                Cursor::Scope(index) => {
                    let scope = self.scopes.get(index)?;
                    match &scope.partial {
                        Partial::Record(_) => return Some(current),
                        Partial::List(items) => {
                            if matches!(scope.pending, Some(Pending::Element))
                                && self.has_scope_above(index)
                            {
                                Cursor::Scope(index + 1)
                            } else {
                                Cursor::Value(items.last()?)
                            }
                        }
                    }
                }
                Cursor::Value(Value::List(items)) => Cursor::Value(items.last()?),
                Cursor::Value(_) => return Some(current),
            };
        }
    }

    fn child<'s>(&'s self, cursor: Cursor<'s>, segment: &str) -> Option<Cursor<'s>> {
        match self.last_element(cursor)? {
            Cursor::Scope(index) => {
                let scope = self.scopes.get(index)?;
                let Partial::Record(record) = &scope.partial else {
                    return None;
                };
                match &scope.pending {
                    Some(Pending::Key(key)) if key == segment && self.has_scope_above(index) => {
                        Some(Cursor::Scope(index + 1))
                    }
                    _ => record.get(segment).map(Cursor::Value),
                }
            }
            Cursor::Value(Value::Record(record)) => record.get(segment).map(Cursor::Value),
            Cursor::Value(_) => None,
        }
    }

    fn materialise(&self, cursor: Cursor<'_>) -> Value {
        match cursor {
            Cursor::Scope(index) => self.snapshot_from(index),
            Cursor::Value(value) => value.clone(),
        }
    }

    fn snapshot_from(&self, index: usize) -> Value {
        let Some(scope) = self.scopes.get(index) else {
            return Value::Null;
        };
        let nested = self
            .has_scope_above(index)
            .then(|| self.snapshot_from(index + 1));

        match (&scope.partial, &scope.pending, nested) {
            (Partial::Record(record), Some(Pending::Key(label)), Some(child)) => {
                let mut snapshot = record.clone();
                snapshot.insert(label.clone(), child);
                Value::Record(snapshot)
            }
            (Partial::List(items), Some(Pending::Element), Some(child)) => {
                let mut snapshot = items.clone();
                snapshot.push(child);
                Value::List(snapshot)
            }
            (Partial::Record(record), _, _) => Value::Record(record.clone()),
            (Partial::List(items), _, _) => Value::List(items.clone()),
        }
    }
}
