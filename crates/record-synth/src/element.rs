//! Producers and the element tree.
//!
//! Every node of a document description is an [`Element`]. Leaves wrap a
//! [`Producer`]; lists repeat one child element; maps bind labels to child
//! elements and evaluate them in registration order.

use std::fmt;

use tracing::trace;

use crate::context::GenerationContext;
use crate::count::CountPolicy;
use crate::error::{CompositionError, GenerationError};
use crate::value::{Record, Value};

/// Upper bound on the capacity reserved for a list before its items exist.
const LIST_CAPACITY_HINT: u32 = 1024;

/// Produces one value from the generation context.
///
/// Producers may draw from [`GenerationContext::rng`] and read fields that
/// were produced earlier via [`GenerationContext::resolve`]. Returning
/// `Ok(None)` marks the value as absent.
pub trait Producer: Send + Sync {
    /// Produces a value, or `None` when nothing should be emitted.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] when a dependency cannot be resolved or a
    /// draw fails.
    fn produce(&self, ctx: &mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError>;

    /// Whether an absent value drops the enclosing field from its record.
    ///
    /// When `false`, an absent value is stored as [`Value::Null`].
    fn omit_when_absent(&self) -> bool {
        false
    }
}

/// Adapts a closure into a [`Producer`].
pub(crate) struct FnProducer<F>(F);

impl<F> Producer for FnProducer<F>
where
    F: Fn(&mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError> + Send + Sync,
{
    fn produce(&self, ctx: &mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError> {
        (self.0)(ctx)
    }
}

/// A node in a document description.
///
/// # Example
///
/// ```
/// use record_synth::{CountPolicy, Element, Value};
///
/// let mut address = Element::map();
/// address
///     .add_field("city", Element::constant(Value::from("OSLO")))
///     .expect("unique label");
///
/// let addresses = Element::list(address, CountPolicy::constant(2));
/// assert_eq!(addresses.kind(), "list");
/// ```
pub enum Element {
    /// A scalar or opaque value from a producer.
    Leaf(Box<dyn Producer>),
    /// A repeated child element.
    List(ListElement),
    /// An ordered set of labelled child elements.
    Map(MapElement),
}

impl Element {
    /// Wraps `producer` as a leaf element.
    #[must_use]
    pub fn leaf<P>(producer: P) -> Self
    where
        P: Producer + 'static,
    {
        Self::Leaf(Box::new(producer))
    }

    /// Wraps a closure as a leaf element.
    #[must_use]
    pub fn leaf_fn<F>(produce: F) -> Self
    where
        F: Fn(&mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError>
            + Send
            + Sync
            + 'static,
    {
        Self::leaf(FnProducer(produce))
    }

    /// A leaf that always yields `value`.
    #[must_use]
    pub fn constant(value: Value) -> Self {
        Self::leaf(crate::leaves::Constant::new(value))
    }

    /// A list of `item` whose length follows `count`.
    #[must_use]
    pub fn list(item: Self, count: CountPolicy) -> Self {
        Self::List(ListElement::new(item, count))
    }

    /// An empty map.
    #[must_use]
    pub fn map() -> Self {
        Self::Map(MapElement::new())
    }

    /// Short name of the element's shape.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "leaf",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Binds `label` to `element` on this map.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::NotAContainer`] unless this is a map, and
    /// the errors of [`MapElement::add_field`] otherwise.
    pub fn add_field(
        &mut self,
        label: impl Into<String>,
        element: Self,
    ) -> Result<(), CompositionError> {
        match self {
            Self::Map(map) => map.add_field(label, element),
            Self::Leaf(_) | Self::List(_) => Err(CompositionError::NotAContainer {
                kind: self.kind(),
            }),
        }
    }
}

impl Producer for Element {
    fn produce(&self, ctx: &mut GenerationContext<'_>) -> Result<Option<Value>, GenerationError> {
        match self {
            Self::Leaf(producer) => producer.produce(ctx),
            Self::List(list) => list.produce_items(ctx).map(|items| Some(Value::List(items))),
            Self::Map(map) => map.produce_record(ctx).map(|record| Some(Value::Record(record))),
        }
    }

    fn omit_when_absent(&self) -> bool {
        match self {
            Self::Leaf(producer) => producer.omit_when_absent(),
            Self::List(_) | Self::Map(_) => false,
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(_) => f.write_str("Leaf"),
            Self::List(list) => f.debug_tuple("List").field(list).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
        }
    }
}

/// A child element repeated a drawn number of times.
#[derive(Debug)]
pub struct ListElement {
    item: Box<Element>,
    count: CountPolicy,
}

impl ListElement {
    /// Creates a list of `item` sized by `count`.
    #[must_use]
    pub fn new(item: Element, count: CountPolicy) -> Self {
        Self {
            item: Box::new(item),
            count,
        }
    }

    /// The repeated child element.
    #[must_use]
    pub fn item(&self) -> &Element {
        &self.item
    }

    /// The policy deciding the list length.
    #[must_use]
    pub const fn count_policy(&self) -> &CountPolicy {
        &self.count
    }

    /// Produces every item of one list.
    ///
    /// The item is produced exactly as many times as the count policy draws;
    /// absent item values are stored as [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by an item.
    pub fn produce_items(
        &self,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<Value>, GenerationError> {
        let count = self.count.count(ctx.rng());
        trace!(count, "producing list");
        ctx.open_list(usize::try_from(count.min(LIST_CAPACITY_HINT)).unwrap_or_default());
        let outcome = self.fill(ctx, count);
        let produced = ctx.close();
        outcome?;
        match produced {
            Value::List(items) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }

    fn fill(&self, ctx: &mut GenerationContext<'_>, count: u32) -> Result<(), GenerationError> {
        for _ in 0..count {
            ctx.begin_element();
            let produced = self.item.produce(ctx)?;
            ctx.commit(produced);
        }
        Ok(())
    }
}

/// Labelled child elements evaluated in registration order.
#[derive(Default)]
pub struct MapElement {
    fields: Vec<(String, Element)>,
}

impl MapElement {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Binds `label` to `element`.
    ///
    /// Fields are evaluated in the order they are added, so an element may
    /// only resolve paths to fields added before it.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::EmptyLabel`] for an empty label and
    /// [`CompositionError::DuplicateLabel`] if `label` is already bound.
    pub fn add_field(
        &mut self,
        label: impl Into<String>,
        element: Element,
    ) -> Result<(), CompositionError> {
        let owned: String = label.into();
        if owned.is_empty() {
            return Err(CompositionError::EmptyLabel);
        }
        if self.fields.iter().any(|(existing, _)| *existing == owned) {
            return Err(CompositionError::DuplicateLabel { label: owned });
        }
        self.fields.push((owned, element));
        Ok(())
    }

    /// Labels in evaluation order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(label, _)| label.as_str())
    }

    /// Number of bound fields.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no fields are bound.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Produces one record from the bound fields.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by a field.
    pub fn produce_record(
        &self,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Record, GenerationError> {
        ctx.open_record();
        let outcome = self.fill(ctx);
        let record = ctx.close_record();
        outcome.map(|()| record)
    }

    fn fill(&self, ctx: &mut GenerationContext<'_>) -> Result<(), GenerationError> {
        for (label, element) in &self.fields {
            ctx.begin_field(label);
            let produced = element.produce(ctx)?;
            let stored =
                produced.or_else(|| (!element.omit_when_absent()).then_some(Value::Null));
            ctx.commit(stored);
        }
        Ok(())
    }
}

impl fmt::Debug for MapElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|(label, element)| (label, element)))
            .finish()
    }
}
