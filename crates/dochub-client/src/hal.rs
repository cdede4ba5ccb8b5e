//! HAL envelope decoding.
//!
//! The service wraps every response in one of two shapes:
//!
//! - a single resource: `{ ...fields, "_embedded": { ... } }`
//! - a page: `{ "items": [...], "totalItems": n, "_embedded": { ... } }`
//!
//! `_embedded` is a sidecar of related collections keyed by relation name.
//! Which relations a caller cares about is described by an [`Embedded`]
//! implementation. A configured relation that is missing from the sidecar
//! or falsy (or the whole sidecar being absent) decodes as if the service had
//! sent an empty object, so responses without related data never fail to decode.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::num::FpCategory;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::HalError;

/// Key under which related resources are embedded.
pub const EMBEDDED_KEY: &str = "_embedded";

/// A decoded single-resource envelope.
///
/// Dereferences to the primary record, so `doc.name` reads the same as on a
/// bare record while `doc.embedded` holds the sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct HalResource<R, E> {
    /// The primary record.
    pub resource: R,
    /// The decoded sidecar.
    pub embedded: E,
}

impl<R, E> HalResource<R, E> {
    /// Drop the sidecar and keep the primary record.
    pub fn into_resource(self) -> R {
        self.resource
    }
}

impl<R, E> Deref for HalResource<R, E> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

/// A decoded page envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct HalPage<R, E> {
    /// Records on this page, in service order.
    pub items: Vec<R>,
    /// Total number of records across all pages.
    pub total_items: u64,
    /// The decoded sidecar, shared by all items on the page.
    pub embedded: E,
}

impl<R, E> HalPage<R, E> {
    /// Whether this page holds no records.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The raw `_embedded` object while its configured relations are decoded.
#[derive(Debug, Default)]
pub struct EmbeddedSidecar {
    entries: Map<String, Value>,
}

impl EmbeddedSidecar {
    fn from_raw(raw: Option<Value>) -> Result<Self, HalError> {
        match raw {
            Some(Value::Object(entries)) => Ok(Self { entries }),
            Some(other) if !is_falsy(&other) => {
                Err(HalError::shape(EMBEDDED_KEY, "object", &other))
            }
            _ => Ok(Self::default()),
        }
    }

    /// Decode one relation with a custom mapper. Missing relations and
    /// falsy ones (`null`, `false`, `0`, `""`) are handed to the mapper as
    /// `{}`.
    ///
    /// # Errors
    ///
    /// Whatever the mapper returns.
    pub fn decode<T, F>(&mut self, key: &str, mapper: F) -> Result<T, HalError>
    where
        F: FnOnce(Value) -> Result<T, HalError>,
    {
        let raw = match self.entries.remove(key) {
            Some(raw) if !is_falsy(&raw) => raw,
            _ => Value::Object(Map::new()),
        };
        mapper(raw)
    }

    /// Decode one relation with serde.
    ///
    /// # Errors
    ///
    /// Returns `HalError::Json` if the relation does not deserialize.
    pub fn take<T: DeserializeOwned>(&mut self, key: &str) -> Result<T, HalError> {
        self.decode(key, |raw| {
            serde_json::from_value(raw)
                .map_err(|e| HalError::json(format!("{EMBEDDED_KEY}.{key}"), e))
        })
    }
}

/// Describes which relations of the sidecar a response carries and how to
/// decode them.
pub trait Embedded: Sized {
    /// Build the typed sidecar from the raw one.
    ///
    /// # Errors
    ///
    /// Returns a `HalError` if a configured relation is malformed.
    fn from_sidecar(sidecar: &mut EmbeddedSidecar) -> Result<Self, HalError>;
}

/// No relations configured; the sidecar is ignored.
impl Embedded for () {
    fn from_sidecar(_sidecar: &mut EmbeddedSidecar) -> Result<Self, HalError> {
        Ok(())
    }
}

/// Related records keyed by id. A missing id is a lookup miss, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdLookup<T>(BTreeMap<String, T>);

impl<T> Default for IdLookup<T> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<T> IdLookup<T> {
    /// Look up a related record.
    pub fn get(&self, id: &str) -> Option<&T> {
        self.0.get(id)
    }

    /// Number of related records.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no related records were embedded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(id, record)` pairs in id order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, T> {
        self.0.iter()
    }
}

impl<T> FromIterator<(String, T)> for IdLookup<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Decode an `id -> raw record` object into an [`IdLookup`].
///
/// # Errors
///
/// Returns `HalError::Shape` if `raw` is neither an object nor null, or the
/// entry mapper's error.
pub fn id_lookup<T, F>(raw: Value, mut entry: F) -> Result<IdLookup<T>, HalError>
where
    F: FnMut(Value) -> Result<T, HalError>,
{
    let entries = match raw {
        Value::Null => return Ok(IdLookup::default()),
        Value::Object(entries) => entries,
        other => return Err(HalError::shape("id lookup", "object", &other)),
    };
    entries
        .into_iter()
        .map(|(id, raw)| Ok((id, entry(raw)?)))
        .collect()
}

/// A mapper that deserializes with serde.
pub fn from_json<T: DeserializeOwned>(
    context: &'static str,
) -> impl Fn(Value) -> Result<T, HalError> {
    move |raw| serde_json::from_value(raw).map_err(|e| HalError::json(context, e))
}

/// Decode a single-resource envelope with a custom resource mapper.
///
/// `_embedded` is removed before the mapper sees the remaining fields.
///
/// # Errors
///
/// Returns `HalError::Shape` if `js` is not an object, or a mapper error.
pub fn resource_from_json<R, E, F>(js: Value, resource: F) -> Result<HalResource<R, E>, HalError>
where
    E: Embedded,
    F: FnOnce(Value) -> Result<R, HalError>,
{
    let mut fields = match js {
        Value::Object(fields) => fields,
        other => return Err(HalError::shape("resource", "object", &other)),
    };
    let sidecar = fields.remove(EMBEDDED_KEY);
    let resource = resource(Value::Object(fields))?;
    let embedded = embedded_from_json(sidecar)?;
    Ok(HalResource { resource, embedded })
}

/// Decode a page envelope with a custom item mapper.
///
/// # Errors
///
/// Returns `HalError::Shape` if `js` is not an object, `items` is not an
/// array or `totalItems` is not a non-negative integer, or a mapper error.
pub fn page_from_json<R, E, F>(js: Value, item: F) -> Result<HalPage<R, E>, HalError>
where
    E: Embedded,
    F: FnMut(Value) -> Result<R, HalError>,
{
    let mut fields = match js {
        Value::Object(fields) => fields,
        other => return Err(HalError::shape("page", "object", &other)),
    };
    let items = match fields.remove("items").unwrap_or(Value::Null) {
        Value::Array(items) => items,
        other => return Err(HalError::shape("items", "array", &other)),
    };
    let total = fields.remove("totalItems").unwrap_or(Value::Null);
    let Some(total_items) = total.as_u64() else {
        return Err(HalError::shape("totalItems", "non-negative integer", &total));
    };
    let items = items.into_iter().map(item).collect::<Result<Vec<_>, _>>()?;
    let embedded = embedded_from_json(fields.remove(EMBEDDED_KEY))?;
    debug!(items = items.len(), total_items, "decoded page");
    Ok(HalPage {
        items,
        total_items,
        embedded,
    })
}

/// Decode a single-resource envelope with serde.
///
/// # Errors
///
/// See [`resource_from_json`].
pub fn decode_resource<R, E>(js: Value) -> Result<HalResource<R, E>, HalError>
where
    R: DeserializeOwned,
    E: Embedded,
{
    resource_from_json(js, from_json("resource"))
}

/// Decode a page envelope with serde.
///
/// # Errors
///
/// See [`page_from_json`].
pub fn decode_page<R, E>(js: Value) -> Result<HalPage<R, E>, HalError>
where
    R: DeserializeOwned,
    E: Embedded,
{
    page_from_json(js, from_json("page item"))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.classify() == FpCategory::Zero),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn embedded_from_json<E: Embedded>(raw: Option<Value>) -> Result<E, HalError> {
    let mut sidecar = EmbeddedSidecar::from_raw(raw)?;
    E::from_sidecar(&mut sidecar)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Tag {
        name: String,
    }

    #[derive(Debug, PartialEq)]
    struct Sidecar {
        tags: IdLookup<Tag>,
        owners: IdLookup<String>,
    }

    impl Embedded for Sidecar {
        fn from_sidecar(sidecar: &mut EmbeddedSidecar) -> Result<Self, HalError> {
            Ok(Self {
                tags: sidecar.decode("tags", |raw| id_lookup(raw, from_json("tag")))?,
                owners: sidecar.take("owners")?,
            })
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[test]
    fn resource_strips_embedded_before_mapping() {
        let js = json!({ "id": "a", "_embedded": { "tags": {} } });
        let res: HalResource<Value, ()> = resource_from_json(js, Ok).unwrap();
        assert_eq!(res.resource, json!({ "id": "a" }));
    }

    #[test]
    fn resource_derefs_to_record() {
        let res: HalResource<Item, ()> = decode_resource(json!({ "id": "x" })).unwrap();
        assert_eq!(res.id, "x");
    }

    #[test]
    fn missing_sidecar_decodes_every_key_as_empty() {
        let res: HalResource<Item, Sidecar> = decode_resource(json!({ "id": "a" })).unwrap();
        assert!(res.embedded.tags.is_empty());
        assert!(res.embedded.owners.is_empty());
    }

    #[test]
    fn missing_or_null_key_decodes_as_empty() {
        let js = json!({
            "id": "a",
            "_embedded": { "tags": null, "unrelated": [1, 2, 3] }
        });
        let res: HalResource<Item, Sidecar> = decode_resource(js).unwrap();
        assert!(res.embedded.tags.is_empty());
        assert!(res.embedded.owners.is_empty());
    }

    #[test]
    fn falsy_key_decodes_as_empty() {
        for falsy in [json!(false), json!(0), json!(""), json!(0.0)] {
            let js = json!({
                "id": "a",
                "_embedded": { "tags": falsy.clone(), "owners": falsy }
            });
            let res: HalResource<Item, Sidecar> = decode_resource(js).unwrap();
            assert!(res.embedded.tags.is_empty());
            assert!(res.embedded.owners.is_empty());
        }
    }

    #[test]
    fn falsy_sidecar_decodes_as_empty() {
        let res: HalResource<Item, Sidecar> =
            decode_resource(json!({ "id": "a", "_embedded": false })).unwrap();
        assert!(res.embedded.tags.is_empty());
    }

    #[test]
    fn truthy_scalar_relation_is_still_an_error() {
        let js = json!({ "id": "a", "_embedded": { "tags": true } });
        let err = decode_resource::<Item, Sidecar>(js).unwrap_err();
        assert!(matches!(err, HalError::Shape { context: "id lookup", .. }));
    }

    #[test]
    fn lookup_returns_none_for_unknown_id() {
        let js = json!({
            "id": "a",
            "_embedded": { "tags": { "t1": { "name": "invoice" } } }
        });
        let res: HalResource<Item, Sidecar> = decode_resource(js).unwrap();
        assert_eq!(
            res.embedded.tags.get("t1"),
            Some(&Tag {
                name: "invoice".to_owned()
            })
        );
        assert_eq!(res.embedded.tags.get("t2"), None);
    }

    #[test]
    fn page_keeps_total_independent_of_items() {
        let js = json!({
            "items": [{ "id": "a" }, { "id": "b" }],
            "totalItems": 57
        });
        let page: HalPage<Item, ()> = decode_page(js).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_items, 57);
    }

    #[test]
    fn page_decodes_sidecar_like_resource() {
        let js = json!({
            "items": [],
            "totalItems": 0,
            "_embedded": { "owners": { "u1": "alice" } }
        });
        let page: HalPage<Item, Sidecar> = decode_page(js).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.embedded.owners.get("u1").map(String::as_str), Some("alice"));
        assert!(page.embedded.tags.is_empty());
    }

    #[test]
    fn page_item_mapper_sees_each_item() {
        let js = json!({ "items": [1, 2, 3], "totalItems": 3 });
        let page: HalPage<u64, ()> =
            page_from_json(js, |raw| Ok(raw.as_u64().unwrap_or_default() * 10)).unwrap();
        assert_eq!(page.items, vec![10, 20, 30]);
    }

    #[test]
    fn non_object_envelope_is_a_shape_error() {
        let err = decode_resource::<Item, ()>(json!([1])).unwrap_err();
        assert!(matches!(
            err,
            HalError::Shape {
                expected: "object",
                found: "array",
                ..
            }
        ));
    }

    #[test]
    fn page_without_items_is_a_shape_error() {
        let err = decode_page::<Item, ()>(json!({ "totalItems": 1 })).unwrap_err();
        assert!(matches!(err, HalError::Shape { context: "items", .. }));
    }

    #[test]
    fn negative_total_is_a_shape_error() {
        let err = decode_page::<Item, ()>(json!({ "items": [], "totalItems": -1 })).unwrap_err();
        assert!(matches!(err, HalError::Shape { context: "totalItems", .. }));
    }

    #[test]
    fn non_object_sidecar_is_a_shape_error() {
        let err =
            decode_resource::<Item, Sidecar>(json!({ "id": "a", "_embedded": "x" })).unwrap_err();
        assert!(matches!(err, HalError::Shape { context: EMBEDDED_KEY, .. }));
    }

    #[test]
    fn malformed_relation_reports_its_key() {
        let js = json!({ "id": "a", "_embedded": { "owners": { "u1": 5 } } });
        let err = decode_resource::<Item, Sidecar>(js).unwrap_err();
        assert!(err.to_string().contains("_embedded.owners"));
    }
}
