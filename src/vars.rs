use std::borrow::Cow;
use std::cmp::Eq;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::Value;

/// A source of variable values for [`UriTemplate::fill`](crate::UriTemplate::fill).
///
/// Returning `None` and returning [`Value::Null`] are equivalent.
pub trait Vars {
    fn var(&mut self, name: &str) -> Option<Cow<'_, Value>>;
}
impl Vars for () {
    fn var(&mut self, _name: &str) -> Option<Cow<'_, Value>> {
        None
    }
}
impl<K> Vars for &HashMap<K, Value>
where
    K: std::borrow::Borrow<str> + Hash + Eq,
{
    fn var(&mut self, name: &str) -> Option<Cow<'_, Value>> {
        Some(Cow::Borrowed(self.get(name)?))
    }
}
impl<K> Vars for &HashMap<K, &str>
where
    K: std::borrow::Borrow<str> + Hash + Eq,
{
    fn var(&mut self, name: &str) -> Option<Cow<'_, Value>> {
        Some(Cow::Owned(Value::from(*self.get(name)?)))
    }
}
impl<K> Vars for &HashMap<K, String>
where
    K: std::borrow::Borrow<str> + Hash + Eq,
{
    fn var(&mut self, name: &str) -> Option<Cow<'_, Value>> {
        Some(Cow::Owned(Value::from(self.get(name)?)))
    }
}
impl<K> Vars for &BTreeMap<K, Value>
where
    K: std::borrow::Borrow<str> + Ord,
{
    fn var(&mut self, name: &str) -> Option<Cow<'_, Value>> {
        Some(Cow::Borrowed(self.get(name)?))
    }
}
impl<K> Vars for &BTreeMap<K, &str>
where
    K: std::borrow::Borrow<str> + Ord,
{
    fn var(&mut self, name: &str) -> Option<Cow<'_, Value>> {
        Some(Cow::Owned(Value::from(*self.get(name)?)))
    }
}
impl<K> Vars for &BTreeMap<K, String>
where
    K: std::borrow::Borrow<str> + Ord,
{
    fn var(&mut self, name: &str) -> Option<Cow<'_, Value>> {
        Some(Cow::Owned(Value::from(self.get(name)?)))
    }
}

impl Vars for &serde_json::Map<String, serde_json::Value> {
    fn var(&mut self, name: &str) -> Option<Cow<'_, Value>> {
        Some(Cow::Owned(Value::from(self.get(name)?)))
    }
}
/// Only JSON objects provide variables.
impl Vars for &serde_json::Value {
    fn var(&mut self, name: &str) -> Option<Cow<'_, Value>> {
        Some(Cow::Owned(Value::from(self.get(name)?)))
    }
}

pub(crate) struct FnVars<F>(pub F);

impl<F> Vars for FnVars<F>
where
    F: FnMut(&str) -> Option<Value>,
{
    fn var(&mut self, name: &str) -> Option<Cow<'_, Value>> {
        (self.0)(name).map(Cow::Owned)
    }
}
