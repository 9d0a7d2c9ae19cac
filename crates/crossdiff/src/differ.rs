//! Structural diff of resource field trees
//!
//! A small recursive differ over `serde_json::Value` with four knobs:
//! order-insensitive lists, significant-digit rounding, excluded field names
//! and excluded key/path patterns. Exclusions are applied to both trees
//! before they are walked.

use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Nesting depth at which a diff is abandoned.
pub const MAX_DEPTH: usize = 128;

/// Fields that never carry configuration.
const TRANSIENT_FIELDS: &[&str] = &[
    "request_id",
    "response_metadata",
    "ResponseMetadata",
    "RequestId",
    "HTTPStatusCode",
    "HTTPHeaders",
    "RetryAttempts",
    "request_metadata",
];

const TRANSIENT_PATTERNS: &[&str] = &[
    ".*timestamp.*",
    ".*_at$",
    ".*_time$",
    ".*etag.*",
    ".*request_id.*",
];

/// Options controlling a structural diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    /// Compare lists as multisets instead of positionally
    pub ignore_order: bool,
    /// Round floats to this many decimal places before comparing
    pub significant_digits: Option<u32>,
    /// Field names dropped at any depth
    pub excluded_fields: BTreeSet<String>,
    /// Case-insensitive patterns matched against field names and paths
    pub excluded_patterns: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_order: true,
            significant_digits: None,
            excluded_fields: TRANSIENT_FIELDS.iter().map(|f| (*f).to_string()).collect(),
            excluded_patterns: TRANSIENT_PATTERNS.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

/// Compiled field exclusions.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    fields: BTreeSet<String>,
    patterns: Vec<Regex>,
}

impl FieldFilter {
    /// Compile a filter.
    ///
    /// Patterns are anchored at the start of the name, so `tag` excludes
    /// `tags` but not `etag`; use a leading `.*` to match anywhere.
    pub fn new<I, S>(fields: I, patterns: &[String]) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(&format!("^(?:{p})"))
                    .case_insensitive(true)
                    .build()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            fields: fields.into_iter().map(Into::into).collect(),
            patterns,
        })
    }

    /// Whether a field is excluded, by its own name or its full path.
    pub fn is_excluded(&self, key: &str, path: &str) -> bool {
        self.fields.contains(key)
            || self
                .patterns
                .iter()
                .any(|re| re.is_match(key) || (!path.is_empty() && re.is_match(path)))
    }

    /// Copy of `value` with excluded fields removed.
    ///
    /// Objects emptied by the exclusion disappear from their parent object
    /// or list; scalars inside lists are kept as they are.
    pub fn strip(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.strip_object(map, "")),
            Value::Array(items) => Value::Array(self.strip_list(items, "")),
            other => other.clone(),
        }
    }

    fn strip_object(&self, map: &Map<String, Value>, prefix: &str) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in map {
            let path = join_key(prefix, key);
            if self.is_excluded(key, &path) {
                continue;
            }
            match value {
                Value::Object(nested) => {
                    let nested = self.strip_object(nested, &path);
                    if !nested.is_empty() {
                        out.insert(key.clone(), Value::Object(nested));
                    }
                }
                Value::Array(items) => {
                    out.insert(key.clone(), Value::Array(self.strip_list(items, &path)));
                }
                other => {
                    out.insert(key.clone(), other.clone());
                }
            }
        }
        out
    }

    fn strip_list(&self, items: &[Value], prefix: &str) -> Vec<Value> {
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::Object(map) => {
                    let stripped = self.strip_object(map, &format!("{prefix}[{i}]"));
                    (!stripped.is_empty()).then_some(Value::Object(stripped))
                }
                other => Some(other.clone()),
            })
            .collect()
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// One step in a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a field inside a resource tree, rendered `a.b[0].c`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// Convert a bracketed path (`root['a'][0]['b']`) to the dotted form (`a[0].b`).
///
/// Already-dotted paths pass through unchanged.
pub fn normalize_path(raw: &str) -> String {
    let Some(rest) = raw.strip_prefix("root") else {
        return raw.to_string();
    };

    let mut path = FieldPath::root();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '[' {
            continue;
        }
        if chars.peek() == Some(&'\'') {
            chars.next();
            let mut key = String::new();
            for c in chars.by_ref() {
                if c == '\'' {
                    break;
                }
                key.push(c);
            }
            path.push(PathSegment::Key(key));
        } else {
            let digits: String = chars.by_ref().take_while(|c| *c != ']').collect();
            if let Ok(idx) = digits.parse() {
                path.push(PathSegment::Index(idx));
            }
        }
    }
    path.to_string()
}

/// Old and new value at one path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    pub old_value: Value,
    pub new_value: Value,
}

/// Categorized differences between two trees, keyed by normalized path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSet {
    pub values_changed: BTreeMap<String, ValueChange>,
    pub type_changes: BTreeMap<String, ValueChange>,
    pub keys_added: BTreeMap<String, Value>,
    pub keys_removed: BTreeMap<String, Value>,
    pub items_added: BTreeMap<String, Value>,
    pub items_removed: BTreeMap<String, Value>,
    /// Membership changes of a root-level collection; these have no path
    pub set_items_added: Vec<Value>,
    pub set_items_removed: Vec<Value>,
}

/// Kind of a single diff entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    ValueChanged,
    TypeChanged,
    KeyAdded,
    KeyRemoved,
    ItemAdded,
    ItemRemoved,
    SetItemAdded,
    SetItemRemoved,
}

/// One flattened difference.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub kind: DiffKind,
    /// Normalized path; empty for set items
    pub path: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

impl DiffEntry {
    /// Human-readable description of the difference.
    pub fn description(&self) -> String {
        let old = self.old_value.as_ref().unwrap_or(&Value::Null);
        let new = self.new_value.as_ref().unwrap_or(&Value::Null);
        match self.kind {
            DiffKind::ValueChanged => format!(
                "Value changed from '{}' to '{}'",
                display_value(old),
                display_value(new)
            ),
            DiffKind::TypeChanged => format!(
                "Type changed from {} to {}",
                type_name(old),
                type_name(new)
            ),
            DiffKind::KeyAdded => format!("Field '{}' exists only in Account 2", self.path),
            DiffKind::KeyRemoved => format!("Field '{}' exists only in Account 1", self.path),
            DiffKind::ItemAdded => format!("Item added to '{}'", self.path),
            DiffKind::ItemRemoved => format!("Item removed from '{}'", self.path),
            DiffKind::SetItemAdded => format!("Set item added: {}", display_value(new)),
            DiffKind::SetItemRemoved => format!("Set item removed: {}", display_value(old)),
        }
    }
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.values_changed.len()
            + self.type_changes.len()
            + self.keys_added.len()
            + self.keys_removed.len()
            + self.items_added.len()
            + self.items_removed.len()
            + self.set_items_added.len()
            + self.set_items_removed.len()
    }

    /// All differences as a flat list, grouped by category.
    pub fn entries(&self) -> Vec<DiffEntry> {
        let mut out = Vec::with_capacity(self.len());

        for (kind, map) in [
            (DiffKind::ValueChanged, &self.values_changed),
            (DiffKind::TypeChanged, &self.type_changes),
        ] {
            out.extend(map.iter().map(|(path, change)| DiffEntry {
                kind,
                path: path.clone(),
                old_value: Some(change.old_value.clone()),
                new_value: Some(change.new_value.clone()),
            }));
        }

        for (kind, map, added) in [
            (DiffKind::KeyAdded, &self.keys_added, true),
            (DiffKind::KeyRemoved, &self.keys_removed, false),
            (DiffKind::ItemAdded, &self.items_added, true),
            (DiffKind::ItemRemoved, &self.items_removed, false),
        ] {
            out.extend(map.iter().map(|(path, value)| DiffEntry {
                kind,
                path: path.clone(),
                old_value: (!added).then(|| value.clone()),
                new_value: added.then(|| value.clone()),
            }));
        }

        out.extend(self.set_items_added.iter().map(|value| DiffEntry {
            kind: DiffKind::SetItemAdded,
            path: String::new(),
            old_value: None,
            new_value: Some(value.clone()),
        }));
        out.extend(self.set_items_removed.iter().map(|value| DiffEntry {
            kind: DiffKind::SetItemRemoved,
            path: String::new(),
            old_value: Some(value.clone()),
            new_value: None,
        }));

        out
    }
}

/// JSON type name of a value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a value for descriptions; strings without quotes.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Structural differ configured once and reused for every resource pair.
#[derive(Debug, Clone)]
pub struct Differ {
    filter: FieldFilter,
    ignore_order: bool,
    significant_digits: Option<u32>,
}

impl Differ {
    /// Build a differ from options plus extra excluded field names.
    pub fn new(options: &DiffOptions, extra_excluded: &[&str]) -> Result<Self> {
        let fields = options
            .excluded_fields
            .iter()
            .map(String::as_str)
            .chain(extra_excluded.iter().copied());
        Ok(Self {
            filter: FieldFilter::new(fields, &options.excluded_patterns)?,
            ignore_order: options.ignore_order,
            significant_digits: options.significant_digits,
        })
    }

    pub fn filter(&self) -> &FieldFilter {
        &self.filter
    }

    /// Diff two trees after stripping excluded fields from both.
    pub fn diff(&self, old: &Value, new: &Value) -> Result<ChangeSet> {
        let old = self.filter.strip(old);
        let new = self.filter.strip(new);

        let mut changes = ChangeSet::default();
        let mut path = FieldPath::root();
        self.walk(&mut path, &old, &new, 0, &mut changes)?;
        Ok(changes)
    }

    fn walk(
        &self,
        path: &mut FieldPath,
        old: &Value,
        new: &Value,
        depth: usize,
        out: &mut ChangeSet,
    ) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::DepthExceeded {
                path: path.to_string(),
            });
        }

        match (old, new) {
            (Value::Object(a), Value::Object(b)) => {
                for (key, value) in a {
                    path.push(PathSegment::Key(key.clone()));
                    match b.get(key) {
                        Some(other) => self.walk(path, value, other, depth + 1, out)?,
                        None => {
                            out.keys_removed.insert(path.to_string(), value.clone());
                        }
                    }
                    path.pop();
                }
                for (key, value) in b {
                    if !a.contains_key(key) {
                        path.push(PathSegment::Key(key.clone()));
                        out.keys_added.insert(path.to_string(), value.clone());
                        path.pop();
                    }
                }
            }
            (Value::Array(a), Value::Array(b)) if self.ignore_order => {
                self.diff_multiset(path, a, b, depth, out)?;
            }
            (Value::Array(a), Value::Array(b)) => {
                for (i, (x, y)) in a.iter().zip(b).enumerate() {
                    path.push(PathSegment::Index(i));
                    self.walk(path, x, y, depth + 1, out)?;
                    path.pop();
                }
                for (i, value) in a.iter().enumerate().skip(b.len()) {
                    path.push(PathSegment::Index(i));
                    out.items_removed.insert(path.to_string(), value.clone());
                    path.pop();
                }
                for (i, value) in b.iter().enumerate().skip(a.len()) {
                    path.push(PathSegment::Index(i));
                    out.items_added.insert(path.to_string(), value.clone());
                    path.pop();
                }
            }
            (Value::Number(x), Value::Number(y)) => match self.compare_numbers(x, y) {
                NumberOrdering::Equal => {}
                NumberOrdering::ValueChanged => {
                    out.values_changed.insert(path.to_string(), value_change(old, new));
                }
                NumberOrdering::TypeChanged => {
                    out.type_changes.insert(path.to_string(), value_change(old, new));
                }
            },
            _ if std::mem::discriminant(old) != std::mem::discriminant(new) => {
                out.type_changes.insert(path.to_string(), value_change(old, new));
            }
            _ => {
                if old != new {
                    out.values_changed.insert(path.to_string(), value_change(old, new));
                }
            }
        }
        Ok(())
    }

    /// Compare lists by membership: an item counts as added only when no
    /// unmatched equivalent item exists anywhere in the old list.
    fn diff_multiset(
        &self,
        path: &mut FieldPath,
        old: &[Value],
        new: &[Value],
        depth: usize,
        out: &mut ChangeSet,
    ) -> Result<()> {
        let mut matched = vec![false; old.len()];
        let mut added = Vec::new();

        for (j, item) in new.iter().enumerate() {
            let mut found = None;
            for (i, candidate) in old.iter().enumerate() {
                if !matched[i] && self.equivalent(candidate, item, depth + 1)? {
                    found = Some(i);
                    break;
                }
            }
            match found {
                Some(i) => matched[i] = true,
                None => added.push((j, item)),
            }
        }

        let removed = old
            .iter()
            .enumerate()
            .filter(|(i, _)| !matched[*i]);

        if path.is_root() {
            out.set_items_added.extend(added.into_iter().map(|(_, v)| v.clone()));
            out.set_items_removed.extend(removed.map(|(_, v)| v.clone()));
            return Ok(());
        }

        for (j, value) in added {
            path.push(PathSegment::Index(j));
            out.items_added.insert(path.to_string(), value.clone());
            path.pop();
        }
        for (i, value) in removed {
            path.push(PathSegment::Index(i));
            out.items_removed.insert(path.to_string(), value.clone());
            path.pop();
        }
        Ok(())
    }

    /// Deep equivalence honoring order-insensitivity and rounding.
    fn equivalent(&self, a: &Value, b: &Value, depth: usize) -> Result<bool> {
        if depth > MAX_DEPTH {
            return Err(Error::DepthExceeded {
                path: String::from("<list item>"),
            });
        }

        match (a, b) {
            (Value::Object(x), Value::Object(y)) => {
                if x.len() != y.len() {
                    return Ok(false);
                }
                for (key, value) in x {
                    match y.get(key) {
                        Some(other) if self.equivalent(value, other, depth + 1)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            (Value::Array(x), Value::Array(y)) => {
                if x.len() != y.len() {
                    return Ok(false);
                }
                if !self.ignore_order {
                    for (p, q) in x.iter().zip(y) {
                        if !self.equivalent(p, q, depth + 1)? {
                            return Ok(false);
                        }
                    }
                    return Ok(true);
                }
                let mut matched = vec![false; x.len()];
                for q in y {
                    let mut hit = false;
                    for (i, p) in x.iter().enumerate() {
                        if !matched[i] && self.equivalent(p, q, depth + 1)? {
                            matched[i] = true;
                            hit = true;
                            break;
                        }
                    }
                    if !hit {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Number(x), Value::Number(y)) => {
                Ok(self.compare_numbers(x, y) == NumberOrdering::Equal)
            }
            _ => Ok(a == b),
        }
    }

    /// Compare two numbers.
    ///
    /// With significant digits set, integers and floats are compared by
    /// their rounded rendering and never count as a type change.
    fn compare_numbers(&self, x: &Number, y: &Number) -> NumberOrdering {
        if let Some(digits) = self.significant_digits {
            let digits = digits as usize;
            let fx = x.as_f64().unwrap_or(f64::NAN);
            let fy = y.as_f64().unwrap_or(f64::NAN);
            return if rounded(fx, digits) == rounded(fy, digits) {
                NumberOrdering::Equal
            } else {
                NumberOrdering::ValueChanged
            };
        }

        if x.is_f64() != y.is_f64() {
            NumberOrdering::TypeChanged
        } else if x == y {
            NumberOrdering::Equal
        } else {
            NumberOrdering::ValueChanged
        }
    }
}

/// Decimal rendering of `value` at `digits` places; negative zero renders as zero.
fn rounded(value: f64, digits: usize) -> String {
    let text = format!("{value:.digits$}");
    match text.strip_prefix('-') {
        Some(unsigned) if unsigned.chars().all(|c| c == '0' || c == '.') => unsigned.to_string(),
        _ => text,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberOrdering {
    Equal,
    ValueChanged,
    TypeChanged,
}

fn value_change(old: &Value, new: &Value) -> ValueChange {
    ValueChange {
        old_value: old.clone(),
        new_value: new.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn differ() -> Differ {
        Differ::new(&DiffOptions::default(), &[]).unwrap()
    }

    #[test]
    fn test_identical_trees_have_no_diff() {
        let tree = json!({
            "name": "b1",
            "rules": [{"port": 443, "cidr": ["10.0.0.0/8", "192.168.0.0/16"]}],
            "nested": {"a": {"b": [1, 2, 3]}},
            "ratio": 0.25
        });
        let changes = differ().diff(&tree, &tree).unwrap();
        assert!(changes.is_empty());
        assert_eq!(changes.len(), 0);
    }

    #[test]
    fn test_value_change_path() {
        let old = json!({"security_groups": [{"group_id": "sg-1"}]});
        let new = json!({"security_groups": [{"group_id": "sg-2"}]});
        let opts = DiffOptions {
            ignore_order: false,
            ..DiffOptions::default()
        };
        let changes = Differ::new(&opts, &[]).unwrap().diff(&old, &new).unwrap();
        let change = &changes.values_changed["security_groups[0].group_id"];
        assert_eq!(change.old_value, json!("sg-1"));
        assert_eq!(change.new_value, json!("sg-2"));
    }

    #[test]
    fn test_keys_added_and_removed() {
        let old = json!({"a": 1, "nested": {"x": true}});
        let new = json!({"b": 2, "nested": {"x": true, "y": null}});
        let changes = differ().diff(&old, &new).unwrap();
        assert_eq!(changes.keys_removed["a"], json!(1));
        assert_eq!(changes.keys_added["b"], json!(2));
        assert_eq!(changes.keys_added["nested.y"], Value::Null);
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn test_type_change() {
        let old = json!({"port": 80, "flag": "true", "ratio": 1});
        let new = json!({"port": "80", "flag": true, "ratio": 1.0});
        let changes = differ().diff(&old, &new).unwrap();
        assert_eq!(changes.type_changes.len(), 3);
        let entry = changes
            .entries()
            .into_iter()
            .find(|e| e.path == "port")
            .unwrap();
        assert_eq!(entry.description(), "Type changed from integer to string");
    }

    #[test]
    fn test_ignore_order_is_multiset_membership() {
        let old = json!({"cidrs": ["a", "b", "b"]});
        let reordered = json!({"cidrs": ["b", "a", "b"]});
        assert!(differ().diff(&old, &reordered).unwrap().is_empty());

        // one "b" replaced by "c": exactly one add and one remove
        let new = json!({"cidrs": ["b", "c", "a"]});
        let changes = differ().diff(&old, &new).unwrap();
        assert_eq!(changes.items_added.len(), 1);
        assert_eq!(changes.items_added["cidrs[1]"], json!("c"));
        assert_eq!(changes.items_removed.len(), 1);
        assert_eq!(changes.items_removed["cidrs[2]"], json!("b"));
    }

    #[test]
    fn test_ignore_order_nested_objects() {
        let old = json!({"rules": [{"port": 22, "ips": ["x", "y"]}, {"port": 443, "ips": []}]});
        let new = json!({"rules": [{"port": 443, "ips": []}, {"port": 22, "ips": ["y", "x"]}]});
        assert!(differ().diff(&old, &new).unwrap().is_empty());
    }

    #[test]
    fn test_positional_lists() {
        let opts = DiffOptions {
            ignore_order: false,
            ..DiffOptions::default()
        };
        let d = Differ::new(&opts, &[]).unwrap();
        let changes = d
            .diff(&json!({"l": [1, 2]}), &json!({"l": [2, 1, 3]}))
            .unwrap();
        assert_eq!(changes.values_changed.len(), 2);
        assert_eq!(changes.items_added["l[2]"], json!(3));
    }

    #[test]
    fn test_root_lists_produce_set_items() {
        let changes = differ()
            .diff(&json!(["a", "b"]), &json!(["b", "c"]))
            .unwrap();
        assert_eq!(changes.set_items_added, vec![json!("c")]);
        assert_eq!(changes.set_items_removed, vec![json!("a")]);
        let entries = changes.entries();
        assert!(entries.iter().all(|e| e.path.is_empty()));
        assert_eq!(entries[0].description(), "Set item added: c");
    }

    #[test]
    fn test_significant_digits_negative_zero() {
        let opts = DiffOptions {
            significant_digits: Some(2),
            ..DiffOptions::default()
        };
        let d = Differ::new(&opts, &[]).unwrap();
        assert!(d.diff(&json!({"v": -0.001}), &json!({"v": 0.001})).unwrap().is_empty());
        assert!(d.diff(&json!({"v": [-0.004]}), &json!({"v": [0]})).unwrap().is_empty());
        assert_eq!(
            d.diff(&json!({"v": -0.01}), &json!({"v": 0.01}))
                .unwrap()
                .values_changed
                .len(),
            1
        );
        assert_eq!(rounded(-0.001, 2), "0.00");
        assert_eq!(rounded(-1.5, 0), "-2");
    }

    #[test]
    fn test_significant_digits() {
        let opts = DiffOptions {
            significant_digits: Some(2),
            ..DiffOptions::default()
        };
        let d = Differ::new(&opts, &[]).unwrap();
        assert!(d
            .diff(&json!({"v": 0.1234}), &json!({"v": 0.1231}))
            .unwrap()
            .is_empty());
        assert!(d.diff(&json!({"v": 1}), &json!({"v": 1.0})).unwrap().is_empty());
        assert_eq!(
            d.diff(&json!({"v": 0.12}), &json!({"v": 0.15}))
                .unwrap()
                .values_changed
                .len(),
            1
        );

        let exact = differ();
        assert_eq!(
            exact
                .diff(&json!({"v": 0.1234}), &json!({"v": 0.1231}))
                .unwrap()
                .values_changed
                .len(),
            1
        );
    }

    #[test]
    fn test_transient_fields_excluded() {
        let old = json!({
            "name": "q",
            "request_id": "r1",
            "created_at": "2024-01-01",
            "LastModifiedTimestamp": 1,
            "ETag": "abc",
            "meta": {"update_time": "x"},
            "items": [{"request_id": "a"}, 5]
        });
        let new = json!({
            "name": "q",
            "request_id": "r2",
            "created_at": "2025-01-01",
            "LastModifiedTimestamp": 2,
            "ETag": "def",
            "items": [5]
        });
        assert!(differ().diff(&old, &new).unwrap().is_empty());
    }

    #[test]
    fn test_extra_excluded_fields() {
        let d = Differ::new(&DiffOptions::default(), &["owner_id"]).unwrap();
        assert!(d
            .diff(
                &json!({"owner_id": "111111111111", "tags": {"owner_id": "x"}}),
                &json!({"owner_id": "222222222222", "tags": {"owner_id": "y"}})
            )
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_path_patterns() {
        let opts = DiffOptions {
            excluded_patterns: vec![r"config\.cache.*".into()],
            ..DiffOptions::default()
        };
        let d = Differ::new(&opts, &[]).unwrap();
        let changes = d
            .diff(
                &json!({"config": {"cache_ttl": 1, "size": 1}}),
                &json!({"config": {"cache_ttl": 2, "size": 1}}),
            )
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let opts = DiffOptions {
            excluded_patterns: vec!["(unclosed".into()],
            ..DiffOptions::default()
        };
        assert!(matches!(
            Differ::new(&opts, &[]),
            Err(Error::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_strip_drops_emptied_objects() {
        let filter = FieldFilter::new(["secret"], &[]).unwrap();
        let stripped = filter.strip(&json!({
            "a": {"secret": 1},
            "b": [{"secret": 2}, {"keep": 3}, "s"],
            "c": 4
        }));
        assert_eq!(stripped, json!({"b": [{"keep": 3}, "s"], "c": 4}));
    }

    #[test]
    fn test_depth_limit() {
        let mut old = json!(1);
        let mut new = json!(2);
        for _ in 0..(MAX_DEPTH + 5) {
            old = json!({ "n": old });
            new = json!({ "n": new });
        }
        let err = Differ::new(&DiffOptions::default(), &[])
            .unwrap()
            .diff(&old, &new)
            .unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { .. }));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("root['security_groups'][0]['group_id']"),
            "security_groups[0].group_id"
        );
        assert_eq!(normalize_path("root['a']['b']"), "a.b");
        assert_eq!(normalize_path("root"), "");
        assert_eq!(normalize_path("already.dotted[1]"), "already.dotted[1]");
    }

    #[test]
    fn test_entry_descriptions() {
        let changes = differ()
            .diff(
                &json!({"status": "Disabled", "gone": 1, "list": [1]}),
                &json!({"status": "Enabled", "new": 2, "list": [1, 2]}),
            )
            .unwrap();
        let descriptions: Vec<String> =
            changes.entries().iter().map(DiffEntry::description).collect();
        assert!(descriptions.contains(&"Value changed from 'Disabled' to 'Enabled'".to_string()));
        assert!(descriptions.contains(&"Field 'new' exists only in Account 2".to_string()));
        assert!(descriptions.contains(&"Field 'gone' exists only in Account 1".to_string()));
        assert!(descriptions.contains(&"Item added to 'list[1]'".to_string()));
    }
}
