use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{BlueprintError, Result};

/// Design tokens extracted from a sketch. An unset token is `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    /// Base spacing unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<f64>,
    /// Border radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl DesignTokens {
    pub fn is_empty(&self) -> bool {
        self.primary_color.is_none()
            && self.accent_color.is_none()
            && self.spacing.is_none()
            && self.radius.is_none()
    }
}

/// Sketch-derived geometry of a component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// All four values must be finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// One UI element of a blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Element kind, e.g. "button" or "heading". Free-form.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Component>,
    /// Fields the conversion service sent that this model does not name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Component {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: None,
            bbox: None,
            children: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_child(mut self, child: Component) -> Self {
        self.children.push(child);
        self
    }

    /// Only components with geometry can take part in spatial edits.
    pub fn is_spatial(&self) -> bool {
        self.bbox.is_some()
    }
}

/// The structured design of one page: tokens plus an ordered component tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "DesignTokens::is_empty")]
    pub tokens: DesignTokens,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Blueprint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_tokens(mut self, tokens: DesignTokens) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Follow an index path from the root sequence through `children`.
    pub fn resolve(&self, target: &ComponentRef) -> Option<&Component> {
        let (first, rest) = target.path().split_first()?;
        let mut node = self.components.get(*first)?;
        for index in rest {
            node = node.children.get(*index)?;
        }
        Some(node)
    }

    /// Number of components in the whole tree.
    pub fn component_count(&self) -> usize {
        fn count(nodes: &[Component]) -> usize {
            nodes.iter().map(|c| 1 + count(&c.children)).sum()
        }
        count(&self.components)
    }

    /// Check structural invariants before a document is committed anywhere.
    pub fn validate(&self) -> Result<()> {
        fn walk(nodes: &[Component], prefix: &ComponentRef) -> Result<()> {
            for (index, node) in nodes.iter().enumerate() {
                let at = prefix.child(index);
                if let Some(bbox) = &node.bbox {
                    if !bbox.is_valid() {
                        return Err(BlueprintError::InvalidBlueprint(format!(
                            "component {} ({}) has an invalid bbox {:?}",
                            at, node.kind, bbox
                        )));
                    }
                }
                walk(&node.children, &at)?;
            }
            Ok(())
        }
        walk(&self.components, &ComponentRef::default())
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Index path to a component, e.g. `1.0` is the first child of the second root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentRef(Vec<usize>);

impl ComponentRef {
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn path(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for ComponentRef {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for ComponentRef {
    type Err = BlueprintError;

    fn from_str(s: &str) -> Result<Self> {
        let path = s
            .trim()
            .split('.')
            .map(|part| {
                part.parse::<usize>().map_err(|_| {
                    BlueprintError::InvalidSelection(format!("'{}' is not a component path", s))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(path))
    }
}

/// File name to source text, as returned by one generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedFiles(BTreeMap<String, String>);

impl GeneratedFiles {
    /// File names in sorted order.
    pub fn file_names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, String>> for GeneratedFiles {
    fn from(files: BTreeMap<String, String>) -> Self {
        Self(files)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for GeneratedFiles {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
