//! Highlight attributes.
//!
//! An [`AttributeSet`] is an immutable key/value mapping describing how a range of text should be
//! painted (colors, font style, virtual text, ...). Sets are cheap to clone and are composed into
//! layered sets when several highlight layers overlap: the higher-priority layer wins on a key
//! collision while every layer stays introspectable through [`AttributeSet::layers`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Attribute key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKey {
    /// Text color.
    Foreground,
    /// Background color.
    Background,
    /// Bold font.
    Bold,
    /// Italic font.
    Italic,
    /// Underline color (or `Bool(true)` for the foreground color).
    Underline,
    /// Strike-through.
    StrikeThrough,
    /// Wave underline color (typically used for diagnostics).
    WaveUnderline,
    /// Font family name.
    FontFamily,
    /// Font size in points.
    FontSize,
    /// Virtual text rendered in front of the highlighted range.
    PrependText,
    /// Tooltip text.
    Tooltip,
    /// Integration-defined key.
    Custom(Arc<str>),
}

impl AttributeKey {
    /// Create a custom key.
    pub fn custom(name: &str) -> Self {
        Self::Custom(Arc::from(name))
    }

    /// Returns `true` if the key participates in font resolution (see [`FontSpec::resolve`]).
    pub fn affects_font(&self) -> bool {
        matches!(
            self,
            Self::Bold | Self::Italic | Self::FontFamily | Self::FontSize
        )
    }
}

/// RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// White.
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    /// Black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Red.
    pub const RED: Self = Self::rgb(0xff, 0, 0);
    /// Green.
    pub const GREEN: Self = Self::rgb(0, 0x80, 0);
    /// Blue.
    pub const BLUE: Self = Self::rgb(0, 0, 0xff);
    /// Yellow.
    pub const YELLOW: Self = Self::rgb(0xff, 0xff, 0);

    /// Create a color from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    /// Flag value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Color value.
    Color(Color),
    /// Text value.
    Text(Arc<str>),
}

impl AttributeValue {
    /// Returns the flag value, if this is a [`AttributeValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer value, if this is a [`AttributeValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the color value, if this is a [`AttributeValue::Color`].
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text value, if this is a [`AttributeValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Color> for AttributeValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(Arc::from(value))
    }
}

#[derive(Debug)]
enum Node {
    /// Entries sorted by key, keys unique.
    Simple(Vec<(AttributeKey, AttributeValue)>),
    /// Simple sets, highest priority first.
    Layered(Vec<AttributeSet>),
}

/// Immutable attribute set.
///
/// A set is either *simple* (a plain mapping) or *layered* (the composition of simple sets, see
/// [`AttributeSet::compose`]). Equality compares the effective mapping, so a layered set equals a
/// simple set holding the same effective entries.
#[derive(Clone)]
pub struct AttributeSet(Arc<Node>);

impl AttributeSet {
    /// Create an empty attribute set.
    pub fn empty() -> Self {
        Self(Arc::new(Node::Simple(Vec::new())))
    }

    /// Create a set holding a single entry.
    pub fn single(key: AttributeKey, value: impl Into<AttributeValue>) -> Self {
        Self(Arc::new(Node::Simple(vec![(key, value.into())])))
    }

    /// Return a new simple set with `key` set to `value` on top of the effective entries of
    /// `self`.
    pub fn with(&self, key: AttributeKey, value: impl Into<AttributeValue>) -> Self {
        let mut entries: BTreeMap<AttributeKey, AttributeValue> = self
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.insert(key, value.into());
        Self(Arc::new(Node::Simple(entries.into_iter().collect())))
    }

    /// Compose two sets: values of `top` win over values of `bottom` on key collisions.
    ///
    /// Empty operands are elided, so composing with an empty set returns the other operand.
    pub fn compose(top: &AttributeSet, bottom: &AttributeSet) -> AttributeSet {
        if top.is_empty() {
            return bottom.clone();
        }
        if bottom.is_empty() {
            return top.clone();
        }
        let mut layers = Vec::with_capacity(top.layers().len() + bottom.layers().len());
        layers.extend(top.layers().iter().cloned());
        layers.extend(bottom.layers().iter().cloned());
        Self(Arc::new(Node::Layered(layers)))
    }

    /// The simple sets this set is made of, highest priority first.
    ///
    /// A simple set returns itself.
    pub fn layers(&self) -> &[AttributeSet] {
        match &*self.0 {
            Node::Simple(_) => std::slice::from_ref(self),
            Node::Layered(layers) => layers,
        }
    }

    /// Returns `true` if this set was produced by [`AttributeSet::compose`].
    pub fn is_layered(&self) -> bool {
        matches!(&*self.0, Node::Layered(_))
    }

    /// Effective value of `key`.
    pub fn get(&self, key: &AttributeKey) -> Option<&AttributeValue> {
        match &*self.0 {
            Node::Simple(entries) => entries
                .binary_search_by(|(k, _)| k.cmp(key))
                .ok()
                .map(|idx| &entries[idx].1),
            Node::Layered(layers) => layers.iter().find_map(|layer| layer.get(key)),
        }
    }

    /// Returns `true` if any layer defines `key`.
    pub fn contains(&self, key: &AttributeKey) -> bool {
        self.get(key).is_some()
    }

    /// Returns `true` if the set has no entries.
    pub fn is_empty(&self) -> bool {
        match &*self.0 {
            Node::Simple(entries) => entries.is_empty(),
            Node::Layered(layers) => layers.iter().all(AttributeSet::is_empty),
        }
    }

    /// Number of effective entries.
    pub fn len(&self) -> usize {
        match &*self.0 {
            Node::Simple(entries) => entries.len(),
            Node::Layered(_) => self.effective().len(),
        }
    }

    /// Effective entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKey, &AttributeValue)> {
        self.effective().into_iter()
    }

    /// Flag value of `key` (`false` when absent or not a flag).
    pub fn flag(&self, key: &AttributeKey) -> bool {
        self.get(key)
            .and_then(AttributeValue::as_bool)
            .unwrap_or(false)
    }

    /// Color value of `key`.
    pub fn color(&self, key: &AttributeKey) -> Option<Color> {
        self.get(key).and_then(AttributeValue::as_color)
    }

    /// Text value of `key`.
    pub fn text(&self, key: &AttributeKey) -> Option<&str> {
        self.get(key).and_then(AttributeValue::as_text)
    }

    /// Returns `true` if both handles point to the same allocation.
    pub fn ptr_eq(a: &AttributeSet, b: &AttributeSet) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    fn effective(&self) -> BTreeMap<&AttributeKey, &AttributeValue> {
        let mut map = BTreeMap::new();
        // Lowest priority first so that later inserts override.
        for layer in self.layers().iter().rev() {
            if let Node::Simple(entries) = &*layer.0 {
                for (k, v) in entries {
                    map.insert(k, v);
                }
            }
        }
        map
    }
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<(AttributeKey, AttributeValue)> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = (AttributeKey, AttributeValue)>>(iter: T) -> Self {
        let entries: BTreeMap<_, _> = iter.into_iter().collect();
        Self(Arc::new(Node::Simple(entries.into_iter().collect())))
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        AttributeSet::ptr_eq(self, other) || self.effective() == other.effective()
    }
}

impl Eq for AttributeSet {}

impl fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.effective()).finish()
    }
}

/// Font description resolved from attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontSpec {
    /// Family name.
    pub family: Arc<str>,
    /// Size in points.
    pub size: u32,
    /// Bold style.
    pub bold: bool,
    /// Italic style.
    pub italic: bool,
}

impl FontSpec {
    /// Create a plain font.
    pub fn new(family: &str, size: u32) -> Self {
        Self {
            family: Arc::from(family),
            size,
            bold: false,
            italic: false,
        }
    }

    /// Derive the font used to render text carrying `attrs`, starting from `self`.
    pub fn resolve(&self, attrs: Option<&AttributeSet>) -> FontSpec {
        let Some(attrs) = attrs.filter(|a| a.iter().any(|(key, _)| key.affects_font())) else {
            return self.clone();
        };
        let mut font = self.clone();
        if let Some(family) = attrs.text(&AttributeKey::FontFamily) {
            font.family = Arc::from(family);
        }
        if let Some(size) = attrs
            .get(&AttributeKey::FontSize)
            .and_then(AttributeValue::as_int)
        {
            font.size = u32::try_from(size).unwrap_or(font.size);
        }
        if let Some(bold) = attrs
            .get(&AttributeKey::Bold)
            .and_then(AttributeValue::as_bool)
        {
            font.bold = bold;
        }
        if let Some(italic) = attrs
            .get(&AttributeKey::Italic)
            .and_then(AttributeValue::as_bool)
        {
            font.italic = italic;
        }
        font
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new("Monospaced", 13)
    }
}
