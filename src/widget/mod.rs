use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the id with [`sanitize_id`] applied.
    pub fn sanitized(&self) -> WidgetId {
        WidgetId(sanitize_id(&self.0))
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for WidgetId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The closed set of supported widget kinds. The serialized tags match the
/// project file format (`Entry`, `Combobox` and `Progressbar` for the input,
/// dropdown and progress-bar kinds).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WidgetKind {
    Button,
    Label,
    #[serde(rename = "Entry")]
    TextInput,
    Checkbox,
    #[serde(rename = "Combobox")]
    Dropdown,
    Slider,
    #[serde(rename = "Progressbar")]
    ProgressBar,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 7] = [
        WidgetKind::Button,
        WidgetKind::Label,
        WidgetKind::TextInput,
        WidgetKind::Checkbox,
        WidgetKind::Dropdown,
        WidgetKind::Slider,
        WidgetKind::ProgressBar,
    ];

    /// Type label used in the project file and in generated-code comments.
    pub const fn type_name(&self) -> &'static str {
        match self {
            WidgetKind::Button => "Button",
            WidgetKind::Label => "Label",
            WidgetKind::TextInput => "Entry",
            WidgetKind::Checkbox => "Checkbox",
            WidgetKind::Dropdown => "Combobox",
            WidgetKind::Slider => "Slider",
            WidgetKind::ProgressBar => "Progressbar",
        }
    }

    /// Variable-name prefix in generated code (`self.<prefix>_<id> = ...`).
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            WidgetKind::Button => "button",
            WidgetKind::Label => "label",
            WidgetKind::TextInput => "entry",
            WidgetKind::Checkbox => "checkbox",
            WidgetKind::Dropdown => "combobox",
            WidgetKind::Slider => "slider",
            WidgetKind::ProgressBar => "progressbar",
        }
    }

    /// CustomTkinter constructor name emitted for this kind.
    pub const fn constructor(&self) -> &'static str {
        match self {
            WidgetKind::Button => "CTkButton",
            WidgetKind::Label => "CTkLabel",
            WidgetKind::TextInput => "CTkEntry",
            WidgetKind::Checkbox => "CTkCheckBox",
            WidgetKind::Dropdown => "CTkComboBox",
            WidgetKind::Slider => "CTkSlider",
            WidgetKind::ProgressBar => "CTkProgressBar",
        }
    }

    pub fn from_code_prefix(prefix: &str) -> Option<WidgetKind> {
        WidgetKind::ALL.into_iter().find(|k| k.code_prefix() == prefix)
    }

    /// Returns the default canvas size for a widget of this kind.
    pub const fn default_size(&self) -> (i32, i32) {
        match self {
            WidgetKind::Slider | WidgetKind::ProgressBar => (200, 20),
            _ => (100, 30),
        }
    }

    /// Returns the full property schema for this kind, populated with defaults.
    /// A widget's property keys are exactly these, never more, never fewer.
    pub fn default_props(&self) -> IndexMap<String, Property> {
        let mut p = IndexMap::new();
        match self {
            WidgetKind::Button => {
                insert_str(&mut p, "text", "Button");
                insert_int(&mut p, "width", 100);
                insert_int(&mut p, "height", 30);
                insert_str(&mut p, "command", "");
            }
            WidgetKind::Label => {
                insert_str(&mut p, "text", "Label");
                insert_int(&mut p, "width", 100);
                insert_int(&mut p, "height", 30);
                insert_int(&mut p, "font_size", 12);
            }
            WidgetKind::TextInput => {
                insert_str(&mut p, "placeholder", "Enter text...");
                insert_int(&mut p, "width", 100);
                insert_int(&mut p, "height", 30);
            }
            WidgetKind::Checkbox => {
                insert_str(&mut p, "text", "Checkbox");
                insert_bool(&mut p, "checked", false);
                insert_int(&mut p, "width", 100);
                insert_int(&mut p, "height", 30);
            }
            WidgetKind::Dropdown => {
                insert_list(&mut p, "values", &["Option 1", "Option 2", "Option 3"]);
                insert_int(&mut p, "width", 100);
                insert_int(&mut p, "height", 30);
            }
            WidgetKind::Slider => {
                insert_int(&mut p, "from_", 0);
                insert_int(&mut p, "to", 100);
                insert_int(&mut p, "value", 50);
                insert_int(&mut p, "width", 200);
                insert_int(&mut p, "height", 20);
            }
            WidgetKind::ProgressBar => {
                insert_enum(&mut p, "mode", "determinate", &["determinate", "indeterminate"]);
                insert_int(&mut p, "value", 50);
                insert_int(&mut p, "width", 200);
                insert_int(&mut p, "height", 20);
            }
        }
        p
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Str,
    Int,
    Bool,
    List,
    Enum,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::List(v) => Some(v),
            _ => None,
        }
    }

    fn matches(&self, ty: PropertyType) -> bool {
        matches!(
            (self, ty),
            (PropertyValue::Str(_), PropertyType::Str)
                | (PropertyValue::Str(_), PropertyType::Enum)
                | (PropertyValue::Int(_), PropertyType::Int)
                | (PropertyValue::Bool(_), PropertyType::Bool)
                | (PropertyValue::List(_), PropertyType::List)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
    #[serde(rename = "type")]
    pub ty: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

fn insert_str(map: &mut IndexMap<String, Property>, name: &str, value: &str) {
    map.insert(
        name.to_owned(),
        Property {
            name: name.to_owned(),
            value: PropertyValue::Str(value.to_owned()),
            ty: PropertyType::Str,
            options: None,
        },
    );
}

fn insert_int(map: &mut IndexMap<String, Property>, name: &str, value: i64) {
    map.insert(
        name.to_owned(),
        Property {
            name: name.to_owned(),
            value: PropertyValue::Int(value),
            ty: PropertyType::Int,
            options: None,
        },
    );
}

fn insert_bool(map: &mut IndexMap<String, Property>, name: &str, value: bool) {
    map.insert(
        name.to_owned(),
        Property {
            name: name.to_owned(),
            value: PropertyValue::Bool(value),
            ty: PropertyType::Bool,
            options: None,
        },
    );
}

fn insert_list(map: &mut IndexMap<String, Property>, name: &str, values: &[&str]) {
    map.insert(
        name.to_owned(),
        Property {
            name: name.to_owned(),
            value: PropertyValue::List(values.iter().map(|s| (*s).to_owned()).collect()),
            ty: PropertyType::List,
            options: None,
        },
    );
}

fn insert_enum(map: &mut IndexMap<String, Property>, name: &str, value: &str, options: &[&str]) {
    map.insert(
        name.to_owned(),
        Property {
            name: name.to_owned(),
            value: PropertyValue::Str(value.to_owned()),
            ty: PropertyType::Enum,
            options: Some(options.iter().map(|s| (*s).to_owned()).collect()),
        },
    );
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub properties: IndexMap<String, Property>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub layer: i32,
}

impl Widget {
    pub fn new(id: impl Into<WidgetId>, kind: WidgetKind, x: i32, y: i32) -> Self {
        let (width, height) = kind.default_size();
        Self {
            id: id.into(),
            kind,
            x,
            y,
            width,
            height,
            properties: kind.default_props(),
            group_id: None,
            layer: 0,
        }
    }

    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Re-establishes the schema invariant: property keys become exactly the
    /// schema for this kind. Unknown keys are dropped, missing or type-mismatched
    /// entries fall back to the kind's default.
    pub fn normalize_properties(&mut self) {
        let mut normalized = self.kind.default_props();
        for (name, slot) in normalized.iter_mut() {
            if let Some(existing) = self.properties.get(name) {
                if existing.value.matches(slot.ty) {
                    slot.value = existing.value.clone();
                } else {
                    log::warn!(
                        "widget {}: property '{}' has wrong type, using default",
                        self.id,
                        name
                    );
                }
            }
        }
        self.properties = normalized;
    }

    pub fn str_prop(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(|p| p.value.as_str())
    }

    pub fn int_prop(&self, name: &str) -> Option<i64> {
        self.properties.get(name).and_then(|p| p.value.as_int())
    }

    pub fn bool_prop(&self, name: &str) -> Option<bool> {
        self.properties.get(name).and_then(|p| p.value.as_bool())
    }

    pub fn list_prop(&self, name: &str) -> Option<&[String]> {
        self.properties.get(name).and_then(|p| p.value.as_list())
    }

    /// Sets a property value if the key exists in the schema; unknown names are ignored.
    pub fn set_prop(&mut self, name: &str, value: PropertyValue) {
        if let Some(p) = self.properties.get_mut(name) {
            p.value = value;
        }
    }
}

/// Turns an arbitrary id into a valid Python identifier fragment. Separator
/// characters become underscores; a leading underscore is added when the result
/// would not start with a letter or underscore. Idempotent.
pub fn sanitize_id(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match out.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => out.insert(0, '_'),
    }
    out
}

/// Escapes a string for embedding in a single-quoted Python literal.
pub fn escape_py(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_id_replaces_separators() {
        assert_eq!(sanitize_id("a-1"), "a_1");
        assert_eq!(sanitize_id("btn-ok-2"), "btn_ok_2");
        assert_eq!(sanitize_id("already_clean"), "already_clean");
        assert_eq!(sanitize_id("with space.dot"), "with_space_dot");
    }

    #[test]
    fn test_sanitize_id_leading_character() {
        assert_eq!(sanitize_id("1abc"), "_1abc");
        // the separator becomes an underscore first, so no extra prefix is needed
        assert_eq!(sanitize_id("-x"), "_x");
        assert_eq!(sanitize_id(""), "_");
        for raw in ["9", "a", "_", "é"] {
            let clean = sanitize_id(raw);
            let first = clean.chars().next().unwrap();
            assert!(first.is_ascii_alphabetic() || first == '_', "{:?}", clean);
        }
    }

    #[test]
    fn test_sanitize_id_idempotent() {
        for raw in ["a-1", "1abc", "", "x y z", "67cb4eb3-1bd3-4b29", "_ok"] {
            let once = sanitize_id(raw);
            assert_eq!(sanitize_id(&once), once);
        }
    }

    #[test]
    fn test_escape_py() {
        assert_eq!(escape_py("hello"), "hello");
        assert_eq!(escape_py("it's"), "it\\'s");
        assert_eq!(escape_py("a\\b"), "a\\\\b");
        assert_eq!(escape_py("two\nlines"), "two\\nlines");
    }

    #[test]
    fn test_default_props_match_schema() {
        for kind in WidgetKind::ALL {
            let props = kind.default_props();
            assert!(!props.is_empty(), "{:?} has no schema", kind);
            for (name, p) in &props {
                assert_eq!(name, &p.name);
                assert!(p.value.matches(p.ty), "{:?}.{} default mismatches type", kind, name);
            }
        }
    }

    #[test]
    fn test_progressbar_mode_is_enum() {
        let props = WidgetKind::ProgressBar.default_props();
        let mode = &props["mode"];
        assert_eq!(mode.ty, PropertyType::Enum);
        let options = mode.options.as_ref().unwrap();
        assert!(options.contains(&"determinate".to_owned()));
        assert!(options.contains(&"indeterminate".to_owned()));
    }

    #[test]
    fn test_widget_new_uses_kind_defaults() {
        let w = Widget::new("b1", WidgetKind::Button, 10, 20);
        assert_eq!((w.x, w.y, w.width, w.height), (10, 20, 100, 30));
        assert_eq!(w.str_prop("text"), Some("Button"));
        assert_eq!(w.str_prop("command"), Some(""));
        let s = Widget::new("s1", WidgetKind::Slider, 0, 0);
        assert_eq!((s.width, s.height), (200, 20));
    }

    #[test]
    fn test_normalize_properties_restores_schema() {
        let mut w = Widget::new("b1", WidgetKind::Button, 0, 0);
        w.properties.shift_remove("command");
        w.properties.insert(
            "bogus".to_owned(),
            Property {
                name: "bogus".to_owned(),
                value: PropertyValue::Int(1),
                ty: PropertyType::Int,
                options: None,
            },
        );
        w.set_prop("text", PropertyValue::Str("Go".to_owned()));
        // Wrong type sneaks in through deserialized data.
        w.properties.get_mut("width").unwrap().value = PropertyValue::Str("wide".to_owned());

        w.normalize_properties();

        let keys: Vec<_> = w.properties.keys().cloned().collect();
        assert_eq!(keys, ["text", "width", "height", "command"]);
        assert_eq!(w.str_prop("text"), Some("Go"));
        assert_eq!(w.int_prop("width"), Some(100));
        assert_eq!(w.str_prop("command"), Some(""));
    }

    #[test]
    fn test_code_prefix_round_trip() {
        for kind in WidgetKind::ALL {
            assert_eq!(WidgetKind::from_code_prefix(kind.code_prefix()), Some(kind));
        }
        assert_eq!(WidgetKind::from_code_prefix("frame"), None);
    }
}
