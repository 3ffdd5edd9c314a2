//! Best-effort reconstruction of the widget document from generated text.
//!
//! This is a line-scanning state machine, not a Python front end. It is only
//! guaranteed correct on text shaped like [`crate::codegen::generate`] output
//! (plus value-only edits); structural rewrites may drop or misclassify widgets
//! and that is accepted behavior. Nothing here returns an error outward: every
//! recognition failure degrades to a per-property default, a skipped block, or
//! whatever was recovered so far.

use crate::project::WindowSpec;
use crate::widget::{sanitize_id, PropertyValue, Widget, WidgetId, WidgetKind};
use indexmap::IndexMap;

/// How many lines past a widget's closing parenthesis are searched for the
/// matching `.place(...)` call and post-construction mutators.
pub const PLACE_LOOKAHEAD: usize = 4;

/// Scans generated code and rebuilds the widget map and window spec.
pub fn parse(code: &str) -> (IndexMap<WidgetId, Widget>, WindowSpec) {
    let mut widgets = IndexMap::new();
    let mut window = WindowSpec::default();
    let lines: Vec<&str> = code.lines().collect();

    let mut in_build_method = false;
    let mut block: Vec<String> = Vec::new();

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();

        scan_window_line(line, &mut window);

        if line.contains("def setup_ui(self):") {
            log::debug!("entered build method at line {}", i + 1);
            in_build_method = true;
            block.clear();
            continue;
        } else if in_build_method && line.starts_with("def ") {
            log::debug!("left build method at line {}", i + 1);
            in_build_method = false;
        }
        if !in_build_method {
            continue;
        }

        if is_widget_start(line) {
            // A fresh constructor line abandons any unterminated block.
            block = vec![line.to_owned()];
        } else if !block.is_empty() && line == ")" {
            block.push(line.to_owned());
            let text = block.join(" ");
            let tail_end = (i + 1 + PLACE_LOOKAHEAD).min(lines.len());
            let tail: Vec<&str> = lines[i + 1..tail_end].iter().map(|l| l.trim()).collect();
            if let Some(widget) = parse_widget_block(&text, &tail) {
                log::debug!("recovered widget {} ({:?})", widget.id, widget.kind);
                widgets.insert(widget.id.clone(), widget);
            } else {
                log::debug!("skipped unrecognized widget block at line {}", i + 1);
            }
            block.clear();
        } else if !block.is_empty()
            && !line.is_empty()
            && !line.starts_with('#')
            && !line.starts_with("self.")
        {
            block.push(line.to_owned());
        }
    }

    (widgets, window)
}

/// Window-level calls are fixed single-line signatures, recognized in any state.
fn scan_window_line(line: &str, window: &mut WindowSpec) {
    if line.contains("self.title(") {
        if let Some(Scanned::Str(title)) = scan_value(line, first_quote(line).unwrap_or(0)) {
            window.title = title;
        }
    } else if line.contains("self.geometry(") {
        if let Some(Scanned::Str(geometry)) = scan_value(line, first_quote(line).unwrap_or(0)) {
            if let Some((w, h)) = geometry.split_once('x') {
                if let (Ok(w), Ok(h)) = (w.parse(), h.parse()) {
                    window.width = w;
                    window.height = h;
                }
            }
        }
    } else if line.contains("self.minsize(") {
        if let Some((w, h)) = extract_int_pair(line, "self.minsize(") {
            window.min_width = w;
            window.min_height = h;
        }
    } else if line.contains("self.resizable(False") {
        window.resizable = false;
    }
}

fn first_quote(line: &str) -> Option<usize> {
    line.find(['\'', '"'])
}

/// An assignment whose target is `self.<prefix>_<id>` and which is not a
/// placement call starts a widget block.
fn is_widget_start(line: &str) -> bool {
    if line.contains(".place(") || !line.contains('=') {
        return false;
    }
    WidgetKind::ALL
        .iter()
        .any(|k| line.contains(&format!("self.{}_", k.code_prefix())))
}

fn parse_widget_block(text: &str, tail: &[&str]) -> Option<Widget> {
    let var = extract_variable_name(text)?;
    let kind = WidgetKind::ALL
        .into_iter()
        .find(|k| var.starts_with(&format!("{}_", k.code_prefix())))?;
    let id = sanitize_id(&var[kind.code_prefix().len() + 1..]);
    if id == "_" {
        return None;
    }

    let place = tail.iter().find(|l| l.contains(".place("));
    let (x, y) = place.map_or((0, 0), |l| extract_position(l));

    let mut w = Widget::new(id.as_str(), kind, x, y);
    match kind {
        WidgetKind::Button => {
            w.set_prop("text", PropertyValue::Str(extract_str(text, "text", "Button")));
            w.set_prop("width", PropertyValue::Int(extract_int(text, "width", 100)));
            w.set_prop("height", PropertyValue::Int(extract_int(text, "height", 30)));
        }
        WidgetKind::Label => {
            w.set_prop("text", PropertyValue::Str(extract_str(text, "text", "Label")));
            w.set_prop("width", PropertyValue::Int(extract_int(text, "width", 200)));
            w.set_prop("height", PropertyValue::Int(extract_int(text, "height", 30)));
            w.set_prop("font_size", PropertyValue::Int(extract_int(text, "size", 12)));
        }
        WidgetKind::TextInput => {
            w.set_prop(
                "placeholder",
                PropertyValue::Str(extract_str(text, "placeholder_text", "")),
            );
            w.set_prop("width", PropertyValue::Int(extract_int(text, "width", 200)));
            w.set_prop("height", PropertyValue::Int(extract_int(text, "height", 30)));
        }
        WidgetKind::Checkbox => {
            w.set_prop("text", PropertyValue::Str(extract_str(text, "text", "Checkbox")));
            w.set_prop("width", PropertyValue::Int(extract_int(text, "width", 200)));
            w.set_prop("height", PropertyValue::Int(extract_int(text, "height", 30)));
            let select = format!("self.{}.select()", var);
            if tail.iter().any(|l| l.contains(&select)) {
                w.set_prop("checked", PropertyValue::Bool(true));
            }
        }
        WidgetKind::Dropdown => {
            if let Some(values) = extract_list(text, "values") {
                w.set_prop("values", PropertyValue::List(values));
            }
            w.set_prop("width", PropertyValue::Int(extract_int(text, "width", 200)));
            w.set_prop("height", PropertyValue::Int(extract_int(text, "height", 30)));
        }
        WidgetKind::Slider => {
            w.set_prop("from_", PropertyValue::Int(extract_int(text, "from_", 0)));
            w.set_prop("to", PropertyValue::Int(extract_int(text, "to", 100)));
            w.set_prop("width", PropertyValue::Int(extract_int(text, "width", 200)));
            w.set_prop("height", PropertyValue::Int(extract_int(text, "height", 20)));
            if let Some(v) = tail_set_value(tail, &var) {
                w.set_prop("value", PropertyValue::Int(v as i64));
            }
        }
        WidgetKind::ProgressBar => {
            w.set_prop("width", PropertyValue::Int(extract_int(text, "width", 200)));
            w.set_prop("height", PropertyValue::Int(extract_int(text, "height", 20)));
            if let Some(v) = tail_set_value(tail, &var) {
                w.set_prop("value", PropertyValue::Int((v * 100.0).round() as i64));
            }
        }
    }
    w.width = w.int_prop("width").unwrap_or(w.width as i64) as i32;
    w.height = w.int_prop("height").unwrap_or(w.height as i64) as i32;
    Some(w)
}

/// Extracts the variable name from `self.<name> = ...`.
fn extract_variable_name(text: &str) -> Option<String> {
    let start = text.find("self.")? + 5;
    let end = text[start..].find(" =")? + start;
    let name = &text[start..end];
    if name.is_empty() || name.contains('(') {
        return None;
    }
    Some(name.to_owned())
}

#[derive(Debug, PartialEq)]
enum Scanned {
    Str(String),
    Int(i64),
    Float(f64),
}

/// Finds `name=` at a word boundary and returns the offset just past the `=`.
fn find_named(text: &str, name: &str) -> Option<usize> {
    let pat = format!("{}=", name);
    let mut from = 0;
    while let Some(pos) = text[from..].find(&pat).map(|p| p + from) {
        let boundary = pos == 0
            || !text[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        if boundary {
            return Some(pos + pat.len());
        }
        from = pos + pat.len();
    }
    None
}

/// Reads one value starting at `start`: a single- or double-quoted string
/// (escape-aware) or a signed integer/decimal literal.
fn scan_value(text: &str, start: usize) -> Option<Scanned> {
    let rest = text.get(start..)?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    if first == '\'' || first == '"' {
        let mut out = String::new();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some(other) => out.push(other),
                    None => return None,
                }
            } else if c == first {
                return Some(Scanned::Str(out));
            } else {
                out.push(c);
            }
        }
        None // unterminated string
    } else {
        let mut end = 0;
        for (i, c) in rest.char_indices() {
            if c.is_ascii_digit() || c == '.' || (c == '-' && i == 0) {
                end = i + c.len_utf8();
            } else {
                break;
            }
        }
        let token = &rest[..end];
        if token.is_empty() {
            None
        } else if token.contains('.') {
            token.parse::<f64>().ok().map(Scanned::Float)
        } else {
            token.parse::<i64>().ok().map(Scanned::Int)
        }
    }
}

fn extract_str(text: &str, name: &str, default: &str) -> String {
    match find_named(text, name).and_then(|pos| scan_value(text, pos)) {
        Some(Scanned::Str(s)) => s,
        _ => default.to_owned(),
    }
}

fn extract_int(text: &str, name: &str, default: i64) -> i64 {
    match find_named(text, name).and_then(|pos| scan_value(text, pos)) {
        Some(Scanned::Int(n)) => n,
        Some(Scanned::Float(f)) => f.round() as i64,
        _ => default,
    }
}

/// Reads `name=[...]` as a list of strings. Quoted elements are unescaped;
/// bare tokens are kept trimmed.
fn extract_list(text: &str, name: &str) -> Option<Vec<String>> {
    let start = find_named(text, name)?;
    let rest = text.get(start..)?;
    if !rest.starts_with('[') {
        return None;
    }
    let mut items = Vec::new();
    let mut bare = String::new();
    let mut chars = rest[1..].chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ']' => {
                if !bare.trim().is_empty() {
                    items.push(bare.trim().to_owned());
                }
                return Some(items);
            }
            ',' => {
                if !bare.trim().is_empty() {
                    items.push(bare.trim().to_owned());
                }
                bare.clear();
            }
            '\'' | '"' => {
                let mut item = String::new();
                for q in chars.by_ref() {
                    if q == c {
                        break;
                    }
                    item.push(q);
                }
                items.push(item);
                bare.clear();
            }
            _ => bare.push(c),
        }
    }
    None // unterminated list
}

/// Recovers `(x, y)` from a `.place(x=..., y=...)` line.
fn extract_position(line: &str) -> (i32, i32) {
    let x = extract_int(line, "x", 0);
    let y = extract_int(line, "y", 0);
    (x as i32, y as i32)
}

/// Finds a `self.<var>.set(<number>)` mutator within the look-ahead window.
fn tail_set_value(tail: &[&str], var: &str) -> Option<f64> {
    let pat = format!("self.{}.set(", var);
    for line in tail {
        if let Some(pos) = line.find(&pat) {
            match scan_value(line, pos + pat.len()) {
                Some(Scanned::Int(n)) => return Some(n as f64),
                Some(Scanned::Float(f)) => return Some(f),
                _ => {}
            }
        }
    }
    None
}

/// Reads two comma-separated integers following `pat`, e.g. `minsize(400, 300)`.
fn extract_int_pair(line: &str, pat: &str) -> Option<(i32, i32)> {
    let start = line.find(pat)? + pat.len();
    let rest = line.get(start..)?;
    let (first, second) = rest.split_once(',')?;
    let first: i32 = first.trim().parse().ok()?;
    let second = second.trim_start();
    let end = second
        .find(|c: char| !c.is_ascii_digit() && c != '-')
        .unwrap_or(second.len());
    let second: i32 = second[..end].parse().ok()?;
    Some((first, second))
}
