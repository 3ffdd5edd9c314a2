//! Deterministic rendering of the widget document into CustomTkinter source.
//!
//! The output is a pure function of the widget map, the window spec and the
//! style config: same document in, byte-identical text out. Widgets are emitted
//! in map insertion order.

use crate::project::WindowSpec;
use crate::widget::{escape_py, sanitize_id, Widget, WidgetId, WidgetKind};
use indexmap::IndexMap;
use rustpython_parser::{parse, Mode};
use serde::{Deserialize, Serialize};

/// Padding added around the furthest widget edge when auto-fit grows the window.
pub const FIT_MARGIN: i32 = 50;

/// Ambient styling applied to the generated preamble. Threaded in explicitly so
/// generation stays a pure function of its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    pub appearance_mode: String,
    pub color_theme: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            appearance_mode: "dark".to_owned(),
            color_theme: "blue".to_owned(),
        }
    }
}

/// Computes the window size actually used for generation. With auto-fit on, the
/// configured size is grown (never shrunk) to cover every widget plus margin.
pub fn effective_window_size(
    widgets: &IndexMap<WidgetId, Widget>,
    window: &WindowSpec,
) -> (i32, i32) {
    if window.auto_fit && !widgets.is_empty() {
        let max_x = widgets.values().map(Widget::right).max().unwrap_or(0) + FIT_MARGIN;
        let max_y = widgets.values().map(Widget::bottom).max().unwrap_or(0) + FIT_MARGIN;
        (window.width.max(max_x), window.height.max(max_y))
    } else {
        (window.width, window.height)
    }
}

/// Renders the full generated program for the given widgets and window spec.
pub fn generate(
    widgets: &IndexMap<WidgetId, Widget>,
    window: &WindowSpec,
    style: &StyleConfig,
) -> String {
    let (win_w, win_h) = effective_window_size(widgets, window);
    let geometry = format!("{}x{}", win_w, win_h);

    let mut out = String::new();
    let mut line = |s: &str| {
        out.push_str(s);
        out.push('\n');
    };

    line("#!/usr/bin/env python3");
    line("\"\"\"");
    line("Generated GUI Application");
    line("Created with Professional Python GUI Builder MVP");
    line("\"\"\"");
    line("");
    line("import customtkinter as ctk");
    line("import tkinter as tk");
    line("");
    line("# Set appearance mode and color theme");
    line(&format!("ctk.set_appearance_mode('{}')", escape_py(&style.appearance_mode)));
    line(&format!("ctk.set_default_color_theme('{}')", escape_py(&style.color_theme)));
    line("");
    line("class GeneratedApp(ctk.CTk):");
    line("    \"\"\"Generated GUI Application\"\"\"");
    line("    ");
    line("    def __init__(self):");
    line("        super().__init__()");
    line(&format!("        self.title('{}')", escape_py(&window.title)));
    if !window.resizable {
        line("        self.resizable(False, False)");
    }
    line(&format!("        self.minsize({}, {})", window.min_width, window.min_height));
    line(&format!("        self.geometry('{}')", geometry));
    line("        self.update_idletasks()  # Force window to update");
    line("        self.state('normal')  # Ensure window is not minimized");
    line(&format!("        self.geometry('{}')  # Set size again", geometry));
    line("        self.update_idletasks()");
    line("        self.setup_ui()");
    line("        # Use after to delay size enforcement");
    line("        self.after(100, self.enforce_window_size)");
    line("        self.after(200, self.center_window)");
    line("");
    line("    def enforce_window_size(self):");
    line("        \"\"\"Aggressively enforce the window size\"\"\"");
    line(&format!("        self.geometry('{}')", geometry));
    line("        self.update_idletasks()");
    line(&format!(
        "        self.tk.call('wm', 'geometry', self._w, '{}')",
        geometry
    ));
    line("        self.update_idletasks()");
    line("        self.state('normal')");
    line(&format!("        self.geometry('{}')", geometry));
    line("        self.update_idletasks()");
    line("        try:");
    line(&format!("            self.configure(width={}, height={})", win_w, win_h));
    line("            self.update_idletasks()");
    line("        except:");
    line("            pass");
    line(&format!("        self.geometry('{}')", geometry));
    line("        self.update_idletasks()");
    line("");
    line("    def setup_ui(self):");
    line("        \"\"\"Setup the user interface\"\"\"");

    for widget in widgets.values() {
        line(&emit_widget(widget));
    }

    if window.center_on_screen {
        line("        # Center window on screen after UI is set up");
        line("        self.center_window()");
        line("");
        line("    def center_window(self):");
        line("        \"\"\"Center the window on screen\"\"\"");
        line("        self.update_idletasks()");
        line("        # Force window to correct size multiple times to ensure it sticks");
        line(&format!("        self.geometry('{}')", geometry));
        line("        self.update_idletasks()");
        line(&format!(
            "        self.geometry('{}')  # Set again to ensure it sticks",
            geometry
        ));
        line("        self.update_idletasks()");
        line("        ");
        line("        # Get actual dimensions");
        line("        width = self.winfo_width()");
        line("        height = self.winfo_height()");
        line("        ");
        line("        # If window is still too small, force it again");
        line(&format!(
            "        if width < {} or height < {}:",
            win_w - 100,
            win_h - 100
        ));
        line(&format!("            self.geometry('{}')", geometry));
        line("            self.update_idletasks()");
        line("            width = self.winfo_width()");
        line("            height = self.winfo_height()");
        line("        ");
        line("        # Center the window");
        line("        x = (self.winfo_screenwidth() // 2) - (width // 2)");
        line("        y = (self.winfo_screenheight() // 2) - (height // 2)");
        line("        self.geometry(f'{width}x{height}+{x}+{y}')");
    }

    line("");
    line("if __name__ == '__main__':");
    line("    app = GeneratedApp()");
    line("    app.mainloop()");

    out
}

/// Checks the generated text against a real Python grammar. Pass/fail only; no
/// structure is ever extracted here.
pub fn validate(code: &str) -> (bool, String) {
    match parse(code, Mode::Module, "<generated>") {
        Ok(_) => (true, "Code is valid".to_owned()),
        Err(e) => (false, format!("Syntax error: {}", e)),
    }
}

/// Renders the construction + placement block for a single widget.
fn emit_widget(w: &Widget) -> String {
    let var = format!("{}_{}", w.kind.code_prefix(), sanitize_id(w.id.as_str()));
    let ctor = w.kind.constructor();
    let width = w.int_prop("width").unwrap_or(w.width as i64);
    let height = w.int_prop("height").unwrap_or(w.height as i64);

    let mut lines = vec![format!(
        "        # {} at ({}, {})",
        w.kind.type_name(),
        w.x,
        w.y
    )];
    lines.push(format!("        self.{} = ctk.{}(", var, ctor));

    match w.kind {
        WidgetKind::Button => {
            let text = escape_py(w.str_prop("text").unwrap_or("Button"));
            lines.push(format!(
                "            self, text='{}', width={}, height={}",
                text, width, height
            ));
            let command = w.str_prop("command").unwrap_or("");
            if !command.is_empty() {
                lines.push(format!("            , command={}", command));
            }
            lines.push("        )".to_owned());
        }
        WidgetKind::Label => {
            let text = escape_py(w.str_prop("text").unwrap_or("Label"));
            let font_size = w.int_prop("font_size").unwrap_or(12);
            lines.push(format!(
                "            self, text='{}', width={}, height={},",
                text, width, height
            ));
            lines.push(format!("            font=ctk.CTkFont(size={})", font_size));
            lines.push("        )".to_owned());
        }
        WidgetKind::TextInput => {
            let placeholder = escape_py(w.str_prop("placeholder").unwrap_or(""));
            lines.push(format!(
                "            self, placeholder_text='{}', width={}, height={}",
                placeholder, width, height
            ));
            lines.push("        )".to_owned());
        }
        WidgetKind::Checkbox => {
            let text = escape_py(w.str_prop("text").unwrap_or("Checkbox"));
            lines.push(format!(
                "            self, text='{}', width={}, height={}",
                text, width, height
            ));
            lines.push("        )".to_owned());
            if w.bool_prop("checked").unwrap_or(false) {
                lines.push(format!("        self.{}.select()", var));
            }
        }
        WidgetKind::Dropdown => {
            let values = w.list_prop("values").unwrap_or(&[]);
            let literal = values
                .iter()
                .map(|v| format!("'{}'", escape_py(v)))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!(
                "            self, values=[{}], width={}, height={}",
                literal, width, height
            ));
            lines.push("        )".to_owned());
        }
        WidgetKind::Slider => {
            let from = w.int_prop("from_").unwrap_or(0);
            let to = w.int_prop("to").unwrap_or(100);
            let value = w.int_prop("value").unwrap_or(50);
            lines.push(format!(
                "            self, from_={}, to={}, width={}, height={}",
                from, to, width, height
            ));
            lines.push("        )".to_owned());
            lines.push(format!("        self.{}.set({})", var, value));
        }
        WidgetKind::ProgressBar => {
            lines.push(format!(
                "            self, width={}, height={}",
                width, height
            ));
            lines.push("        )".to_owned());
            if w.str_prop("mode").unwrap_or("determinate") == "determinate" {
                let value = w.int_prop("value").unwrap_or(50);
                lines.push(format!(
                    "        self.{}.set({})",
                    var,
                    value as f64 / 100.0
                ));
            }
        }
    }

    lines.push(format!("        self.{}.place(x={}, y={})", var, w.x, w.y));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::PropertyValue;

    fn doc_with(widgets: Vec<Widget>) -> IndexMap<WidgetId, Widget> {
        widgets.into_iter().map(|w| (w.id.clone(), w)).collect()
    }

    #[test]
    fn test_generate_is_deterministic() {
        let mut w = Widget::new("a-1", WidgetKind::Button, 50, 50);
        w.set_prop("text", PropertyValue::Str("Click Me!".to_owned()));
        let widgets = doc_with(vec![w]);
        let window = WindowSpec::default();
        let style = StyleConfig::default();
        assert_eq!(
            generate(&widgets, &window, &style),
            generate(&widgets, &window, &style)
        );
    }

    #[test]
    fn test_generate_sanitizes_variable_name() {
        let mut w = Widget::new("a-1", WidgetKind::Button, 50, 50);
        w.set_prop("text", PropertyValue::Str("Click Me!".to_owned()));
        let code = generate(&doc_with(vec![w]), &WindowSpec::default(), &StyleConfig::default());
        assert!(code.contains("self.button_a_1 = ctk.CTkButton("));
        assert!(code.contains("text='Click Me!'"));
        assert!(code.contains("self.button_a_1.place(x=50, y=50)"));
        assert!(!code.contains("button_a-1"));
    }

    #[test]
    fn test_auto_fit_grows_window() {
        let mut w = Widget::new("w1", WidgetKind::Button, 900, 900);
        w.width = 100;
        w.height = 100;
        let widgets = doc_with(vec![w]);
        let window = WindowSpec::default(); // 800x600, auto_fit on
        let (ww, wh) = effective_window_size(&widgets, &window);
        assert!(ww >= 1050);
        assert!(wh >= 1050);
        let code = generate(&widgets, &window, &StyleConfig::default());
        assert!(code.contains("self.geometry('1050x1050')"));
    }

    #[test]
    fn test_auto_fit_never_shrinks() {
        let w = Widget::new("w1", WidgetKind::Button, 10, 10);
        let widgets = doc_with(vec![w]);
        let window = WindowSpec::default();
        assert_eq!(effective_window_size(&widgets, &window), (800, 600));
        let mut fixed = window.clone();
        fixed.auto_fit = false;
        assert_eq!(effective_window_size(&widgets, &fixed), (800, 600));
    }

    #[test]
    fn test_window_flags_in_preamble() {
        let widgets = IndexMap::new();
        let mut window = WindowSpec::default();
        window.title = "My App".to_owned();
        window.resizable = false;
        window.center_on_screen = false;
        let code = generate(&widgets, &window, &StyleConfig::default());
        assert!(code.contains("self.title('My App')"));
        assert!(code.contains("self.resizable(False, False)"));
        assert!(code.contains("self.minsize(400, 300)"));
        assert!(!code.contains("def center_window"));
    }

    #[test]
    fn test_style_config_threads_into_preamble() {
        let code = generate(
            &IndexMap::new(),
            &WindowSpec::default(),
            &StyleConfig {
                appearance_mode: "light".to_owned(),
                color_theme: "green".to_owned(),
            },
        );
        assert!(code.contains("ctk.set_appearance_mode('light')"));
        assert!(code.contains("ctk.set_default_color_theme('green')"));
    }

    #[test]
    fn test_checkbox_and_slider_mutators() {
        let mut cb = Widget::new("c1", WidgetKind::Checkbox, 0, 0);
        cb.set_prop("checked", PropertyValue::Bool(true));
        let mut sl = Widget::new("s1", WidgetKind::Slider, 0, 40);
        sl.set_prop("value", PropertyValue::Int(75));
        let code = generate(
            &doc_with(vec![cb, sl]),
            &WindowSpec::default(),
            &StyleConfig::default(),
        );
        assert!(code.contains("self.checkbox_c1.select()"));
        assert!(code.contains("self.slider_s1.set(75)"));
    }

    #[test]
    fn test_progressbar_set_fraction() {
        let mut pb = Widget::new("p1", WidgetKind::ProgressBar, 0, 0);
        pb.set_prop("value", PropertyValue::Int(50));
        let code = generate(
            &doc_with(vec![pb]),
            &WindowSpec::default(),
            &StyleConfig::default(),
        );
        assert!(code.contains("self.progressbar_p1.set(0.5)"));
    }

    #[test]
    fn test_dropdown_values_literal() {
        let w = Widget::new("d1", WidgetKind::Dropdown, 0, 0);
        let code = generate(
            &doc_with(vec![w]),
            &WindowSpec::default(),
            &StyleConfig::default(),
        );
        assert!(code.contains("values=['Option 1', 'Option 2', 'Option 3']"));
    }

    #[test]
    fn test_validate_accepts_generated_code() {
        let mut w = Widget::new("b-1", WidgetKind::Button, 5, 5);
        w.set_prop("text", PropertyValue::Str("it's fine".to_owned()));
        let code = generate(
            &doc_with(vec![w]),
            &WindowSpec::default(),
            &StyleConfig::default(),
        );
        let (ok, msg) = validate(&code);
        assert!(ok, "{}", msg);
    }

    #[test]
    fn test_validate_rejects_broken_code() {
        let (ok, msg) = validate("def broken(:\n    pass\n");
        assert!(!ok);
        assert!(msg.starts_with("Syntax error:"));
    }

    #[test]
    fn test_widget_comments_use_type_labels() {
        let code = generate(
            &doc_with(vec![
                Widget::new("e1", WidgetKind::TextInput, 10, 20),
                Widget::new("d1", WidgetKind::Dropdown, 10, 60),
                Widget::new("p1", WidgetKind::ProgressBar, 10, 100),
            ]),
            &WindowSpec::default(),
            &StyleConfig::default(),
        );
        assert!(code.contains("        # Entry at (10, 20)"));
        assert!(code.contains("        # Combobox at (10, 60)"));
        assert!(code.contains("        # Progressbar at (10, 100)"));
    }

    #[test]
    fn test_emission_order_follows_insertion_order() {
        let a = Widget::new("z_last", WidgetKind::Label, 0, 0);
        let b = Widget::new("a_first", WidgetKind::Label, 0, 40);
        let code = generate(
            &doc_with(vec![a, b]),
            &WindowSpec::default(),
            &StyleConfig::default(),
        );
        let z = code.find("label_z_last").unwrap();
        let a = code.find("label_a_first").unwrap();
        assert!(z < a);
    }
}
