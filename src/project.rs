//! Document model: widgets, groups, window settings, and project file I/O.

use crate::widget::{Widget, WidgetId, WidgetKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level window settings carried by every project and threaded into
/// code generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    pub title: String,
    pub width: i32,
    pub height: i32,
    pub resizable: bool,
    pub min_width: i32,
    pub min_height: i32,
    pub center_on_screen: bool,
    pub auto_fit: bool,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            title: "Generated GUI".to_owned(),
            width: 800,
            height: 600,
            resizable: true,
            min_width: 400,
            min_height: 300,
            center_on_screen: true,
            auto_fit: true,
        }
    }
}

/// A named collection of at least two widgets moved and resized as a unit.
///
/// The `(x, y, width, height)` rectangle is derived state: it always equals
/// the union of the member rectangles and is recomputed after every member
/// mutation. Membership is kept bidirectionally consistent with each member's
/// [`Widget::group_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetGroup {
    pub id: String,
    pub name: String,
    #[serde(rename = "widget_ids")]
    pub member_ids: Vec<WidgetId>,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub layer: i32,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
}

fn default_true() -> bool {
    true
}

/// Smallest widget dimension allowed when a group resize scales members down.
pub const MIN_MEMBER_DIMENSION: i32 = 20;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed project file: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("a group needs at least two widgets")]
    TooFewMembers,
    #[error("no widget with id '{0}'")]
    UnknownWidget(WidgetId),
    #[error("no group with id '{0}'")]
    UnknownGroup(String),
    #[error("widget '{0}' already belongs to group '{1}'")]
    AlreadyGrouped(WidgetId, String),
    #[error("widget '{0}' is not a member of group '{1}'")]
    NotAMember(WidgetId, String),
    #[error("group '{0}' has zero {1} and cannot be scaled")]
    DegenerateBounds(String, &'static str),
}

/// On-disk project shape. Widgets and groups are stored as lists; map order
/// in memory is their list order.
#[derive(Serialize, Deserialize)]
struct ProjectFile {
    widgets: Vec<Widget>,
    #[serde(default)]
    groups: Vec<WidgetGroup>,
    window_properties: WindowSpec,
}

/// The in-memory design document: the single source of truth while editing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub widgets: IndexMap<WidgetId, Widget>,
    pub groups: IndexMap<String, WidgetGroup>,
    pub window: WindowSpec,
    /// Per-kind counters for id allocation. Monotonic within a session so a
    /// deleted widget's id is never handed out again.
    id_counters: HashMap<WidgetKind, u32>,
    group_counter: u32,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh widget id for `kind`, e.g. `button_3`. Counters only
    /// ever advance, so ids are unique for the life of the document even
    /// across deletions.
    pub fn allocate_id(&mut self, kind: WidgetKind) -> WidgetId {
        loop {
            let counter = self.id_counters.entry(kind).or_insert(0);
            *counter += 1;
            let id = WidgetId::new(format!("{}_{}", kind.code_prefix(), counter));
            if !self.widgets.contains_key(&id) {
                return id;
            }
        }
    }

    /// Adds a widget at the top of the z-order.
    pub fn add_widget(&mut self, mut widget: Widget) -> WidgetId {
        widget.layer = self.top_layer() + 1;
        let id = widget.id.clone();
        self.widgets.insert(id.clone(), widget);
        id
    }

    /// Removes a widget. If it belonged to a group, the group's membership
    /// and bounds are updated; a group left with fewer than two members is
    /// dissolved.
    pub fn delete_widget(&mut self, id: &WidgetId) -> Option<Widget> {
        let widget = self.widgets.shift_remove(id)?;
        if let Some(group_id) = widget.group_id.clone() {
            if let Some(group) = self.groups.get_mut(&group_id) {
                group.member_ids.retain(|m| m != id);
                if group.member_ids.len() < 2 {
                    log::debug!("group '{}' dissolved after member deletion", group_id);
                    self.dissolve_group(&group_id);
                } else {
                    self.recompute_group_bounds(&group_id);
                }
            }
        }
        Some(widget)
    }

    fn top_layer(&self) -> i32 {
        self.all_layers().max().unwrap_or(0)
    }

    fn bottom_layer(&self) -> i32 {
        self.all_layers().min().unwrap_or(0)
    }

    fn all_layers(&self) -> impl Iterator<Item = i32> + '_ {
        self.widgets
            .values()
            .map(|w| w.layer)
            .chain(self.groups.values().map(|g| g.layer))
    }

    /// Widgets in ascending draw order (lowest layer first, insertion order
    /// breaking ties).
    pub fn draw_order(&self) -> Vec<&Widget> {
        let mut order: Vec<&Widget> = self.widgets.values().collect();
        order.sort_by_key(|w| w.layer);
        order
    }

    pub fn bring_to_front(&mut self, id: &WidgetId) -> Result<(), GroupError> {
        let top = self.top_layer();
        let widget = self
            .widgets
            .get_mut(id)
            .ok_or_else(|| GroupError::UnknownWidget(id.clone()))?;
        widget.layer = top + 1;
        Ok(())
    }

    pub fn send_to_back(&mut self, id: &WidgetId) -> Result<(), GroupError> {
        let bottom = self.bottom_layer();
        let widget = self
            .widgets
            .get_mut(id)
            .ok_or_else(|| GroupError::UnknownWidget(id.clone()))?;
        widget.layer = bottom - 1;
        Ok(())
    }

    pub fn bring_group_to_front(&mut self, group_id: &str) -> Result<(), GroupError> {
        let top = self.top_layer();
        let group = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| GroupError::UnknownGroup(group_id.to_owned()))?;
        group.layer = top + 1;
        Ok(())
    }

    pub fn send_group_to_back(&mut self, group_id: &str) -> Result<(), GroupError> {
        let bottom = self.bottom_layer();
        let group = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| GroupError::UnknownGroup(group_id.to_owned()))?;
        group.layer = bottom - 1;
        Ok(())
    }

    /// Groups the given widgets under a fresh group id. All of them must
    /// exist and be ungrouped, and at least two are required.
    pub fn create_group(
        &mut self,
        name: &str,
        member_ids: &[WidgetId],
    ) -> Result<String, GroupError> {
        if member_ids.len() < 2 {
            return Err(GroupError::TooFewMembers);
        }
        for id in member_ids {
            let widget = self
                .widgets
                .get(id)
                .ok_or_else(|| GroupError::UnknownWidget(id.clone()))?;
            if let Some(existing) = &widget.group_id {
                return Err(GroupError::AlreadyGrouped(id.clone(), existing.clone()));
            }
        }

        self.group_counter += 1;
        let group_id = loop {
            let candidate = format!("group_{}", self.group_counter);
            if !self.groups.contains_key(&candidate) {
                break candidate;
            }
            self.group_counter += 1;
        };

        for id in member_ids {
            if let Some(widget) = self.widgets.get_mut(id) {
                widget.group_id = Some(group_id.clone());
            }
        }
        let (x, y, width, height) =
            bounding_box(member_ids.iter().filter_map(|id| self.widgets.get(id)))
                .unwrap_or_default();
        self.groups.insert(
            group_id.clone(),
            WidgetGroup {
                id: group_id.clone(),
                name: name.to_owned(),
                member_ids: member_ids.to_vec(),
                x,
                y,
                width,
                height,
                layer: self.top_layer() + 1,
                visible: true,
                locked: false,
            },
        );
        Ok(group_id)
    }

    /// Removes a group; its members keep their geometry and become
    /// independent again.
    pub fn ungroup(&mut self, group_id: &str) -> Result<(), GroupError> {
        if !self.groups.contains_key(group_id) {
            return Err(GroupError::UnknownGroup(group_id.to_owned()));
        }
        self.dissolve_group(group_id);
        Ok(())
    }

    fn dissolve_group(&mut self, group_id: &str) {
        if let Some(group) = self.groups.shift_remove(group_id) {
            for id in &group.member_ids {
                if let Some(widget) = self.widgets.get_mut(id) {
                    widget.group_id = None;
                }
            }
        }
    }

    /// Adds one widget to an existing group. Membership and the widget's
    /// back-reference change together, never one without the other.
    pub fn add_to_group(&mut self, group_id: &str, id: &WidgetId) -> Result<(), GroupError> {
        if !self.groups.contains_key(group_id) {
            return Err(GroupError::UnknownGroup(group_id.to_owned()));
        }
        let widget = self
            .widgets
            .get_mut(id)
            .ok_or_else(|| GroupError::UnknownWidget(id.clone()))?;
        if let Some(existing) = &widget.group_id {
            return Err(GroupError::AlreadyGrouped(id.clone(), existing.clone()));
        }
        widget.group_id = Some(group_id.to_owned());
        if let Some(group) = self.groups.get_mut(group_id) {
            group.member_ids.push(id.clone());
        }
        self.recompute_group_bounds(group_id);
        Ok(())
    }

    /// Removes one widget from its group. A group left with fewer than two
    /// members no longer satisfies the group contract and is dissolved.
    pub fn remove_from_group(&mut self, group_id: &str, id: &WidgetId) -> Result<(), GroupError> {
        let group = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| GroupError::UnknownGroup(group_id.to_owned()))?;
        if !group.member_ids.contains(id) {
            return Err(GroupError::NotAMember(id.clone(), group_id.to_owned()));
        }
        group.member_ids.retain(|m| m != id);
        if let Some(widget) = self.widgets.get_mut(id) {
            widget.group_id = None;
        }
        if self.groups[group_id].member_ids.len() < 2 {
            self.dissolve_group(group_id);
        } else {
            self.recompute_group_bounds(group_id);
        }
        Ok(())
    }

    /// Translates every member by `(dx, dy)`. A pure translation: the group's
    /// width and height are unchanged afterwards.
    pub fn move_group(&mut self, group_id: &str, dx: i32, dy: i32) -> Result<(), GroupError> {
        let member_ids = self
            .groups
            .get(group_id)
            .ok_or_else(|| GroupError::UnknownGroup(group_id.to_owned()))?
            .member_ids
            .clone();
        for id in &member_ids {
            if let Some(widget) = self.widgets.get_mut(id) {
                widget.x += dx;
                widget.y += dy;
            }
        }
        self.recompute_group_bounds(group_id);
        Ok(())
    }

    /// Scales the group to `(new_width, new_height)`. Member positions are
    /// re-based against the group origin and scaled; member sizes are scaled
    /// with a floor of [`MIN_MEMBER_DIMENSION`] per dimension.
    pub fn resize_group(
        &mut self,
        group_id: &str,
        new_width: i32,
        new_height: i32,
    ) -> Result<(), GroupError> {
        let group = self
            .groups
            .get(group_id)
            .ok_or_else(|| GroupError::UnknownGroup(group_id.to_owned()))?;
        if group.width == 0 {
            return Err(GroupError::DegenerateBounds(group_id.to_owned(), "width"));
        }
        if group.height == 0 {
            return Err(GroupError::DegenerateBounds(group_id.to_owned(), "height"));
        }
        let (origin_x, origin_y) = (group.x, group.y);
        let sx = new_width as f64 / group.width as f64;
        let sy = new_height as f64 / group.height as f64;
        let member_ids = group.member_ids.clone();

        for id in &member_ids {
            if let Some(widget) = self.widgets.get_mut(id) {
                let rel_x = (widget.x - origin_x) as f64;
                let rel_y = (widget.y - origin_y) as f64;
                widget.x = origin_x + (rel_x * sx).round() as i32;
                widget.y = origin_y + (rel_y * sy).round() as i32;
                widget.width = ((widget.width as f64 * sx).round() as i32)
                    .max(MIN_MEMBER_DIMENSION);
                widget.height = ((widget.height as f64 * sy).round() as i32)
                    .max(MIN_MEMBER_DIMENSION);
            }
        }
        self.recompute_group_bounds(group_id);
        Ok(())
    }

    /// Re-derives a group's rectangle from its current members.
    pub fn recompute_group_bounds(&mut self, group_id: &str) {
        let bounds = self.groups.get(group_id).and_then(|group| {
            bounding_box(group.member_ids.iter().filter_map(|id| self.widgets.get(id)))
        });
        if let (Some(group), Some((x, y, width, height))) = (self.groups.get_mut(group_id), bounds)
        {
            group.x = x;
            group.y = y;
            group.width = width;
            group.height = height;
        }
    }

    /// Reads a project file. The previous document is only replaced by the
    /// caller on success, so a failed load leaves editing state untouched.
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let text = fs::read_to_string(path).map_err(|source| ProjectError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Deserializes a project, re-sanitizing every widget id and repairing
    /// group state: member lists are rewritten to the sanitized ids, dead
    /// references are dropped, bounds are recomputed, and groups left with
    /// fewer than two live members are dissolved.
    pub fn from_json(text: &str) -> Result<Self, ProjectError> {
        let file: ProjectFile = serde_json::from_str(text)?;
        let mut doc = Document {
            window: file.window_properties,
            ..Document::default()
        };

        let mut renamed: HashMap<WidgetId, WidgetId> = HashMap::new();
        for mut widget in file.widgets {
            let clean = widget.id.sanitized();
            if clean != widget.id {
                log::warn!("cleaned widget id '{}' -> '{}' on load", widget.id, clean);
                renamed.insert(widget.id.clone(), clean.clone());
                widget.id = clean;
            }
            widget.normalize_properties();
            doc.widgets.insert(widget.id.clone(), widget);
        }

        for mut group in file.groups {
            for member in &mut group.member_ids {
                if let Some(clean) = renamed.get(member) {
                    *member = clean.clone();
                }
            }
            group.member_ids.retain(|id| doc.widgets.contains_key(id));
            if group.member_ids.len() < 2 {
                log::warn!("dropped group '{}' with fewer than two live members", group.id);
                continue;
            }
            for id in &group.member_ids {
                if let Some(widget) = doc.widgets.get_mut(id) {
                    widget.group_id = Some(group.id.clone());
                }
            }
            let group_id = group.id.clone();
            doc.groups.insert(group_id.clone(), group);
            doc.recompute_group_bounds(&group_id);
        }

        // Widgets whose stored group no longer exists lose the reference.
        let live: Vec<String> = doc.groups.keys().cloned().collect();
        for widget in doc.widgets.values_mut() {
            if let Some(gid) = &widget.group_id {
                if !live.contains(gid) {
                    widget.group_id = None;
                }
            }
        }

        doc.seed_counters();
        Ok(doc)
    }

    /// Writes the project as pretty-printed JSON. The write goes to a
    /// temporary file first and is renamed into place, so an interrupted
    /// save never truncates an existing project.
    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        let text = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|source| ProjectError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| ProjectError::Write {
            path: path.to_owned(),
            source,
        })
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        let file = ProjectFile {
            widgets: self.widgets.values().cloned().collect(),
            groups: self.groups.values().cloned().collect(),
            window_properties: self.window.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Advances id counters past every id already in use so later
    /// allocations cannot collide with loaded content.
    fn seed_counters(&mut self) {
        for widget in self.widgets.values() {
            let prefix = format!("{}_", widget.kind.code_prefix());
            if let Some(n) = widget
                .id
                .as_str()
                .strip_prefix(&prefix)
                .and_then(|s| s.parse::<u32>().ok())
            {
                let counter = self.id_counters.entry(widget.kind).or_insert(0);
                *counter = (*counter).max(n);
            }
        }
        for id in self.groups.keys() {
            if let Some(n) = id.strip_prefix("group_").and_then(|s| s.parse::<u32>().ok()) {
                self.group_counter = self.group_counter.max(n);
            }
        }
    }
}

/// Union of widget rectangles, or `None` for an empty iterator.
fn bounding_box<'a>(widgets: impl Iterator<Item = &'a Widget>) -> Option<(i32, i32, i32, i32)> {
    let mut bounds: Option<(i32, i32, i32, i32)> = None;
    for w in widgets {
        let (x1, y1, x2, y2) = match bounds {
            None => (w.x, w.y, w.right(), w.bottom()),
            Some((x1, y1, x2, y2)) => (
                x1.min(w.x),
                y1.min(w.y),
                x2.max(w.right()),
                y2.max(w.bottom()),
            ),
        };
        bounds = Some((x1, y1, x2, y2));
    }
    bounds.map(|(x1, y1, x2, y2)| (x1, y1, x2 - x1, y2 - y1))
}
