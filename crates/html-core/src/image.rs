use serde::{Deserialize, Serialize};

use crate::dom::{Dom, ElementData, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAlign {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// Editable presentation of an `<img>`, mirrored to its attributes and style.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub alt: String,
    pub title: String,
    pub align: ImageAlign,
    /// Border width in pixels; zero means none.
    pub border: u32,
    /// Outer margin in pixels.
    pub margin: u32,
}

fn parse_px(value: &str) -> Option<u32> {
    let number = value.trim().trim_end_matches("px").trim();
    number.parse::<f32>().ok().filter(|n| *n >= 0.0).map(|n| n.round() as u32)
}

fn leading_px(value: &str) -> Option<u32> {
    value.split_whitespace().find_map(parse_px)
}

impl ImageSettings {
    pub fn read(el: &ElementData) -> Self {
        let dimension = |name: &str| {
            el.attr(name)
                .and_then(parse_px)
                .or_else(|| el.style(name).as_deref().and_then(parse_px))
        };
        let align = match (el.style("float").as_deref(), el.attr("align")) {
            (Some("left"), _) | (None, Some("left")) => ImageAlign::Left,
            (Some("right"), _) | (None, Some("right")) => ImageAlign::Right,
            _ if el.style("margin-left").as_deref() == Some("auto")
                && el.style("display").as_deref() == Some("block") =>
            {
                ImageAlign::Center
            }
            (None, Some("middle" | "center")) => ImageAlign::Center,
            _ => ImageAlign::None,
        };
        Self {
            width: dimension("width"),
            height: dimension("height"),
            alt: el.attr("alt").unwrap_or_default().to_string(),
            title: el.attr("title").unwrap_or_default().to_string(),
            align,
            border: el
                .style("border")
                .as_deref()
                .and_then(leading_px)
                .or_else(|| el.attr("border").and_then(parse_px))
                .unwrap_or(0),
            margin: el.style("margin").as_deref().and_then(leading_px).unwrap_or(0),
        }
    }

    /// Writes the settings onto `el`. A dimension equal to what `read` sees
    /// is left as authored, so values like `50%` or `auto` survive.
    pub fn write(&self, el: &mut ElementData) {
        let current = Self::read(el);
        for (name, value, previous) in [
            ("width", self.width, current.width),
            ("height", self.height, current.height),
        ] {
            if value == previous {
                continue;
            }
            el.set_style(name, None);
            match value {
                Some(px) => el.set_attr(name, px.to_string()),
                None => {
                    el.remove_attr(name);
                }
            }
        }
        el.set_attr("alt", self.alt.clone());
        if self.title.is_empty() {
            el.remove_attr("title");
        } else {
            el.set_attr("title", self.title.clone());
        }
        el.remove_attr("align");
        el.remove_attr("border");
        for property in ["float", "display", "margin", "margin-left", "margin-right"] {
            el.set_style(property, None);
        }
        if self.margin > 0 {
            el.set_style("margin", Some(&format!("{}px", self.margin)));
        }
        match self.align {
            ImageAlign::None => {}
            ImageAlign::Left => el.set_style("float", Some("left")),
            ImageAlign::Right => el.set_style("float", Some("right")),
            ImageAlign::Center => {
                el.set_style("display", Some("block"));
                el.set_style("margin-left", Some("auto"));
                el.set_style("margin-right", Some("auto"));
            }
        }
        let border = (self.border > 0).then(|| format!("{}px solid #000000", self.border));
        el.set_style("border", border.as_deref());
    }
}

/// Writes settings onto an image in a single replacement of its element data.
pub fn apply_image_settings(dom: &mut Dom, image: NodeId, settings: &ImageSettings) -> bool {
    let Some(el) = dom.element(image).filter(|el| el.tag == "img") else {
        return false;
    };
    let mut updated = el.clone();
    settings.write(&mut updated);
    match dom.element_mut(image) {
        Some(el) => {
            *el = updated;
            true
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeHandle {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl ResizeHandle {
    /// Sign applied to pointer deltas: handles on the left and top grow the
    /// image when dragged outwards, i.e. towards negative coordinates.
    fn signs(self) -> (f32, f32) {
        match self {
            ResizeHandle::NorthWest => (-1.0, -1.0),
            ResizeHandle::NorthEast => (1.0, -1.0),
            ResizeHandle::SouthWest => (-1.0, 1.0),
            ResizeHandle::SouthEast => (1.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ResizeSession {
    image: NodeId,
    handle: ResizeHandle,
    origin: (f32, f32),
    start: (f32, f32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverTooltip {
    pub image: NodeId,
    pub text: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEditForm {
    pub image: NodeId,
    pub settings: ImageSettings,
}

/// Interactive state layered over the images in the document: selection,
/// the edit form, an active resize drag and the hover tooltip. None of it is
/// stored in the tree, so it never reaches serialized content.
#[derive(Debug, Clone)]
pub struct ImageWidgetController {
    widgets: Vec<NodeId>,
    selected: Option<NodeId>,
    form: Option<ImageEditForm>,
    resize: Option<ResizeSession>,
    tooltip: Option<HoverTooltip>,
    min_size: u32,
}

impl ImageWidgetController {
    pub fn new(min_size: u32) -> Self {
        Self {
            widgets: Vec::new(),
            selected: None,
            form: None,
            resize: None,
            tooltip: None,
            min_size: min_size.max(1),
        }
    }

    /// Re-reads the image set and drops state for images that went away.
    pub fn rescan(&mut self, dom: &Dom) {
        self.widgets = dom.elements_by_tag("img");
        let alive = |id: &NodeId| self.widgets.contains(id);
        if !self.selected.as_ref().is_some_and(alive) {
            self.selected = None;
        }
        if !self.form.as_ref().is_some_and(|form| alive(&form.image)) {
            self.form = None;
        }
        if !self.resize.as_ref().is_some_and(|session| alive(&session.image)) {
            self.resize = None;
        }
        if !self.tooltip.as_ref().is_some_and(|tip| alive(&tip.image)) {
            self.tooltip = None;
        }
    }

    pub fn clear(&mut self) {
        self.widgets.clear();
        self.selected = None;
        self.form = None;
        self.resize = None;
        self.tooltip = None;
    }

    pub fn widgets(&self) -> &[NodeId] {
        &self.widgets
    }

    pub fn is_widget(&self, image: NodeId) -> bool {
        self.widgets.contains(&image)
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn select(&mut self, image: NodeId) -> bool {
        if !self.is_widget(image) {
            return false;
        }
        self.selected = Some(image);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Opens the edit form populated from the image.
    pub fn open_form(&mut self, dom: &Dom, image: NodeId) -> Option<&ImageEditForm> {
        if !self.select(image) {
            return None;
        }
        let settings = ImageSettings::read(dom.element(image)?);
        self.form = Some(ImageEditForm { image, settings });
        self.form.as_ref()
    }

    pub fn form(&self) -> Option<&ImageEditForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut ImageEditForm> {
        self.form.as_mut()
    }

    pub fn take_form(&mut self) -> Option<ImageEditForm> {
        self.form.take()
    }

    /// Starts a drag; `rendered` is the on-screen size used when the image
    /// has no explicit dimensions.
    pub fn begin_resize(
        &mut self,
        dom: &Dom,
        image: NodeId,
        handle: ResizeHandle,
        pointer: (f32, f32),
        rendered: (f32, f32),
    ) -> bool {
        if !self.select(image) {
            return false;
        }
        let settings = dom.element(image).map(ImageSettings::read).unwrap_or_default();
        let start = (
            settings.width.map_or(rendered.0, |w| w as f32),
            settings.height.map_or(rendered.1, |h| h as f32),
        );
        self.resize = Some(ResizeSession {
            image,
            handle,
            origin: pointer,
            start,
        });
        self.tooltip = None;
        true
    }

    pub fn is_resizing(&self) -> bool {
        self.resize.is_some()
    }

    /// Live size update for a drag step. Free resize unless `lock_aspect`
    /// is held, which keeps the ratio captured at drag start.
    pub fn drag_resize(
        &mut self,
        dom: &mut Dom,
        pointer: (f32, f32),
        lock_aspect: bool,
    ) -> Option<(u32, u32)> {
        let session = self.resize?;
        let (sx, sy) = session.handle.signs();
        let min = self.min_size as f32;
        let mut width = (session.start.0 + sx * (pointer.0 - session.origin.0)).max(min);
        let mut height = (session.start.1 + sy * (pointer.1 - session.origin.1)).max(min);
        if lock_aspect && session.start.0 > 0.0 && session.start.1 > 0.0 {
            let ratio = session.start.0 / session.start.1;
            if (width / session.start.0 - 1.0).abs() >= (height / session.start.1 - 1.0).abs() {
                height = (width / ratio).max(min);
            } else {
                width = (height * ratio).max(min);
            }
        }
        let size = (width.round() as u32, height.round() as u32);
        let el = dom.element_mut(session.image)?;
        el.set_style("width", None);
        el.set_style("height", None);
        el.set_attr("width", size.0.to_string());
        el.set_attr("height", size.1.to_string());
        Some(size)
    }

    pub fn end_resize(&mut self) -> Option<NodeId> {
        self.resize.take().map(|session| session.image)
    }

    pub fn hover(&mut self, dom: &Dom, image: NodeId, pointer: (f32, f32), rendered: (f32, f32)) {
        if self.resize.is_some() || !self.is_widget(image) {
            return;
        }
        let Some(el) = dom.element(image) else {
            return;
        };
        let settings = ImageSettings::read(el);
        let width = settings.width.unwrap_or(rendered.0.round() as u32);
        let height = settings.height.unwrap_or(rendered.1.round() as u32);
        let mut text = format!("{width} × {height}");
        if !settings.alt.is_empty() {
            text.push_str(" · ");
            text.push_str(&settings.alt);
        }
        self.tooltip = Some(HoverTooltip {
            image,
            text,
            x: pointer.0,
            y: pointer.1,
        });
    }

    pub fn hover_end(&mut self) {
        self.tooltip = None;
    }

    pub fn tooltip(&self) -> Option<&HoverTooltip> {
        self.tooltip.as_ref()
    }
}
