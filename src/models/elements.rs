use serde::{Deserialize, Serialize};

pub const DEFAULT_ELLIPSE_FILL: &str = "#ffffff";
pub const DEFAULT_LINE_STROKE: &str = "#000000";
pub const DEFAULT_LINE_STROKE_WIDTH: f64 = 1.0;
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_FONT_SIZE: u32 = 16;
pub const DEFAULT_FONT_WEIGHT: &str = "normal";
pub const DEFAULT_TEXT_COLOR: &str = "#000000";

/// One visual primitive on a page. Stored flat: the variant fields sit next to
/// the common ones and `type` names the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageElement {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z_index: i32,
    #[serde(flatten)]
    pub kind: ElementKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Line(Line),
    Text(Text),
    Image(Image),
    Frame(Frame),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default)]
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub width: f64,
    pub height: f64,
    pub fill_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default)]
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub x2: f64,
    pub y2: f64,
    pub stroke_color: String,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    pub font_family: String,
    pub font_size: u32,
    pub font_weight: String,
    pub text_align: TextAlign,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub border_radius: f64,
    #[serde(default)]
    pub fit: ImageFit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Contain,
    Cover,
    Fill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default)]
    pub children: Vec<i64>,
}

impl PageElement {
    pub fn children(&self) -> &[i64] {
        match &self.kind {
            ElementKind::Frame(frame) => &frame.children,
            _ => &[],
        }
    }
}

/// Elements in the order they are painted: ascending `z_index`, ties keep
/// their position in the page.
pub fn paint_order(elements: &[PageElement]) -> Vec<&PageElement> {
    let mut ordered: Vec<&PageElement> = elements.iter().collect();
    ordered.sort_by_key(|element| element.z_index);
    ordered
}
