use std::collections::HashSet;

use serde_json::Value;

use super::fields::Fields;

use crate::{
    error::AppError,
    models::elements::{
        DEFAULT_ELLIPSE_FILL, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_FONT_WEIGHT,
        DEFAULT_LINE_STROKE, DEFAULT_LINE_STROKE_WIDTH, DEFAULT_TEXT_COLOR, ElementKind, Ellipse,
        Frame, Image, ImageFit, Line, PageElement, Rectangle, Text, TextAlign,
    },
};

const COMMON_FIELDS: &[&str] = &["id", "x", "y", "z_index", "type"];
const RECTANGLE_FIELDS: &[&str] = &[
    "width",
    "height",
    "fill_color",
    "stroke_color",
    "stroke_width",
];
const ELLIPSE_FIELDS: &[&str] = RECTANGLE_FIELDS;
const LINE_FIELDS: &[&str] = &["x2", "y2", "stroke_color", "stroke_width"];
const TEXT_FIELDS: &[&str] = &[
    "text",
    "font_family",
    "font_size",
    "font_weight",
    "text_align",
    "color",
];
const IMAGE_FIELDS: &[&str] = &["src", "width", "height", "border_radius", "fit"];
const FRAME_FIELDS: &[&str] = &["width", "height", "background_color", "children"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ElementError {
    #[error("unknown element type `{0}`")]
    UnknownElementType(String),
    #[error("invalid element field `{field}`: {reason}")]
    InvalidElementField { field: String, reason: String },
    #[error("frame child `{0}` does not reference an element on this page")]
    DanglingChildReference(i64),
    #[error("element id `{0}` is used more than once on this page")]
    DuplicateElementId(i64),
}

impl ElementError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ElementError::InvalidElementField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    fn at(self, index: usize) -> Self {
        match self {
            ElementError::InvalidElementField { field, reason } => {
                ElementError::InvalidElementField {
                    field: format!("elements[{index}].{field}"),
                    reason,
                }
            }
            other => other,
        }
    }
}

impl From<ElementError> for AppError {
    fn from(err: ElementError) -> Self {
        match err {
            ElementError::UnknownElementType(_) => AppError::invalid_field("type", err.to_string()),
            ElementError::InvalidElementField { field, reason } => {
                AppError::InvalidField { field, reason }
            }
            ElementError::DanglingChildReference(_) | ElementError::DuplicateElementId(_) => {
                AppError::Unprocessable(err.to_string())
            }
        }
    }
}

/// Parses one raw element into its typed variant, applying declared defaults.
/// Frame children are only checked structurally here; see [`validate_elements`].
pub fn validate_element(raw: &Value) -> Result<PageElement, ElementError> {
    let object = raw
        .as_object()
        .ok_or_else(|| ElementError::invalid("element", "must be a JSON object"))?;
    let fields = Fields::new(object);

    let type_name = fields.required_string("type")?;
    let (allowed, parse): (&[&str], fn(&Fields<'_>) -> Result<ElementKind, ElementError>) =
        match type_name.as_str() {
            "rectangle" => (RECTANGLE_FIELDS, parse_rectangle),
            "ellipse" => (ELLIPSE_FIELDS, parse_ellipse),
            "line" => (LINE_FIELDS, parse_line),
            "text" => (TEXT_FIELDS, parse_text),
            "image" => (IMAGE_FIELDS, parse_image),
            "frame" => (FRAME_FIELDS, parse_frame),
            _ => return Err(ElementError::UnknownElementType(type_name)),
        };

    if let Some(foreign) = object
        .keys()
        .find(|key| !COMMON_FIELDS.contains(&key.as_str()) && !allowed.contains(&key.as_str()))
    {
        return Err(ElementError::invalid(
            foreign,
            format!("is not a field of {type_name} elements"),
        ));
    }

    let element = PageElement {
        id: fields.required_int("id")?,
        x: fields.required_number("x")?,
        y: fields.required_number("y")?,
        z_index: fields.optional_i32("z_index")?.unwrap_or(0),
        kind: parse(&fields)?,
    };

    if element.children().contains(&element.id) {
        return Err(ElementError::invalid("children", "a frame cannot contain itself"));
    }

    Ok(element)
}

/// Validates a whole page document: every element, unique ids, and frame
/// children that point at sibling elements.
pub fn validate_elements(raw: &[Value]) -> Result<Vec<PageElement>, ElementError> {
    let elements = raw
        .iter()
        .enumerate()
        .map(|(index, value)| validate_element(value).map_err(|err| err.at(index)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut ids = HashSet::with_capacity(elements.len());
    for element in &elements {
        if !ids.insert(element.id) {
            return Err(ElementError::DuplicateElementId(element.id));
        }
    }

    for element in &elements {
        if let Some(missing) = element.children().iter().find(|child| !ids.contains(child)) {
            return Err(ElementError::DanglingChildReference(*missing));
        }
    }

    Ok(elements)
}

fn parse_rectangle(fields: &Fields<'_>) -> Result<ElementKind, ElementError> {
    Ok(ElementKind::Rectangle(Rectangle {
        width: fields.required_dimension("width")?,
        height: fields.required_dimension("height")?,
        fill_color: fields.optional_string("fill_color")?,
        stroke_color: fields.optional_string("stroke_color")?,
        stroke_width: fields.optional_dimension("stroke_width")?.unwrap_or(0.0),
    }))
}

fn parse_ellipse(fields: &Fields<'_>) -> Result<ElementKind, ElementError> {
    Ok(ElementKind::Ellipse(Ellipse {
        width: fields.required_dimension("width")?,
        height: fields.required_dimension("height")?,
        fill_color: fields
            .optional_string("fill_color")?
            .unwrap_or_else(|| DEFAULT_ELLIPSE_FILL.to_string()),
        stroke_color: fields.optional_string("stroke_color")?,
        stroke_width: fields.optional_dimension("stroke_width")?.unwrap_or(0.0),
    }))
}

fn parse_line(fields: &Fields<'_>) -> Result<ElementKind, ElementError> {
    Ok(ElementKind::Line(Line {
        x2: fields.required_number("x2")?,
        y2: fields.required_number("y2")?,
        stroke_color: fields
            .optional_string("stroke_color")?
            .unwrap_or_else(|| DEFAULT_LINE_STROKE.to_string()),
        stroke_width: fields
            .optional_dimension("stroke_width")?
            .unwrap_or(DEFAULT_LINE_STROKE_WIDTH),
    }))
}

fn parse_text(fields: &Fields<'_>) -> Result<ElementKind, ElementError> {
    let text_align = match fields.optional_string("text_align")?.as_deref() {
        None | Some("left") => TextAlign::Left,
        Some("center") => TextAlign::Center,
        Some("right") => TextAlign::Right,
        Some(_) => {
            return Err(ElementError::invalid(
                "text_align",
                "must be one of left, center, right",
            ));
        }
    };

    let font_size = match fields.optional_int("font_size")? {
        None => DEFAULT_FONT_SIZE,
        Some(size) => u32::try_from(size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| ElementError::invalid("font_size", "must be a positive integer"))?,
    };

    Ok(ElementKind::Text(Text {
        text: fields.required_string("text")?,
        font_family: fields
            .optional_string("font_family")?
            .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
        font_size,
        font_weight: fields
            .optional_string("font_weight")?
            .unwrap_or_else(|| DEFAULT_FONT_WEIGHT.to_string()),
        text_align,
        color: fields
            .optional_string("color")?
            .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string()),
    }))
}

fn parse_image(fields: &Fields<'_>) -> Result<ElementKind, ElementError> {
    let fit = match fields.optional_string("fit")?.as_deref() {
        None | Some("contain") => ImageFit::Contain,
        Some("cover") => ImageFit::Cover,
        Some("fill") => ImageFit::Fill,
        Some(_) => {
            return Err(ElementError::invalid(
                "fit",
                "must be one of contain, cover, fill",
            ));
        }
    };

    let src = fields.required_string("src")?;
    if src.trim().is_empty() {
        return Err(ElementError::invalid("src", "must not be empty"));
    }

    Ok(ElementKind::Image(Image {
        src,
        width: fields.required_dimension("width")?,
        height: fields.required_dimension("height")?,
        border_radius: fields.optional_dimension("border_radius")?.unwrap_or(0.0),
        fit,
    }))
}

fn parse_frame(fields: &Fields<'_>) -> Result<ElementKind, ElementError> {
    let children = fields.optional_id_list("children")?.unwrap_or_default();
    let mut seen = HashSet::with_capacity(children.len());
    if let Some(duplicate) = children.iter().find(|child| !seen.insert(**child)) {
        return Err(ElementError::invalid(
            "children",
            format!("lists element `{duplicate}` more than once"),
        ));
    }

    Ok(ElementKind::Frame(Frame {
        width: fields.required_dimension("width")?,
        height: fields.required_dimension("height")?,
        background_color: fields.optional_string("background_color")?,
        children,
    }))
}
