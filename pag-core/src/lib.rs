//! # pag-core
//!
//! Plain-data scene graph consumed by the PAG text pipeline. Nodes are
//! owned values with serde derives; the typesetter only reads them.
//!
//! ```text
//! Document
//!   ├── layers: Vec<Layer>
//!   │     ├── contents: Vec<Element>   Text | TextLayout | Group
//!   │     └── children: Vec<Layer>
//!   └── compositions: Vec<Composition>
//!         └── layers: Vec<Layer>
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod text_document;

pub use text_document::{Color, ParagraphJustification, TextDirection, TextDocument};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct Document {
    pub id: Uuid,
    pub width: f32,
    pub height: f32,
    pub layers: Vec<Layer>,
    pub compositions: Vec<Composition>,
}

impl Document {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            width,
            height,
            layers: Vec::new(),
            compositions: Vec::new(),
        }
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Visits every Text node in document order, compositions last.
    pub fn for_each_text(&self, mut visitor: impl FnMut(&Text)) {
        fn visit_elements(elements: &[Element], visitor: &mut dyn FnMut(&Text)) {
            for element in elements {
                match element {
                    Element::Text(text) => visitor(text),
                    Element::Group(group) => visit_elements(&group.elements, visitor),
                    Element::TextLayout(_) => {}
                }
            }
        }
        fn visit_layers(layers: &[Layer], visitor: &mut dyn FnMut(&Text)) {
            for layer in layers {
                visit_elements(&layer.contents, visitor);
                visit_layers(&layer.children, visitor);
            }
        }
        visit_layers(&self.layers, &mut visitor);
        for composition in &self.compositions {
            visit_layers(&composition.layers, &mut visitor);
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct Composition {
    pub id: Uuid,
    pub width: f32,
    pub height: f32,
    pub layers: Vec<Layer>,
}

impl Composition {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            width,
            height,
            layers: Vec::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct Layer {
    pub id: Uuid,
    pub name: String,
    pub contents: Vec<Element>,
    pub children: Vec<Layer>,
}

impl Layer {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            contents: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_contents(mut self, contents: Vec<Element>) -> Self {
        self.contents = contents;
        self
    }
}

/// Vector content attached to a layer or a group.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum Element {
    Text(Text),
    TextLayout(TextLayout),
    Group(Group),
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct Group {
    pub id: Uuid,
    pub elements: Vec<Element>,
}

impl Group {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            id: Uuid::new_v4(),
            elements,
        }
    }
}

/// A single run of text drawn at `position` (the baseline origin).
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Text {
    pub id: Uuid,
    pub text: String,
    pub font_family: String,
    /// Empty means "Regular".
    pub font_style: String,
    pub font_size: f32,
    pub letter_spacing: f32,
    pub position: Point,
}

impl Default for Text {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            text: String::new(),
            font_family: String::new(),
            font_style: String::new(),
            font_size: 12.0,
            letter_spacing: 0.0,
            position: Point::default(),
        }
    }
}

impl Text {
    pub fn new(text: &str, font_family: &str, font_size: f32) -> Self {
        Self {
            text: text.to_string(),
            font_family: font_family.to_string(),
            font_size,
            ..Default::default()
        }
    }
}

/// Horizontal alignment of the Text siblings of a TextLayout.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    #[default]
    Start,
    Center,
    End,
    Justify,
}

/// Paragraph modifier applied to every Text sibling in the same scope.
#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct TextLayout {
    /// When non-zero, overrides the position of every sibling Text.
    pub position: Point,
    pub text_align: TextAlign,
}
