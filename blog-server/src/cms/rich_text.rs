use serde::{Deserialize, Serialize};

use crate::cms::documents::ImageRef;

/// A rich-text body as stored in the CMS: an ordered list of blocks.
pub type RichText = Vec<RichTextBlock>;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "_type", rename_all = "camelCase")]
pub enum RichTextBlock {
    Block(TextBlock),
    Image(ImageRef),
    // Blocks of any other type are kept so validation doesn't fail, but
    // they are not rendered.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStyle {
    #[default]
    Normal,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Blockquote,
    #[serde(other)]
    Unknown,
}

impl BlockStyle {
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            BlockStyle::H1 => Some(1),
            BlockStyle::H2 => Some(2),
            BlockStyle::H3 => Some(3),
            BlockStyle::H4 => Some(4),
            BlockStyle::H5 => Some(5),
            BlockStyle::H6 => Some(6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Number,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    #[serde(rename = "_key")]
    pub key: Option<String>,
    #[serde(default)]
    pub style: BlockStyle,
    pub list_item: Option<ListKind>,
    pub level: Option<u8>,
    #[serde(default)]
    pub children: Vec<Span>,
    #[serde(default)]
    pub mark_defs: Vec<MarkDef>,
}

impl TextBlock {
    /// The block's text with all formatting dropped.
    pub fn plain_text(&self) -> String {
        self.children.iter().map(|span| span.text.as_str()).collect()
    }

    pub fn mark_def(&self, key: &str) -> Option<&MarkDef> {
        self.mark_defs.iter().find(|def| def.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Span {
    #[serde(rename = "_key")]
    pub key: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub marks: Vec<String>,
}

/// Annotation referenced from span marks by key. Only links carry data we
/// render.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarkDef {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_type")]
    pub kind: String,
    pub href: Option<String>,
}
