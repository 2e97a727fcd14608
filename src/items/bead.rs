use serde::{Deserialize, Serialize};
use std::fmt;

/// One product row as persisted to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeadRecord {
    pub name: String,
    pub product_code: String,
    pub brand: String,
    #[serde(rename = "type")]
    pub bead_type: String,
    pub size: String,
    pub image_url: Option<String>,
    pub source_url: String,
    /// Present only for sites whose detail pages are crawled.
    #[serde(flatten)]
    pub detail: Option<DetailAttributes>,
}

/// Attribute rows read from a product detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailField {
    Color,
    Finish,
    Shape,
    SizeDetail,
    GlassGroup,
    Dyed,
    Galvanized,
    Plating,
}

impl DetailField {
    pub const ALL: [DetailField; 8] = [
        DetailField::Color,
        DetailField::Finish,
        DetailField::Shape,
        DetailField::SizeDetail,
        DetailField::GlassGroup,
        DetailField::Dyed,
        DetailField::Galvanized,
        DetailField::Plating,
    ];

    /// WooCommerce attribute slug used in `attribute_pa_<slug>` row classes.
    pub fn woocommerce_slug(self) -> &'static str {
        match self {
            DetailField::Color => "color-group",
            DetailField::Finish => "finish",
            DetailField::Shape => "shape",
            DetailField::SizeDetail => "size",
            DetailField::GlassGroup => "glass-group",
            DetailField::Dyed => "dyed",
            DetailField::Galvanized => "galva",
            DetailField::Plating => "plating",
        }
    }
}

impl fmt::Display for DetailField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetailField::Color => "color",
            DetailField::Finish => "finish",
            DetailField::Shape => "shape",
            DetailField::SizeDetail => "size_detail",
            DetailField::GlassGroup => "glass_group",
            DetailField::Dyed => "dyed",
            DetailField::Galvanized => "galvanized",
            DetailField::Plating => "plating",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailAttributes {
    pub color: Option<String>,
    pub finish: Option<String>,
    pub shape: Option<String>,
    pub size_detail: Option<String>,
    pub glass_group: Option<String>,
    pub dyed: Option<String>,
    pub galvanized: Option<String>,
    pub plating: Option<String>,
}

impl DetailAttributes {
    pub fn set(&mut self, field: DetailField, value: Option<String>) {
        let slot = match field {
            DetailField::Color => &mut self.color,
            DetailField::Finish => &mut self.finish,
            DetailField::Shape => &mut self.shape,
            DetailField::SizeDetail => &mut self.size_detail,
            DetailField::GlassGroup => &mut self.glass_group,
            DetailField::Dyed => &mut self.dyed,
            DetailField::Galvanized => &mut self.galvanized,
            DetailField::Plating => &mut self.plating,
        };
        *slot = value;
    }

    pub fn get(&self, field: DetailField) -> Option<&str> {
        match field {
            DetailField::Color => self.color.as_deref(),
            DetailField::Finish => self.finish.as_deref(),
            DetailField::Shape => self.shape.as_deref(),
            DetailField::SizeDetail => self.size_detail.as_deref(),
            DetailField::GlassGroup => self.glass_group.as_deref(),
            DetailField::Dyed => self.dyed.as_deref(),
            DetailField::Galvanized => self.galvanized.as_deref(),
            DetailField::Plating => self.plating.as_deref(),
        }
    }
}

/// A record waiting for its detail page. It rides along as the detail
/// request's payload, so completion never needs a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialBead(BeadRecord);

impl PartialBead {
    pub fn new(mut record: BeadRecord) -> Self {
        record.detail = None;
        Self(record)
    }

    pub fn record(&self) -> &BeadRecord {
        &self.0
    }

    /// Merges detail attributes, producing the final record.
    pub fn complete(self, detail: DetailAttributes) -> BeadRecord {
        BeadRecord {
            detail: Some(detail),
            ..self.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordStage {
    Partial(PartialBead),
    Complete(BeadRecord),
}
