//! Hit Presenter. Pure projection of the result set; server order is kept.

use lookout_core::config::LookoutConfig;
use lookout_core::types::{Document, SearchResponse};
use serde::Serialize;
use serde_json::Value;

/// Which document fields make up a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitLayout {
    pub primary_key: String,
    pub title_field: String,
    pub detail_fields: Vec<String>,
}

impl HitLayout {
    pub fn from_config(config: &LookoutConfig) -> Self {
        Self {
            primary_key: config.gateway.primary_key.clone(),
            title_field: config.display.title_field.clone(),
            detail_fields: config.display.detail_fields.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitDetail {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitCard {
    pub id: Option<String>,
    pub title: String,
    pub details: Vec<HitDetail>,
}

pub fn hit_cards(result: Option<&SearchResponse>, layout: &HitLayout) -> Vec<HitCard> {
    result.map_or_else(Vec::new, |r| r.hits.iter().map(|hit| hit_card(hit, layout)).collect())
}

pub fn hit_card(hit: &Document, layout: &HitLayout) -> HitCard {
    HitCard {
        id: hit.id(&layout.primary_key),
        title: hit.field(&layout.title_field).map(display_value).unwrap_or_default(),
        details: layout
            .detail_fields
            .iter()
            .filter_map(|field| hit.field(field).map(|v| HitDetail { field: field.clone(), value: display_value(v) }))
            .collect(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => group_thousands(i.unsigned_abs(), i < 0),
            (None, Some(u)) => group_thousands(u, false),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// `2148327` -> `2,148,327`
fn group_thousands(n: u64, negative: bool) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
