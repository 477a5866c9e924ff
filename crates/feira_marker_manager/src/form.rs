use feira_marker_models::{vocabulary, Coords, Marker, MarkerKind};
use miette::{bail, Result};

pub const SUGGESTION_LIMIT: usize = 8;

/// What the user decided in the form. The form itself never touches the store.
#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    Save(Marker),
    Delete,
    Cancel,
}

/// Editable copy of one marker.
/// `index` is the position of the edited marker in the store, `None` for a marker not yet saved.
#[derive(Debug, Clone, Default)]
pub struct MarkerForm {
    index: Option<usize>,
    pub kind: MarkerKind,
    pub coords: Option<Coords>,
    pub quantity_text: String,
    pub query: String,
    products: Vec<String>,
}

impl MarkerForm {
    pub fn new_at(coords: Coords) -> Self {
        Self {
            coords: Some(coords),
            ..Default::default()
        }
    }

    pub fn edit(index: usize, marker: &Marker) -> Self {
        Self {
            index: Some(index),
            kind: marker.kind,
            coords: Some(marker.coords),
            quantity_text: marker.quantidade.to_string(),
            query: String::new(),
            products: marker.frutas.clone(),
        }
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }
    pub fn is_new(&self) -> bool {
        self.index.is_none()
    }
    pub fn products(&self) -> &[String] {
        &self.products
    }

    pub fn toggle_kind(&mut self) {
        self.kind = self.kind.toggled();
    }
    pub fn set_kind(&mut self, kind: MarkerKind) {
        self.kind = kind;
    }

    pub fn suggestions(&self, limit: usize) -> Vec<&'static str> {
        vocabulary::suggest(&self.query, &self.products, limit)
    }

    /// Returns whether the product was added. Adding twice is a no-op.
    pub fn add_product(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let folded = vocabulary::fold(name);
        if self.products.iter().any(|p| vocabulary::fold(p) == folded) {
            return false;
        }
        self.products.push(name.to_string());
        self.query.clear();
        true
    }

    /// Returns whether the product was present.
    pub fn remove_product(&mut self, name: &str) -> bool {
        let folded = vocabulary::fold(name);
        let before = self.products.len();
        self.products.retain(|p| vocabulary::fold(p) != folded);
        before != self.products.len()
    }

    pub fn quantity(&self) -> Result<i64> {
        let text = self.quantity_text.trim();
        if text.is_empty() {
            return Ok(0);
        }
        match text.parse::<i64>() {
            Ok(q) => Ok(q),
            Err(_) => bail!("quantidade '{text}' is not an integer"),
        }
    }

    pub fn save(&self) -> Result<FormOutcome> {
        let Some(coords) = self.coords else {
            bail!("a marker needs coordinates before it can be saved");
        };
        let quantidade = self.quantity()?;
        Ok(FormOutcome::Save(Marker {
            kind: self.kind,
            coords,
            frutas: self.products.clone(),
            quantidade,
        }))
    }

    pub fn delete(&self) -> FormOutcome {
        FormOutcome::Delete
    }
    pub fn cancel(&self) -> FormOutcome {
        FormOutcome::Cancel
    }
}
