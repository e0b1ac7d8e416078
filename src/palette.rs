use serde::Serialize;

use crate::error::ProgressError;
use crate::theme::{Color, Theme};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagColor {
    pub name: String,
    pub color: Color,
}

/// Tag-to-color mapping that remembers the order tags were assigned in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ColorAssignment {
    entries: Vec<TagColor>,
}

impl ColorAssignment {
    pub fn get(&self, name: &str) -> Option<Color> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.color)
    }

    pub fn entries(&self) -> &[TagColor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cycles through the theme palette in tag order: tag `i` gets `palette[i % len]`.
pub fn assign_colors<S: AsRef<str>>(
    tag_names: &[S],
    theme: &Theme,
) -> Result<ColorAssignment, ProgressError> {
    if theme.palette.is_empty() {
        return Err(ProgressError::InvalidTheme {
            theme_id: theme.name.clone(),
        });
    }

    let entries = tag_names
        .iter()
        .enumerate()
        .map(|(index, name)| TagColor {
            name: name.as_ref().to_owned(),
            color: theme.palette[index % theme.palette.len()],
        })
        .collect();

    Ok(ColorAssignment { entries })
}
