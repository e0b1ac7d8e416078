use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};

use crate::error::ProgressError;

pub const DEFAULT_THEME_ID: &str = "github-light";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub name: String,
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub palette: Vec<Color>,
}

/// Background, foreground and muted colors for one `<family>-<variant>` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeVariant {
    pub name: &'static str,
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeFamily {
    pub name: String,
    pub palette: Vec<Color>,
    pub variants: Vec<ThemeVariant>,
}

const LIGHT: &str = "light";
const DARK: &str = "dark";

/// Resolves composite theme ids such as `nord-dark`.
///
/// The family half of the id picks the palette; the full id picks the surface
/// colors. The resolver is a plain value: build one, ask it, drop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeResolver {
    families: Vec<ThemeFamily>,
}

impl ThemeResolver {
    pub fn new(families: Vec<ThemeFamily>) -> Self {
        Self { families }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            ThemeFamily {
                name: "github".to_owned(),
                palette: vec![
                    Color::from_hex(0x2da44e),
                    Color::from_hex(0x0969da),
                    Color::from_hex(0x8250df),
                    Color::from_hex(0xbf3989),
                    Color::from_hex(0xbc4c00),
                    Color::from_hex(0x9a6700),
                ],
                variants: vec![
                    ThemeVariant {
                        name: LIGHT,
                        background: Color::from_hex(0xffffff),
                        foreground: Color::from_hex(0x1f2328),
                        muted: Color::from_hex(0xd0d7de),
                    },
                    ThemeVariant {
                        name: DARK,
                        background: Color::from_hex(0x0d1117),
                        foreground: Color::from_hex(0xe6edf3),
                        muted: Color::from_hex(0x30363d),
                    },
                ],
            },
            ThemeFamily {
                name: "solarized".to_owned(),
                palette: vec![
                    Color::from_hex(0x268bd2),
                    Color::from_hex(0x859900),
                    Color::from_hex(0xb58900),
                    Color::from_hex(0xcb4b16),
                    Color::from_hex(0xd33682),
                    Color::from_hex(0x6c71c4),
                    Color::from_hex(0x2aa198),
                    Color::from_hex(0xdc322f),
                ],
                variants: vec![
                    ThemeVariant {
                        name: LIGHT,
                        background: Color::from_hex(0xfdf6e3),
                        foreground: Color::from_hex(0x586e75),
                        muted: Color::from_hex(0xeee8d5),
                    },
                    ThemeVariant {
                        name: DARK,
                        background: Color::from_hex(0x002b36),
                        foreground: Color::from_hex(0x93a1a1),
                        muted: Color::from_hex(0x073642),
                    },
                ],
            },
            ThemeFamily {
                name: "nord".to_owned(),
                palette: vec![
                    Color::from_hex(0x88c0d0),
                    Color::from_hex(0xa3be8c),
                    Color::from_hex(0xb48ead),
                    Color::from_hex(0xebcb8b),
                    Color::from_hex(0xd08770),
                    Color::from_hex(0x5e81ac),
                    Color::from_hex(0xbf616a),
                ],
                variants: vec![
                    ThemeVariant {
                        name: LIGHT,
                        background: Color::from_hex(0xeceff4),
                        foreground: Color::from_hex(0x2e3440),
                        muted: Color::from_hex(0xd8dee9),
                    },
                    ThemeVariant {
                        name: DARK,
                        background: Color::from_hex(0x2e3440),
                        foreground: Color::from_hex(0xeceff4),
                        muted: Color::from_hex(0x434c5e),
                    },
                ],
            },
            ThemeFamily {
                name: "mono".to_owned(),
                palette: vec![
                    Color::from_hex(0x555555),
                    Color::from_hex(0x888888),
                    Color::from_hex(0x333333),
                    Color::from_hex(0xaaaaaa),
                ],
                variants: vec![
                    ThemeVariant {
                        name: LIGHT,
                        background: Color::from_hex(0xffffff),
                        foreground: Color::from_hex(0x111111),
                        muted: Color::from_hex(0xe0e0e0),
                    },
                    ThemeVariant {
                        name: DARK,
                        background: Color::from_hex(0x111111),
                        foreground: Color::from_hex(0xf0f0f0),
                        muted: Color::from_hex(0x2a2a2a),
                    },
                ],
            },
        ])
    }

    pub fn resolve(&self, theme_id: &str) -> Result<Theme, ProgressError> {
        let normalized = theme_id.trim().to_ascii_lowercase();
        let unknown = || ProgressError::UnknownTheme {
            theme_id: theme_id.trim().to_owned(),
        };

        // Family names never contain '-', so the last separator splits the token.
        let (family_name, variant_name) = normalized.rsplit_once('-').ok_or_else(unknown)?;
        let family = self
            .families
            .iter()
            .find(|family| family.name == family_name)
            .ok_or_else(unknown)?;
        let variant = family
            .variants
            .iter()
            .find(|variant| variant.name == variant_name)
            .ok_or_else(unknown)?;

        Ok(Theme {
            name: normalized,
            background: variant.background,
            foreground: variant.foreground,
            muted: variant.muted,
            palette: family.palette.clone(),
        })
    }

    pub fn theme_ids(&self) -> Vec<String> {
        self.families
            .iter()
            .flat_map(|family| {
                family
                    .variants
                    .iter()
                    .map(move |variant| format!("{}-{}", family.name, variant.name))
            })
            .collect()
    }
}

impl Default for ThemeResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_family_palette_and_variant_surface() {
        let resolver = ThemeResolver::builtin();

        let dark = resolver
            .resolve("nord-dark")
            .expect("nord-dark should resolve");
        let light = resolver
            .resolve("nord-light")
            .expect("nord-light should resolve");

        assert_eq!(dark.name, "nord-dark");
        assert_eq!(dark.palette, light.palette);
        assert_ne!(dark.background, light.background);
        assert_eq!(dark.background, Color::rgb(0x2e, 0x34, 0x40));
    }

    #[test]
    fn resolve_is_case_and_whitespace_insensitive() {
        let resolver = ThemeResolver::builtin();
        let theme = resolver
            .resolve("  GitHub-Dark ")
            .expect("mixed case id should resolve");
        assert_eq!(theme.name, "github-dark");
    }

    #[test]
    fn unknown_family_or_variant_is_rejected() {
        let resolver = ThemeResolver::builtin();

        for id in ["plaid-dark", "github-sepia", "github", "", "-dark"] {
            assert_eq!(
                resolver.resolve(id),
                Err(ProgressError::UnknownTheme {
                    theme_id: id.to_owned(),
                }),
                "{id} should not resolve"
            );
        }
    }

    #[test]
    fn every_listed_id_resolves_with_non_empty_palette() {
        let resolver = ThemeResolver::builtin();
        let ids = resolver.theme_ids();

        assert!(ids.contains(&DEFAULT_THEME_ID.to_owned()));
        assert_eq!(ids.len(), 8);
        for id in ids {
            let theme = resolver.resolve(&id).expect("listed id should resolve");
            assert!(!theme.palette.is_empty(), "{id} has empty palette");
        }
    }

    #[test]
    fn color_formats_as_lowercase_hex() {
        let color = Color::from_hex(0x0969da);
        assert_eq!(color.to_hex(), "#0969da");
        assert_eq!(color.to_string(), "#0969da");
        assert_eq!(
            serde_json::to_value(color).expect("color should serialize"),
            serde_json::json!("#0969da")
        );
    }
}
