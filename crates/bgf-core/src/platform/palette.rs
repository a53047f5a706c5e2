use std::collections::BTreeMap;

use super::PlatformError;

/// Semantic color role → `#RRGGBB`.
pub type Palette = BTreeMap<String, String>;

/// Resolves a system color resource to its ARGB value.
pub trait ColorResolver: Send + Sync {
    fn argb(&self, resource: &str) -> Result<u32, PlatformError>;
}

const ACCENT_LIGHT: &str = "system_accent1_300";
const ACCENT_DARK: &str = "system_accent1_600";

/// Dynamic accent palette for the light or dark theme.
///
/// `primary` follows `dark`; both variants are always included. Platforms
/// without dynamic colors report [`PlatformError::Unsupported`].
pub fn palette(colors: &dyn ColorResolver, dark: bool) -> Result<Palette, PlatformError> {
    let light = hex(colors.argb(ACCENT_LIGHT)?);
    let deep = hex(colors.argb(ACCENT_DARK)?);
    let primary = if dark { light.clone() } else { deep.clone() };

    Ok(Palette::from([
        ("primary".to_string(), primary),
        ("primaryLight".to_string(), light),
        ("primaryDark".to_string(), deep),
    ]))
}

fn hex(argb: u32) -> String {
    format!("#{:06X}", argb & 0x00FF_FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Accents;

    impl ColorResolver for Accents {
        fn argb(&self, resource: &str) -> Result<u32, PlatformError> {
            match resource {
                ACCENT_LIGHT => Ok(0xFF8A_B4F8),
                ACCENT_DARK => Ok(0xFF1A_73E8),
                other => Err(PlatformError::Failed(other.to_string())),
            }
        }
    }

    struct NoDynamicColor;

    impl ColorResolver for NoDynamicColor {
        fn argb(&self, _resource: &str) -> Result<u32, PlatformError> {
            Err(PlatformError::Unsupported("dynamic color".to_string()))
        }
    }

    #[test]
    fn primary_follows_the_theme() {
        let light = palette(&Accents, false).unwrap();
        assert_eq!(light["primary"], "#1A73E8");
        assert_eq!(light["primaryLight"], "#8AB4F8");

        let dark = palette(&Accents, true).unwrap();
        assert_eq!(dark["primary"], "#8AB4F8");
        assert_eq!(dark["primaryDark"], "#1A73E8");
    }

    #[test]
    fn unsupported_platform_is_an_error() {
        assert!(matches!(
            palette(&NoDynamicColor, false),
            Err(PlatformError::Unsupported(_))
        ));
    }
}
