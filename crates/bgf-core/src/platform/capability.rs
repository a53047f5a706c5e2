use tracing::warn;

use super::PlatformError;

/// Global animation scale settings; all three at zero means animations are off.
pub const ANIMATION_SCALE_KEYS: [&str; 3] = [
    "animator_duration_scale",
    "transition_animation_scale",
    "window_animation_scale",
];

/// Read access to global device settings.
pub trait SettingsSource: Send + Sync {
    fn float(&self, key: &str) -> Result<f32, PlatformError>;
}

/// Whether the user leaves UI animations on. Falls back to `true` when a setting
/// cannot be read.
pub fn animations_enabled(settings: &dyn SettingsSource) -> bool {
    let mut any_on = false;
    for key in ANIMATION_SCALE_KEYS {
        match settings.float(key) {
            Ok(scale) => any_on |= scale != 0.0,
            Err(e) => {
                warn!(key, error = %e, "failed to read animation setting; assuming enabled");
                return true;
            }
        }
    }
    any_on
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct Settings(HashMap<&'static str, f32>);

    impl SettingsSource for Settings {
        fn float(&self, key: &str) -> Result<f32, PlatformError> {
            self.0
                .get(key)
                .copied()
                .ok_or_else(|| PlatformError::Failed(format!("{key} not set")))
        }
    }

    fn settings(scales: [f32; 3]) -> Settings {
        Settings(ANIMATION_SCALE_KEYS.into_iter().zip(scales).collect())
    }

    #[test]
    fn off_only_when_every_scale_is_zero() {
        assert!(!animations_enabled(&settings([0.0, 0.0, 0.0])));
        assert!(animations_enabled(&settings([0.0, 0.5, 0.0])));
        assert!(animations_enabled(&settings([1.0, 1.0, 1.0])));
    }

    #[test]
    fn unreadable_setting_defaults_to_enabled() {
        assert!(animations_enabled(&Settings(HashMap::new())));
    }
}
