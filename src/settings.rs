use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::geometry::Size;
use crate::overlay::OverlayStyle;

/// Largest screen side accepted; the overlay canvas is allocated at this size.
pub const MAX_SCREEN_EXTENT: f64 = 16_384.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScannerSettings {
    /// A record not re-detected for this long is dropped by the sweep.
    pub stale_timeout_ms: u64,
    pub sweep_interval_ms: u64,
    /// Display size the overlay is drawn in.
    pub screen: Size,
    /// Symbologies requested from the platform scanner. Events of any other
    /// reported type are ignored.
    pub barcode_types: Vec<String>,
    pub overlay: OverlayStyle,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            stale_timeout_ms: 2000,
            sweep_interval_ms: 100,
            screen: Size::new(390.0, 844.0),
            barcode_types: vec!["datamatrix".into()],
            overlay: OverlayStyle::default(),
        }
    }
}

impl ScannerSettings {
    pub fn stale_timeout(&self) -> Duration {
        Duration::from_millis(self.stale_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stale_timeout_ms == 0 {
            bail!("staleTimeoutMs must be greater than zero");
        }
        if self.sweep_interval_ms == 0 {
            bail!("sweepIntervalMs must be greater than zero");
        }
        if !self.screen.is_measured() {
            bail!(
                "screen size must be positive, got {}x{}",
                self.screen.width,
                self.screen.height
            );
        }
        if self.screen.width > MAX_SCREEN_EXTENT || self.screen.height > MAX_SCREEN_EXTENT {
            bail!(
                "screen size {}x{} exceeds {} per side",
                self.screen.width,
                self.screen.height,
                MAX_SCREEN_EXTENT
            );
        }
        if self.barcode_types.is_empty() {
            bail!("barcodeTypes must name at least one symbology");
        }
        Ok(())
    }
}

pub fn symbology_allowed(barcode_types: &[String], symbology: Option<&str>) -> bool {
    match symbology {
        // Platforms that don't report a type only deliver what was requested.
        None => true,
        Some(kind) => barcode_types
            .iter()
            .any(|wanted| wanted.eq_ignore_ascii_case(kind)),
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ScannerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<ScannerSettings>(&contents) {
                Ok(parsed) if parsed.validate().is_ok() => parsed,
                Ok(_) | Err(_) => {
                    log::warn!(
                        "Ignoring unusable settings at {}; using defaults",
                        path.display()
                    );
                    ScannerSettings::default()
                }
            }
        } else {
            ScannerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn scanner(&self) -> ScannerSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: ScannerSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: ScannerSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &ScannerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, ScannerSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, ScannerSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("scanner.json")).unwrap();
        let settings = store.scanner();
        assert_eq!(settings, ScannerSettings::default());
        assert_eq!(settings.stale_timeout(), Duration::from_millis(2000));
        assert_eq!(settings.sweep_interval(), Duration::from_millis(100));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner.json");
        fs::write(&path, r#"{ "staleTimeoutMs": 1500, "screen": { "width": 1000, "height": 2000 } }"#)
            .unwrap();

        let settings = SettingsStore::new(path).unwrap().scanner();
        assert_eq!(settings.stale_timeout_ms, 1500);
        assert_eq!(settings.sweep_interval_ms, 100);
        assert_eq!(settings.screen, Size::new(1000.0, 2000.0));
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(
            SettingsStore::new(path).unwrap().scanner(),
            ScannerSettings::default()
        );
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.scanner();
        settings.sweep_interval_ms = 50;
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.scanner(), settings);
        reopened.reload().unwrap();
        assert_eq!(reopened.scanner().sweep_interval_ms, 50);
    }

    #[test]
    fn update_rejects_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("scanner.json")).unwrap();

        let mut settings = store.scanner();
        settings.stale_timeout_ms = 0;
        assert!(store.update(settings).is_err());
        assert_eq!(store.scanner().stale_timeout_ms, 2000);

        let mut huge = store.scanner();
        huge.screen = Size::new(1e12, 844.0);
        assert!(store.update(huge).is_err());
    }

    #[test]
    fn symbology_filter() {
        let types = ScannerSettings::default().barcode_types;
        assert!(symbology_allowed(&types, None));
        assert!(symbology_allowed(&types, Some("DataMatrix")));
        assert!(!symbology_allowed(&types, Some("qr")));
    }
}
