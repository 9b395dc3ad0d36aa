//! Acquisitions and time series of acquisitions

use crate::band::{Band, BandStack};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Half-open acquisition window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidParameter {
                name: "end_date",
                value: end.to_string(),
                reason: format!("must be after start_date {}", start),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Catalogue metadata of one acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub id: String,
    pub date: NaiveDate,
    /// Scene-wide cloud cover, percent
    pub cloud_cover: f64,
}

/// One acquisition: metadata plus its bands
#[derive(Debug, Clone)]
pub struct Scene {
    pub metadata: SceneMetadata,
    pub stack: BandStack,
}

impl Scene {
    pub fn new(metadata: SceneMetadata, stack: BandStack) -> Self {
        Self { metadata, stack }
    }

    /// Same metadata, new bands
    pub fn with_stack(&self, stack: BandStack) -> Self {
        Self {
            metadata: self.metadata.clone(),
            stack,
        }
    }
}

/// Non-empty sequence of scenes sharing one band set and one grid.
///
/// Scenes are kept in acquisition order, though no reduction depends on it.
#[derive(Debug, Clone)]
pub struct SceneSeries {
    scenes: Vec<Scene>,
}

impl SceneSeries {
    pub fn new(mut scenes: Vec<Scene>) -> Result<Self> {
        let first = scenes
            .first()
            .ok_or_else(|| Error::NoValidObservations("scene series is empty".into()))?;
        let bands: Vec<Band> = first.stack.band_names();
        let template = first.stack.template().clone();

        for scene in &scenes[1..] {
            let other = scene.stack.band_names();
            if other != bands {
                return Err(Error::BandSetMismatch(format!(
                    "scene {} has {:?}, expected {:?}",
                    scene.metadata.id, other, bands
                )));
            }
            template.check_aligned(scene.stack.template())?;
        }

        scenes.sort_by_key(|s| s.metadata.date);
        Ok(Self { scenes })
    }

    /// Keep scenes acquired inside `window` with cloud cover strictly below
    /// `cloud_cover_max` percent.
    pub fn filter(self, window: &DateWindow, cloud_cover_max: f64) -> Result<Self> {
        let total = self.scenes.len();
        let kept: Vec<Scene> = self
            .scenes
            .into_iter()
            .filter(|s| window.contains(s.metadata.date) && s.metadata.cloud_cover < cloud_cover_max)
            .collect();
        tracing::debug!(total, kept = kept.len(), "filtered scene series");
        if kept.is_empty() {
            return Err(Error::NoValidObservations(format!(
                "no scene in [{}, {}) with cloud cover below {}%",
                window.start, window.end, cloud_cover_max
            )));
        }
        Ok(Self { scenes: kept })
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter()
    }

    /// Band set shared by every scene
    pub fn band_names(&self) -> Vec<Band> {
        self.scenes[0].stack.band_names()
    }

    /// Apply a per-scene transform, producing a new series
    pub fn map<F>(&self, f: F) -> Result<Self>
    where
        F: FnMut(&Scene) -> Result<Scene>,
    {
        Self::new(self.scenes.iter().map(f).collect::<Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GeoTransform, Raster};

    fn scene(id: &str, date: &str, cloud: f64) -> Scene {
        let mut r = Raster::filled(2, 2, 1.0);
        r.set_transform(GeoTransform::new(0.0, 60.0, 30.0, -30.0));
        Scene::new(
            SceneMetadata {
                id: id.into(),
                date: date.parse().unwrap(),
                cloud_cover: cloud,
            },
            BandStack::from_bands([(Band::RED, r)]).unwrap(),
        )
    }

    fn window() -> DateWindow {
        DateWindow::new("2020-06-01".parse().unwrap(), "2024-09-30".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_window_is_half_open() {
        let w = window();
        assert!(w.contains("2020-06-01".parse().unwrap()));
        assert!(!w.contains("2024-09-30".parse().unwrap()));
        assert!(DateWindow::new(w.end, w.start).is_err());
    }

    #[test]
    fn test_filter_by_date_and_cloud_cover() {
        let series = SceneSeries::new(vec![
            scene("a", "2021-07-01", 3.0),
            scene("b", "2021-07-17", 10.0),
            scene("c", "2019-07-01", 1.0),
            scene("d", "2024-09-30", 0.0),
        ])
        .unwrap();

        let kept = series.filter(&window(), 10.0).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.scenes()[0].metadata.id, "a");
    }

    #[test]
    fn test_filter_to_nothing_fails() {
        let series = SceneSeries::new(vec![scene("a", "2019-01-01", 3.0)]).unwrap();
        assert!(matches!(
            series.filter(&window(), 10.0),
            Err(Error::NoValidObservations(_))
        ));
    }

    #[test]
    fn test_band_set_mismatch() {
        let mut other = scene("b", "2021-08-01", 1.0);
        let r = other.stack.band(Band::RED).unwrap().clone();
        other.stack = BandStack::from_bands([(Band::NIR, r)]).unwrap();
        let result = SceneSeries::new(vec![scene("a", "2021-07-01", 1.0), other]);
        assert!(matches!(result, Err(Error::BandSetMismatch(_))));
    }
}
