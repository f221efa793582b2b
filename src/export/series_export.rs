//! Conversions of a [`SeriesCollection`] into polars frames and on-disk formats.

use crate::export::error::ExportError;
use crate::types::series::{
    FeatureVector, LocationSeries, SeriesCollection, LOCATION_INDEX_NAME, TIME_INDEX_NAME,
};
use chrono::{DateTime, NaiveDateTime};
use log::{info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// The `orient="split"` JSON layout with a two-level `(location name, epoch ms)` index.
#[derive(Debug, Serialize, Deserialize)]
struct SplitFrame {
    columns: Vec<String>,
    index: Vec<(String, i64)>,
    data: Vec<Vec<Option<f64>>>,
}

/// Per-location table name: lower case, spaces replaced by underscores.
pub fn table_name(location: &str) -> String {
    location.trim().to_lowercase().replace(' ', "_")
}

impl SeriesCollection {
    /// One long frame with `location name`, `time` and then every feature column.
    pub fn to_dataframe(&self) -> Result<DataFrame, ExportError> {
        let mut names = Vec::with_capacity(self.len());
        let mut times = Vec::with_capacity(self.len());
        for (key, _) in self.iter() {
            names.push(key.location);
            times.push(key.time);
        }

        let mut columns: Vec<Column> = vec![
            Series::new(LOCATION_INDEX_NAME.into(), names).into(),
            time_series(&times)?.into(),
        ];
        let rows: Vec<&FeatureVector> = self.iter().map(|(_, f)| f).collect();
        columns.extend(feature_columns(self.feature_names(), &rows));
        Ok(DataFrame::new(columns)?)
    }

    /// One frame per location, with `time` and the feature columns, paired with its table name.
    pub fn per_location_frames(&self) -> Result<Vec<(String, DataFrame)>, ExportError> {
        self.series()
            .iter()
            .map(|series| -> Result<(String, DataFrame), ExportError> {
                let times: Vec<NaiveDateTime> = series.times().collect();
                let rows: Vec<&FeatureVector> = series.rows().iter().map(|(_, f)| f).collect();
                let mut columns: Vec<Column> = vec![time_series(&times)?.into()];
                columns.extend(feature_columns(self.feature_names(), &rows));
                Ok((table_name(&series.location), DataFrame::new(columns)?))
            })
            .collect()
    }

    /// Writes the collection as split-oriented JSON, with times as epoch milliseconds.
    pub fn write_split_json(&self, path: &Path) -> Result<(), ExportError> {
        let mut index = Vec::with_capacity(self.len());
        let mut data = Vec::with_capacity(self.len());
        for (key, features) in self.iter() {
            index.push((key.location, key.time.and_utc().timestamp_millis()));
            data.push(features.0.clone());
        }
        let frame = SplitFrame {
            columns: self.feature_names().to_vec(),
            index,
            data,
        };

        let file = File::create(path).map_err(|e| ExportError::Io(path.to_path_buf(), e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &frame)
            .map_err(|e| ExportError::Json(path.to_path_buf(), e))?;
        writer
            .flush()
            .map_err(|e| ExportError::Io(path.to_path_buf(), e))?;
        info!(
            "Wrote {} rows for {} locations to {}",
            frame.data.len(),
            self.location_count(),
            path.display()
        );
        Ok(())
    }

    /// Reads split-oriented JSON written by [`Self::write_split_json`].
    ///
    /// Rows repeating an earlier `(location, time)` key are dropped. Locations keep the order of
    /// their first row; rows within a location are sorted by time.
    pub fn read_split_json(path: &Path) -> Result<Self, ExportError> {
        let file = File::open(path).map_err(|e| ExportError::Io(path.to_path_buf(), e))?;
        let frame: SplitFrame = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ExportError::Json(path.to_path_buf(), e))?;

        if frame.index.len() != frame.data.len() {
            return Err(ExportError::MalformedSplit(format!(
                "{} index entries for {} data rows",
                frame.index.len(),
                frame.data.len()
            )));
        }

        let mut order: Vec<String> = Vec::new();
        let mut grouped: BTreeMap<String, BTreeMap<NaiveDateTime, FeatureVector>> = BTreeMap::new();
        let mut duplicates = 0usize;
        for ((location, millis), values) in frame.index.into_iter().zip(frame.data) {
            if values.len() != frame.columns.len() {
                return Err(ExportError::MalformedSplit(format!(
                    "row for '{}' has {} values, expected {}",
                    location,
                    values.len(),
                    frame.columns.len()
                )));
            }
            let time = DateTime::from_timestamp_millis(millis)
                .ok_or(ExportError::InvalidTime(millis))?
                .naive_utc();
            if !grouped.contains_key(&location) {
                order.push(location.clone());
            }
            let rows = grouped.entry(location).or_default();
            if rows.contains_key(&time) {
                duplicates += 1;
                continue;
            }
            rows.insert(time, FeatureVector(values));
        }
        if duplicates > 0 {
            warn!(
                "Dropped {} duplicate rows while reading {}",
                duplicates,
                path.display()
            );
        }

        let series = order
            .into_iter()
            .map(|location| {
                let rows = grouped.remove(&location).unwrap_or_default();
                let mut series = LocationSeries::new(location);
                series.extend_rows(rows.into_iter().collect());
                series
            })
            .collect();
        Ok(SeriesCollection::new(frame.columns, series))
    }

    /// Writes [`Self::to_dataframe`] as a Snappy-compressed parquet file.
    pub fn write_parquet(&self, path: &Path) -> Result<(), ExportError> {
        let mut df = self.to_dataframe()?;
        let file = File::create(path).map_err(|e| ExportError::Io(path.to_path_buf(), e))?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut df)?;
        Ok(())
    }
}

fn time_series(times: &[NaiveDateTime]) -> Result<Series, ExportError> {
    let millis: Vec<i64> = times
        .iter()
        .map(|t| t.and_utc().timestamp_millis())
        .collect();
    Ok(Series::new(TIME_INDEX_NAME.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

fn feature_columns(feature_names: &[String], rows: &[&FeatureVector]) -> Vec<Column> {
    feature_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<Option<f64>> = rows.iter().map(|row| row.get(i)).collect();
            Series::new(name.as_str().into(), values).into()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::december_2021;
    use chrono::Duration;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn collection() -> SeriesCollection {
        let start = december_2021().start();
        let mut sunny = LocationSeries::new("Sunny Beach");
        sunny.extend_rows(vec![
            (start, FeatureVector(vec![Some(0.5), None])),
            (start + Duration::hours(1), FeatureVector(vec![Some(0.6), Some(3.2)])),
        ]);
        let mut nessebar = LocationSeries::new("Nessebar");
        nessebar.extend_rows(vec![(start, FeatureVector(vec![Some(0.9), Some(4.0)]))]);
        SeriesCollection::new(vec!["VHM0".into(), "VTM02".into()], vec![sunny, nessebar])
    }

    #[test]
    fn test_split_json_keeps_keys_and_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("temporal_beach_data_df_2021_12-2021_12.json");
        let written = collection();

        written.write_split_json(&path)?;
        let text = std::fs::read_to_string(&path)?;
        assert!(text.starts_with(r#"{"columns":["VHM0","VTM02"],"index":[["Sunny Beach",1638316800000]"#));

        let restored = SeriesCollection::read_split_json(&path)?;
        assert_eq!(restored, written);
        Ok(())
    }

    #[test]
    fn test_split_json_preserves_float_bits() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("bits.json");
        let values = [1.0500000000000043, 0.1 + 0.2, 2.2250738585072014e-308, 4.35];
        let mut series = LocationSeries::new("Kamchia");
        series.extend_rows(vec![(
            december_2021().start(),
            FeatureVector(values.iter().copied().map(Some).collect()),
        )]);
        let written = SeriesCollection::new(
            vec!["VHM0".into(), "VTM02".into(), "VTPK".into(), "VMDR".into()],
            vec![series],
        );

        written.write_split_json(&path)?;
        let restored = SeriesCollection::read_split_json(&path)?;
        let row = &restored.get_series("Kamchia").unwrap().rows()[0].1;
        for (i, expected) in values.iter().enumerate() {
            assert_eq!(row.get(i).map(f64::to_bits), Some(expected.to_bits()));
        }
        Ok(())
    }

    #[test]
    fn test_read_split_json_drops_duplicates() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"{{"columns":["VHM0"],
                "index":[["Obzor",1638320400000],["Obzor",1638316800000],["Obzor",1638320400000]],
                "data":[[1.0],[2.0],[3.0]]}}"#
        )?;
        file.flush()?;

        let restored = SeriesCollection::read_split_json(file.path())?;
        let obzor = restored.get_series("Obzor").unwrap();
        assert_eq!(obzor.len(), 2);
        let values: Vec<Option<f64>> = obzor.rows().iter().map(|(_, f)| f.get(0)).collect();
        assert_eq!(values, vec![Some(2.0), Some(1.0)]);
        Ok(())
    }

    #[test]
    fn test_read_split_json_rejects_ragged_rows() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"{{"columns":["VHM0","VTM02"],"index":[["Obzor",0]],"data":[[1.0]]}}"#
        )?;
        file.flush()?;
        assert!(matches!(
            SeriesCollection::read_split_json(file.path()),
            Err(ExportError::MalformedSplit(_))
        ));
        Ok(())
    }

    #[test]
    fn test_to_dataframe_layout() -> Result<(), Box<dyn std::error::Error>> {
        let df = collection().to_dataframe()?;
        assert_eq!(df.shape(), (3, 4));
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["location name", "time", "VHM0", "VTM02"]);
        assert_eq!(df.column("VTM02")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn test_per_location_frames_use_table_names() -> Result<(), Box<dyn std::error::Error>> {
        let frames = collection().per_location_frames()?;
        let names: Vec<&str> = frames.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["sunny_beach", "nessebar"]);
        assert_eq!(frames[0].1.shape(), (2, 3));
        Ok(())
    }

    #[test]
    fn test_write_parquet() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("waves.parquet");
        collection().write_parquet(&path)?;

        let df = ParquetReader::new(File::open(&path)?).finish()?;
        assert_eq!(df.height(), 3);
        Ok(())
    }
}
