use crate::features::{AlbumRecord, ResultTable};
use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Write the table as CSV to `path`, creating parent directories as needed
pub fn write_csv(path: &Path, table: &ResultTable) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_table(file, table)?;

    info!("Wrote {} albums to {}", table.len(), path.display());
    Ok(())
}

/// Header row followed by one row per record
pub fn write_table<W: Write>(writer: W, table: &ResultTable) -> Result<()> {
    let mut writer = Writer::from_writer(writer);

    writer.write_record(AlbumRecord::header())?;
    for record in table.records() {
        writer
            .write_record(record.to_row())
            .with_context(|| format!("Failed to write album {}", record.identity.catalog_id))?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::RunStats;
    use crate::features::aggregate::FeatureAggregator;
    use crate::models::{AlbumIdentity, AlbumMetadata, Mode, RawTrackFeature, ReleaseDatePrecision};
    use std::collections::HashSet;

    fn create_test_record(with_features: bool) -> AlbumRecord {
        let track = RawTrackFeature {
            duration_ms: 1000,
            danceability: 0.5,
            energy: 0.25,
            loudness: -4.0,
            speechiness: 0.5,
            acousticness: 0.125,
            instrumentalness: 0.5,
            liveness: 0.25,
            valence: 0.75,
            tempo: 100.0,
            key: 11,
            time_signature: 4,
            mode: Mode::Major,
        };

        AlbumRecord {
            identity: AlbumIdentity {
                catalog_id: "4LH4d3cOWNNsVw41Gqt2kv".to_string(),
                artist: "Pink Floyd".to_string(),
                title: "The Dark Side of the Moon".to_string(),
                origin: "uk".to_string(),
                genres: Some(vec!["rock".to_string()]),
                sub_genres: Some(vec!["progressive rock".to_string(), "art rock".to_string()]),
                release_year: 1973,
                rating: Some(3.95),
            },
            metadata: AlbumMetadata {
                release_date: "1973-03-01".to_string(),
                release_date_precision: ReleaseDatePrecision::Day,
                popularity: 83,
            },
            aggregate: with_features.then(|| FeatureAggregator::aggregate(&[Some(track), None])),
        }
    }

    fn render(records: Vec<AlbumRecord>) -> Vec<csv::StringRecord> {
        let table = ResultTable::new(records, RunStats::default());
        let mut buffer = Vec::new();
        write_table(&mut buffer, &table).unwrap();

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let mut rows = vec![reader.headers().unwrap().clone()];
        rows.extend(reader.records().map(|r| r.unwrap()));
        rows
    }

    #[test]
    fn test_column_names_are_unique() {
        let header = AlbumRecord::header();
        let unique: HashSet<&String> = header.iter().collect();
        assert_eq!(unique.len(), header.len());
    }

    #[test]
    fn test_header_order() {
        let header = AlbumRecord::header();

        assert_eq!(header[0], "spotify_id");
        assert_eq!(header[8], "release_date");
        assert_eq!(header[11], "danceability_weighted_avg");
        assert_eq!(header[20], "danceability_difference");
        assert_eq!(header.last().unwrap(), "unresolved_tracks");
    }

    #[test]
    fn test_rows_align_with_header() {
        let rows = render(vec![create_test_record(true), create_test_record(false)]);

        assert_eq!(rows.len(), 3);
        for row in &rows[1..] {
            assert_eq!(row.len(), rows[0].len());
        }
    }

    #[test]
    fn test_full_record_cells() {
        let rows = render(vec![create_test_record(true)]);
        let header = &rows[0];
        let row = &rows[1];
        let value = |column: &str| {
            let index = header.iter().position(|h| h == column).unwrap();
            row[index].to_string()
        };

        assert_eq!(value("name"), "The Dark Side of the Moon");
        assert_eq!(value("sub_genres"), r#"["progressive rock","art rock"]"#);
        assert_eq!(value("release_date_precision"), "day");
        assert_eq!(value("tempo_weighted_avg"), "100");
        assert_eq!(value("tempo_difference"), "0");
        assert_eq!(value("mode_0"), "0");
        assert_eq!(value("mode_1"), "1");
        assert_eq!(value("pop_key"), "11");
        assert_eq!(value("pop_key_used"), "1");
        assert_eq!(value("duration"), "1000");
        assert_eq!(value("track_amount"), "1");
        assert_eq!(value("unresolved_tracks"), "1");
    }

    #[test]
    fn test_unrated_album_writes_empty_rating_cell() {
        let mut record = create_test_record(true);
        record.identity.rating = None;
        record.identity.genres = None;

        let rows = render(vec![record]);
        let row = &rows[1];

        assert_eq!(&rows[0][7], "global_rating");
        assert_eq!(&row[7], "");
        assert_eq!(&row[4], "");
        assert_eq!(&row[6], "1973");
    }

    #[test]
    fn test_missing_aggregate_leaves_feature_cells_empty() {
        let rows = render(vec![create_test_record(false)]);
        let row = &rows[1];

        assert_eq!(&row[10], "83");
        assert!(row.iter().skip(11).all(|cell| cell.is_empty()));
    }
}
