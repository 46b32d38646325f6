//! Album aggregation.
//!
//! Media indexes report flat records, each tagged with a grouping key (the
//! bucket or collection it lives in). Albums are derived from one pass over
//! those records:
//!
//! - the first record seen for a key names the album,
//! - every further record with that key bumps its count,
//! - a synthetic "All" album counting every record is put in front.
//!
//! Albums keep the first-seen order of their keys, so when the index returns
//! records newest first, the album holding the most recent medium comes right
//! after "All".

use crate::types::{ALL_ALBUM_ID, ALL_ALBUM_NAME, Album, MediaRecord, MediumType};
use std::collections::HashMap;

/// Group `records` into albums, "All" first.
///
/// An empty input still yields the "All" album with a count of zero.
pub fn aggregate<'a, I>(records: I, medium_type: MediumType, medium_subtype: Option<&str>) -> Vec<Album>
where
    I: IntoIterator<Item = &'a MediaRecord>,
{
    let subtype = medium_subtype.unwrap_or_default().to_string();
    let mut albums: Vec<Album> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();
    let mut total = 0;

    for record in records {
        total += 1;
        match positions.get(record.album_id.as_str()) {
            Some(&pos) => albums[pos].count += 1,
            None => {
                positions.insert(record.album_id.as_str(), albums.len());
                albums.push(Album {
                    id: record.album_id.clone(),
                    medium_type,
                    medium_subtype: subtype.clone(),
                    name: record.album_name.clone(),
                    count: 1,
                });
            }
        }
    }

    let mut result = Vec::with_capacity(albums.len() + 1);
    result.push(Album {
        id: ALL_ALBUM_ID.to_string(),
        medium_type,
        medium_subtype: subtype,
        name: ALL_ALBUM_NAME.to_string(),
        count: total,
    });
    result.extend(albums);
    result
}
