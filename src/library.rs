/// Pure projections over the catalog for the library and search screens.
///
/// None of these functions hold state: the screens recompute them on
/// every read, which is cheap because the catalog is immutable.
use serde::Serialize;

use crate::models::Track;

/// An album as shown on the albums grid, derived from its member tracks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumSummary {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub artwork: String,
    pub track_count: usize,
}

/// An artist as shown on the artists grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub track_count: usize,
}

/// Lowercased, whitespace-collapsed identifier for display groupings
/// ("Hurry Up, We're Dreaming" -> "hurry-up,-we're-dreaming")
pub fn slug(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Group tracks into albums in first-seen order. Artist and artwork come
/// from the first track encountered for each album.
pub fn albums(tracks: &[Track]) -> Vec<AlbumSummary> {
    let mut order: Vec<AlbumSummary> = Vec::new();
    let mut index: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();

    for track in tracks {
        match index.get(track.album.as_str()) {
            Some(&i) => order[i].track_count += 1,
            None => {
                index.insert(track.album.as_str(), order.len());
                order.push(AlbumSummary {
                    id: slug(&track.album),
                    title: track.album.clone(),
                    artist: track.artist.clone(),
                    artwork: track.artwork.clone(),
                    track_count: 1,
                });
            }
        }
    }

    order
}

/// Group tracks into artists in first-seen order
pub fn artists(tracks: &[Track]) -> Vec<ArtistSummary> {
    let mut order: Vec<ArtistSummary> = Vec::new();
    let mut index: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();

    for track in tracks {
        match index.get(track.artist.as_str()) {
            Some(&i) => order[i].track_count += 1,
            None => {
                index.insert(track.artist.as_str(), order.len());
                order.push(ArtistSummary {
                    id: slug(&track.artist),
                    name: track.artist.clone(),
                    image: track.artwork.clone(),
                    track_count: 1,
                });
            }
        }
    }

    order
}

/// Case-insensitive substring search over title, artist and album.
///
/// An empty or whitespace-only query yields no results: the search screen
/// shows its empty state rather than the whole catalog.
pub fn search<'a>(tracks: &'a [Track], query: &str) -> Vec<&'a Track> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    tracks
        .iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&needle)
                || t.artist.to_lowercase().contains(&needle)
                || t.album.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Render a duration in seconds as `m:ss` for track rows
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let mins = total / 60;
    let secs = total % 60;
    format!("{mins}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, title: &str, artist: &str, album: &str) -> Track {
        Track {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            duration: 180.0,
            artwork: format!("art-{id}"),
            url: format!("https://example.com/{id}.mp3"),
        }
    }

    fn sample() -> Vec<Track> {
        vec![
            track("1", "Dreams", "Fleetwood Mac", "Rumours"),
            track("2", "Go Your Own Way", "Fleetwood Mac", "Rumours"),
            track("3", "Midnight City", "M83", "Hurry Up, We're Dreaming"),
        ]
    }

    #[test]
    fn albums_group_in_first_seen_order() {
        let tracks = sample();
        let albums = albums(&tracks);

        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].title, "Rumours");
        assert_eq!(albums[0].track_count, 2);
        assert_eq!(albums[0].artist, "Fleetwood Mac");
        // Artwork comes from the first member track.
        assert_eq!(albums[0].artwork, "art-1");
        assert_eq!(albums[1].title, "Hurry Up, We're Dreaming");
        assert_eq!(albums[1].track_count, 1);
    }

    #[test]
    fn artists_group_and_count() {
        let tracks = sample();
        let artists = artists(&tracks);

        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].name, "Fleetwood Mac");
        assert_eq!(artists[0].track_count, 2);
        assert_eq!(artists[0].id, "fleetwood-mac");
        assert_eq!(artists[1].name, "M83");
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let tracks = sample();

        let by_title = search(&tracks, "midnight");
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].id, "3");

        let by_artist = search(&tracks, "FLEETWOOD");
        assert_eq!(by_artist.len(), 2);

        let by_album = search(&tracks, "rumours");
        assert_eq!(by_album.len(), 2);
    }

    #[test]
    fn search_with_blank_query_is_empty() {
        let tracks = sample();
        assert!(search(&tracks, "").is_empty());
        assert!(search(&tracks, "   ").is_empty());
    }

    #[test]
    fn search_with_no_match_is_empty() {
        let tracks = sample();
        assert!(search(&tracks, "zyzzyva").is_empty());
    }

    #[test]
    fn slug_lowercases_and_joins_whitespace() {
        assert_eq!(slug("Hurry Up"), "hurry-up");
        assert_eq!(slug("  Fleetwood   Mac "), "fleetwood-mac");
    }

    #[test]
    fn format_duration_pads_seconds() {
        assert_eq!(format_duration(243.0), "4:03");
        assert_eq!(format_duration(59.9), "0:59");
        assert_eq!(format_duration(600.0), "10:00");
        assert_eq!(format_duration(-3.0), "0:00");
    }
}
