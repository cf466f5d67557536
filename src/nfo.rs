//! Sidecar (nfo) identifier extraction
//!
//! Kodi style nfo files carry the external id either as
//! `<uniqueid type="tmdb">603</uniqueid>` or as a plain `<tmdbid>603</tmdbid>`
//! directly below the root element.

use log::{debug, info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScrapeError};
use crate::models::MediaType;

/// Movie level sidecar name
pub const MOVIE_NFO: &str = "movie.nfo";

/// Show level sidecar name
pub const TVSHOW_NFO: &str = "tvshow.nfo";

/// A child element lookup, optionally constrained by its `type` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NfoQuery {
    /// Element name
    pub tag: &'static str,
    /// Required value of the `type` attribute
    pub type_attr: Option<&'static str>,
}

/// Lookups tried in order when reading a tmdb id
pub const TMDB_QUERIES: [NfoQuery; 4] = [
    NfoQuery { tag: "uniqueid", type_attr: Some("Tmdb") },
    NfoQuery { tag: "uniqueid", type_attr: Some("tmdb") },
    NfoQuery { tag: "uniqueid", type_attr: Some("TMDB") },
    NfoQuery { tag: "tmdbid", type_attr: None },
];

/// A direct child of the nfo root element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct NfoElement {
    tag: String,
    type_attr: Option<String>,
    text: String,
}

impl NfoElement {
    fn matches(&self, query: &NfoQuery) -> bool {
        self.tag == query.tag
            && match query.type_attr {
                Some(expected) => self.type_attr.as_deref() == Some(expected),
                None => true,
            }
    }
}

/// Parsed top level of an nfo document
#[derive(Debug, Default)]
pub struct NfoDocument {
    children: Vec<NfoElement>,
}

impl NfoDocument {
    /// Read and parse an nfo file
    pub fn open(path: &Path) -> Result<Self> {
        let xml = fs::read_to_string(path).map_err(|e| ScrapeError::from(e).at(path))?;
        Self::parse(&xml).map_err(|e| e.at(path))
    }

    /// Parse nfo content
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut children = Vec::new();
        let mut current: Option<NfoElement> = None;
        let mut depth = 0usize;
        let mut seen_root = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    depth += 1;
                    if depth == 1 {
                        seen_root = true;
                    } else if depth == 2 {
                        current = Some(element_from(e));
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    if depth == 0 {
                        seen_root = true;
                    } else if depth == 1 {
                        children.push(element_from(e));
                    }
                }
                Ok(Event::Text(ref e)) => {
                    if depth == 2 {
                        if let Some(ref mut element) = current {
                            let text = e
                                .unescape()
                                .map_err(|err| ScrapeError::nfo_error(err.to_string()))?;
                            element.text.push_str(&text);
                        }
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if depth == 2 {
                        if let Some(ref mut element) = current {
                            element.text.push_str(&String::from_utf8_lossy(e));
                        }
                    }
                }
                Ok(Event::End(_)) => {
                    if depth == 2 {
                        if let Some(element) = current.take() {
                            children.push(element);
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ScrapeError::nfo_error(format!(
                        "XML parse error at {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        if !seen_root {
            return Err(ScrapeError::nfo_error("no root element"));
        }
        Ok(Self { children })
    }

    /// Text of the first child matching `query`, if non-empty
    pub fn value(&self, query: &NfoQuery) -> Option<&str> {
        self.children
            .iter()
            .find(|child| child.matches(query))
            .map(|child| child.text.trim())
            .filter(|text| !text.is_empty())
    }

    /// First non-empty tmdb id across [`TMDB_QUERIES`]
    pub fn tmdbid(&self) -> Option<String> {
        TMDB_QUERIES
            .iter()
            .find_map(|query| self.value(query))
            .map(str::to_string)
    }
}

fn element_from(start: &BytesStart<'_>) -> NfoElement {
    let tag = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let type_attr = start
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"type")
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string());
    NfoElement {
        tag,
        type_attr,
        text: String::new(),
    }
}

/// Read the tmdb id from an nfo file
///
/// Missing or unparsable files yield `None` with a warning.
pub fn tmdbid_from_nfo(path: &Path) -> Option<String> {
    match NfoDocument::open(path) {
        Ok(doc) => doc.tmdbid(),
        Err(e) => {
            warn!("Failed to read tmdbid from {}: {}", path.display(), e.message);
            None
        }
    }
}

/// Sidecar files consulted for a media file, in priority order
pub fn sidecar_candidates(file: &Path, media_type: Option<MediaType>) -> Vec<PathBuf> {
    let Some(dir) = file.parent() else {
        return Vec::new();
    };
    match media_type {
        Some(MediaType::Movie) => vec![dir.join(MOVIE_NFO), file.with_extension("nfo")],
        // Episodes live in a season folder below the show root
        _ => dir
            .parent()
            .map(|show| vec![show.join(TVSHOW_NFO)])
            .unwrap_or_default(),
    }
}

/// Recover a previously written tmdb id for a media file
pub fn identifier_for(file: &Path, media_type: Option<MediaType>) -> Option<String> {
    for nfo in sidecar_candidates(file, media_type) {
        if !nfo.exists() {
            debug!("No sidecar at {}", nfo.display());
            continue;
        }
        if let Some(tmdbid) = tmdbid_from_nfo(&nfo) {
            info!("Read tmdbid {} from {}", tmdbid, nfo.display());
            return Some(tmdbid);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOVIE: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<movie>
  <title>The Matrix</title>
  <uniqueid type="imdb">tt0133093</uniqueid>
  <uniqueid type="tmdb" default="true">603</uniqueid>
  <tmdbid>999</tmdbid>
  <actor><tmdbid>1</tmdbid></actor>
</movie>"#;

    #[test]
    fn test_uniqueid_preferred_over_plain_tag() {
        let doc = NfoDocument::parse(MOVIE).unwrap();
        assert_eq!(doc.tmdbid(), Some("603".to_string()));
    }

    #[test]
    fn test_query_order_and_case_variants() {
        let doc = NfoDocument::parse(
            r#"<tvshow><uniqueid type="TMDB">2</uniqueid><uniqueid type="Tmdb">1</uniqueid></tvshow>"#,
        )
        .unwrap();
        assert_eq!(doc.tmdbid(), Some("1".to_string()));

        let doc = NfoDocument::parse("<movie><tmdbid> 42 </tmdbid></movie>").unwrap();
        assert_eq!(doc.tmdbid(), Some("42".to_string()));
    }

    #[test]
    fn test_nested_and_empty_values_ignored() {
        let doc = NfoDocument::parse(
            r#"<movie><uniqueid type="tmdb"/><actor><tmdbid>7</tmdbid></actor></movie>"#,
        )
        .unwrap();
        assert_eq!(doc.tmdbid(), None);
    }

    #[test]
    fn test_malformed_document() {
        assert!(NfoDocument::parse("<movie><title>x</movie>").is_err());
        assert!(NfoDocument::parse("").is_err());
    }

    #[test]
    fn test_tmdbid_from_nfo_missing_or_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(tmdbid_from_nfo(&dir.path().join("movie.nfo")), None);

        let broken = dir.path().join("broken.nfo");
        fs::write(&broken, "<movie><tmdbid>1</movie>").unwrap();
        assert_eq!(tmdbid_from_nfo(&broken), None);
    }

    #[test]
    fn test_movie_sidecar_priority() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Matrix.mkv");
        fs::write(dir.path().join("Matrix.nfo"), "<movie><tmdbid>2</tmdbid></movie>").unwrap();
        assert_eq!(
            identifier_for(&file, Some(MediaType::Movie)),
            Some("2".to_string())
        );

        fs::write(dir.path().join("movie.nfo"), "<movie><tmdbid>1</tmdbid></movie>").unwrap();
        assert_eq!(
            identifier_for(&file, Some(MediaType::Movie)),
            Some("1".to_string())
        );

        // movie.nfo without an id falls through to the file sidecar
        fs::write(dir.path().join("movie.nfo"), "<movie><title>x</title></movie>").unwrap();
        assert_eq!(
            identifier_for(&file, Some(MediaType::Movie)),
            Some("2".to_string())
        );
    }

    #[test]
    fn test_episode_uses_show_root() {
        let dir = tempfile::tempdir().unwrap();
        let season = dir.path().join("Show").join("Season 1");
        fs::create_dir_all(&season).unwrap();
        let file = season.join("Show.S01E01.mkv");
        fs::write(
            dir.path().join("Show").join(TVSHOW_NFO),
            r#"<tvshow><uniqueid type="Tmdb">95396</uniqueid></tvshow>"#,
        )
        .unwrap();
        // A movie.nfo next to the episode is not consulted
        fs::write(season.join(MOVIE_NFO), "<movie><tmdbid>1</tmdbid></movie>").unwrap();

        assert_eq!(
            identifier_for(&file, Some(MediaType::Tv)),
            Some("95396".to_string())
        );
        assert_eq!(identifier_for(&file, None), Some("95396".to_string()));
    }
}
