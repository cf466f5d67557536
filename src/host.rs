//! Services consumed from the host application
//!
//! Recognition, artwork download and metadata writing belong to the host.
//! The scraper only decides which files to hand over and with which flags.

use log::info;
use std::path::Path;

use crate::models::{MediaInfo, MediaType, MetaCandidate, TransferRecord};

/// Host recognition and scraping chain
pub trait MediaChain: Send + Sync {
    /// Recognize media by external identifier
    fn recognize_by_id(&self, tmdbid: &str, media_type: Option<MediaType>) -> Option<MediaInfo>;

    /// Recognize media from a filename guess
    fn recognize_by_meta(&self, meta: &MetaCandidate) -> Option<MediaInfo>;

    /// Download artwork for the recognized media
    fn obtain_images(&self, media: &mut MediaInfo);

    /// Write metadata and images next to `path`
    fn scrape_metadata(
        &self,
        path: &Path,
        media: &MediaInfo,
        transfer_type: &str,
        force_nfo: bool,
        force_image: bool,
    );
}

/// Host transfer history lookups
pub trait TransferHistory: Send + Sync {
    /// Most recent transfer recorded for an identifier and media type
    fn get_by_type_tmdbid(&self, tmdbid: u64, media_type: MediaType) -> Option<TransferRecord>;
}

/// History store that has never recorded anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHistory;

impl TransferHistory for NoHistory {
    fn get_by_type_tmdbid(&self, _tmdbid: u64, _media_type: MediaType) -> Option<TransferRecord> {
        None
    }
}

/// Chain that recognizes from local information only and logs what it would write
///
/// Used by the command line to preview a pass without a host attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineChain;

impl MediaChain for OfflineChain {
    fn recognize_by_id(&self, tmdbid: &str, media_type: Option<MediaType>) -> Option<MediaInfo> {
        let id = tmdbid.trim().parse().ok()?;
        Some(MediaInfo {
            tmdb_id: Some(id),
            media_type: media_type.unwrap_or(MediaType::Movie),
            title: format!("tmdb:{}", id),
            year: None,
        })
    }

    fn recognize_by_meta(&self, meta: &MetaCandidate) -> Option<MediaInfo> {
        if meta.title.is_empty() {
            return None;
        }
        Some(MediaInfo {
            tmdb_id: None,
            media_type: meta.media_type.unwrap_or(MediaType::Movie),
            title: meta.title.clone(),
            year: meta.year,
        })
    }

    fn obtain_images(&self, media: &mut MediaInfo) {
        info!("Would fetch images for {}", media.title);
    }

    fn scrape_metadata(
        &self,
        path: &Path,
        media: &MediaInfo,
        transfer_type: &str,
        force_nfo: bool,
        force_image: bool,
    ) {
        info!(
            "Would scrape {} as {} ({}, transfer={}, force_nfo={}, force_img={})",
            path.display(),
            media.title,
            media.media_type,
            transfer_type,
            force_nfo,
            force_image
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_chain_recognition() {
        let chain = OfflineChain;
        let info = chain.recognize_by_id("603", Some(MediaType::Movie)).unwrap();
        assert_eq!(info.tmdb_id, Some(603));
        assert!(chain.recognize_by_id("abc", None).is_none());

        let meta = MetaCandidate {
            title: "Heat".to_string(),
            year: Some(1995),
            ..Default::default()
        };
        let info = chain.recognize_by_meta(&meta).unwrap();
        assert_eq!(info.title, "Heat");
        assert_eq!(info.media_type, MediaType::Movie);
        assert!(chain.recognize_by_meta(&MetaCandidate::default()).is_none());
    }

    #[test]
    fn test_no_history() {
        assert!(NoHistory.get_by_type_tmdbid(1, MediaType::Tv).is_none());
    }
}
