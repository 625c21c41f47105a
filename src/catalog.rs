//! Speaker and utterance catalog.
//!
//! Built once per run from the remote store's key listing. Keys follow the
//! `prefix/speaker/chapter/utt-norm.wav` convention; the speaker id is the
//! first path component under the prefix. The listing is taken once and
//! assumed valid for the whole run — the catalog never observes concurrent
//! store mutation.

use crate::error::{MixError, Result};
use crate::store::{ObjectStore, key_in_prefix};

/// A single usable recording in the source corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// File stem, e.g. `911-130578-0020-norm`
    pub id: String,
    /// Full remote key, e.g. `train-clean-100/911/130578/911-130578-0020-norm.wav`
    pub key: String,
}

/// A speaker and their ordered utterances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speaker {
    pub id: String,
    pub utterances: Vec<Utterance>,
}

impl Speaker {
    /// A speaker needs two utterances to supply both an enrollment clip and
    /// a distinct target clip.
    pub fn is_eligible(&self) -> bool {
        self.utterances.len() >= 2
    }
}

/// Read-only speaker catalog for one corpus split.
#[derive(Debug, Clone)]
pub struct SpeakerCatalog {
    speakers: Vec<Speaker>,
}

impl SpeakerCatalog {
    /// Build the catalog from a store listing filtered to `prefix` and the
    /// utterance filename `suffix`.
    pub fn from_store(store: &dyn ObjectStore, prefix: &str, suffix: &str) -> Result<Self> {
        let keys = store.list_keys(prefix)?;
        Ok(Self::from_keys(&keys, prefix, suffix))
    }

    /// Group keys by speaker id. Keys without a speaker component or without
    /// the utterance suffix are ignored.
    pub fn from_keys(keys: &[String], prefix: &str, suffix: &str) -> Self {
        let mut speakers: Vec<Speaker> = Vec::new();

        for key in keys {
            if !key.ends_with(suffix) || !key_in_prefix(key, prefix) {
                continue;
            }
            let rel = key
                .strip_prefix(prefix.trim_end_matches('/'))
                .unwrap_or(key)
                .trim_start_matches('/');
            let Some(speaker_id) = rel.split('/').next().filter(|s| !s.is_empty()) else {
                continue;
            };
            let Some(file_name) = key.rsplit('/').next() else {
                continue;
            };
            let id = file_name.strip_suffix(".wav").unwrap_or(file_name);

            let utterance = Utterance {
                id: id.to_string(),
                key: key.clone(),
            };

            match speakers.iter_mut().find(|s| s.id == speaker_id) {
                Some(speaker) => speaker.utterances.push(utterance),
                None => speakers.push(Speaker {
                    id: speaker_id.to_string(),
                    utterances: vec![utterance],
                }),
            }
        }

        for speaker in &mut speakers {
            speaker.utterances.sort_by(|a, b| a.key.cmp(&b.key));
        }
        speakers.sort_by(|a, b| a.id.cmp(&b.id));

        Self { speakers }
    }

    /// All speakers, including those too small to be selectable.
    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    /// Speakers usable by the selection policy (>= 2 utterances).
    pub fn eligible(&self) -> Vec<&Speaker> {
        self.speakers.iter().filter(|s| s.is_eligible()).collect()
    }

    /// Fail fast when the corpus cannot supply two distinct speakers.
    pub fn require_selectable(&self) -> Result<()> {
        let found = self.eligible().len();
        if found < 2 {
            return Err(MixError::CatalogTooSmall { found });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn groups_utterances_by_speaker() {
        let catalog = SpeakerCatalog::from_keys(
            &keys(&[
                "train/19/198/19-198-0000-norm.wav",
                "train/19/198/19-198-0001-norm.wav",
                "train/26/495/26-495-0000-norm.wav",
            ]),
            "train",
            "-norm.wav",
        );

        assert_eq!(catalog.speakers().len(), 2);
        assert_eq!(catalog.speakers()[0].id, "19");
        assert_eq!(catalog.speakers()[0].utterances.len(), 2);
        assert_eq!(catalog.speakers()[1].id, "26");
        assert_eq!(catalog.speakers()[1].utterances.len(), 1);
    }

    #[test]
    fn filters_non_matching_suffix() {
        let catalog = SpeakerCatalog::from_keys(
            &keys(&[
                "train/19/198/19-198-0000-norm.wav",
                "train/19/198/19-198-0000.flac",
                "train/19/198/notes.txt",
            ]),
            "train",
            "-norm.wav",
        );

        assert_eq!(catalog.speakers().len(), 1);
        assert_eq!(catalog.speakers()[0].utterances.len(), 1);
    }

    #[test]
    fn sibling_prefix_keys_are_excluded() {
        // "train2" shares a string prefix with "train" but is a different
        // corpus; its keys must not leak in as a phantom speaker
        let catalog = SpeakerCatalog::from_keys(
            &keys(&[
                "train/19/198/19-198-0000-norm.wav",
                "train2/19/198/19-198-0000-norm.wav",
            ]),
            "train",
            "-norm.wav",
        );

        assert_eq!(catalog.speakers().len(), 1);
        assert_eq!(catalog.speakers()[0].id, "19");
    }

    #[test]
    fn utterance_id_strips_wav_extension() {
        let catalog = SpeakerCatalog::from_keys(
            &keys(&["train/911/130578/911-130578-0020-norm.wav"]),
            "train",
            "-norm.wav",
        );

        let utt = &catalog.speakers()[0].utterances[0];
        assert_eq!(utt.id, "911-130578-0020-norm");
        assert_eq!(utt.key, "train/911/130578/911-130578-0020-norm.wav");
    }

    #[test]
    fn small_speakers_retained_but_not_eligible() {
        let catalog = SpeakerCatalog::from_keys(
            &keys(&[
                "train/19/198/19-198-0000-norm.wav",
                "train/19/198/19-198-0001-norm.wav",
                "train/26/495/26-495-0000-norm.wav",
            ]),
            "train",
            "-norm.wav",
        );

        assert_eq!(catalog.speakers().len(), 2);
        let eligible = catalog.eligible();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "19");
    }

    #[test]
    fn require_selectable_needs_two_eligible_speakers() {
        let catalog = SpeakerCatalog::from_keys(
            &keys(&[
                "train/19/198/19-198-0000-norm.wav",
                "train/19/198/19-198-0001-norm.wav",
                "train/26/495/26-495-0000-norm.wav",
            ]),
            "train",
            "-norm.wav",
        );

        assert!(matches!(
            catalog.require_selectable(),
            Err(MixError::CatalogTooSmall { found: 1 })
        ));
    }

    #[test]
    fn require_selectable_passes_with_two_full_speakers() {
        let catalog = SpeakerCatalog::from_keys(
            &keys(&[
                "train/19/198/19-198-0000-norm.wav",
                "train/19/198/19-198-0001-norm.wav",
                "train/26/495/26-495-0000-norm.wav",
                "train/26/495/26-495-0001-norm.wav",
            ]),
            "train",
            "-norm.wav",
        );

        assert!(catalog.require_selectable().is_ok());
    }

    #[test]
    fn speakers_and_utterances_are_sorted() {
        let catalog = SpeakerCatalog::from_keys(
            &keys(&[
                "train/26/495/26-495-0001-norm.wav",
                "train/19/198/19-198-0001-norm.wav",
                "train/26/495/26-495-0000-norm.wav",
                "train/19/198/19-198-0000-norm.wav",
            ]),
            "train",
            "-norm.wav",
        );

        assert_eq!(catalog.speakers()[0].id, "19");
        assert_eq!(
            catalog.speakers()[1].utterances[0].key,
            "train/26/495/26-495-0000-norm.wav"
        );
    }

    #[test]
    fn empty_listing_yields_empty_catalog() {
        let catalog = SpeakerCatalog::from_keys(&[], "train", "-norm.wav");
        assert!(catalog.speakers().is_empty());
        assert!(matches!(
            catalog.require_selectable(),
            Err(MixError::CatalogTooSmall { found: 0 })
        ));
    }
}
