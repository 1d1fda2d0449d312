//! Lenient landmark lookups for attribute pickers.
//!
//! Address widgets store a landmark as its id string and offer candidates by
//! typed text. These helpers never fail: lookup errors are logged at `warn`
//! and turned into empty results.

use crate::model::landmark::{Landmark, LandmarkId};
use crate::repo::landmark_repo::LandmarkRepository;
use crate::repo::setting_repo::SettingRepository;
use crate::service::landmark_service::LandmarkService;
use log::warn;

/// Active landmarks whose name starts with `search_text`.
///
/// Returns an empty list on any failure.
pub fn find_possible_values<R, S>(
    service: &LandmarkService<R, S>,
    search_text: &str,
) -> Vec<Landmark>
where
    R: LandmarkRepository,
    S: SettingRepository,
{
    service.get_landmarks(search_text).unwrap_or_else(|err| {
        warn!(
            "event=landmark_lookup module=lookup status=error op=find_possible_values error={err}"
        );
        Vec::new()
    })
}

/// Every landmark, retired last. Returns an empty list on any failure.
pub fn possible_values<R, S>(service: &LandmarkService<R, S>) -> Vec<Landmark>
where
    R: LandmarkRepository,
    S: SettingRepository,
{
    service.get_all_landmarks().unwrap_or_else(|err| {
        warn!("event=landmark_lookup module=lookup status=error op=possible_values error={err}");
        Vec::new()
    })
}

/// Resolves a serialized id back into a landmark.
///
/// Unparsable ids, unknown ids and lookup failures all yield a blank,
/// unsaved `Landmark::default()`.
pub fn hydrate<R, S>(service: &LandmarkService<R, S>, serialized_id: &str) -> Landmark
where
    R: LandmarkRepository,
    S: SettingRepository,
{
    let Ok(id) = serialized_id.trim().parse::<LandmarkId>() else {
        return Landmark::default();
    };

    match service.get_landmark(id) {
        Ok(Some(landmark)) => landmark,
        Ok(None) => Landmark::default(),
        Err(err) => {
            warn!(
                "event=landmark_lookup module=lookup status=error op=hydrate id={id} error={err}"
            );
            Landmark::default()
        }
    }
}

/// Inverse of [`hydrate`]: the id as text, empty when unsaved.
pub fn serialize(landmark: &Landmark) -> String {
    landmark.serialize_id()
}
