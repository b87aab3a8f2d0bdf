use crate::core::{GameData, ImageUrls, ProviderFetchResult, ProviderGame};

/// Merge per-provider fetch results into one canonical record.
///
/// `results` must already be ordered by provider priority (highest first);
/// the reconciliation service sorts before calling. Field-level precedence is
/// first-non-null in that order. Genres are unioned, duplicates removed,
/// first-seen order preserved. Screenshots are unioned the same way.
/// `provider_data` collects one provenance entry per contributing provider.
pub fn merge_fetch_results(results: &[ProviderFetchResult]) -> Option<ProviderGame> {
    let first = results.first()?;

    let mut game_data = GameData {
        name: first.game_data.name.clone(),
        ..Default::default()
    };
    let mut image_urls = ImageUrls::default();
    let mut provider_data = Vec::new();

    for result in results {
        let data = &result.game_data;

        if game_data.description.is_none() {
            game_data.description = data.description.clone();
        }
        if game_data.release_date.is_none() {
            game_data.release_date = data.release_date;
        }
        if game_data.critic_score.is_none() {
            game_data.critic_score = data.critic_score;
        }
        if game_data.user_score.is_none() {
            game_data.user_score = data.user_score;
        }
        for genre in &data.genres {
            if !game_data.genres.contains(genre) {
                game_data.genres.push(genre.clone());
            }
        }

        if image_urls.thumbnail.is_none() {
            image_urls.thumbnail = result.image_urls.thumbnail.clone();
        }
        if image_urls.poster.is_none() {
            image_urls.poster = result.image_urls.poster.clone();
        }
        for shot in &result.image_urls.screenshots {
            if !image_urls.screenshots.contains(shot) {
                image_urls.screenshots.push(shot.clone());
            }
        }

        // At most one provenance entry per provider id
        if provider_data
            .iter()
            .all(|p: &crate::core::ProviderData| p.provider_id != result.provider_data.provider_id)
        {
            provider_data.push(result.provider_data.clone());
        }
    }

    Some(ProviderGame {
        game_data,
        image_urls,
        provider_data,
    })
}
